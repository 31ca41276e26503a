//! Plain-data chart descriptions. Built by the page builders, drawn by `ui`.

use crate::color::ColorScale;
use crate::data::analysis::Counts;

/// One labelled value: a bar, a pie slice, a word.
#[derive(Debug, Clone, PartialEq)]
pub struct Datum {
    pub label: String,
    pub value: f64,
}

impl Datum {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }

    pub fn from_counts(counts: &Counts) -> Vec<Datum> {
        counts
            .iter()
            .map(|(label, n)| Datum::new(label.clone(), *n as f64))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub bars: Vec<Datum>,
    /// Bars are coloured by value along this scale.
    pub scale: ColorScale,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PieChart {
    pub title: String,
    pub slices: Vec<Datum>,
    pub scale: ColorScale,
    /// Inner radius as a fraction of the outer one; 0 for a full pie.
    pub hole: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bubble {
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub size: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScatterChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub bubbles: Vec<Bubble>,
}

/// Row-major grid: `values[r][c]` belongs to `rows[r]`, `columns[c]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Heatmap {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    pub values: Vec<Vec<f64>>,
    pub scale: ColorScale,
    /// Print each cell's value inside it.
    pub annotate: bool,
}

/// Inner ring entry with its outer-ring children.
#[derive(Debug, Clone, PartialEq)]
pub struct Ring {
    pub label: String,
    pub children: Vec<Datum>,
}

impl Ring {
    pub fn total(&self) -> f64 {
        self.children.iter().map(|d| d.value).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sunburst {
    pub title: String,
    pub rings: Vec<Ring>,
    pub scale: ColorScale,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WordCloud {
    pub title: String,
    /// Heaviest first.
    pub words: Vec<Datum>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Chart {
    Bar(BarChart),
    Pie(PieChart),
    Line(LineChart),
    Scatter(ScatterChart),
    Heatmap(Heatmap),
    Sunburst(Sunburst),
    WordCloud(WordCloud),
}

impl Chart {
    pub fn title(&self) -> &str {
        match self {
            Chart::Bar(c) => &c.title,
            Chart::Pie(c) => &c.title,
            Chart::Line(c) => &c.title,
            Chart::Scatter(c) => &c.title,
            Chart::Heatmap(c) => &c.title,
            Chart::Sunburst(c) => &c.title,
            Chart::WordCloud(c) => &c.title,
        }
    }
}
