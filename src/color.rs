use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            to_color32(rgb)
        })
        .collect()
}

fn to_color32(rgb: Srgb) -> Color32 {
    Color32::from_rgb(
        (rgb.red.clamp(0.0, 1.0) * 255.0).round() as u8,
        (rgb.green.clamp(0.0, 1.0) * 255.0).round() as u8,
        (rgb.blue.clamp(0.0, 1.0) * 255.0).round() as u8,
    )
}

// ---------------------------------------------------------------------------
// Continuous scales
// ---------------------------------------------------------------------------

/// Continuous colour scales used by bars, heatmaps and pies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorScale {
    Viridis,
    Plasma,
    Blues,
    RdBu,
    /// Black for 0, blue for 1: binary "used / not used" grids.
    BlackBlue,
}

impl ColorScale {
    fn stops(self) -> &'static [(u8, u8, u8)] {
        match self {
            ColorScale::Viridis => &[
                (68, 1, 84),
                (59, 82, 139),
                (33, 145, 140),
                (94, 201, 98),
                (253, 231, 37),
            ],
            ColorScale::Plasma => &[
                (13, 8, 135),
                (126, 3, 168),
                (204, 71, 120),
                (248, 149, 64),
                (240, 249, 33),
            ],
            ColorScale::Blues => &[
                (8, 48, 107),
                (33, 113, 181),
                (107, 174, 214),
                (198, 219, 239),
                (247, 251, 255),
            ],
            ColorScale::RdBu => &[
                (103, 0, 31),
                (214, 96, 77),
                (247, 247, 247),
                (67, 147, 195),
                (5, 48, 97),
            ],
            ColorScale::BlackBlue => &[(0, 0, 0), (0, 0, 255)],
        }
    }

    /// Colour at position `t` in `[0, 1]`, interpolated in linear RGB.
    pub fn sample(self, t: f64) -> Color32 {
        let stops = self.stops();
        let t = if t.is_finite() { t.clamp(0.0, 1.0) as f32 } else { 0.0 };
        let span = (stops.len() - 1) as f32;
        let pos = t * span;
        let lo = (pos.floor() as usize).min(stops.len() - 1);
        let hi = (lo + 1).min(stops.len() - 1);
        let local = pos - lo as f32;

        let lin = |(r, g, b): (u8, u8, u8)| -> LinSrgb {
            Srgb::new(r, g, b).into_format::<f32>().into_linear()
        };
        let mixed = lin(stops[lo]).mix(lin(stops[hi]), local);
        to_color32(Srgb::from_linear(mixed))
    }

    /// Colour for `value` scaled between `min` and `max`.
    pub fn for_value(self, value: f64, min: f64, max: f64) -> Color32 {
        if (max - min).abs() < f64::EPSILON {
            return self.sample(1.0);
        }
        self.sample((value - min) / (max - min))
    }

    /// `n` evenly spaced colours along the scale, for discrete sequences.
    pub fn discrete(self, n: usize) -> Vec<Color32> {
        match n {
            0 => Vec::new(),
            1 => vec![self.sample(0.5)],
            _ => (0..n).map(|i| self.sample(i as f64 / (n - 1) as f64)).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Color mapping: category label → Color32
// ---------------------------------------------------------------------------

/// Maps category labels (slices, bubbles) to distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl ColorMap {
    /// Evenly spaced hues, one per label.
    pub fn new<'a, I: IntoIterator<Item = &'a str>>(labels: I) -> Self {
        let labels: Vec<&str> = labels.into_iter().collect();
        let palette = generate_palette(labels.len());
        Self::from_pairs(labels.into_iter().zip(palette))
    }

    /// Colours sampled from a continuous scale, in label order.
    pub fn along<'a, I: IntoIterator<Item = &'a str>>(labels: I, scale: ColorScale) -> Self {
        let labels: Vec<&str> = labels.into_iter().collect();
        let colors = scale.discrete(labels.len());
        Self::from_pairs(labels.into_iter().zip(colors))
    }

    fn from_pairs<'a>(pairs: impl Iterator<Item = (&'a str, Color32)>) -> Self {
        ColorMap {
            mapping: pairs.map(|(l, c)| (l.to_string(), c)).collect(),
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a given label.
    pub fn color_for(&self, label: &str) -> Color32 {
        self.mapping
            .get(label)
            .copied()
            .unwrap_or(self.default_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_endpoints_hit_first_and_last_stops() {
        assert_eq!(ColorScale::BlackBlue.sample(0.0), Color32::from_rgb(0, 0, 0));
        assert_eq!(ColorScale::BlackBlue.sample(1.0), Color32::from_rgb(0, 0, 255));
        assert_eq!(ColorScale::Viridis.sample(f64::NAN), ColorScale::Viridis.sample(0.0));
    }

    #[test]
    fn discrete_sequences_have_requested_length() {
        assert!(ColorScale::Plasma.discrete(0).is_empty());
        assert_eq!(ColorScale::Plasma.discrete(7).len(), 7);
    }

    #[test]
    fn unknown_labels_fall_back_to_gray() {
        let map = ColorMap::new(["Windows", "Linux"]);
        assert_ne!(map.color_for("Windows"), map.color_for("Linux"));
        assert_eq!(map.color_for("macOS"), Color32::GRAY);
    }
}
