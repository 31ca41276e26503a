use std::borrow::Cow;
use std::fmt;

// ---------------------------------------------------------------------------
// CellValue – a single cell of a sheet
// ---------------------------------------------------------------------------

/// A dynamically-typed spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// ISO-8601 date (`YYYY-MM-DD`) or date-time kept as text.
    Date(String),
    Null,
}

// -- Manual Eq/Ord: floats compare by total order --

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
                Date(_) => 5,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) | (Date(a), Date(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => write!(f, ""),
            other => match other.as_text() {
                Some(text) => f.write_str(&text),
                None => Ok(()),
            },
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Integer(i)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Float(v)
    }
}

impl CellValue {
    /// Textual form used by predicates and group keys. `None` for nulls.
    ///
    /// Whole floats render without a fractional part, since spreadsheet
    /// readers hand every number back as `f64`.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            CellValue::String(s) | CellValue::Date(s) => Some(Cow::Borrowed(s.as_str())),
            CellValue::Integer(i) => Some(Cow::Owned(i.to_string())),
            CellValue::Float(v) if v.fract() == 0.0 && v.abs() < 1e15 => {
                Some(Cow::Owned(format!("{v:.0}")))
            }
            CellValue::Float(v) => Some(Cow::Owned(v.to_string())),
            CellValue::Bool(b) => Some(Cow::Owned(b.to_string())),
            CellValue::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Table – one sheet of the workbook
// ---------------------------------------------------------------------------

/// A parsed sheet: ordered columns and row-major cells.
///
/// Every row holds exactly `columns.len()` cells; [`Table::push_row`] pads or
/// truncates to keep that invariant.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from literal rows.
    #[cfg(test)]
    pub fn from_rows<C>(name: &str, columns: &[&str], rows: Vec<Vec<C>>) -> Self
    where
        C: Into<CellValue>,
    {
        let mut table = Table::new(name, columns.iter().map(|c| c.to_string()).collect());
        for row in rows {
            table.push_row(row.into_iter().map(Into::into).collect());
        }
        table
    }

    pub fn push_row(&mut self, mut cells: Vec<CellValue>) {
        cells.resize(self.columns.len(), CellValue::Null);
        self.rows.push(cells);
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_index(column).is_some()
    }

    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        self.rows.get(index).map(|cells| Row { table: self, cells })
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        (0..self.rows.len()).filter_map(move |i| self.row(i))
    }

    /// Raw cells of one row, aligned with `columns`.
    pub fn cells(&self, index: usize) -> &[CellValue] {
        self.rows.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// New table with the same columns holding only the rows that satisfy
    /// `keep`, in their original order.
    pub fn filter_rows<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(&Row<'_>) -> bool,
    {
        let rows = self
            .rows
            .iter()
            .filter(|cells| keep(&Row { table: self, cells }))
            .cloned()
            .collect();
        Table {
            name: self.name.clone(),
            columns: self.columns.clone(),
            rows,
        }
    }

    /// New table holding the rows at `indices`.
    pub fn select(&self, indices: &[usize]) -> Table {
        Table {
            name: self.name.clone(),
            columns: self.columns.clone(),
            rows: indices
                .iter()
                .filter_map(|&i| self.rows.get(i).cloned())
                .collect(),
        }
    }
}

/// Borrowed view of one table row.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a Table,
    cells: &'a [CellValue],
}

impl<'a> Row<'a> {
    #[cfg(test)]
    pub fn cells(&self) -> &'a [CellValue] {
        self.cells
    }

    pub fn get(&self, column: &str) -> Option<&'a CellValue> {
        self.table.column_index(column).map(|i| &self.cells[i])
    }

    /// Trimmed text of a non-null cell.
    pub fn text(&self, column: &str) -> Option<Cow<'a, str>> {
        let value = self.get(column)?;
        if value.is_null() {
            return None;
        }
        value.as_text().map(|t| match t {
            Cow::Borrowed(s) => Cow::Borrowed(s.trim()),
            Cow::Owned(s) => Cow::Owned(s.trim().to_string()),
        })
    }

    /// `true` when the cell's text equals `expected` exactly.
    pub fn is(&self, column: &str, expected: &str) -> bool {
        self.text(column).is_some_and(|t| t == expected)
    }
}

// ---------------------------------------------------------------------------
// Workbook – every sheet of one uploaded file
// ---------------------------------------------------------------------------

/// All sheets of one file, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    sheets: Vec<Table>,
}

impl Workbook {
    pub fn new(sheets: Vec<Table>) -> Self {
        Self { sheets }
    }

    pub fn sheet(&self, name: &str) -> Option<&Table> {
        self.sheets.iter().find(|t| t.name == name)
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|t| t.name.clone()).collect()
    }

    pub fn sheets(&self) -> &[Table] {
        &self.sheets
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_rows(
            "techniques",
            &["ID", "name"],
            vec![vec!["T1001", "Data Obfuscation"], vec!["T1003", "OS Credential Dumping"]],
        )
    }

    #[test]
    fn push_row_pads_short_rows() {
        let mut table = Table::new("t", vec!["a".into(), "b".into()]);
        table.push_row(vec![CellValue::from("x")]);
        assert_eq!(table.cells(0), &[CellValue::from("x"), CellValue::Null]);
    }

    #[test]
    fn whole_floats_render_as_integers() {
        assert_eq!(CellValue::Float(2015.0).as_text().as_deref(), Some("2015"));
        assert_eq!(CellValue::Float(1.5).as_text().as_deref(), Some("1.5"));
        assert_eq!(CellValue::Null.as_text(), None);
    }

    #[test]
    fn filter_rows_keeps_columns_and_order() {
        let table = sample();
        let filtered = table.filter_rows(|row| row.is("ID", "T1003"));
        assert_eq!(filtered.columns, table.columns);
        assert_eq!(filtered.len(), 1);
        assert_eq!(
            filtered.row(0).and_then(|r| r.text("name")).as_deref(),
            Some("OS Credential Dumping")
        );
    }

    #[test]
    fn workbook_looks_up_sheets_by_name() {
        let workbook = Workbook::new(vec![sample()]);
        assert!(workbook.sheet("techniques").is_some());
        assert!(workbook.sheet("software").is_none());
        assert_eq!(workbook.sheet_names(), vec!["techniques".to_string()]);
    }
}
