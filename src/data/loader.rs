use std::path::Path;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{DataType, Date32Type, Float32Type, Float64Type, Int32Type, Int64Type};
use arrow::util::display::array_value_to_string;
use calamine::{Data, Range, Reader, open_workbook_auto};
use chrono::NaiveDate;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{CellValue, Table, Workbook};
use crate::error::LoadError;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load every sheet of a workbook file.  Dispatch by extension.
///
/// Supported formats:
/// * `.xlsx` / `.xlsm` / `.xlsb` / `.xls` / `.ods` – one table per sheet,
///   first row is the header
/// * `.json`    – `{ "sheet": [{ ...record }, ...], ... }`, or a bare array of
///   records loaded as one sheet named after the file stem
/// * `.csv`     – one sheet named after the file stem
/// * `.parquet` – one sheet named after the file stem
pub fn load_workbook(path: &Path) -> Result<Workbook, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let loader: fn(&Path) -> Result<Vec<Table>> = match ext.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => load_spreadsheet,
        "json" => load_json,
        "csv" => load_csv,
        "parquet" | "pq" => load_parquet,
        other => {
            return Err(LoadError::UnsupportedFormat {
                extension: other.to_string(),
            });
        }
    };

    std::fs::metadata(path).map_err(|source| LoadError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let sheets = loader(path).map_err(|e| LoadError::InvalidWorkbook {
        path: path.to_path_buf(),
        message: format!("{e:#}"),
    })?;

    let workbook = Workbook::new(sheets);
    if workbook.is_empty() {
        return Err(LoadError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(workbook)
}

/// Sheet name used for single-table formats.
fn stem_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("sheet")
        .to_string()
}

/// Trimmed header names; blank headers get a positional name.
fn header_names<I: IntoIterator<Item = String>>(raw: I) -> Vec<String> {
    raw.into_iter()
        .enumerate()
        .map(|(i, h)| {
            let h = h.trim();
            if h.is_empty() {
                format!("column {}", i + 1)
            } else {
                h.to_string()
            }
        })
        .collect()
}

fn push_non_blank(table: &mut Table, cells: Vec<CellValue>) {
    if cells.iter().all(CellValue::is_null) {
        return;
    }
    table.push_row(cells);
}

// ---------------------------------------------------------------------------
// Spreadsheet loader
// ---------------------------------------------------------------------------

fn load_spreadsheet(path: &Path) -> Result<Vec<Table>> {
    let mut workbook = open_workbook_auto(path).context("opening workbook")?;

    let mut tables = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&name)
            .with_context(|| format!("reading sheet '{name}'"))?;
        tables.push(table_from_range(&name, &range));
    }
    Ok(tables)
}

fn table_from_range(name: &str, range: &Range<Data>) -> Table {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Table::new(name, Vec::new());
    };

    let mut table = Table::new(name, header_names(header.iter().map(|c| c.to_string())));
    for row in rows {
        push_non_blank(&mut table, row.iter().map(spreadsheet_cell).collect());
    }
    table
}

fn spreadsheet_cell(cell: &Data) -> CellValue {
    match cell {
        Data::String(s) => guess_cell_type(s),
        Data::Int(i) => CellValue::Integer(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ts) if ts.time() == chrono::NaiveTime::MIN => CellValue::Date(ts.date().to_string()),
            Some(ts) => CellValue::Date(ts.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => CellValue::Float(dt.as_f64()),
        },
        Data::DateTimeIso(s) => CellValue::Date(s.clone()),
        Data::DurationIso(s) => CellValue::String(s.clone()),
        Data::Error(_) | Data::Empty => CellValue::Null,
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, one array per sheet):
///
/// ```json
/// {
///   "relationships": [
///     { "source name": "APT28", "source type": "group", "mapping type": "uses", ... },
///     ...
///   ],
///   "campaigns": [ ... ]
/// }
/// ```
fn load_json(path: &Path) -> Result<Vec<Table>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    match root {
        JsonValue::Object(sheets) => sheets
            .iter()
            .map(|(name, records)| {
                let records = records
                    .as_array()
                    .with_context(|| format!("Sheet '{name}' is not an array of records"))?;
                json_records_to_table(name, records)
            })
            .collect(),
        JsonValue::Array(records) => Ok(vec![json_records_to_table(&stem_name(path), &records)?]),
        _ => bail!("Expected a top-level JSON object of sheets or an array of records"),
    }
}

fn json_records_to_table(name: &str, records: &[JsonValue]) -> Result<Table> {
    let mut columns: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Sheet '{name}', row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let mut table = Table::new(name, columns.clone());
    for rec in records {
        let cells = columns
            .iter()
            .map(|col| rec.get(col).map(json_to_cell).unwrap_or(CellValue::Null))
            .collect();
        push_non_blank(&mut table, cells);
    }
    Ok(table)
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => guess_cell_type(s),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        // Multi-valued cells become the comma-separated form the sheets use.
        JsonValue::Array(items) => CellValue::String(
            items
                .iter()
                .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                .collect::<Vec<_>>()
                .join(", "),
        ),
        other => CellValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one record per line.
fn load_csv(path: &Path) -> Result<Vec<Table>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .context("opening CSV")?;
    let headers = header_names(
        reader
            .headers()
            .context("reading CSV headers")?
            .iter()
            .map(|h| h.to_string()),
    );

    let mut table = Table::new(stem_name(path), headers);
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        push_non_blank(&mut table, record.iter().map(guess_cell_type).collect());
    }
    Ok(vec![table])
}

fn guess_cell_type(s: &str) -> CellValue {
    let s = s.trim();
    if s.is_empty() {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return CellValue::Float(f);
    }
    if s == "true" || s == "false" {
        return CellValue::Bool(s == "true");
    }
    if NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok() {
        return CellValue::Date(s.to_string());
    }
    CellValue::String(s.to_string())
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file as a single sheet.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`). Strings, integers, floats, booleans
/// and `Date32` map onto typed cells; anything else is rendered as text.
fn load_parquet(path: &Path) -> Result<Vec<Table>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut table = Table::new(stem_name(path), columns);
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            let cells = batch
                .columns()
                .iter()
                .map(|col| extract_cell(col, row))
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("Row {row}"))?;
            push_non_blank(&mut table, cells);
        }
    }
    Ok(vec![table])
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &ArrayRef, row: usize) -> Result<CellValue> {
    if col.is_null(row) {
        return Ok(CellValue::Null);
    }
    let typed = match col.data_type() {
        DataType::Utf8 => col
            .as_string_opt::<i32>()
            .map(|s| guess_cell_type(s.value(row))),
        DataType::LargeUtf8 => col
            .as_string_opt::<i64>()
            .map(|s| guess_cell_type(s.value(row))),
        DataType::Int32 => col
            .as_primitive_opt::<Int32Type>()
            .map(|a| CellValue::Integer(a.value(row) as i64)),
        DataType::Int64 => col
            .as_primitive_opt::<Int64Type>()
            .map(|a| CellValue::Integer(a.value(row))),
        DataType::Float32 => col
            .as_primitive_opt::<Float32Type>()
            .map(|a| CellValue::Float(a.value(row) as f64)),
        DataType::Float64 => col
            .as_primitive_opt::<Float64Type>()
            .map(|a| CellValue::Float(a.value(row))),
        DataType::Boolean => col.as_boolean_opt().map(|a| CellValue::Bool(a.value(row))),
        DataType::Date32 => col
            .as_primitive_opt::<Date32Type>()
            .and_then(|a| a.value_as_date(row))
            .map(|d| CellValue::Date(d.to_string())),
        _ => None,
    };
    match typed {
        Some(cell) => Ok(cell),
        None => Ok(CellValue::String(
            array_value_to_string(col, row).context("formatting parquet value")?,
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn csv_loads_as_one_sheet_named_after_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("relationships.csv");
        std::fs::write(
            &path,
            "source name,source type,target name,target type,mapping type\n\
             APT28,group,T1059,technique,uses\n\
             ,,,,\n\
             Mimikatz,software,T1003,technique,uses\n",
        )
        .expect("write csv");

        let workbook = load_workbook(&path).expect("load");
        let sheet = workbook.sheet("relationships").expect("sheet");
        assert_eq!(sheet.columns.len(), 5);
        assert_eq!(sheet.len(), 2, "blank rows are dropped");
        assert_eq!(
            sheet.row(1).and_then(|r| r.text("source name")).as_deref(),
            Some("Mimikatz")
        );
    }

    #[test]
    fn json_object_loads_every_sheet() {
        let mut file = tempfile::Builder::new()
            .suffix(".json")
            .tempfile()
            .expect("tempfile");
        write!(
            file,
            r#"{{
                "campaigns": [{{"name": "C0010", "first seen": "2015-01-01"}}],
                "software": [{{"name": "Mimikatz", "platforms": ["Windows", "Linux"]}}]
            }}"#
        )
        .expect("write json");

        let workbook = load_workbook(file.path()).expect("load");
        assert_eq!(workbook.sheets().len(), 2);

        let campaigns = workbook.sheet("campaigns").expect("campaigns");
        assert_eq!(
            campaigns.row(0).and_then(|r| r.get("first seen")).cloned(),
            Some(CellValue::Date("2015-01-01".into()))
        );

        let software = workbook.sheet("software").expect("software");
        assert_eq!(
            software.row(0).and_then(|r| r.text("platforms")).as_deref(),
            Some("Windows, Linux")
        );
    }

    #[test]
    fn json_array_loads_as_single_sheet() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("techniques.json");
        std::fs::write(&path, r#"[{"ID": "T1001", "name": "Data Obfuscation"}]"#)
            .expect("write json");

        let workbook = load_workbook(&path).expect("load");
        assert_eq!(workbook.sheet_names(), vec!["techniques".to_string()]);
    }

    #[test]
    fn json_without_sheets_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("attack.json");
        std::fs::write(&path, "{}").expect("write json");

        let err = load_workbook(&path).unwrap_err();
        assert!(matches!(err, LoadError::Empty { .. }));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = load_workbook(Path::new("notes.txt")).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedFormat { ref extension } if extension == "txt"));
    }

    #[test]
    fn missing_file_is_unreadable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_workbook(&dir.path().join("absent.xlsx")).unwrap_err();
        assert!(matches!(err, LoadError::Unreadable { .. }));
    }

    #[test]
    fn garbage_spreadsheet_is_invalid() {
        let mut file = tempfile::Builder::new()
            .suffix(".xlsx")
            .tempfile()
            .expect("tempfile");
        file.write_all(b"definitely not a zip archive").expect("write");

        let err = load_workbook(file.path()).unwrap_err();
        assert!(matches!(err, LoadError::InvalidWorkbook { .. }));
    }

    #[test]
    fn cell_types_are_guessed_from_text() {
        assert_eq!(guess_cell_type("42"), CellValue::Integer(42));
        assert_eq!(guess_cell_type(" "), CellValue::Null);
        assert_eq!(guess_cell_type("2017-06-01"), CellValue::Date("2017-06-01".into()));
        assert_eq!(guess_cell_type("Windows"), CellValue::String("Windows".into()));
    }
}
