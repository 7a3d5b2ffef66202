use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, AsArray};
use arrow::datatypes::{
    DataType, Date32Type, Float32Type, Float64Type, Int32Type, Int64Type,
};
use calamine::{Data, Reader, open_workbook_auto};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{CellValue, RawTable, SalesRecord};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a raw sales table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv` / `.tsv` / `.txt` – delimited text, delimiter sniffed from the header
/// * `.json`    – `[{ "ORDERNUMBER": 10107, "SALES": "2871.00", ... }, ...]`
/// * `.parquet` – flat columns of strings, integers, floats or dates
/// * `.xlsx` / `.xlsm` / `.xls` / `.ods` – first worksheet, header in row 1
///
/// Any error here is fatal: no partial table is returned.
pub fn load_file(path: &Path) -> Result<RawTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "csv" | "tsv" | "txt" => load_delimited(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        "xlsx" | "xlsm" | "xls" | "ods" => load_spreadsheet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    if table.columns.is_empty() {
        bail!("{} contains no columns", path.display());
    }
    log::info!(
        "Loaded {} rows with columns {:?} from {}",
        table.len(),
        table.columns,
        path.display()
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// Delimited text loader
// ---------------------------------------------------------------------------

fn load_delimited(path: &Path) -> Result<RawTable> {
    let bytes = std::fs::read(path).context("reading delimited file")?;
    let text = decode_text(bytes);
    parse_delimited(&text)
}

/// Decode as UTF-8, falling back to Latin-1 (every byte maps to the code
/// point of the same value, so this never fails).
fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            log::warn!("File is not valid UTF-8 ({e}); decoding as Latin-1");
            e.into_bytes().iter().map(|&b| b as char).collect()
        }
    }
}

/// Pick the candidate delimiter that occurs most often in the header line.
fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or("");
    [b',', b';', b'\t', b'|']
        .into_iter()
        .max_by_key(|&d| (header.bytes().filter(|&b| b == d).count(), d == b','))
        .unwrap_or(b',')
}

/// Parse delimited text with a header row.  Ragged rows are an error.
pub fn parse_delimited(text: &str) -> Result<RawTable> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let delimiter = sniff_delimiter(text);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut records = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {}", row_no + 1))?;
        let fields: BTreeMap<String, CellValue> = headers
            .iter()
            .zip(record.iter())
            .map(|(col, value)| (col.clone(), guess_cell_type(value)))
            .collect();
        records.push(SalesRecord::new(fields));
    }

    Ok(RawTable::new(headers, records))
}

/// Best-effort typing of a text cell.  Anything that is not an integer or a
/// finite float stays text, so `"1,234.50"` is left for the coercion stage.
fn guess_cell_type(s: &str) -> CellValue {
    if s.trim().is_empty() {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    match s.parse::<f64>() {
        Ok(f) if f.is_finite() => CellValue::Float(f),
        _ => CellValue::Text(s.to_string()),
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, e.g. `df.to_json(orient='records')`:
///
/// ```json
/// [
///   { "ORDERNUMBER": 10107, "SALES": 2871.0, "COUNTRY": "USA" },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<RawTable> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    parse_json(&text)
}

pub fn parse_json(text: &str) -> Result<RawTable> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;

    let rows = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut columns: Vec<String> = Vec::new();
    let mut records = Vec::with_capacity(rows.len());

    for (i, row) in rows.iter().enumerate() {
        let obj = row
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let mut fields = BTreeMap::new();
        for (key, val) in obj {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
            fields.insert(key.clone(), json_to_cell(val));
        }
        records.push(SalesRecord::new(fields));
    }

    Ok(RawTable::new(columns, records))
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) if s.trim().is_empty() => CellValue::Null,
        JsonValue::String(s) => CellValue::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Text(b.to_string()),
        JsonValue::Null => CellValue::Null,
        other => CellValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a flat Parquet file, e.g. written by `df.to_parquet()` or by the
/// `generate-sample` binary.  Every column becomes a table column.
fn load_parquet(path: &Path) -> Result<RawTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            let fields: BTreeMap<String, CellValue> = columns
                .iter()
                .enumerate()
                .map(|(idx, name)| (name.clone(), extract_cell(batch.column(idx), row)))
                .collect();
            records.push(SalesRecord::new(fields));
        }
    }

    Ok(RawTable::new(columns, records))
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &Arc<dyn Array>, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Null;
    }
    match col.data_type() {
        DataType::Utf8 => text_cell(col.as_string::<i32>().value(row)),
        DataType::LargeUtf8 => text_cell(col.as_string::<i64>().value(row)),
        DataType::Int32 => CellValue::Integer(col.as_primitive::<Int32Type>().value(row) as i64),
        DataType::Int64 => CellValue::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::Float32 => float_cell(col.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => float_cell(col.as_primitive::<Float64Type>().value(row)),
        DataType::Date32 => col
            .as_primitive::<Date32Type>()
            .value_as_date(row)
            .map(CellValue::Date)
            .unwrap_or(CellValue::Null),
        DataType::Boolean => CellValue::Text(col.as_boolean().value(row).to_string()),
        other => CellValue::Text(format!("{other:?}")),
    }
}

/// pandas writes missing floats as NaN.
fn float_cell(f: f64) -> CellValue {
    if f.is_finite() {
        CellValue::Float(f)
    } else {
        CellValue::Null
    }
}

fn text_cell(s: &str) -> CellValue {
    if s.trim().is_empty() {
        CellValue::Null
    } else {
        CellValue::Text(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Spreadsheet loader
// ---------------------------------------------------------------------------

/// First worksheet of an Excel / ODS workbook; row 1 is the header.
fn load_spreadsheet(path: &Path) -> Result<RawTable> {
    let mut workbook = open_workbook_auto(path).context("opening workbook")?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .context("workbook has no worksheets")?;
    let range = workbook
        .worksheet_range(&sheet)
        .with_context(|| format!("reading worksheet '{sheet}'"))?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(RawTable::default());
    };
    let headers: Vec<String> = header_row
        .iter()
        .map(|c| c.to_string().trim().to_string())
        .collect();

    let records: Vec<SalesRecord> = rows
        .map(|row| {
            headers
                .iter()
                .zip(row.iter())
                .map(|(col, cell)| (col.clone(), spreadsheet_cell(cell)))
                .collect::<SalesRecord>()
        })
        .collect();

    Ok(RawTable::new(headers, records))
}

fn spreadsheet_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Integer(*i),
        // Spreadsheets store every number as a float; keep ids integral.
        Data::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => CellValue::Integer(*f as i64),
        Data::Float(f) => CellValue::Float(*f),
        Data::String(s) => text_cell(s),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| CellValue::Date(d.date()))
            .unwrap_or(CellValue::Null),
        Data::DateTimeIso(s) | Data::DurationIso(s) => text_cell(s),
        Data::Error(_) | Data::Empty => CellValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Write;

    const SAMPLE: &str = "\
ORDERNUMBER,QUANTITYORDERED,SALES,ORDERDATE,COUNTRY
10107,30,2871.00,2/24/2003 0:00,USA
10121,34,\"1,234.50\",5/7/2003 0:00,France
10134,,3746.70,7/1/2003 0:00,
";

    #[test]
    fn parses_and_guesses_types() {
        let table = parse_delimited(SAMPLE).unwrap();
        assert_eq!(table.columns.len(), 5);
        assert_eq!(table.len(), 3);
        let first = &table.records[0];
        assert_eq!(first.get("ORDERNUMBER"), &CellValue::Integer(10107));
        assert_eq!(first.get("SALES"), &CellValue::Float(2871.0));
        assert_eq!(first.get("ORDERDATE"), &CellValue::Text("2/24/2003 0:00".into()));
        assert_eq!(table.records[1].get("SALES"), &CellValue::Text("1,234.50".into()));
        assert!(table.records[2].get("QUANTITYORDERED").is_null());
        assert!(table.records[2].get("COUNTRY").is_null());
    }

    #[test]
    fn sniffs_semicolons() {
        let table = parse_delimited("A;B\n1;2,5\n").unwrap();
        assert_eq!(table.columns, vec!["A", "B"]);
        assert_eq!(table.records[0].get("B"), &CellValue::Text("2,5".into()));
    }

    #[test]
    fn ragged_rows_are_fatal() {
        assert!(parse_delimited("A,B\n1,2\n3\n").is_err());
    }

    #[test]
    fn latin1_file_is_decoded() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        // "CUSTOMERNAME\nCafé" with a Latin-1 é (0xE9)
        file.write_all(b"CUSTOMERNAME\nCaf\xe9\n").unwrap();
        let table = load_file(file.path()).unwrap();
        assert_eq!(table.records[0].get("CUSTOMERNAME"), &CellValue::Text("Café".into()));
    }

    #[test]
    fn json_records_are_loaded() {
        let table = parse_json(
            r#"[{"ORDERNUMBER": 1, "SALES": 10.5, "COUNTRY": "USA"},
                {"ORDERNUMBER": 2, "SALES": null, "COUNTRY": ""}]"#,
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.records[0].get("SALES"), &CellValue::Float(10.5));
        assert!(table.records[1].get("SALES").is_null());
        assert!(table.records[1].get("COUNTRY").is_null());
    }

    fn write_parquet(path: &Path) {
        use arrow::array::{ArrayRef, Date32Array, Float64Array, Int64Array, StringArray};
        use arrow::datatypes::{Field, Schema};
        use arrow::record_batch::RecordBatch;
        use parquet::arrow::ArrowWriter;

        let columns: Vec<(&str, ArrayRef)> = vec![
            ("ORDERNUMBER", Arc::new(Int64Array::from(vec![10107, 10107, 10121])) as ArrayRef),
            ("COUNTRY", Arc::new(StringArray::from(vec![Some("USA"), Some("USA"), None])) as ArrayRef),
            ("MONTH_ID", Arc::new(Float64Array::from(vec![f64::NAN, f64::NAN, 5.0])) as ArrayRef),
            // 2003-02-24, 2003-02-24, 2003-05-07
            ("ORDERDATE", Arc::new(Date32Array::from(vec![12107, 12107, 12179])) as ArrayRef),
        ];
        let schema = Arc::new(Schema::new(
            columns
                .iter()
                .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
                .collect::<Vec<_>>(),
        ));
        let batch =
            RecordBatch::try_new(schema.clone(), columns.into_iter().map(|(_, a)| a).collect()).unwrap();
        let file = std::fs::File::create(path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn parquet_columns_keep_their_types() {
        let file = tempfile::Builder::new().suffix(".parquet").tempfile().unwrap();
        write_parquet(file.path());
        let table = load_file(file.path()).unwrap();

        assert_eq!(table.columns, vec!["ORDERNUMBER", "COUNTRY", "MONTH_ID", "ORDERDATE"]);
        assert_eq!(table.len(), 3);
        let first = &table.records[0];
        assert_eq!(first.get("ORDERNUMBER"), &CellValue::Integer(10107));
        assert_eq!(first.get("COUNTRY"), &CellValue::Text("USA".into()));
        assert!(first.get("MONTH_ID").is_null());
        assert_eq!(
            first.get("ORDERDATE"),
            &CellValue::Date(NaiveDate::from_ymd_opt(2003, 2, 24).unwrap())
        );
        let last = &table.records[2];
        assert!(last.get("COUNTRY").is_null());
        assert_eq!(last.get("MONTH_ID"), &CellValue::Float(5.0));
        assert_eq!(
            last.get("ORDERDATE"),
            &CellValue::Date(NaiveDate::from_ymd_opt(2003, 5, 7).unwrap())
        );
    }

    #[test]
    fn identical_parquet_rows_with_missing_floats_dedup() {
        let file = tempfile::Builder::new().suffix(".parquet").tempfile().unwrap();
        write_parquet(file.path());
        let raw = load_file(file.path()).unwrap();
        let (unique, removed) = crate::clean::integrity::dedup(raw.records);
        assert_eq!(removed, 1);
        assert_eq!(unique.len(), 2);
    }

    #[test]
    fn spreadsheet_cells_map_to_cell_values() {
        use calamine::{CellErrorType, ExcelDateTime, ExcelDateTimeType};

        assert_eq!(spreadsheet_cell(&Data::Float(2003.0)), CellValue::Integer(2003));
        assert_eq!(spreadsheet_cell(&Data::Float(95.7)), CellValue::Float(95.7));
        assert_eq!(spreadsheet_cell(&Data::Int(42)), CellValue::Integer(42));
        assert_eq!(spreadsheet_cell(&Data::String(" ".into())), CellValue::Null);
        assert_eq!(spreadsheet_cell(&Data::String("Trains".into())), CellValue::Text("Trains".into()));
        assert_eq!(spreadsheet_cell(&Data::Empty), CellValue::Null);
        assert_eq!(spreadsheet_cell(&Data::Error(CellErrorType::Div0)), CellValue::Null);

        // Excel serial 37676 is 2003-02-24
        let serial = ExcelDateTime::new(37676.0, ExcelDateTimeType::DateTime, false);
        assert_eq!(
            spreadsheet_cell(&Data::DateTime(serial)),
            CellValue::Date(NaiveDate::from_ymd_opt(2003, 2, 24).unwrap())
        );
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let file = tempfile::Builder::new().suffix(".bin").tempfile().unwrap();
        assert!(load_file(file.path()).is_err());
    }

    #[test]
    fn headerless_file_is_rejected() {
        let file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        assert!(load_file(file.path()).is_err());
    }
}
