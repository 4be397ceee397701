/// Ingestion of pre-existing tabular data.
///
/// Rows of cell text become positional records (or named records when a CSV
/// header is present). Unless `force_strings` is set, each column is tested
/// once: when every value in it parses as a number, the whole column is
/// converted to numbers.

use crate::error::{Error, Result};
use crate::record::Record;
use crate::value::{parse_number, CellValue, ColumnType};

/// Turn rows of cell text into positional records.
///
/// # Examples
///
/// ```
/// use datatable::ingest::ingest_rows;
/// use datatable::CellValue;
///
/// let rows = vec![
///     vec!["3".to_string(), "apple".to_string()],
///     vec!["10".to_string(), "banana".to_string()],
/// ];
/// let records = ingest_rows(rows, false);
/// assert_eq!(records[0].get("0"), Some(&CellValue::Number(3.0)));
/// assert_eq!(records[1].get("1"), Some(&CellValue::Text("banana".into())));
/// ```
pub fn ingest_rows(rows: Vec<Vec<String>>, force_strings: bool) -> Vec<Record> {
    let types = column_types(&rows, force_strings);
    rows.into_iter()
        .map(|row| {
            Record::from_cells(
                row.into_iter()
                    .enumerate()
                    .map(|(i, text)| convert_cell(text, types.get(i).copied())),
            )
        })
        .collect()
}

/// Parse CSV text. With `has_header` the first line names the fields.
///
/// Empty lines are skipped. A data row with more cells than the header is
/// rejected.
pub fn ingest_csv(csv: &str, has_header: bool, force_strings: bool) -> Result<Vec<Record>> {
    let mut rows: Vec<Vec<String>> = split_csv(csv)?
        .into_iter()
        .filter(|row| !row.iter().all(|f| f.is_empty()))
        .collect();

    if !has_header {
        return Ok(ingest_rows(rows, force_strings));
    }

    if rows.is_empty() {
        return Err(Error::Parse("CSV is empty".to_string()));
    }
    let header = rows.remove(0);

    for (i, row) in rows.iter().enumerate() {
        if row.len() > header.len() {
            return Err(Error::Parse(format!(
                "Row {}: {} values for {} header columns",
                i + 1,
                row.len(),
                header.len()
            )));
        }
    }

    let types = column_types(&rows, force_strings);
    Ok(rows
        .into_iter()
        .map(|row| {
            let mut record = Record::new();
            for (i, name) in header.iter().enumerate() {
                let text = row.get(i).cloned().unwrap_or_default();
                record.set(name.clone(), convert_cell(text, types.get(i).copied()));
            }
            record
        })
        .collect())
}

/// Parse a JSON array of objects or arrays into records.
pub fn ingest_json(json: &str) -> Result<Vec<Record>> {
    let parsed: Vec<serde_json::Value> = serde_json::from_str(json)?;
    parsed.iter().map(Record::from_json).collect()
}

/// Decide, per column, whether every value is numeric.
fn column_types(rows: &[Vec<String>], force_strings: bool) -> Vec<ColumnType> {
    let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    if force_strings || rows.is_empty() {
        return vec![ColumnType::Text; width];
    }

    (0..width)
        .map(|col| {
            let numeric = rows.iter().all(|row| {
                row.get(col)
                    .map(|text| parse_number(text).is_some())
                    .unwrap_or(false)
            });
            if numeric {
                ColumnType::Number
            } else {
                ColumnType::Text
            }
        })
        .collect()
}

fn convert_cell(text: String, column_type: Option<ColumnType>) -> CellValue {
    match column_type {
        Some(ColumnType::Number) => match parse_number(&text) {
            Some(n) => CellValue::Number(n),
            None => CellValue::detect(text),
        },
        _ => CellValue::detect(text),
    }
}

/// Position of the CSV scanner relative to quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    Unquoted,
    Quoted,
    /// A quote inside a quoted field: either its end or the first half of `""`.
    QuoteSeen,
}

/// Split CSV text into rows of fields. Quoted fields may contain commas, line
/// breaks and doubled quotes; a quote that is never closed is an error.
fn split_csv(csv: &str) -> Result<Vec<Vec<String>>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut scan = Scan::Unquoted;
    let mut line = 1;
    let mut opened_on = 0;

    for c in csv.chars() {
        scan = match (scan, c) {
            (Scan::Quoted, '"') => Scan::QuoteSeen,
            (Scan::Quoted, _) => {
                if c == '\n' {
                    line += 1;
                }
                field.push(c);
                Scan::Quoted
            }
            (Scan::QuoteSeen, '"') => {
                field.push('"');
                Scan::Quoted
            }
            (_, '"') if field.is_empty() => {
                opened_on = line;
                Scan::Quoted
            }
            (_, ',') => {
                row.push(std::mem::take(&mut field));
                Scan::Unquoted
            }
            (_, '\n') => {
                line += 1;
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
                Scan::Unquoted
            }
            (_, '\r') => Scan::Unquoted,
            _ => {
                field.push(c);
                Scan::Unquoted
            }
        };
    }

    if scan == Scan::Quoted {
        return Err(Error::Parse(format!("unterminated quoted field opened on line {}", opened_on)));
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }
    Ok(rows)
}
