// 🏗️ Upload Decoders - JSON, delimited and Excel rows → raw candidate records
//
// Uploads arrive as bytes plus a file name. The file name picks the decoder,
// the decoder turns bytes into loosely-typed rows. No normalization happens
// here; that's the reconciler's job.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use serde_json::{Map, Value};
use std::io::Cursor;

use crate::error::{Result, RosterError};

/// One uploaded row: arbitrary keys → JSON values. Discarded after import.
pub type RawCandidateRecord = Map<String, Value>;

// ============================================================================
// SOURCE TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceType {
    /// JSON export (array of player objects, or a single object)
    Json,

    /// Comma-separated spreadsheet export
    Csv,

    /// Tab-separated spreadsheet export
    Tsv,

    /// Excel/OpenDocument workbook (first sheet only)
    Excel,
}

impl SourceType {
    /// Human-readable name for display
    pub fn name(&self) -> &str {
        match self {
            SourceType::Json => "JSON",
            SourceType::Csv => "CSV",
            SourceType::Tsv => "TSV",
            SourceType::Excel => "Excel",
        }
    }

    /// Structured JSON rows are trusted: they may carry aliases and are
    /// imported even without payment info.
    pub fn is_structured_json(&self) -> bool {
        matches!(self, SourceType::Json)
    }
}

/// Detect source type from the uploaded file's extension
pub fn detect_source(filename: &str) -> Result<SourceType> {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "json" => Ok(SourceType::Json),
        "csv" => Ok(SourceType::Csv),
        "tsv" => Ok(SourceType::Tsv),
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(SourceType::Excel),
        _ => Err(RosterError::invalid_format(format!(
            "Unsupported file type: {}",
            filename
        ))),
    }
}

// ============================================================================
// DECODER TRAIT
// ============================================================================

pub trait RowDecoder: Send + Sync {
    /// Decode the whole upload. Any failure rejects the entire batch.
    fn decode(&self, bytes: &[u8]) -> Result<Vec<RawCandidateRecord>>;

    fn source_type(&self) -> SourceType;
}

/// Factory: decoder for a source type
pub fn get_decoder(source_type: SourceType) -> Box<dyn RowDecoder> {
    match source_type {
        SourceType::Json => Box::new(JsonDecoder),
        SourceType::Csv => Box::new(DelimitedDecoder::new(b',', SourceType::Csv)),
        SourceType::Tsv => Box::new(DelimitedDecoder::new(b'\t', SourceType::Tsv)),
        SourceType::Excel => Box::new(ExcelDecoder),
    }
}

/// Detect + decode in one step
pub fn decode_upload(filename: &str, bytes: &[u8]) -> Result<(SourceType, Vec<RawCandidateRecord>)> {
    let source = detect_source(filename)?;
    let rows = get_decoder(source).decode(bytes)?;
    Ok((source, rows))
}

// ============================================================================
// JSON DECODER
// ============================================================================

pub struct JsonDecoder;

impl RowDecoder for JsonDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<RawCandidateRecord>> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|_| RosterError::invalid_format("Invalid JSON file format"))?;

        // A lone object is a batch of one
        let items = match value {
            Value::Array(items) => items,
            other => vec![other],
        };

        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(row) => Ok(row),
                _ => Err(RosterError::invalid_format(format!(
                    "Invalid JSON file format: entry {} is not an object",
                    index
                ))),
            })
            .collect()
    }

    fn source_type(&self) -> SourceType {
        SourceType::Json
    }
}

// ============================================================================
// SPREADSHEET DECODER
// ============================================================================

/// Header row gives the keys; blank cells are left out of the row.
pub struct DelimitedDecoder {
    delimiter: u8,
    source_type: SourceType,
}

impl DelimitedDecoder {
    pub fn new(delimiter: u8, source_type: SourceType) -> Self {
        DelimitedDecoder {
            delimiter,
            source_type,
        }
    }
}

impl RowDecoder for DelimitedDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<RawCandidateRecord>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(self.delimiter)
            .flexible(true)
            .from_reader(bytes);

        let headers = reader
            .headers()
            .map_err(|e| {
                RosterError::invalid_format(format!(
                    "Failed to read {} header row: {}",
                    self.source_type.name(),
                    e
                ))
            })?
            .clone();

        let mut rows = Vec::new();

        for (line_num, result) in reader.records().enumerate() {
            let record = result.map_err(|e| {
                RosterError::invalid_format(format!(
                    "Failed to parse {} line {}: {}",
                    self.source_type.name(),
                    line_num + 2, // +2 because: 1-indexed + header row
                    e
                ))
            })?;

            let mut row = RawCandidateRecord::new();
            for (header, cell) in headers.iter().zip(record.iter()) {
                if header.is_empty() || cell.trim().is_empty() {
                    continue;
                }
                row.insert(header.to_string(), Value::String(cell.to_string()));
            }

            if !row.is_empty() {
                rows.push(row);
            }
        }

        Ok(rows)
    }

    fn source_type(&self) -> SourceType {
        self.source_type
    }
}

// ============================================================================
// EXCEL DECODER
// ============================================================================

/// First worksheet, first row as headers. Same row shape as `DelimitedDecoder`.
pub struct ExcelDecoder;

impl RowDecoder for ExcelDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<RawCandidateRecord>> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .map_err(|e| RosterError::invalid_format(format!("Invalid Excel file: {}", e)))?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| RosterError::invalid_format("Excel file contains no sheets"))?
            .map_err(|e| RosterError::invalid_format(format!("Failed to read Excel sheet: {}", e)))?;

        let mut sheet_rows = range.rows();
        let headers: Vec<String> = match sheet_rows.next() {
            Some(header_row) => header_row
                .iter()
                .map(|cell| cell_value(cell).map(|v| text_of(&v)).unwrap_or_default())
                .collect(),
            None => return Ok(Vec::new()),
        };

        let mut rows = Vec::new();

        for sheet_row in sheet_rows {
            let mut row = RawCandidateRecord::new();
            for (header, cell) in headers.iter().zip(sheet_row.iter()) {
                if header.is_empty() {
                    continue;
                }
                if let Some(value) = cell_value(cell) {
                    row.insert(header.clone(), value);
                }
            }

            if !row.is_empty() {
                rows.push(row);
            }
        }

        Ok(rows)
    }

    fn source_type(&self) -> SourceType {
        SourceType::Excel
    }
}

/// Cell → JSON value. Blank cells are `None`.
fn cell_value(cell: &Data) -> Option<Value> {
    match cell {
        Data::Empty => None,
        Data::String(s) if s.trim().is_empty() => None,
        Data::String(s) => Some(Value::String(s.trim().to_string())),
        // Whole numbers (phone numbers typed into a Zelle column) keep no ".0"
        Data::Float(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(Value::from(*n as i64)),
        Data::Float(n) => Some(Value::from(*n)),
        Data::Int(n) => Some(Value::from(*n)),
        Data::Bool(b) => Some(Value::Bool(*b)),
        other => Some(Value::String(other.to_string())),
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_source_json() {
        assert_eq!(detect_source("players.json").unwrap(), SourceType::Json);
        assert_eq!(detect_source("EXPORT.JSON").unwrap(), SourceType::Json);
    }

    #[test]
    fn test_detect_source_spreadsheet() {
        assert_eq!(detect_source("roster.csv").unwrap(), SourceType::Csv);
        assert_eq!(detect_source("roster.v2.tsv").unwrap(), SourceType::Tsv);
    }

    #[test]
    fn test_detect_source_unknown() {
        let result = detect_source("roster.pdf");
        assert!(matches!(result, Err(RosterError::InvalidFormat(_))));

        assert!(detect_source("no_extension").is_err());
    }

    #[test]
    fn test_detect_source_excel() {
        assert_eq!(detect_source("roster.xlsx").unwrap(), SourceType::Excel);
        assert_eq!(detect_source("Legacy.XLS").unwrap(), SourceType::Excel);
        assert_eq!(detect_source("roster.ods").unwrap(), SourceType::Excel);
        assert!(!SourceType::Excel.is_structured_json());
    }

    #[test]
    fn test_json_array() {
        let rows = JsonDecoder
            .decode(br#"[{"tag":"Foo","venmo":"foo@v"},{"tag":"Bar"}]"#)
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["tag"], "Foo");
        assert_eq!(rows[0]["venmo"], "foo@v");
        assert_eq!(rows[1]["tag"], "Bar");
    }

    #[test]
    fn test_json_single_object_is_batch_of_one() {
        let rows = JsonDecoder.decode(br#"{"tag":"Solo"}"#).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["tag"], "Solo");
    }

    #[test]
    fn test_json_malformed() {
        let result = JsonDecoder.decode(b"[{\"tag\": ");
        assert!(matches!(result, Err(RosterError::InvalidFormat(_))));
    }

    #[test]
    fn test_json_non_object_entry() {
        let result = JsonDecoder.decode(br#"[{"tag":"Foo"}, 42]"#);
        assert!(matches!(result, Err(RosterError::InvalidFormat(_))));
    }

    #[test]
    fn test_csv_rows_skip_blank_cells() {
        let csv = "Tag,Venmo,Paypal,Notes\nMango,@mango,,\nZain,,zain@pp,top 8\n";
        let rows = get_decoder(SourceType::Csv).decode(csv.as_bytes()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Tag"], "Mango");
        assert_eq!(rows[0]["Venmo"], "@mango");
        assert!(!rows[0].contains_key("Paypal"));
        assert_eq!(rows[1]["Paypal"], "zain@pp");
        assert_eq!(rows[1]["Notes"], "top 8");
    }

    #[test]
    fn test_csv_skips_empty_lines_and_short_rows() {
        let csv = "Tag,Venmo\n,\nLucky\n";
        let rows = get_decoder(SourceType::Csv).decode(csv.as_bytes()).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["Tag"], "Lucky");
    }

    #[test]
    fn test_tsv_rows() {
        let tsv = "tag\tzelle\nPlup\tplup@z\n";
        let rows = get_decoder(SourceType::Tsv).decode(tsv.as_bytes()).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["zelle"], "plup@z");
    }

    #[test]
    fn test_decode_upload() {
        let (source, rows) = decode_upload("players.json", br#"[{"tag":"Foo"}]"#).unwrap();
        assert!(source.is_structured_json());
        assert_eq!(rows.len(), 1);

        let (source, _) = decode_upload("players.csv", b"Tag\nFoo\n").unwrap();
        assert!(!source.is_structured_json());
    }

    fn workbook_bytes(rows: &[&[&str]]) -> Vec<u8> {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        for (r, cells) in rows.iter().enumerate() {
            for (c, cell) in cells.iter().enumerate() {
                if !cell.is_empty() {
                    sheet.write_string(r as u32, c as u16, *cell).unwrap();
                }
            }
        }
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_excel_first_sheet_rows() {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Tag").unwrap();
        sheet.write_string(0, 1, "Venmo").unwrap();
        sheet.write_string(0, 2, "Zelle").unwrap();
        sheet.write_string(1, 0, "Mango").unwrap();
        sheet.write_string(1, 1, "@mango").unwrap();
        sheet.write_string(2, 0, "Zain").unwrap();
        sheet.write_number(2, 2, 5551234.0).unwrap();
        let second = workbook.add_worksheet();
        second.write_string(0, 0, "ignored").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let rows = get_decoder(SourceType::Excel).decode(&bytes).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Tag"], "Mango");
        assert_eq!(rows[0]["Venmo"], "@mango");
        assert!(!rows[0].contains_key("Zelle"));
        assert_eq!(rows[1]["Tag"], "Zain");
        assert_eq!(rows[1]["Zelle"], 5551234);
    }

    #[test]
    fn test_excel_skips_blank_rows_and_headerless_columns() {
        let bytes = workbook_bytes(&[
            &["tag", "", "paypal"],
            &["", "", ""],
            &["Plup", "stray", "plup@pp"],
            &["   ", "", ""],
        ]);

        let (source, rows) = decode_upload("roster.xlsx", &bytes).unwrap();

        assert_eq!(source, SourceType::Excel);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 2);
        assert_eq!(rows[0]["paypal"], "plup@pp");
    }

    #[test]
    fn test_excel_garbage_bytes() {
        let result = decode_upload("roster.xlsx", b"definitely not a workbook");
        assert!(matches!(result, Err(RosterError::InvalidFormat(_))));
    }
}
