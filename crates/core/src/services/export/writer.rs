//! Format writers for export files.
//!
//! Writers buffer the whole file in memory; the processor hands the finished
//! bytes to the storage backend.

use emporium_common::AppResult;
use emporium_db::entities::export_job::ExportFormat;
use serde_json::{Map, Value};

use super::columns::{ExportColumn, plain_text};

/// Serializes projected rows into one output format.
pub trait FormatWriter: Send {
    /// Write one row; `values` are in column order.
    fn write_row(&mut self, values: Vec<Value>) -> AppResult<()>;

    /// Number of rows written so far.
    fn rows_written(&self) -> u64;

    /// Finish the output and return the file bytes.
    fn finish(self: Box<Self>) -> AppResult<Vec<u8>>;
}

/// Create the writer for `format`.
#[must_use]
pub fn writer_for(format: ExportFormat, columns: &[ExportColumn]) -> Box<dyn FormatWriter> {
    match format {
        ExportFormat::Csv => Box::new(CsvWriter::new(columns)),
        ExportFormat::Json => Box::new(JsonWriter::new(columns)),
    }
}

/// CSV with a header row of column labels.
pub struct CsvWriter {
    buf: String,
    written: u64,
}

impl CsvWriter {
    #[must_use]
    pub fn new(columns: &[ExportColumn]) -> Self {
        let mut buf = String::new();
        push_line(&mut buf, columns.iter().map(|c| escape_csv(&c.label)));
        Self { buf, written: 0 }
    }
}

impl FormatWriter for CsvWriter {
    fn write_row(&mut self, values: Vec<Value>) -> AppResult<()> {
        push_line(
            &mut self.buf,
            values.iter().map(|v| escape_csv(&plain_text(v))),
        );
        self.written += 1;
        Ok(())
    }

    fn rows_written(&self) -> u64 {
        self.written
    }

    fn finish(self: Box<Self>) -> AppResult<Vec<u8>> {
        Ok(self.buf.into_bytes())
    }
}

fn push_line(buf: &mut String, cells: impl Iterator<Item = String>) {
    let line = cells.collect::<Vec<_>>().join(",");
    buf.push_str(&line);
    buf.push('\n');
}

/// Quote a cell when it contains a delimiter, quote or line break.
#[must_use]
pub fn escape_csv(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// JSON array of objects keyed by column key.
pub struct JsonWriter {
    keys: Vec<String>,
    buf: Vec<u8>,
    written: u64,
}

impl JsonWriter {
    #[must_use]
    pub fn new(columns: &[ExportColumn]) -> Self {
        Self {
            keys: columns.iter().map(|c| c.key.clone()).collect(),
            buf: vec![b'['],
            written: 0,
        }
    }
}

impl FormatWriter for JsonWriter {
    fn write_row(&mut self, values: Vec<Value>) -> AppResult<()> {
        let object: Map<String, Value> = self.keys.iter().cloned().zip(values).collect();

        if self.written > 0 {
            self.buf.push(b',');
        }
        serde_json::to_writer(&mut self.buf, &object)?;
        self.written += 1;
        Ok(())
    }

    fn rows_written(&self) -> u64 {
        self.written
    }

    fn finish(self: Box<Self>) -> AppResult<Vec<u8>> {
        let mut buf = self.buf;
        buf.push(b']');
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn columns() -> Vec<ExportColumn> {
        vec![
            ExportColumn::new("id", "ID"),
            ExportColumn::new("name", "Product, name"),
        ]
    }

    #[test]
    fn test_csv_header_uses_labels_and_quotes_cells() {
        let mut writer = writer_for(ExportFormat::Csv, &columns());
        writer
            .write_row(vec![json!(1), json!("Say \"hi\"")])
            .unwrap();
        writer.write_row(vec![Value::Null, json!("a\nb")]).unwrap();

        assert_eq!(writer.rows_written(), 2);
        let csv = String::from_utf8(writer.finish().unwrap()).unwrap();
        assert_eq!(
            csv,
            "ID,\"Product, name\"\n1,\"Say \"\"hi\"\"\"\n,\"a\nb\"\n"
        );
    }

    #[test]
    fn test_json_rows_keyed_by_column_key() {
        let mut writer = writer_for(ExportFormat::Json, &columns());
        writer.write_row(vec![json!("p1"), json!("Shoe")]).unwrap();
        writer.write_row(vec![json!("p2"), Value::Null]).unwrap();

        let parsed: Value = serde_json::from_slice(&writer.finish().unwrap()).unwrap();
        assert_eq!(
            parsed,
            json!([
                { "id": "p1", "name": "Shoe" },
                { "id": "p2", "name": null },
            ])
        );
    }

    #[test]
    fn test_json_empty_export_is_empty_array() {
        let writer = writer_for(ExportFormat::Json, &columns());
        assert_eq!(writer.finish().unwrap(), b"[]");
    }
}
