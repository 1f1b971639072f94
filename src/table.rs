// 📄 Table I/O - delimited text in, delimited text out
// Accrual and Weekly Audit extracts arrive as CSV, TSV or pipe files, often
// exported from Excel in Windows-1252. Every cell is read as text so codes like
// "061R" and account numbers keep their exact spelling.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::error::{CodingError, Result};

/// One input row: column name → cell text
pub type Row = HashMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Table {
            headers,
            rows: Vec::new(),
        }
    }

    /// Read a delimited file, sniffing the delimiter and decoding legacy encodings
    pub fn read(path: &Path) -> Result<Table> {
        let content = read_file_as_utf8(path)?;
        let name = path.display().to_string();
        Table::parse(&content, &name)
    }

    /// Parse delimited text; `name` is only used in error messages
    pub fn parse(content: &str, name: &str) -> Result<Table> {
        let content = content.strip_prefix('\u{FEFF}').unwrap_or(content);
        let delimiter = sniff_delimiter(content);

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|source| CodingError::Csv {
                table: name.to_string(),
                source,
            })?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut table = Table::new(unique_headers(headers, name));
        for result in reader.records() {
            let record = result.map_err(|source| CodingError::Csv {
                table: name.to_string(),
                source,
            })?;

            // Skip fully empty lines that spreadsheets leave at the bottom
            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }

            let row: Row = table
                .headers
                .iter()
                .enumerate()
                .map(|(i, header)| {
                    (header.clone(), record.get(i).unwrap_or("").to_string())
                })
                .collect();
            table.rows.push(row);
        }

        Ok(table)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column)
    }

    /// Fail with `MissingColumn` unless `column` is present
    pub fn require_column(&self, table: &str, column: &str) -> Result<()> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(CodingError::MissingColumn {
                table: table.to_string(),
                column: column.to_string(),
            })
        }
    }

    /// First candidate present as a header: exact match first, then case-insensitive
    pub fn find_column(&self, candidates: &[&str]) -> Option<String> {
        for candidate in candidates {
            if self.has_column(candidate) {
                return Some(candidate.to_string());
            }
        }
        for candidate in candidates {
            if let Some(header) = self
                .headers
                .iter()
                .find(|h| h.eq_ignore_ascii_case(candidate))
            {
                return Some(header.clone());
            }
        }
        None
    }

    /// Rename headers matched case-insensitively against `mapping` keys
    pub fn rename_columns(&mut self, mapping: &[(&str, &str)]) {
        for (from, to) in mapping {
            let Some(actual) = self
                .headers
                .iter()
                .find(|h| h.eq_ignore_ascii_case(from))
                .cloned()
            else {
                continue;
            };
            if actual == *to {
                continue;
            }

            for header in self.headers.iter_mut() {
                if *header == actual {
                    *header = to.to_string();
                }
            }
            for row in self.rows.iter_mut() {
                if let Some(value) = row.remove(&actual) {
                    row.insert(to.to_string(), value);
                }
            }
        }
    }

    /// Append any missing columns as blank cells
    pub fn ensure_columns(&mut self, columns: &[&str]) {
        for column in columns {
            if self.has_column(column) {
                continue;
            }
            self.headers.push(column.to_string());
            for row in self.rows.iter_mut() {
                row.insert(column.to_string(), String::new());
            }
        }
    }

    /// Write as comma-separated UTF-8, quoting only where needed
    pub fn write(&self, path: &Path) -> Result<()> {
        let name = path.display().to_string();
        let csv_err = |source| CodingError::Csv {
            table: name.clone(),
            source,
        };

        let mut writer = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Necessary)
            .from_path(path)
            .map_err(csv_err)?;

        writer.write_record(&self.headers).map_err(csv_err)?;
        for row in &self.rows {
            let record: Vec<&str> = self
                .headers
                .iter()
                .map(|h| row.get(h).map(|v| v.as_str()).unwrap_or(""))
                .collect();
            writer.write_record(&record).map_err(csv_err)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Field delimiters tried in order; ties keep the earlier one
const DELIMITERS: [u8; 4] = [b',', b'\t', b';', b'|'];

/// Records looked at when choosing a delimiter
const SNIFF_RECORDS: usize = 20;

/// Pick the delimiter that splits the header into named columns and keeps
/// the data rows at the header's width.
///
/// The sample goes through the csv reader, so quoted delimiters and quoted
/// newlines don't skew the count. Blank lines and a BOM are ignored.
pub fn sniff_delimiter(content: &str) -> u8 {
    let content = content.trim_start_matches('\u{FEFF}');

    let mut best = DELIMITERS[0];
    let mut best_score = 0usize;

    for delim in DELIMITERS {
        let widths: Vec<(usize, bool)> = csv::ReaderBuilder::new()
            .delimiter(delim)
            .has_headers(false)
            .flexible(true)
            .from_reader(content.as_bytes())
            .records()
            .map_while(|r| r.ok())
            .filter(|r| r.iter().any(|f| !f.trim().is_empty()))
            .take(SNIFF_RECORDS)
            .map(|r| (r.len(), r.iter().all(|f| !f.trim().is_empty())))
            .collect();

        let Some(&(header_width, named)) = widths.first() else {
            continue;
        };
        if header_width <= 1 {
            continue;
        }

        let agreeing = widths[1..].iter().filter(|(w, _)| *w == header_width).count();
        let header_weight = if named { 2 } else { 1 };
        let score = header_width * (1 + agreeing) * header_weight;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Suffix repeated header names with `.1`, `.2`, ... so no column is lost
fn unique_headers(headers: Vec<String>, name: &str) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut unique = Vec::with_capacity(headers.len());

    for header in headers {
        if seen.insert(header.clone()) {
            unique.push(header);
            continue;
        }
        let mut n = 1;
        let renamed = loop {
            let candidate = format!("{}.{}", header, n);
            if !seen.contains(&candidate) {
                break candidate;
            }
            n += 1;
        };
        warn!(table = %name, header = %header, renamed = %renamed, "repeated header renamed");
        seen.insert(renamed.clone());
        unique.push(renamed);
    }

    unique
}

/// Read a file as UTF-8, falling back to Windows-1252 for Excel exports
pub fn read_file_as_utf8(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
