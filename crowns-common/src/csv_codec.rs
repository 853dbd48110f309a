//! Semicolon-delimited table import/export
//!
//! The import format is a delimited text table whose first row is a header.
//! Columns are located by their (trimmed, case-sensitive) header label, so
//! column order and extra columns do not matter. Every following row yields
//! a [`Candidate`]; rows with a blank name are skipped without consuming an
//! ordinal.
//!
//! Export writes the same three columns back in collection order, so a
//! decode of an export reproduces the `(name, small, large)` triples.

use serde::Deserialize;
use std::borrow::Cow;
use thiserror::Error;

use crate::record::Collection;

/// Field delimiter of the import/export format
pub const DEFAULT_DELIMITER: char = ';';

/// Suggested export name when the collection was never imported from a file
pub const DEFAULT_EXPORT_NAME: &str = "coronas_actualizado.csv";

/// Suffix appended to the import file stem for exports
pub const EXPORT_SUFFIX: &str = "_actualizado.csv";

/// Errors raised while turning an uploaded table into candidates
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("input has no header row")]
    EmptyInput,

    #[error("input is not valid UTF-8")]
    InvalidUtf8,

    #[error("header has no \"{0}\" column")]
    MissingColumn(String),

    #[error("row {row}: quoted field is never closed")]
    UnterminatedQuote { row: usize },

    #[error("row {row}: unexpected character after closing quote")]
    InvalidQuote { row: usize },

    #[error("row {row}: expected {expected} fields, found {found}")]
    FieldCount {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// How uploaded bytes become text before tokenizing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    /// Western single-byte text as spreadsheet exports write it: ISO-8859-1
    /// with the windows-1252 punctuation in 0x80..=0x9F
    #[default]
    #[serde(alias = "windows-1252")]
    Latin1,
    /// Strict UTF-8
    Utf8,
    /// UTF-8 when the bytes are valid UTF-8, Latin-1 otherwise
    Auto,
}

/// Decode raw upload bytes into text
pub fn decode_text(bytes: &[u8], encoding: TextEncoding) -> Result<String, DecodeError> {
    let text = match encoding {
        TextEncoding::Latin1 => latin1(bytes),
        TextEncoding::Utf8 => std::str::from_utf8(bytes)
            .map_err(|_| DecodeError::InvalidUtf8)?
            .to_string(),
        TextEncoding::Auto => match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => latin1(bytes),
        },
    };
    Ok(match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text,
    })
}

fn latin1(bytes: &[u8]) -> String {
    encoding_rs::WINDOWS_1252
        .decode_without_bom_handling(bytes)
        .0
        .into_owned()
}

/// A decoded row before it is reconciled into a [`Record`](crate::Record)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub name: String,
    pub small: bool,
    pub large: bool,
}

impl Candidate {
    pub fn new(name: impl Into<String>, small: bool, large: bool) -> Self {
        Self {
            name: name.into(),
            small,
            large,
        }
    }
}

/// Header labels recognized by the codec
///
/// Read from the `[columns]` table of the config file; missing keys keep
/// their default label.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ColumnLabels {
    pub name: String,
    pub small: String,
    pub large: String,
}

impl Default for ColumnLabels {
    fn default() -> Self {
        Self {
            name: "Monstruo".to_string(),
            small: "Corona Pequeña".to_string(),
            large: "Corona Grande".to_string(),
        }
    }
}

/// Truthiness of a flag cell: exactly `1` or `true`
pub fn is_truthy(cell: &str) -> bool {
    cell == "1" || cell == "true"
}

/// Truthiness of a stored flag, accepting native booleans and numbers too
pub fn is_truthy_value(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64() == Some(1.0),
        serde_json::Value::String(s) => is_truthy(s),
        _ => false,
    }
}

/// Table codec bound to a delimiter and set of column labels
#[derive(Debug, Clone)]
pub struct CsvCodec {
    delimiter: char,
    labels: ColumnLabels,
}

impl Default for CsvCodec {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITER, ColumnLabels::default())
    }
}

impl CsvCodec {
    pub fn new(delimiter: char, labels: ColumnLabels) -> Self {
        Self { delimiter, labels }
    }

    /// Parse a table into candidates, in row order
    pub fn decode(&self, text: &str) -> Result<Vec<Candidate>, DecodeError> {
        let mut rows = tokenize(text, self.delimiter)?.into_iter();
        let (_, header) = rows.next().ok_or(DecodeError::EmptyInput)?;
        let header: Vec<&str> = header.iter().map(|h| h.trim()).collect();

        let column = |label: &str| header.iter().position(|h| *h == label);
        let name_col = column(&self.labels.name)
            .ok_or_else(|| DecodeError::MissingColumn(self.labels.name.clone()))?;
        let small_col = column(&self.labels.small);
        let large_col = column(&self.labels.large);

        let mut candidates = Vec::new();
        for (row_number, row) in rows {
            if row.len() != header.len() {
                return Err(DecodeError::FieldCount {
                    row: row_number,
                    expected: header.len(),
                    found: row.len(),
                });
            }

            let name = row[name_col].trim();
            if name.is_empty() {
                continue;
            }

            let flag = |col: Option<usize>| col.map_or(false, |i| is_truthy(&row[i]));
            candidates.push(Candidate {
                name: name.to_string(),
                small: flag(small_col),
                large: flag(large_col),
            });
        }

        Ok(candidates)
    }

    /// Render a collection as a table with the recognized header
    pub fn encode(&self, collection: &Collection) -> String {
        let delimiter = self.delimiter.to_string();
        let mut lines = Vec::with_capacity(collection.len() + 1);

        lines.push(
            [&self.labels.name, &self.labels.small, &self.labels.large]
                .iter()
                .map(|label| self.escape(label))
                .collect::<Vec<_>>()
                .join(&delimiter),
        );

        for record in collection {
            lines.push(format!(
                "{name}{d}{small}{d}{large}",
                name = self.escape(&record.name),
                d = delimiter,
                small = u8::from(record.small),
                large = u8::from(record.large),
            ));
        }

        lines.join("\n")
    }

    fn escape<'a>(&self, value: &'a str) -> Cow<'a, str> {
        if value.contains(self.delimiter)
            || value.contains('"')
            || value.contains('\n')
            || value.contains('\r')
        {
            Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
        } else {
            Cow::Borrowed(value)
        }
    }
}

/// Suggested download name for an export
///
/// Strips a trailing `.csv` (any case) from the imported file name and
/// appends [`EXPORT_SUFFIX`].
pub fn export_file_name(imported: &str) -> String {
    if imported.is_empty() {
        return DEFAULT_EXPORT_NAME.to_string();
    }
    let stem = match imported.len().checked_sub(4) {
        Some(cut) if imported.is_char_boundary(cut) && imported[cut..].eq_ignore_ascii_case(".csv") => {
            &imported[..cut]
        }
        _ => imported,
    };
    format!("{}{}", stem, EXPORT_SUFFIX)
}

/// Split text into rows of fields, tagging each row with its starting line
///
/// Blank lines are skipped. Line breaks inside quoted fields are kept.
fn tokenize(text: &str, delimiter: char) -> Result<Vec<(usize, Vec<String>)>, DecodeError> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut chars = text.chars().peekable();

    let mut line = 1;
    let mut row_line = 1;
    let mut at_field_start = true;
    let mut row_quoted = false;

    while let Some(c) = chars.next() {
        if at_field_start && c == '"' {
            row_quoted = true;
            loop {
                match chars.next() {
                    None => return Err(DecodeError::UnterminatedQuote { row: row_line }),
                    Some('"') if chars.peek() == Some(&'"') => {
                        chars.next();
                        field.push('"');
                    }
                    Some('"') => break,
                    Some(ch) => {
                        if ch == '\n' {
                            line += 1;
                        }
                        field.push(ch);
                    }
                }
            }
            match chars.peek() {
                None => {}
                Some(&next) if next == delimiter || next == '\n' || next == '\r' => {}
                Some(_) => return Err(DecodeError::InvalidQuote { row: row_line }),
            }
            at_field_start = false;
            continue;
        }

        if c == delimiter {
            row.push(std::mem::take(&mut field));
            at_field_start = true;
        } else if c == '\n' || c == '\r' {
            if c == '\r' && chars.peek() == Some(&'\n') {
                chars.next();
            }
            row.push(std::mem::take(&mut field));
            push_row(&mut rows, std::mem::take(&mut row), row_line, row_quoted);

            line += 1;
            row_line = line;
            at_field_start = true;
            row_quoted = false;
        } else {
            field.push(c);
            at_field_start = false;
        }
    }

    if !row.is_empty() || !field.is_empty() || !at_field_start {
        row.push(field);
        push_row(&mut rows, row, row_line, row_quoted);
    }

    Ok(rows)
}

fn push_row(rows: &mut Vec<(usize, Vec<String>)>, row: Vec<String>, line: usize, quoted: bool) {
    let blank = !quoted && row.len() == 1 && row[0].is_empty();
    if !blank {
        rows.push((line, row));
    }
}
