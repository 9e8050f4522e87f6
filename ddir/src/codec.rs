//! Textual diff-file format
//!
//! One record per line: `{type}:{kind}:{source}:{destination}`, where the
//! type is one of `+ - > < ?` and the kind is `f` or `d`. Paths may contain
//! the separator, so inside path fields `\` is written `\\` and `:` is
//! written `\:`; the decoder splits on unescaped separators only, which
//! makes the round trip bijective for any path.
//!
//! Blank lines are ignored on decode. Any other malformed line is a decode
//! error carrying the 1-based line number and the offending content; lines
//! are never silently skipped. Encoding never reorders records.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use crate::diff::{DiffRecord, DiffType};
use crate::element::ElementKind;
use crate::error::{DdirError, Result};

/// Encode a single record as one line, without the trailing newline
pub fn encode_record(record: &DiffRecord) -> String {
    format!(
        "{}:{}:{}:{}",
        record.diff_type.symbol(),
        record.kind.symbol(),
        escape(&record.source),
        escape(&record.destination),
    )
}

/// Decode a single line. `line_number` is 1-based and used in errors only.
pub fn decode_record(line: &str, line_number: usize) -> Result<DiffRecord> {
    let malformed = |message: &str| DdirError::codec_error(line_number, line, message);

    let fields = split_fields(line).ok_or_else(|| malformed("invalid escape sequence"))?;

    if fields.len() != 4 {
        return Err(malformed(
            "format is <type>:<element kind>:<source path>:<destination path>",
        ));
    }

    let diff_type = single_symbol(&fields[0])
        .and_then(DiffType::from_symbol)
        .ok_or_else(|| malformed("diff type must be one of + - > < ?"))?;

    let kind = single_symbol(&fields[1])
        .and_then(ElementKind::from_symbol)
        .ok_or_else(|| malformed("element kind must be f or d"))?;

    if fields[2].is_empty() || fields[3].is_empty() {
        return Err(malformed("paths must not be empty"));
    }

    Ok(DiffRecord::new(
        diff_type,
        kind,
        PathBuf::from(&fields[2]),
        PathBuf::from(&fields[3]),
    ))
}

/// Encode an ordered sequence of records into diff-file text
pub fn encode(records: &[DiffRecord]) -> String {
    let mut text = String::new();
    for record in records {
        text.push_str(&encode_record(record));
        text.push('\n');
    }
    text
}

/// Decode diff-file text into an ordered sequence of records
pub fn decode(text: &str) -> Result<Vec<DiffRecord>> {
    let mut records = Vec::new();

    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        records.push(decode_record(line, index + 1)?);
    }

    Ok(records)
}

/// Write an ordered sequence of records to a diff file
pub async fn write_diff_file(path: &Path, records: &[DiffRecord]) -> Result<()> {
    fs::write(path, encode(records))
        .await
        .map_err(|e| DdirError::path_error(path, format!("failed to write diff file: {e}")))?;

    debug!("wrote {} records to {:?}", records.len(), path);
    Ok(())
}

/// Read an ordered sequence of records from a diff file
pub async fn read_diff_file(path: &Path) -> Result<Vec<DiffRecord>> {
    let text = fs::read_to_string(path)
        .await
        .map_err(|e| DdirError::path_error(path, format!("failed to read diff file: {e}")))?;

    decode(&text)
}

fn escape(path: &Path) -> String {
    let mut escaped = String::new();
    for c in path.to_string_lossy().chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            ':' => escaped.push_str("\\:"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Split a line on unescaped separators, unescaping the fields. Returns None
/// on a dangling or unknown escape.
fn split_fields(line: &str) -> Option<Vec<String>> {
    let mut fields = vec![String::new()];
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped @ (':' | '\\')) => fields.last_mut()?.push(escaped),
                _ => return None,
            },
            ':' => fields.push(String::new()),
            _ => fields.last_mut()?.push(c),
        }
    }

    Some(fields)
}

fn single_symbol(field: &str) -> Option<char> {
    let mut chars = field.chars();
    let symbol = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    Some(symbol)
}
