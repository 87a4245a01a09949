//! Shared CSV read/write helpers for the tabular stores.
//!
//! Hand-rolled in the teacher's `export.rs` style (quote-doubling
//! escape, no external CSV crate) rather than a dependency, since no
//! CSV crate appears anywhere in the retrieved example pack. Every
//! field is always quoted, so fields may contain embedded `,` and `"`
//! (doubled) as well as embedded `\n`/`\r\n` — `Chunk.content` and
//! `Fact.original_text` routinely do, since the chunker preserves
//! paragraph/line separators. `read_rows` therefore parses the whole
//! file as one character stream rather than line-by-line, tracking
//! quote state across physical newlines so an embedded newline inside
//! a quoted field never looks like a record boundary.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use crate::error::{FactCheckError, Result};

/// Escape a field for inclusion in a quoted CSV cell.
pub fn escape_csv(s: &str) -> String {
    s.replace('"', "\"\"")
}

/// Write `"a","b","c"` style quoted rows, one per record, with a header line.
pub fn write_rows(path: &Path, header: &str, rows: &[Vec<String>]) -> Result<()> {
    let file = File::create(path).map_err(FactCheckError::Io)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "{header}").map_err(FactCheckError::Io)?;
    for row in rows {
        let quoted: Vec<String> = row.iter().map(|f| format!("\"{}\"", escape_csv(f))).collect();
        writeln!(writer, "{}", quoted.join(",")).map_err(FactCheckError::Io)?;
    }
    Ok(())
}

/// Parse a quoted-CSV file back into raw field vectors, skipping the
/// header line. Fields may contain embedded commas, quotes, and
/// newlines, since every field is always written fully quoted.
pub fn read_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    if !path.exists() {
        return Ok(vec![]);
    }
    let mut file = File::open(path).map_err(FactCheckError::Io)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents).map_err(FactCheckError::Io)?;

    let body = match contents.find('\n') {
        Some(i) => &contents[i + 1..],
        None => return Ok(vec![]),
    };

    Ok(parse_records(body))
}

/// Split `body` into records, honoring quoted fields that span
/// physical newlines. A record boundary is a `\n` seen outside quotes;
/// blank records (between consecutive boundaries) are skipped.
fn parse_records(body: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut chars = body.chars().peekable();
    let mut current = Vec::new();
    let mut saw_field = false;

    while chars.peek().is_some() {
        let (field, terminator) = parse_field(&mut chars);
        current.push(field);
        saw_field = true;
        match terminator {
            Terminator::Comma => continue,
            Terminator::Newline | Terminator::Eof => {
                if saw_field && !(current.len() == 1 && current[0].is_empty()) {
                    records.push(std::mem::take(&mut current));
                } else {
                    current.clear();
                }
                saw_field = false;
            }
        }
    }
    if saw_field && !(current.len() == 1 && current[0].is_empty()) {
        records.push(current);
    }
    records
}

enum Terminator {
    Comma,
    Newline,
    Eof,
}

fn parse_field(chars: &mut std::iter::Peekable<std::str::Chars>) -> (String, Terminator) {
    let mut field = String::new();

    if chars.peek() == Some(&'"') {
        chars.next();
        while let Some(c) = chars.next() {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    break;
                }
            } else {
                field.push(c);
            }
        }
    } else {
        while let Some(&c) = chars.peek() {
            if c == ',' || c == '\n' || c == '\r' {
                break;
            }
            field.push(c);
            chars.next();
        }
    }

    match chars.peek() {
        Some(',') => {
            chars.next();
            (field, Terminator::Comma)
        }
        Some('\r') => {
            chars.next();
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            (field, Terminator::Newline)
        }
        Some('\n') => {
            chars.next();
            (field, Terminator::Newline)
        }
        _ => (field, Terminator::Eof),
    }
}
