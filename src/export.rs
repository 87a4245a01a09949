//! Export a fact list to JSON/CSV, for the `facts --output` CLI flag.
//!
//! Grounded on the teacher's `export.rs` CSV/JSON writer pair and its
//! quote-doubling escape helper. GraphML/Cypher are dropped — this
//! domain has no graph to describe.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::{FactCheckError, Result};
use crate::model::Fact;

#[derive(Serialize)]
struct JsonExport<'a> {
    facts: &'a [Fact],
}

pub fn export_json(facts: &[Fact], path: &Path) -> Result<()> {
    let file = File::create(path).map_err(FactCheckError::Io)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, &JsonExport { facts })
        .map_err(|e| FactCheckError::StoreUnavailable(format!("failed to write JSON export: {e}")))
}

pub fn export_csv(facts: &[Fact], path: &Path) -> Result<()> {
    let file = File::create(path).map_err(FactCheckError::Io)?;
    let mut writer = BufWriter::new(file);

    writeln!(
        writer,
        "fact_id,statement,document_name,source_chunk_index,verification_status,verification_reason,fact_hash"
    )
    .map_err(FactCheckError::Io)?;

    for fact in facts {
        writeln!(
            writer,
            "\"{}\",\"{}\",\"{}\",{},\"{}\",\"{}\",\"{}\"",
            escape_csv(&fact.fact_id),
            escape_csv(&fact.statement),
            escape_csv(&fact.document_name),
            fact.source_chunk_index,
            escape_csv(&fact.verification_status.to_string()),
            escape_csv(&fact.verification_reason),
            escape_csv(&fact.fact_hash),
        )
        .map_err(FactCheckError::Io)?;
    }

    Ok(())
}

fn escape_csv(s: &str) -> String {
    s.replace('"', "\"\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VerificationStatus;
    use chrono::Utc;
    use tempfile::tempdir;

    fn sample_facts() -> Vec<Fact> {
        let now = Utc::now();
        vec![Fact {
            fact_id: "f1".into(),
            statement: "ACME shipped 12,345 units in 2023.".into(),
            document_name: "doc-1".into(),
            source_chunk_index: 0,
            original_text: "source".into(),
            verification_status: VerificationStatus::Verified,
            verification_reason: "supported".into(),
            extracted_at: now,
            verified_at: now,
            fact_hash: "abc".into(),
        }]
    }

    #[test]
    fn export_json_roundtrips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("facts.json");
        export_json(&sample_facts(), &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["facts"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn export_csv_header_and_escaping() {
        let mut facts = sample_facts();
        facts[0].statement = "A \"quoted\" statement.".to_string();
        let dir = tempdir().unwrap();
        let path = dir.path().join("facts.csv");
        export_csv(&facts, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert!(lines[0].starts_with("fact_id,statement"));
        assert!(lines[1].contains("\"\"quoted\"\""));
    }
}
