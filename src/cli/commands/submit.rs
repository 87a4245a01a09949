use std::path::PathBuf;

use anyhow::Result;
use console::{style, Emoji};

use crate::config::Config;
use crate::document;
use crate::pipeline::Pipeline;

static PAGE: Emoji<'_, '_> = Emoji("📄 ", "");
static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK] ");

pub async fn run(path: PathBuf, document_name: Option<String>) -> Result<()> {
    let doc = document::read_document(&path)?;
    let name = document_name.unwrap_or(doc.document_name);

    println!("{}Submitting {} ({} bytes)...", PAGE, style(&name).cyan(), doc.raw_text.len());

    let config = Config::load()?;
    let pipeline = Pipeline::open(config)?;
    let report = pipeline.submit(&name, &doc.raw_text, &doc.source_uri).await?;

    if report.already_complete {
        println!("{}Document already fully processed; nothing to do", CHECK);
        return Ok(());
    }

    println!();
    println!("{}Done:", CHECK);
    println!("  chunks processed:    {}", report.chunks_processed);
    println!("  candidates extracted: {}", report.candidates_extracted);
    println!("  verified:            {}", style(report.verified).green());
    println!("  rejected:            {}", style(report.rejected).yellow());
    if !report.errors.is_empty() {
        println!("  {} chunk error(s):", style(report.errors.len()).red());
        for e in &report.errors {
            println!("    - {e}");
        }
    }

    Ok(())
}
