use std::path::PathBuf;

use anyhow::Result;
use console::style;

use crate::cli::ExportFormat;
use crate::config::Config;
use crate::export;
use crate::pipeline::Pipeline;

pub async fn run(
    document: Option<String>,
    include_rejected: bool,
    output: Option<PathBuf>,
    format: ExportFormat,
) -> Result<()> {
    let config = Config::load()?;
    let pipeline = Pipeline::open(config)?;
    let facts = pipeline.get_facts(document.as_deref(), !include_rejected);

    if let Some(path) = output {
        match format {
            ExportFormat::Json => export::export_json(&facts, &path)?,
            ExportFormat::Csv => export::export_csv(&facts, &path)?,
        }
        println!("Wrote {} fact(s) to {}", facts.len(), style(path.display()).cyan());
        return Ok(());
    }

    if facts.is_empty() {
        println!("No facts found.");
        return Ok(());
    }

    for fact in &facts {
        println!(
            "[{}] {} — {}",
            style(fact.verification_status.to_string()).bold(),
            fact.document_name,
            fact.statement
        );
    }

    Ok(())
}
