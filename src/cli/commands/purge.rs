use anyhow::Result;
use console::Emoji;

use crate::config::Config;
use crate::pipeline::Pipeline;

static TRASH: Emoji<'_, '_> = Emoji("🗑️  ", "");

pub async fn run(document_name: String) -> Result<()> {
    let config = Config::load()?;
    let pipeline = Pipeline::open(config)?;
    let removed = pipeline.purge_document(&document_name)?;
    println!("{}Removed {removed} record(s) for {document_name}", TRASH);
    Ok(())
}
