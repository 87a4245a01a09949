use anyhow::Result;
use console::style;

use crate::config::Config;
use crate::pipeline::Pipeline;

pub async fn run(query: String, top_k: usize) -> Result<()> {
    let config = Config::load()?;
    let pipeline = Pipeline::open(config)?;
    let results = pipeline.search(&query, top_k).await?;

    if results.is_empty() {
        println!("No matching facts.");
        return Ok(());
    }

    for (i, (fact, score)) in results.iter().enumerate() {
        println!(
            "{:>2}. [{}] {}",
            i + 1,
            style(format!("{score:.3}")).cyan(),
            fact.statement
        );
        println!("    {} · chunk {}", style(&fact.document_name).dim(), fact.source_chunk_index);
    }

    Ok(())
}
