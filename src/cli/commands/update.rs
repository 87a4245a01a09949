use anyhow::Result;
use console::Emoji;

use crate::cli::VerificationStatusArg;
use crate::config::Config;
use crate::pipeline::Pipeline;

static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK] ");

pub async fn run(
    fact_id: String,
    statement: Option<String>,
    status: Option<VerificationStatusArg>,
    reason: Option<String>,
) -> Result<()> {
    let config = Config::load()?;
    let pipeline = Pipeline::open(config)?;
    pipeline
        .update_fact(&fact_id, statement, status.map(Into::into), reason)
        .await?;
    println!("{}Updated {fact_id}", CHECK);
    Ok(())
}
