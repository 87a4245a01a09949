use anyhow::{Context, Result};
use console::{style, Emoji};

use crate::config::Config;

static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "");
static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK] ");
static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!] ");

pub async fn run(force: bool) -> Result<()> {
    println!();
    println!("{}", style(" factcheck - Initialization ").bold().reverse());
    println!();

    let path = Config::config_path().context("could not determine config path")?;
    if path.exists() && !force {
        println!(
            "{}Configuration already exists at {}",
            WARN,
            style(path.display()).cyan()
        );
        println!("  Use {} to overwrite", style("--force").yellow());
        return Ok(());
    }

    let written = Config::write_default(force)?;
    println!("{}Created configuration at {}", CHECK, style(written.display()).cyan());
    println!();
    println!("{}Next steps:", ROCKET);
    println!("  1. Set your LLM API key: export ANTHROPIC_API_KEY=...");
    println!("  2. Submit a document: factcheck submit ./report.txt");
    println!();

    Ok(())
}
