use anyhow::Result;
use console::{style, Emoji};

use crate::config::Config;

static DOCTOR: Emoji<'_, '_> = Emoji("🩺 ", "");
static PASS: Emoji<'_, '_> = Emoji("✅ ", "[OK] ");
static FAIL: Emoji<'_, '_> = Emoji("❌ ", "[!!] ");
static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!] ");
static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "[i] ");
static ARROW: Emoji<'_, '_> = Emoji("   → ", "  -> ");

pub async fn run() -> Result<()> {
    println!();
    println!("{}", style(" factcheck Doctor ").bold().reverse());
    println!();
    println!("{}Running diagnostics...", DOCTOR);
    println!();

    let mut pass_count: u32 = 0;
    let mut fail_count: u32 = 0;
    let mut warn_count: u32 = 0;

    print_section("Binary");
    pass(&format!("factcheck {}", env!("CARGO_PKG_VERSION")), &mut pass_count);

    print_section("Configuration");
    let config_path = Config::config_path().ok();
    let config = match &config_path {
        Some(path) if path.exists() => match Config::load() {
            Ok(c) => {
                pass(&format!("Config found at {}", style(path.display()).dim()), &mut pass_count);
                Some(c)
            }
            Err(e) => {
                fail(&format!("Config parse error: {e}"), &mut fail_count);
                hint("Run: factcheck init --force");
                None
            }
        },
        Some(_) => {
            info("No config file found; running with built-in defaults");
            hint("Run: factcheck init");
            Some(Config::default())
        }
        None => {
            fail("Cannot determine config directory", &mut fail_count);
            None
        }
    };

    print_section("LLM provider");
    match &config {
        Some(c) if !c.llm.api_key.is_empty() => {
            pass("LLM API key is configured", &mut pass_count);
        }
        Some(_) => {
            warn("No LLM API key configured", &mut warn_count);
            hint("Set llm.api_key in the config file or ANTHROPIC_API_KEY in the environment");
        }
        None => {}
    }

    print_section("Data directory");
    if let Some(c) = &config {
        match std::fs::create_dir_all(&c.data_dir) {
            Ok(()) => pass(&format!("Data directory is writable: {}", c.data_dir.display()), &mut pass_count),
            Err(e) => fail(&format!("Cannot create data directory {}: {e}", c.data_dir.display()), &mut fail_count),
        }
    }

    print_section("System");
    info(&format!("OS: {} {}", std::env::consts::OS, std::env::consts::ARCH));
    if let Some(path) = &config_path {
        info(&format!("Config path: {}", path.display()));
    }

    println!();
    println!("{}", style("━".repeat(50)).dim());
    println!();
    let total = pass_count + fail_count + warn_count;
    print!("  {} {} passed", style(pass_count).green().bold(), if pass_count == 1 { "check" } else { "checks" });
    if warn_count > 0 {
        print!(", {} {}", style(warn_count).yellow().bold(), if warn_count == 1 { "warning" } else { "warnings" });
    }
    if fail_count > 0 {
        print!(", {} {}", style(fail_count).red().bold(), if fail_count == 1 { "failure" } else { "failures" });
    }
    println!(" ({total} total)");
    println!();

    Ok(())
}

fn print_section(name: &str) {
    println!("  {}", style(name).bold().underlined());
}

fn pass(msg: &str, count: &mut u32) {
    println!("  {PASS}{msg}");
    *count += 1;
}

fn fail(msg: &str, count: &mut u32) {
    println!("  {}{}", FAIL, style(msg).red());
    *count += 1;
}

fn warn(msg: &str, count: &mut u32) {
    println!("  {}{}", WARN, style(msg).yellow());
    *count += 1;
}

fn info(msg: &str) {
    println!("  {}{}", INFO, style(msg).dim());
}

fn hint(msg: &str) {
    println!("{ARROW}{}", style(msg).dim());
}
