//! snipstash - Local Snippet Store
//!
//! Command-line front end over the snippet store. Snippets live as one
//! Markdown file each in the configured data directory.

use std::error::Error;
use std::str::FromStr;

use colored::Colorize;
use tracing::Level;

mod cli;

const LOG_ENV: &str = "SNIPSTASH_LOG";

/// Logs go to stderr so they never mix with command output.
fn init_logging() {
    let level = std::env::var(LOG_ENV)
        .ok()
        .and_then(|value| Level::from_str(value.trim()).ok())
        .unwrap_or(Level::WARN);

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn Error>> {
    color_eyre::install()?;
    init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = cli::execute_cli(&args) {
        eprintln!("{}  {} {}", "┃".bright_magenta(), "Error:".bright_red().bold(), e);
        std::process::exit(1);
    }
    Ok(())
}
