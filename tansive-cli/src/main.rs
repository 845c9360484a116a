//! `tansive` CLI entry point.

mod cli;
mod client;
mod commands;
mod config;
mod error;

use clap::Parser;
use cli::Cli;
use config::CliConfig;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = match CliConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    match commands::run(&cli, config).await {
        Ok(value) => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&value).unwrap_or_default());
            } else {
                print_human(&value);
            }
        }
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}

/// Best-effort human-readable rendering for non-`--json` output: pretty JSON for structured
/// results, bare strings unwrapped so simple confirmations don't print with quotes.
fn print_human(value: &serde_json::Value) {
    match value {
        serde_json::Value::String(s) => println!("{s}"),
        other => println!("{}", serde_json::to_string_pretty(other).unwrap_or_default()),
    }
}
