use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use docsum::scoring::{score, ScoreReport};

/// Score a summary file against a target text with ROUGE-1/2/L F1.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Summary to evaluate.
    #[arg(long)]
    candidate: PathBuf,

    /// Text to compare against: the source document or a human reference.
    #[arg(long)]
    target: PathBuf,

    /// Print the report as JSON instead of text.
    #[arg(long)]
    json: bool,
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read file: {}", path.display()))
}

fn print_report(report: &ScoreReport) {
    println!("{}", "ROUGE F1".bold().green());
    println!("  ROUGE-1: {}", report.rouge1);
    println!("  ROUGE-2: {}", report.rouge2);
    println!("  ROUGE-L: {}", report.rouge_l);
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let candidate = read(&cli.candidate)?;
    let target = read(&cli.target)?;

    let report = score(&candidate, &target).with_context(|| {
        format!(
            "cannot score {} against {}",
            cli.candidate.display(),
            cli.target.display()
        )
    })?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}
