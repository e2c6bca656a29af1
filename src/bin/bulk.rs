use std::fs::File;
use std::io::BufReader;

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use burnout_check::{
    average_session_duration, read_bulk, read_results, summarize, Error, QUESTIONS, TABLES,
};

#[derive(Parser)]
#[command(
    name = "bulk",
    about = "Batch scoring and statistics for the burnout inventory"
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Score a CSV of answer sheets: one row per respondent, an id
    /// followed by up to 84 y/n cells in catalog order
    Score { path: String },
    /// Aggregate a CSV of stored results into summary statistics
    Stats { path: String },
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    match args.command {
        Command::Score { path } => score(&path),
        Command::Stats { path } => stats(&path),
    }
}

fn score(path: &str) -> Result<(), Error> {
    let reader = BufReader::new(File::open(path)?);
    for row in read_bulk(reader) {
        match row {
            Ok((id, sheet)) => {
                let result = TABLES.score(&sheet, QUESTIONS.questions());
                println!(
                    "id = {}, phases = ({}, {}, {}), overall = {}, level = {}",
                    id,
                    result.tension.total,
                    result.resistance.total,
                    result.exhaustion.total,
                    result.overall_score,
                    result.burnout_level
                );
            }
            Err(err) => warn!(error = %err, "skipping malformed row"),
        }
    }
    Ok(())
}

fn stats(path: &str) -> Result<(), Error> {
    let reader = BufReader::new(File::open(path)?);
    let results = read_results(reader)?;
    info!(records = results.len(), "stored results loaded");

    let summary = summarize(&results);
    println!("{}", serde_json::to_string_pretty(&summary)?);
    println!(
        "average session duration: {}s",
        average_session_duration(&results)
    );
    Ok(())
}
