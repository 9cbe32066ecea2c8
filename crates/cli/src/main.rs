use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tally_core::TransactionType;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "tally", version, about = "Turn bank exports into categorized transactions")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct RuleArgs {
    /// TOML file with extra `[[rules]]`, registered on top of the built-ins
    #[arg(long)]
    rules: Option<PathBuf>,
    /// Start from an empty rule set instead of the built-in one
    #[arg(long)]
    no_default_rules: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a delimited export and print accepted transactions as JSON
    Import {
        file: PathBuf,
        #[arg(long)]
        account: i64,
        /// JSON array of already-known transactions ({date, description, amount})
        #[arg(long)]
        known: Option<PathBuf>,
        /// TOML import config (delimiter, date_precedence, dedupe_within_batch)
        #[arg(long)]
        config: Option<PathBuf>,
        #[command(flatten)]
        rules: RuleArgs,
    },
    /// Categorize a single description
    Categorize {
        description: String,
        #[arg(long)]
        amount: Decimal,
        #[arg(long = "type", default_value = "expense")]
        transaction_type: TransactionType,
        #[command(flatten)]
        rules: RuleArgs,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output = match cli.command {
        Command::Import {
            file,
            account,
            known,
            config,
            rules,
        } => {
            let engine = commands::load_engine(rules.rules.as_deref(), !rules.no_default_rules)?;
            commands::run_import(
                &file,
                account.into(),
                known.as_deref(),
                config.as_deref(),
                &engine,
            )?
        }
        Command::Categorize {
            description,
            amount,
            transaction_type,
            rules,
        } => {
            let engine = commands::load_engine(rules.rules.as_deref(), !rules.no_default_rules)?;
            let result = engine.categorize(&description, amount.abs(), transaction_type);
            serde_json::to_value(result)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
