//! # calscope
//!
//! Command line front end: encodes and decodes focus tokens and replays a
//! focus resolution against fixture data.

#![deny(unsafe_code)]

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::commands::ResolveOptions;

/// Calendar scope tool.
#[derive(Parser, Debug)]
#[command(name = "calscope", about = "Calendar scope focus tokens and resolution")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the focus token for an entity.
    Encode {
        #[command(subcommand)]
        target: EncodeTarget,
    },
    /// Print the `{type, id}` pair a focus token refers to.
    Decode {
        /// Focus token, e.g. `DAYCARD_t1_dc1`.
        token: String,
    },
    /// Resolve a focus token against fixture data and print the action log.
    Resolve {
        /// JSON file with `schedules`, `milestones` and `dayCards`.
        #[arg(long)]
        fixtures: PathBuf,

        /// Date used as today (defaults to the local date).
        #[arg(long)]
        today: Option<NaiveDate>,

        /// Also run navigate-to-element after resolving.
        #[arg(long, default_value_t = false)]
        navigate: bool,

        /// Focus token to resolve.
        token: String,
    },
}

#[derive(Subcommand, Debug)]
enum EncodeTarget {
    /// A task.
    Task { id: String },
    /// A milestone.
    Milestone { id: String },
    /// A day-card and the task owning it.
    DayCard { task_id: String, id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = calscope_settings::get_settings();
    calscope_core::logging::init_subscriber(&settings.logging.level);

    match cli.command {
        Command::Encode { target } => {
            let target = match target {
                EncodeTarget::Task { id } => calscope_core::FocusTarget::task(id),
                EncodeTarget::Milestone { id } => calscope_core::FocusTarget::milestone(id),
                EncodeTarget::DayCard { task_id, id } => {
                    calscope_core::FocusTarget::day_card(task_id, id)
                }
            };
            println!("{}", target.encode());
        }
        Command::Decode { token } => {
            let pair = commands::decode(&token)?;
            println!("{}", serde_json::to_string(&pair)?);
        }
        Command::Resolve {
            fixtures,
            today,
            navigate,
            token,
        } => {
            let options = ResolveOptions {
                fixtures,
                today,
                navigate,
            };
            let actions = commands::resolve(&token, &options, settings)
                .await
                .with_context(|| format!("failed to resolve {token}"))?;
            for action in actions {
                println!("{}", serde_json::to_string(&action)?);
            }
        }
    }

    Ok(())
}
