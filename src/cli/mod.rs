use std::path::PathBuf;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};

use crate::config::{Config, Overrides};
use crate::logging;
use crate::services::options::{voting_window, FileOptionsStore, OptionsStore};
use crate::services::{presenter, StatsAggregator};
use crate::store::{DatasetLoader, RecordStore};
use crate::types::OptionsWarning;

/// Participation statistics for participatory-budgeting votes
#[derive(Parser)]
#[command(name = "votetrack")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Snapshot directory with the JSONL table exports
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Options file (vote-launch, vote-deadline, ...)
    #[arg(long, global = true, value_name = "FILE")]
    options: Option<PathBuf>,

    /// Log filter, e.g. `info` or `votetrack=debug`
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the participation report (default)
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Output the flat template context as JSON
        #[arg(long, conflicts_with = "json")]
        context: bool,

        /// Report as of this day instead of today (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        today: Option<NaiveDate>,
    },

    /// Show sign-ups awaiting confirmation
    Pending {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show registered citizens that have not voted yet
    Voters {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect or change platform options
    Options {
        #[command(subcommand)]
        action: OptionsAction,
    },

    /// Look up a citizen on the roll by DNI
    Citizen {
        dni: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum OptionsAction {
    /// List all options
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print one option's value
    Get { key: String },
    /// Set an option, creating it if needed
    Set { key: String, value: String },
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        let config = Config::load(Overrides {
            data_dir: self.data_dir,
            options: self.options,
            log_level: self.log_level,
        })?;
        logging::init(&config.log_level, self.log_json);

        let options = FileOptionsStore::new(config.options_path.clone());
        let loader = DatasetLoader::new(config.data_dir.clone());

        match self.command {
            None => run_stats(&options, &loader, false, false, None),
            Some(Commands::Stats {
                json,
                context,
                today,
            }) => run_stats(&options, &loader, json, context, today),
            Some(Commands::Pending { json }) => {
                let window = voting_window(&options)?;
                let dataset = loader.load()?;
                let report = StatsAggregator::new(&dataset).pending_report(window)?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else {
                    print!("{}", presenter::render_pending(&report));
                }
                Ok(())
            }
            Some(Commands::Voters { json }) => {
                let dataset = loader.load()?;
                let summary = StatsAggregator::new(&dataset).voters_summary()?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                } else {
                    print!("{}", presenter::render_voters(&summary));
                }
                Ok(())
            }
            Some(Commands::Options { action }) => run_options(&options, action),
            Some(Commands::Citizen { dni, json }) => {
                let dataset = loader.load()?;
                let found = dataset.find_citizens_by_dni(&dni)?;
                if found.is_empty() {
                    anyhow::bail!("no citizen with DNI {} on the roll", dni.trim());
                }
                if json {
                    println!("{}", serde_json::to_string_pretty(&found)?);
                } else {
                    for record in &found {
                        let email = record
                            .user
                            .as_ref()
                            .and_then(|u| u.email.as_deref())
                            .unwrap_or("-");
                        println!(
                            "{}  voted: {}  account: {}",
                            record.citizen.dni,
                            if record.citizen.voted { "yes" } else { "no" },
                            email
                        );
                    }
                }
                Ok(())
            }
        }
    }
}

fn run_stats(
    options: &FileOptionsStore,
    loader: &DatasetLoader,
    json: bool,
    context: bool,
    today: Option<NaiveDate>,
) -> anyhow::Result<()> {
    // Window first: a broken option must fail before the snapshot is read
    let window = voting_window(options)?;
    let dataset = loader
        .load()
        .with_context(|| format!("loading snapshot from {}", loader.data_dir().display()))?;

    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let report = StatsAggregator::new(&dataset).compute_report(window, today)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if context {
        let ctx = presenter::template_context(&report)?;
        println!("{}", serde_json::to_string_pretty(&ctx)?);
    } else {
        print!("{}", presenter::render_report(&report));
    }
    Ok(())
}

fn run_options(options: &FileOptionsStore, action: OptionsAction) -> anyhow::Result<()> {
    match action {
        OptionsAction::List { json } => {
            let (entries, warning) = options.load()?;
            match warning {
                Some(OptionsWarning::Missing(msg)) => tracing::info!("{}", msg),
                Some(OptionsWarning::Corrupted(msg)) => tracing::warn!("{}", msg),
                None => {}
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for entry in entries {
                    println!("{} = {}", entry.key, entry.value);
                }
            }
        }
        OptionsAction::Get { key } => {
            println!("{}", options.lookup(&key)?);
        }
        OptionsAction::Set { key, value } => {
            let entry = options.set(&key, &value)?;
            println!("Option [{}] updated", entry.key);
        }
    }
    Ok(())
}
