use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;
use trainer_core::{CONFIG_FILE, TrainerConfig};

mod commands;
mod input;
mod shutdown;

#[derive(Parser)]
#[command(name = "trainer")]
#[command(version, about = "Cheat table trainer")]
struct Cli {
    /// Config file
    #[arg(short, long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Attach to the target and run the table's hotkeys
    Run(RunArgs),
    /// Print the parsed table
    Show {
        #[command(flatten)]
        table: TableArgs,
        /// Dump the table as JSON
        #[arg(long)]
        json: bool,
    },
    /// Attach to the target and print every entry's current value
    Read {
        #[command(flatten)]
        table: TableArgs,
        /// Target executable (overrides the config)
        #[arg(short, long)]
        process: Option<String>,
    },
}

#[derive(Args)]
struct TableArgs {
    /// Cheat table (.CT) file
    #[arg(short, long)]
    table: PathBuf,

    /// Load at most this many top-level entries
    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    table: TableArgs,

    /// Target executable (overrides the config)
    #[arg(short, long)]
    process: Option<String>,

    /// Only activate these entry ids (comma separated)
    #[arg(long, value_delimiter = ',')]
    activate: Option<Vec<u32>>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("trainer=info".parse()?)
                .add_directive("trainer_core=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let mut config = load_config(&cli.config);

    match cli.command {
        Command::Run(args) => {
            apply_overrides(&mut config, args.process, args.table.limit);
            if args.activate.is_some() {
                config.activate = args.activate;
            }
            commands::run::run(&args.table.table, &config)
        }
        Command::Show { table, json } => {
            apply_overrides(&mut config, None, table.limit);
            commands::show::run(&table.table, &config, json)
        }
        Command::Read { table, process } => {
            apply_overrides(&mut config, process, table.limit);
            commands::read::run(&table.table, &config)
        }
    }
}

fn load_config(path: &Path) -> TrainerConfig {
    match TrainerConfig::load(path) {
        Ok(config) => config,
        Err(e) if e.is_not_found() => {
            debug!("No config at {}, using defaults", path.display());
            TrainerConfig::default()
        }
        Err(e) => {
            warn!("Failed to load config: {}, using defaults", e);
            TrainerConfig::default()
        }
    }
}

fn apply_overrides(config: &mut TrainerConfig, process: Option<String>, limit: Option<usize>) {
    if process.is_some() {
        config.process = process;
    }
    if limit.is_some() {
        config.entries_limit = limit;
    }
}
