use std::path::{Path, PathBuf};

mod classify;
mod import;
mod lineage;
mod search;
mod show;
mod terminal;

use clap::ArgAction;
use classify::Classify;
use import::{Annotate, Import};
use lineage::{Context, Lineage};
use regtree::{Config, SqliteStore};
use search::Search;
use show::{Export, Show};
use tracing::instrument;

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// The path to the configuration file
    #[arg(short, long, default_value = "regtree.toml", global = true)]
    config: PathBuf,

    /// Override the database path from the configuration
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        let settings = Settings {
            path: self.config,
            database: self.database,
        };
        self.command.run(&settings)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

/// Where the configuration comes from, and overrides applied on top.
#[derive(Debug)]
struct Settings {
    path: PathBuf,
    database: Option<PathBuf>,
}

impl Settings {
    /// Loads the configuration, falling back to defaults if the file is
    /// missing.
    fn load(&self) -> anyhow::Result<Config> {
        let mut config = if self.path.exists() {
            Config::load(&self.path)?
        } else {
            tracing::debug!("No config at {}, using defaults", self.path.display());
            Config::default()
        };
        if let Some(database) = &self.database {
            config.database.clone_from(database);
        }
        Ok(config)
    }
}

fn open_store(config: &Config) -> anyhow::Result<SqliteStore> {
    if let Some(parent) = config.database.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(SqliteStore::open(&config.database)?)
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Write a default configuration file
    Init,

    /// Write annotated intermediate files for every source regulation
    Annotate(Annotate),

    /// Import source regulations into the database
    ///
    /// Regulations whose title is already stored are skipped.
    Import(Import),

    /// Search entry content with a regular expression
    Search(Search),

    /// Show the unit numbers (or content) from the root down to an entry
    Lineage(Lineage),

    /// Show the ancestors and descendants of an entry
    Context(Context),

    /// Show a regulation, or list stored regulations
    Show(Show),

    /// Write every entry of a regulation to its own file
    Export(Export),

    /// Print the level the classifier assigns to each line of a file
    Classify(Classify),
}

impl Command {
    fn run(self, settings: &Settings) -> anyhow::Result<()> {
        match self {
            Self::Init => Init::run(&settings.path)?,
            Self::Annotate(command) => command.run(&settings.load()?)?,
            Self::Import(command) => command.run(&settings.load()?)?,
            Self::Search(command) => command.run(&settings.load()?)?,
            Self::Lineage(command) => command.run(&settings.load()?)?,
            Self::Context(command) => command.run(&settings.load()?)?,
            Self::Show(command) => command.run(&settings.load()?)?,
            Self::Export(command) => command.run(&settings.load()?)?,
            Self::Classify(command) => command.run(&settings.load()?)?,
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct Init;

impl Init {
    #[instrument]
    fn run(path: &Path) -> anyhow::Result<()> {
        if path.exists() {
            anyhow::bail!("Configuration already exists at {}", path.display());
        }

        let config = Config::default();
        config
            .save(path)
            .map_err(|e| anyhow::anyhow!("Failed to create {}: {e}", path.display()))?;
        std::fs::create_dir_all(&config.source_dir).map_err(|e| {
            anyhow::anyhow!("Failed to create {}: {e}", config.source_dir.display())
        })?;

        println!("Created {}", path.display());
        println!();
        println!("Next steps:");
        println!(
            "  place regulations in {} and map them under [documents]",
            config.source_dir.display()
        );
        println!("  regtree import");

        Ok(())
    }
}
