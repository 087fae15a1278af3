use clap::Parser;
use regtree::{deduplicate, Config, Query};
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, Parser)]
#[command(about = "Search entry content with a regular expression")]
pub struct Search {
    /// The pattern to search for
    pattern: String,

    /// Only search the regulation with this title
    #[arg(short, long)]
    regulation: Option<String>,

    /// Match case-insensitively
    #[arg(short = 'i', long)]
    ignore_case: bool,

    /// Print matching contents only, dropping any that contain a shorter match
    #[arg(long, conflicts_with = "json")]
    dedup: bool,

    /// Print matches as JSON
    #[arg(long)]
    json: bool,
}

impl Search {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let store = super::open_store(config)?;
        let query = Query::new(&store);
        let entries = query.search(&self.pattern, self.regulation.as_deref(), self.ignore_case)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&entries)?);
            return Ok(());
        }

        if self.dedup {
            let contents = entries.into_iter().map(|entry| entry.content).collect();
            for content in deduplicate(contents) {
                println!("{content}\n");
            }
            return Ok(());
        }

        if entries.is_empty() {
            println!("{}", "No matches".dim());
            return Ok(());
        }

        for entry in &entries {
            println!(
                "{} {}",
                entry.hierarchy_path.levels.join(" > ").info(),
                entry.id.to_string().dim()
            );
            println!("{}\n", entry.content);
        }
        println!("{}", format!("{} matches", entries.len()).dim());
        Ok(())
    }
}
