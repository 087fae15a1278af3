use clap::Parser;
use regtree::{Config, EntryId, Query};
use tracing::instrument;

use super::terminal::{indent, Colorize};

#[derive(Debug, Parser)]
#[command(about = "Show the unit numbers from the root down to an entry")]
pub struct Lineage {
    /// The entry id
    id: EntryId,

    /// Print the content of every ancestor instead of the unit numbers
    #[arg(long)]
    content: bool,
}

impl Lineage {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let store = super::open_store(config)?;
        let query = Query::new(&store);

        if self.content {
            println!("{}", query.ancestor_content(self.id)?);
        } else {
            println!("{}", query.ancestor_unit_numbers(self.id)?);
        }
        Ok(())
    }
}

#[derive(Debug, Parser)]
#[command(about = "Show the ancestors and descendants of an entry")]
pub struct Context {
    /// The entry id
    id: EntryId,

    /// Print the lineage as JSON
    #[arg(long)]
    json: bool,
}

impl Context {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let store = super::open_store(config)?;
        let lineage = Query::new(&store).lineage(self.id)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&lineage)?);
            return Ok(());
        }

        if !lineage.ancestors.is_empty() {
            println!("{}", "Ancestors".dim());
            for ancestor in lineage.ancestors_root_first() {
                println!("{}{}", indent(ancestor.level), ancestor.heading());
            }
            println!();
        }

        println!("{}", lineage.entry.content.success());

        if !lineage.descendants.is_empty() {
            println!("\n{}", "Descendants".dim());
            for tagged in lineage.descendants_by_depth() {
                println!(
                    "{}{} {}",
                    indent(tagged.entry.level),
                    tagged.entry.heading(),
                    format!("(depth {})", tagged.depth + 1).dim()
                );
            }
        }
        Ok(())
    }
}
