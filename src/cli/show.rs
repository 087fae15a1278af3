use std::path::PathBuf;

use clap::Parser;
use regtree::{query::RegulationView, Config, Query, Store};
use tracing::instrument;

use super::terminal::{indent, Colorize};

#[derive(Debug, Parser)]
#[command(about = "Display a regulation, or list the stored regulations")]
pub struct Show {
    /// The title of the regulation to display
    ///
    /// Without a title the stored regulations are listed.
    title: Option<String>,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "pretty")]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    /// Headings indented by level
    #[default]
    Pretty,
    /// The regulation and its entries as JSON
    Json,
    /// Entries in the annotated heading-marker format
    Markdown,
}

impl Show {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let store = super::open_store(config)?;

        let Some(title) = &self.title else {
            let titles = store.titles()?;
            match self.output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&titles)?),
                OutputFormat::Pretty | OutputFormat::Markdown => {
                    for title in &titles {
                        println!("{title}");
                    }
                    println!("{}", format!("{} regulations", titles.len()).dim());
                }
            }
            return Ok(());
        };

        let view = Query::new(&store).regulation(title)?;
        match self.output {
            OutputFormat::Pretty => Self::output_pretty(&view),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&view)?),
            OutputFormat::Markdown => Self::output_markdown(&view),
        }
        Ok(())
    }

    fn output_pretty(view: &RegulationView) {
        let regulation = &view.regulation;
        println!("# {}\n", regulation.title);

        println!("{}", "Metadata".dim());
        for line in regulation.meta_data.lines() {
            println!("  {line}");
        }
        println!("  Imported:  {}", regulation.imported_at);
        println!("  Checksum:  {}", regulation.checksum.dim());

        println!("\n{}", format!("Entries ({})", view.entries.len()).dim());
        for entry in &view.entries {
            println!("{}{}", indent(entry.level), entry.heading());
        }
    }

    fn output_markdown(view: &RegulationView) {
        println!("{}\n", view.regulation.meta_data);
        for entry in &view.entries {
            if entry.level == 0 {
                println!("{}", entry.content);
            } else {
                let markers = "#".repeat(entry.level as usize);
                println!("{markers} {}", entry.content);
            }
        }
    }
}

#[derive(Debug, Parser)]
#[command(about = "Write every entry of a regulation to its own file")]
pub struct Export {
    /// The title of the regulation to export
    title: String,

    /// Directory to write into; entries land in `<dir>/<title>/`
    dir: PathBuf,
}

impl Export {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let store = super::open_store(config)?;
        let written = Query::new(&store).export(&self.title, &self.dir)?;
        println!(
            "{}",
            format!(
                "Exported {} entries to {}",
                written.len(),
                self.dir.join(&self.title).display()
            )
            .success()
        );
        Ok(())
    }
}
