use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use regtree::{domain::Classifier, import::document_name, Config, HierarchyType};
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, Parser)]
#[command(about = "Print the level the classifier assigns to each line of a file")]
pub struct Classify {
    /// The plain-text regulation to classify
    file: PathBuf,

    /// The hierarchy type to classify with (defaults to the configured mapping)
    #[arg(short = 't', long = "type", value_name = "TYPE")]
    hierarchy_type: Option<HierarchyType>,
}

impl Classify {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let title = document_name(&self.file)?;
        let text = std::fs::read_to_string(&self.file)
            .with_context(|| format!("failed to read {}", self.file.display()))?;
        let patterns = config.pattern_table()?;
        let hierarchy_type = self
            .hierarchy_type
            .or_else(|| config.hierarchy_type(&title));
        let classifier = Classifier::new(&patterns, hierarchy_type, &title);

        for line in text.lines() {
            match classifier.classify(line.trim()) {
                Some(found) => println!(
                    "{} {line} {}",
                    found.level.to_string().info(),
                    format!("[{}]", found.token).dim()
                ),
                None => println!("{} {line}", "-".dim()),
            }
        }
        Ok(())
    }
}
