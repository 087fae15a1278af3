use std::path::{Path, PathBuf};

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use regtree::{
    import::{collect_sources, Report},
    Annotator, Config, Importer, Outcome, Store,
};
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, Parser)]
#[command(about = "Annotate source regulations with heading markers")]
pub struct Annotate {
    /// Directory of source regulations (defaults to the configured one)
    #[arg(long)]
    source_dir: Option<PathBuf>,
}

impl Annotate {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let sources = sources(self.source_dir.as_deref(), config);
        let patterns = config.pattern_table()?;
        let annotator = Annotator::new(&patterns, config);

        let progress = progress_bar(sources.len(), "Annotating")?;
        let report = annotator.annotate_all(&sources, &|_| progress.inc(1));
        progress.finish_and_clear();

        let headings: usize = report.completed.iter().sum();
        print_failures(&report);
        println!(
            "{}",
            format!(
                "Annotated {} regulations ({headings} headings) into {}",
                report.completed.len(),
                config.formatted_dir.display()
            )
            .success()
        );
        report.into_result()?;
        Ok(())
    }
}

#[derive(Debug, Parser)]
#[command(about = "Import source regulations into the database")]
pub struct Import {
    /// Directory of source regulations (defaults to the configured one)
    #[arg(long)]
    source_dir: Option<PathBuf>,

    /// Read the annotated files written by `annotate` instead of annotating
    /// in memory
    #[arg(long)]
    from_formatted: bool,
}

impl Import {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let sources = sources(self.source_dir.as_deref(), config);
        let patterns = config.pattern_table()?;
        let store = super::open_store(config)?;
        let importer =
            Importer::new(&store, &patterns, config).from_formatted(self.from_formatted);

        let progress = progress_bar(sources.len(), "Importing")?;
        let report = importer.import_all(&sources, &|_| progress.inc(1));
        progress.finish_and_clear();

        let (mut imported, mut skipped, mut entries) = (0, 0, 0);
        for outcome in &report.completed {
            match outcome {
                Outcome::Imported { entries: n, .. } => {
                    imported += 1;
                    entries += n;
                }
                Outcome::Skipped { .. } => skipped += 1,
            }
        }

        print_failures(&report);
        println!(
            "{}",
            format!("Imported {imported} regulations ({entries} entries)").success()
        );
        if skipped > 0 {
            println!("{}", format!("Skipped {skipped} already imported").dim());
        }
        println!(
            "{}",
            format!(
                "{} regulations in {}",
                store.titles()?.len(),
                config.database.display()
            )
            .dim()
        );
        report.into_result()?;
        Ok(())
    }
}

fn sources(dir: Option<&Path>, config: &Config) -> Vec<PathBuf> {
    let dir = dir.unwrap_or(&config.source_dir);
    let sources = collect_sources(dir);
    if sources.is_empty() {
        tracing::warn!("No regulations found in {}", dir.display());
    } else if config.document_count() == 0 {
        tracing::warn!("No documents are mapped to a hierarchy type; every regulation will be flat");
    }
    sources
}

fn progress_bar(len: usize, message: &'static str) -> anyhow::Result<ProgressBar> {
    let progress = ProgressBar::new(len as u64);
    progress.set_style(
        ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}")?.progress_chars("=> "),
    );
    progress.set_message(message);
    Ok(progress)
}

fn print_failures<T>(report: &Report<T>) {
    for (path, error) in &report.failures {
        eprintln!("{} {}: {error}", "failed".warning(), path.display());
    }
}
