//! Importing plain-text regulations into a [`Store`].
//!
//! Each source document goes through the whole pipeline on its own: it is
//! annotated (or its annotated file is read back), segmented into blocks and
//! finally stored as a tree of entries. Documents are independent of each
//! other, so a batch runs them in parallel and collects failures instead of
//! stopping at the first one.

use std::{
    ffi::OsStr,
    fmt, io,
    path::{Path, PathBuf},
};

use nonempty::NonEmpty;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::{info, instrument, warn};
use walkdir::WalkDir;

use crate::{
    domain::{checksum, Classifier, Config, NewRegulation, PatternTable},
    outline::{annotate, annotate_file, render, segment},
    storage::{Store, StoreError},
};

mod tree;

pub use tree::{build_tree, TreeBuilder};

/// Errors raised while importing a single document.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// A source or annotated file could not be read or written.
    #[error("failed to access {}: {source}", path.display())]
    Io {
        /// The file that failed.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// The file name cannot be used as a regulation title.
    #[error("cannot derive a title from {}", .0.display())]
    InvalidName(PathBuf),

    /// The store rejected the regulation or one of its entries.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What happened to one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The regulation was stored with this many entries.
    Imported {
        /// The regulation title.
        title: String,
        /// Number of entries stored.
        entries: usize,
    },
    /// A regulation with the same title already existed.
    Skipped {
        /// The regulation title.
        title: String,
    },
}

/// The results of a batch run.
#[derive(Debug)]
pub struct Report<T> {
    /// Results of the documents that succeeded.
    pub completed: Vec<T>,
    /// Documents that failed, with the reason.
    pub failures: Vec<(PathBuf, ImportError)>,
}

impl<T> Report<T> {
    /// Converts the report into an error if any document failed.
    ///
    /// # Errors
    ///
    /// Returns a [`BatchError`] listing every failed document.
    pub fn into_result(self) -> Result<Vec<T>, BatchError> {
        match NonEmpty::from_vec(self.failures) {
            Some(failures) => Err(BatchError { failures }),
            None => Ok(self.completed),
        }
    }
}

/// One or more documents of a batch failed.
#[derive(Debug, thiserror::Error)]
pub struct BatchError {
    failures: NonEmpty<(PathBuf, ImportError)>,
}

impl BatchError {
    /// The documents that failed, with the reason.
    #[must_use]
    pub const fn failures(&self) -> &NonEmpty<(PathBuf, ImportError)> {
        &self.failures
    }
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const MAX_DISPLAY: usize = 5;

        write!(f, "failed to process regulations: ")?;

        let total = self.failures.len();

        let displayed_paths: Vec<String> = self
            .failures
            .iter()
            .take(MAX_DISPLAY)
            .map(|(p, _e)| p.display().to_string())
            .collect();

        let msg = displayed_paths.join(", ");

        if total <= MAX_DISPLAY {
            write!(f, "{msg}")
        } else {
            write!(f, "{msg}... (and {} more)", total - MAX_DISPLAY)
        }
    }
}

/// Lists the plain-text sources (`*.txt`) directly inside `dir`, sorted by
/// path. Subdirectories are not searched.
#[must_use]
pub fn collect_sources(dir: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<_> = WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.path().extension() == Some(OsStr::new("txt")))
        .map(walkdir::DirEntry::into_path)
        .collect();
    paths.sort();
    paths
}

/// The regulation title of a source file: its file stem.
///
/// # Errors
///
/// Returns an error if the path has no stem or the stem is not UTF-8.
pub fn document_name(path: &Path) -> Result<String, ImportError> {
    path.file_stem()
        .and_then(OsStr::to_str)
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ImportError::InvalidName(path.to_path_buf()))
}

fn read(path: &Path) -> Result<String, ImportError> {
    std::fs::read_to_string(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes the annotated form of source documents.
#[derive(Debug, Clone, Copy)]
pub struct Annotator<'a> {
    patterns: &'a PatternTable,
    config: &'a Config,
}

impl<'a> Annotator<'a> {
    /// Creates an annotator using the document mapping of `config`.
    #[must_use]
    pub const fn new(patterns: &'a PatternTable, config: &'a Config) -> Self {
        Self { patterns, config }
    }

    /// Where the annotated file of `title` lives.
    #[must_use]
    pub fn formatted_path(&self, title: &str) -> PathBuf {
        self.config.formatted_dir.join(format!("{title}.md"))
    }

    fn classifier<'t>(&'t self, title: &'t str) -> Classifier<'t> {
        Classifier::new(self.patterns, self.config.hierarchy_type(title), title)
    }

    /// Writes the annotated form of a source document to the formatted
    /// directory and returns the number of headings found.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or the annotated file
    /// cannot be written.
    #[instrument(level = "debug", skip(self))]
    pub fn annotate_document(&self, path: &Path) -> Result<usize, ImportError> {
        let title = document_name(path)?;
        let target = self.formatted_path(&title);
        annotate_file(path, &target, &self.classifier(&title)).map_err(|source| {
            ImportError::Io {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    /// Annotates documents in parallel.
    ///
    /// `on_done` is called once per document, whether it succeeded or not.
    #[must_use]
    pub fn annotate_all(
        &self,
        paths: &[PathBuf],
        on_done: &(dyn Fn(&Path) + Sync),
    ) -> Report<usize> {
        run_batch(paths, on_done, |path| self.annotate_document(path))
    }
}

/// Runs documents through the pipeline into a store.
#[derive(Debug)]
pub struct Importer<'a, S: ?Sized> {
    store: &'a S,
    annotator: Annotator<'a>,
    from_formatted: bool,
}

impl<'a, S: Store + ?Sized> Importer<'a, S> {
    /// Creates an importer that annotates documents in memory.
    #[must_use]
    pub const fn new(store: &'a S, patterns: &'a PatternTable, config: &'a Config) -> Self {
        Self {
            store,
            annotator: Annotator::new(patterns, config),
            from_formatted: false,
        }
    }

    /// Reads annotated files from the formatted directory instead of
    /// annotating sources in memory.
    #[must_use]
    pub const fn from_formatted(mut self, from_formatted: bool) -> Self {
        self.from_formatted = from_formatted;
        self
    }

    /// Imports one source document.
    ///
    /// A title that is already stored is skipped. If its source changed since
    /// then a warning is logged, but the stored copy is left alone.
    ///
    /// # Errors
    ///
    /// Returns an error if the source (or, with
    /// [`from_formatted`](Self::from_formatted), its annotated file) cannot be
    /// read, or if the store fails.
    #[instrument(level = "debug", skip(self))]
    pub fn import_document(&self, path: &Path) -> Result<Outcome, ImportError> {
        let title = document_name(path)?;
        let full_text = read(path)?;

        if let Some(existing) = self.store.find_regulation(&title)? {
            if existing.checksum != checksum(&full_text) {
                warn!("Source of {title} changed since it was imported");
            }
            info!("Regulation {title} already exists, skipping");
            return Ok(Outcome::Skipped { title });
        }

        let classifier = self.annotator.classifier(&title);
        let annotated = if self.from_formatted {
            read(&self.annotator.formatted_path(&title))?
        } else {
            render(&annotate(&full_text, &classifier))
        };
        let blocks = segment(&annotated);

        let marker = &self.annotator.config.meta_data_marker;
        let regulation = NewRegulation::from_source(title.clone(), full_text, marker);
        let regulation_id = match self.store.insert_regulation(regulation) {
            Ok(id) => id,
            Err(StoreError::DuplicateTitle(title)) => {
                info!("Regulation {title} already exists, skipping");
                return Ok(Outcome::Skipped { title });
            }
            Err(e) => return Err(e.into()),
        };

        let entries = build_tree(self.store, regulation_id, blocks, &classifier)?;
        info!("Imported {title} with {entries} entries");
        Ok(Outcome::Imported { title, entries })
    }

    /// Imports documents in parallel.
    ///
    /// `on_done` is called once per document, whether it succeeded or not.
    #[must_use]
    pub fn import_all(
        &self,
        paths: &[PathBuf],
        on_done: &(dyn Fn(&Path) + Sync),
    ) -> Report<Outcome> {
        run_batch(paths, on_done, |path| self.import_document(path))
    }
}

fn run_batch<T, F>(paths: &[PathBuf], on_done: &(dyn Fn(&Path) + Sync), run: F) -> Report<T>
where
    T: Send,
    F: Fn(&Path) -> Result<T, ImportError> + Sync,
{
    let (completed, failures): (Vec<_>, Vec<_>) = paths
        .par_iter()
        .map(|path| {
            let result = run(path.as_path());
            on_done(path.as_path());
            result.map_err(|e| (path.clone(), e))
        })
        .partition(Result::is_ok);

    Report {
        completed: completed.into_iter().filter_map(Result::ok).collect(),
        failures: failures.into_iter().filter_map(Result::err).collect(),
    }
}
