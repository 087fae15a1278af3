use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::domain::hierarchy::{HierarchyType, PatternTable, UnknownHierarchyType};

/// Errors raised while loading or applying a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read or written.
    #[error("Failed to access config file: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid TOML for this schema.
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    /// The configuration could not be serialized.
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    /// A pattern override names a type that does not exist.
    #[error(transparent)]
    HierarchyType(#[from] UnknownHierarchyType),
    /// A pattern override is not a valid regular expression.
    #[error("Invalid pattern override: {0}")]
    Pattern(#[from] regex::Error),
}

/// Configuration for a regulation import workspace.
///
/// Holds the directory layout, the document-name to hierarchy-type mapping
/// and optional pattern overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// Directory holding the plain-text regulations (`*.txt`).
    pub source_dir: PathBuf,

    /// Directory holding the annotated intermediate files (`*.md`).
    pub formatted_dir: PathBuf,

    /// Path of the SQLite database.
    pub database: PathBuf,

    /// The phrase that closes a regulation's preamble.
    ///
    /// Defaults to `修正日期：` ("amendment date").
    pub meta_data_marker: String,

    /// Hierarchy type of each document, keyed by document name.
    ///
    /// Values are kept as written so that one unknown type only degrades the
    /// document that uses it.
    documents: BTreeMap<String, String>,

    /// Replacement pattern groups, keyed by hierarchy type identifier.
    patterns: BTreeMap<String, Vec<Vec<String>>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_dir: default_source_dir(),
            formatted_dir: default_formatted_dir(),
            database: default_database(),
            meta_data_marker: default_meta_data_marker(),
            documents: BTreeMap::new(),
            patterns: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Looks up the hierarchy type of a document.
    ///
    /// Returns `None` if the document is not mapped, or if it is mapped to an
    /// identifier that is not a known type.
    #[must_use]
    pub fn hierarchy_type(&self, document: &str) -> Option<HierarchyType> {
        let raw = self.documents.get(document)?;
        raw.parse()
            .inspect_err(|e| tracing::debug!("Document {document}: {e}"))
            .ok()
    }

    /// Maps a document to a hierarchy type.
    ///
    /// A trailing `.txt` extension is stripped from the name.
    pub fn set_hierarchy_type(&mut self, document: &str, hierarchy_type: HierarchyType) {
        self.documents.insert(
            normalise_document_name(document).to_string(),
            hierarchy_type.to_string(),
        );
    }

    /// The number of mapped documents.
    #[must_use]
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Builds the pattern table: the built-in groups plus any overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if an override names an unknown type or contains an
    /// invalid pattern.
    pub fn pattern_table(&self) -> Result<PatternTable, ConfigError> {
        let overrides = self
            .patterns
            .iter()
            .map(|(ty, levels)| -> Result<_, ConfigError> {
                Ok((ty.parse::<HierarchyType>()?, levels.clone()))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(PatternTable::builtin().with_overrides(&overrides)?)
    }
}

fn normalise_document_name(name: &str) -> &str {
    name.strip_suffix(".txt").unwrap_or(name)
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("data/regulations")
}

fn default_formatted_dir() -> PathBuf {
    PathBuf::from("tmp/regulations_formatted")
}

fn default_database() -> PathBuf {
    PathBuf::from("regulations.db")
}

fn default_meta_data_marker() -> String {
    "修正日期：".to_string()
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_source_dir")]
        source_dir: PathBuf,

        #[serde(default = "default_formatted_dir")]
        formatted_dir: PathBuf,

        #[serde(default = "default_database")]
        database: PathBuf,

        #[serde(default = "default_meta_data_marker")]
        meta_data_marker: String,

        /// Document name (with or without `.txt`) to hierarchy type.
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        documents: BTreeMap<String, String>,

        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        patterns: BTreeMap<String, Vec<Vec<String>>>,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                source_dir,
                formatted_dir,
                database,
                meta_data_marker,
                documents,
                patterns,
            } => Self {
                source_dir,
                formatted_dir,
                database,
                meta_data_marker,
                documents: documents
                    .into_iter()
                    .map(|(name, ty)| (normalise_document_name(&name).to_string(), ty))
                    .collect(),
                patterns,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            source_dir: config.source_dir,
            formatted_dir: config.formatted_dir,
            database: config.database,
            meta_data_marker: config.meta_data_marker,
            documents: config.documents,
            patterns: config.patterns,
        }
    }
}
