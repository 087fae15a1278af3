use std::{
    fmt,
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use tracing::instrument;

use crate::domain::Classifier;

/// The marker repeated once per level in front of a heading.
pub const HEADING_MARKER: char = '#';

/// One line of an annotated document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotatedLine<'a> {
    /// A line recognised as a heading, with surrounding whitespace removed.
    Heading {
        /// Nesting level of the heading.
        level: u32,
        /// The trimmed heading text.
        text: &'a str,
    },
    /// Any other line, kept verbatim.
    Text(&'a str),
}

impl fmt::Display for AnnotatedLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Heading { level, text } => {
                for _ in 0..*level {
                    write!(f, "{HEADING_MARKER}")?;
                }
                write!(f, " {text}")
            }
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// Classifies every line of `text`.
///
/// The result has exactly one element per input line, in input order.
#[must_use]
pub fn annotate<'a>(text: &'a str, classifier: &Classifier<'_>) -> Vec<AnnotatedLine<'a>> {
    text.lines()
        .map(|line| {
            let trimmed = line.trim();
            match classifier.level(trimmed) {
                0 => AnnotatedLine::Text(line),
                level => AnnotatedLine::Heading {
                    level,
                    text: trimmed,
                },
            }
        })
        .collect()
}

/// Writes annotated lines in the intermediate text format.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_annotated<W: Write>(lines: &[AnnotatedLine<'_>], writer: &mut W) -> io::Result<()> {
    for line in lines {
        writeln!(writer, "{line}")?;
    }
    Ok(())
}

/// Renders annotated lines in the intermediate text format.
#[must_use]
pub fn render(lines: &[AnnotatedLine<'_>]) -> String {
    lines.iter().map(|line| format!("{line}\n")).collect()
}

/// Annotates the document at `source` and writes the result to `target`.
///
/// Parent directories of `target` are created if needed. Returns the number of
/// heading lines found.
///
/// # Errors
///
/// Returns an error if the source cannot be read or the target cannot be
/// written.
#[instrument(level = "debug", skip(classifier))]
pub fn annotate_file(
    source: &Path,
    target: &Path,
    classifier: &Classifier<'_>,
) -> io::Result<usize> {
    let text = std::fs::read_to_string(source)?;
    let lines = annotate(&text, classifier);

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(target)?);
    write_annotated(&lines, &mut writer)?;
    writer.flush()?;

    let headings = lines
        .iter()
        .filter(|line| matches!(line, AnnotatedLine::Heading { .. }))
        .count();
    tracing::debug!("Annotated {} with {headings} headings", source.display());
    Ok(headings)
}
