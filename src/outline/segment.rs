use serde::Serialize;

use super::annotate::HEADING_MARKER;

/// A heading together with the continuation lines that follow it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Block {
    /// Nesting level from the heading marker; `0` if the block has no heading.
    pub level: u32,
    /// The heading text, markers removed.
    pub heading: String,
    /// The heading text followed by its continuation lines, trimmed.
    pub content: String,
}

impl Block {
    fn open(level: u32, heading: &str) -> Self {
        Self {
            level,
            heading: heading.to_string(),
            content: heading.to_string(),
        }
    }

    fn push_line(&mut self, line: &str) {
        self.content.push('\n');
        self.content.push_str(line);
    }

    fn finish(mut self) -> Self {
        self.content = self.content.trim().to_string();
        self
    }
}

/// Splits a line of the intermediate format into its level and heading text.
///
/// Returns `None` for lines that are not headings.
#[must_use]
pub fn parse_heading(line: &str) -> Option<(u32, &str)> {
    let text = line.trim_start_matches(HEADING_MARKER);
    let markers = line.len() - text.len();
    if markers == 0 {
        return None;
    }
    let level = u32::try_from(markers).ok()?;
    Some((level, text.trim()))
}

/// Groups annotated text into blocks, one per heading.
///
/// Each block runs from a heading line up to the next one. Lines before the
/// first heading are the document's preamble and are not part of any block.
///
/// A document without any heading yields one level-0 block per non-blank
/// line instead, so that its text still reaches the tree as a flat list.
#[must_use]
pub fn segment(annotated: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut current: Option<Block> = None;

    for line in annotated.lines() {
        if let Some((level, heading)) = parse_heading(line) {
            blocks.extend(current.take().map(Block::finish));
            current = Some(Block::open(level, heading));
        } else if let Some(block) = current.as_mut() {
            block.push_line(line);
        }
    }
    blocks.extend(current.map(Block::finish));

    if blocks.is_empty() {
        tracing::debug!("No headings found, falling back to flat blocks");
        return annotated
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| Block::open(0, line))
            .collect();
    }

    tracing::debug!("Segmented {} blocks", blocks.len());
    blocks
}
