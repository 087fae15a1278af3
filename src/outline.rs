//! The annotated intermediate format.
//!
//! A plain-text regulation is first annotated: every line the classifier
//! recognises as a heading is rewritten as `#` repeated once per level,
//! followed by a space and the heading text. All other lines are kept
//! verbatim. The annotated text is then segmented into [`Block`]s, reading the
//! level straight from the marker count.

mod annotate;
mod segment;

pub use annotate::{
    annotate, annotate_file, render, write_annotated, AnnotatedLine, HEADING_MARKER,
};
pub use segment::{parse_heading, segment, Block};
