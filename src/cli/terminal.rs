//! Coloured output for the commands.

use std::sync::OnceLock;

use owo_colors::{colors::css, OwoColorize, Style};

/// Whether stdout takes ANSI colours. Checked once per run.
fn colour_enabled() -> bool {
    static ENABLED: OnceLock<bool> = OnceLock::new();
    *ENABLED.get_or_init(|| supports_color::on(supports_color::Stream::Stdout).is_some())
}

fn paint(text: &str, style: Style) -> String {
    if colour_enabled() {
        text.style(style).to_string()
    } else {
        text.to_string()
    }
}

/// Styles for summaries, headings and failures.
pub trait Colorize {
    /// Completed work and the entry in focus.
    fn success(&self) -> String;
    /// Failed regulations.
    fn warning(&self) -> String;
    /// Levels and hierarchy paths.
    fn info(&self) -> String;
    /// Labels, ids and counts.
    fn dim(&self) -> String;
}

impl<T: AsRef<str> + ?Sized> Colorize for T {
    fn success(&self) -> String {
        paint(self.as_ref(), Style::new().fg::<css::Green>())
    }

    fn warning(&self) -> String {
        paint(self.as_ref(), Style::new().fg::<css::Orange>().bold())
    }

    fn info(&self) -> String {
        paint(self.as_ref(), Style::new().fg::<css::LightBlue>())
    }

    fn dim(&self) -> String {
        paint(self.as_ref(), Style::new().dimmed())
    }
}

/// Indentation for an entry at `level`, two spaces per level below the first.
/// Flat (level 0) entries are not indented.
pub fn indent(level: u32) -> String {
    "  ".repeat(level.saturating_sub(1) as usize)
}
