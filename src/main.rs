//! `regtree`: extract and query the heading hierarchy of plain-text
//! regulations.

use clap::Parser;

mod cli;

fn main() -> anyhow::Result<()> {
    cli::Cli::parse().run()
}
