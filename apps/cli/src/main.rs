//! scriptorium CLI: content automation for the devotional blog.
//!
//! Recomputes related posts across the blog and imports the Liturgy of the
//! Hours EPUB into the record sink.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
