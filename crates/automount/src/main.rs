//! automount CLI entry point.

use clap::Parser;
use color_eyre::eyre::Result;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use automount::cli::Cli;

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    let cli = Cli::parse();

    // Initialize tracing
    let directive = if cli.debug {
        "automount=debug"
    } else {
        "automount=info"
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .init();

    cli.execute()
}
