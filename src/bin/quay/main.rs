//! Quay CLI - compose gated C declaration surfaces

use anyhow::Result;
use clap::Parser;
use miette::{GraphicalReportHandler, GraphicalTheme};
use tracing_subscriber::EnvFilter;

use quay::compose::ComposeError;
use quay::util::diagnostic::{emit, suggestions, Diagnostic, InvalidLibraryError};

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    let color = !cli.global.no_color;

    if let Err(e) = run(cli) {
        report(&e, color);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Set up logging
    let filter = if cli.global.verbose {
        EnvFilter::new("quay=debug")
    } else {
        EnvFilter::new("quay=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let global = &cli.global;
    match cli.command {
        Commands::Compose(args) => commands::compose::execute(args, global),
        Commands::Check(args) => commands::check::execute(args, global),
        Commands::Explain(args) => commands::explain::execute(args, global),
        Commands::Flags(args) => commands::flags::execute(args, global),
        Commands::List(args) => commands::list::execute(args, global),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}

/// Print an error, using the richest rendering available for it.
fn report(e: &anyhow::Error, color: bool) {
    if let Some(err) = e.downcast_ref::<ComposeError>() {
        emit(&err.to_diagnostic(), color);
        if e.to_string() != err.to_string() {
            emit(&Diagnostic::note(e.to_string()), color);
        }
        eprintln!("{}", suggestions::COMPOSE_FAILED);
        return;
    }

    if let Some(err) = e.downcast_ref::<InvalidLibraryError>() {
        let theme = if color {
            GraphicalTheme::unicode()
        } else {
            GraphicalTheme::unicode_nocolor()
        };
        let mut out = String::new();
        if GraphicalReportHandler::new_themed(theme)
            .render_report(&mut out, err)
            .is_ok()
        {
            eprint!("{}", out);
            return;
        }
    }

    eprintln!("error: {:#}", e);
}
