//! `quay compose` command

use anyhow::{Context, Result};

use crate::cli::{ComposeArgs, GlobalArgs};
use crate::commands::Session;
use quay::emit::{EmitOptions, Format};
use quay::ops::{compose_all, compose_library, ComposeOptions};
use quay::util::fs::{ensure_dir, write_if_changed};

pub fn execute(args: ComposeArgs, global: &GlobalArgs) -> Result<()> {
    let session = Session::load(global)?;
    let config = &session.config;

    let format = match args.format.as_ref().or(config.compose.format.as_ref()) {
        Some(format) => format.parse::<Format>()?,
        None => Format::default(),
    };

    let options = ComposeOptions {
        configuration: if args.all {
            None
        } else {
            args.flags.configuration(config)
        },
        flags: args.flags.resolve(config)?,
        format,
        emit: EmitOptions {
            fingerprint: config.emit.fingerprint && !args.no_fingerprint,
        },
        jobs: args.jobs,
    };

    if args.all {
        let dir = session
            .ctx
            .resolve(args.output.as_deref().context("--all requires --output")?);
        ensure_dir(&dir)?;

        for output in compose_all(&session.library, &options)? {
            let stem = output
                .configuration
                .unwrap_or_else(|| session.library.name.clone());
            let path = dir.join(format!("{}.{}", stem, format.extension()));
            if write_if_changed(&path, &output.text)? {
                tracing::info!("Wrote {}", path.display());
            }
        }
        return Ok(());
    }

    let output = compose_library(&session.library, &options)?;

    match &args.output {
        Some(path) => {
            let path = session.ctx.resolve(path);
            if write_if_changed(&path, &output.text)? {
                tracing::info!("Wrote {}", path.display());
            } else {
                tracing::info!("{} is up to date", path.display());
            }
        }
        None => print!("{}", output.text),
    }

    Ok(())
}
