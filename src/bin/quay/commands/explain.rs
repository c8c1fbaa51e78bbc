//! `quay explain` command

use anyhow::Result;

use crate::cli::{ExplainArgs, GlobalArgs};
use crate::commands::Session;
use quay::ops::{explain, format_explanation};

pub fn execute(args: ExplainArgs, global: &GlobalArgs) -> Result<()> {
    let session = Session::load(global)?;

    let flags = args.flags.resolve(&session.config)?;
    let configuration = args.flags.configuration(&session.config);

    let explanation = explain(
        &session.library,
        &args.fragment,
        &flags,
        configuration.as_deref(),
    )?;
    print!("{}", format_explanation(&explanation));

    Ok(())
}
