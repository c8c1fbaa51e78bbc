//! `quay check` command

use anyhow::{bail, Result};

use crate::cli::{CheckArgs, GlobalArgs};
use crate::commands::Session;
use quay::ops::{check, format_report};

pub fn execute(args: CheckArgs, global: &GlobalArgs) -> Result<()> {
    let session = Session::load(global)?;

    let report = check(&session.library);
    print!("{}", format_report(&report, session.ctx.color()));

    if !report.is_ok() {
        bail!("library `{}` has {} error(s)", report.library, report.error_count());
    }
    if args.deny_warnings && report.warning_count() > 0 {
        bail!(
            "library `{}` has {} warning(s) (denied by --deny-warnings)",
            report.library,
            report.warning_count()
        );
    }

    Ok(())
}
