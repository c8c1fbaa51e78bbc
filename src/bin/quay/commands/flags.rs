//! `quay flags` command

use anyhow::{Context, Result};

use crate::cli::{FlagsArgs, GlobalArgs};
use crate::commands::Session;
use quay::compose::Composer;
use quay::core::gate::Gate;

pub fn execute(args: FlagsArgs, global: &GlobalArgs) -> Result<()> {
    let session = Session::load(global)?;

    let mut flags = args.flags.resolve(&session.config)?;
    if let Some(name) = args.flags.configuration(&session.config) {
        let configuration = session.library.configuration(&name)?;
        flags = Composer::default()
            .with_configuration(configuration)
            .effective_flags(&flags);
    }

    if let Some(expr) = &args.eval {
        let gate = Gate::parse(expr).with_context(|| format!("invalid gate `{}`", expr))?;
        println!("{}", gate.evaluate(&flags));
        return Ok(());
    }

    if flags.is_empty() {
        println!("# no flags set");
        return Ok(());
    }

    for name in flags.names() {
        match flags.value(name) {
            Some(value) => println!("{}={}", name, value),
            None => println!("{}", name),
        }
    }

    Ok(())
}
