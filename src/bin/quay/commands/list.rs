//! `quay list` command

use anyhow::Result;

use crate::cli::{GlobalArgs, ListArgs};
use crate::commands::Session;
use quay::core::fragment::Fragment;

fn print_fragment(fragment: &Fragment, depth: usize) {
    let indent = "  ".repeat(depth);
    let mut line = format!("{}{}", indent, fragment.name);

    if !fragment.gate.is_always() {
        line.push_str(&format!(" [{}]", fragment.gate));
    }
    for constraint in &fragment.constraints {
        line.push_str(&format!(" ({})", constraint));
    }
    println!("{}", line);

    for child in &fragment.children {
        print_fragment(child, depth + 1);
    }
}

pub fn execute(args: ListArgs, global: &GlobalArgs) -> Result<()> {
    let session = Session::load(global)?;
    let library = &session.library;

    if args.configurations {
        if library.configurations.is_empty() {
            println!("# library `{}` defines no configurations", library.name);
        }
        for configuration in library.configurations.values() {
            match &configuration.description {
                Some(description) => println!("{} - {}", configuration.name, description),
                None => println!("{}", configuration.name),
            }
            if !configuration.flags.is_empty() {
                println!("  flags: {}", configuration.flags.join(" "));
            }
            if !configuration.fragments.is_empty() {
                println!("  fragments: {}", configuration.fragments.join(", "));
            }
        }
        return Ok(());
    }

    if args.rewrites {
        for rule in &library.rewrites {
            let mut line = format!("{} -> {}", rule.symbol, rule.value);
            if !rule.gate.is_always() {
                line.push_str(&format!(" [{}]", rule.gate));
            }
            println!("{} (in {})", line, rule.fragments.join(", "));
        }
        return Ok(());
    }

    for fragment in &library.fragments {
        print_fragment(fragment, 0);
    }

    Ok(())
}
