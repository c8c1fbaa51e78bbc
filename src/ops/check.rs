//! Implementation of `quay check`.
//!
//! Validates a library without emitting anything:
//! - fragment, flag and symbol names are well formed
//! - every fragment, rule and configuration reference resolves
//! - each configuration composes with no flags and with every referenced
//!   flag enabled

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;

use crate::compose::{Composer, FragmentStore};
use crate::core::flags::FlagSet;
use crate::core::fragment::Fragment;
use crate::core::library::{Configuration, Library};
use crate::util::diagnostic::Diagnostic;

static FRAGMENT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.\-]*$").expect("fragment name regex"));

static FLAG_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("flag name regex"));

static SYMBOL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\(\s*([A-Za-z_][A-Za-z0-9_]*\s*,\s*)*([A-Za-z_][A-Za-z0-9_]*|\.\.\.)?\s*\))?$")
        .expect("symbol regex")
});

/// Findings of a library check.
#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    /// Library name
    pub library: String,

    /// Number of trial compositions run
    pub compositions: usize,

    /// Findings, errors and warnings
    pub diagnostics: Vec<Diagnostic>,
}

impl CheckReport {
    fn add(&mut self, diagnostic: Diagnostic) {
        // Trial compositions tend to find the same defect more than once
        if !self.diagnostics.iter().any(|d| {
            d.message == diagnostic.message && d.context.first() == diagnostic.context.first()
        }) {
            self.diagnostics.push(diagnostic);
        }
    }

    /// Check if there are no errors.
    pub fn is_ok(&self) -> bool {
        self.error_count() == 0
    }

    /// Number of errors.
    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    /// Number of warnings.
    pub fn warning_count(&self) -> usize {
        self.diagnostics.len() - self.error_count()
    }
}

fn check_fragment(report: &mut CheckReport, fragment: &Fragment, nested: bool) {
    if !FRAGMENT_NAME.is_match(&fragment.name) {
        report.add(
            Diagnostic::error(format!("invalid fragment name `{}`", fragment.name))
                .with_suggestion("Use letters, digits, `_`, `-` and `.` only".to_string()),
        );
    }

    for flag in fragment.gate.flags() {
        if !FLAG_NAME.is_match(flag) {
            report.add(Diagnostic::error(format!(
                "invalid flag `{}` in gate of `{}`",
                flag, fragment.name
            )));
        }
    }

    if fragment.items.is_empty() && fragment.children.is_empty() {
        report.add(
            Diagnostic::warning(format!("fragment `{}` declares nothing", fragment.name))
                .with_context(if nested {
                    "it is a nested fragment with no items"
                } else {
                    "it has no items and no nested fragments"
                }),
        );
    }

    for child in &fragment.children {
        check_fragment(report, child, true);
    }
}

fn check_names(report: &mut CheckReport, library: &Library) {
    for fragment in &library.fragments {
        check_fragment(report, fragment, false);
    }

    for rule in &library.rewrites {
        if !SYMBOL.is_match(&rule.symbol) {
            report.add(
                Diagnostic::error(format!("invalid rewrite symbol `{}`", rule.symbol))
                    .with_context("expected a macro name, optionally with a parameter list")
                    .with_suggestion("e.g. `UINT16_MAX` or `ATOMIC_VAR_INIT(x)`".to_string()),
            );
        }
        if rule.fragments.is_empty() {
            report.add(Diagnostic::warning(format!(
                "rewrite of `{}` is not scoped to any fragment and never applies",
                rule.symbol
            )));
        }
        for flag in rule.gate.flags() {
            if !FLAG_NAME.is_match(flag) {
                report.add(Diagnostic::error(format!(
                    "invalid flag `{}` in gate of rewrite `{}`",
                    flag, rule.symbol
                )));
            }
        }
    }

    for configuration in library.configurations.values() {
        for flag in &configuration.flags {
            if !FLAG_NAME.is_match(flag) {
                report.add(Diagnostic::error(format!(
                    "invalid flag `{}` in configuration `{}`",
                    flag, configuration.name
                )));
            }
        }
    }
}

/// Every flag any gate in the library refers to.
fn referenced_flags(library: &Library) -> BTreeSet<String> {
    fn walk(fragment: &Fragment, out: &mut BTreeSet<String>) {
        out.extend(fragment.gate.flags().into_iter().map(str::to_string));
        for child in &fragment.children {
            walk(child, out);
        }
    }

    let mut out = BTreeSet::new();
    for fragment in &library.fragments {
        walk(fragment, &mut out);
    }
    for rule in &library.rewrites {
        out.extend(rule.gate.flags().into_iter().map(str::to_string));
    }
    out
}

fn trial(
    report: &mut CheckReport,
    library: &Library,
    store: &FragmentStore,
    configuration: Option<&Configuration>,
    flags: &FlagSet,
    label: &str,
) {
    let mut composer = Composer::new(&library.rewrites);
    if let Some(configuration) = configuration {
        composer = composer.with_configuration(configuration);
    }

    report.compositions += 1;
    match composer.compose(store, flags) {
        Ok(manifest) => tracing::debug!(
            "trial composition ({}) ok: {} fragment(s)",
            label,
            manifest.fragments.len()
        ),
        Err(e) => {
            let scope = match configuration {
                Some(c) => format!("while composing configuration `{}` {}", c.name, label),
                None => format!("while composing {}", label),
            };
            let mut diagnostic = e.to_diagnostic().with_context(scope);
            if let Some(path) = library.sources.first() {
                diagnostic = diagnostic.with_location(path);
            }
            report.add(diagnostic);
        }
    }
}

/// Check a library.
pub fn check(library: &Library) -> CheckReport {
    let mut report = CheckReport {
        library: library.name.clone(),
        ..CheckReport::default()
    };

    check_names(&mut report, library);

    let store = match library.store() {
        Ok(store) => store,
        Err(e) => {
            report.add(e.to_diagnostic());
            return report;
        }
    };

    let all_flags = FlagSet::from_names(referenced_flags(library));

    let mut configurations: Vec<Option<&Configuration>> = vec![None];
    configurations.extend(library.configurations.values().map(Some));

    for configuration in configurations {
        trial(
            &mut report,
            library,
            &store,
            configuration,
            &FlagSet::new(),
            "with no flags",
        );
        trial(
            &mut report,
            library,
            &store,
            configuration,
            &all_flags,
            "with every flag enabled",
        );
    }

    tracing::info!(
        "Checked `{}`: {} error(s), {} warning(s)",
        report.library,
        report.error_count(),
        report.warning_count()
    );

    report
}

/// Format a check report for display.
pub fn format_report(report: &CheckReport, color: bool) -> String {
    let mut output = String::new();

    for diagnostic in &report.diagnostics {
        output.push_str(&diagnostic.format(color));
        output.push('\n');
    }

    let status = if report.is_ok() { "ok" } else { "FAILED" };
    writeln!(
        output,
        "check `{}`: {} ({} error(s), {} warning(s), {} trial composition(s))",
        report.library,
        status,
        report.error_count(),
        report.warning_count(),
        report.compositions
    )
    .unwrap();

    output
}
