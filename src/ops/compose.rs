//! Implementation of `quay compose`.

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::compose::{CancelToken, ComposeError, Composer};
use crate::core::flags::FlagSet;
use crate::core::library::{Configuration, Library};
use crate::core::manifest::Manifest;
use crate::emit::{emit, EmitOptions, Format};

/// Options for the compose command.
#[derive(Debug, Clone, Default)]
pub struct ComposeOptions {
    /// Configuration to compose (None = plain composition)
    pub configuration: Option<String>,

    /// Flags enabled on top of the configuration's
    pub flags: FlagSet,

    /// Output format
    pub format: Format,

    /// Emitter options
    pub emit: EmitOptions,

    /// Number of parallel jobs for `compose_all`
    pub jobs: Option<usize>,
}

/// One composed and emitted surface.
#[derive(Debug, Clone)]
pub struct ComposeOutput {
    /// Configuration it was composed for
    pub configuration: Option<String>,

    /// The composed manifest
    pub manifest: Manifest,

    /// The emitted text
    pub text: String,
}

fn compose_one(
    library: &Library,
    configuration: Option<&Configuration>,
    options: &ComposeOptions,
    cancel: Option<CancelToken>,
) -> Result<ComposeOutput, ComposeError> {
    let store = library.store()?;

    let mut composer = Composer::new(&library.rewrites);
    if let Some(configuration) = configuration {
        composer = composer.with_configuration(configuration);
    }
    if let Some(token) = cancel {
        composer = composer.with_cancel_token(token);
    }

    let manifest = composer.compose(&store, &options.flags)?;
    let text = emit(&manifest, options.format, options.emit);

    Ok(ComposeOutput {
        configuration: configuration.map(|c| c.name.clone()),
        manifest,
        text,
    })
}

/// Compose a library for one configuration (or none).
pub fn compose_library(library: &Library, options: &ComposeOptions) -> Result<ComposeOutput> {
    let configuration = options
        .configuration
        .as_deref()
        .map(|name| library.configuration(name))
        .transpose()?;

    let output = compose_one(library, configuration, options, None).with_context(|| {
        match configuration {
            Some(c) => format!("failed to compose `{}` ({})", library.name, c.name),
            None => format!("failed to compose `{}`", library.name),
        }
    })?;

    tracing::info!(
        "Composed {} fragment(s), {} declaration(s)",
        output.manifest.fragments.len(),
        output.manifest.items.len()
    );

    Ok(output)
}

/// Compose every configuration of a library in parallel.
///
/// Outputs are in configuration name order. A library without
/// configurations yields one plain composition. When a run fails, runs for
/// configurations that sort after it are cancelled at their next fragment
/// boundary, so the reported failure is always the first failing
/// configuration by name.
pub fn compose_all(library: &Library, options: &ComposeOptions) -> Result<Vec<ComposeOutput>> {
    if library.configurations.is_empty() {
        return Ok(vec![compose_library(library, options)?]);
    }

    if let Some(j) = options.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(j)
            .build_global()
            .ok(); // Ignore if already set
    }

    let configurations: Vec<&Configuration> = library.configurations.values().collect();
    let tokens: Vec<CancelToken> = configurations.iter().map(|_| CancelToken::new()).collect();

    tracing::info!(
        "Composing {} configuration(s) of `{}`",
        configurations.len(),
        library.name
    );

    let results: Vec<Result<ComposeOutput, ComposeError>> = configurations
        .par_iter()
        .enumerate()
        .map(|(index, configuration)| {
            let result =
                compose_one(library, Some(configuration), options, Some(tokens[index].clone()));
            if matches!(&result, Err(e) if !matches!(e, ComposeError::Cancelled { .. })) {
                for token in &tokens[index + 1..] {
                    token.cancel();
                }
            }
            result
        })
        .collect();

    let mut outputs = Vec::with_capacity(results.len());
    for (configuration, result) in configurations.iter().zip(results) {
        match result {
            Ok(output) => outputs.push(output),
            Err(ComposeError::Cancelled { .. }) => {}
            Err(e) => {
                return Err(anyhow::Error::new(e).context(format!(
                    "failed to compose `{}` ({})",
                    library.name, configuration.name
                )));
            }
        }
    }

    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{flags, LibraryFixture, TestLibrary, CYCLIC_LIBRARY, RIOT_LIBRARY};

    #[test]
    fn test_compose_plain() {
        let lib = TestLibrary::new(RIOT_LIBRARY).load();
        let options = ComposeOptions {
            flags: flags(&["MODULE_GCOAP"]),
            format: Format::List,
            ..ComposeOptions::default()
        };

        let output = compose_library(&lib, &options).unwrap();
        assert_eq!(output.manifest.fragments, vec!["prelude", "gcoap"]);
        assert!(output.text.starts_with("<stdint.h>\n\"riot-headers.h\"\n<net/gcoap.h>\n"));
    }

    #[test]
    fn test_compose_configuration() {
        let lib = TestLibrary::new(RIOT_LIBRARY).load();
        let options = ComposeOptions {
            configuration: Some("c2rust".to_string()),
            ..ComposeOptions::default()
        };

        let output = compose_library(&lib, &options).unwrap();
        assert_eq!(output.configuration.as_deref(), Some("c2rust"));
        // atomics must precede the prelude
        assert_eq!(output.manifest.fragments, vec!["atomics", "rmutex", "prelude"]);
        assert!(output.text.contains("#define ATOMIC_VAR_INIT(x) x"));
    }

    #[test]
    fn test_unknown_configuration() {
        let lib = TestLibrary::new(RIOT_LIBRARY).load();
        let options = ComposeOptions {
            configuration: Some("nope".to_string()),
            ..ComposeOptions::default()
        };

        let err = compose_library(&lib, &options).unwrap_err();
        assert!(err.to_string().contains("configuration `nope` not found"));
    }

    #[test]
    fn test_compose_all_in_name_order() {
        let lib = TestLibrary::new(RIOT_LIBRARY).load();
        let options = ComposeOptions {
            flags: flags(&["MODULE_SAUL"]),
            ..ComposeOptions::default()
        };

        let outputs = compose_all(&lib, &options).unwrap();
        let names: Vec<_> = outputs
            .iter()
            .map(|o| o.configuration.as_deref().unwrap())
            .collect();
        assert_eq!(names, vec!["bindgen", "c2rust"]);

        // Shared idempotent include is emitted once
        let bindgen = &outputs[0].manifest;
        assert_eq!(bindgen.fragments, vec!["prelude", "saul"]);
        assert_eq!(bindgen.items.len(), 3);

        // Identical to composing each configuration on its own
        for output in &outputs {
            let single = compose_library(
                &lib,
                &ComposeOptions {
                    configuration: output.configuration.clone(),
                    ..options.clone()
                },
            )
            .unwrap();
            assert_eq!(single.text, output.text);
        }
    }

    #[test]
    fn test_compose_error_is_downcastable() {
        let lib = TestLibrary::new(CYCLIC_LIBRARY).load();

        let err = compose_all(&lib, &ComposeOptions::default()).unwrap_err();
        let compose_err = err.downcast_ref::<ComposeError>().unwrap();
        assert!(matches!(compose_err, ComposeError::Cycle { .. }));
    }

    #[test]
    fn test_compose_all_reports_first_failure_by_name() {
        // `beta` and `alpha` both repeat `<d.h>`, `gamma` is clean
        let contents = LibraryFixture::new("x")
            .fragment("base", None, &["d.h"])
            .fragment("dup-b", None, &["d.h"])
            .fragment("dup-a", None, &["d.h"])
            .fragment("extra", None, &["e.h"])
            .rewrite("UINT16_MAX", "0xffff", "base")
            .configuration("gamma", &["base", "extra"])
            .configuration("beta", &["base", "dup-b"])
            .configuration("alpha", &["base", "dup-a"])
            .build();
        let lib = TestLibrary::new(&contents).load();
        let options = ComposeOptions {
            jobs: Some(4),
            ..ComposeOptions::default()
        };

        for _ in 0..20 {
            let err = compose_all(&lib, &options).unwrap_err();
            assert_eq!(err.to_string(), "failed to compose `x` (alpha)");
            assert!(matches!(
                err.downcast_ref::<ComposeError>(),
                Some(ComposeError::DuplicateDeclaration { second, .. }) if second == "dup-a"
            ));
        }

        let gamma = compose_library(
            &lib,
            &ComposeOptions {
                configuration: Some("gamma".to_string()),
                ..options
            },
        )
        .unwrap();
        assert_eq!(gamma.manifest.fragments, vec!["base", "extra"]);
        assert!(gamma.text.contains("#define UINT16_MAX 0xffff\n#include <d.h>\n"));
    }
}
