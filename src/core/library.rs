//! Quay.toml library parsing and schema.
//!
//! A library is the pre-parsed description of a native declaration surface:
//! fragments, rewrite rules and named configurations.
//!
//! ```toml
//! [library]
//! name = "riot-sys"
//! include = ["fragments/*.toml"]
//!
//! [[fragment]]
//! name = "gcoap"
//! gate = "MODULE_GCOAP"
//! follow = ["network"]
//! items = ["<net/gcoap.h>"]
//!
//! [[rewrite]]
//! symbol = "UINT16_MAX"
//! value = "0xffff"
//! fragments = ["bindgen-prelude"]
//!
//! [configuration.bindgen]
//! flags = ["IS_BINDGEN"]
//! ```
//!
//! Fragments from `include`d files are registered after the fragments of the
//! main file, file by file in sorted path order.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::compose::errors::ComposeError;
use crate::compose::store::FragmentStore;
use crate::core::fragment::{Constraint, DeclItem, Fragment};
use crate::core::gate::Gate;
use crate::core::rewrite::{RestoreAction, RewriteRule};
use crate::util::diagnostic::{suggestions, InvalidLibraryError};
use crate::util::fs::{glob_files, read_to_string};

/// Canonical library file name.
pub const LIBRARY_NAME: &str = "Quay.toml";

/// A loaded fragment library.
#[derive(Debug, Clone)]
pub struct Library {
    /// Library name
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// Directory containing the library file
    pub root: PathBuf,

    /// Fragments in registration order
    pub fragments: Vec<Fragment>,

    /// Rewrite rules in declaration order
    pub rewrites: Vec<RewriteRule>,

    /// Named build variants
    pub configurations: BTreeMap<String, Configuration>,

    /// Every file the library was read from
    pub sources: Vec<PathBuf>,
}

/// A named build variant of a library.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Configuration {
    /// Configuration name (the table key)
    #[serde(skip)]
    pub name: String,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    /// Flags forced on for this variant
    #[serde(default)]
    pub flags: Vec<String>,

    /// Top-level fragments this variant may include (empty = all)
    #[serde(default)]
    pub fragments: Vec<String>,
}

impl Configuration {
    /// Check if a top-level fragment is allowed by this configuration.
    pub fn allows(&self, fragment: &str) -> bool {
        self.fragments.is_empty() || self.fragments.iter().any(|f| f == fragment)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLibrary {
    #[serde(default)]
    library: Option<RawMetadata>,

    #[serde(default, rename = "fragment")]
    fragments: Vec<RawFragment>,

    #[serde(default, rename = "rewrite")]
    rewrites: Vec<RawRewrite>,

    #[serde(default, rename = "configuration")]
    configurations: BTreeMap<String, Configuration>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMetadata {
    name: String,

    #[serde(default)]
    description: Option<String>,

    #[serde(default)]
    include: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFragment {
    name: String,

    #[serde(default)]
    gate: Option<String>,

    #[serde(default)]
    items: Vec<RawItem>,

    #[serde(default)]
    precede: Vec<String>,

    #[serde(default)]
    follow: Vec<String>,

    #[serde(default, rename = "child")]
    children: Vec<RawFragment>,
}

/// Item spellings accepted in a library file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawItem {
    /// `"<stdint.h>"` or `"riot-headers.h"`
    Path(String),
    Include(RawInclude),
    Text(RawText),
    Initializer(RawInitializer),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawInclude {
    include: String,
    #[serde(default)]
    system: bool,
    #[serde(default)]
    idempotent: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawText {
    text: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    idempotent: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawInitializer {
    initializer: String,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    idempotent: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRewrite {
    symbol: String,

    #[serde(default)]
    value: String,

    fragments: Vec<String>,

    #[serde(default)]
    restore: RestoreAction,

    #[serde(default)]
    gate: Option<String>,
}

impl RawItem {
    fn into_item(self) -> DeclItem {
        match self {
            RawItem::Path(path) => {
                if let Some(inner) = path.strip_prefix('<').and_then(|p| p.strip_suffix('>')) {
                    DeclItem::system_include(inner)
                } else {
                    DeclItem::include(path)
                }
            }
            RawItem::Include(RawInclude {
                include,
                system,
                idempotent,
            }) => {
                let mut item = if system {
                    DeclItem::system_include(include)
                } else {
                    DeclItem::include(include)
                };
                item.idempotent = idempotent;
                item
            }
            RawItem::Text(RawText {
                text,
                id,
                idempotent,
            }) => {
                let mut item = DeclItem::text(text);
                if let Some(id) = id {
                    item = item.with_id(id);
                }
                item.idempotent = idempotent;
                item
            }
            RawItem::Initializer(RawInitializer {
                initializer,
                type_name,
                idempotent,
            }) => {
                let mut item = DeclItem::initializer(initializer, type_name);
                item.idempotent = idempotent;
                item
            }
        }
    }
}

fn from_toml<T: serde::de::DeserializeOwned>(name: &str, contents: &str) -> Result<T> {
    toml::from_str(contents).map_err(|e| {
        anyhow::Error::new(InvalidLibraryError::new(
            name,
            contents,
            e.message().trim(),
            e.span(),
        ))
    })
}

fn parse_gate(text: Option<&str>, what: &str) -> Result<Gate> {
    match text {
        None => Ok(Gate::Always),
        Some(text) => {
            Gate::parse(text).with_context(|| format!("invalid gate `{}` for {}", text, what))
        }
    }
}

impl RawFragment {
    fn into_fragment(self, nested: bool) -> Result<Fragment> {
        if nested && (!self.precede.is_empty() || !self.follow.is_empty()) {
            bail!(
                "nested fragment `{}` cannot declare ordering constraints\n\
                 help: order nested fragments by listing them in the order they should appear",
                self.name
            );
        }

        let gate = parse_gate(self.gate.as_deref(), &format!("fragment `{}`", self.name))?;

        let mut constraints: Vec<Constraint> = self
            .precede
            .into_iter()
            .map(Constraint::MustPrecede)
            .collect();
        constraints.extend(self.follow.into_iter().map(Constraint::MustFollow));

        let children = self
            .children
            .into_iter()
            .map(|c| c.into_fragment(true))
            .collect::<Result<Vec<_>>>()?;

        Ok(Fragment {
            name: self.name,
            gate,
            items: self.items.into_iter().map(RawItem::into_item).collect(),
            constraints,
            children,
        })
    }
}

impl RawRewrite {
    fn into_rule(self) -> Result<RewriteRule> {
        let gate = parse_gate(
            self.gate.as_deref(),
            &format!("rewrite of `{}`", self.symbol),
        )?;

        Ok(RewriteRule {
            symbol: self.symbol,
            value: self.value,
            fragments: self.fragments,
            restore: self.restore,
            gate,
        })
    }
}

impl Library {
    /// Load a library file and everything it includes.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = read_to_string(path)?;
        let root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let mut library = Self::parse(&contents, &root)
            .with_context(|| format!("failed to parse library: {}", path.display()))?;
        library.sources.insert(0, path.to_path_buf());

        Ok(library)
    }

    /// Parse library contents. `root` resolves `include` patterns.
    pub fn parse(contents: &str, root: &Path) -> Result<Self> {
        let raw: RawLibrary = from_toml(LIBRARY_NAME, contents)?;

        let metadata = raw
            .library
            .ok_or_else(|| anyhow::anyhow!("missing [library] section"))?;

        let mut library = Library {
            name: metadata.name,
            description: metadata.description,
            root: root.to_path_buf(),
            fragments: Vec::new(),
            rewrites: Vec::new(),
            configurations: BTreeMap::new(),
            sources: Vec::new(),
        };

        library.absorb(raw.fragments, raw.rewrites)?;

        for (name, mut configuration) in raw.configurations {
            configuration.name = name.clone();
            library.configurations.insert(name, configuration);
        }

        for path in glob_files(root, &metadata.include)? {
            tracing::debug!("including fragment file {}", path.display());

            let contents = read_to_string(&path)?;
            let included: RawLibrary = from_toml(&path.display().to_string(), &contents)?;

            if included.library.is_some() || !included.configurations.is_empty() {
                bail!(
                    "included file {} may only contain [[fragment]] and [[rewrite]] entries",
                    path.display()
                );
            }

            library
                .absorb(included.fragments, included.rewrites)
                .with_context(|| format!("in included file: {}", path.display()))?;
            library.sources.push(path);
        }

        Ok(library)
    }

    fn absorb(&mut self, fragments: Vec<RawFragment>, rewrites: Vec<RawRewrite>) -> Result<()> {
        for raw in fragments {
            self.fragments.push(raw.into_fragment(false)?);
        }
        for raw in rewrites {
            self.rewrites.push(raw.into_rule()?);
        }
        Ok(())
    }

    /// Register all fragments into a fresh store.
    pub fn store(&self) -> Result<FragmentStore, ComposeError> {
        let mut store = FragmentStore::new();
        for fragment in &self.fragments {
            store.register(fragment.clone())?;
        }
        Ok(store)
    }

    /// Look up a configuration by name.
    pub fn configuration(&self, name: &str) -> Result<&Configuration> {
        self.configurations.get(name).ok_or_else(|| {
            let available: Vec<&str> = self.configurations.keys().map(String::as_str).collect();
            if available.is_empty() {
                anyhow::anyhow!(
                    "configuration `{}` not found: library `{}` defines no configurations",
                    name,
                    self.name
                )
            } else {
                anyhow::anyhow!(
                    "configuration `{}` not found (available: {})\n{}",
                    name,
                    available.join(", "),
                    suggestions::CONFIGURATION_NOT_FOUND
                )
            }
        })
    }

    /// Find a fragment (top-level or nested) by name.
    pub fn fragment(&self, name: &str) -> Option<&Fragment> {
        fn find<'a>(fragments: &'a [Fragment], name: &str) -> Option<&'a Fragment> {
            for fragment in fragments {
                if fragment.name == name {
                    return Some(fragment);
                }
                if let Some(found) = find(&fragment.children, name) {
                    return Some(found);
                }
            }
            None
        }

        find(&self.fragments, name)
    }

    /// Rewrite rules scoped to a fragment, in declaration order.
    pub fn rules_for<'a>(&'a self, fragment: &'a str) -> impl Iterator<Item = &'a RewriteRule> + 'a {
        self.rewrites.iter().filter(move |r| r.applies_to(fragment))
    }
}
