//! Module flags for a single composition run.
//!
//! A `FlagSet` is fixed when composition starts. Flags usually come from the
//! build environment's preprocessor defines (`-DMODULE_GCOAP`), so a set can
//! be built straight from a CFLAGS string.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// The set of enabled flags, with optional define values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagSet {
    /// Enabled flag names
    enabled: BTreeSet<String>,

    /// Values for flags defined as `-DNAME=value`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    values: BTreeMap<String, String>,
}

impl FlagSet {
    /// Create an empty flag set.
    pub fn new() -> Self {
        FlagSet::default()
    }

    /// Create a flag set from a list of names.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = FlagSet::new();
        for name in names {
            set.enable(name);
        }
        set
    }

    /// Create a flag set from a compiler flags string.
    ///
    /// `-DFOO` enables `FOO`, `-DFOO=bar` enables `FOO` with value `bar`,
    /// `-UFOO` disables `FOO` again. Everything else is ignored.
    pub fn from_cflags(cflags: &str) -> Self {
        let mut set = FlagSet::new();
        set.extend_from_cflags(cflags);
        set
    }

    /// Apply the defines of a compiler flags string to this set.
    pub fn extend_from_cflags(&mut self, cflags: &str) {
        let args = split_args(cflags);
        for define in parse_define_flags(&args) {
            match define {
                DefineFlag::Define(name, None) => self.enable(name),
                DefineFlag::Define(name, Some(value)) => self.enable_with_value(name, value),
                DefineFlag::Undefine(name) => self.disable(&name),
            }
        }
    }

    /// Enable a flag.
    pub fn enable(&mut self, name: impl Into<String>) {
        self.enabled.insert(name.into());
    }

    /// Enable a flag carrying a value.
    pub fn enable_with_value(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.values.insert(name.clone(), value.into());
        self.enabled.insert(name);
    }

    /// Disable a flag.
    pub fn disable(&mut self, name: &str) {
        self.enabled.remove(name);
        self.values.remove(name);
    }

    /// Merge another flag set into this one.
    pub fn merge(&mut self, other: &FlagSet) {
        self.enabled.extend(other.enabled.iter().cloned());
        self.values
            .extend(other.values.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    /// Check if a flag is enabled. Unknown flags are disabled.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled.contains(name)
    }

    /// Get the value of a flag, if it was defined with one.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Iterate over enabled flag names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.enabled.iter().map(String::as_str)
    }

    /// The symbol table rewrites start from and restore to.
    ///
    /// Every enabled flag is a defined macro. A flag without a value is
    /// defined as `1`, as `-DNAME` is for a C compiler.
    pub fn baseline(&self) -> BTreeMap<String, String> {
        self.enabled
            .iter()
            .map(|name| {
                let value = self.values.get(name).map_or("1", String::as_str);
                (name.clone(), value.to_string())
            })
            .collect()
    }

    /// Number of enabled flags.
    pub fn len(&self) -> usize {
        self.enabled.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.enabled.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for FlagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        FlagSet::from_names(iter)
    }
}

/// A parsed `-D` / `-U` compiler flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefineFlag {
    /// `-DNAME` or `-DNAME=value`
    Define(String, Option<String>),
    /// `-UNAME`
    Undefine(String),
}

/// Parse compiler define flags (both GCC-style `-D` and MSVC-style `/D`).
///
/// Both the joined (`-DFOO`) and the separated (`-D FOO`) spellings are
/// accepted. Flags that are not defines or undefines are silently ignored.
pub fn parse_define_flags(args: &[String]) -> Vec<DefineFlag> {
    let mut parsed = Vec::new();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        let (is_define, rest) = if let Some(rest) =
            arg.strip_prefix("-D").or_else(|| arg.strip_prefix("/D"))
        {
            (true, rest)
        } else if let Some(rest) = arg.strip_prefix("-U") {
            (false, rest)
        } else {
            continue;
        };

        let rest = if rest.is_empty() {
            match iter.next() {
                Some(next) => next.as_str(),
                None => break,
            }
        } else {
            rest
        };

        if is_define {
            if let Some((name, value)) = rest.split_once('=') {
                if !name.is_empty() {
                    parsed.push(DefineFlag::Define(name.to_string(), Some(value.to_string())));
                }
            } else if !rest.is_empty() {
                parsed.push(DefineFlag::Define(rest.to_string(), None));
            }
        } else if !rest.is_empty() {
            parsed.push(DefineFlag::Undefine(rest.to_string()));
        }
    }

    parsed
}

/// Split a shell-style argument string.
///
/// Handles single quotes, double quotes and backslash escapes, which is
/// enough for the CFLAGS strings build systems hand over.
pub fn split_args(input: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_arg = false;
    let mut quote: Option<char> = None;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some('"'), '\\') | (None, '\\') => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
                in_arg = true;
            }
            (Some(_), c) => current.push(c),
            (None, '\'') | (None, '"') => {
                quote = Some(c);
                in_arg = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_arg {
                    args.push(std::mem::take(&mut current));
                    in_arg = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_arg = true;
            }
        }
    }

    if in_arg {
        args.push(current);
    }

    args
}
