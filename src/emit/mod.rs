//! Manifest emitters.
//!
//! Emitters are pure: the same manifest always renders to the same bytes.

pub mod header;
pub mod json;
pub mod list;

use std::fmt;
use std::str::FromStr;

use crate::core::manifest::Manifest;

pub use header::HeaderEmitter;
pub use json::JsonEmitter;
pub use list::ListEmitter;

/// Renders a manifest to text.
pub trait Emitter {
    /// Render the manifest.
    fn emit(&self, manifest: &Manifest) -> String;
}

/// Output format for a composed manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// C header for a binding generator (default)
    #[default]
    Header,
    /// The manifest as JSON
    Json,
    /// One declaration per line
    List,
}

impl Format {
    /// All formats, in display order.
    pub const ALL: [Format; 3] = [Format::Header, Format::Json, Format::List];

    /// Conventional file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Header => "h",
            Format::Json => "json",
            Format::List => "txt",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Header => write!(f, "header"),
            Format::Json => write!(f, "json"),
            Format::List => write!(f, "list"),
        }
    }
}

impl FromStr for Format {
    type Err = FormatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "header" | "h" | "c" => Ok(Format::Header),
            "json" => Ok(Format::Json),
            "list" | "txt" => Ok(Format::List),
            _ => Err(FormatParseError(s.to_string())),
        }
    }
}

/// Error parsing an output format.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid output format '{0}', valid values: header, json, list")]
pub struct FormatParseError(pub String);

/// Emitter options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmitOptions {
    /// Include the fingerprint banner in headers
    pub fingerprint: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        EmitOptions { fingerprint: true }
    }
}

/// Render a manifest in the given format.
pub fn emit(manifest: &Manifest, format: Format, options: EmitOptions) -> String {
    match format {
        Format::Header => HeaderEmitter::new(options).emit(manifest),
        Format::Json => JsonEmitter.emit(manifest),
        Format::List => ListEmitter.emit(manifest),
    }
}
