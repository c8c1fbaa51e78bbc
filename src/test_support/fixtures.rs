//! Test fixtures for common test scenarios.

/// A library shaped like the RIOT binding surface: a prelude with
/// integer-limit rewrites, module-gated fragments, nested atomics
/// workarounds, and one configuration per binding generator.
pub const RIOT_LIBRARY: &str = r#"
[library]
name = "riot-sys"
description = "Declaration surface for RIOT OS bindings"

[[fragment]]
name = "prelude"
items = [
    { include = "stdint.h", system = true, idempotent = true },
    "riot-headers.h",
]

[[fragment]]
name = "gcoap"
gate = "MODULE_GCOAP"
follow = ["prelude"]
items = [
    "<net/gcoap.h>",
    { initializer = "SOCK_IPV4_EP_ANY", type = "sock_udp_ep_t" },
]

[[fragment]]
name = "saul"
gate = "MODULE_SAUL && !BOARD_NATIVE"
follow = ["prelude"]
items = ["<saul.h>", { include = "stdint.h", system = true, idempotent = true }]

[[fragment]]
name = "atomics"
gate = "IS_C2RUST"
precede = ["prelude"]

[[fragment.child]]
name = "rmutex"
items = ["<rmutex.h>"]

[[rewrite]]
symbol = "UINT16_MAX"
value = "0xffff"
fragments = ["prelude"]

[[rewrite]]
symbol = "_STDATOMIC_H"
fragments = ["atomics"]
restore = "undefine"

[[rewrite]]
symbol = "ATOMIC_VAR_INIT(x)"
value = "x"
fragments = ["rmutex"]

[configuration.bindgen]
description = "Surface for bindgen"
fragments = ["prelude", "gcoap", "saul"]

[configuration.c2rust]
description = "Surface for C2Rust"
flags = ["IS_C2RUST"]
"#;

/// A library whose fragments must precede each other.
pub const CYCLIC_LIBRARY: &str = r#"
[library]
name = "cyclic"

[[fragment]]
name = "a"
precede = ["b"]

[[fragment]]
name = "b"
precede = ["a"]
"#;

/// Builder for small library files.
#[derive(Debug, Clone)]
pub struct LibraryFixture {
    name: String,
    body: String,
}

impl LibraryFixture {
    /// Create a library with no fragments.
    pub fn new(name: impl Into<String>) -> Self {
        LibraryFixture {
            name: name.into(),
            body: String::new(),
        }
    }

    /// Add a fragment with a gate and system includes.
    pub fn fragment(mut self, name: &str, gate: Option<&str>, includes: &[&str]) -> Self {
        self.body.push_str(&format!("\n[[fragment]]\nname = \"{}\"\n", name));
        if let Some(gate) = gate {
            self.body.push_str(&format!("gate = \"{}\"\n", gate));
        }
        let items: Vec<String> = includes.iter().map(|i| format!("\"<{}>\"", i)).collect();
        self.body
            .push_str(&format!("items = [{}]\n", items.join(", ")));
        self
    }

    /// Add a rewrite rule for one fragment.
    pub fn rewrite(mut self, symbol: &str, value: &str, fragment: &str) -> Self {
        self.body.push_str(&format!(
            "\n[[rewrite]]\nsymbol = \"{}\"\nvalue = \"{}\"\nfragments = [\"{}\"]\n",
            symbol, value, fragment
        ));
        self
    }

    /// Add a configuration limited to the given fragments.
    pub fn configuration(mut self, name: &str, fragments: &[&str]) -> Self {
        let fragments: Vec<String> = fragments.iter().map(|f| format!("\"{}\"", f)).collect();
        self.body.push_str(&format!(
            "\n[configuration.{}]\nfragments = [{}]\n",
            name,
            fragments.join(", ")
        ));
        self
    }

    /// Render the library file.
    pub fn build(&self) -> String {
        format!("[library]\nname = \"{}\"\n{}", self.name, self.body)
    }
}
