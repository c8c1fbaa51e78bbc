//! CLI integration tests for Quay.
//!
//! These tests run the `quay` binary against small libraries written to
//! temporary directories.

use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

const RIOT_LIBRARY: &str = r#"
[library]
name = "riot-sys"

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
items = ["<saul.h>"]

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
symbol = "ATOMIC_VAR_INIT(x)"
value = "x"
fragments = ["rmutex"]

[configuration.bindgen]
description = "Surface for bindgen"
fragments = ["prelude", "gcoap", "saul"]

[configuration.c2rust]
flags = ["IS_C2RUST"]
"#;

const CYCLIC_LIBRARY: &str = r#"
[library]
name = "cyclic"

[[fragment]]
name = "a"
precede = ["b"]

[[fragment]]
name = "b"
precede = ["a"]
"#;

/// Get the quay binary command, isolated from the user's global config.
fn quay(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("quay").unwrap();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env_remove("QUAY_LIBRARY")
        .env_remove("QUAY_CFLAGS")
        .arg("--no-color");
    cmd
}

/// Create a temporary directory holding a `Quay.toml`.
fn library(contents: &str) -> TempDir {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("Quay.toml"), contents).unwrap();
    tmp
}

// ============================================================================
// quay compose
// ============================================================================

#[test]
fn test_compose_header() {
    let tmp = library(RIOT_LIBRARY);

    quay(tmp.path())
        .args(["compose", "--no-fingerprint"])
        .assert()
        .success()
        .stdout(
            "/* Generated by quay. Do not edit. */\n\
             \n\
             #undef UINT16_MAX\n\
             #define UINT16_MAX 0xffff\n\
             #include <stdint.h>\n\
             #include \"riot-headers.h\"\n\
             #undef UINT16_MAX\n",
        );
}

#[test]
fn test_compose_with_flags() {
    let tmp = library(RIOT_LIBRARY);

    quay(tmp.path())
        .args(["compose", "-D", "MODULE_GCOAP"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#include <net/gcoap.h>"))
        .stdout(predicate::str::contains(
            "static sock_udp_ep_t init_SOCK_IPV4_EP_ANY(void) {",
        ))
        .stdout(predicate::str::contains("/* flags: MODULE_GCOAP */"))
        .stdout(predicate::str::contains("/* fingerprint: "))
        .stdout(predicate::str::contains("saul.h").not());
}

#[test]
fn test_compose_with_cflags() {
    let tmp = library(RIOT_LIBRARY);

    quay(tmp.path())
        .args(["compose", "--format", "list"])
        .env("QUAY_CFLAGS", "-DMODULE_SAUL -DBOARD_NATIVE -UBOARD_NATIVE -O2")
        .assert()
        .success()
        .stdout(predicate::str::contains("<saul.h>"));

    quay(tmp.path())
        .args(["compose", "--format", "list", "--cflags", "-DMODULE_SAUL -DBOARD_NATIVE"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<saul.h>").not());
}

#[test]
fn test_compose_configuration_orders_fragments() {
    let tmp = library(RIOT_LIBRARY);

    let output = quay(tmp.path())
        .args(["compose", "-c", "c2rust", "--no-fingerprint"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("/* configuration: c2rust */"));

    let rmutex = stdout.find("#include <rmutex.h>").unwrap();
    let stdint = stdout.find("#include <stdint.h>").unwrap();
    assert!(rmutex < stdint);
    assert!(stdout.contains("#define ATOMIC_VAR_INIT(x) x\n#include <rmutex.h>\n#undef ATOMIC_VAR_INIT\n"));
}

#[test]
fn test_compose_json() {
    let tmp = library(RIOT_LIBRARY);

    let output = quay(tmp.path())
        .args(["compose", "--format", "json", "-c", "bindgen"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["configuration"], "bindgen");
    assert_eq!(value["fragments"], serde_json::json!(["prelude"]));
}

#[test]
fn test_compose_to_file() {
    let tmp = library(RIOT_LIBRARY);

    quay(tmp.path())
        .args(["compose", "-o", "surface.h"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let header = fs::read_to_string(tmp.path().join("surface.h")).unwrap();
    assert!(header.contains("#include \"riot-headers.h\""));
}

#[test]
fn test_compose_all() {
    let tmp = library(RIOT_LIBRARY);

    quay(tmp.path())
        .args(["compose", "--all", "-o", "out", "-j", "2"])
        .assert()
        .success();

    assert!(tmp.path().join("out/bindgen.h").exists());
    let c2rust = fs::read_to_string(tmp.path().join("out/c2rust.h")).unwrap();
    assert!(c2rust.contains("#include <rmutex.h>"));
}

#[test]
fn test_compose_all_requires_output() {
    let tmp = library(RIOT_LIBRARY);

    quay(tmp.path()).args(["compose", "--all"]).assert().failure();
}

#[test]
fn test_compose_cycle_fails() {
    let tmp = library(CYCLIC_LIBRARY);

    quay(tmp.path())
        .arg("compose")
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("ordering cycle between fragments"))
        .stderr(predicate::str::contains("cycle: a -> b -> a"));
}

#[test]
fn test_compose_unknown_configuration() {
    let tmp = library(RIOT_LIBRARY);

    quay(tmp.path())
        .args(["compose", "-c", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope"));
}

#[test]
fn test_compose_invalid_format() {
    let tmp = library(RIOT_LIBRARY);

    quay(tmp.path())
        .args(["compose", "--format", "yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid output format 'yaml'"));
}

#[test]
fn test_compose_uses_project_config() {
    let tmp = library(RIOT_LIBRARY);
    fs::create_dir(tmp.path().join(".quay")).unwrap();
    fs::write(
        tmp.path().join(".quay/config.toml"),
        "[compose]\nformat = \"list\"\nflags = [\"MODULE_GCOAP\"]\n",
    )
    .unwrap();

    quay(tmp.path())
        .arg("compose")
        .assert()
        .success()
        .stdout(predicate::str::contains("<net/gcoap.h>"))
        .stdout(predicate::str::contains("#include").not());
}

#[test]
fn test_library_env_var() {
    let tmp = library(RIOT_LIBRARY);
    let elsewhere = TempDir::new().unwrap();

    quay(elsewhere.path())
        .arg("compose")
        .env("QUAY_LIBRARY", tmp.path().join("Quay.toml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("riot-headers.h"));
}

#[test]
fn test_no_library() {
    let tmp = TempDir::new().unwrap();

    quay(tmp.path())
        .arg("compose")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Quay.toml"));
}

#[test]
fn test_invalid_library_points_at_source() {
    let tmp = library("[library]\nname = \"broken\"\n\n[[fragment]]\nname = \"a\"\nbogus = 1\n");

    quay(tmp.path())
        .arg("compose")
        .assert()
        .failure()
        .stderr(predicate::str::contains("bogus"));
}

// ============================================================================
// quay check
// ============================================================================

#[test]
fn test_check_clean() {
    let tmp = library(RIOT_LIBRARY);

    quay(tmp.path())
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("check `riot-sys`: ok"));
}

#[test]
fn test_check_cycle() {
    let tmp = library(CYCLIC_LIBRARY);

    quay(tmp.path())
        .arg("check")
        .assert()
        .failure()
        .stdout(predicate::str::contains("ordering cycle between fragments"))
        .stdout(predicate::str::contains("FAILED"));
}

#[test]
fn test_check_deny_warnings() {
    let tmp = library("[library]\nname = \"empty\"\n\n[[fragment]]\nname = \"nothing\"\n");

    quay(tmp.path()).arg("check").assert().success();
    quay(tmp.path())
        .args(["check", "--deny-warnings"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("warning"));
}

// ============================================================================
// quay explain / flags / list
// ============================================================================

#[test]
fn test_explain() {
    let tmp = library(RIOT_LIBRARY);

    quay(tmp.path())
        .args(["explain", "saul", "-D", "MODULE_SAUL", "-D", "BOARD_NATIVE"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Fragment: saul"))
        .stdout(predicate::str::contains("(false)"))
        .stdout(predicate::str::contains("Not included"));

    quay(tmp.path())
        .args(["explain", "rmutex", "-c", "c2rust"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nested in: atomics"))
        .stdout(predicate::str::contains("Included at position 2 of 3"));
}

#[test]
fn test_explain_unknown_fragment() {
    let tmp = library(RIOT_LIBRARY);

    quay(tmp.path())
        .args(["explain", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope"));
}

#[test]
fn test_flags() {
    let tmp = library(RIOT_LIBRARY);

    quay(tmp.path())
        .args(["flags", "-D", "CPU=cortex-m4", "-c", "c2rust"])
        .assert()
        .success()
        .stdout("CPU=cortex-m4\nIS_C2RUST\n");

    quay(tmp.path())
        .args(["flags", "-D", "MODULE_SAUL", "--eval", "MODULE_SAUL && !BOARD_NATIVE"])
        .assert()
        .success()
        .stdout("true\n");

    quay(tmp.path())
        .args(["flags", "--eval", "A &&"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid gate"));
}

#[test]
fn test_list() {
    let tmp = library(RIOT_LIBRARY);

    quay(tmp.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("saul [MODULE_SAUL && !BOARD_NATIVE] (must follow `prelude`)"))
        .stdout(predicate::str::contains("\n  rmutex\n"));

    quay(tmp.path())
        .args(["list", "--configurations"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bindgen - Surface for bindgen"))
        .stdout(predicate::str::contains("  flags: IS_C2RUST"));

    quay(tmp.path())
        .args(["list", "--rewrites"])
        .assert()
        .success()
        .stdout(predicate::str::contains("UINT16_MAX -> 0xffff (in prelude)"));
}

// ============================================================================
// quay completions
// ============================================================================

#[test]
fn test_completions() {
    let tmp = TempDir::new().unwrap();

    quay(tmp.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("quay"));
}
