//! CLI integration tests for extforge.
//!
//! These tests exercise the commands that don't need the external toolchain
//! (package manager, generator, ninja, SWIG).

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the extforge binary command.
fn extforge() -> Command {
    let mut cmd = Command::cargo_bin("extforge").unwrap();
    cmd.env_remove("EXTFORGE_DEBUG");
    cmd
}

/// Create a temporary directory for test projects.
fn temp_dir() -> TempDir {
    TempDir::new().unwrap()
}

const DUMP: &str = r#"# generated
{'targets': [{'target_name': 'libtgvoip',
  'type': 'static_library',
  'libraries': ['-lpthread'],
  'configurations': {
    'Release': {'defines': ['TGVOIP_USE_CALLBACK_AUDIO_IO', 'WEBRTC_APM_DEBUG_DUMP=0', 'NDEBUG'],
                'libraries': ['ssl', 'crypto']},
  }}]}
"#;

const MANIFEST: &str = r#"
[package]
name = "pytgcalls"

[library]
name = "libtgvoip"
path = "share/libtgvoip"

[generator]
script = "share/gyp/gyp_main.py"

[bindings]
interface = "swig/libtgvoip.i"

[extension]
name = "_libtgvoip"
sources = ["swig/libtgvoip.i"]

[[dependencies]]
reference = "opus/[~=1.2.1]@bincrafters/stable"
"#;

fn write_dump(dir: &Path) -> PathBuf {
    let path = dir.join("libtgvoip.gypd");
    fs::write(&path, DUMP).unwrap();
    path
}

fn host_os() -> &'static str {
    match std::env::consts::OS {
        "windows" => "windows",
        "macos" => "macos",
        _ => "linux",
    }
}

// ============================================================================
// extforge platform
// ============================================================================

#[test]
fn test_platform_linux() {
    extforge()
        .args(["platform", "--os", "linux", "--bits", "64"])
        .assert()
        .success()
        .stdout("-D_POSIX_VERSION\n-D__unix__\n-D__unix\n");
}

#[test]
fn test_platform_windows_32_bit() {
    extforge()
        .args(["platform", "--os", "windows", "--bits", "32"])
        .assert()
        .success()
        .stdout(predicate::str::contains("-D_WIN32"))
        .stdout(predicate::str::contains("_WIN64").not());
}

#[test]
fn test_platform_json() {
    let output = extforge()
        .args(["platform", "--os", "windows", "--bits", "64", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["platform"], "windows-64");
    assert_eq!(value["link_name"], "libtgvoip");
    assert_eq!(
        value["define_macros"],
        serde_json::json!([{"name": "_WIN32"}, {"name": "_WIN64"}])
    );
}

#[test]
fn test_platform_rejects_unknown_os() {
    extforge()
        .args(["platform", "--os", "plan9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown operating system"));
}

// ============================================================================
// extforge macros
// ============================================================================

#[test]
fn test_macros_from_dump() {
    let tmp = temp_dir();
    let dump = write_dump(tmp.path());

    extforge()
        .arg("macros")
        .arg(&dump)
        .assert()
        .success()
        .stdout(
            "-DTGVOIP_USE_CALLBACK_AUDIO_IO\n\
             -DWEBRTC_APM_DEBUG_DUMP=0\n\
             -DNDEBUG\n\
             -lssl\n\
             -lcrypto\n\
             -lpthread\n",
        );
}

#[test]
fn test_macros_json() {
    let tmp = temp_dir();
    let dump = write_dump(tmp.path());

    let output = extforge()
        .arg("macros")
        .arg(&dump)
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["configuration"], "Release");
    assert_eq!(
        value["define_macros"][1],
        serde_json::json!({"name": "WEBRTC_APM_DEBUG_DUMP", "value": "0"})
    );
    assert_eq!(value["libraries"], serde_json::json!(["ssl", "crypto", "pthread"]));
}

#[test]
fn test_macros_missing_configuration() {
    let tmp = temp_dir();
    let dump = write_dump(tmp.path());

    extforge()
        .arg("macros")
        .arg(&dump)
        .args(["--configuration", "Debug"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no configuration `Debug`"))
        .stderr(predicate::str::contains("available: Release"));
}

#[test]
fn test_macros_missing_target() {
    let tmp = temp_dir();
    let dump = write_dump(tmp.path());

    extforge()
        .arg("macros")
        .arg(&dump)
        .args(["--target", "opus"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("`opus`"));
}

// ============================================================================
// extforge build
// ============================================================================

#[test]
fn test_build_without_manifest_fails() {
    let tmp = temp_dir();

    extforge()
        .arg("build")
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Extforge.toml"));
}

#[test]
fn test_build_rejects_invalid_debug_level() {
    let tmp = temp_dir();
    fs::write(tmp.path().join("Extforge.toml"), MANIFEST).unwrap();

    extforge()
        .args(["build", "--debug-level", "2"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("--debug-level"));
}

#[test]
fn test_build_rejects_invalid_debug_env() {
    let tmp = temp_dir();
    fs::write(tmp.path().join("Extforge.toml"), MANIFEST).unwrap();

    extforge()
        .arg("build")
        .env("EXTFORGE_DEBUG", "yes")
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("EXTFORGE_DEBUG"));
}

// ============================================================================
// extforge clean
// ============================================================================

#[test]
fn test_clean_removes_current_namespace() {
    let tmp = temp_dir();
    fs::write(tmp.path().join("Extforge.toml"), MANIFEST).unwrap();
    let release = tmp.path().join("cache").join(host_os()).join("release");
    let debug = tmp.path().join("cache").join(host_os()).join("debug-0");
    fs::create_dir_all(release.join("conan")).unwrap();
    fs::create_dir_all(debug.join("conan")).unwrap();

    extforge()
        .arg("clean")
        .current_dir(tmp.path())
        .assert()
        .success();

    assert!(!release.exists());
    assert!(debug.exists());

    extforge()
        .args(["clean", "--all"])
        .current_dir(tmp.path())
        .assert()
        .success();

    assert!(!tmp.path().join("cache").exists());
}

#[test]
fn test_clean_with_relative_manifest_path() {
    let tmp = temp_dir();
    let project = tmp.path().join("proj");
    fs::create_dir_all(&project).unwrap();
    fs::write(project.join("Extforge.toml"), MANIFEST).unwrap();
    let release = project.join("cache").join(host_os()).join("release");
    fs::create_dir_all(release.join("conan")).unwrap();

    // The reported namespace is anchored at the manifest, not the cwd.
    let expected = tmp
        .path()
        .canonicalize()
        .unwrap()
        .join("proj")
        .join("cache")
        .join(host_os())
        .join("release");

    extforge()
        .args(["clean", "--manifest-path", "proj/Extforge.toml"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains(expected.display().to_string()));

    assert!(!release.exists());
}

// ============================================================================
// extforge completions
// ============================================================================

#[test]
fn test_completions_bash() {
    extforge()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("extforge"));
}
