mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

use common::{kernel_add_object, write_file};

#[test]
fn extract_prints_generated_source_to_stdout() {
    let dir = tempdir().unwrap();
    let bin = write_file(dir.path(), "device.o", &kernel_add_object());

    cargo_bin_cmd!("kernel-bridge")
        .arg("extract")
        .arg(&bin)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("pub const kernel_add: &[OverloadDescriptor] = &[")
                .and(predicate::str::contains("// encoding: kcfg-v1"))
                .and(predicate::str::contains("kernel_add__f32_f32")),
        );
}

#[test]
fn extract_verbose_lists_overloads_on_stderr() {
    let dir = tempdir().unwrap();
    let bin = write_file(dir.path(), "device.o", &kernel_add_object());
    let out = dir.path().join("gen").join("kernels.rs");

    cargo_bin_cmd!("kernel-bridge")
        .arg("extract")
        .arg(&bin)
        .arg("--out")
        .arg(&out)
        .arg("--verbose")
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote"))
        .stderr(
            predicate::str::contains("kernel_add(i32, i32)")
                .and(predicate::str::contains("kernel_add(f32, f32)"))
                .and(predicate::str::contains("gfx90a")),
        );

    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("// @generated by kernel-bridge"));
}

#[test]
fn extract_json_includes_map_and_diagnostics() {
    let dir = tempdir().unwrap();
    let bin = write_file(dir.path(), "device.o", &kernel_add_object());

    let output = cargo_bin_cmd!("kernel-bridge")
        .arg("extract")
        .arg(&bin)
        .arg("--json")
        .arg("--types-path")
        .arg("crate::kcfg")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let body: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(body["map"]["processor"], "gfx90a");
    assert_eq!(body["map"]["kernels"][0]["name"], "kernel_add");
    assert_eq!(body["diagnostics"][1], "kernel_add(f32, f32)");
    assert!(body["generated"].as_str().unwrap().contains("use crate::kcfg::model::"));
}

#[test]
fn extract_reports_unsupported_platform() {
    let dir = tempdir().unwrap();
    let mut bytes = kernel_add_object();
    // Back to x86_64.
    bytes[18..20].copy_from_slice(&62u16.to_le_bytes());
    let bin = write_file(dir.path(), "host.o", &bytes);

    cargo_bin_cmd!("kernel-bridge")
        .arg("extract")
        .arg(&bin)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported platform"));
}

#[test]
fn extract_rejects_non_object_input() {
    let dir = tempdir().unwrap();
    let bin = write_file(dir.path(), "notes.txt", b"definitely not an object file");

    cargo_bin_cmd!("kernel-bridge").arg("extract").arg(&bin).assert().failure();
    cargo_bin_cmd!("kernel-bridge")
        .arg("extract")
        .arg(dir.path().join("missing.o"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read binary"));
}

#[test]
fn inspect_lists_descriptor_symbols() {
    let dir = tempdir().unwrap();
    let bin = write_file(dir.path(), "device.o", &kernel_add_object());

    cargo_bin_cmd!("kernel-bridge")
        .arg("inspect")
        .arg(&bin)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Architecture: amdgpu")
                .and(predicate::str::contains("kernel_add__i32_i32.kd"))
                .and(predicate::str::contains(".rodata")),
        );

    let output = cargo_bin_cmd!("kernel-bridge")
        .args(["inspect", "--json"])
        .arg(&bin)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let body: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(body["architecture"], "amdgpu");
    assert_eq!(body["machine_flags"], 0x3f);
    assert_eq!(body["relocatable"], true);
}
