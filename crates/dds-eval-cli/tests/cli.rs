//! End-to-end runs of the `dds-eval` binary against fake encoder scripts.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::{Command, Output};

const PNG2DDS: &str = "#!/bin/sh\ncase \"$1\" in\n  --help) echo 'png2dds 0.9.1'; exit 0 ;;\nesac\nprintf 'DDS data' > \"$3/$(basename \"$2\" .png).dds\"\n";

fn install(dir: &Path, name: &str, script: &str) {
    let path = dir.join(name);
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// Run the binary with `bin` in front of the inherited search path, so the
/// fake tools shadow real ones while `basename` and friends stay reachable.
fn dds_eval(bin: &Path, args: &[&str]) -> Output {
    let inherited = std::env::var_os("PATH").unwrap_or_default();
    let dirs = std::iter::once(bin.to_path_buf()).chain(std::env::split_paths(&inherited));
    let search_path = std::env::join_paths(dirs).unwrap();
    Command::new(env!("CARGO_BIN_EXE_dds-eval"))
        .args(args)
        .env("PATH", search_path)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

#[test]
fn compare_files_png2dds() {
    let bin = tempfile::tempdir().unwrap();
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    install(bin.path(), "png2dds", PNG2DDS);
    fs::write(input.path().join("a.png"), b"\x89PNG").unwrap();
    fs::write(input.path().join("b.png"), b"\x89PNG").unwrap();

    let result = dds_eval(
        bin.path(),
        &[
            "compare",
            input.path().to_str().unwrap(),
            output.path().to_str().unwrap(),
            "--files",
            "--png2dds",
        ],
    );

    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));
    let stdout = String::from_utf8(result.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "File,Tool,Time (ns),Size (Bytes)");
    for line in &lines[1..] {
        let fields: Vec<&str> = line.split(',').collect();
        assert_eq!(fields[1], "png2dds");
        assert!(fields[2].parse::<u64>().unwrap() > 0);
        assert!(fields[3].parse::<u64>().unwrap() > 0);
    }
}

#[test]
fn compare_metrics_without_encoded_output_fails() {
    let bin = tempfile::tempdir().unwrap();
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    install(bin.path(), "png2dds", PNG2DDS);
    for tool in ["nvdecompress", "flip", "magick"] {
        install(bin.path(), tool, "#!/bin/sh\nexit 0\n");
    }
    fs::write(input.path().join("a.png"), b"\x89PNG").unwrap();

    let result = dds_eval(
        bin.path(),
        &[
            "compare",
            input.path().to_str().unwrap(),
            output.path().to_str().unwrap(),
            "--metrics",
            "--png2dds",
        ],
    );

    assert!(!result.status.success());
    let stdout = String::from_utf8(result.stdout).unwrap();
    assert_eq!(stdout, "File,Tool,FLIP (Mean),PSNR,RMSE (%),SSIM\n");
}

#[test]
fn compare_missing_executable_is_one_line() {
    let bin = tempfile::tempdir().unwrap();
    let input = tempfile::tempdir().unwrap();

    let result = dds_eval(
        bin.path(),
        &[
            "compare",
            input.path().to_str().unwrap(),
            input.path().join("out").to_str().unwrap(),
            "--files",
            "--texconv",
        ],
    );

    assert!(!result.status.success());
    assert!(result.stdout.is_empty());
    let stderr = String::from_utf8(result.stderr).unwrap();
    assert_eq!(stderr.lines().count(), 1, "{stderr}");
    assert!(stderr.contains("To use texconv, texconv must be present in the PATH"));
}

#[test]
fn compare_invalid_input_directory() {
    let bin = tempfile::tempdir().unwrap();
    install(bin.path(), "png2dds", PNG2DDS);

    let result = dds_eval(
        bin.path(),
        &["compare", "/nonexistent/input", "/nonexistent/output", "--png2dds"],
    );

    assert!(!result.status.success());
    let stderr = String::from_utf8(result.stderr).unwrap();
    assert!(stderr.contains("Input directory /nonexistent/input is not valid"));
}

#[test]
fn flatten_copies_nested_pngs() {
    let bin = tempfile::tempdir().unwrap();
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    fs::create_dir_all(input.path().join("a")).unwrap();
    fs::create_dir_all(input.path().join("b")).unwrap();
    fs::write(input.path().join("a/tile.png"), "a").unwrap();
    fs::write(input.path().join("b/tile.png"), "b").unwrap();
    fs::write(input.path().join("b/notes.txt"), "x").unwrap();

    let result = dds_eval(
        bin.path(),
        &[
            "flatten",
            input.path().to_str().unwrap(),
            output.path().to_str().unwrap(),
        ],
    );

    assert!(result.status.success(), "{}", String::from_utf8_lossy(&result.stderr));
    assert_eq!(fs::read_to_string(output.path().join("tile.png")).unwrap(), "a");
    assert_eq!(fs::read_to_string(output.path().join("tile_1.png")).unwrap(), "b");
    assert!(!output.path().join("notes.txt").exists());
}

#[test]
fn fetch_rejects_unknown_tool() {
    let bin = tempfile::tempdir().unwrap();
    let result = dds_eval(bin.path(), &["fetch", "cmake"]);
    assert!(!result.status.success());
    assert!(String::from_utf8(result.stderr).unwrap().contains("unknown tool"));
}
