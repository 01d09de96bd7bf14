//! Shared fixtures: a small directory tree and a stand-in for the disk usage
//! oracle that replays a canned report.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Oracle report matching [`create_tree`]; sizes are what the oracle claims,
/// not what is on disk
pub const TREE_REPORT: &str = "\
12 a.txt
4096 sub
500 sub/b.bin
100 notes.txt
40 link
77 gone.dat
";

/// Header and one row in the oracle's coverage format
pub const COVERAGE_REPORT: &str = "\
Date       Time       Files    Dirs    Size Path
2026-10-01 12:00:00       4       1    1.2K /data
";

/// Create the tree described by [`TREE_REPORT`] under a fresh temp dir.
///
/// `gone.dat` is listed by the oracle but deliberately missing on disk.
pub fn create_tree() -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let root = dir.path();

    fs::write(root.join("a.txt"), "tiny file\n").unwrap();
    fs::create_dir(root.join("sub")).unwrap();
    fs::write(root.join("sub").join("b.bin"), vec![0u8; 500]).unwrap();
    fs::write(
        root.join("notes.txt"),
        "hello world, this is a plain text note\n".repeat(3),
    )
    .unwrap();
    std::os::unix::fs::symlink(root.join("notes.txt"), root.join("link")).unwrap();

    dir
}

/// Root of a fixture tree as the string the index keys it by
pub fn root_of(dir: &TempDir) -> String {
    dir.path().to_str().expect("temp dir is not UTF-8").to_string()
}

/// Write an executable oracle script into `dir` that prints `report` for
/// `ls` and [`COVERAGE_REPORT`] for `info`
pub fn fake_oracle(dir: &Path, report: &str) -> PathBuf {
    let report_path = dir.join("report.txt");
    let coverage_path = dir.join("coverage.txt");
    fs::write(&report_path, report).unwrap();
    fs::write(&coverage_path, COVERAGE_REPORT).unwrap();

    let script = format!(
        "#!/bin/sh\nif [ \"$1\" = info ]; then\n  cat '{}'\nelse\n  cat '{}'\nfi\n",
        coverage_path.display(),
        report_path.display()
    );
    write_script(dir, "fake-duc", &script)
}

/// Oracle script that refuses every path the way the real one does for
/// paths outside its database
pub fn refusing_oracle(dir: &Path) -> PathBuf {
    write_script(
        dir,
        "refusing-duc",
        "#!/bin/sh\necho 'Requested path not found' >&2\nexit 1\n",
    )
}

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}
