mod common;

use common::{Workspace, write_files};
use predicates::prelude::*;
use std::fs;

const SAMPLE_FILES: &[(&str, &[u8])] = &[
    ("recording.mp4", b"pretend this is a long video"),
    ("notes.md", b"# Notes"),
    ("subs/recording.srt", b"1\n00:00:00,000 --> 00:00:01,000\nHello\n"),
    ("node_modules/pkg/index.js", b"module.exports = 1;"),
];

#[test]
fn dry_run_reports_destination_and_changes_nothing() {
    let ws = Workspace::new();
    let source = ws.project("b65-sample", SAMPLE_FILES);

    ws.cmd()
        .args(["archive", "appydave", "b65-sample", "--force", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("would archive to"))
        .stdout(predicate::str::contains("b50-b99"));

    assert!(source.join("recording.mp4").is_file());
    assert!(!ws.backup_root.join("b50-b99").exists());
}

#[test]
fn archive_copy_then_force_delete_then_restore_light_files() {
    let ws = Workspace::new();
    let source = ws.project("b65-sample", SAMPLE_FILES);
    let backup = ws.backup_root.join("b50-b99/b65-sample");

    ws.cmd()
        .args(["archive", "ad", "b65-sample"])
        .assert()
        .success()
        .stdout(predicate::str::contains("b65-sample: archived to"));
    assert!(backup.join("subs/recording.srt").is_file());
    assert!(!backup.join("node_modules").exists());
    assert!(source.is_dir());

    ws.cmd()
        .args(["archive", "ad", "b65-sample"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already archived at"));

    ws.cmd()
        .args(["archive", "ad", "b65-sample", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("removed local copy"));
    assert!(!source.exists());
    assert!(backup.join("recording.mp4").is_file());

    ws.cmd().args(["manifest", "ad"]).assert().success();
    ws.cmd()
        .args(["sync-ssd", "ad"])
        .assert()
        .success()
        .stdout(predicate::str::contains("b65-sample: 2 copied"));

    let archived = ws.brand_root.join("archived/b50-b99/b65-sample");
    assert!(archived.join("notes.md").is_file());
    assert!(archived.join("subs/recording.srt").is_file());
    assert!(!archived.join("recording.mp4").exists());

    ws.cmd().args(["manifest", "ad"]).assert().success();
    let manifest = fs::read_to_string(ws.brand_root.join("projects.json")).unwrap();
    assert!(manifest.contains("\"structure\": \"archived\""));
    assert!(manifest.contains("\"path\": \"b50-b99/b65-sample\""));
}

#[test]
fn failed_copy_keeps_source() {
    let ws = Workspace::new();
    let source = ws.project("b65-sample", SAMPLE_FILES);
    fs::write(ws.backup_root.join("b50-b99"), "not a directory").unwrap();

    ws.cmd()
        .args(["archive", "appydave", "b65-sample", "--force"])
        .assert()
        .code(255)
        .stderr(predicate::str::contains("incomplete"));

    assert!(source.join("recording.mp4").is_file());
}

#[test]
fn unmounted_backup_is_a_hard_stop() {
    let ws = Workspace::new();
    ws.project("b65-sample", SAMPLE_FILES);
    fs::remove_dir_all(&ws.backup_root).unwrap();

    ws.cmd()
        .args(["archive", "appydave", "b65-sample"])
        .assert()
        .code(255)
        .stderr(predicate::str::contains("not available"));
}

#[test]
fn ambiguous_short_code_prompts_for_selection() {
    let ws = Workspace::new();
    ws.project("b65-sample", &[("a.md", b"a")]);
    ws.project("b65-sample-extended", &[("b.md", b"b")]);

    ws.cmd()
        .args(["archive", "appydave", "b65", "--dry-run"])
        .write_stdin("2\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("1. b65-sample"))
        .stdout(predicate::str::contains("b65-sample-extended: would archive"));

    ws.cmd()
        .args(["archive", "appydave", "b65", "--dry-run"])
        .write_stdin("9\n")
        .assert()
        .code(255)
        .stderr(predicate::str::contains("Invalid selection '9'"));
}

#[test]
fn wildcard_archives_every_match() {
    let ws = Workspace::new();
    ws.project("b40-one", &[("a.md", b"a")]);
    ws.project("b41-two", &[("b.md", b"b")]);
    ws.project("c10-other", &[("c.md", b"c")]);

    ws.cmd()
        .args(["archive", "appydave", "b4*"])
        .assert()
        .success();

    assert!(ws.backup_root.join("b00-b49/b40-one/a.md").is_file());
    assert!(ws.backup_root.join("b00-b49/b41-two/b.md").is_file());
    assert!(!ws.backup_root.join("c00-c49").exists());
}

#[test]
fn sync_ssd_without_manifest_explains_next_step() {
    let ws = Workspace::new();
    write_files(&ws.backup_root.join("b00-b49/b40-old"), &[("a.srt", b"x")]);

    ws.cmd()
        .args(["sync-ssd", "appydave"])
        .assert()
        .code(255)
        .stderr(predicate::str::contains("dam manifest"));
}
