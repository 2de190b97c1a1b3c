//! CLI Ende-zu-Ende über das gebaute `erdx`-Binary.

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn erdx_bin() -> &'static str {
    env!("CARGO_BIN_EXE_erdx")
}

fn test_temp_dir(tag: &str) -> PathBuf {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("erdx-cli-e2e-{tag}-{}-{ts}", std::process::id()));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn run_erdx(args: &[&str]) -> Output {
    Command::new(erdx_bin()).args(args).output().expect("run erdx")
}

fn write_xml(dir: &PathBuf, xml: &str) -> PathBuf {
    let path = dir.join("in.xml");
    fs::write(&path, xml).expect("write xml");
    path
}

#[test]
fn validate_gueltiges_dokument() {
    let dir = test_temp_dir("valid");
    let input = write_xml(&dir, "<!DOCTYPE r [ <!ELEMENT r (#PCDATA)> ]><r>ok</r>");

    let out = run_erdx(&["validate", input.to_str().expect("utf-8 path")]);
    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    assert!(String::from_utf8_lossy(&out.stdout).contains("gültig"));
}

#[test]
fn validate_meldet_verstoesse() {
    let dir = test_temp_dir("invalid");
    let input = write_xml(
        &dir,
        "<!DOCTYPE r [ <!ELEMENT r (a)> <!ELEMENT a EMPTY> ]><r></r>",
    );

    let out = run_erdx(&["validate", input.to_str().expect("utf-8 path")]);
    assert!(!out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("unvollständig"), "stdout: {stdout}");
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Fehler:"), "stderr: {stderr}");
    assert!(stderr.contains("1 Verstoß"), "stderr: {stderr}");
}

#[test]
fn tokens_expandiert_entities() {
    let dir = test_temp_dir("tokens");
    let input = write_xml(
        &dir,
        r#"<!DOCTYPE r [ <!ENTITY w "Welt"> ]><r>Hallo &w;</r>"#,
    );

    let out = run_erdx(&["tokens", input.to_str().expect("utf-8 path")]);
    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("StartElement r"), "stdout: {stdout}");
    assert!(stdout.contains("Welt"), "stdout: {stdout}");
    assert!(!stdout.contains("EntityReference"), "stdout: {stdout}");
}

#[test]
fn tokens_report_entities() {
    let dir = test_temp_dir("report");
    let input = write_xml(
        &dir,
        r#"<!DOCTYPE r [ <!ENTITY w "Welt"> ]><r>Hallo &w;</r>"#,
    );

    let out = run_erdx(&[
        "tokens",
        input.to_str().expect("utf-8 path"),
        "--report-entities",
    ]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("EntityReference w"), "stdout: {stdout}");
    // Nicht aufgelöste Referenzen werden nicht expandiert.
    assert!(!stdout.contains("Welt"), "stdout: {stdout}");
}

#[test]
fn tokens_max_entity_depth() {
    let dir = test_temp_dir("depth");
    let input = write_xml(
        &dir,
        concat!(
            r#"<!DOCTYPE r [ <!ENTITY a "&b;"> <!ENTITY b "tief"> ]>"#,
            "<r>&a;</r>",
        ),
    );

    let out = run_erdx(&[
        "tokens",
        input.to_str().expect("utf-8 path"),
        "--max-entity-depth",
        "1",
    ]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Limit 1"), "stderr: {stderr}");
}

#[test]
fn fehlende_datei_meldet_lesefehler() {
    let out = run_erdx(&["validate", "/nicht/vorhanden.xml"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Lesefehler"));
}
