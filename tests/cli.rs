//! End-to-end tests of the `fics` binary over a temp corpus.

use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use serde_json::Value;
use std::process::Command;

mod util;
use util::{make_corpus, read_compressed_lines, record, write_corpus_file};

/// `fics` rooted in `dir`, so config lookup and outputs stay inside it
fn fics(dir: &assert_fs::TempDir) -> Command
{
    let mut cmd = Command::cargo_bin("fics").expect("fics binary");
    cmd.current_dir(dir.path())
        .env_remove("FICSTREAM_LOG");
    cmd
}

fn read_rows(path: &std::path::Path) -> Vec<Value>
{
    std::fs::read_to_string(path)
        .expect("artifact")
        .lines()
        .map(|l| serde_json::from_str(l).expect("json row"))
        .collect()
}

#[test]
fn count_writes_frequency_rows()
{
    let tmp = make_corpus();

    fics(&tmp)
        .args(["--no-color", "count", "corpus", "-o", "fandoms.jsonl"])
        .assert()
        .success()
        .stdout(predicate::str::contains("5 records processed / 2 skipped"));

    let rows = read_rows(
        tmp.child("fandoms.jsonl")
            .path(),
    );
    assert_eq!(rows[0]["name"], "Harry Potter");
    assert_eq!(rows[0]["count"], 3);
    assert_eq!(rows[0]["id"], 1);
    assert_eq!(rows[1]["name"], "Marvel");
    assert_eq!(rows[1]["count"], 2);
}

#[test]
fn parallel_count_matches_sequential()
{
    let tmp = make_corpus();

    fics(&tmp)
        .args(["--quiet", "count", "corpus", "-f", "characters", "-o", "seq.jsonl"])
        .assert()
        .success();
    fics(&tmp)
        .args(["--quiet", "count", "corpus", "-f", "characters", "--parallel", "-o", "par.jsonl"])
        .assert()
        .success();

    let seq = std::fs::read_to_string(tmp.child("seq.jsonl").path()).unwrap();
    let par = std::fs::read_to_string(tmp.child("par.jsonl").path()).unwrap();
    assert_eq!(seq, par);
}

#[test]
fn dry_run_lists_files_and_writes_nothing()
{
    let tmp = make_corpus();

    fics(&tmp)
        .args(["--dry-run", "count", "corpus"])
        .assert()
        .success()
        .stdout(predicate::str::contains("part-000.jsonl.zst"))
        .stdout(predicate::str::contains("part-001.jsonl.zst"))
        .stdout(predicate::str::contains("2 file(s)"));

    tmp.child("fandom_counts.jsonl")
        .assert(predicate::path::missing());
}

#[test]
fn missing_corpus_directory_fails()
{
    let tmp = assert_fs::TempDir::new().unwrap();

    fics(&tmp)
        .args(["count", "nowhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("corpus directory not found"));
}

#[test]
fn entities_then_open_cooccurrence()
{
    let tmp = assert_fs::TempDir::new().unwrap();
    let mut lines = Vec::new();
    for _ in 0..3
    {
        lines.push(record("Sherlock", "Sherlock, John", ""));
    }
    lines.push(record("Sherlock, Doctor Who", "Sherlock, Mary", ""));
    write_corpus_file(&tmp, "c/a.jsonl.zst", &lines);

    fics(&tmp)
        .args(["--quiet", "entities", "c", "-o", "chars.jsonl"])
        .assert()
        .success();

    let rows = read_rows(
        tmp.child("chars.jsonl")
            .path(),
    );
    assert_eq!(rows[0]["name"], "Sherlock");
    // Crossover counts once per group
    assert_eq!(rows[0]["count"], 5);
    assert_eq!(rows[0]["fandom"], serde_json::json!(["Sherlock"]));

    fics(&tmp)
        .args([
            "--quiet",
            "cooccur",
            "c",
            "--mode",
            "open",
            "--sources",
            "chars.jsonl",
            "--min-count",
            "2",
            "-o",
            "co.jsonl",
        ])
        .assert()
        .success();

    let co = read_rows(
        tmp.child("co.jsonl")
            .path(),
    );
    // Only Sherlock (5) and John (3) clear the cutoff
    assert_eq!(co.len(), 2);
    assert_eq!(co[0]["name"], "John");
    assert_eq!(co[1]["name"], "Sherlock");
    assert_eq!(co[1]["co_occurs_with"]["John"], 3);
    // Partners are unrestricted in open mode
    assert_eq!(co[1]["co_occurs_with"]["Mary"], 1);
}

#[test]
fn mutual_cooccurrence_and_export()
{
    let tmp = assert_fs::TempDir::new().unwrap();
    let mut lines = Vec::new();
    for _ in 0..12
    {
        lines.push(record("F", "A, B", ""));
    }
    lines.push(record("F", "A, Rare", ""));
    write_corpus_file(&tmp, "c/a.jsonl.zst", &lines);

    fics(&tmp)
        .args(["--quiet", "cooccur", "c", "--min-count", "5", "-o", "co.jsonl"])
        .assert()
        .success();
    fics(&tmp)
        .args(["--quiet", "entities", "c", "-o", "chars.jsonl"])
        .assert()
        .success();

    let co = read_rows(
        tmp.child("co.jsonl")
            .path(),
    );
    assert_eq!(co.len(), 2);
    assert_eq!(co[0]["name"], "A");
    assert_eq!(co[0]["count"], 13);
    assert!(co[0]["co_occurs_with"]
        .get("Rare")
        .is_none());

    fics(&tmp)
        .args([
            "--quiet",
            "export",
            "co.jsonl",
            "-e",
            "chars.jsonl",
            "-o",
            "graph",
            "--min-appearances",
            "10",
            "--min-edge-weight",
            "10",
        ])
        .assert()
        .success();

    tmp.child("graph/nodes.csv")
        .assert("id,label,count\nA,A,13\nB,B,12\n");
    tmp.child("graph/edges.csv")
        .assert("Source,Target,Weight\nA,B,12\n");

    // Thresholds nothing survives are fatal
    fics(&tmp)
        .args(["export", "co.jsonl", "-e", "chars.jsonl", "--min-edge-weight", "1000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("graph is empty"));
}

#[test]
fn rewrite_uses_configured_defaults()
{
    let tmp = make_corpus();

    fics(&tmp)
        .args(["--no-color", "rewrite", "corpus", "-o", "clean"])
        .assert()
        .success()
        .stdout(predicate::str::contains("4 kept / 1 dropped / 2 malformed"));

    let lines = read_compressed_lines(
        tmp.child("clean/part-001.jsonl.zst")
            .path(),
    );
    assert_eq!(lines.len(), 2);
    assert!(!lines[0].contains("\"text\""));
}

#[test]
fn report_prints_tables()
{
    let tmp = assert_fs::TempDir::new().unwrap();
    tmp.child("f.jsonl")
        .write_str("{\"id\":1,\"name\":\"HP\",\"count\":10}\n{\"id\":2,\"name\":\"MCU\",\"count\":8}\n")
        .unwrap();
    tmp.child("e.jsonl")
        .write_str(
            "{\"id\":1,\"name\":\"Harry\",\"fandom\":[\"HP\"],\"count\":9}\n\
             {\"id\":2,\"name\":\"Peter\",\"fandom\":[\"MCU\",\"HP\"],\"count\":4}\n",
        )
        .unwrap();

    fics(&tmp)
        .args(["--no-color", "report", "--fandoms", "f.jsonl", "--entities", "e.jsonl"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Top 2 groups"))
        .stdout(predicate::str::contains("Harry"))
        .stdout(predicate::str::contains("- Peter -> MCU, HP"));
}

#[test]
fn init_refuses_to_overwrite()
{
    let tmp = assert_fs::TempDir::new().unwrap();

    fics(&tmp)
        .args(["init"])
        .assert()
        .success();
    tmp.child("ficstream.toml")
        .assert(predicate::str::contains("degree_cap = 20"));

    fics(&tmp)
        .args(["init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}

#[test]
fn env_overrides_config()
{
    let tmp = make_corpus();

    // No file carries this extension
    fics(&tmp)
        .env("FICSTREAM_CORPUS_EXTENSION", ".nothing")
        .args(["--dry-run", "count", "corpus"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 file(s)"));
}

#[test]
fn completions_to_stdout()
{
    let tmp = assert_fs::TempDir::new().unwrap();

    fics(&tmp)
        .args(["completions", "bash", "--stdout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fics"));
}
