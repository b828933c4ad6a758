//! Shared test utilities for integration tests
//!
//! Builds small zstd-compressed JSONL corpora in temp directories.

#![allow(dead_code)]

use assert_fs::prelude::*;

/// One metadata record as a JSON line
pub fn record(
    fandom: &str,
    characters: &str,
    relationship: &str,
) -> String
{
    serde_json::json!({
        "metadata": {
            "Fandom": fandom,
            "Characters": characters,
            "Relationship": relationship,
        },
        "text": "Once upon a time",
    })
    .to_string()
}

/// Compress `lines` (newline-terminated) into `name` under `dir`
pub fn write_corpus_file(
    dir: &assert_fs::TempDir,
    name: &str,
    lines: &[String],
)
{
    let mut body = String::new();
    for line in lines
    {
        body.push_str(line);
        body.push('\n');
    }

    write_compressed(dir, name, body.as_bytes());
}

/// Compress raw bytes into `name` under `dir`
pub fn write_compressed(
    dir: &assert_fs::TempDir,
    name: &str,
    body: &[u8],
)
{
    let bytes = zstd::encode_all(body, 3).expect("compress");
    let child = dir.child(name);
    if let Some(parent) = child.path().parent()
    {
        std::fs::create_dir_all(parent).expect("corpus dir");
    }
    child
        .write_binary(&bytes)
        .expect("write corpus file");
}

/// Two-file corpus with one malformed line and one blank line
pub fn make_corpus() -> assert_fs::TempDir
{
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    let a = vec![
        record("Harry Potter", "Harry, Ron, Hermione", "Harry/Ginny, Ron/Hermione"),
        record("Harry Potter, Marvel", "Harry, Tony", ""),
        "{not json".to_string(),
    ];
    let b = vec![
        record("Harry Potter", "Ron, Hermione", "Ron/Hermione"),
        String::new(),
        record("Marvel", "Tony, Peter", "Tony/Peter"),
        record("Original Work", "Reader", ""),
    ];

    write_corpus_file(&tmp, "corpus/part-000.jsonl.zst", &a);
    write_corpus_file(&tmp, "corpus/part-001.jsonl.zst", &b);
    tmp
}

/// Decompress a file and return its lines
pub fn read_compressed_lines(path: &std::path::Path) -> Vec<String>
{
    let bytes = std::fs::read(path).expect("read output");
    let body = zstd::decode_all(bytes.as_slice()).expect("decompress output");
    String::from_utf8(body)
        .expect("utf8")
        .lines()
        .map(str::to_owned)
        .collect()
}
