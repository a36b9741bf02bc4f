use std::fs;
use std::io::Write;
use tempfile::TempDir;

use tcgrules_core::chunker::{ChunkingConfig, Chunker};
use tcgrules_core::corpus::Corpus;
use tcgrules_core::error::Error;
use tcgrules_core::types::Category;

fn seed_corpus(root: &std::path::Path) {
    fs::create_dir_all(root.join("rules")).unwrap();
    fs::create_dir_all(root.join("judge-calls")).unwrap();
    fs::write(
        root.join("rules/basic.txt"),
        "Attach one Energy card to one of your Pokémon each turn.",
    )
    .unwrap();
    fs::write(
        root.join("judge-calls/ruling1.txt"),
        "A Pokémon with Burn cannot also carry Poison as a separate check.",
    )
    .unwrap();
}

#[test]
fn load_reads_both_categories_with_source_ids() {
    let tmp = TempDir::new().unwrap();
    seed_corpus(tmp.path());

    let corpus = Corpus::load(tmp.path()).expect("load");

    assert_eq!(corpus.len(), 2);
    let ids: Vec<&str> = corpus.documents().iter().map(|d| d.source_id.as_str()).collect();
    assert_eq!(ids, vec!["judge-calls/ruling1.txt", "rules/basic.txt"], "sorted by source id");
    assert_eq!(corpus.documents()[0].category, Category::JudgeCall);
    assert_eq!(corpus.documents()[1].category, Category::Rule);
}

#[test]
fn load_skips_non_txt_and_tolerates_missing_category() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::create_dir_all(dir.join("rules")).unwrap();
    fs::write(dir.join("rules/notes.md"), "ignored").unwrap();
    let mut f = fs::File::create(dir.join("rules/a.txt")).unwrap();
    writeln!(f, "Short text").unwrap();

    let corpus = Corpus::load(dir).expect("load");

    assert_eq!(corpus.len(), 1, "only the .txt file becomes a document");
    assert_eq!(corpus.documents()[0].text.trim(), "Short text");
}

#[test]
fn load_decodes_invalid_utf8_lossily() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("judge-calls")).unwrap();
    fs::write(tmp.path().join("judge-calls/bad.txt"), [b'o', b'k', 0xff, b'!']).unwrap();

    let corpus = Corpus::load(tmp.path()).expect("load");

    assert!(corpus.documents()[0].text.starts_with("ok"));
}

#[test]
fn load_fails_on_missing_root() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nope");
    assert!(matches!(Corpus::load(&missing), Err(Error::NotFound(_))));
}

#[cfg(unix)]
#[test]
fn load_fails_on_dangling_link_instead_of_skipping_it() {
    let tmp = TempDir::new().unwrap();
    seed_corpus(tmp.path());
    std::os::unix::fs::symlink(tmp.path().join("gone.txt"), tmp.path().join("rules/linked.txt")).unwrap();

    assert!(matches!(Corpus::load(tmp.path()), Err(Error::Io(_))));
}

#[cfg(unix)]
#[test]
fn load_follows_linked_files() {
    let tmp = TempDir::new().unwrap();
    seed_corpus(tmp.path());
    fs::write(tmp.path().join("outside.txt"), "Linked rule text").unwrap();
    std::os::unix::fs::symlink(tmp.path().join("outside.txt"), tmp.path().join("rules/linked.txt")).unwrap();

    let corpus = Corpus::load(tmp.path()).expect("load");
    assert_eq!(corpus.len(), 3);
    assert!(corpus.documents().iter().any(|d| d.source_id == "rules/linked.txt"));
}

#[test]
fn scenario_documents_chunk_into_one_or_two_segments() {
    let tmp = TempDir::new().unwrap();
    seed_corpus(tmp.path());
    let corpus = Corpus::load(tmp.path()).unwrap();
    let chunker = Chunker::new(ChunkingConfig { max_len: 40, overlap: 5 }).unwrap();

    for doc in corpus.documents() {
        let segments = chunker.segments(doc);
        assert!((1..=2).contains(&segments.len()), "{} -> {}", doc.source_id, segments.len());
        for s in &segments {
            assert!(s.text.chars().count() <= 40);
            assert!(s.offset + s.text.chars().count() <= doc.text.chars().count());
        }
    }
}
