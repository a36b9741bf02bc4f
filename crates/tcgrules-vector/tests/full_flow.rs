mod common;

use std::fs;
use std::sync::Arc;

use tempfile::TempDir;

use tcgrules_core::corpus::Corpus;
use tcgrules_core::error::Error;
use tcgrules_vector::{format, IndexStore, RetrievalService, Status};

use common::{ingestor, seed_corpus, KeywordEmbedder, SwitchableEmbedder};

#[tokio::test]
async fn energy_question_ranks_the_basic_rule_first() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    seed_corpus(tmp.path());
    let corpus = Corpus::load(tmp.path())?;
    let index_path = tmp.path().join("vector-store/index.tcgx");

    let (store, report) = ingestor(Arc::new(KeywordEmbedder)).ingest(&corpus, &index_path).await?;
    assert_eq!(report.documents, 2);
    for source in ["rules/basic.txt", "judge-calls/ruling1.txt"] {
        let n = store.entries().iter().filter(|e| e.segment.source_id == source).count();
        assert!((1..=2).contains(&n), "{source} -> {n} segments");
    }

    let service = RetrievalService::new(ingestor(Arc::new(KeywordEmbedder)), tmp.path(), &index_path);
    let passages = service.search("How many Energy cards per turn?", 5).await?;
    assert!(!passages.is_empty());
    assert_eq!(passages[0].source_id, "rules/basic.txt");
    for pair in passages.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    Ok(())
}

#[tokio::test]
async fn persisted_index_round_trips_exactly() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    seed_corpus(tmp.path());
    let corpus = Corpus::load(tmp.path())?;
    let index_path = tmp.path().join("index.tcgx");

    let (built, _) = ingestor(Arc::new(KeywordEmbedder)).ingest(&corpus, &index_path).await?;
    let loaded: IndexStore = format::load(&index_path)?;
    assert_eq!(loaded, built);

    let query = [1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0];
    assert_eq!(loaded.search(&query, 3)?, built.search(&query, 3)?);
    Ok(())
}

#[tokio::test]
async fn ingestion_is_deterministic() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    seed_corpus(tmp.path());
    let corpus = Corpus::load(tmp.path())?;

    let a = tmp.path().join("a.tcgx");
    let b = tmp.path().join("b.tcgx");
    ingestor(Arc::new(KeywordEmbedder)).ingest(&corpus, &a).await?;
    ingestor(Arc::new(KeywordEmbedder)).ingest(&corpus, &b).await?;
    assert_eq!(fs::read(&a)?, fs::read(&b)?);
    Ok(())
}

#[tokio::test]
async fn truncated_index_is_corrupt_and_service_rebuilds() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    seed_corpus(tmp.path());
    let corpus = Corpus::load(tmp.path())?;
    let index_path = tmp.path().join("index.tcgx");
    ingestor(Arc::new(KeywordEmbedder)).ingest(&corpus, &index_path).await?;

    let bytes = fs::read(&index_path)?;
    fs::write(&index_path, &bytes[..bytes.len() / 2])?;
    assert!(matches!(format::load(&index_path), Err(Error::CorruptIndex(_))));

    let service = RetrievalService::new(ingestor(Arc::new(KeywordEmbedder)), tmp.path(), &index_path);
    let store = service.store().await?;
    assert!(!store.is_empty());
    assert!(matches!(service.status().await, Status::Loaded { .. }));
    assert_eq!(fs::read(&index_path)?, bytes, "rebuild rewrote an identical file");
    Ok(())
}

#[tokio::test]
async fn failing_embedder_leaves_prior_file_intact() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    seed_corpus(tmp.path());
    let corpus = Corpus::load(tmp.path())?;
    let index_path = tmp.path().join("index.tcgx");
    ingestor(Arc::new(KeywordEmbedder)).ingest(&corpus, &index_path).await?;
    let before = fs::read(&index_path)?;

    let result = ingestor(Arc::new(SwitchableEmbedder::failing())).ingest(&corpus, &index_path).await;
    assert!(matches!(result, Err(Error::EmbeddingUnavailable(_))));
    assert_eq!(fs::read(&index_path)?, before);
    assert_eq!(fs::read_dir(tmp.path())?.count(), 3, "no temp file left next to the index");
    Ok(())
}

#[tokio::test]
async fn stale_model_id_triggers_rebuild() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    seed_corpus(tmp.path());
    let index_path = tmp.path().join("index.tcgx");

    let mut stale = IndexStore::with_model("some-other-model");
    stale.insert(
        tcgrules_core::types::Segment {
            text: "old".into(),
            source_id: "rules/old.txt".into(),
            category: tcgrules_core::types::Category::Rule,
            offset: 0,
        },
        vec![1.0; 8],
    )?;
    format::save(&stale, &index_path)?;

    let service = RetrievalService::new(ingestor(Arc::new(KeywordEmbedder)), tmp.path(), &index_path);
    let store = service.store().await?;
    assert_eq!(store.model_id(), "keyword:v1");
    assert!(store.entries().iter().all(|e| e.segment.source_id != "rules/old.txt"));
    assert_eq!(format::load(&index_path)?.model_id(), "keyword:v1");
    Ok(())
}

#[tokio::test]
async fn missing_corpus_reports_unavailable() {
    let tmp = TempDir::new().expect("tmp");
    let service = RetrievalService::new(
        ingestor(Arc::new(KeywordEmbedder)),
        tmp.path().join("no-corpus"),
        tmp.path().join("index.tcgx"),
    );
    assert!(matches!(service.store().await, Err(Error::RetrievalUnavailable(_))));
    assert!(matches!(service.status().await, Status::Failed { .. }));
}
