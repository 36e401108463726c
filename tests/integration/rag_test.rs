//! Retrieval Pipeline Integration Tests
//!
//! Drives the full path from files on disk to scored, provenance-carrying
//! context: extraction, chunking, embedding, the saved artifacts and the
//! retriever bound over them. All embeddings come from the local hashing
//! provider, so scores are deterministic.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use prospector::models::{DocType, TranscriptEntry};
use prospector::services::rag::{DocumentIndexer, HashEmbeddingProvider, Retriever};
use tempfile::tempdir;

fn provider() -> Arc<HashEmbeddingProvider> {
    Arc::new(HashEmbeddingProvider::with_dimension(128))
}

fn numbered_text(n: usize, tag: &str) -> String {
    (0..n)
        .map(|i| format!("{tag}{i}"))
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// Chunking geometry through the indexer
// ============================================================================

#[tokio::test]
async fn test_six_hundred_word_documents_produce_two_chunks_each() {
    let dir = tempdir().unwrap();
    let mut files: Vec<PathBuf> = Vec::new();
    for tag in ["alpha", "beta", "gamma"] {
        let path = dir.path().join(format!("{tag}.txt"));
        fs::write(&path, numbered_text(600, tag)).unwrap();
        files.push(path);
    }

    let mut indexer = DocumentIndexer::new(provider(), 500, 50).unwrap();
    let report = indexer.index_files(&files).await.unwrap();

    assert_eq!(report.files_processed, 3);
    assert_eq!(report.chunks_indexed, 6);
    assert!(report.failures.is_empty());
    assert_eq!(indexer.chunk_count(), 6);

    // The second window of each document starts at the 450-word stride.
    let alpha: Vec<_> = indexer
        .chunks()
        .iter()
        .filter(|c| c.metadata.source_id == "alpha.txt")
        .collect();
    assert_eq!(alpha.len(), 2);
    assert_eq!(alpha[0].metadata.chunk_index, 0);
    assert!(alpha[0].content.starts_with("alpha0 "));
    assert!(alpha[0].content.ends_with("alpha499"));
    assert_eq!(alpha[1].metadata.chunk_index, 1);
    assert!(alpha[1].content.starts_with("alpha450 "));
    assert!(alpha[1].content.ends_with("alpha599"));
}

#[tokio::test]
async fn test_saved_artifacts_keep_vector_chunk_parity() {
    let dir = tempdir().unwrap();
    let mut files: Vec<PathBuf> = Vec::new();
    for tag in ["alpha", "beta", "gamma"] {
        let path = dir.path().join(format!("{tag}.txt"));
        fs::write(&path, numbered_text(600, tag)).unwrap();
        files.push(path);
    }
    let index_path = dir.path().join("artifacts").join("vector_index");
    let metadata_path = dir.path().join("artifacts").join("chunks.json");

    let mut indexer = DocumentIndexer::new(provider(), 500, 50).unwrap();
    indexer.index_files(&files).await.unwrap();
    indexer.save(&index_path, &metadata_path).unwrap();

    let mut retriever = Retriever::new(provider());
    assert!(retriever.load(&index_path, &metadata_path).await);

    let stats = retriever.document_stats();
    assert_eq!(stats.total_chunks, 6);
    assert_eq!(stats.dimension, 128);
    assert_eq!(stats.by_doc_type.get("document"), Some(&6));
    assert_eq!(stats.by_source.len(), 3);
}

// ============================================================================
// Search round trips
// ============================================================================

#[tokio::test]
async fn test_retrieval_round_trip_finds_the_right_source() {
    let dir = tempdir().unwrap();
    let notes = dir.path().join("storage_engine.md");
    fs::write(
        &notes,
        "the storage engine compacts segments nightly and keeps a write ahead log for crash recovery",
    )
    .unwrap();
    let roadmap = dir.path().join("roadmap.txt");
    fs::write(
        &roadmap,
        "quarterly hiring plan marketing budget and conference travel forecast",
    )
    .unwrap();
    let index_path = dir.path().join("vector_index");
    let metadata_path = dir.path().join("chunks.json");

    let mut indexer = DocumentIndexer::with_defaults(provider());
    indexer.index_files(&[notes, roadmap]).await.unwrap();
    indexer.save(&index_path, &metadata_path).unwrap();

    let mut retriever = Retriever::new(provider());
    assert!(retriever.load(&index_path, &metadata_path).await);
    assert!(retriever.is_ready());

    let results = retriever
        .search("storage engine write ahead log compaction", 2)
        .await;
    assert!(!results.is_empty());
    assert_eq!(results[0].metadata.source_id, "storage_engine.md");
    assert_eq!(results[0].metadata.doc_type, DocType::Document);
    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }

    let context = retriever.format_context(&results);
    assert!(context.starts_with("Document 1 (Source: storage_engine.md"));
    assert!(context.contains("write ahead log"));
}

#[tokio::test]
async fn test_transcripts_are_separable_by_doc_type() {
    let dir = tempdir().unwrap();
    let notes = dir.path().join("notes.txt");
    fs::write(&notes, "billing module design and invoice ledger layout").unwrap();
    let index_path = dir.path().join("vector_index");
    let metadata_path = dir.path().join("chunks.json");

    let transcripts = vec![TranscriptEntry::new(
        "standup",
        "we discussed the billing module rollout and the invoice ledger",
    )];

    let mut indexer = DocumentIndexer::with_defaults(provider());
    indexer.index_files(&[notes]).await.unwrap();
    indexer.index_transcripts(&transcripts).await.unwrap();
    indexer.save(&index_path, &metadata_path).unwrap();

    let mut retriever = Retriever::new(provider());
    assert!(retriever.load(&index_path, &metadata_path).await);

    let results = retriever
        .search_by_type("billing module invoice ledger", DocType::Transcript, 5)
        .await;
    assert!(!results.is_empty());
    assert!(results
        .iter()
        .all(|r| r.metadata.doc_type == DocType::Transcript));
    assert!(results.iter().all(|r| r.metadata.source_id == "standup"));
}

#[tokio::test]
async fn test_multi_query_context_never_repeats_a_chunk() {
    let dir = tempdir().unwrap();
    let notes = dir.path().join("notes.txt");
    fs::write(&notes, "ingestion worker pool drains the event queue").unwrap();
    let index_path = dir.path().join("vector_index");
    let metadata_path = dir.path().join("chunks.json");

    let mut indexer = DocumentIndexer::with_defaults(provider());
    indexer.index_files(&[notes]).await.unwrap();
    indexer.save(&index_path, &metadata_path).unwrap();

    let mut retriever = Retriever::new(provider());
    assert!(retriever.load(&index_path, &metadata_path).await);

    // Both queries hit the same single chunk; it must appear once.
    let queries = vec![
        "ingestion worker pool".to_string(),
        "event queue drain".to_string(),
    ];
    let context = retriever.multi_query_context(&queries, 3).await;
    assert_eq!(context.matches("ingestion worker pool").count(), 1);
    assert!(context.starts_with("Document 1 "));
    assert!(!context.contains("Document 2 "));
}

// ============================================================================
// Failure containment
// ============================================================================

#[tokio::test]
async fn test_unsupported_files_are_reported_not_fatal() {
    let dir = tempdir().unwrap();
    let good = dir.path().join("good.txt");
    fs::write(&good, "perfectly ordinary indexable text").unwrap();
    let weird = dir.path().join("weird.xyz");
    fs::write(&weird, "binary-ish junk").unwrap();
    let missing = dir.path().join("never_written.txt");

    let mut indexer = DocumentIndexer::with_defaults(provider());
    let report = indexer
        .index_files(&[good, weird, missing])
        .await
        .unwrap();

    assert_eq!(report.files_processed, 1);
    assert_eq!(report.failures.len(), 2);
    assert!(report
        .failures
        .iter()
        .any(|f| f.source.ends_with("weird.xyz")));
    assert!(report
        .failures
        .iter()
        .any(|f| f.source.ends_with("never_written.txt")));
    assert_eq!(indexer.chunk_count(), 1);
}

#[tokio::test]
async fn test_retriever_read_paths_never_error() {
    let dir = tempdir().unwrap();
    let mut retriever = Retriever::new(provider());

    // Nothing loaded: empty results, empty context, default stats.
    assert!(!retriever.is_ready());
    assert!(retriever.search("anything", 5).await.is_empty());
    assert_eq!(retriever.document_stats().total_chunks, 0);

    // Loading from a directory with no artifacts reports not-ready.
    assert!(
        !retriever
            .load(&dir.path().join("vector_index"), &dir.path().join("chunks.json"))
            .await
    );

    // Blank queries stay empty even with a loaded index.
    let notes = dir.path().join("notes.txt");
    fs::write(&notes, "some indexed words").unwrap();
    let index_path = dir.path().join("vector_index");
    let metadata_path = dir.path().join("chunks.json");
    let mut indexer = DocumentIndexer::with_defaults(provider());
    indexer.index_files(&[notes]).await.unwrap();
    indexer.save(&index_path, &metadata_path).unwrap();
    assert!(retriever.load(&index_path, &metadata_path).await);
    assert!(retriever.search("   ", 5).await.is_empty());
    assert!(retriever.search("some indexed words", 0).await.is_empty());
}
