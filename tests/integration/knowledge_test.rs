//! Knowledge Catalog Integration Tests
//!
//! Exercises the catalog across process boundaries: every test persists,
//! reopens from the JSON file and checks what a later session would see.
//! Timestamp-sensitive cases backdate entries by editing the file itself,
//! the same way long-lived deployments age.

use std::fs;
use std::path::Path;

use chrono::{Duration, Utc};
use prospector::models::{AnalysisRecord, PaperRecord, PaperSourceType, RepositoryRecord};
use prospector::services::knowledge::KnowledgeStore;
use tempfile::tempdir;

fn repo(name: &str, url: &str) -> RepositoryRecord {
    RepositoryRecord {
        name: name.to_string(),
        url: Some(url.to_string()),
        ..Default::default()
    }
}

fn paper(title: &str, url: &str, relevance: f32) -> PaperRecord {
    PaperRecord {
        title: title.to_string(),
        url: Some(url.to_string()),
        relevance_score: relevance,
        ..Default::default()
    }
}

fn backdate(path: &Path, section: &str, id: &str, days: i64) {
    let raw = fs::read_to_string(path).unwrap();
    let mut value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    value[section][id]["stored_at"] =
        serde_json::json!((Utc::now() - Duration::days(days)).to_rfc3339());
    fs::write(path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
}

// ============================================================================
// Cross-session accumulation
// ============================================================================

#[test]
fn test_catalog_accumulates_and_dedups_across_sessions() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("knowledge_base.json");

    // First session discovers one repository and one paper.
    {
        let mut store = KnowledgeStore::open(path.clone());
        let mut first = repo("flowkit", "https://github.com/acme/flowkit");
        first.description = "first sighting".to_string();
        store.store_repository(first, "queue project").unwrap();
        store
            .store_paper(paper("Queues", "https://arxiv.org/abs/2", 0.7), "queue project")
            .unwrap();
        store.persist().unwrap();
    }

    // Second session re-finds the same repository and adds a new one.
    let repo_id = {
        let mut store = KnowledgeStore::open(path.clone());
        assert_eq!(store.summary().total_repositories, 1);
        assert_eq!(store.summary().total_papers, 1);

        let mut again = repo("flowkit", "https://github.com/acme/flowkit/");
        again.description = "second sighting".to_string();
        let id = store.store_repository(again, "other project").unwrap();
        store
            .store_repository(repo("streamline", "https://github.com/acme/streamline"), "")
            .unwrap();
        store.persist().unwrap();
        id
    };

    // Third session sees two repositories, with the dedup winner's fields.
    let store = KnowledgeStore::open(path);
    let summary = store.summary();
    assert_eq!(summary.total_repositories, 2);
    assert_eq!(summary.total_papers, 1);
    let stored = store.repository(&repo_id).unwrap();
    assert_eq!(stored.record.description, "second sighting");
    assert_eq!(stored.project_context, "other project");
}

#[test]
fn test_search_filters_apply_to_reopened_catalog() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("knowledge_base.json");

    {
        let mut store = KnowledgeStore::open(path.clone());
        let mut a = repo("flowkit", "https://github.com/acme/flowkit");
        a.language = Some("Rust".to_string());
        a.stars = 900;
        let mut b = repo("flowpy", "https://github.com/acme/flowpy");
        b.language = Some("Python".to_string());
        b.stars = 40;
        store.store_repository(a, "").unwrap();
        store.store_repository(b, "").unwrap();
        store
            .store_paper(paper("Flow control", "https://arxiv.org/abs/3", 0.9), "")
            .unwrap();
        store
            .store_paper(paper("Flow shop scheduling", "https://dl.acm.org/doi/4", 0.4), "")
            .unwrap();
        store.persist().unwrap();
    }

    let store = KnowledgeStore::open(path);
    let rust = store.search_repositories("flow", Some("rust"), 100);
    assert_eq!(rust.len(), 1);
    assert_eq!(rust[0].record.name, "flowkit");

    let preprints = store.search_papers("flow", Some(PaperSourceType::Preprint), 0.5);
    assert_eq!(preprints.len(), 1);
    assert_eq!(preprints[0].record.title, "Flow control");
}

// ============================================================================
// Pruning aged entries
// ============================================================================

#[test]
fn test_prune_removes_backdated_entries_and_persists() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("knowledge_base.json");

    let (fresh_id, stale_id, stale_paper_id) = {
        let mut store = KnowledgeStore::open(path.clone());
        let fresh = store
            .store_repository(repo("fresh", "https://github.com/acme/fresh"), "")
            .unwrap();
        let stale = store
            .store_repository(repo("stale", "https://github.com/acme/stale"), "")
            .unwrap();
        let stale_paper = store
            .store_paper(paper("old survey", "https://arxiv.org/abs/9", 0.3), "")
            .unwrap();
        store.persist().unwrap();
        (fresh, stale, stale_paper)
    };

    backdate(&path, "repositories", &fresh_id, 10);
    backdate(&path, "repositories", &stale_id, 40);
    backdate(&path, "papers", &stale_paper_id, 40);

    let mut store = KnowledgeStore::open(path.clone());
    let removed = store.prune_older_than(30).unwrap();
    assert_eq!(removed, 2);
    assert!(store.repository(&fresh_id).is_some());
    assert!(store.repository(&stale_id).is_none());

    // Prune writes through, so the next session sees the trimmed catalog.
    let reopened = KnowledgeStore::open(path);
    let summary = reopened.summary();
    assert_eq!(summary.total_repositories, 1);
    assert_eq!(summary.total_papers, 0);
}

#[test]
fn test_prune_keeps_analyses_as_history() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("knowledge_base.json");

    let analysis_id = {
        let mut store = KnowledgeStore::open(path.clone());
        let stale = store
            .store_repository(repo("stale", "https://github.com/acme/stale"), "")
            .unwrap();
        let analysis = store
            .store_analysis(AnalysisRecord {
                project_description: "a task queue".to_string(),
                ..Default::default()
            })
            .unwrap();
        store.persist().unwrap();
        backdate(&path, "repositories", &stale, 90);
        analysis
    };

    let mut store = KnowledgeStore::open(path.clone());
    assert_eq!(store.prune_older_than(30).unwrap(), 1);

    let reopened = KnowledgeStore::open(path);
    assert!(reopened.analysis(&analysis_id).is_some());
    assert_eq!(reopened.summary().total_analyses, 1);
    assert_eq!(reopened.summary().total_repositories, 0);
}
