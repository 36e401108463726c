//! Research Catalog
//!
//! A hash-deduplicated JSON catalog of repositories, papers and finished
//! analyses. The in-memory store is the source of truth between `persist`
//! calls; a crash between a mutation and the next `persist` loses that
//! mutation, which this design accepts in exchange for whole-file writes.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use url::Url;

use crate::models::{
    AnalysisRecord, KnowledgeMetadata, KnowledgeSummary, LanguageCount, PaperRecord,
    PaperSourceType, RepositoryRecord, SourceCount, StoredAnalysis, StoredPaper, StoredRepository,
};
use crate::utils::AppResult;

const TOP_LIST_LIMIT: usize = 10;

/// On-disk shape of the whole catalog.
#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    metadata: KnowledgeMetadata,
    repositories: BTreeMap<String, StoredRepository>,
    papers: BTreeMap<String, StoredPaper>,
    analyses: BTreeMap<String, StoredAnalysis>,
}

/// Persistent catalog of everything past runs have discovered.
#[derive(Debug)]
pub struct KnowledgeStore {
    storage_path: PathBuf,
    metadata: KnowledgeMetadata,
    repositories: BTreeMap<String, StoredRepository>,
    papers: BTreeMap<String, StoredPaper>,
    analyses: BTreeMap<String, StoredAnalysis>,
}

impl KnowledgeStore {
    /// Open the catalog at `storage_path`, reading any existing file.
    ///
    /// A missing file yields a fresh empty catalog; an unreadable one is
    /// logged and replaced in memory (the file itself is only overwritten
    /// on the next `persist`).
    pub fn open(storage_path: PathBuf) -> Self {
        let mut store = Self::fresh(storage_path);
        match store.read_file() {
            Ok(Some(file)) => store.install(file),
            Ok(None) => debug!(path = %store.storage_path.display(), "starting empty catalog"),
            Err(e) => {
                warn!(path = %store.storage_path.display(), error = %e, "cannot read catalog, starting empty");
            }
        }
        store
    }

    fn fresh(storage_path: PathBuf) -> Self {
        Self {
            storage_path,
            metadata: KnowledgeMetadata::new(),
            repositories: BTreeMap::new(),
            papers: BTreeMap::new(),
            analyses: BTreeMap::new(),
        }
    }

    fn install(&mut self, file: StoreFile) {
        self.metadata = file.metadata;
        self.repositories = file.repositories;
        self.papers = file.papers;
        self.analyses = file.analyses;
    }

    fn read_file(&self) -> AppResult<Option<StoreFile>> {
        if !self.storage_path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.storage_path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Store a repository, returning its id.
    ///
    /// The id hashes the canonical form of the repository URL, so the same
    /// repository under trivially different spellings overwrites rather
    /// than duplicates. Returns `None` when the record has no URL.
    pub fn store_repository(
        &mut self,
        record: RepositoryRecord,
        project_context: &str,
    ) -> Option<String> {
        let canonical = record.url.as_deref().and_then(canonical_url)?;
        let id = content_id(&canonical);

        self.repositories.insert(
            id.clone(),
            StoredRepository {
                id: id.clone(),
                stored_at: Utc::now(),
                project_context: project_context.to_string(),
                record,
            },
        );
        self.touch_counters();
        Some(id)
    }

    /// Store a paper, classifying its venue from the URL. Returns `None`
    /// when the record has no URL.
    pub fn store_paper(&mut self, record: PaperRecord, project_context: &str) -> Option<String> {
        let canonical = record.url.as_deref().and_then(canonical_url)?;
        let id = content_id(&canonical);
        let source_type = PaperSourceType::classify(&canonical);

        self.papers.insert(
            id.clone(),
            StoredPaper {
                id: id.clone(),
                stored_at: Utc::now(),
                project_context: project_context.to_string(),
                source_type,
                record,
            },
        );
        self.touch_counters();
        Some(id)
    }

    /// Store a finished analysis. Returns `None` when the record has no
    /// project description.
    pub fn store_analysis(&mut self, record: AnalysisRecord) -> Option<String> {
        if record.project_description.trim().is_empty() {
            return None;
        }
        let analyzed_at = Utc::now();
        let id = content_id(&format!(
            "{}{}",
            record.project_description,
            analyzed_at.to_rfc3339()
        ));

        self.analyses.insert(
            id.clone(),
            StoredAnalysis {
                id: id.clone(),
                analyzed_at,
                record,
            },
        );
        self.touch_counters();
        Some(id)
    }

    fn touch_counters(&mut self) {
        self.metadata.total_repositories = self.repositories.len();
        self.metadata.total_papers = self.papers.len();
        self.metadata.total_analyses = self.analyses.len();
        self.metadata.last_updated = Utc::now();
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn repository(&self, id: &str) -> Option<&StoredRepository> {
        self.repositories.get(id)
    }

    pub fn paper(&self, id: &str) -> Option<&StoredPaper> {
        self.papers.get(id)
    }

    pub fn analysis(&self, id: &str) -> Option<&StoredAnalysis> {
        self.analyses.get(id)
    }

    /// Repositories matching `query` as a case-insensitive substring of
    /// name, description, topics or cached readme text. Optional filters
    /// are ANDed with the match; results sorted by stars descending.
    pub fn search_repositories(
        &self,
        query: &str,
        language: Option<&str>,
        min_stars: u64,
    ) -> Vec<StoredRepository> {
        let needle = query.to_lowercase();
        let mut results: Vec<StoredRepository> = self
            .repositories
            .values()
            .filter(|stored| {
                let r = &stored.record;
                let matches = r.name.to_lowercase().contains(&needle)
                    || r.description.to_lowercase().contains(&needle)
                    || r.topics.iter().any(|t| t.to_lowercase().contains(&needle))
                    || r.readme
                        .as_deref()
                        .is_some_and(|readme| readme.to_lowercase().contains(&needle));
                let language_ok = language.is_none_or(|wanted| {
                    r.language
                        .as_deref()
                        .is_some_and(|l| l.eq_ignore_ascii_case(wanted))
                });
                matches && language_ok && r.stars >= min_stars
            })
            .cloned()
            .collect();
        results.sort_by(|a, b| b.record.stars.cmp(&a.record.stars));
        results
    }

    /// Papers matching `query` over title, description or abstract, sorted
    /// by relevance descending.
    pub fn search_papers(
        &self,
        query: &str,
        source_type: Option<PaperSourceType>,
        min_relevance: f32,
    ) -> Vec<StoredPaper> {
        let needle = query.to_lowercase();
        let mut results: Vec<StoredPaper> = self
            .papers
            .values()
            .filter(|stored| {
                let p = &stored.record;
                let matches = p.title.to_lowercase().contains(&needle)
                    || p.description.to_lowercase().contains(&needle)
                    || p.abstract_text
                        .as_deref()
                        .is_some_and(|a| a.to_lowercase().contains(&needle));
                let source_ok = source_type.is_none_or(|wanted| stored.source_type == wanted);
                matches && source_ok && p.relevance_score >= min_relevance
            })
            .cloned()
            .collect();
        results.sort_by(|a, b| {
            b.record
                .relevance_score
                .partial_cmp(&a.record.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results
    }

    /// Summary counters plus the most common languages and paper venues.
    pub fn summary(&self) -> KnowledgeSummary {
        let mut language_counts: HashMap<&str, usize> = HashMap::new();
        for stored in self.repositories.values() {
            if let Some(language) = stored.record.language.as_deref() {
                if !language.is_empty() {
                    *language_counts.entry(language).or_insert(0) += 1;
                }
            }
        }
        let mut top_languages: Vec<LanguageCount> = language_counts
            .into_iter()
            .map(|(language, count)| LanguageCount {
                language: language.to_string(),
                count,
            })
            .collect();
        top_languages.sort_by(|a, b| b.count.cmp(&a.count).then(a.language.cmp(&b.language)));
        top_languages.truncate(TOP_LIST_LIMIT);

        let mut source_counts: HashMap<PaperSourceType, usize> = HashMap::new();
        for stored in self.papers.values() {
            *source_counts.entry(stored.source_type).or_insert(0) += 1;
        }
        let mut top_paper_sources: Vec<SourceCount> = source_counts
            .into_iter()
            .map(|(source, count)| SourceCount { source, count })
            .collect();
        top_paper_sources.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then(a.source.as_str().cmp(b.source.as_str()))
        });
        top_paper_sources.truncate(TOP_LIST_LIMIT);

        KnowledgeSummary {
            total_repositories: self.repositories.len(),
            total_papers: self.papers.len(),
            total_analyses: self.analyses.len(),
            last_updated: self.metadata.last_updated,
            top_languages,
            top_paper_sources,
            storage_path: self.storage_path.display().to_string(),
        }
    }

    // -----------------------------------------------------------------------
    // Maintenance
    // -----------------------------------------------------------------------

    /// Remove repositories and papers stored more than `days` days ago,
    /// then recompute counters and persist. Analyses are kept as history.
    pub fn prune_older_than(&mut self, days: u64) -> AppResult<usize> {
        let cutoff = Utc::now() - Duration::days(days as i64);
        let before = self.repositories.len() + self.papers.len();

        self.repositories.retain(|_, r| r.stored_at >= cutoff);
        self.papers.retain(|_, p| p.stored_at >= cutoff);

        let removed = before - (self.repositories.len() + self.papers.len());
        self.touch_counters();
        self.persist()?;
        if removed > 0 {
            info!(removed, days, "pruned stale catalog entries");
        }
        Ok(removed)
    }

    /// Write the whole catalog to its JSON file.
    pub fn persist(&self) -> AppResult<()> {
        if let Some(parent) = self.storage_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = StoreFile {
            metadata: self.metadata.clone(),
            repositories: self.repositories.clone(),
            papers: self.papers.clone(),
            analyses: self.analyses.clone(),
        };
        fs::write(&self.storage_path, serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }

    /// Re-read the catalog from disk, discarding in-memory state. A missing
    /// file resets to empty; a corrupt file is an error and leaves memory
    /// untouched.
    pub fn reload(&mut self) -> AppResult<()> {
        match self.read_file()? {
            Some(file) => self.install(file),
            None => {
                let path = std::mem::take(&mut self.storage_path);
                *self = Self::fresh(path);
            }
        }
        Ok(())
    }

    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }
}

/// Canonical spelling of a URL for hashing: trimmed, trailing slash
/// stripped, scheme and host lowercased. Unparseable strings fall back to
/// trimming alone so they still dedup against themselves.
fn canonical_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match Url::parse(trimmed) {
        Ok(url) => Some(url.as_str().trim_end_matches('/').to_string()),
        Err(_) => Some(trimmed.trim_end_matches('/').to_string()),
    }
}

/// First 12 hex chars of the SHA-256 of `identity`.
fn content_id(identity: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(identity.as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    hex[..12].to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
