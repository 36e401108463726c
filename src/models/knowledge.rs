//! Knowledge Base Models
//!
//! Data structures for the persistent catalog of discovered research
//! artifacts: repositories, papers and finished analyses. Stored entries
//! wrap the raw records with an id, timestamps and the project context
//! they were discovered for.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A discovered GitHub repository
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    /// Repository name
    pub name: String,
    /// Owner-qualified name (e.g. "rust-lang/cargo")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Repository URL; required for the record to be storable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Short description
    #[serde(default)]
    pub description: String,
    /// Primary language
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Star count
    #[serde(default)]
    pub stars: u64,
    /// Fork count
    #[serde(default)]
    pub forks: u64,
    /// Topic labels
    #[serde(default)]
    pub topics: Vec<String>,
    /// License identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    /// Project homepage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    /// Cached README text (truncated at storage time)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readme: Option<String>,
}

/// A discovered research paper
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    /// Paper title
    pub title: String,
    /// Paper URL; required for the record to be storable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Short description
    #[serde(default)]
    pub description: String,
    /// Author names
    #[serde(default)]
    pub authors: Vec<String>,
    /// Publication date as given by the source
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<String>,
    /// Publication venue
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    /// DOI if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    /// Relevance to the analyzed project (0..1)
    #[serde(default)]
    pub relevance_score: f32,
    /// Cached abstract text
    #[serde(rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
}

/// Venue class of a paper, derived from its URL at storage time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaperSourceType {
    /// Preprint servers (arXiv)
    Preprint,
    /// Conference proceedings (IEEE, ACM)
    Conference,
    /// Peer-reviewed journals
    Journal,
    /// Anything else academic
    Academic,
}

impl PaperSourceType {
    /// Classify a paper's venue from its URL
    pub fn classify(url: &str) -> Self {
        let lower = url.to_lowercase();
        if lower.contains("arxiv") {
            PaperSourceType::Preprint
        } else if ["ieee", "acm", "conference"]
            .iter()
            .any(|s| lower.contains(s))
        {
            PaperSourceType::Conference
        } else if ["journal", "springer", "nature"]
            .iter()
            .any(|s| lower.contains(s))
        {
            PaperSourceType::Journal
        } else {
            PaperSourceType::Academic
        }
    }

    /// Stable string form
    pub fn as_str(&self) -> &'static str {
        match self {
            PaperSourceType::Preprint => "preprint",
            PaperSourceType::Conference => "conference",
            PaperSourceType::Journal => "journal",
            PaperSourceType::Academic => "academic",
        }
    }
}

impl std::fmt::Display for PaperSourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A finished analysis, stored for future retrieval
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisRecord {
    /// The project description that was analyzed
    pub project_description: String,
    /// Executive summary from the synthesis step
    pub executive_summary: String,
    /// Repositories discovered during the run
    pub repositories_found: usize,
    /// Papers discovered during the run
    pub papers_found: usize,
    /// Agents that produced usable output
    pub successful_agents: u32,
    /// Agents that failed
    pub failed_agents: u32,
    /// Wall-clock duration of the run in seconds
    pub duration_seconds: f64,
}

/// Stored repository entry: record plus storage bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRepository {
    /// Deterministic id derived from the canonical URL
    pub id: String,
    /// When the entry was stored
    pub stored_at: DateTime<Utc>,
    /// Description of the project this was discovered for
    #[serde(default)]
    pub project_context: String,
    /// The repository record itself
    #[serde(flatten)]
    pub record: RepositoryRecord,
}

/// Stored paper entry: record plus storage bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPaper {
    /// Deterministic id derived from the canonical URL
    pub id: String,
    /// When the entry was stored
    pub stored_at: DateTime<Utc>,
    /// Description of the project this was discovered for
    #[serde(default)]
    pub project_context: String,
    /// Venue class derived from the URL
    pub source_type: PaperSourceType,
    /// The paper record itself
    #[serde(flatten)]
    pub record: PaperRecord,
}

/// Stored analysis entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAnalysis {
    /// Deterministic id derived from description plus timestamp
    pub id: String,
    /// When the analysis finished
    pub analyzed_at: DateTime<Utc>,
    /// The analysis record itself
    #[serde(flatten)]
    pub record: AnalysisRecord,
}

/// Aggregate bookkeeping for the knowledge base file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeMetadata {
    /// When the knowledge base was first created
    pub created_at: DateTime<Utc>,
    /// Last mutation time
    pub last_updated: DateTime<Utc>,
    /// Stored repository count
    pub total_repositories: usize,
    /// Stored paper count
    pub total_papers: usize,
    /// Stored analysis count
    pub total_analyses: usize,
}

impl KnowledgeMetadata {
    /// Fresh metadata for an empty knowledge base
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            last_updated: now,
            total_repositories: 0,
            total_papers: 0,
            total_analyses: 0,
        }
    }
}

impl Default for KnowledgeMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary statistics of the knowledge base
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeSummary {
    /// Stored repository count
    pub total_repositories: usize,
    /// Stored paper count
    pub total_papers: usize,
    /// Stored analysis count
    pub total_analyses: usize,
    /// Last mutation time
    pub last_updated: DateTime<Utc>,
    /// Most common repository languages, descending
    pub top_languages: Vec<LanguageCount>,
    /// Most common paper venue classes, descending
    pub top_paper_sources: Vec<SourceCount>,
    /// Where the knowledge base file lives
    pub storage_path: String,
}

/// A language with its repository count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageCount {
    pub language: String,
    pub count: usize,
}

/// A paper venue class with its count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceCount {
    pub source: PaperSourceType,
    pub count: usize,
}
