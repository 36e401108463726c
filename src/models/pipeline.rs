//! Pipeline Models
//!
//! Data structures for one orchestrated analysis run: run state and
//! progress tracking, per-agent result payloads, the aggregated report
//! and its summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::knowledge::{PaperRecord, RepositoryRecord};

/// Number of progress steps in one full pipeline run
pub const TOTAL_STEPS: u32 = 7;

/// Pipeline run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// No run has been started or the engine was reset
    Idle,
    /// A run is currently executing
    Running,
    /// The last run finished (regardless of per-agent outcomes)
    Completed,
    /// The last run aborted with a structural failure
    Error,
}

impl RunStatus {
    /// Check if this status indicates an active run
    pub fn is_active(&self) -> bool {
        matches!(self, RunStatus::Running)
    }

    /// Check if this status is terminal for a run
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Error)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Idle => write!(f, "idle"),
            RunStatus::Running => write!(f, "running"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(RunStatus::Idle),
            "running" => Ok(RunStatus::Running),
            "completed" => Ok(RunStatus::Completed),
            "error" => Ok(RunStatus::Error),
            _ => Err(format!("Unknown run status: {}", s)),
        }
    }
}

/// The fixed set of pipeline agents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Blueprint,
    Discovery,
    Optimization,
    Critique,
    Synthesis,
    Dashboard,
    ActionPlan,
}

impl AgentKind {
    /// Every agent, in pipeline order
    pub const ALL: [AgentKind; 7] = [
        AgentKind::Blueprint,
        AgentKind::Discovery,
        AgentKind::Optimization,
        AgentKind::Critique,
        AgentKind::Synthesis,
        AgentKind::Dashboard,
        AgentKind::ActionPlan,
    ];

    /// Stable string form, also used as report component key
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Blueprint => "blueprint",
            AgentKind::Discovery => "discovery",
            AgentKind::Optimization => "optimization",
            AgentKind::Critique => "critique",
            AgentKind::Synthesis => "synthesis",
            AgentKind::Dashboard => "dashboard",
            AgentKind::ActionPlan => "action_plan",
        }
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Agent payloads
// ---------------------------------------------------------------------------

/// Blueprint agent output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueprintPayload {
    /// Generated blueprint text
    pub text: String,
    pub generated_at: DateTime<Utc>,
}

/// Discovery agent output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryPayload {
    /// Competitive landscape summary
    pub summary: String,
    /// Keywords the discovery was based on
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Comparable repositories found
    #[serde(default)]
    pub repositories: Vec<RepositoryRecord>,
    /// Related papers found
    #[serde(default)]
    pub papers: Vec<PaperRecord>,
    /// True when structured parsing failed and synthetic records were used
    #[serde(default)]
    pub fallback_used: bool,
    pub generated_at: DateTime<Utc>,
}

/// Optimization agent output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationPayload {
    /// Improvement recommendations text
    pub recommendations: String,
    /// Characters of upstream context that informed the recommendations
    #[serde(default)]
    pub context_chars: usize,
    pub generated_at: DateTime<Utc>,
}

/// Critique agent output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CritiquePayload {
    /// What the critique focused on
    pub focus_area: String,
    /// Challenged assumptions and identified risks
    pub challenges: String,
    /// Characters of upstream context that informed the critique
    #[serde(default)]
    pub context_chars: usize,
    pub generated_at: DateTime<Utc>,
}

/// Which upstream outputs the synthesis actually saw
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataSources {
    pub blueprint_included: bool,
    pub discovery_included: bool,
    pub optimization_included: bool,
    pub critique_included: bool,
}

/// Synthesis agent output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisPayload {
    /// Extracted executive summary
    pub executive_summary: String,
    /// Full synthesis report text
    pub full_report: String,
    /// Section headings identified in the report
    #[serde(default)]
    pub report_sections: Vec<String>,
    /// Which upstream outputs were available
    #[serde(default)]
    pub data_sources: DataSources,
    pub generated_at: DateTime<Utc>,
}

/// Risk classification on the executive dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    #[default]
    Medium,
    High,
}

/// Structured metrics extracted from the dashboard text
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardMetrics {
    /// Overall risk classification
    #[serde(default)]
    pub risk_level: RiskLevel,
    /// Estimated probability of success (0..1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_probability: Option<f32>,
    /// Estimated development timeline in weeks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline_weeks: Option<u32>,
    /// Highest-impact risks, descending
    #[serde(default)]
    pub top_risks: Vec<String>,
    /// High-impact low-effort items
    #[serde(default)]
    pub quick_wins: Vec<String>,
}

/// Dashboard agent output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardPayload {
    /// Executive dashboard text
    pub summary: String,
    /// Structured metrics parsed from the dashboard
    pub metrics: DashboardMetrics,
    /// True when metric parsing failed and defaults were substituted
    #[serde(default)]
    pub fallback_used: bool,
    pub generated_at: DateTime<Utc>,
}

/// Action plan agent output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionPlanPayload {
    /// Plan horizon in weeks
    pub timeline_weeks: u32,
    /// Week-by-week plan text
    pub plan: String,
    pub generated_at: DateTime<Utc>,
}

/// One typed payload per agent kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentPayload {
    Blueprint(BlueprintPayload),
    Discovery(DiscoveryPayload),
    Optimization(OptimizationPayload),
    Critique(CritiquePayload),
    Synthesis(SynthesisPayload),
    Dashboard(DashboardPayload),
    ActionPlan(ActionPlanPayload),
}

impl AgentPayload {
    /// Which agent this payload belongs to
    pub fn kind(&self) -> AgentKind {
        match self {
            AgentPayload::Blueprint(_) => AgentKind::Blueprint,
            AgentPayload::Discovery(_) => AgentKind::Discovery,
            AgentPayload::Optimization(_) => AgentKind::Optimization,
            AgentPayload::Critique(_) => AgentKind::Critique,
            AgentPayload::Synthesis(_) => AgentKind::Synthesis,
            AgentPayload::Dashboard(_) => AgentKind::Dashboard,
            AgentPayload::ActionPlan(_) => AgentKind::ActionPlan,
        }
    }
}

/// Outcome of one agent invocation
///
/// Serializes with a `status` tag so the external shape is
/// `{"status": "success", "<agent>": {...}}` or
/// `{"status": "error", "message": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AgentResult {
    Success {
        #[serde(flatten)]
        payload: AgentPayload,
    },
    Error {
        message: String,
    },
}

impl AgentResult {
    /// Wrap a payload as a success
    pub fn success(payload: AgentPayload) -> Self {
        AgentResult::Success { payload }
    }

    /// Wrap an error message
    pub fn error(message: impl Into<String>) -> Self {
        AgentResult::Error {
            message: message.into(),
        }
    }

    /// True for successful results
    pub fn is_success(&self) -> bool {
        matches!(self, AgentResult::Success { .. })
    }

    /// The payload, if successful
    pub fn payload(&self) -> Option<&AgentPayload> {
        match self {
            AgentResult::Success { payload } => Some(payload),
            AgentResult::Error { .. } => None,
        }
    }

    /// The error message, if failed
    pub fn error_message(&self) -> Option<&str> {
        match self {
            AgentResult::Success { .. } => None,
            AgentResult::Error { message } => Some(message),
        }
    }
}

// ---------------------------------------------------------------------------
// Run summary and report
// ---------------------------------------------------------------------------

/// Overall health of a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunHealth {
    /// Every agent succeeded
    Healthy,
    /// Some agents failed, some succeeded
    Degraded,
    /// No agent produced usable output
    Failed,
}

/// Per-run aggregation of agent outcomes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Number of agents that ran
    pub total_agents: u32,
    /// Agents that returned a success payload
    pub successful_agents: u32,
    /// Agents that returned an error
    pub failed_agents: u32,
    /// Overall health classification
    pub health: RunHealth,
    /// Status tag per agent name
    pub agent_statuses: BTreeMap<String, String>,
}

impl Default for RunSummary {
    fn default() -> Self {
        Self {
            total_agents: 0,
            successful_agents: 0,
            failed_agents: 0,
            health: RunHealth::Failed,
            agent_statuses: BTreeMap::new(),
        }
    }
}

/// The aggregated output of one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// The project description that was analyzed
    pub project_description: String,
    /// When the report was finalized
    pub generated_at: DateTime<Utc>,
    /// Wall-clock duration of the run in seconds
    pub duration_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blueprint: Option<AgentResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discovery: Option<AgentResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimization: Option<AgentResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub critique: Option<AgentResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synthesis: Option<AgentResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard: Option<AgentResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_plan: Option<AgentResult>,
    /// Aggregated outcome counts
    pub summary: RunSummary,
}

impl AnalysisReport {
    /// Empty report for a run that is about to execute
    pub fn new(project_description: impl Into<String>) -> Self {
        Self {
            project_description: project_description.into(),
            generated_at: Utc::now(),
            duration_seconds: 0.0,
            blueprint: None,
            discovery: None,
            optimization: None,
            critique: None,
            synthesis: None,
            dashboard: None,
            action_plan: None,
            summary: RunSummary::default(),
        }
    }

    /// Store one agent's result in its slot
    pub fn set(&mut self, kind: AgentKind, result: AgentResult) {
        *self.slot_mut(kind) = Some(result);
    }

    /// Result for one agent, if it ran
    pub fn get(&self, kind: AgentKind) -> Option<&AgentResult> {
        self.slot(kind).as_ref()
    }

    /// Look up a report component by its name
    pub fn component(&self, name: &str) -> Option<&AgentResult> {
        AgentKind::ALL
            .iter()
            .find(|kind| kind.as_str() == name)
            .and_then(|kind| self.get(*kind))
    }

    fn slot(&self, kind: AgentKind) -> &Option<AgentResult> {
        match kind {
            AgentKind::Blueprint => &self.blueprint,
            AgentKind::Discovery => &self.discovery,
            AgentKind::Optimization => &self.optimization,
            AgentKind::Critique => &self.critique,
            AgentKind::Synthesis => &self.synthesis,
            AgentKind::Dashboard => &self.dashboard,
            AgentKind::ActionPlan => &self.action_plan,
        }
    }

    fn slot_mut(&mut self, kind: AgentKind) -> &mut Option<AgentResult> {
        match kind {
            AgentKind::Blueprint => &mut self.blueprint,
            AgentKind::Discovery => &mut self.discovery,
            AgentKind::Optimization => &mut self.optimization,
            AgentKind::Critique => &mut self.critique,
            AgentKind::Synthesis => &mut self.synthesis,
            AgentKind::Dashboard => &mut self.dashboard,
            AgentKind::ActionPlan => &mut self.action_plan,
        }
    }

    /// Recompute the summary from the per-agent results present
    pub fn compute_summary(&mut self) {
        let mut summary = RunSummary::default();

        for kind in AgentKind::ALL {
            let Some(result) = self.get(kind) else {
                continue;
            };
            summary.total_agents += 1;
            let tag = if result.is_success() {
                summary.successful_agents += 1;
                "success"
            } else {
                summary.failed_agents += 1;
                "failed"
            };
            summary
                .agent_statuses
                .insert(kind.as_str().to_string(), tag.to_string());
        }

        summary.health = if summary.successful_agents == 0 {
            RunHealth::Failed
        } else if summary.failed_agents == 0 {
            RunHealth::Healthy
        } else {
            RunHealth::Degraded
        };

        self.summary = summary;
    }
}

// ---------------------------------------------------------------------------
// Run tracking
// ---------------------------------------------------------------------------

/// Mutable state of one orchestration invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    /// Generation counter value for this run
    pub run_id: u64,
    /// Current status
    pub status: RunStatus,
    /// Human-readable name of the step in progress
    pub current_step: String,
    /// Steps finished so far
    pub steps_completed: u32,
    /// Total steps in the pipeline
    pub total_steps: u32,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run reached a terminal status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Structural failure message, if the run errored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PipelineRun {
    /// Start tracking a new run
    pub fn new(run_id: u64) -> Self {
        Self {
            run_id,
            status: RunStatus::Running,
            current_step: "initializing".to_string(),
            steps_completed: 0,
            total_steps: TOTAL_STEPS,
            started_at: Utc::now(),
            finished_at: None,
            error: None,
        }
    }

    /// Record progress at a tier boundary
    pub fn advance(&mut self, step: impl Into<String>, completed: u32) {
        self.current_step = step.into();
        self.steps_completed = completed;
    }

    /// Mark the run completed
    pub fn complete(&mut self) {
        self.status = RunStatus::Completed;
        self.current_step = "completed".to_string();
        self.steps_completed = self.total_steps;
        self.finished_at = Some(Utc::now());
    }

    /// Mark the run as structurally failed
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = RunStatus::Error;
        self.error = Some(error.into());
        self.finished_at = Some(Utc::now());
    }

    /// Wall-clock duration so far, in seconds
    pub fn duration_seconds(&self) -> f64 {
        let end = self.finished_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

/// Non-blocking view of the engine's run state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub status: RunStatus,
    pub current_step: String,
    pub steps_completed: u32,
    pub total_steps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusSnapshot {
    /// Snapshot for an engine with no run yet
    pub fn idle() -> Self {
        Self {
            status: RunStatus::Idle,
            current_step: String::new(),
            steps_completed: 0,
            total_steps: TOTAL_STEPS,
            started_at: None,
            finished_at: None,
            error: None,
        }
    }
}

impl From<&PipelineRun> for StatusSnapshot {
    fn from(run: &PipelineRun) -> Self {
        Self {
            status: run.status,
            current_step: run.current_step.clone(),
            steps_completed: run.steps_completed,
            total_steps: run.total_steps,
            started_at: Some(run.started_at),
            finished_at: run.finished_at,
            error: run.error.clone(),
        }
    }
}

/// Static description of one registered agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDescriptor {
    /// Agent name (e.g. "BlueprintAgent")
    pub name: String,
    /// Generation model the agent calls
    pub model: String,
    /// What the agent can do
    pub capabilities: Vec<String>,
    /// One-line focus statement
    pub focus: String,
}
