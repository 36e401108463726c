//! Analysis Engine Integration Tests
//!
//! Runs the whole pipeline against a scripted generation provider that
//! answers each agent by recognizing its prompt, so tier fan-out, research
//! absorption, degradation and run lifecycle are all exercised without a
//! network. Embeddings come from the local hashing provider.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use prospector::models::{
    AgentPayload, AgentResult, AnalysisReport, RiskLevel, RunHealth, RunStatus,
};
use prospector::services::rag::HashEmbeddingProvider;
use prospector::{AnalysisEngine, AppError};
use prospector_llm::{
    GenerationRequest, GenerationResponse, LlmError, LlmProvider, LlmResult, ProviderConfig,
    StopReason, UsageStats,
};
use tempfile::tempdir;

const BLUEPRINT_REPLY: &str = "## Architecture\nShip a single binary first.";

const DISCOVERY_JSON: &str = r#"{
  "summary": "a small but active ecosystem",
  "keywords": ["telemetry", "fleet"],
  "repositories": [{
    "name": "metricsd",
    "url": "https://github.com/acme/metricsd",
    "description": "fleet telemetry daemon",
    "language": "Rust",
    "stars": 1200,
    "topics": ["telemetry"],
    "readme": "metricsd collects fleet telemetry from the field and ships it to durable storage"
  }],
  "papers": [{
    "title": "Telemetry at Fleet Scale",
    "url": "https://arxiv.org/abs/2401.00001",
    "description": "survey of collection systems",
    "relevance_score": 0.8,
    "abstract": "We survey telemetry collection systems for large vehicle fleets and their storage trade-offs"
  }]
}"#;

const OPTIMIZATION_REPLY: &str = "Cut the custom queue, buy the dashboard.";

const CRITIQUE_REPLY: &str = "The market window is narrower than assumed.";

const SYNTHESIS_REPORT: &str = "# EXECUTIVE SUMMARY\n\
    A focused launch beats a broad one.\n\n\
    # STRATEGY\n\
    Pick the two integrations customers actually asked for.\n\n\
    # RISKS\n\
    The ingest path is untested at fleet scale.";

const DASHBOARD_JSON: &str = r#"{
  "summary": "lean plan, real risk",
  "risk_level": "medium",
  "success_probability": 0.7,
  "timeline_weeks": 12,
  "top_risks": ["untested ingest path"],
  "quick_wins": ["publish integration docs"]
}"#;

const ACTION_PLAN_REPLY: &str = "Week 1: customer interviews. Week 2: ingest prototype.";

/// Answers each pipeline agent by recognizing its prompt. Prompts that
/// contain any configured failure marker error instead; an optional delay
/// keeps runs observable mid-flight.
struct ScriptedProvider {
    config: ProviderConfig,
    fail_markers: Vec<&'static str>,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    fn base() -> Self {
        Self {
            config: ProviderConfig {
                model: "scripted-model".to_string(),
                ..ProviderConfig::default()
            },
            fail_markers: Vec::new(),
            delay: None,
        }
    }

    fn answering() -> Arc<Self> {
        Arc::new(Self::base())
    }

    fn failing_on(markers: Vec<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            fail_markers: markers,
            ..Self::base()
        })
    }

    fn delayed(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::base()
        })
    }

    fn reply_for(prompt: &str) -> &'static str {
        if prompt.contains("Create a practical project blueprint") {
            BLUEPRINT_REPLY
        } else if prompt.contains("no prose around it") {
            DISCOVERY_JSON
        } else if prompt.contains("Recommend concrete improvements") {
            OPTIMIZATION_REPLY
        } else if prompt.contains("Challenge this project plan") {
            CRITIQUE_REPLY
        } else if prompt.contains("Fold the analyses below") {
            SYNTHESIS_REPORT
        } else if prompt.contains("as an executive dashboard") {
            DASHBOARD_JSON
        } else if prompt.contains("-week action plan") {
            ACTION_PLAN_REPLY
        } else {
            "unrecognized prompt"
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, request: GenerationRequest) -> LlmResult<GenerationResponse> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self
            .fail_markers
            .iter()
            .any(|marker| request.prompt.contains(marker))
        {
            return Err(LlmError::ServerError {
                message: "scripted failure".to_string(),
                status: None,
            });
        }
        Ok(GenerationResponse {
            text: Self::reply_for(&request.prompt).to_string(),
            model: self.config.model.clone(),
            stop_reason: StopReason::EndTurn,
            usage: UsageStats::default(),
        })
    }

    async fn health_check(&self) -> LlmResult<()> {
        Ok(())
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

async fn engine_with(provider: Arc<ScriptedProvider>, dir: &Path) -> AnalysisEngine {
    AnalysisEngine::with_providers(
        provider,
        Arc::new(HashEmbeddingProvider::with_dimension(64)),
        dir,
        450,
        50,
    )
    .await
    .unwrap()
}

async fn wait_until_terminal(engine: &AnalysisEngine) -> RunStatus {
    for _ in 0..200 {
        let status = engine.status().status;
        if status.is_terminal() {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("run did not reach a terminal status in time");
}

fn payload(report: &AnalysisReport, name: &str) -> AgentPayload {
    match report.component(name) {
        Some(AgentResult::Success { payload }) => payload.clone(),
        other => panic!("expected a success payload for {name}, got {other:?}"),
    }
}

// ============================================================================
// Full pipeline
// ============================================================================

#[tokio::test]
async fn test_full_run_produces_a_healthy_report() {
    let dir = tempdir().unwrap();
    let engine = engine_with(ScriptedProvider::answering(), dir.path()).await;

    let report = engine
        .run(
            "a fleet telemetry collector for delivery drones",
            "two backend engineers",
        )
        .await
        .unwrap();

    assert_eq!(report.summary.health, RunHealth::Healthy);
    assert_eq!(report.summary.total_agents, 7);
    assert_eq!(report.summary.successful_agents, 7);
    assert_eq!(report.summary.failed_agents, 0);
    assert!(report.duration_seconds >= 0.0);

    match payload(&report, "discovery") {
        AgentPayload::Discovery(discovery) => {
            assert!(!discovery.fallback_used);
            assert_eq!(discovery.repositories[0].name, "metricsd");
            assert_eq!(discovery.papers[0].title, "Telemetry at Fleet Scale");
        }
        other => panic!("unexpected payload: {other:?}"),
    }
    match payload(&report, "synthesis") {
        AgentPayload::Synthesis(synthesis) => {
            assert!(synthesis
                .executive_summary
                .contains("A focused launch beats a broad one"));
            assert_eq!(
                synthesis.report_sections,
                vec!["EXECUTIVE SUMMARY", "STRATEGY", "RISKS"]
            );
            assert!(synthesis.data_sources.blueprint_included);
            assert!(synthesis.data_sources.discovery_included);
        }
        other => panic!("unexpected payload: {other:?}"),
    }
    match payload(&report, "dashboard") {
        AgentPayload::Dashboard(dashboard) => {
            assert!(!dashboard.fallback_used);
            assert_eq!(dashboard.metrics.risk_level, RiskLevel::Medium);
            assert_eq!(dashboard.metrics.success_probability, Some(0.7));
            assert_eq!(dashboard.metrics.timeline_weeks, Some(12));
        }
        other => panic!("unexpected payload: {other:?}"),
    }
    match payload(&report, "action_plan") {
        AgentPayload::ActionPlan(plan) => {
            assert_eq!(plan.timeline_weeks, 12);
            assert!(plan.plan.contains("Week 1"));
        }
        other => panic!("unexpected payload: {other:?}"),
    }

    // Lifecycle state after the run.
    let status = engine.status();
    assert_eq!(status.status, RunStatus::Completed);
    assert_eq!(status.steps_completed, status.total_steps);
    assert_eq!(
        engine.current_report().unwrap().project_description,
        "a fleet telemetry collector for delivery drones"
    );

    // Discovery results were absorbed into the knowledge catalog and the
    // document index, and the catalog reached disk.
    let summary = engine.knowledge_summary().unwrap();
    assert_eq!(summary.total_repositories, 1);
    assert_eq!(summary.total_papers, 1);
    assert_eq!(summary.total_analyses, 1);
    assert!(dir.path().join("knowledge_base.json").exists());
    assert!(dir.path().join("index").join("chunks.json").exists());
    assert!(engine.index_ready().await);

    let repos = engine.search_repositories("telemetry", None, 0).unwrap();
    assert_eq!(repos.len(), 1);
    assert_eq!(repos[0].record.language.as_deref(), Some("Rust"));

    // A finished engine accepts the next run; the re-found repository
    // dedups while the analysis history grows.
    engine.run("the same collector, revisited", "").await.unwrap();
    let summary = engine.knowledge_summary().unwrap();
    assert_eq!(summary.total_repositories, 1);
    assert_eq!(summary.total_analyses, 2);
}

// ============================================================================
// Degradation
// ============================================================================

#[tokio::test]
async fn test_failed_agent_degrades_but_does_not_abort() {
    let dir = tempdir().unwrap();
    let provider = ScriptedProvider::failing_on(vec!["Create a practical project blueprint"]);
    let engine = engine_with(provider, dir.path()).await;

    let report = engine.run("a fleet telemetry collector", "").await.unwrap();

    assert_eq!(report.summary.health, RunHealth::Degraded);
    assert_eq!(report.summary.successful_agents, 6);
    assert_eq!(report.summary.failed_agents, 1);

    match report.component("blueprint") {
        Some(AgentResult::Error { message }) => assert!(message.contains("scripted failure")),
        other => panic!("expected an error for blueprint, got {other:?}"),
    }

    // Synthesis still ran, just without the blueprint section.
    match payload(&report, "synthesis") {
        AgentPayload::Synthesis(synthesis) => {
            assert!(!synthesis.data_sources.blueprint_included);
            assert!(synthesis.data_sources.discovery_included);
            assert!(!synthesis.full_report.is_empty());
        }
        other => panic!("unexpected payload: {other:?}"),
    }
}

#[tokio::test]
async fn test_all_agents_failing_still_completes_the_run() {
    let dir = tempdir().unwrap();
    let provider = ScriptedProvider::failing_on(vec!["Project:"]);
    let engine = engine_with(provider, dir.path()).await;

    let report = engine.run("a fleet telemetry collector", "").await.unwrap();

    assert_eq!(report.summary.health, RunHealth::Failed);
    assert_eq!(report.summary.total_agents, 7);
    assert_eq!(report.summary.successful_agents, 0);
    assert_eq!(report.summary.failed_agents, 7);

    // The finishers were skipped rather than invoked against nothing.
    match report.component("dashboard") {
        Some(AgentResult::Error { message }) => assert!(message.contains("synthesis failed")),
        other => panic!("expected an error for dashboard, got {other:?}"),
    }

    // No discovery output, so nothing was absorbed; the analysis itself
    // still lands in the history.
    assert_eq!(engine.status().status, RunStatus::Completed);
    assert!(!engine.index_ready().await);
    let summary = engine.knowledge_summary().unwrap();
    assert_eq!(summary.total_repositories, 0);
    assert_eq!(summary.total_papers, 0);
    assert_eq!(summary.total_analyses, 1);
}

// ============================================================================
// Run lifecycle
// ============================================================================

#[tokio::test]
async fn test_concurrent_run_is_refused() {
    let dir = tempdir().unwrap();
    let provider = ScriptedProvider::delayed(Duration::from_millis(200));
    let engine = Arc::new(engine_with(provider, dir.path()).await);

    engine.spawn_run("a drone fleet manager", "").unwrap();
    assert_eq!(engine.status().status, RunStatus::Running);

    let second = engine.run("another project", "").await;
    assert!(matches!(second, Err(AppError::Conflict(_))));

    // The refused caller did not disturb the active run.
    assert_eq!(wait_until_terminal(&engine).await, RunStatus::Completed);
    assert_eq!(
        engine.current_report().unwrap().project_description,
        "a drone fleet manager"
    );
}

#[tokio::test]
async fn test_reset_abandons_the_active_run() {
    let dir = tempdir().unwrap();
    let provider = ScriptedProvider::delayed(Duration::from_millis(150));
    let engine = Arc::new(engine_with(provider, dir.path()).await);

    engine.spawn_run("first project", "").unwrap();
    engine.reset().unwrap();
    assert_eq!(engine.status().status, RunStatus::Idle);
    assert!(engine.current_report().is_none());

    // The abandoned run must not publish; the next run owns the slot.
    engine.spawn_run("second project", "").unwrap();
    assert_eq!(wait_until_terminal(&engine).await, RunStatus::Completed);
    assert_eq!(
        engine.current_report().unwrap().project_description,
        "second project"
    );
}

#[tokio::test]
async fn test_blank_description_is_rejected() {
    let dir = tempdir().unwrap();
    let engine = engine_with(ScriptedProvider::answering(), dir.path()).await;

    let result = engine.run("   ", "team").await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(engine.status().status, RunStatus::Idle);
}
