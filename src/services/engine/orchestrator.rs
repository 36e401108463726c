//! Analysis engine.
//!
//! Owns the whole run lifecycle: one mutable run slot, one published
//! report slot, the retrieval handles and the knowledge catalog. Agents
//! execute in tiers behind a semaphore that bounds concurrent generation
//! calls; a failed agent degrades the report, it never fails the run.
//! Only structural problems (poisoned state, unusable configuration)
//! surface as errors.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;
use futures_util::future::join_all;
use serde::Serialize;
use tokio::sync::{RwLock as AsyncRwLock, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use prospector_llm::{GeminiProvider, LlmProvider};

use crate::config::AppConfig;
use crate::models::{
    AgentDescriptor, AgentKind, AgentPayload, AgentResult, AnalysisRecord, AnalysisReport,
    DiscoveryPayload, IndexReport, KnowledgeSummary, PaperSourceType, PipelineRun, StatusSnapshot,
    StoredPaper, StoredRepository, TranscriptEntry,
};
use crate::services::engine::agents::{
    truncate_chars, ActionPlanAgent, AgentInput, BlueprintAgent, CritiqueAgent, DashboardAgent,
    DiscoveryAgent, OptimizationAgent, SynthesisAgent, TaskAgent,
};
use crate::services::knowledge::KnowledgeStore;
use crate::services::rag::{create_provider, DocumentIndexer, EmbeddingProvider, Retriever};
use crate::utils::{paths, AppError, AppResult};

/// Concurrent generation calls while the first tier runs.
const TIER_A_CONCURRENCY: usize = 3;

/// Concurrent generation calls for the later tiers.
const TIER_B_CONCURRENCY: usize = 2;

/// Character cap on agent excerpts fed to the second tier.
const TIER_B_EXCERPT_CAP: usize = 800;

/// Character cap on excerpts fed to synthesis and the finishers.
const SYNTHESIS_EXCERPT_CAP: usize = 1500;

/// Character cap on the team description.
const TEAM_INFO_CAP: usize = 500;

/// Results fetched per query during the pre-run retrieval pass.
const CONTEXT_TOP_K: usize = 5;

/// Fixed probe query that pairs with the project description.
const CONTEXT_PROBE: &str = "project architecture business model";

/// How much of the description is used as a retrieval query.
const CONTEXT_DESCRIPTION_CAP: usize = 300;

/// Outcome of one provider health probe.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderProbe {
    pub ok: bool,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Health of both backing providers.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderStatus {
    pub generation: ProviderProbe,
    pub embedding: ProviderProbe,
}

fn poisoned<T>(_: T) -> AppError {
    AppError::internal("engine state lock poisoned")
}

/// Run one agent under the tier's concurrency bound, bailing out early
/// when the run is cancelled.
async fn run_bounded<'a>(
    agent: &'a dyn TaskAgent,
    input: &'a AgentInput,
    semaphore: &'a Semaphore,
    cancel: &'a CancellationToken,
) -> (AgentKind, AgentResult) {
    let kind = agent.kind();
    let permit = match semaphore.acquire().await {
        Ok(permit) => permit,
        Err(_) => return (kind, AgentResult::error("engine is shutting down")),
    };
    let result = tokio::select! {
        result = agent.run(input) => result,
        _ = cancel.cancelled() => AgentResult::error("run cancelled"),
    };
    drop(permit);
    (kind, result)
}

/// Text form of one agent's payload, capped for prompt interpolation.
/// Empty when the agent failed or has not run.
fn excerpt_of(report: &AnalysisReport, kind: AgentKind, cap: usize) -> String {
    let Some(payload) = report.get(kind).and_then(|result| result.payload()) else {
        return String::new();
    };
    let text = match payload {
        AgentPayload::Blueprint(p) => p.text.clone(),
        AgentPayload::Discovery(p) => discovery_digest(p),
        AgentPayload::Optimization(p) => p.recommendations.clone(),
        AgentPayload::Critique(p) => p.challenges.clone(),
        AgentPayload::Synthesis(p) => p.full_report.clone(),
        AgentPayload::Dashboard(p) => p.summary.clone(),
        AgentPayload::ActionPlan(p) => p.plan.clone(),
    };
    truncate_chars(&text, cap).to_string()
}

/// Flatten a discovery payload into prompt-ready text.
fn discovery_digest(payload: &DiscoveryPayload) -> String {
    let repositories: Vec<String> = payload
        .repositories
        .iter()
        .map(|r| format!("- {} ({} stars): {}", r.name, r.stars, r.description))
        .collect();
    let papers: Vec<String> = payload
        .papers
        .iter()
        .map(|p| format!("- {}: {}", p.title, p.description))
        .collect();
    format!(
        "{}\n\nRepositories:\n{}\n\nPapers:\n{}",
        payload.summary,
        repositories.join("\n"),
        papers.join("\n")
    )
}

/// The seven-agent analysis pipeline and everything it leans on.
pub struct AnalysisEngine {
    llm: Arc<dyn LlmProvider>,
    embedding: Arc<dyn EmbeddingProvider>,

    blueprint: BlueprintAgent,
    discovery: DiscoveryAgent,
    optimization: OptimizationAgent,
    critique: CritiqueAgent,
    synthesis: SynthesisAgent,
    dashboard: DashboardAgent,
    action_plan: ActionPlanAgent,

    /// Write handle for the vector index. Rehydrated from saved artifacts
    /// at startup so research ingest appends instead of clobbering.
    indexer: AsyncRwLock<DocumentIndexer>,
    /// Read view over the saved artifacts, rebound after every save.
    retriever: AsyncRwLock<Retriever>,
    store: Mutex<KnowledgeStore>,

    run: RwLock<Option<PipelineRun>>,
    report: RwLock<Option<AnalysisReport>>,
    next_run_id: AtomicU64,
    cancel: Mutex<CancellationToken>,

    index_path: PathBuf,
    metadata_path: PathBuf,
    chunk_window: usize,
    chunk_overlap: usize,
}

impl AnalysisEngine {
    /// Build an engine over explicit providers, keeping every artifact
    /// under `data_dir`.
    pub async fn with_providers(
        llm: Arc<dyn LlmProvider>,
        embedding: Arc<dyn EmbeddingProvider>,
        data_dir: &Path,
        chunk_window: usize,
        chunk_overlap: usize,
    ) -> AppResult<Self> {
        let index_path = data_dir.join("index").join("vector_index");
        let metadata_path = data_dir.join("index").join("chunks.json");
        let knowledge_path = data_dir.join("knowledge_base.json");

        let indexer = match DocumentIndexer::from_artifacts(
            embedding.clone(),
            &index_path,
            &metadata_path,
            chunk_window,
            chunk_overlap,
        ) {
            Some(indexer) => indexer,
            None => DocumentIndexer::new(embedding.clone(), chunk_window, chunk_overlap)?,
        };

        let mut retriever = Retriever::new(embedding.clone());
        retriever.load(&index_path, &metadata_path).await;

        let store = KnowledgeStore::open(knowledge_path);

        Ok(Self {
            blueprint: BlueprintAgent::new(llm.clone()),
            discovery: DiscoveryAgent::new(llm.clone()),
            optimization: OptimizationAgent::new(llm.clone()),
            critique: CritiqueAgent::new(llm.clone()),
            synthesis: SynthesisAgent::new(llm.clone()),
            dashboard: DashboardAgent::new(llm.clone()),
            action_plan: ActionPlanAgent::new(llm.clone()),
            llm,
            embedding,
            indexer: AsyncRwLock::new(indexer),
            retriever: AsyncRwLock::new(retriever),
            store: Mutex::new(store),
            run: RwLock::new(None),
            report: RwLock::new(None),
            next_run_id: AtomicU64::new(1),
            cancel: Mutex::new(CancellationToken::new()),
            index_path,
            metadata_path,
            chunk_window,
            chunk_overlap,
        })
    }

    /// Build an engine from the application configuration: Gemini for
    /// generation, the configured embedding backend, artifacts under the
    /// user data directory.
    pub async fn from_config(config: &AppConfig) -> AppResult<Self> {
        config.validate()?;
        let llm: Arc<dyn LlmProvider> = Arc::new(GeminiProvider::new(config.llm_config()));
        let embedding: Arc<dyn EmbeddingProvider> =
            Arc::from(create_provider(&config.embedding_config())?);
        let data_dir = paths::ensure_data_dir()?;
        Self::with_providers(
            llm,
            embedding,
            &data_dir,
            config.chunk_window,
            config.chunk_overlap,
        )
        .await
    }

    // -----------------------------------------------------------------------
    // Run lifecycle
    // -----------------------------------------------------------------------

    /// Run the full pipeline and wait for the report.
    ///
    /// # Errors
    ///
    /// `AppError::Conflict` when a run is already active,
    /// `AppError::Validation` for a blank description, and internal errors
    /// for structural failures. Agent failures are not errors; they show
    /// up in the report summary.
    pub async fn run(
        &self,
        project_description: impl Into<String>,
        team_info: impl Into<String>,
    ) -> AppResult<AnalysisReport> {
        let description = project_description.into();
        let team = team_info.into();
        if description.trim().is_empty() {
            return Err(AppError::validation("project description must not be empty"));
        }

        let (run_id, cancel) = self.begin_run()?;
        self.execute_pipeline(run_id, description, team, cancel).await
    }

    /// Start a run in the background and return its id immediately.
    ///
    /// The run slot is claimed before this returns, so a second caller
    /// gets `AppError::Conflict` right away. Progress is observable via
    /// [`AnalysisEngine::status`]; the report lands in
    /// [`AnalysisEngine::current_report`] when the run finishes.
    pub fn spawn_run(
        self: &Arc<Self>,
        project_description: impl Into<String>,
        team_info: impl Into<String>,
    ) -> AppResult<u64> {
        let description = project_description.into();
        let team = team_info.into();
        if description.trim().is_empty() {
            return Err(AppError::validation("project description must not be empty"));
        }

        let (run_id, cancel) = self.begin_run()?;
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = engine.execute_pipeline(run_id, description, team, cancel).await {
                warn!(run_id, error = %e, "background analysis run failed");
            }
        });
        Ok(run_id)
    }

    /// Claim the run slot or refuse because another run is active.
    fn begin_run(&self) -> AppResult<(u64, CancellationToken)> {
        let mut slot = self.run.write().map_err(poisoned)?;
        if slot.as_ref().is_some_and(|run| run.status.is_active()) {
            return Err(AppError::conflict("an analysis run is already in progress"));
        }
        let run_id = self.next_run_id.fetch_add(1, Ordering::SeqCst);
        *slot = Some(PipelineRun::new(run_id));
        let cancel = self.cancel.lock().map_err(poisoned)?.clone();
        info!(run_id, "analysis run started");
        Ok((run_id, cancel))
    }

    /// Record tier progress, unless the slot has moved on to another run.
    fn advance(&self, run_id: u64, step: &str, completed: u32) -> AppResult<()> {
        let mut slot = self.run.write().map_err(poisoned)?;
        if let Some(run) = slot.as_mut() {
            if run.run_id == run_id {
                run.advance(step, completed);
            }
        }
        Ok(())
    }

    async fn execute_pipeline(
        &self,
        run_id: u64,
        description: String,
        team_info: String,
        cancel: CancellationToken,
    ) -> AppResult<AnalysisReport> {
        match self
            .pipeline_inner(run_id, &description, &team_info, &cancel)
            .await
        {
            Ok(report) => Ok(report),
            Err(e) => {
                warn!(run_id, error = %e, "analysis run failed");
                if let Ok(mut slot) = self.run.write() {
                    if let Some(run) = slot.as_mut() {
                        if run.run_id == run_id {
                            run.fail(e.to_string());
                        }
                    }
                }
                Err(e)
            }
        }
    }

    async fn pipeline_inner(
        &self,
        run_id: u64,
        description: &str,
        team_info: &str,
        cancel: &CancellationToken,
    ) -> AppResult<AnalysisReport> {
        let mut report = AnalysisReport::new(description);
        let team = truncate_chars(team_info, TEAM_INFO_CAP).to_string();

        // Document context is pulled once, before any agent runs; agents
        // never touch the retriever mid-run.
        let retrieval_context = {
            let retriever = self.retriever.read().await;
            let queries = vec![
                CONTEXT_PROBE.to_string(),
                truncate_chars(description, CONTEXT_DESCRIPTION_CAP).to_string(),
            ];
            retriever.multi_query_context(&queries, CONTEXT_TOP_K).await
        };
        self.advance(run_id, "running blueprint and discovery agents", 1)?;

        let input_a = AgentInput {
            project_description: description.to_string(),
            retrieval_context,
            team_info: team.clone(),
            ..AgentInput::default()
        };
        let tier_a = Semaphore::new(TIER_A_CONCURRENCY);
        for (kind, result) in join_all(vec![
            run_bounded(&self.blueprint, &input_a, &tier_a, cancel),
            run_bounded(&self.discovery, &input_a, &tier_a, cancel),
        ])
        .await
        {
            report.set(kind, result);
        }
        self.advance(run_id, "running optimization and critique agents", 3)?;

        if let Some(AgentPayload::Discovery(discovery)) = report
            .get(AgentKind::Discovery)
            .and_then(|result| result.payload())
            .cloned()
        {
            self.absorb_research(description, &discovery).await;
        }

        let input_b = AgentInput {
            project_description: description.to_string(),
            blueprint_excerpt: excerpt_of(&report, AgentKind::Blueprint, TIER_B_EXCERPT_CAP),
            discovery_excerpt: excerpt_of(&report, AgentKind::Discovery, TIER_B_EXCERPT_CAP),
            team_info: team.clone(),
            ..AgentInput::default()
        };
        let tier_b = Semaphore::new(TIER_B_CONCURRENCY);
        for (kind, result) in join_all(vec![
            run_bounded(&self.optimization, &input_b, &tier_b, cancel),
            run_bounded(&self.critique, &input_b, &tier_b, cancel),
        ])
        .await
        {
            report.set(kind, result);
        }
        self.advance(run_id, "synthesizing the final report", 5)?;

        let input_synthesis = AgentInput {
            project_description: description.to_string(),
            blueprint_excerpt: excerpt_of(&report, AgentKind::Blueprint, SYNTHESIS_EXCERPT_CAP),
            discovery_excerpt: excerpt_of(&report, AgentKind::Discovery, SYNTHESIS_EXCERPT_CAP),
            optimization_excerpt: excerpt_of(&report, AgentKind::Optimization, SYNTHESIS_EXCERPT_CAP),
            critique_excerpt: excerpt_of(&report, AgentKind::Critique, SYNTHESIS_EXCERPT_CAP),
            team_info: team,
            ..AgentInput::default()
        };
        let synthesis_result = tokio::select! {
            result = self.synthesis.run(&input_synthesis) => result,
            _ = cancel.cancelled() => AgentResult::error("run cancelled"),
        };
        report.set(AgentKind::Synthesis, synthesis_result);
        self.advance(run_id, "generating dashboard and action plan", 6)?;

        if report
            .get(AgentKind::Synthesis)
            .is_some_and(|result| result.is_success())
        {
            let input_final = AgentInput {
                project_description: description.to_string(),
                synthesis_excerpt: excerpt_of(&report, AgentKind::Synthesis, SYNTHESIS_EXCERPT_CAP),
                ..AgentInput::default()
            };
            let finishers = Semaphore::new(TIER_B_CONCURRENCY);
            for (kind, result) in join_all(vec![
                run_bounded(&self.dashboard, &input_final, &finishers, cancel),
                run_bounded(&self.action_plan, &input_final, &finishers, cancel),
            ])
            .await
            {
                report.set(kind, result);
            }
        } else {
            report.set(
                AgentKind::Dashboard,
                AgentResult::error("synthesis failed, nothing to summarize"),
            );
            report.set(
                AgentKind::ActionPlan,
                AgentResult::error("synthesis failed, nothing to plan from"),
            );
        }

        report.compute_summary();
        report.generated_at = Utc::now();

        // Completion and publication are generation-checked: a reset that
        // happened mid-run keeps this stale report out of the slots.
        let owns_slot = {
            let mut slot = self.run.write().map_err(poisoned)?;
            match slot.as_mut() {
                Some(run) if run.run_id == run_id => {
                    run.complete();
                    report.duration_seconds = run.duration_seconds();
                    true
                }
                _ => false,
            }
        };

        if owns_slot {
            {
                let mut published = self.report.write().map_err(poisoned)?;
                *published = Some(report.clone());
            }
            self.record_analysis(&report);
            info!(
                run_id,
                health = ?report.summary.health,
                successful = report.summary.successful_agents,
                failed = report.summary.failed_agents,
                "analysis run finished"
            );
        } else {
            info!(run_id, "run superseded by reset, report not published");
        }

        Ok(report)
    }

    /// Catalog discovered records and fold their cached text into the
    /// vector index. Both halves degrade with a warning; research ingest
    /// must never fail the run.
    async fn absorb_research(&self, description: &str, discovery: &DiscoveryPayload) {
        match self.store.lock() {
            Ok(mut store) => {
                let mut stored = 0usize;
                for repo in &discovery.repositories {
                    if store.store_repository(repo.clone(), description).is_some() {
                        stored += 1;
                    }
                }
                for paper in &discovery.papers {
                    if store.store_paper(paper.clone(), description).is_some() {
                        stored += 1;
                    }
                }
                if stored > 0 {
                    if let Err(e) = store.persist() {
                        warn!(error = %e, "knowledge store persist failed");
                    }
                }
                debug!(stored, "catalogued discovery records");
            }
            Err(_) => warn!("knowledge store lock poisoned, skipping catalog writes"),
        }

        let mut indexer = self.indexer.write().await;
        match indexer
            .index_research_artifacts(&discovery.repositories, &discovery.papers)
            .await
        {
            Ok(0) => {}
            Ok(added) => {
                if let Err(e) = indexer.save(&self.index_path, &self.metadata_path) {
                    warn!(error = %e, "index save after research ingest failed");
                } else {
                    let mut retriever = self.retriever.write().await;
                    retriever.load(&self.index_path, &self.metadata_path).await;
                    debug!(added, "research artifacts indexed, retriever rebound");
                }
            }
            Err(e) => warn!(error = %e, "research artifact indexing failed"),
        }
    }

    /// Append this run to the analysis history.
    fn record_analysis(&self, report: &AnalysisReport) {
        let executive_summary = match report
            .get(AgentKind::Synthesis)
            .and_then(|result| result.payload())
        {
            Some(AgentPayload::Synthesis(payload)) => payload.executive_summary.clone(),
            _ => String::new(),
        };
        let (repositories_found, papers_found) = match report
            .get(AgentKind::Discovery)
            .and_then(|result| result.payload())
        {
            Some(AgentPayload::Discovery(payload)) => {
                (payload.repositories.len(), payload.papers.len())
            }
            _ => (0, 0),
        };
        let record = AnalysisRecord {
            project_description: report.project_description.clone(),
            executive_summary,
            repositories_found,
            papers_found,
            successful_agents: report.summary.successful_agents,
            failed_agents: report.summary.failed_agents,
            duration_seconds: report.duration_seconds,
        };

        match self.store.lock() {
            Ok(mut store) => {
                if store.store_analysis(record).is_some() {
                    if let Err(e) = store.persist() {
                        warn!(error = %e, "knowledge store persist failed");
                    }
                }
            }
            Err(_) => warn!("knowledge store lock poisoned, analysis not recorded"),
        }
    }

    /// Cancel any in-flight run and clear both slots.
    ///
    /// The in-flight task notices through its cancellation token and its
    /// late report is dropped by the generation check.
    pub fn reset(&self) -> AppResult<()> {
        {
            let mut cancel = self.cancel.lock().map_err(poisoned)?;
            cancel.cancel();
            *cancel = CancellationToken::new();
        }
        *self.run.write().map_err(poisoned)? = None;
        *self.report.write().map_err(poisoned)? = None;
        info!("engine state reset");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Observation
    // -----------------------------------------------------------------------

    /// Current run state. Never blocks on the pipeline and never errors.
    pub fn status(&self) -> StatusSnapshot {
        match self.run.read() {
            Ok(slot) => slot
                .as_ref()
                .map(StatusSnapshot::from)
                .unwrap_or_else(StatusSnapshot::idle),
            Err(_) => {
                warn!("run state lock poisoned, reporting idle");
                StatusSnapshot::idle()
            }
        }
    }

    /// The last published report, if any run has finished.
    pub fn current_report(&self) -> Option<AnalysisReport> {
        self.report.read().ok().and_then(|slot| slot.clone())
    }

    /// One component of the last published report, by name.
    pub fn component(&self, name: &str) -> Option<AgentResult> {
        self.report
            .read()
            .ok()
            .and_then(|slot| slot.as_ref().and_then(|r| r.component(name).cloned()))
    }

    /// Descriptors for every registered agent, in pipeline order.
    pub fn agent_info(&self) -> Vec<AgentDescriptor> {
        vec![
            self.blueprint.descriptor(),
            self.discovery.descriptor(),
            self.optimization.descriptor(),
            self.critique.descriptor(),
            self.synthesis.descriptor(),
            self.dashboard.descriptor(),
            self.action_plan.descriptor(),
        ]
    }

    /// Probe both providers without spending a generation.
    pub async fn verify_providers(&self) -> ProviderStatus {
        let generation = match self.llm.health_check().await {
            Ok(()) => ProviderProbe {
                ok: true,
                model: self.llm.model().to_string(),
                error: None,
            },
            Err(e) => ProviderProbe {
                ok: false,
                model: self.llm.model().to_string(),
                error: Some(e.to_string()),
            },
        };
        let embedding = match self.embedding.health_check().await {
            Ok(()) => ProviderProbe {
                ok: true,
                model: self.embedding.display_name().to_string(),
                error: None,
            },
            Err(e) => ProviderProbe {
                ok: false,
                model: self.embedding.display_name().to_string(),
                error: Some(e.to_string()),
            },
        };
        ProviderStatus {
            generation,
            embedding,
        }
    }

    // -----------------------------------------------------------------------
    // Knowledge catalog
    // -----------------------------------------------------------------------

    /// Aggregate view of the knowledge catalog.
    pub fn knowledge_summary(&self) -> AppResult<KnowledgeSummary> {
        Ok(self.store.lock().map_err(poisoned)?.summary())
    }

    /// Drop catalog entries older than the given age. Analyses are kept
    /// as history.
    pub fn prune_knowledge(&self, days: u64) -> AppResult<usize> {
        self.store.lock().map_err(poisoned)?.prune_older_than(days)
    }

    /// Search the catalogued repositories.
    pub fn search_repositories(
        &self,
        query: &str,
        language: Option<&str>,
        min_stars: u64,
    ) -> AppResult<Vec<StoredRepository>> {
        Ok(self
            .store
            .lock()
            .map_err(poisoned)?
            .search_repositories(query, language, min_stars))
    }

    /// Search the catalogued papers.
    pub fn search_papers(
        &self,
        query: &str,
        source_type: Option<PaperSourceType>,
        min_relevance: f32,
    ) -> AppResult<Vec<StoredPaper>> {
        Ok(self
            .store
            .lock()
            .map_err(poisoned)?
            .search_papers(query, source_type, min_relevance))
    }

    // -----------------------------------------------------------------------
    // Index management
    // -----------------------------------------------------------------------

    /// Rebuild the vector index from scratch over the given sources.
    ///
    /// Refused while a run is active; the pipeline reads the retriever at
    /// its own boundaries and must not see it move underneath. Individual
    /// unreadable files are reported, not fatal.
    pub async fn build_document_index(
        &self,
        files: &[PathBuf],
        transcripts: &[TranscriptEntry],
    ) -> AppResult<IndexReport> {
        {
            let slot = self.run.read().map_err(poisoned)?;
            if slot.as_ref().is_some_and(|run| run.status.is_active()) {
                return Err(AppError::conflict(
                    "cannot rebuild the index while an analysis run is active",
                ));
            }
        }
        if files.is_empty() && transcripts.is_empty() {
            return Err(AppError::validation("nothing to index"));
        }

        let mut fresh =
            DocumentIndexer::new(self.embedding.clone(), self.chunk_window, self.chunk_overlap)?;
        let mut combined = fresh.index_files(files).await?;
        combined.absorb(fresh.index_transcripts(transcripts).await?);

        if fresh.chunk_count() == 0 {
            return Err(AppError::no_index(format!(
                "no indexable content in the given sources ({} failures)",
                combined.failures.len()
            )));
        }
        fresh.save(&self.index_path, &self.metadata_path)?;

        {
            let mut indexer = self.indexer.write().await;
            *indexer = fresh;
        }
        {
            let mut retriever = self.retriever.write().await;
            if !retriever.load(&self.index_path, &self.metadata_path).await {
                warn!("retriever could not bind the freshly saved artifacts");
            }
        }

        info!(
            files = combined.files_processed,
            transcripts = combined.transcripts_processed,
            chunks = combined.chunks_indexed,
            failures = combined.failures.len(),
            "document index rebuilt"
        );
        Ok(combined)
    }

    /// Whether the retriever currently has a searchable index.
    pub async fn index_ready(&self) -> bool {
        self.retriever.read().await.is_ready()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
