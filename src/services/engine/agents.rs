//! Pipeline agents.
//!
//! One [`TaskAgent`] per report slot: the five analysis agents plus the
//! dashboard and action plan finishers. Every agent wraps the same
//! generation provider and differs only in its prompt and in how the raw
//! text is shaped into a typed payload. Provider errors never escape an
//! agent; they come back as [`AgentResult::Error`] so one bad call cannot
//! take the run down.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::warn;

use prospector_llm::{GenerationRequest, LlmProvider};

use crate::models::{
    ActionPlanPayload, AgentDescriptor, AgentKind, AgentPayload, AgentResult, BlueprintPayload,
    CritiquePayload, DashboardMetrics, DashboardPayload, DataSources, DiscoveryPayload,
    OptimizationPayload, PaperRecord, RepositoryRecord, RiskLevel, SynthesisPayload,
};

/// Horizon of the generated action plan, in weeks.
pub const DEFAULT_TIMELINE_WEEKS: u32 = 12;

/// Focus the critique takes when none is configured.
pub const DEFAULT_FOCUS_AREA: &str = "general";

// ---------------------------------------------------------------------------
// Agent interface
// ---------------------------------------------------------------------------

/// Everything an agent may draw on for one run.
///
/// Excerpts are pre-capped by the engine before the input is built, so
/// agents can interpolate them into prompts without further trimming.
#[derive(Debug, Clone, Default)]
pub struct AgentInput {
    /// The project description under analysis.
    pub project_description: String,
    /// Formatted document context retrieved before the run started.
    pub retrieval_context: String,
    /// Capped excerpt of the blueprint output, empty if it failed.
    pub blueprint_excerpt: String,
    /// Capped excerpt of the discovery output, empty if it failed.
    pub discovery_excerpt: String,
    /// Capped excerpt of the optimization output, empty if it failed.
    pub optimization_excerpt: String,
    /// Capped excerpt of the critique output, empty if it failed.
    pub critique_excerpt: String,
    /// Capped excerpt of the synthesis report, empty if it failed.
    pub synthesis_excerpt: String,
    /// Capped team description, empty when none was given.
    pub team_info: String,
}

/// A single pipeline agent.
#[async_trait]
pub trait TaskAgent: Send + Sync {
    /// Which report slot this agent fills.
    fn kind(&self) -> AgentKind;

    /// Static description for the agent registry.
    fn descriptor(&self) -> AgentDescriptor;

    /// Produce this agent's result.
    ///
    /// Infallible by contract: generation errors and unusable output are
    /// folded into [`AgentResult::Error`] here, at the task boundary.
    async fn run(&self, input: &AgentInput) -> AgentResult;
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Run one generation call and unwrap it to usable text.
///
/// Empty output counts as a failure: an agent with nothing to say must
/// surface as an error result, not as a blank payload.
async fn generate_text(
    provider: &dyn LlmProvider,
    kind: AgentKind,
    request: GenerationRequest,
) -> Result<String, String> {
    match provider.generate(request).await {
        Ok(response) if response.is_empty() => {
            warn!(agent = %kind, "generation returned no usable text");
            Err("generation returned no usable text".to_string())
        }
        Ok(response) => Ok(response.text),
        Err(e) => {
            warn!(agent = %kind, error = %e, "generation failed");
            Err(e.to_string())
        }
    }
}

/// First `{`..last `}` slice of the text, which also skips past markdown
/// code fences the model may have wrapped the JSON in.
fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Truncate to at most `max_chars` characters on a char boundary.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((i, _)) => &text[..i],
        None => text,
    }
}

/// Prompt section body, with a placeholder when the source is empty.
fn section_or_missing(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        "(not available)"
    } else {
        trimmed
    }
}

/// Lowercased content words of the description, longest-first order of
/// appearance, at most five. Used when the model gives us no keywords.
fn fallback_keywords(description: &str) -> Vec<String> {
    let lowered = description.to_lowercase();
    let mut seen = HashSet::new();
    let mut keywords: Vec<String> = lowered
        .split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|word| word.chars().count() > 4)
        .filter(|word| seen.insert(word.clone()))
        .take(5)
        .collect();
    if keywords.is_empty() {
        keywords.push("software".to_string());
    }
    keywords
}

/// Deterministic discovery payload built from the description alone.
///
/// Stands in when the model's structured output cannot be parsed: search
/// entry points on GitHub and Google Scholar, one per keyword, clearly
/// marked with `fallback_used`.
pub fn fallback_discovery(project_description: &str) -> DiscoveryPayload {
    let keywords = fallback_keywords(project_description);
    let repositories: Vec<RepositoryRecord> = keywords
        .iter()
        .take(3)
        .map(|keyword| RepositoryRecord {
            name: format!("awesome-{keyword}"),
            url: Some(format!("https://github.com/search?q={keyword}")),
            description: format!("Search starting point for {keyword} projects"),
            topics: vec![keyword.clone()],
            ..Default::default()
        })
        .collect();
    let papers: Vec<PaperRecord> = keywords
        .iter()
        .take(2)
        .map(|keyword| PaperRecord {
            title: format!("Literature survey: {keyword}"),
            url: Some(format!("https://scholar.google.com/scholar?q={keyword}")),
            description: format!("Scholar search entry point for {keyword}"),
            relevance_score: 0.3,
            ..Default::default()
        })
        .collect();
    DiscoveryPayload {
        summary: "Structured discovery was unavailable; listing keyword-derived starting points."
            .to_string(),
        keywords,
        repositories,
        papers,
        fallback_used: true,
        generated_at: Utc::now(),
    }
}

/// Conservative dashboard metrics for when parsing fails.
pub fn fallback_dashboard() -> DashboardMetrics {
    DashboardMetrics {
        risk_level: RiskLevel::Medium,
        success_probability: None,
        timeline_weeks: None,
        top_risks: Vec::new(),
        quick_wins: Vec::new(),
    }
}

/// Models sometimes answer probabilities as percentages.
fn normalize_probability(value: f32) -> f32 {
    if value > 1.0 {
        (value / 100.0).min(1.0)
    } else {
        value.max(0.0)
    }
}

/// Pull the executive summary out of a markdown report.
///
/// Takes everything from the `EXECUTIVE SUMMARY` heading to the next `#`,
/// or the first thousand characters of the section when no later heading
/// exists. Reports without the heading yield their first 500 words.
fn extract_executive_summary(full_report: &str) -> String {
    if let Some(start) = full_report.find("EXECUTIVE SUMMARY") {
        let section = &full_report[start..];
        let end = section
            .char_indices()
            .skip(1)
            .find(|(_, c)| *c == '#')
            .map(|(i, _)| i);
        let summary = match end {
            Some(i) => &section[..i],
            None => truncate_chars(section, 1000),
        };
        return summary.trim().to_string();
    }

    let words: Vec<&str> = full_report.split_whitespace().take(500).collect();
    words.join(" ")
}

/// Markdown heading lines of the report, stripped of their `#` markers.
fn identify_sections(report: &str) -> Vec<String> {
    report
        .lines()
        .filter(|line| line.starts_with('#'))
        .map(|line| line.trim_start_matches('#').trim().to_string())
        .filter(|heading| !heading.is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// Blueprint
// ---------------------------------------------------------------------------

/// Drafts the project blueprint from the description and any retrieved
/// document context.
pub struct BlueprintAgent {
    provider: Arc<dyn LlmProvider>,
}

impl BlueprintAgent {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl TaskAgent for BlueprintAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Blueprint
    }

    fn descriptor(&self) -> AgentDescriptor {
        AgentDescriptor {
            name: "BlueprintAgent".to_string(),
            model: self.provider.model().to_string(),
            capabilities: vec![
                "Project blueprint generation".to_string(),
                "Technical architecture planning".to_string(),
                "Roadmap drafting".to_string(),
            ],
            focus: "Strategic planning and project architecture".to_string(),
        }
    }

    async fn run(&self, input: &AgentInput) -> AgentResult {
        let prompt = format!(
            "Create a practical project blueprint.\n\n\
             Project:\n{}\n\n\
             Reference material from the project's document index:\n{}\n\n\
             Cover the executive summary, market opportunity, technical \
             architecture, business model, development roadmap, risk \
             assessment and resource needs. Be specific and actionable; use \
             markdown headings.",
            input.project_description.trim(),
            section_or_missing(&input.retrieval_context),
        );
        let request = GenerationRequest::new(prompt).with_system(
            "You are a senior startup analyst who writes practical, specific project blueprints.",
        );

        match generate_text(self.provider.as_ref(), self.kind(), request).await {
            Ok(text) => AgentResult::success(AgentPayload::Blueprint(BlueprintPayload {
                text: text.trim().to_string(),
                generated_at: Utc::now(),
            })),
            Err(message) => AgentResult::error(message),
        }
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Structured shape the discovery prompt asks the model to produce.
#[derive(Debug, Deserialize)]
struct DiscoverySketch {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    repositories: Vec<RepositoryRecord>,
    #[serde(default)]
    papers: Vec<PaperRecord>,
}

fn parse_discovery(text: &str) -> Option<DiscoverySketch> {
    let sketch: DiscoverySketch = serde_json::from_str(extract_json(text)?).ok()?;
    if sketch.repositories.is_empty() && sketch.papers.is_empty() {
        return None;
    }
    Some(sketch)
}

/// Maps the ecosystem around the project: comparable repositories,
/// related papers and the keywords that connect them.
pub struct DiscoveryAgent {
    provider: Arc<dyn LlmProvider>,
}

impl DiscoveryAgent {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl TaskAgent for DiscoveryAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Discovery
    }

    fn descriptor(&self) -> AgentDescriptor {
        AgentDescriptor {
            name: "DiscoveryAgent".to_string(),
            model: self.provider.model().to_string(),
            capabilities: vec![
                "Comparable repository discovery".to_string(),
                "Research paper discovery".to_string(),
                "Keyword extraction".to_string(),
            ],
            focus: "Mapping the open-source and academic ecosystem".to_string(),
        }
    }

    async fn run(&self, input: &AgentInput) -> AgentResult {
        let prompt = format!(
            "List comparable open-source repositories and relevant research \
             papers for this project.\n\n\
             Project:\n{}\n\n\
             Respond with JSON only, no prose around it, shaped as:\n\
             {{\"summary\": \"one paragraph on the landscape\", \
             \"keywords\": [\"...\"], \
             \"repositories\": [{{\"name\": \"...\", \"url\": \"https://...\", \
             \"description\": \"...\", \"language\": \"...\", \"stars\": 0, \
             \"topics\": [\"...\"]}}], \
             \"papers\": [{{\"title\": \"...\", \"url\": \"https://...\", \
             \"description\": \"...\", \"relevance_score\": 0.0}}]}}",
            input.project_description.trim(),
        );
        let request = GenerationRequest::new(prompt).with_system(
            "You map the open-source and academic ecosystem around software \
             projects. When asked for JSON you answer with strict JSON.",
        );

        let text = match generate_text(self.provider.as_ref(), self.kind(), request).await {
            Ok(text) => text,
            Err(message) => return AgentResult::error(message),
        };

        let payload = match parse_discovery(&text) {
            Some(sketch) => DiscoveryPayload {
                summary: sketch.summary,
                keywords: sketch.keywords,
                repositories: sketch.repositories,
                papers: sketch.papers,
                fallback_used: false,
                generated_at: Utc::now(),
            },
            None => {
                warn!(
                    agent = %AgentKind::Discovery,
                    "structured discovery parse failed, using fallback records"
                );
                let mut payload = fallback_discovery(&input.project_description);
                if !text.trim().is_empty() {
                    payload.summary = truncate_chars(text.trim(), 600).to_string();
                }
                payload
            }
        };
        AgentResult::success(AgentPayload::Discovery(payload))
    }
}

// ---------------------------------------------------------------------------
// Optimization
// ---------------------------------------------------------------------------

/// Recommends improvements to the blueprint in the light of what
/// discovery found.
pub struct OptimizationAgent {
    provider: Arc<dyn LlmProvider>,
}

impl OptimizationAgent {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl TaskAgent for OptimizationAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Optimization
    }

    fn descriptor(&self) -> AgentDescriptor {
        AgentDescriptor {
            name: "OptimizationAgent".to_string(),
            model: self.provider.model().to_string(),
            capabilities: vec![
                "Architecture review".to_string(),
                "Technology selection".to_string(),
                "Cost and process optimization".to_string(),
            ],
            focus: "Improving the planned approach without replacing it".to_string(),
        }
    }

    async fn run(&self, input: &AgentInput) -> AgentResult {
        let context_chars =
            input.blueprint_excerpt.chars().count() + input.discovery_excerpt.chars().count();
        let prompt = format!(
            "Recommend concrete improvements to this project plan.\n\n\
             Project:\n{}\n\n\
             Blueprint excerpt:\n{}\n\n\
             Ecosystem research:\n{}\n\n\
             Cover architecture, technology choices, development process and \
             infrastructure. For each recommendation give the reasoning and \
             the expected impact.",
            input.project_description.trim(),
            section_or_missing(&input.blueprint_excerpt),
            section_or_missing(&input.discovery_excerpt),
        );
        let request = GenerationRequest::new(prompt).with_system(
            "You are a pragmatic technical optimizer. You improve plans rather than replace them.",
        );

        match generate_text(self.provider.as_ref(), self.kind(), request).await {
            Ok(text) => AgentResult::success(AgentPayload::Optimization(OptimizationPayload {
                recommendations: text.trim().to_string(),
                context_chars,
                generated_at: Utc::now(),
            })),
            Err(message) => AgentResult::error(message),
        }
    }
}

// ---------------------------------------------------------------------------
// Critique
// ---------------------------------------------------------------------------

/// Plays devil's advocate against the blueprint.
pub struct CritiqueAgent {
    provider: Arc<dyn LlmProvider>,
    focus_area: String,
}

impl CritiqueAgent {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            focus_area: DEFAULT_FOCUS_AREA.to_string(),
        }
    }

    /// Narrow the critique to one area, e.g. "market" or "technical".
    pub fn with_focus(mut self, focus_area: impl Into<String>) -> Self {
        self.focus_area = focus_area.into();
        self
    }
}

#[async_trait]
impl TaskAgent for CritiqueAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Critique
    }

    fn descriptor(&self) -> AgentDescriptor {
        AgentDescriptor {
            name: "CritiqueAgent".to_string(),
            model: self.provider.model().to_string(),
            capabilities: vec![
                "Assumption challenging".to_string(),
                "Risk surfacing".to_string(),
                "Competitive stress-testing".to_string(),
            ],
            focus: "Finding the holes before the market does".to_string(),
        }
    }

    async fn run(&self, input: &AgentInput) -> AgentResult {
        let context_chars =
            input.blueprint_excerpt.chars().count() + input.discovery_excerpt.chars().count();
        let prompt = format!(
            "Challenge this project plan.\n\n\
             Project:\n{}\n\n\
             Blueprint excerpt:\n{}\n\n\
             Ecosystem research:\n{}\n\n\
             Team:\n{}\n\n\
             Focus area: {}\n\n\
             Question the market, technical and resource assumptions. Name \
             stronger competitors and the most likely failure scenarios. Be \
             hard on the plan and useful to the planner.",
            input.project_description.trim(),
            section_or_missing(&input.blueprint_excerpt),
            section_or_missing(&input.discovery_excerpt),
            section_or_missing(&input.team_info),
            self.focus_area,
        );
        let request = GenerationRequest::new(prompt).with_system(
            "You are a constructive devil's advocate. You challenge assumptions \
             hard while staying useful.",
        );

        match generate_text(self.provider.as_ref(), self.kind(), request).await {
            Ok(text) => AgentResult::success(AgentPayload::Critique(CritiquePayload {
                focus_area: self.focus_area.clone(),
                challenges: text.trim().to_string(),
                context_chars,
                generated_at: Utc::now(),
            })),
            Err(message) => AgentResult::error(message),
        }
    }
}

// ---------------------------------------------------------------------------
// Synthesis
// ---------------------------------------------------------------------------

/// Folds every upstream output into one cohesive report.
pub struct SynthesisAgent {
    provider: Arc<dyn LlmProvider>,
}

impl SynthesisAgent {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl TaskAgent for SynthesisAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Synthesis
    }

    fn descriptor(&self) -> AgentDescriptor {
        AgentDescriptor {
            name: "SynthesisAgent".to_string(),
            model: self.provider.model().to_string(),
            capabilities: vec![
                "Multi-source report synthesis".to_string(),
                "Executive summary extraction".to_string(),
            ],
            focus: "One cohesive report out of many partial analyses".to_string(),
        }
    }

    async fn run(&self, input: &AgentInput) -> AgentResult {
        let data_sources = DataSources {
            blueprint_included: !input.blueprint_excerpt.trim().is_empty(),
            discovery_included: !input.discovery_excerpt.trim().is_empty(),
            optimization_included: !input.optimization_excerpt.trim().is_empty(),
            critique_included: !input.critique_excerpt.trim().is_empty(),
        };
        let prompt = format!(
            "Fold the analyses below into one cohesive report.\n\n\
             Project:\n{}\n\n\
             Blueprint:\n{}\n\n\
             Ecosystem research:\n{}\n\n\
             Optimization recommendations:\n{}\n\n\
             Critical challenges:\n{}\n\n\
             Structure the report with markdown headings, starting with \
             '# EXECUTIVE SUMMARY', then strategy, key recommendations, risk \
             mitigation and an implementation guide. Resolve contradictions \
             between the inputs instead of repeating them.",
            input.project_description.trim(),
            section_or_missing(&input.blueprint_excerpt),
            section_or_missing(&input.discovery_excerpt),
            section_or_missing(&input.optimization_excerpt),
            section_or_missing(&input.critique_excerpt),
        );
        let request = GenerationRequest::new(prompt).with_system(
            "You are a synthesis analyst who folds many partial analyses into \
             one cohesive, decision-ready report.",
        );

        match generate_text(self.provider.as_ref(), self.kind(), request).await {
            Ok(text) => {
                let full_report = text.trim().to_string();
                AgentResult::success(AgentPayload::Synthesis(SynthesisPayload {
                    executive_summary: extract_executive_summary(&full_report),
                    report_sections: identify_sections(&full_report),
                    data_sources,
                    full_report,
                    generated_at: Utc::now(),
                }))
            }
            Err(message) => AgentResult::error(message),
        }
    }
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

/// Structured shape the dashboard prompt asks the model to produce.
#[derive(Debug, Deserialize)]
struct DashboardSketch {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    risk_level: RiskLevel,
    #[serde(default)]
    success_probability: Option<f32>,
    #[serde(default)]
    timeline_weeks: Option<u32>,
    #[serde(default)]
    top_risks: Vec<String>,
    #[serde(default)]
    quick_wins: Vec<String>,
}

fn parse_dashboard(text: &str) -> Option<DashboardSketch> {
    serde_json::from_str(extract_json(text)?).ok()
}

/// Compresses the synthesis report into an executive dashboard.
pub struct DashboardAgent {
    provider: Arc<dyn LlmProvider>,
}

impl DashboardAgent {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl TaskAgent for DashboardAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Dashboard
    }

    fn descriptor(&self) -> AgentDescriptor {
        AgentDescriptor {
            name: "DashboardAgent".to_string(),
            model: self.provider.model().to_string(),
            capabilities: vec![
                "Executive dashboard creation".to_string(),
                "Metric extraction".to_string(),
            ],
            focus: "The whole analysis at a glance".to_string(),
        }
    }

    async fn run(&self, input: &AgentInput) -> AgentResult {
        let prompt = format!(
            "Summarize this analysis as an executive dashboard.\n\n\
             Synthesis report:\n{}\n\n\
             Respond with JSON only, shaped as: {{\"summary\": \"...\", \
             \"risk_level\": \"low|medium|high\", \"success_probability\": 0.0, \
             \"timeline_weeks\": 12, \"top_risks\": [\"...\"], \
             \"quick_wins\": [\"...\"]}}",
            section_or_missing(&input.synthesis_excerpt),
        );
        let request = GenerationRequest::new(prompt).with_system(
            "You compress analysis reports into executive dashboards. When \
             asked for JSON you answer with strict JSON.",
        );

        let text = match generate_text(self.provider.as_ref(), self.kind(), request).await {
            Ok(text) => text,
            Err(message) => return AgentResult::error(message),
        };

        let payload = match parse_dashboard(&text) {
            Some(sketch) => DashboardPayload {
                summary: if sketch.summary.trim().is_empty() {
                    text.trim().to_string()
                } else {
                    sketch.summary
                },
                metrics: DashboardMetrics {
                    risk_level: sketch.risk_level,
                    success_probability: sketch.success_probability.map(normalize_probability),
                    timeline_weeks: sketch.timeline_weeks,
                    top_risks: sketch.top_risks,
                    quick_wins: sketch.quick_wins,
                },
                fallback_used: false,
                generated_at: Utc::now(),
            },
            None => {
                warn!(
                    agent = %AgentKind::Dashboard,
                    "dashboard metrics parse failed, using defaults"
                );
                DashboardPayload {
                    summary: text.trim().to_string(),
                    metrics: fallback_dashboard(),
                    fallback_used: true,
                    generated_at: Utc::now(),
                }
            }
        };
        AgentResult::success(AgentPayload::Dashboard(payload))
    }
}

// ---------------------------------------------------------------------------
// Action plan
// ---------------------------------------------------------------------------

/// Turns the synthesis into a week-by-week execution plan.
pub struct ActionPlanAgent {
    provider: Arc<dyn LlmProvider>,
    timeline_weeks: u32,
}

impl ActionPlanAgent {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            timeline_weeks: DEFAULT_TIMELINE_WEEKS,
        }
    }
}

#[async_trait]
impl TaskAgent for ActionPlanAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::ActionPlan
    }

    fn descriptor(&self) -> AgentDescriptor {
        AgentDescriptor {
            name: "ActionPlanAgent".to_string(),
            model: self.provider.model().to_string(),
            capabilities: vec![
                "Week-by-week planning".to_string(),
                "Milestone definition".to_string(),
            ],
            focus: "From analysis to an executable schedule".to_string(),
        }
    }

    async fn run(&self, input: &AgentInput) -> AgentResult {
        let prompt = format!(
            "Create a {}-week action plan from this analysis.\n\n\
             Project:\n{}\n\n\
             Synthesis report:\n{}\n\n\
             Lay out week-by-week tasks, deliverables, success criteria and \
             the key decisions with their deadlines.",
            self.timeline_weeks,
            input.project_description.trim(),
            section_or_missing(&input.synthesis_excerpt),
        );
        let request = GenerationRequest::new(prompt).with_system(
            "You turn analysis reports into concrete week-by-week execution plans.",
        );

        match generate_text(self.provider.as_ref(), self.kind(), request).await {
            Ok(text) => AgentResult::success(AgentPayload::ActionPlan(ActionPlanPayload {
                timeline_weeks: self.timeline_weeks,
                plan: text.trim().to_string(),
                generated_at: Utc::now(),
            })),
            Err(message) => AgentResult::error(message),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
