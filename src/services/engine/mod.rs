//! Analysis Engine
//!
//! The seven-agent concurrent pipeline over the retrieval layer and the
//! knowledge catalog:
//! - `agents`: prompt construction and the task agent implementations
//! - `orchestrator`: run lifecycle, tier scheduling and report publishing

pub mod agents;
pub mod orchestrator;

pub use agents::{AgentInput, TaskAgent};
pub use orchestrator::{AnalysisEngine, ProviderProbe, ProviderStatus};
