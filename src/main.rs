//! One-shot pipeline runner.
//!
//! Reads the project description from the command line (or stdin when no
//! arguments are given), runs the full analysis and prints the report as
//! JSON. A copy of the report lands in the reports directory.

use std::io::Read;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use prospector::config::{load_dotenv, AppConfig};
use prospector::services::engine::AnalysisEngine;
use prospector::utils::paths;

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let description = read_description()?;
    if description.trim().is_empty() {
        anyhow::bail!("usage: prospector <project description> (or pipe it on stdin)");
    }
    let team_info = std::env::var("PROSPECTOR_TEAM_INFO").unwrap_or_default();

    let config = AppConfig::from_env().context("loading configuration")?;
    let engine = AnalysisEngine::from_config(&config)
        .await
        .context("building the analysis engine")?;

    let report = engine
        .run(description, team_info)
        .await
        .context("running the analysis")?;

    let json = serde_json::to_string_pretty(&report)?;
    let reports_dir = paths::ensure_reports_dir()?;
    let path = reports_dir.join(format!(
        "analysis-{}.json",
        report.generated_at.format("%Y%m%dT%H%M%SZ")
    ));
    std::fs::write(&path, &json).with_context(|| format!("writing {}", path.display()))?;

    println!("{json}");
    tracing::info!(report = %path.display(), "analysis complete");
    Ok(())
}

fn read_description() -> Result<String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if !args.is_empty() {
        return Ok(args.join(" "));
    }
    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .context("reading project description from stdin")?;
    Ok(buffer)
}
