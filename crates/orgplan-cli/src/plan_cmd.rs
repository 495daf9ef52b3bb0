//! `orgplan plan`: read a PRD, plan an organization, write the OAG.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tokio_util::sync::CancellationToken;

use orgplan_core::{Oag, PlanContext, Planner, Prd};

use crate::config;

/// Arguments of `orgplan plan`.
#[derive(Debug)]
pub struct PlanOptions {
    pub prd: PathBuf,
    pub budget: f64,
    pub out: PathBuf,
    pub offline: bool,
    pub strict_refs: bool,
}

/// Read the PRD file. Invalid JSON is an error; missing or malformed fields
/// are defaulted.
pub fn read_prd(path: &Path) -> Result<Prd> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read PRD file {}", path.display()))?;
    Prd::from_json(&contents)
        .with_context(|| format!("PRD file {} is not valid JSON", path.display()))
}

pub async fn run_plan(options: &PlanOptions) -> Result<()> {
    if !options.budget.is_finite() || options.budget < 0.0 {
        bail!("budget must be a non-negative number, got {}", options.budget);
    }
    let prd = read_prd(&options.prd)?;
    let planner_config = config::resolve(options.strict_refs)?;
    let planner = Planner::from_config(&planner_config);

    // Ctrl-C during the reasoning call cancels it; planning then falls back.
    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, cancelling reasoning request");
                cancel.cancel();
            }
        })
    };

    let ctx = PlanContext {
        offline: options.offline.then_some(true),
        cancel: Some(cancel),
    };
    let result = planner.plan(&prd, options.budget, &ctx).await;
    watcher.abort();
    let oag = result.context("planning failed")?;

    let json = oag.to_json_pretty().context("failed to serialize plan")?;
    std::fs::write(&options.out, json)
        .with_context(|| format!("failed to write plan to {}", options.out.display()))?;

    print!("{}", summary(&oag, &options.out));
    Ok(())
}

fn summary(oag: &Oag, out: &Path) -> String {
    let b = &oag.budget;
    format!(
        "Plan written to {}\n  agents:   {}\n  tasks:    {}\n  edges:    {}\n  policy:   {}\n  forecast: ${:.2} (soft cap ${:.2}, hard cap ${:.2})\n",
        out.display(),
        oag.get_agents().len(),
        oag.get_tasks().len(),
        oag.edges().len(),
        b.policy,
        b.forecast_cost_usd,
        b.soft_cap_usd,
        b.hard_cap_usd,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use orgplan_core::DeterministicPlanner;

    #[test]
    fn read_prd_defaults_malformed_fields() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("prd.json");
        std::fs::write(&path, r#"{"title": 12, "objectives": ["Launch"]}"#).unwrap();
        let prd = read_prd(&path).unwrap();
        assert_eq!(prd.display_title(), "Project");
        assert_eq!(prd.objectives.len(), 1);
    }

    #[test]
    fn read_prd_rejects_missing_and_invalid_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        let missing = tmp.path().join("missing.json");
        let msg = format!("{:#}", read_prd(&missing).unwrap_err());
        assert!(msg.contains("failed to read PRD file"), "unexpected error: {msg}");

        let bad = tmp.path().join("bad.json");
        std::fs::write(&bad, "{ nope").unwrap();
        let msg = format!("{:#}", read_prd(&bad).unwrap_err());
        assert!(msg.contains("not valid JSON"), "unexpected error: {msg}");
    }

    #[test]
    fn summary_lists_counts_and_budget() {
        let oag = DeterministicPlanner::new().plan(&Prd::default(), 150.0).unwrap();
        let text = summary(&oag, Path::new("oag.json"));
        assert!(text.starts_with("Plan written to oag.json"));
        assert!(text.contains(&format!("agents:   {}", oag.get_agents().len())));
        assert!(text.contains("tasks:    1"));
        assert!(text.contains("policy:   AGGRESSIVE"));
        assert!(text.contains("hard cap $150.00"));
    }
}
