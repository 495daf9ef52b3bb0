//! Shared test utilities for orgplan integration tests.
//!
//! - PRD fixtures ([`sample_prd`], [`sample_prd_json`])
//! - scripted [`ReasoningClient`] doubles: [`ScriptedClient`],
//!   [`FailingClient`], [`SlowClient`]
//! - a canned valid design response ([`sample_design_json`])
//! - [`StructureSignature`] for comparing graphs while ignoring ids and
//!   timestamps

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use orgplan_core::graph::{BudgetPolicy, RoleLevel};
use orgplan_core::{Oag, Prd, PrdObjective, ReasoningClient, ReasoningError, ReasoningRequest};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A PRD with `objectives` numbered objectives.
pub fn sample_prd(objectives: usize) -> Prd {
    Prd {
        title: "Atlas".to_owned(),
        domain: "saas".to_owned(),
        objectives: (1..=objectives)
            .map(|i| PrdObjective::new(format!("Objective {i}"), format!("Deliver capability {i}")))
            .collect(),
        success_criteria: vec!["Customers onboard without help".to_owned()],
    }
}

/// JSON form of [`sample_prd`].
pub fn sample_prd_json(objectives: usize) -> Value {
    json!({
        "title": "Atlas",
        "domain": "saas",
        "objectives": (1..=objectives)
            .map(|i| json!({ "title": format!("Objective {i}"), "description": format!("Deliver capability {i}") }))
            .collect::<Vec<_>>(),
        "success_criteria": ["Customers onboard without help"],
    })
}

/// A valid design: five agents in one ladder, three tasks, one OKR bundle.
pub fn sample_design_json() -> Value {
    json!({
        "agents": [
            { "role": "CEO", "level": "C_SUITE", "reports_to": null },
            { "role": "VP Engineering", "level": "VP", "reports_to": "CEO" },
            { "role": "Engineering Manager", "level": "MANAGER", "reports_to": "VP Engineering" },
            { "role": "Backend Engineer", "level": "IC", "reports_to": "Engineering Manager" },
            { "role": "Frontend Engineer", "level": null, "reports_to": "Engineering Manager" }
        ],
        "tasks": [
            { "title": "API", "description": "Build the public API", "assignee": "Backend Engineer",
              "depends_on": [], "dod": "Endpoints documented" },
            { "title": "Web app", "description": "Build the web client", "assignee": "Frontend Engineer",
              "depends_on": ["API"], "dod": null },
            { "title": "Launch", "description": "Release to customers", "assignee": "VP Engineering",
              "depends_on": ["API", "Web app"], "dod": null }
        ],
        "budget_policy": "BALANCED",
        "forecast_cost_usd": 75.5,
        "okrs": [
            { "owner_role": "VP Engineering", "objective": "Launch v1",
              "key_results": [{ "metric": "features_shipped", "target": 3 }],
              "kpis": [{ "metric": "deploys_per_week", "target": 5 }] }
        ]
    })
}

// ---------------------------------------------------------------------------
// Reasoning clients
// ---------------------------------------------------------------------------

/// Returns a fixed response and records every request.
pub struct ScriptedClient {
    response: String,
    calls: AtomicUsize,
    last_request: Mutex<Option<ReasoningRequest>>,
}

impl ScriptedClient {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<ReasoningRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl ReasoningClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &ReasoningRequest) -> Result<String, ReasoningError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap_or_else(|e| e.into_inner()) = Some(request.clone());
        Ok(self.response.clone())
    }
}

/// Always fails with a transport error.
pub struct FailingClient;

#[async_trait]
impl ReasoningClient for FailingClient {
    fn name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: &ReasoningRequest) -> Result<String, ReasoningError> {
        Err(ReasoningError::Transport("connection refused".to_owned()))
    }
}

/// Sleeps before answering; used to exercise timeouts and cancellation.
pub struct SlowClient {
    pub delay: Duration,
    pub response: String,
}

#[async_trait]
impl ReasoningClient for SlowClient {
    fn name(&self) -> &str {
        "slow"
    }

    async fn complete(&self, _request: &ReasoningRequest) -> Result<String, ReasoningError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.response.clone())
    }
}

// ---------------------------------------------------------------------------
// Structural comparison
// ---------------------------------------------------------------------------

/// Shape of a graph with ids replaced by insertion indices and
/// timestamps dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureSignature {
    /// (role, level, manager index)
    pub agents: Vec<(String, RoleLevel, Option<usize>)>,
    /// (description, assignee index)
    pub tasks: Vec<(String, Option<usize>)>,
    /// (from index, to index) over all nodes
    pub edges: Vec<(usize, usize)>,
    pub policy: BudgetPolicy,
    pub forecast_cost_usd: f64,
    pub okr_counts: Vec<usize>,
}

pub fn structure_signature(oag: &Oag) -> StructureSignature {
    let index: HashMap<&str, usize> = oag.nodes().enumerate().map(|(i, n)| (n.id(), i)).collect();
    let idx = |id: &str| index.get(id).copied();

    StructureSignature {
        agents: oag
            .get_agents()
            .iter()
            .map(|a| (a.role.clone(), a.level, a.manager_id.as_deref().and_then(idx)))
            .collect(),
        tasks: oag
            .get_tasks()
            .iter()
            .map(|t| (t.description.clone(), idx(&t.agent_id)))
            .collect(),
        edges: oag
            .edges()
            .iter()
            .filter_map(|e| Some((idx(&e.from_id)?, idx(&e.to_id)?)))
            .collect(),
        policy: oag.budget.policy,
        forecast_cost_usd: oag.budget.forecast_cost_usd,
        okr_counts: oag.get_agents().iter().map(|a| a.okrs.len()).collect(),
    }
}
