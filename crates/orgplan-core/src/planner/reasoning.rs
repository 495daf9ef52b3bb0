//! Planner that delegates organization design to a reasoning service.
//!
//! The service returns an [`OrgDesign`]; this module rebuilds it into an
//! [`Oag`] in a fixed order (agents, reporting lines, tasks, dependencies,
//! OKRs). Any failure before the graph is complete falls back to the
//! [`DeterministicPlanner`]. Only graph-integrity errors escape.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{Level, debug, info, warn};

use super::design::{DESIGN_SCHEMA_NAME, DesignTask, OrgDesign, design_response_schema, parse_design_output};
use super::heuristic::{DeterministicPlanner, round_cents, sanitize_budget};
use crate::config::{PlannerConfig, RefPolicy};
use crate::graph::{
    AgentSpec, BudgetModel, Contract, ContractIo, DEFAULT_DEFINITION_OF_DONE, Edge, GraphError,
    KeyResult, Kpi, Oag, Objective, Okr, OrgMeta, RoleLevel, SOFT_CAP_RATIO, TaskSpec, new_id,
};
use crate::prd::Prd;
use crate::reasoning::{
    ReasoningClient, ReasoningError, ReasoningRequest, RefKind, truncate_for_log,
};

const MAX_PROMPT_LOG_CHARS: usize = 4_000;
const MAX_OUTPUT_LOG_CHARS: usize = 8_000;

const SYSTEM_PROMPT: &str = "You are an organizational architect. Design a small company of \
role-playing AI agents that will deliver the product described by the user within the stated \
budget. Return ONLY one JSON object matching the provided schema.";

/// Role name -> agent id. A repeated role points at its latest agent.
#[derive(Debug, Default)]
struct RoleLookup {
    ids: HashMap<String, String>,
    lowercase: HashMap<String, String>,
    first: Option<String>,
}

impl RoleLookup {
    fn insert(&mut self, role: &str, id: &str) {
        let key = role.trim();
        self.ids.insert(key.to_owned(), id.to_owned());
        self.lowercase.insert(key.to_lowercase(), id.to_owned());
        if self.first.is_none() {
            self.first = Some(id.to_owned());
        }
    }

    /// Exact match first, then case-insensitive.
    fn resolve(&self, role: &str) -> Option<&str> {
        let key = role.trim();
        self.ids
            .get(key)
            .or_else(|| self.lowercase.get(&key.to_lowercase()))
            .map(String::as_str)
    }
}

/// Reasoning-backed planner with deterministic fallback.
pub struct ReasoningPlanner {
    client: Arc<dyn ReasoningClient>,
    model: String,
    temperature: f32,
    timeout: Duration,
    ref_policy: RefPolicy,
    fallback: DeterministicPlanner,
}

impl ReasoningPlanner {
    pub fn new(client: Arc<dyn ReasoningClient>, config: &PlannerConfig) -> Self {
        Self {
            client,
            model: config.model.clone(),
            temperature: config.temperature,
            timeout: config.request_timeout,
            ref_policy: config.ref_policy,
            fallback: DeterministicPlanner::new(),
        }
    }

    /// Plan through the reasoning service, falling back to the
    /// deterministic planner on any reasoning failure.
    pub async fn plan(
        &self,
        prd: &Prd,
        budget_usd: f64,
        cancel: Option<&CancellationToken>,
    ) -> Result<Oag, GraphError> {
        match self.try_design(prd, budget_usd, cancel).await {
            Ok(oag) => Ok(oag),
            Err(ReasoningError::Graph(e)) => Err(e),
            Err(e) => {
                warn!(
                    client = self.client.name(),
                    error = %e,
                    "reasoning planner failed, falling back to deterministic planner"
                );
                self.fallback.plan(prd, budget_usd)
            }
        }
    }

    /// Run the reasoning path without fallback.
    pub async fn try_design(
        &self,
        prd: &Prd,
        budget_usd: f64,
        cancel: Option<&CancellationToken>,
    ) -> Result<Oag, ReasoningError> {
        let request = self.build_request(prd, budget_usd);
        info!(
            client = self.client.name(),
            model = %request.model,
            objectives = prd.objectives.len(),
            "reasoning request prepared"
        );
        if tracing::enabled!(Level::DEBUG) {
            debug!(
                user_prompt = %truncate_for_log(&request.user, MAX_PROMPT_LOG_CHARS),
                "reasoning prompt"
            );
        }

        let output = self.call(&request, cancel).await?;
        if tracing::enabled!(Level::DEBUG) {
            debug!(
                output = %truncate_for_log(&output, MAX_OUTPUT_LOG_CHARS),
                "reasoning raw output"
            );
        }

        let design = parse_design_output(&output)?;
        self.build_from_design(prd, budget_usd, &design)
    }

    /// One bounded round trip. Timeout and cancellation are failures.
    async fn call(
        &self,
        request: &ReasoningRequest,
        cancel: Option<&CancellationToken>,
    ) -> Result<String, ReasoningError> {
        let bounded = tokio::time::timeout(self.timeout, self.client.complete(request));
        let outcome = match cancel {
            Some(token) => tokio::select! {
                _ = token.cancelled() => return Err(ReasoningError::Cancelled),
                r = bounded => r,
            },
            None => bounded.await,
        };
        outcome.map_err(|_| ReasoningError::Timeout(self.timeout))?
    }

    pub fn build_request(&self, prd: &Prd, budget_usd: f64) -> ReasoningRequest {
        ReasoningRequest {
            system: SYSTEM_PROMPT.to_owned(),
            user: build_user_prompt(prd, sanitize_budget(budget_usd)),
            schema_name: DESIGN_SCHEMA_NAME.to_owned(),
            schema: design_response_schema(),
            model: self.model.clone(),
            temperature: self.temperature,
        }
    }

    // -----------------------------------------------------------------------
    // Reconstruction
    // -----------------------------------------------------------------------

    /// Rebuild a graph from a parsed design.
    pub fn build_from_design(
        &self,
        prd: &Prd,
        budget_usd: f64,
        design: &OrgDesign,
    ) -> Result<Oag, ReasoningError> {
        let mut budget = BudgetModel::from_hard_cap(sanitize_budget(budget_usd), design.budget_policy);
        budget.forecast_cost_usd = round_cents(design.forecast_cost_usd);
        let mut oag = Oag::new(OrgMeta::new(prd.display_title(), prd.display_domain()), budget);

        let roles = self.add_agents(&mut oag, design)?;
        self.add_reporting_lines(&mut oag, design, &roles)?;
        self.add_tasks(&mut oag, &design.tasks, &roles)?;
        self.attach_okrs(&mut oag, design, &roles)?;

        info!(
            agents = oag.get_agents().len(),
            tasks = oag.get_tasks().len(),
            edges = oag.edges().len(),
            policy = %oag.budget.policy,
            "reasoning plan built"
        );
        Ok(oag)
    }

    fn unresolved(&self, kind: RefKind, name: &str) -> Result<(), ReasoningError> {
        match self.ref_policy {
            RefPolicy::Drop => {
                debug!(%kind, name, "dropping unresolved reference");
                Ok(())
            }
            RefPolicy::Error => Err(ReasoningError::UnresolvedReference {
                kind,
                name: name.to_owned(),
            }),
        }
    }

    fn add_agents(&self, oag: &mut Oag, design: &OrgDesign) -> Result<RoleLookup, ReasoningError> {
        let mut roles = RoleLookup::default();
        for spec in &design.agents {
            let role = spec.role.trim();
            let level = spec
                .level
                .as_deref()
                .and_then(|l| l.parse::<RoleLevel>().ok())
                .unwrap_or_else(|| RoleLevel::infer_from_role(role));
            let agent = AgentSpec::new(role, level);
            roles.insert(role, &agent.id);
            oag.add_node(agent)?;
        }
        Ok(roles)
    }

    fn add_reporting_lines(
        &self,
        oag: &mut Oag,
        design: &OrgDesign,
        roles: &RoleLookup,
    ) -> Result<(), ReasoningError> {
        let agent_ids: Vec<String> = oag.get_agents().iter().map(|a| a.id.clone()).collect();
        for (spec, report_id) in design.agents.iter().zip(agent_ids) {
            let Some(manager_role) = spec.reports_to.as_deref().map(str::trim).filter(|r| !r.is_empty())
            else {
                continue;
            };
            let Some(manager_id) = roles.resolve(manager_role) else {
                self.unresolved(RefKind::ReportsTo, manager_role)?;
                continue;
            };
            if manager_id == report_id {
                debug!(role = %spec.role, "ignoring self-reporting agent");
                continue;
            }
            oag.add_edge(Edge::new(manager_id, &report_id))?;
            if let Some(agent) = oag.agent_mut(&report_id) {
                agent.manager_id = Some(manager_id.to_owned());
            }
        }
        Ok(())
    }

    fn add_tasks(
        &self,
        oag: &mut Oag,
        tasks: &[DesignTask],
        roles: &RoleLookup,
    ) -> Result<(), ReasoningError> {
        // (title, description, id) of tasks created so far.
        let mut seen: Vec<(String, String, String)> = Vec::with_capacity(tasks.len());

        for spec in tasks {
            let assignee = match roles.resolve(&spec.assignee) {
                Some(id) => id.to_owned(),
                None => {
                    self.unresolved(RefKind::Assignee, &spec.assignee)?;
                    roles.first.clone().unwrap_or_else(new_id)
                }
            };
            let task = task_from_design(spec, assignee);
            let id = task.id.clone();
            oag.add_node(task)?;

            let mut linked = HashSet::new();
            for dep in &spec.depends_on {
                let dep = dep.trim();
                let prerequisite = seen
                    .iter()
                    .find(|(title, description, _)| title == dep || description == dep)
                    .map(|(_, _, id)| id.as_str());
                match prerequisite {
                    Some(from) if linked.insert(from.to_owned()) => {
                        oag.add_edge(Edge::new(from, &id))?;
                    }
                    Some(_) => {}
                    None => self.unresolved(RefKind::DependsOn, dep)?,
                }
            }
            seen.push((spec.title.trim().to_owned(), spec.description.trim().to_owned(), id));
        }
        Ok(())
    }

    fn attach_okrs(
        &self,
        oag: &mut Oag,
        design: &OrgDesign,
        roles: &RoleLookup,
    ) -> Result<(), ReasoningError> {
        let Some(bundles) = &design.okrs else {
            return Ok(());
        };
        for bundle in bundles {
            let Some(owner_id) = roles.resolve(&bundle.owner_role) else {
                self.unresolved(RefKind::OkrOwner, &bundle.owner_role)?;
                continue;
            };
            let Some(agent) = oag.agent_mut(owner_id) else {
                continue;
            };
            let objective = Objective {
                id: new_id(),
                title: bundle.objective.clone(),
                description: bundle.objective.clone(),
                owner_agent_id: owner_id.to_owned(),
            };
            let key_results = bundle
                .key_results
                .iter()
                .map(|kr| KeyResult {
                    id: new_id(),
                    objective_id: objective.id.clone(),
                    metric: kr.metric.clone(),
                    target: kr.target,
                    current: 0.0,
                })
                .collect();
            agent.okrs.push(Okr {
                objective,
                key_results,
            });
            agent.kpis.extend(
                bundle
                    .kpis
                    .iter()
                    .map(|k| Kpi::new(owner_id, k.metric.clone(), k.target)),
            );
        }
        Ok(())
    }
}

fn task_from_design(spec: &DesignTask, agent_id: String) -> TaskSpec {
    let title = spec.title.trim();
    let description = match spec.description.trim() {
        "" if title.is_empty() => "Task".to_owned(),
        "" => title.to_owned(),
        d => d.to_owned(),
    };
    let dod = spec
        .dod
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());
    let contract = Contract {
        inputs: vec![ContractIo::text("spec", title)],
        outputs: vec![ContractIo::text(
            "deliverable",
            dod.unwrap_or("Resulting artifact"),
        )],
        definition_of_done: dod.unwrap_or(DEFAULT_DEFINITION_OF_DONE).to_owned(),
    };
    TaskSpec::planned(description, agent_id, contract, "deliverable")
}

fn build_user_prompt(prd: &Prd, budget_usd: f64) -> String {
    let prd_json = serde_json::to_string_pretty(prd).unwrap_or_else(|_| format!("{prd:?}"));
    let mut user = String::with_capacity(prd_json.len() + 1024);
    user.push_str("PRD:\n");
    user.push_str(&prd_json);
    user.push_str("\n\n");
    user.push_str(&format!(
        "Budget: hard cap ${budget_usd:.2}, soft cap ${:.2}.\n\n",
        budget_usd * SOFT_CAP_RATIO
    ));
    user.push_str("Design rules:\n");
    user.push_str("1) Every agent has a unique role name; reports_to names another agent's role or is null.\n");
    user.push_str("2) Levels are C_SUITE, VP, DIRECTOR, MANAGER or IC.\n");
    user.push_str("3) Every task's assignee is an agent role.\n");
    user.push_str("4) depends_on lists titles of tasks that appear earlier in the list.\n");
    user.push_str("5) Pick budget_policy and forecast_cost_usd so the plan fits the hard cap.\n");
    user.push_str("6) Optionally give OKRs and KPIs per role in okrs; otherwise set okrs to null.\n");
    user
}
