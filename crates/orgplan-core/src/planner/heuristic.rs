//! Deterministic, network-free planner.
//!
//! Builds a complete graph from the PRD and budget alone:
//!
//! 1. budget policy from budget and objective count
//! 2. a fixed board: CEO with CTO and CFO reporting to it
//! 3. a functional ladder (VP, Director, Manager, IC) sized by the staffing
//!    estimator, each level wired round-robin under the level above; the
//!    VPs are left unparented, so the result has two reporting roots
//! 4. one task per objective, assigned round-robin across the ICs starting
//!    with the second one
//! 5. a linear dependency chain through the tasks in creation order
//! 6. a forecast of agent count times [`PER_AGENT_RATE_USD`]
//! 7. one OKR and one KPI per agent that owns tasks

use tracing::{debug, info};

use crate::graph::{
    AgentSpec, BudgetModel, BudgetPolicy, Contract, ContractIo, DEFAULT_DEFINITION_OF_DONE, Edge,
    GraphError, Kpi, Oag, Okr, OrgMeta, RoleLevel, TaskSpec,
};
use crate::prd::{Prd, PrdObjective};
use crate::staffing::{self, ScopeSize};

/// Fixed cost attributed to every agent in the forecast.
pub const PER_AGENT_RATE_USD: f64 = 10.0;

/// Objective synthesized when the PRD has none.
pub const FALLBACK_OBJECTIVE_TITLE: &str = "Deliver MVP";
const FALLBACK_OBJECTIVE_DESCRIPTION: &str = "Ship core features";

const VP_ROLES: [&str; 3] = ["VP Engineering", "VP Product", "VP Marketing"];

/// Policy thresholds: below `CONSERVATIVE_BUDGET_USD` or more than
/// `CONSERVATIVE_OBJECTIVES` objectives is conservative; above
/// `AGGRESSIVE_BUDGET_USD` with at most `AGGRESSIVE_OBJECTIVES` is aggressive.
const CONSERVATIVE_BUDGET_USD: f64 = 20.0;
const CONSERVATIVE_OBJECTIVES: usize = 5;
const AGGRESSIVE_BUDGET_USD: f64 = 100.0;
const AGGRESSIVE_OBJECTIVES: usize = 3;

/// Pick a spending posture from the budget and the number of objectives.
pub fn determine_budget_policy(budget_usd: f64, objective_count: usize) -> BudgetPolicy {
    if budget_usd < CONSERVATIVE_BUDGET_USD || objective_count > CONSERVATIVE_OBJECTIVES {
        BudgetPolicy::Conservative
    } else if budget_usd > AGGRESSIVE_BUDGET_USD && objective_count <= AGGRESSIVE_OBJECTIVES {
        BudgetPolicy::Aggressive
    } else {
        BudgetPolicy::Balanced
    }
}

/// Agent count times [`PER_AGENT_RATE_USD`], rounded to cents.
pub fn forecast_cost(oag: &Oag) -> f64 {
    round_cents(oag.get_agents().len() as f64 * PER_AGENT_RATE_USD)
}

pub(crate) fn round_cents(usd: f64) -> f64 {
    (usd * 100.0).round() / 100.0
}

/// Non-finite and negative budgets plan as zero.
pub(crate) fn sanitize_budget(budget_usd: f64) -> f64 {
    if budget_usd.is_finite() && budget_usd > 0.0 {
        budget_usd
    } else {
        0.0
    }
}

/// Planner that never leaves the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeterministicPlanner;

impl DeterministicPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Build a graph. Only an internal integrity defect can fail.
    pub fn plan(&self, prd: &Prd, budget_usd: f64) -> Result<Oag, GraphError> {
        let budget = sanitize_budget(budget_usd);
        let objective_count = prd.objectives.len();
        let policy = determine_budget_policy(budget, objective_count);
        let mut oag = Oag::new(
            OrgMeta::new(prd.display_title(), prd.display_domain()),
            BudgetModel::from_hard_cap(budget, policy),
        );

        add_board(&mut oag)?;

        let scope = ScopeSize::from_objective_count(objective_count);
        let staffing = staffing::estimate(scope, budget, prd.display_domain());
        debug!(?scope, ?staffing, "staffing estimated");

        let vp_count = staffing.vp.min(VP_ROLES.len());
        let vps = add_level(&mut oag, RoleLevel::Vp, vp_count, &[], |i| VP_ROLES[i].to_owned())?;
        let directors = add_level(&mut oag, RoleLevel::Director, staffing.director, &vps, |i| {
            format!("Director {}", i + 1)
        })?;
        let managers = add_level(&mut oag, RoleLevel::Manager, staffing.manager, &directors, |i| {
            format!("Engineering Manager {}", i + 1)
        })?;
        let ics = add_level(&mut oag, RoleLevel::Ic, staffing.ic, &managers, |i| {
            format!("IC {}", i + 1)
        })?;

        add_tasks(&mut oag, prd, &ics)?;

        oag.budget.forecast_cost_usd = forecast_cost(&oag);
        attach_task_okrs(&mut oag);

        info!(
            agents = oag.get_agents().len(),
            tasks = oag.get_tasks().len(),
            edges = oag.edges().len(),
            policy = %policy,
            forecast_usd = oag.budget.forecast_cost_usd,
            "deterministic plan built"
        );
        Ok(oag)
    }
}

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

fn add_board(oag: &mut Oag) -> Result<(), GraphError> {
    let ceo = AgentSpec::new("CEO", RoleLevel::CSuite);
    let ceo_id = ceo.id.clone();
    oag.add_node(ceo)?;
    for role in ["CTO", "CFO"] {
        let officer = AgentSpec::new(role, RoleLevel::CSuite).reporting_to(Some(&ceo_id));
        let officer_id = officer.id.clone();
        oag.add_node(officer)?;
        oag.add_edge(Edge::new(&ceo_id, officer_id))?;
    }
    Ok(())
}

/// Add `count` agents at `level`, member `i` reporting to
/// `parents[i % parents.len()]`. Returns the new ids in order.
fn add_level<F>(
    oag: &mut Oag,
    level: RoleLevel,
    count: usize,
    parents: &[String],
    role_name: F,
) -> Result<Vec<String>, GraphError>
where
    F: Fn(usize) -> String,
{
    let mut ids = Vec::with_capacity(count);
    for i in 0..count {
        let manager = (!parents.is_empty()).then(|| parents[i % parents.len()].as_str());
        let agent = AgentSpec::new(role_name(i), level).reporting_to(manager);
        let id = agent.id.clone();
        oag.add_node(agent)?;
        if let Some(manager) = manager {
            oag.add_edge(Edge::new(manager, &id))?;
        }
        ids.push(id);
    }
    Ok(ids)
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

fn add_tasks(oag: &mut Oag, prd: &Prd, ics: &[String]) -> Result<(), GraphError> {
    let fallback = [PrdObjective::new(
        FALLBACK_OBJECTIVE_TITLE,
        FALLBACK_OBJECTIVE_DESCRIPTION,
    )];
    let objectives: &[PrdObjective] = if prd.objectives.is_empty() {
        &fallback
    } else {
        &prd.objectives
    };

    // Without ICs, any agent will do; the last one added is the most junior.
    let pool: Vec<String> = if ics.is_empty() {
        oag.get_agents()
            .last()
            .map(|a| vec![a.id.clone()])
            .unwrap_or_default()
    } else {
        ics.to_vec()
    };

    let mut previous: Option<String> = None;
    for (i, objective) in objectives.iter().enumerate() {
        let assignee = match pool.get((i + 1) % pool.len().max(1)) {
            Some(id) => id.clone(),
            None => crate::graph::new_id(),
        };
        let task = task_from_objective(objective, i, assignee);
        let id = task.id.clone();
        oag.add_node(task)?;
        if let Some(prev) = previous.take() {
            oag.add_edge(Edge::new(prev, &id))?;
        }
        previous = Some(id);
    }
    Ok(())
}

fn task_from_objective(objective: &PrdObjective, index: usize, agent_id: String) -> TaskSpec {
    let title = objective.title.trim();
    let description = match objective.description.trim() {
        "" if title.is_empty() => format!("Objective {}", index + 1),
        "" => title.to_owned(),
        d => d.to_owned(),
    };
    let definition_of_done = objective
        .definition_of_done
        .clone()
        .unwrap_or_else(|| DEFAULT_DEFINITION_OF_DONE.to_owned());
    let contract = Contract {
        inputs: vec![ContractIo::text(input_name(title), title)],
        outputs: vec![ContractIo::text("deliverable", "Resulting artifact")],
        definition_of_done,
    };
    TaskSpec::planned(description, agent_id, contract, "deliverable")
}

/// Snake-case identifier derived from an objective title; `spec` when the
/// title has no alphanumerics.
fn input_name(title: &str) -> String {
    let mut name = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_alphanumeric() {
            name.extend(c.to_lowercase());
        } else if !name.is_empty() && !name.ends_with('_') {
            name.push('_');
        }
    }
    let trimmed = name.trim_end_matches('_');
    if trimmed.is_empty() {
        "spec".to_owned()
    } else {
        trimmed.to_owned()
    }
}

// ---------------------------------------------------------------------------
// OKRs
// ---------------------------------------------------------------------------

/// Give every agent that owns tasks an objective with a `tasks_done` key
/// result and a `throughput` KPI, both targeting its task count.
fn attach_task_okrs(oag: &mut Oag) {
    let owners: Vec<(String, usize)> = oag
        .get_agents()
        .iter()
        .map(|a| (a.id.clone(), oag.tasks_for(&a.id).len()))
        .filter(|(_, n)| *n > 0)
        .collect();

    for (agent_id, n) in owners {
        let Some(agent) = oag.agent_mut(&agent_id) else {
            continue;
        };
        let target = n as f64;
        agent.okrs.push(Okr::new(
            &agent_id,
            &format!("Deliver assigned tasks ({n})"),
            "Complete planned work on time and within budget",
            [("tasks_done", target)],
        ));
        agent.kpis.push(Kpi::new(&agent_id, "throughput", target));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::TaskStatus;

    fn prd_with(n: usize) -> Prd {
        Prd {
            title: "Test".into(),
            domain: "general".into(),
            objectives: (0..n)
                .map(|i| PrdObjective::new(format!("Objective {i}"), format!("Do thing {i}")))
                .collect(),
            success_criteria: Vec::new(),
        }
    }

    #[test]
    fn policy_thresholds() {
        assert_eq!(determine_budget_policy(10.0, 0), BudgetPolicy::Conservative);
        assert_eq!(determine_budget_policy(150.0, 2), BudgetPolicy::Aggressive);
        assert_eq!(determine_budget_policy(50.0, 4), BudgetPolicy::Balanced);
        assert_eq!(determine_budget_policy(1000.0, 6), BudgetPolicy::Conservative);
        assert_eq!(determine_budget_policy(100.0, 1), BudgetPolicy::Balanced);
        assert_eq!(determine_budget_policy(20.0, 0), BudgetPolicy::Balanced);
    }

    #[test]
    fn input_name_slugs_titles() {
        assert_eq!(input_name("User Onboarding Flow"), "user_onboarding_flow");
        assert_eq!(input_name("  API: v2 -- auth!  "), "api_v2_auth");
        assert_eq!(input_name("***"), "spec");
        assert_eq!(input_name(""), "spec");
    }

    #[test]
    fn board_is_ceo_with_two_reports() {
        let oag = DeterministicPlanner.plan(&prd_with(1), 50.0).unwrap();
        let board = oag.agents_by_level(RoleLevel::CSuite);
        let roles: Vec<_> = board.iter().map(|a| a.role.as_str()).collect();
        assert_eq!(roles, ["CEO", "CTO", "CFO"]);
        assert!(board[0].manager_id.is_none());
        assert_eq!(board[1].manager_id.as_deref(), Some(board[0].id.as_str()));
        assert_eq!(board[2].manager_id.as_deref(), Some(board[0].id.as_str()));
    }

    #[test]
    fn ladder_has_two_roots_and_consistent_manager_ids() {
        let oag = DeterministicPlanner.plan(&prd_with(4), 500.0).unwrap();
        let roots: Vec<_> = oag.roots().iter().map(|a| a.level).collect();
        assert!(roots.contains(&RoleLevel::CSuite));
        assert!(roots.iter().all(|l| matches!(l, RoleLevel::CSuite | RoleLevel::Vp)));
        assert!(oag.agents_by_level(RoleLevel::Vp).iter().all(|a| a.manager_id.is_none()));

        for edge in oag.reporting_edges() {
            let report = oag.agent(&edge.to_id).unwrap();
            assert_eq!(report.manager_id.as_deref(), Some(edge.from_id.as_str()));
            let manager = oag.agent(&edge.from_id).unwrap();
            assert!(manager.level >= report.level);
        }
        let with_manager = oag.get_agents().iter().filter(|a| a.manager_id.is_some()).count();
        assert_eq!(with_manager, oag.reporting_edges().len());
    }

    #[test]
    fn empty_prd_gets_one_mvp_task() {
        let oag = DeterministicPlanner.plan(&Prd::default(), 10.0).unwrap();
        assert_eq!(oag.budget.policy, BudgetPolicy::Conservative);
        let tasks = oag.get_tasks();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].description, "Ship core features");
        assert_eq!(tasks[0].contract.inputs[0].description, FALLBACK_OBJECTIVE_TITLE);
        assert_eq!(tasks[0].contract.inputs[0].name, "deliver_mvp");
        assert_eq!(tasks[0].status, TaskStatus::Planned);
        assert_eq!(oag.meta.title, "Project");
        assert_eq!(oag.meta.domain, "general");
    }

    #[test]
    fn tasks_round_robin_over_ics_and_chain_linearly() {
        let oag = DeterministicPlanner.plan(&prd_with(5), 50.0).unwrap();
        let ics = oag.agents_by_level(RoleLevel::Ic);
        let tasks = oag.get_tasks();
        assert_eq!(tasks.len(), 5);
        for (i, task) in tasks.iter().enumerate() {
            assert_eq!(task.agent_id, ics[(i + 1) % ics.len()].id);
        }
        let deps = oag.dependency_edges();
        assert_eq!(deps.len(), 4);
        for (i, edge) in deps.iter().enumerate() {
            assert_eq!(edge.from_id, tasks[i].id);
            assert_eq!(edge.to_id, tasks[i + 1].id);
        }
    }

    #[test]
    fn first_task_goes_to_second_ic() {
        let oag = DeterministicPlanner.plan(&prd_with(1), 60.0).unwrap();
        let ics = oag.agents_by_level(RoleLevel::Ic);
        assert!(ics.len() > 1);
        let owner = oag.agent(&oag.get_tasks()[0].agent_id).unwrap();
        assert_eq!(owner.role, "IC 2");
        assert_eq!(ics[0].okrs.len(), 0);
    }

    #[test]
    fn objective_definition_of_done_is_used() {
        let mut prd = prd_with(2);
        prd.objectives[1].definition_of_done = Some("Load test passes".into());
        let oag = DeterministicPlanner.plan(&prd, 50.0).unwrap();
        let tasks = oag.get_tasks();
        assert_eq!(tasks[0].contract.definition_of_done, DEFAULT_DEFINITION_OF_DONE);
        assert_eq!(tasks[1].contract.definition_of_done, "Load test passes");
        assert_eq!(tasks[0].contract.outputs[0].name, "deliverable");
        assert_eq!(tasks[0].expected_output, "deliverable");
    }

    #[test]
    fn forecast_is_agent_count_times_rate() {
        let oag = DeterministicPlanner.plan(&prd_with(7), 2000.0).unwrap();
        let expected = oag.get_agents().len() as f64 * PER_AGENT_RATE_USD;
        assert_eq!(oag.budget.forecast_cost_usd, expected);
    }

    #[test]
    fn okrs_go_to_task_owners_only() {
        let oag = DeterministicPlanner.plan(&prd_with(3), 50.0).unwrap();
        for agent in oag.get_agents() {
            let owned = oag.tasks_for(&agent.id).len();
            if owned == 0 {
                assert!(agent.okrs.is_empty() && agent.kpis.is_empty());
                continue;
            }
            assert_eq!(agent.okrs.len(), 1);
            let okr = &agent.okrs[0];
            assert_eq!(okr.objective.title, format!("Deliver assigned tasks ({owned})"));
            assert_eq!(okr.objective.owner_agent_id, agent.id);
            assert_eq!(okr.key_results[0].metric, "tasks_done");
            assert_eq!(okr.key_results[0].target, owned as f64);
            assert_eq!(agent.kpis[0].metric, "throughput");
            assert_eq!(agent.kpis[0].target, owned as f64);
        }
    }

    #[test]
    fn garbage_budget_plans_as_zero() {
        let oag = DeterministicPlanner.plan(&prd_with(1), f64::NAN).unwrap();
        assert_eq!(oag.budget.hard_cap_usd, 0.0);
        assert_eq!(oag.budget.policy, BudgetPolicy::Conservative);
        let oag = DeterministicPlanner.plan(&prd_with(1), -50.0).unwrap();
        assert_eq!(oag.budget.policy, BudgetPolicy::Conservative);
    }

    #[test]
    fn vp_count_never_exceeds_named_roles() {
        let oag = DeterministicPlanner.plan(&prd_with(20), 10_000.0).unwrap();
        assert!(oag.agents_by_level(RoleLevel::Vp).len() <= VP_ROLES.len());
    }
}
