//! Node, edge, budget and metric types of the organizational agent graph.
//!
//! Every type here maps directly onto the serialized OAG document consumed
//! by the execution runtime. Enums serialize as SCREAMING_SNAKE_CASE
//! strings (`C_SUITE`, `PLANNED`, `BALANCED`).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ratio of the soft cap to the hard cap.
pub const SOFT_CAP_RATIO: f64 = 0.8;

/// Definition of done used when nothing more specific is known.
pub const DEFAULT_DEFINITION_OF_DONE: &str = "Meets acceptance criteria";

/// Generate a fresh node/edge/metric id.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Seniority level of an agent.
///
/// Variants are declared from most junior to most senior, so the derived
/// `Ord` gives `Ic < Manager < Director < Vp < CSuite`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleLevel {
    Ic,
    Manager,
    Director,
    Vp,
    CSuite,
}

impl RoleLevel {
    /// All levels, most senior first.
    pub const ALL: [RoleLevel; 5] = [
        RoleLevel::CSuite,
        RoleLevel::Vp,
        RoleLevel::Director,
        RoleLevel::Manager,
        RoleLevel::Ic,
    ];

    /// Guess a level from a free-form role name.
    ///
    /// `ceo`/`cto`/`cfo`/`chief` anywhere in the name map to C-suite, a `vp`
    /// prefix to VP, then `director`, then `manager`; everything else is an
    /// individual contributor. Matching is by substring, so "Director"
    /// (which contains "cto") lands in the C-suite.
    pub fn infer_from_role(role: &str) -> Self {
        let r = role.trim().to_lowercase();
        if ["ceo", "cto", "cfo", "chief"].iter().any(|k| r.contains(k)) {
            Self::CSuite
        } else if r.starts_with("vp") {
            Self::Vp
        } else if r.contains("director") {
            Self::Director
        } else if r.contains("manager") {
            Self::Manager
        } else {
            Self::Ic
        }
    }
}

impl fmt::Display for RoleLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CSuite => "C_SUITE",
            Self::Vp => "VP",
            Self::Director => "DIRECTOR",
            Self::Manager => "MANAGER",
            Self::Ic => "IC",
        };
        f.write_str(s)
    }
}

impl FromStr for RoleLevel {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "C_SUITE" | "CSUITE" => Ok(Self::CSuite),
            "VP" => Ok(Self::Vp),
            "DIRECTOR" => Ok(Self::Director),
            "MANAGER" => Ok(Self::Manager),
            "IC" => Ok(Self::Ic),
            _ => Err(EnumParseError::new("role level", s)),
        }
    }
}

// ---------------------------------------------------------------------------

/// Spending posture of the organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BudgetPolicy {
    Conservative,
    Balanced,
    Aggressive,
}

impl fmt::Display for BudgetPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Conservative => "CONSERVATIVE",
            Self::Balanced => "BALANCED",
            Self::Aggressive => "AGGRESSIVE",
        };
        f.write_str(s)
    }
}

impl FromStr for BudgetPolicy {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CONSERVATIVE" => Ok(Self::Conservative),
            "BALANCED" => Ok(Self::Balanced),
            "AGGRESSIVE" => Ok(Self::Aggressive),
            _ => Err(EnumParseError::new("budget policy", s)),
        }
    }
}

// ---------------------------------------------------------------------------

/// Lifecycle status of a task. The planner only ever produces `Planned`;
/// the other states belong to the execution runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Planned,
    InProgress,
    Blocked,
    Done,
    Failed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Planned => "PLANNED",
            Self::InProgress => "IN_PROGRESS",
            Self::Blocked => "BLOCKED",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

impl FromStr for TaskStatus {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PLANNED" => Ok(Self::Planned),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "BLOCKED" => Ok(Self::Blocked),
            "DONE" => Ok(Self::Done),
            "FAILED" => Ok(Self::Failed),
            _ => Err(EnumParseError::new("task status", s)),
        }
    }
}

/// Error returned when parsing one of the graph enums from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumParseError {
    pub kind: &'static str,
    pub value: String,
}

impl EnumParseError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

impl fmt::Display for EnumParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {:?}", self.kind, self.value)
    }
}

impl std::error::Error for EnumParseError {}

// ---------------------------------------------------------------------------
// Meta and budget
// ---------------------------------------------------------------------------

/// Project-level metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrgMeta {
    pub project_id: String,
    pub title: String,
    pub domain: String,
    pub created_at: DateTime<Utc>,
}

impl OrgMeta {
    /// New metadata with a fresh project id, stamped now.
    pub fn new(title: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            project_id: new_id(),
            title: title.into(),
            domain: domain.into(),
            created_at: Utc::now(),
        }
    }
}

/// Budget caps, spending policy and the planner's cost forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetModel {
    pub soft_cap_usd: f64,
    pub hard_cap_usd: f64,
    pub policy: BudgetPolicy,
    /// Recomputed once the graph is complete; zero until then.
    pub forecast_cost_usd: f64,
}

impl BudgetModel {
    /// Build a budget from the hard cap. The soft cap is always
    /// [`SOFT_CAP_RATIO`] of the hard cap. Non-finite or negative caps are
    /// clamped to zero.
    pub fn from_hard_cap(hard_cap_usd: f64, policy: BudgetPolicy) -> Self {
        let hard = if hard_cap_usd.is_finite() && hard_cap_usd > 0.0 {
            hard_cap_usd
        } else {
            0.0
        };
        Self {
            soft_cap_usd: hard * SOFT_CAP_RATIO,
            hard_cap_usd: hard,
            policy,
            forecast_cost_usd: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Objectives and metrics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub id: String,
    pub title: String,
    pub description: String,
    pub owner_agent_id: String,
}

/// A measurable result attached to an [`Objective`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyResult {
    pub id: String,
    pub objective_id: String,
    pub metric: String,
    pub target: f64,
    /// Progress counter; always zero at planning time.
    pub current: f64,
}

/// An objective bundled with its key results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Okr {
    pub objective: Objective,
    pub key_results: Vec<KeyResult>,
}

impl Okr {
    /// Build an OKR for `owner_agent_id` with one key result per
    /// `(metric, target)` pair.
    pub fn new<I, S>(owner_agent_id: &str, title: &str, description: &str, key_results: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let objective = Objective {
            id: new_id(),
            title: title.to_owned(),
            description: description.to_owned(),
            owner_agent_id: owner_agent_id.to_owned(),
        };
        let key_results = key_results
            .into_iter()
            .map(|(metric, target)| KeyResult {
                id: new_id(),
                objective_id: objective.id.clone(),
                metric: metric.into(),
                target,
                current: 0.0,
            })
            .collect();
        Self {
            objective,
            key_results,
        }
    }
}

/// Agent-scoped metric, not tied to an objective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kpi {
    pub id: String,
    pub metric: String,
    pub target: f64,
    pub current: f64,
    pub owner_agent_id: String,
}

impl Kpi {
    pub fn new(owner_agent_id: &str, metric: impl Into<String>, target: f64) -> Self {
        Self {
            id: new_id(),
            metric: metric.into(),
            target,
            current: 0.0,
            owner_agent_id: owner_agent_id.to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

/// A role-playing agent in the organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSpec {
    pub id: String,
    pub role: String,
    pub level: RoleLevel,
    /// Direct manager; `None` for roots of the reporting forest.
    #[serde(default)]
    pub manager_id: Option<String>,
    #[serde(default)]
    pub okrs: Vec<Okr>,
    #[serde(default)]
    pub kpis: Vec<Kpi>,
}

impl AgentSpec {
    /// New unmanaged agent with a fresh id.
    pub fn new(role: impl Into<String>, level: RoleLevel) -> Self {
        Self {
            id: new_id(),
            role: role.into(),
            level,
            manager_id: None,
            okrs: Vec::new(),
            kpis: Vec::new(),
        }
    }

    pub fn reporting_to(mut self, manager_id: Option<&str>) -> Self {
        self.manager_id = manager_id.map(str::to_owned);
        self
    }
}

/// A named, typed input or output of a [`Contract`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractIo {
    pub name: String,
    pub dtype: String,
    #[serde(default)]
    pub description: String,
}

impl ContractIo {
    pub fn text(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dtype: "text".to_owned(),
            description: description.into(),
        }
    }
}

/// Inputs, outputs and definition of done of a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub inputs: Vec<ContractIo>,
    pub outputs: Vec<ContractIo>,
    pub definition_of_done: String,
}

/// A unit of deliverable work assigned to one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub id: String,
    pub description: String,
    pub agent_id: String,
    pub contract: Contract,
    pub expected_output: String,
    #[serde(default)]
    pub status: TaskStatus,
    /// Estimated cost. Owned by the execution runtime after planning.
    #[serde(default)]
    pub est_cost_usd: f64,
}

impl TaskSpec {
    /// New `Planned` task with a fresh id and zero cost estimate.
    pub fn planned(
        description: impl Into<String>,
        agent_id: impl Into<String>,
        contract: Contract,
        expected_output: impl Into<String>,
    ) -> Self {
        Self {
            id: new_id(),
            description: description.into(),
            agent_id: agent_id.into(),
            contract,
            expected_output: expected_output.into(),
            status: TaskStatus::Planned,
            est_cost_usd: 0.0,
        }
    }
}

/// A node of the graph: either an agent or a task. Ids are unique across
/// both kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Agent(AgentSpec),
    Task(TaskSpec),
}

impl Node {
    pub fn id(&self) -> &str {
        match self {
            Self::Agent(a) => &a.id,
            Self::Task(t) => &t.id,
        }
    }

    pub fn as_agent(&self) -> Option<&AgentSpec> {
        match self {
            Self::Agent(a) => Some(a),
            Self::Task(_) => None,
        }
    }

    pub fn as_task(&self) -> Option<&TaskSpec> {
        match self {
            Self::Task(t) => Some(t),
            Self::Agent(_) => None,
        }
    }
}

impl From<AgentSpec> for Node {
    fn from(a: AgentSpec) -> Self {
        Self::Agent(a)
    }
}

impl From<TaskSpec> for Node {
    fn from(t: TaskSpec) -> Self {
        Self::Task(t)
    }
}

/// Directed edge. Agent-to-agent edges are reporting lines (manager to
/// report); task-to-task edges are dependencies (prerequisite to
/// dependent).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub from_id: String,
    pub to_id: String,
}

impl Edge {
    pub fn new(from_id: impl Into<String>, to_id: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            from_id: from_id.into(),
            to_id: to_id.into(),
        }
    }
}
