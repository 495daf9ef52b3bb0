//! Organizational agent graph planning.
//!
//! Turns a product requirements document and a budget into an
//! [`Oag`]: a hierarchy of role-playing agents, the tasks assigned to
//! them, task dependencies, a budget policy, a cost forecast and per-agent
//! OKRs/KPIs.

pub mod config;
pub mod graph;
pub mod planner;
pub mod prd;
pub mod reasoning;
pub mod staffing;

pub use config::{PlannerConfig, RefPolicy};
pub use graph::{GraphError, Oag, OagDocumentError};
pub use planner::{
    DeterministicPlanner, EnvMode, FixedMode, ModeSource, PlanContext, Planner, ReasoningPlanner,
};
pub use prd::{Prd, PrdObjective};
pub use reasoning::{ReasoningClient, ReasoningError, ReasoningRequest};
