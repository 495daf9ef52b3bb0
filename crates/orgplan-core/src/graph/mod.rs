//! Organizational agent graph (OAG) data model.

pub mod model;
pub mod oag;

pub use model::{
    AgentSpec, BudgetModel, BudgetPolicy, Contract, ContractIo, DEFAULT_DEFINITION_OF_DONE, Edge,
    EnumParseError, KeyResult, Kpi, Node, Objective, Okr, OrgMeta, RoleLevel, SOFT_CAP_RATIO,
    TaskSpec, TaskStatus, new_id,
};
pub use oag::{GraphError, Oag, OagDocumentError};
