//! Planners and the planning façade.
//!
//! - [`heuristic::DeterministicPlanner`]: offline, reproducible
//! - [`reasoning::ReasoningPlanner`]: delegates design to a
//!   [`ReasoningClient`], falling back to the deterministic planner
//! - [`Planner`]: single entry point choosing between them per call

pub mod design;
pub mod heuristic;
pub mod reasoning;

use std::env;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::PlannerConfig;
use crate::graph::{GraphError, Oag};
use crate::prd::Prd;
use crate::reasoning::ReasoningClient;

pub use heuristic::DeterministicPlanner;
pub use reasoning::ReasoningPlanner;

/// Environment variable holding the offline switch.
pub const MODE_ENV: &str = "ORGPLAN_MODE";

/// Whether a mode value selects offline planning (`offline` or `mock`,
/// case-insensitive).
pub fn is_offline_value(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "offline" | "mock")
}

/// Source of the process-wide offline default. Consulted once per
/// [`Planner::plan`] call.
pub trait ModeSource: Send + Sync {
    fn offline(&self) -> bool;
}

/// Reads [`MODE_ENV`] on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvMode;

impl ModeSource for EnvMode {
    fn offline(&self) -> bool {
        env::var(MODE_ENV).is_ok_and(|v| is_offline_value(&v))
    }
}

/// A fixed answer, for tests and embedding.
#[derive(Debug, Clone, Copy)]
pub struct FixedMode(pub bool);

impl ModeSource for FixedMode {
    fn offline(&self) -> bool {
        self.0
    }
}

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct PlanContext {
    /// Overrides the [`ModeSource`] when set.
    pub offline: Option<bool>,
    /// Cancels an in-flight reasoning call; planning then falls back.
    pub cancel: Option<CancellationToken>,
}

impl PlanContext {
    pub fn offline() -> Self {
        Self {
            offline: Some(true),
            cancel: None,
        }
    }
}

/// Planning entry point.
pub struct Planner {
    deterministic: DeterministicPlanner,
    reasoning: ReasoningPlanner,
    mode: Arc<dyn ModeSource>,
}

impl Planner {
    /// Planner over `client`, reading the offline switch from the
    /// environment.
    pub fn new(client: Arc<dyn ReasoningClient>, config: &PlannerConfig) -> Self {
        Self {
            deterministic: DeterministicPlanner::new(),
            reasoning: ReasoningPlanner::new(client, config),
            mode: Arc::new(EnvMode),
        }
    }

    /// Planner over the client described by `config`.
    pub fn from_config(config: &PlannerConfig) -> Self {
        Self::new(config.reasoning_client(), config)
    }

    pub fn with_mode_source(mut self, mode: Arc<dyn ModeSource>) -> Self {
        self.mode = mode;
        self
    }

    /// Plan an organization for `prd` within `budget_usd`.
    ///
    /// Offline mode uses only the deterministic planner. Otherwise the
    /// reasoning planner runs and any reasoning failure falls back to the
    /// deterministic planner. Only graph-integrity defects are returned as
    /// errors.
    pub async fn plan(&self, prd: &Prd, budget_usd: f64, ctx: &PlanContext) -> Result<Oag, GraphError> {
        let offline = ctx.offline.unwrap_or_else(|| self.mode.offline());
        if offline {
            info!("offline mode, using deterministic planner");
            return self.deterministic.plan(prd, budget_usd);
        }
        self.reasoning.plan(prd, budget_usd, ctx.cancel.as_ref()).await
    }
}
