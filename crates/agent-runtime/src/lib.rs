//! Agent loop and lifecycle runtime for PagePilot.
//!
//! Owns agent state machines (`created → planning → executing → paused ⇄
//! … → completed | failed | stopped`), drives the observe-decide-act
//! iteration against the planning oracle and the action executor, and
//! exposes read accessors for presentation and persistence collaborators.

pub mod config;
pub mod errors;
pub mod heuristics;
pub mod oracle;
pub mod runtime;
pub mod types;

pub use config::AgentConfig;
pub use errors::AgentError;
pub use oracle::{MockOracle, PlanningOracle, PlanningRequest, PlanningResponse};
pub use runtime::AgentRuntime;
pub use types::{AgentStatus, ContextSnapshot, Goal};
