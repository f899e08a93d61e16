//! Action execution engine for PagePilot.
//!
//! Turns one typed [`Action`] into concrete page-host effects, applying
//! pre-flight validation, multi-strategy locator resolution with ordered
//! fallback, and a bounded retry loop. The executor never propagates
//! errors to its caller: every attempt ends in exactly one
//! [`ExecutionResult`].

pub mod errors;
pub mod executor;
pub mod locator;
pub mod types;
pub mod validate;

pub use errors::ExecError;
pub use executor::{ActionExecutor, ExecutorConfig};
pub use locator::NormalizedSelector;
pub use types::{
    Action, ActionKind, ExecutionResult, ExtractField, ExtractValueType, LocatorGroup,
    ScrollDirection,
};
