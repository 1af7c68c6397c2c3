//! invc-core - Core library for the Investigation Container
//!
//! This crate provides the investigation task orchestrator used by the `invc`
//! dashboard:
//!
//! - **tools**: Tool registry, external tool invocation with timeouts, and
//!   detached launching of auxiliary applications
//! - **orchestrator**: Background task scheduling with exactly-once outcome
//!   delivery to a single-threaded update surface
//! - **store**: Investigation history reconstructed from the result directory
//! - **dashboard**: Presentation-facing facade tying the above together

pub mod dashboard;
pub mod error;
pub mod orchestrator;
pub mod store;
pub mod tools;
pub mod types;

// Re-export commonly used types
pub use dashboard::Dashboard;
pub use error::{Error, Result};
pub use orchestrator::TaskOrchestrator;
pub use store::ResultStore;
pub use tools::{Capability, ToolRegistry, ToolSpec};
pub use types::{AnalysisTarget, InvestigationRecord, TargetKind, TaskId, TaskOutcome, TaskState};
