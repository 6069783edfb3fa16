//! Slurm integration for sacctl.
//!
//! Queries association snapshots via sacctmgr, plans and applies the
//! sacctmgr calls for model changes, and wraps scontrol/scancel for the
//! job view. All durable state lives in the scheduler; this crate only
//! talks to its command-line tools.

pub mod command;
pub mod error;
pub mod plan;
pub mod sacctmgr;
pub mod scontrol;

pub use error::BridgeError;
pub use plan::{Entity, SacctmgrCall, Verb, apply_plan, plan_change, plan_changes};
pub use sacctmgr::query_snapshot;
pub use scontrol::{Job, JobState, cancel_job, query_jobs};
