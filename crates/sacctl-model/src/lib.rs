//! The association model for sacctl.
//!
//! Holds a snapshot of the cluster's account/user hierarchy and resource
//! limits, validates administrator edits before anything is sent to
//! sacctmgr, and diffs the edited state against the queried baseline to
//! produce the minimal set of changes to reconcile.
//!
//! This crate never touches the scheduler; it only prepares validated
//! intent for the bridge layer.

pub mod diff;
pub mod model;
pub mod types;

pub use diff::Change;
pub use model::{AssociationModel, EntityKind, ModelError};
pub use types::{Account, Bottleneck, Resource, Snapshot, TresLimits, User};
