//! Shared parsing utilities for sacctl.
//!
//! Handles the two string formats sacctmgr uses for resource limits:
//! TRES specs (`cpu=4,mem=128G,gres/gpu=2`) and wall-time durations
//! (`D-HH:MM:SS`).

pub mod tres;
pub mod walltime;

pub use tres::{parse_count, set_tres_value, tres_value};
pub use walltime::{format_walltime, parse_walltime};
