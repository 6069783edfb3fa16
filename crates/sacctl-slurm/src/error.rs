//! Bridge error type.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Failed to execute {command}: {error}")]
    Launch { command: String, error: String },
    #[error("{command} failed: {message}")]
    Failed { command: String, message: String },
    #[error("{command} did not finish within {secs}s")]
    Timeout { command: String, secs: u64 },
    #[error("Failed to parse {command} output: {message}")]
    Parse { command: String, message: String },
    #[error("Invalid {kind} name: {name:?}")]
    InvalidName { kind: &'static str, name: String },
}
