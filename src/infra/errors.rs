// src/infra/errors.rs — Error types for pipefix

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipefixError {
    // Oracle errors (retried by the refinement step)
    #[error("Oracle '{oracle}' error: {message}")]
    Oracle { oracle: String, message: String },

    #[error("Could not extract an edit batch from the oracle reply: {0}")]
    Extract(String),

    // Sandbox errors
    #[error("Sandbox execution failed: {0}")]
    Sandbox(String),

    // Terminal artifact errors (fatal, never retried at this layer)
    #[error("Metrics file ({path}) is not generated")]
    MissingResultsArtifact { path: String },

    #[error("Submission format check output ({path}) is not generated")]
    MissingFormatCheck { path: String },

    #[error("Malformed scores table: {0}")]
    BadScores(String),

    // Caller bugs
    #[error("Invariant violated: {0}")]
    Invariant(String),

    #[error("Workspace lock poisoned")]
    WorkspaceLock,

    // Infra
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
