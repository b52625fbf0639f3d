use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// The plugin source or base config is malformed or incomplete
    #[error("Can't load application: {0}")]
    ModuleLoad(String),

    #[error("Unknown workflow step '{step}' (known steps: {})", .known.join(", "))]
    UnknownWorkflowStep { step: String, known: Vec<String> },

    /// A loaded step can't be applied to the config it was given
    #[error("Workflow step '{step}' failed: {reason}")]
    StepFailed { step: String, reason: String },

    /// A step was reached twice in one chain
    #[error("Workflow step '{step}' already ran in this chain: {}", .chain.join(" -> "))]
    WorkflowCycle { step: String, chain: Vec<String> },

    #[error("Invalid answer for '{field}' after {attempts} attempts: {reason}")]
    Validation { field: String, attempts: usize, reason: String },

    #[error("Can't use answers file {}: {reason}", .path.display())]
    SuppliedAnswerFile { path: PathBuf, reason: String },

    /// The user cancelled an interactive prompt
    #[error("Interrupted while answering '{field}'")]
    Interrupted { field: String },

    #[error("Can't render template '{template}': {reason}")]
    Render { template: String, reason: String },

    #[error("IO error at {}: {source}", .path.display())]
    Io { path: PathBuf, source: std::io::Error },
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EngineError::Io { path: path.into(), source }
    }

    /// Process exit status used by the CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            EngineError::Interrupted { .. } => 130,
            EngineError::SuppliedAnswerFile { .. } => 2,
            _ => 1,
        }
    }
}
