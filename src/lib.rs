//! Build HPC job scripts from application plugins
//!
//! An application plugin declares a chain of named workflow steps. Each step asks a set of
//! questions, the answers accumulate in a [`Config`], and the final config is rendered into a job
//! script with the plugin's templates.

/// Errors raised while loading, running, and rendering an application
pub mod error;
/// Scratch cache for plugin sources and parameter documents
pub mod cache;
/// Pre-filled answers read from a JSON file
pub mod answers;
/// Typed questions and boolean branch flattening
pub mod question;
/// Load application plugins into a step registry
pub mod application;
/// Run the step chain and resolve answers
pub mod workflow;
/// Assemble and render the parameter document
pub mod params;

pub use answers::SuppliedAnswers;
pub use application::{ApplicationDescriptor, Config, StepOutput, WorkflowStep};
pub use cache::WorkingDirectory;
pub use error::{EngineError, Result};
pub use question::{Choice, Question, QuestionKind};
pub use workflow::resolve::{Answer, AnswerSource};
