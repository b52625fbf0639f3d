use std::fs;
use std::path::Path;

use log::{info, warn};
use serde_json::{Map, Value};

use crate::error::{EngineError, Result};

/// Answers supplied up front, keyed by question name
///
/// A supplied answer wins over every other source at every step of the chain.
pub type SuppliedAnswers = Map<String, Value>;

/// Read a JSON answers file
///
/// The file must hold a single JSON object. Values are used verbatim, nothing is validated
/// against the questions that will eventually consume them.
pub fn read_supplied_answers(path: &Path) -> Result<SuppliedAnswers> {
    let json = parse_untyped_json(path)?;
    match json {
        Value::Object(answers) => {
            info!("Loaded {} supplied answers from {}", answers.len(), path.display());
            Ok(answers)
        }
        other => {
            warn!("Answers file {} is not a JSON object", path.display());
            Err(file_error(path, format!("expected a JSON object, found {}", json_type(&other))))
        }
    }
}

fn parse_untyped_json(path: &Path) -> Result<Value> {
    info!("Reading supplied answers at {}", path.display());
    let json_string = fs::read_to_string(path).map_err(|err| {
        warn!("Can't read answers file at path {}: {}", path.display(), err);
        file_error(path, err.to_string())
    })?;
    serde_json::from_str::<Value>(&json_string).map_err(|err| file_error(path, err.to_string()))
}

fn file_error(path: &Path, reason: String) -> EngineError {
    EngineError::SuppliedAnswerFile { path: path.to_path_buf(), reason }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
