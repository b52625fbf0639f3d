use jsonschema::JSONSchema;
use log::{info, warn};
use serde_json::Value;

use crate::error::{EngineError, Result};

/// JSON schema every plugin source document must satisfy
static APPLICATION_SCHEMA: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/schema/application.json"));

pub fn load_schema() -> Result<JSONSchema> {
    let schema_json: Value = serde_json::from_str(APPLICATION_SCHEMA)
        .map_err(|err| EngineError::ModuleLoad(format!("bundled schema is not JSON: {err}")))?;
    compile_schema(&schema_json)
}

fn compile_schema(schema: &Value) -> Result<JSONSchema> {
    JSONSchema::options()
        .compile(schema)
        .map_err(|err| EngineError::ModuleLoad(format!("bundled schema is invalid: {err}")))
}

/// Validate an untyped plugin document, collecting every violation into one message
pub fn validate(schema: &JSONSchema, document: &Value) -> Result<()> {
    info!("Validating plugin source against application schema");
    if let Err(errors) = schema.validate(document) {
        let reasons: Vec<String> = errors
            .map(|err| {
                let path = err.instance_path.to_string();
                if path.is_empty() {
                    err.to_string()
                } else {
                    format!("{path}: {err}")
                }
            })
            .collect();
        warn!("Plugin source fails validation");
        return Err(EngineError::ModuleLoad(reasons.join("; ")));
    }
    Ok(())
}
