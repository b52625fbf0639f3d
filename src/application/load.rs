use log::{info, warn};
use serde_json::{Map, Value};

use crate::application::schema::{load_schema, validate};
use crate::application::step::{DeclarativeStep, Next, PluginDocument};
use crate::application::{ApplicationDescriptor, Config};
use crate::cache::{WorkingDirectory, APPLICATION_FILE, CONFIG_FILE};
use crate::error::{EngineError, Result};
use crate::workflow::MAINFLOW;

/// Base config section seeding the workflow config
static JOBBERGATE_CONFIG: &str = "jobbergate_config";
/// Base config section carried through as static metadata
static APPLICATION_CONFIG: &str = "application_config";

/// Build an [`ApplicationDescriptor`] from plugin source and a base config document
///
/// Both inputs are copied to the scratch cache first so a failed load can be inspected. The
/// plugin source is checked against the bundled schema, it must declare the `mainflow` entry
/// point, and every fixed `next` must name a declared step.
pub fn load_application(
    source: &str,
    base_config: &str,
    cache: &WorkingDirectory,
) -> Result<ApplicationDescriptor> {
    cache.write_for_inspection(APPLICATION_FILE, source);
    cache.write_for_inspection(CONFIG_FILE, base_config);

    let (config, metadata) = parse_base_config(base_config)?;
    let document = parse_plugin(source)?;
    check_registry(&document)?;

    let mut descriptor = ApplicationDescriptor::new(config);
    descriptor.application_config = metadata;
    for (name, table) in document.steps {
        let key = name.clone();
        descriptor = descriptor.register(&key, DeclarativeStep { name, table });
    }

    info!("Loaded application with steps: {}", descriptor.step_names().join(", "));
    Ok(descriptor)
}

fn parse_plugin(source: &str) -> Result<PluginDocument> {
    info!("Parsing plugin source into untyped structure");
    let json: Value = serde_yml::from_str(source)
        .map_err(|err| EngineError::ModuleLoad(format!("plugin source is not valid YAML: {err}")))?;

    let schema = load_schema()?;
    validate(&schema, &json)?;

    info!("Deserialising valid plugin source into step tables");
    serde_json::from_value::<PluginDocument>(json)
        .map_err(|err| EngineError::ModuleLoad(format!("plugin source has an unexpected shape: {err}")))
}

fn parse_base_config(base_config: &str) -> Result<(Config, Value)> {
    let json: Value = serde_yml::from_str(base_config)
        .map_err(|err| EngineError::ModuleLoad(format!("base config is not valid YAML: {err}")))?;
    let Value::Object(mut sections) = json else {
        return Err(EngineError::ModuleLoad("base config must be a mapping".to_string()));
    };

    let config = match sections.remove(JOBBERGATE_CONFIG) {
        Some(Value::Object(map)) => Config::from(map),
        Some(Value::Null) | None => {
            return Err(EngineError::ModuleLoad(format!("base config has no '{JOBBERGATE_CONFIG}' section")))
        }
        Some(_) => return Err(EngineError::ModuleLoad(format!("'{JOBBERGATE_CONFIG}' must be a mapping"))),
    };

    let metadata = match sections.remove(APPLICATION_CONFIG) {
        Some(Value::Object(map)) => Value::Object(map),
        Some(Value::Null) | None => Value::Object(Map::new()),
        Some(_) => {
            warn!("Ignoring '{APPLICATION_CONFIG}', it is not a mapping");
            Value::Object(Map::new())
        }
    };

    Ok((config, metadata))
}

/// Fixed successors must exist; successors read from the config can only be checked at run time
fn check_registry(document: &PluginDocument) -> Result<()> {
    if !document.steps.contains_key(MAINFLOW) {
        return Err(EngineError::ModuleLoad(format!("plugin source declares no '{MAINFLOW}' step")));
    }
    for (name, table) in &document.steps {
        if let Some(Next::Step(next)) = &table.next {
            if !document.steps.contains_key(next) {
                return Err(EngineError::ModuleLoad(format!(
                    "step '{name}' continues with '{next}', which is not declared"
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;

    use super::*;

    static SOURCE: &str = r#"
steps:
  mainflow:
    questions:
      - type: list
        name: cluster
        message: Choose which cluster to build script for
        choices: [Nash, Beskow]
    next: wrapup
  wrapup:
    questions:
      - type: confirm
        name: submitnow
        message: Submit job now?
        default: false
"#;

    static BASE: &str = r#"
application_config:
  application_name: starccm
jobbergate_config:
  partition: centos
  template: job_template.sh
"#;

    #[test]
    fn loads_steps_and_base_config() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = WorkingDirectory::new(tmp.path());

        let app = load_application(SOURCE, BASE, &cache).unwrap();

        assert_eq!(app.step_names(), ["mainflow", "wrapup"]);
        assert_eq!(app.base_config.get("partition"), Some(&json!("centos")));
        assert_eq!(app.application_config["application_name"], "starccm");
        assert_eq!(fs::read_to_string(cache.file(APPLICATION_FILE)).unwrap(), SOURCE);
        assert_eq!(fs::read_to_string(cache.file(CONFIG_FILE)).unwrap(), BASE);
    }

    #[test]
    fn unknown_fixed_successor_fails_at_load() {
        let tmp = tempfile::tempdir().unwrap();
        let source = "steps:\n  mainflow:\n    next: shared\n";

        let err = load_application(source, BASE, &WorkingDirectory::new(tmp.path())).unwrap_err();

        assert!(matches!(err, EngineError::ModuleLoad(_)));
        assert!(err.to_string().contains("shared"), "{err}");
    }

    #[test]
    fn missing_entry_point_fails_at_load() {
        let tmp = tempfile::tempdir().unwrap();
        let source = "steps:\n  shared:\n    next: wrapup\n  wrapup: {}\n";

        let err = load_application(source, BASE, &WorkingDirectory::new(tmp.path())).unwrap_err();

        assert!(matches!(err, EngineError::ModuleLoad(ref reason) if reason.contains("mainflow")), "{err}");
    }

    #[test]
    fn malformed_inputs_are_module_load_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = WorkingDirectory::new(tmp.path());

        let cases = [
            ("steps: [unclosed", BASE),
            ("steps: {}", BASE),
            ("questions: []", BASE),
            (SOURCE, "application_config: {}"),
            (SOURCE, "jobbergate_config: [1, 2]"),
        ];
        for (source, base) in cases {
            assert!(
                matches!(load_application(source, base, &cache), Err(EngineError::ModuleLoad(_))),
                "expected load failure for {source:?} / {base:?}"
            );
        }
    }
}
