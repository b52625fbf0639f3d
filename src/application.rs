//! Application plugins: a base config plus a registry of named workflow steps

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::question::Question;

/// Turn plugin source and base config text into an [`ApplicationDescriptor`]
pub mod load;
/// Bundled JSON schema for plugin source documents
pub mod schema;
/// Declarative step tables read from plugin source
pub mod step;

/// Reserved config key naming the step to run next
pub static NEXT_WORKFLOW: &str = "nextworkflow";

/// Key/value changes a step applies to the config
pub type Patch = Map<String, Value>;

/// Ordered configuration accumulated across workflow steps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Config(Map<String, Value>);

impl Config {
    pub fn new() -> Config {
        Config(Map::new())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    /// Overwrite existing keys and append new ones; nothing is ever removed
    pub fn merge(&mut self, patch: Patch) {
        for (key, value) in patch {
            self.0.insert(key, value);
        }
    }

    pub fn set_next(&mut self, step: &str) {
        self.insert(NEXT_WORKFLOW, step);
    }

    /// Remove and return the control key
    pub fn take_next(&mut self) -> Option<Value> {
        self.0.shift_remove(NEXT_WORKFLOW)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Config {
    fn from(map: Map<String, Value>) -> Self {
        Config(map)
    }
}

/// What a step hands back to the executor: questions to resolve and a patch applied first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepOutput {
    pub questions: Vec<Question>,
    pub patch: Patch,
}

impl StepOutput {
    pub fn questions(questions: Vec<Question>) -> StepOutput {
        StepOutput { questions, patch: Patch::new() }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> StepOutput {
        self.patch.insert(key.to_string(), value.into());
        self
    }

    /// Name the step that runs after this one
    pub fn then(self, step: &str) -> StepOutput {
        self.with(NEXT_WORKFLOW, step)
    }
}

/// One named phase of an application's question chain
///
/// Steps are pure: they read the current config and describe changes, the executor applies them.
pub trait WorkflowStep {
    fn questions(&self, config: &Config) -> Result<StepOutput>;

    /// Patch applied once this step's answers are merged
    fn after(&self, _config: &Config) -> Result<Patch> {
        Ok(Patch::new())
    }
}

impl<F> WorkflowStep for F
where
    F: Fn(&Config) -> Result<StepOutput>,
{
    fn questions(&self, config: &Config) -> Result<StepOutput> {
        self(config)
    }
}

/// A loaded application: base config, static metadata, and its step registry
pub struct ApplicationDescriptor {
    pub base_config: Config,
    /// `application_config` section of the base config document, passed through to rendering
    pub application_config: Value,
    steps: BTreeMap<String, Box<dyn WorkflowStep>>,
}

impl ApplicationDescriptor {
    pub fn new(base_config: Config) -> ApplicationDescriptor {
        ApplicationDescriptor {
            base_config,
            application_config: Value::Object(Map::new()),
            steps: BTreeMap::new(),
        }
    }

    pub fn register(mut self, name: &str, step: impl WorkflowStep + 'static) -> ApplicationDescriptor {
        self.steps.insert(name.to_string(), Box::new(step));
        self
    }

    pub fn step(&self, name: &str) -> Option<&dyn WorkflowStep> {
        self.steps.get(name).map(|step| step.as_ref())
    }

    pub fn step_names(&self) -> Vec<String> {
        self.steps.keys().cloned().collect()
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }
}

impl fmt::Debug for ApplicationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ApplicationDescriptor")
            .field("base_config", &self.base_config)
            .field("application_config", &self.application_config)
            .field("steps", &self.step_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn merge_overwrites_and_keeps_order() {
        let mut config = Config::new();
        config.insert("cluster", "Nash");
        config.insert("cores", 40);

        let mut patch = Patch::new();
        patch.insert("cluster".into(), json!("Beskow"));
        patch.insert("memory".into(), json!(210));
        config.merge(patch);

        let keys: Vec<&String> = config.as_map().keys().collect();
        assert_eq!(keys, ["cluster", "cores", "memory"]);
        assert_eq!(config.get("cluster"), Some(&json!("Beskow")));
    }

    #[test]
    fn take_next_removes_control_key() {
        let mut config = Config::new();
        config.set_next("mainflow");

        assert_eq!(config.take_next(), Some(json!("mainflow")));
        assert!(!config.contains_key(NEXT_WORKFLOW));
        assert_eq!(config.take_next(), None);
    }

    #[test]
    fn closures_register_as_steps() {
        let app = ApplicationDescriptor::new(Config::new()).register("mainflow", |_: &Config| -> Result<StepOutput> {
            Ok(StepOutput::questions(vec![Question::text("jobname", "Name of job")]).then("wrapup"))
        });

        let output = app.step("mainflow").unwrap().questions(&Config::new()).unwrap();

        assert_eq!(output.questions.len(), 1);
        assert_eq!(output.patch[NEXT_WORKFLOW], json!("wrapup"));
        assert!(app.step("wrapup").is_none());
    }
}
