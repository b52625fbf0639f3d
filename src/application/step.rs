use std::collections::BTreeMap;

use log::debug;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::application::{Config, Patch, StepOutput, WorkflowStep, NEXT_WORKFLOW};
use crate::error::{EngineError, Result};
use crate::question::{Choice, Question};

/// Top level of a plugin source document
#[derive(Debug, Deserialize)]
pub struct PluginDocument {
    pub steps: BTreeMap<String, StepTable>,
}

/// One step as declared in plugin source
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StepTable {
    /// Applied before the questions are resolved
    #[serde(default)]
    pub set: Patch,
    #[serde(default)]
    pub questions: Vec<QuestionSpec>,
    /// Applied in order after the answers are merged
    #[serde(default)]
    pub after: Vec<Rule>,
    #[serde(default)]
    pub next: Option<Next>,
}

/// A question plus the declarative extras that depend on the config
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionSpec {
    #[serde(flatten)]
    pub question: Question,
    #[serde(flatten)]
    pub condition: Condition,
    /// Config key holding the choices of a `list` or `checkbox`
    #[serde(default)]
    pub choices_from: Option<String>,
}

/// Equality tests against the config
///
/// Holds when every `when` entry matches and the `unless` entries do not all match.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Condition {
    #[serde(default)]
    pub when: Map<String, Value>,
    #[serde(default)]
    pub unless: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    #[serde(flatten)]
    pub condition: Condition,
    pub set: Patch,
}

/// Successor of a step: a fixed name or the value of a config key
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Next {
    Step(String),
    FromKey { from: String },
}

impl Condition {
    pub fn holds(&self, config: &Config) -> bool {
        let matches = |expected: &Map<String, Value>| {
            expected.iter().all(|(key, value)| config.get(key) == Some(value))
        };
        matches(&self.when) && (self.unless.is_empty() || !matches(&self.unless))
    }
}

/// A [`StepTable`] bound to its name so errors can point at it
#[derive(Debug, Clone)]
pub struct DeclarativeStep {
    pub name: String,
    pub table: StepTable,
}

impl DeclarativeStep {
    fn failed(&self, reason: String) -> EngineError {
        EngineError::StepFailed { step: self.name.clone(), reason }
    }

    fn choices_from(&self, key: &str, config: &Config) -> Result<Vec<Choice>> {
        match config.get(key) {
            Some(Value::Array(values)) => Ok(values.iter().cloned().map(Choice::from).collect()),
            _ => Err(self.failed(format!("choices come from '{key}', which is not a list in the config"))),
        }
    }
}

impl WorkflowStep for DeclarativeStep {
    fn questions(&self, config: &Config) -> Result<StepOutput> {
        let mut questions = Vec::new();
        for spec in &self.table.questions {
            if !spec.condition.holds(config) {
                debug!("Step {}: skipping '{}'", self.name, spec.question.name);
                continue;
            }
            let mut question = spec.question.clone();
            if let Some(key) = &spec.choices_from {
                question.set_choices(self.choices_from(key, config)?);
            }
            questions.push(question);
        }
        Ok(StepOutput { questions, patch: self.table.set.clone() })
    }

    fn after(&self, config: &Config) -> Result<Patch> {
        let mut patch = Patch::new();
        for rule in self.table.after.iter().filter(|rule| rule.condition.holds(config)) {
            patch.extend(rule.set.clone());
        }

        match &self.table.next {
            None => {}
            Some(Next::Step(step)) => {
                patch.insert(NEXT_WORKFLOW.to_string(), Value::String(step.clone()));
            }
            Some(Next::FromKey { from }) => match config.get(from) {
                Some(Value::String(step)) => {
                    patch.insert(NEXT_WORKFLOW.to_string(), Value::String(step.clone()));
                }
                other => {
                    let found = other.cloned().unwrap_or(Value::Null);
                    let reason = format!("successor comes from '{from}', which is not a step name ({found})");
                    return Err(self.failed(reason));
                }
            },
        }

        Ok(patch)
    }
}
