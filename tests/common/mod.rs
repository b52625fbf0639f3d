//! Shared fixtures for the workflow integration tests

use std::fs;
use std::path::PathBuf;

use jobbergate::workflow::prompt::Prompter;
use jobbergate::{Choice, EngineError, Question, Result};
use serde_json::Value;

/// Replays text answers in order and records every field it was asked about
///
/// Runs out of answers the way a user hitting Ctrl-D would: with an interrupt.
#[derive(Default)]
pub struct ScriptedPrompter {
    pub texts: Vec<String>,
    pub asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn with_texts(texts: &[&str]) -> ScriptedPrompter {
        ScriptedPrompter { texts: texts.iter().map(|t| t.to_string()).collect(), asked: vec![] }
    }

    fn next(&mut self, question: &Question) -> Result<String> {
        self.asked.push(question.name.clone());
        if self.texts.is_empty() {
            return Err(EngineError::Interrupted { field: question.name.clone() });
        }
        Ok(self.texts.remove(0))
    }
}

impl Prompter for ScriptedPrompter {
    fn text(&mut self, question: &Question, _default: Option<&str>) -> Result<String> {
        self.next(question)
    }

    fn select(&mut self, question: &Question, choices: &[Choice], _default: Option<usize>) -> Result<usize> {
        let answer = self.next(question)?;
        Ok(choices.iter().position(|c| c.label() == answer).unwrap_or(0))
    }

    fn multi_select(&mut self, question: &Question, _choices: &[Choice], _defaults: &[usize]) -> Result<Vec<usize>> {
        self.next(question)?;
        Ok(vec![])
    }

    fn confirm(&mut self, question: &Question, _default: Option<bool>) -> Result<bool> {
        Ok(self.next(question)? == "y")
    }
}

pub struct DemoApplication {
    pub source: String,
    pub base_config: String,
    pub templates_dir: PathBuf,
}

/// The STAR-CCM+ application bundled under data/demo
pub fn starccm() -> DemoApplication {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/demo/starccm");
    DemoApplication {
        source: fs::read_to_string(dir.join("application.yaml")).expect("demo application source"),
        base_config: fs::read_to_string(dir.join("jobbergate.yaml")).expect("demo base config"),
        templates_dir: dir.join("templates"),
    }
}

pub fn object(value: Value) -> serde_json::Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}
