use std::path::Path;

use log::{debug, info, warn};
use serde_json::Value;

use crate::answers::SuppliedAnswers;
use crate::application::Patch;
use crate::error::{EngineError, Result};
use crate::question::flatten::flatten;
use crate::question::{Choice, Question, QuestionKind};
use crate::workflow::prompt::{Prompter, MAX_ATTEMPTS};

/// Where an answer came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerSource {
    /// Pre-filled answers file; wins over everything else
    Supplied,
    /// The question's own default, taken in fast mode
    FastDefault,
    Interactive,
    /// A `Const` question's fixed value
    Constant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub value: Value,
    pub source: AnswerSource,
}

/// Resolve one question: supplied answer, then fast-mode default, then the prompter
///
/// Supplied answers are used verbatim, they are neither validated nor defaulted. `Const`
/// questions skip all three sources.
pub fn resolve(
    question: &Question,
    supplied: &SuppliedAnswers,
    fast_mode: bool,
    prompter: &mut dyn Prompter,
) -> Result<Answer> {
    if let QuestionKind::Const { value } = &question.kind {
        return Ok(Answer { value: value.clone(), source: AnswerSource::Constant });
    }

    if let Some(value) = supplied.get(&question.name) {
        debug!("Supplied answer used: {}={}", question.name, value);
        return Ok(Answer { value: value.clone(), source: AnswerSource::Supplied });
    }

    if fast_mode {
        if let Some(default) = &question.default {
            info!("Default value used: {}={}", question.name, default);
            return Ok(Answer { value: default.clone(), source: AnswerSource::FastDefault });
        }
    }

    let value = ask(question, prompter)?;
    Ok(Answer { value, source: AnswerSource::Interactive })
}

/// Resolve every active question of one step, in order
///
/// The whole flattened set is announced to the prompter first. Children of a `BooleanList`
/// are only resolved under the branch its answer selected; the other branch contributes
/// nothing to the returned answers.
pub fn resolve_step(
    step: &str,
    questions: &[Question],
    supplied: &SuppliedAnswers,
    fast_mode: bool,
    prompter: &mut dyn Prompter,
) -> Result<Patch> {
    let flat = flatten(questions);
    prompter.begin_batch(step, &flat)?;

    let mut answers = Patch::new();
    for item in &flat {
        let name = &item.question.name;
        if !item.is_active(&answers) {
            debug!("Step {step}: '{name}' is on an unselected branch");
            continue;
        }
        let answer = resolve(item.question, supplied, fast_mode, prompter)?;
        if answers.contains_key(name) {
            warn!("Step {step} asks '{name}' more than once, keeping the last answer");
        }
        answers.insert(name.clone(), answer.value);
    }
    Ok(answers)
}

fn ask(question: &Question, prompter: &mut dyn Prompter) -> Result<Value> {
    match &question.kind {
        QuestionKind::Text | QuestionKind::Integer { .. } => {
            retry(question, prompter, |input| question.validate(input))
        }
        QuestionKind::Directory { exists } => retry(question, prompter, |input| check_path(input, *exists, true)),
        QuestionKind::File { exists } => retry(question, prompter, |input| check_path(input, *exists, false)),
        QuestionKind::List { choices } => {
            let default = question.default.as_ref().and_then(|value| position(choices, value));
            let index = prompter.select(question, non_empty(question, choices)?, default)?;
            choice_value(question, choices, index)
        }
        QuestionKind::Checkbox { choices } => {
            let defaults: Vec<usize> = match &question.default {
                Some(Value::Array(values)) => values.iter().filter_map(|value| position(choices, value)).collect(),
                Some(value) => position(choices, value).into_iter().collect(),
                None => vec![],
            };
            let picked = prompter.multi_select(question, non_empty(question, choices)?, &defaults)?;
            let values = picked
                .into_iter()
                .map(|index| choice_value(question, choices, index))
                .collect::<Result<Vec<Value>>>()?;
            Ok(Value::Array(values))
        }
        QuestionKind::Confirm | QuestionKind::BooleanList { .. } => {
            let default = question.default.as_ref().and_then(Value::as_bool);
            Ok(Value::Bool(prompter.confirm(question, default)?))
        }
        QuestionKind::Const { value } => Ok(value.clone()),
    }
}

/// Prompt for free text until `check` accepts it, at most [`MAX_ATTEMPTS`] times
fn retry<F>(question: &Question, prompter: &mut dyn Prompter, check: F) -> Result<Value>
where
    F: Fn(&str) -> std::result::Result<Value, String>,
{
    let default = question.default.as_ref().map(as_text);
    let mut reason = String::new();
    for attempt in 1..=MAX_ATTEMPTS {
        let input = prompter.text(question, default.as_deref())?;
        match check(&input) {
            Ok(value) => return Ok(value),
            Err(why) => {
                warn!("Rejected answer {attempt}/{MAX_ATTEMPTS} for '{}': {why}", question.name);
                prompter.notify(&why)?;
                reason = why;
            }
        }
    }
    Err(EngineError::Validation { field: question.name.clone(), attempts: MAX_ATTEMPTS, reason })
}

fn check_path(input: &str, exists: bool, directory: bool) -> std::result::Result<Value, String> {
    if input.is_empty() {
        return Err("a path is required".to_string());
    }
    let path = Path::new(input);
    if exists {
        if !path.exists() {
            return Err(format!("{input} does not exist"));
        }
        if directory && !path.is_dir() {
            return Err(format!("{input} is not a directory"));
        }
        if !directory && !path.is_file() {
            return Err(format!("{input} is not a file"));
        }
    }
    Ok(Value::String(input.to_string()))
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn position(choices: &[Choice], value: &Value) -> Option<usize> {
    choices.iter().position(|choice| choice.value() == value)
}

fn non_empty<'a>(question: &Question, choices: &'a [Choice]) -> Result<&'a [Choice]> {
    if choices.is_empty() {
        return Err(EngineError::Validation {
            field: question.name.clone(),
            attempts: 0,
            reason: "there are no choices to pick from".to_string(),
        });
    }
    Ok(choices)
}

fn choice_value(question: &Question, choices: &[Choice], index: usize) -> Result<Value> {
    choices.get(index).map(|choice| choice.value().clone()).ok_or_else(|| EngineError::Validation {
        field: question.name.clone(),
        attempts: 1,
        reason: format!("choice {index} is out of range"),
    })
}
