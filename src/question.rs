//! The vocabulary plugins use to describe what to ask
//!
//! A [`Question`] says nothing about how it gets answered: answers can come from a supplied
//! answers file, a fast-mode default, or an interactive prompt (see `workflow::resolve`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Expand nested boolean branches into a flat, guarded list
pub mod flatten;

/// One piece of information to collect
///
/// `name` is the key the answer is stored under in the workflow config.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Question {
    pub name: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    Text,
    /// Free text that must parse as an integer inside the optional bounds
    Integer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        minval: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        maxval: Option<i64>,
    },
    /// Exactly one of the choices
    List {
        #[serde(default)]
        choices: Vec<Choice>,
    },
    /// Any subset of the choices
    Checkbox {
        #[serde(default)]
        choices: Vec<Choice>,
    },
    Directory {
        #[serde(default)]
        exists: bool,
    },
    File {
        #[serde(default)]
        exists: bool,
    },
    Confirm,
    /// Fixed value, never prompted and never taken from supplied answers
    Const { value: Value },
    /// A confirm whose answer selects which child questions are asked
    BooleanList {
        #[serde(default)]
        when_true: Vec<Question>,
        #[serde(default)]
        when_false: Vec<Question>,
    },
}

/// A selectable option: either a bare value or a display label with the value it stores
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Choice {
    Labeled { label: String, value: Value },
    Plain(Value),
}

impl Choice {
    pub fn labeled(label: &str, value: impl Into<Value>) -> Choice {
        Choice::Labeled { label: label.to_string(), value: value.into() }
    }

    pub fn value(&self) -> &Value {
        match self {
            Choice::Labeled { value, .. } => value,
            Choice::Plain(value) => value,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Choice::Labeled { label, .. } => label.clone(),
            Choice::Plain(Value::String(s)) => s.clone(),
            Choice::Plain(value) => value.to_string(),
        }
    }
}

impl From<&str> for Choice {
    fn from(value: &str) -> Self {
        Choice::Plain(Value::String(value.to_string()))
    }
}

impl From<Value> for Choice {
    fn from(value: Value) -> Self {
        Choice::Plain(value)
    }
}

impl Question {
    fn new(name: &str, message: &str, kind: QuestionKind) -> Question {
        Question { name: name.to_string(), message: message.to_string(), default: None, kind }
    }

    pub fn text(name: &str, message: &str) -> Question {
        Question::new(name, message, QuestionKind::Text)
    }

    pub fn integer(name: &str, message: &str) -> Question {
        Question::new(name, message, QuestionKind::Integer { minval: None, maxval: None })
    }

    pub fn list<C: Into<Choice>>(name: &str, message: &str, choices: Vec<C>) -> Question {
        let choices = choices.into_iter().map(Into::into).collect();
        Question::new(name, message, QuestionKind::List { choices })
    }

    pub fn checkbox<C: Into<Choice>>(name: &str, message: &str, choices: Vec<C>) -> Question {
        let choices = choices.into_iter().map(Into::into).collect();
        Question::new(name, message, QuestionKind::Checkbox { choices })
    }

    pub fn directory(name: &str, message: &str, exists: bool) -> Question {
        Question::new(name, message, QuestionKind::Directory { exists })
    }

    pub fn file(name: &str, message: &str, exists: bool) -> Question {
        Question::new(name, message, QuestionKind::File { exists })
    }

    pub fn confirm(name: &str, message: &str) -> Question {
        Question::new(name, message, QuestionKind::Confirm)
    }

    pub fn constant(name: &str, value: impl Into<Value>) -> Question {
        Question::new(name, "", QuestionKind::Const { value: value.into() })
    }

    pub fn boolean_list(
        name: &str,
        message: &str,
        when_true: Vec<Question>,
        when_false: Vec<Question>,
    ) -> Question {
        Question::new(name, message, QuestionKind::BooleanList { when_true, when_false })
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Question {
        self.default = Some(default.into());
        self
    }

    pub fn with_bounds(mut self, min: Option<i64>, max: Option<i64>) -> Question {
        if let QuestionKind::Integer { minval, maxval } = &mut self.kind {
            *minval = min;
            *maxval = max;
        }
        self
    }

    pub fn is_const(&self) -> bool {
        matches!(self.kind, QuestionKind::Const { .. })
    }

    /// Replace the choices of a `List` or `Checkbox`; other variants are left alone
    pub fn set_choices(&mut self, new_choices: Vec<Choice>) {
        match &mut self.kind {
            QuestionKind::List { choices } | QuestionKind::Checkbox { choices } => *choices = new_choices,
            _ => {}
        }
    }

    /// Check free-text input for `Text` and `Integer` questions
    ///
    /// Returns the value to store: integers are stored as JSON numbers, text verbatim.
    pub fn validate(&self, input: &str) -> std::result::Result<Value, String> {
        match &self.kind {
            QuestionKind::Integer { minval, maxval } => {
                let n: i64 = input.trim().parse().map_err(|_| format!("'{input}' is not an integer"))?;
                if let Some(min) = minval {
                    if n < *min {
                        return Err(format!("{n} is smaller than {min}"));
                    }
                }
                if let Some(max) = maxval {
                    if n > *max {
                        return Err(format!("{n} is larger than {max}"));
                    }
                }
                Ok(Value::from(n))
            }
            _ => Ok(Value::String(input.to_string())),
        }
    }
}
