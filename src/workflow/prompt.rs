use std::io::{self, BufRead, Stderr, StdinLock, Write};

use crate::error::{EngineError, Result};
use crate::question::flatten::FlatQuestion;
use crate::question::{Choice, Question};

/// How many times a widget re-asks after input it can't interpret
pub const MAX_ATTEMPTS: usize = 3;

/// Interactive front end used when no supplied answer or fast-mode default applies
///
/// Implementations return what the user chose; checking answers against a question's
/// constraints is the resolver's job. Cancelling must surface as [`EngineError::Interrupted`].
pub trait Prompter {
    /// Called once per step with every question the step may ask
    fn begin_batch(&mut self, _step: &str, _questions: &[FlatQuestion]) -> Result<()> {
        Ok(())
    }

    /// Free text; an empty answer falls back to `default`
    fn text(&mut self, question: &Question, default: Option<&str>) -> Result<String>;

    /// Index of the selected choice
    fn select(&mut self, question: &Question, choices: &[Choice], default: Option<usize>) -> Result<usize>;

    /// Indices of the selected choices
    fn multi_select(&mut self, question: &Question, choices: &[Choice], defaults: &[usize]) -> Result<Vec<usize>>;

    fn confirm(&mut self, question: &Question, default: Option<bool>) -> Result<bool>;

    /// Tell the user why an answer was rejected
    fn notify(&mut self, _message: &str) -> Result<()> {
        Ok(())
    }
}

/// Line-oriented prompts over any reader/writer pair
///
/// End of input (Ctrl-D) while waiting for an answer is the cancel gesture and surfaces as
/// [`EngineError::Interrupted`]. Ctrl-C is left to the default signal disposition.
pub struct TerminalPrompter<R, W> {
    input: R,
    output: W,
}

impl TerminalPrompter<StdinLock<'static>, Stderr> {
    pub fn stdio() -> Self {
        TerminalPrompter { input: io::stdin().lock(), output: io::stderr() }
    }
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        TerminalPrompter { input, output }
    }

    fn say(&mut self, text: &str) -> Result<()> {
        write!(self.output, "{text}")
            .and_then(|_| self.output.flush())
            .map_err(|err| EngineError::io("<terminal>", err))
    }

    fn read_answer(&mut self, field: &str) -> Result<String> {
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => Err(EngineError::Interrupted { field: field.to_string() }),
            Ok(_) => Ok(line.trim().to_string()),
            Err(err) => Err(EngineError::io("<stdin>", err)),
        }
    }

    fn list_choices(&mut self, choices: &[Choice], marked: &[usize]) -> Result<()> {
        for (i, choice) in choices.iter().enumerate() {
            let mark = if marked.contains(&i) { "*" } else { " " };
            self.say(&format!("  {mark}{:>2}) {}\n", i + 1, choice.label()))?;
        }
        Ok(())
    }

    fn unreadable(&self, question: &Question, reason: &str) -> EngineError {
        EngineError::Validation { field: question.name.clone(), attempts: MAX_ATTEMPTS, reason: reason.to_string() }
    }
}

/// Match a label or a value's text, then a 1-based position
///
/// Exact matches win so numeric choices like `[1, 2, 4, 6]` pick the value typed.
fn parse_choice(input: &str, choices: &[Choice]) -> Option<usize> {
    let exact = choices.iter().position(|choice| {
        choice.label() == input || Choice::Plain(choice.value().clone()).label() == input
    });
    exact.or_else(|| match input.parse::<usize>() {
        Ok(n) if (1..=choices.len()).contains(&n) => Some(n - 1),
        _ => None,
    })
}

impl<R: BufRead, W: Write> Prompter for TerminalPrompter<R, W> {
    fn begin_batch(&mut self, step: &str, questions: &[FlatQuestion]) -> Result<()> {
        if questions.iter().any(|flat| !flat.question.is_const()) {
            self.say(&format!("\n[{step}]\n"))?;
        }
        Ok(())
    }

    fn text(&mut self, question: &Question, default: Option<&str>) -> Result<String> {
        match default {
            Some(default) => self.say(&format!("? {} [{default}]: ", question.message))?,
            None => self.say(&format!("? {}: ", question.message))?,
        }
        let answer = self.read_answer(&question.name)?;
        match (answer.is_empty(), default) {
            (true, Some(default)) => Ok(default.to_string()),
            _ => Ok(answer),
        }
    }

    fn select(&mut self, question: &Question, choices: &[Choice], default: Option<usize>) -> Result<usize> {
        self.say(&format!("? {}\n", question.message))?;
        let marked: Vec<usize> = default.into_iter().collect();
        self.list_choices(choices, &marked)?;
        for _ in 0..MAX_ATTEMPTS {
            self.say("  > ")?;
            let answer = self.read_answer(&question.name)?;
            if answer.is_empty() {
                if let Some(index) = default {
                    return Ok(index);
                }
            } else if let Some(index) = parse_choice(&answer, choices) {
                return Ok(index);
            }
            self.say(&format!("  ! pick a number between 1 and {}\n", choices.len()))?;
        }
        Err(self.unreadable(question, "no valid choice entered"))
    }

    fn multi_select(&mut self, question: &Question, choices: &[Choice], defaults: &[usize]) -> Result<Vec<usize>> {
        self.say(&format!("? {} (comma separated)\n", question.message))?;
        self.list_choices(choices, defaults)?;
        'attempt: for _ in 0..MAX_ATTEMPTS {
            self.say("  > ")?;
            let answer = self.read_answer(&question.name)?;
            if answer.is_empty() {
                return Ok(defaults.to_vec());
            }
            let mut picked = Vec::new();
            for part in answer.split(',').map(str::trim).filter(|part| !part.is_empty()) {
                match parse_choice(part, choices) {
                    Some(index) if !picked.contains(&index) => picked.push(index),
                    Some(_) => {}
                    None => {
                        self.say(&format!("  ! '{part}' is not one of the choices\n"))?;
                        continue 'attempt;
                    }
                }
            }
            return Ok(picked);
        }
        Err(self.unreadable(question, "no valid selection entered"))
    }

    fn confirm(&mut self, question: &Question, default: Option<bool>) -> Result<bool> {
        let hint = match default {
            Some(true) => "Y/n",
            Some(false) => "y/N",
            None => "y/n",
        };
        for _ in 0..MAX_ATTEMPTS {
            self.say(&format!("? {} [{hint}]: ", question.message))?;
            let answer = self.read_answer(&question.name)?;
            match (answer.to_lowercase().as_str(), default) {
                ("", Some(default)) => return Ok(default),
                ("y" | "yes", _) => return Ok(true),
                ("n" | "no", _) => return Ok(false),
                _ => self.say("  ! answer y or n\n")?,
            }
        }
        Err(self.unreadable(question, "no yes/no answer entered"))
    }

    fn notify(&mut self, message: &str) -> Result<()> {
        self.say(&format!("  ! {message}\n"))
    }
}
