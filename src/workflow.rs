//! Walk an application's step chain and collect the final config
//!
//! Each iteration pops `nextworkflow` from the config, asks the named step for its questions,
//! resolves them, and merges the answers back. The chain ends when a step leaves no
//! `nextworkflow` behind.

use log::info;
use serde_json::Value;

use crate::answers::SuppliedAnswers;
use crate::application::{ApplicationDescriptor, Config, Patch};
use crate::error::{EngineError, Result};
use crate::workflow::prompt::Prompter;
use crate::workflow::resolve::resolve_step;

/// Interactive front ends
pub mod prompt;
/// Turn questions into answers
pub mod resolve;

/// Conventional entry point of every application
pub static MAINFLOW: &str = "mainflow";

/// Run the step chain from `start_step` and return the accumulated config
///
/// The config is seeded from the application's base config, then `overrides`. Supplied answers
/// only enter the config through the questions that are actually asked, so a supplied value for
/// an unselected branch or an unknown name is dropped.
///
/// A step may run at most once per chain: reaching it again fails with
/// [`EngineError::WorkflowCycle`], which bounds the number of iterations by the number of
/// registered steps.
pub fn run(
    descriptor: &ApplicationDescriptor,
    overrides: Patch,
    supplied: &SuppliedAnswers,
    fast_mode: bool,
    start_step: &str,
    prompter: &mut dyn Prompter,
) -> Result<Config> {
    let mut config = descriptor.base_config.clone();
    config.merge(overrides);
    config.set_next(start_step);

    let mut chain: Vec<String> = Vec::new();
    while let Some(next) = config.take_next() {
        let name = step_name(next);
        let step = descriptor.step(&name).ok_or_else(|| EngineError::UnknownWorkflowStep {
            step: name.clone(),
            known: descriptor.step_names(),
        })?;
        if chain.contains(&name) {
            return Err(EngineError::WorkflowCycle { step: name, chain });
        }
        chain.push(name.clone());
        info!("Running workflow step {name}");

        let output = step.questions(&config)?;
        config.merge(output.patch);
        let answers = resolve_step(&name, &output.questions, supplied, fast_mode, prompter)?;
        config.merge(answers);
        let after = step.after(&config)?;
        config.merge(after);
    }

    info!("Workflow finished: {}", chain.join(" -> "));
    Ok(config)
}

fn step_name(next: Value) -> String {
    match next {
        Value::String(name) => name,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use serde_json::json;

    use super::*;
    use crate::application::StepOutput;
    use crate::question::{Choice, Question};

    /// Fails the test if anything is asked interactively
    struct NoPrompts;

    impl Prompter for NoPrompts {
        fn text(&mut self, question: &Question, _default: Option<&str>) -> Result<String> {
            panic!("unexpected prompt for {}", question.name)
        }

        fn select(&mut self, question: &Question, _choices: &[Choice], _default: Option<usize>) -> Result<usize> {
            panic!("unexpected prompt for {}", question.name)
        }

        fn multi_select(
            &mut self,
            question: &Question,
            _choices: &[Choice],
            _defaults: &[usize],
        ) -> Result<Vec<usize>> {
            panic!("unexpected prompt for {}", question.name)
        }

        fn confirm(&mut self, question: &Question, _default: Option<bool>) -> Result<bool> {
            panic!("unexpected prompt for {}", question.name)
        }
    }

    fn answers(value: Value) -> SuppliedAnswers {
        let Value::Object(map) = value else { panic!("not an object") };
        map
    }

    #[test]
    fn chain_follows_nextworkflow_and_strips_it() {
        let app = ApplicationDescriptor::new(Config::new())
            .register("mainflow", |_: &Config| -> Result<StepOutput> {
                Ok(StepOutput::questions(vec![Question::constant("cluster", "Nash")]).then("shared"))
            })
            .register("shared", |config: &Config| -> Result<StepOutput> {
                let cores = if config.get("cluster") == Some(&json!("Nash")) { 40 } else { 36 };
                Ok(StepOutput::questions(vec![Question::constant("cores", cores)]))
            });

        let config = run(&app, Patch::new(), &SuppliedAnswers::new(), false, MAINFLOW, &mut NoPrompts).unwrap();

        assert_eq!(config.as_map(), &answers(json!({"cluster": "Nash", "cores": 40})));
    }

    #[test]
    fn seeding_order_base_overrides_supplied() {
        let mut base = Config::new();
        base.insert("partition", "centos");
        base.insert("memory", 100);
        base.insert("cores", 1);
        let app = ApplicationDescriptor::new(base).register("mainflow", |_: &Config| -> Result<StepOutput> {
            Ok(StepOutput::questions(vec![Question::integer("memory", "Needed memory [GB]")]))
        });
        let mut overrides = Patch::new();
        overrides.insert("memory".into(), json!(200));
        overrides.insert("partition".into(), json!("highfreq"));
        let supplied = answers(json!({"memory": 300, "cores": 40}));

        let config = run(&app, overrides, &supplied, false, MAINFLOW, &mut NoPrompts).unwrap();

        assert_eq!(config.get("partition"), Some(&json!("highfreq")));
        assert_eq!(config.get("memory"), Some(&json!(300)));
        // cores is never asked, so the supplied value does not replace the base one
        assert_eq!(config.get("cores"), Some(&json!(1)));
    }

    #[test]
    fn supplied_answers_off_the_chosen_branch_are_dropped() {
        let app = ApplicationDescriptor::new(Config::new()).register("mainflow", |_: &Config| -> Result<StepOutput> {
            let stage = Question::boolean_list(
                "stage",
                "Stage files in scratch?",
                vec![Question::text("scratchdir", "Scratch directory")],
                vec![Question::text("localdir", "Local directory")],
            );
            Ok(StepOutput::questions(vec![stage]))
        });
        let supplied = answers(json!({
            "stage": false,
            "localdir": "/home/run",
            "scratchdir": "/scratch/run",
            "jobnmae": "typo"
        }));

        let config = run(&app, Patch::new(), &supplied, false, MAINFLOW, &mut NoPrompts).unwrap();

        assert_eq!(config.as_map(), &answers(json!({"stage": false, "localdir": "/home/run"})));
        assert!(!config.contains_key("scratchdir"));
        assert!(!config.contains_key("jobnmae"));
    }

    #[test]
    fn unknown_step_is_reported() {
        let app = ApplicationDescriptor::new(Config::new()).register("mainflow", |_: &Config| -> Result<StepOutput> {
            Ok(StepOutput::default().then("Simulate"))
        });

        let err = run(&app, Patch::new(), &SuppliedAnswers::new(), false, MAINFLOW, &mut NoPrompts).unwrap_err();

        match err {
            EngineError::UnknownWorkflowStep { step, known } => {
                assert_eq!(step, "Simulate");
                assert_eq!(known, ["mainflow"]);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn missing_start_step_is_unknown() {
        let app = ApplicationDescriptor::new(Config::new());
        let err = run(&app, Patch::new(), &SuppliedAnswers::new(), false, MAINFLOW, &mut NoPrompts).unwrap_err();
        assert!(matches!(err, EngineError::UnknownWorkflowStep { .. }));
    }

    #[test]
    fn self_referencing_step_is_stopped() {
        let visits = Rc::new(Cell::new(0));
        let counter = visits.clone();
        let step = move |_: &Config| -> Result<StepOutput> {
            counter.set(counter.get() + 1);
            Ok(StepOutput::default().then("mainflow"))
        };
        let app = ApplicationDescriptor::new(Config::new()).register("mainflow", step);

        let err = run(&app, Patch::new(), &SuppliedAnswers::new(), false, MAINFLOW, &mut NoPrompts).unwrap_err();

        assert!(matches!(err, EngineError::WorkflowCycle { ref step, .. } if step == "mainflow"));
        assert_eq!(visits.get(), 1);
    }

    #[test]
    fn cycle_through_several_steps_is_stopped() {
        let app = ApplicationDescriptor::new(Config::new())
            .register("mainflow", |_: &Config| -> Result<StepOutput> { Ok(StepOutput::default().then("a")) })
            .register("a", |_: &Config| -> Result<StepOutput> { Ok(StepOutput::default().then("b")) })
            .register("b", |_: &Config| -> Result<StepOutput> { Ok(StepOutput::default().then("a")) });

        let err = run(&app, Patch::new(), &SuppliedAnswers::new(), false, MAINFLOW, &mut NoPrompts).unwrap_err();

        match err {
            EngineError::WorkflowCycle { step, chain } => {
                assert_eq!(step, "a");
                assert_eq!(chain, ["mainflow", "a", "b"]);
                assert!(chain.len() <= app.step_count());
            }
            other => panic!("unexpected error {other}"),
        }
    }
}
