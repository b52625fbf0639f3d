use serde_json::{Map, Value};

use crate::question::{Question, QuestionKind};

/// A condition on an enclosing `BooleanList`: its answer must equal `branch`
#[derive(Debug, Clone, PartialEq)]
pub struct Guard {
    pub parent: String,
    pub branch: bool,
}

/// A question in the flattened order, with the branch conditions it sits under
#[derive(Debug, Clone, PartialEq)]
pub struct FlatQuestion<'a> {
    pub question: &'a Question,
    pub guards: Vec<Guard>,
}

impl FlatQuestion<'_> {
    /// Active when every enclosing `BooleanList` was answered with this question's branch
    ///
    /// `resolved` holds the answers resolved so far in the current step. A parent that was
    /// never resolved (because it sat in an inactive branch itself) deactivates its children.
    pub fn is_active(&self, resolved: &Map<String, Value>) -> bool {
        self.guards.iter().all(|guard| {
            resolved.get(&guard.parent).and_then(Value::as_bool) == Some(guard.branch)
        })
    }
}

/// Flatten a step's questions depth first, in declaration order
///
/// A `BooleanList` is kept in place (it is answered as a confirm) and followed by its
/// `when_true` children, then its `when_false` children, each guarded by the branch they
/// belong to.
pub fn flatten(questions: &[Question]) -> Vec<FlatQuestion<'_>> {
    let mut flat = Vec::new();
    push_all(questions, &[], &mut flat);
    flat
}

fn push_all<'a>(questions: &'a [Question], guards: &[Guard], flat: &mut Vec<FlatQuestion<'a>>) {
    for question in questions {
        flat.push(FlatQuestion { question, guards: guards.to_vec() });

        if let QuestionKind::BooleanList { when_true, when_false } = &question.kind {
            for (branch, children) in [(true, when_true), (false, when_false)] {
                let mut nested = guards.to_vec();
                nested.push(Guard { parent: question.name.clone(), branch });
                push_all(children, &nested, flat);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn names(flat: &[FlatQuestion]) -> Vec<String> {
        flat.iter().map(|f| f.question.name.clone()).collect()
    }

    #[test]
    fn plain_questions_are_unguarded() {
        let questions = vec![Question::text("a", "A"), Question::constant("b", 1)];
        let flat = flatten(&questions);

        assert_eq!(names(&flat), ["a", "b"]);
        assert!(flat.iter().all(|f| f.guards.is_empty()));
        assert!(flat.iter().all(|f| f.is_active(&Map::new())));
    }

    #[test]
    fn nested_branches_keep_declaration_order() {
        let inner = Question::boolean_list(
            "inner",
            "Inner?",
            vec![Question::text("deep_yes", "")],
            vec![Question::text("deep_no", "")],
        );
        let questions = vec![
            Question::boolean_list("outer", "Outer?", vec![inner, Question::text("yes", "")], vec![
                Question::text("no", ""),
            ]),
            Question::text("after", ""),
        ];

        let flat = flatten(&questions);

        assert_eq!(names(&flat), ["outer", "inner", "deep_yes", "deep_no", "yes", "no", "after"]);
        assert_eq!(flat[2].guards, vec![
            Guard { parent: "outer".into(), branch: true },
            Guard { parent: "inner".into(), branch: true },
        ]);
    }

    #[test]
    fn activation_follows_resolved_parent() {
        let questions = vec![Question::boolean_list(
            "stage",
            "Stage files?",
            vec![Question::text("q2", "")],
            vec![Question::text("q1", "")],
        )];
        let flat = flatten(&questions);

        let mut resolved = Map::new();
        assert!(flat[0].is_active(&resolved));
        assert!(!flat[1].is_active(&resolved));
        assert!(!flat[2].is_active(&resolved));

        resolved.insert("stage".into(), json!(false));
        assert!(!flat[1].is_active(&resolved));
        assert!(flat[2].is_active(&resolved));
    }
}
