//! # Executable Statements
//!
//! A parsed program is a sequence of statements: fact insertions, rule
//! insertions, deletions and queries. [`Statement::execute`] runs one
//! against an interpreter, with optional caller-supplied bindings so a
//! statement with variables can serve as a reusable template.

use crate::ast::{Atom, Rule};
use crate::binding::Binding;
use crate::error::DatalogResult;
use crate::storage::FactStorage;
use crate::Interpreter;
use std::fmt;

/// One executable unit of a Datalog program.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `fact(a, b).`
    InsertFact(Atom),
    /// `head(X) :- body(X).`
    InsertRule(Rule),
    /// `goal(X, b)~` removes every matching fact from the EDB.
    Delete(Vec<Atom>),
    /// `goal(X)?`
    Query(Vec<Atom>),
}

impl Statement {
    /// Execute against `interpreter`. Only queries produce answers; the
    /// other statements return `None`.
    ///
    /// When `bindings` are given they are substituted into the statement
    /// first, so `brother(john, X)?` can be re-run with different `X`.
    pub fn execute<S: FactStorage>(
        &self,
        interpreter: &mut Interpreter<S>,
        bindings: Option<&Binding>,
    ) -> DatalogResult<Option<Vec<Binding>>> {
        match self {
            Statement::InsertFact(fact) => {
                let fact = match bindings {
                    Some(bindings) => fact.substitute(bindings),
                    None => fact.clone(),
                };
                interpreter.insert_fact(fact)?;
                Ok(None)
            }
            Statement::InsertRule(rule) => {
                let rule = match bindings {
                    Some(bindings) => rule.substitute(bindings),
                    None => rule.clone(),
                };
                interpreter.insert_rule(rule)?;
                Ok(None)
            }
            Statement::Delete(goals) => {
                interpreter.delete(goals, bindings)?;
                Ok(None)
            }
            Statement::Query(goals) => {
                Ok(Some(interpreter.query_with_bindings(goals, bindings)?))
            }
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::InsertFact(fact) => write!(f, "{fact}."),
            Statement::InsertRule(rule) => write!(f, "{rule}."),
            Statement::Delete(goals) => {
                write_goals(f, goals)?;
                write!(f, "~")
            }
            Statement::Query(goals) => {
                write_goals(f, goals)?;
                write!(f, "?")
            }
        }
    }
}

fn write_goals(f: &mut fmt::Formatter<'_>, goals: &[Atom]) -> fmt::Result {
    for (i, goal) in goals.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{goal}")?;
    }
    Ok(())
}

/// Render query answers the way the REPL prints them: `Yes.` for a
/// successful ground query, `No.` for no answers, otherwise one line of
/// `Var: value` pairs per answer, variables sorted for stable output.
pub fn format_answers(answers: &[Binding]) -> String {
    match answers.first() {
        None => "No.".to_string(),
        Some(first) if first.is_empty() => "Yes.".to_string(),
        Some(_) => {
            let mut lines: Vec<String> = answers
                .iter()
                .map(|answer| {
                    let mut pairs: Vec<_> = answer.iter().collect();
                    pairs.sort_by_key(|(var, _)| var.as_str());
                    pairs
                        .into_iter()
                        .map(|(var, value)| format!("{var}: {value}"))
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .collect();
            lines.sort_unstable();
            lines.join("\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builders::{binding, expr, not, rule};
    use crate::Interpreter;

    #[test]
    fn insert_fact_substitutes_bindings_first() {
        let mut interpreter = Interpreter::new();
        let stmt = Statement::InsertFact(expr("parent", &["alice", "X"]));
        let result = stmt
            .execute(&mut interpreter, Some(&binding(&[("X", "bob")])))
            .unwrap();
        assert!(result.is_none());

        let answers = interpreter.query(&[expr("parent", &["alice", "bob"])]).unwrap();
        assert_eq!(answers.len(), 1);
    }

    #[test]
    fn insert_rule_substitutes_bindings_first() {
        let mut interpreter = Interpreter::new();
        interpreter.insert_fact(expr("parent", &["alice", "bob"])).unwrap();
        interpreter.insert_fact(expr("parent", &["bob", "carol"])).unwrap();

        // A rule template with a free W slot, instantiated per execution.
        let stmt = Statement::InsertRule(rule(
            expr("grandchild_via", &["X", "Z"]),
            vec![expr("parent", &["X", "W"]), expr("parent", &["W", "Z"])],
        ));
        let result = stmt
            .execute(&mut interpreter, Some(&binding(&[("W", "bob")])))
            .unwrap();
        assert!(result.is_none());

        assert_eq!(
            interpreter.idb(),
            &[rule(
                expr("grandchild_via", &["X", "Z"]),
                vec![expr("parent", &["X", "bob"]), expr("parent", &["bob", "Z"])],
            )]
        );
        let answers = interpreter
            .query(&[expr("grandchild_via", &["alice", "carol"])])
            .unwrap();
        assert_eq!(answers.len(), 1);
    }

    #[test]
    fn query_statement_returns_answers() {
        let mut interpreter = Interpreter::new();
        interpreter.insert_fact(expr("p", &["a"])).unwrap();
        let stmt = Statement::Query(vec![expr("p", &["X"])]);
        let answers = stmt.execute(&mut interpreter, None).unwrap().unwrap();
        assert_eq!(answers.len(), 1);
    }

    #[test]
    fn delete_statement_removes_matching_facts() {
        let mut interpreter = Interpreter::new();
        interpreter.insert_fact(expr("p", &["a"])).unwrap();
        interpreter.insert_fact(expr("p", &["b"])).unwrap();

        let stmt = Statement::Delete(vec![expr("p", &["X"])]);
        stmt.execute(&mut interpreter, None).unwrap();

        let answers = interpreter.query(&[expr("p", &["X"])]).unwrap();
        assert!(answers.is_empty());
    }

    #[test]
    fn display_round_trips_terminators() {
        assert_eq!(
            Statement::InsertFact(expr("p", &["a"])).to_string(),
            "p(a)."
        );
        assert_eq!(
            Statement::Query(vec![expr("p", &["X"]), not("q", &["X"])]).to_string(),
            "p(X), not q(X)?"
        );
        assert_eq!(
            Statement::Delete(vec![expr("p", &["X"])]).to_string(),
            "p(X)~"
        );
        assert_eq!(
            Statement::InsertRule(rule(expr("p", &["X"]), vec![expr("q", &["X"])]))
                .to_string(),
            "p(X) :- q(X)."
        );
    }

    #[test]
    fn answer_formatting() {
        assert_eq!(format_answers(&[]), "No.");
        assert_eq!(format_answers(&[Binding::new()]), "Yes.");
        let rows = format_answers(&[
            binding(&[("X", "b")]),
            binding(&[("X", "a"), ("Y", "1")]),
        ]);
        assert_eq!(rows, "X: a, Y: 1\nX: b");
    }
}
