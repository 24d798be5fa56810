//! # Stratalog
//!
//! A bottom-up Datalog engine with stratified negation.
//!
//! ## Pipeline
//!
//! ```text
//! Datalog Source Code
//!     ↓
//! [Parser]              → Statements (facts, rules, queries, deletions)
//!     ↓
//! [Safety Validation]   → range-restricted rules, ground facts
//!     ↓
//! [Relevance Pruning]   → only rules/facts reachable from the query
//!     ↓
//! [Stratification]      → negation-safe evaluation order
//!     ↓
//! [Semi-Naive Fixpoint] → expanded fact set
//!     ↓
//! [Goal Matching]       → answer bindings
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use stratalog::Interpreter;
//!
//! let mut interpreter = Interpreter::new();
//! let answers = interpreter
//!     .execute(
//!         "edge(a, b). edge(b, c).
//!          path(X, Y) :- edge(X, Y).
//!          path(X, Z) :- edge(X, Y), path(Y, Z).
//!          path(a, X)?",
//!     )
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(answers.len(), 2);
//! ```
//!
//! The fluent API builds the same program in code:
//!
//! ```rust
//! use stratalog::ast::builders::{expr, rule};
//! use stratalog::Interpreter;
//!
//! let mut interpreter = Interpreter::new();
//! interpreter
//!     .fact("edge", &["a", "b"]).unwrap()
//!     .fact("edge", &["b", "c"]).unwrap()
//!     .rule(rule(expr("path", &["X", "Y"]), vec![expr("edge", &["X", "Y"])]))
//!     .unwrap();
//! let answers = interpreter.query(&[expr("path", &["a", "X"])]).unwrap();
//! assert_eq!(answers.len(), 1);
//! ```

pub mod ast;
pub mod binding;
pub mod config;
pub mod engine;
pub mod error;
pub mod facts;
pub mod parser;
pub mod safety;
pub mod statement;
pub mod storage;
pub mod stratify;

pub use ast::{Atom, Rule, Term};
pub use binding::Binding;
pub use config::Config;
pub use error::{DatalogError, DatalogResult};
pub use facts::FactSet;
pub use parser::{parse_goals, parse_statement, parse_statements};
pub use statement::{format_answers, Statement};
pub use storage::{FactStorage, MemoryStorage};

use ast::builders;
use std::fmt;
use tracing::debug;

/// The interpreter: an extensional database of facts behind a
/// [`FactStorage`] backend, plus the intensional database of rules.
///
/// All mutation goes through validation; anything the interpreter holds
/// is safe to evaluate (an unstratifiable rule combination is still only
/// caught when a query reaches it, or eagerly via [`Interpreter::validate`]).
#[derive(Debug, Default)]
pub struct Interpreter<S: FactStorage = MemoryStorage> {
    edb: S,
    idb: Vec<Rule>,
}

impl Interpreter<MemoryStorage> {
    pub fn new() -> Self {
        Interpreter {
            edb: MemoryStorage::new(),
            idb: Vec::new(),
        }
    }
}

impl<S: FactStorage> Interpreter<S> {
    /// An interpreter over a custom EDB backend.
    pub fn with_storage(edb: S) -> Self {
        Interpreter { edb, idb: Vec::new() }
    }

    // ========================================================================
    // Fluent construction
    // ========================================================================

    /// Insert a fact from predicate and term strings, chainable:
    ///
    /// ```rust
    /// # use stratalog::Interpreter;
    /// let mut interpreter = Interpreter::new();
    /// interpreter
    ///     .fact("parent", &["alice", "bob"]).unwrap()
    ///     .fact("parent", &["bob", "carol"]).unwrap();
    /// ```
    pub fn fact(&mut self, predicate: &str, terms: &[&str]) -> DatalogResult<&mut Self> {
        self.insert_fact(builders::expr(predicate, terms))?;
        Ok(self)
    }

    /// Insert a rule, chainable like [`Interpreter::fact`].
    pub fn rule(&mut self, rule: Rule) -> DatalogResult<&mut Self> {
        self.insert_rule(rule)?;
        Ok(self)
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Add a ground fact to the EDB.
    pub fn insert_fact(&mut self, fact: Atom) -> DatalogResult<()> {
        safety::validate_fact(&fact)?;
        self.edb.add(fact);
        Ok(())
    }

    /// Add a safe rule to the IDB.
    pub fn insert_rule(&mut self, rule: Rule) -> DatalogResult<()> {
        safety::validate_rule(&rule)?;
        self.idb.push(rule);
        Ok(())
    }

    /// Delete every EDB fact matched by `goals`: the goals are queried,
    /// then instantiated with each answer, and the resulting ground facts
    /// removed. Returns true if anything was removed.
    pub fn delete(&mut self, goals: &[Atom], bindings: Option<&Binding>) -> DatalogResult<bool> {
        let answers = self.query_with_bindings(goals, bindings)?;
        let facts: Vec<Atom> = answers
            .iter()
            .flat_map(|answer| goals.iter().map(|goal| goal.substitute(answer)))
            .collect();
        debug!(goals = goals.len(), facts = facts.len(), "deleting facts");
        Ok(self.edb.remove_all(&facts))
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Answer a query against the current EDB and IDB.
    pub fn query(&self, goals: &[Atom]) -> DatalogResult<Vec<Binding>> {
        self.query_with_bindings(goals, None)
    }

    /// Answer a query with caller-supplied seed bindings.
    pub fn query_with_bindings(
        &self,
        goals: &[Atom],
        bindings: Option<&Binding>,
    ) -> DatalogResult<Vec<Binding>> {
        engine::query(&self.edb, &self.idb, goals, bindings)
    }

    // ========================================================================
    // Program execution
    // ========================================================================

    /// Parse and run a whole program, returning the answers of the last
    /// query it contains (or `None` if it contains no query).
    pub fn execute(&mut self, source: &str) -> DatalogResult<Option<Vec<Binding>>> {
        let mut last = None;
        for statement in parser::parse_statements(source)? {
            if let Some(answers) = statement.execute(self, None)? {
                last = Some(answers);
            }
        }
        Ok(last)
    }

    /// Parse and run a whole program, invoking `output` with each query
    /// statement and its answers as they are produced.
    pub fn execute_with<F>(&mut self, source: &str, mut output: F) -> DatalogResult<()>
    where
        F: FnMut(&Statement, &[Binding]),
    {
        for statement in parser::parse_statements(source)? {
            if let Some(answers) = statement.execute(self, None)? {
                output(&statement, &answers);
            }
        }
        Ok(())
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Re-check everything the interpreter holds: rule safety, the
    /// stratifiability of the whole IDB, and fact groundness. Useful after
    /// swapping in a foreign storage backend.
    pub fn validate(&self) -> DatalogResult<()> {
        for rule in &self.idb {
            safety::validate_rule(rule)?;
        }
        stratify::compute_stratification(&self.idb)?;
        for fact in self.edb.all_facts() {
            safety::validate_fact(&fact)?;
        }
        Ok(())
    }

    pub fn edb(&self) -> &S {
        &self.edb
    }

    pub fn edb_mut(&mut self) -> &mut S {
        &mut self.edb
    }

    pub fn idb(&self) -> &[Rule] {
        &self.idb
    }
}

impl<S: FactStorage> fmt::Display for Interpreter<S> {
    /// Dump the database as re-parseable source, facts first.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "% Facts:")?;
        for fact in self.edb.all_facts() {
            writeln!(f, "{fact}.")?;
        }
        writeln!(f, "\n% Rules:")?;
        for rule in &self.idb {
            writeln!(f, "{rule}.")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builders::{expr, not, rule};

    #[test]
    fn execute_returns_last_query_answers() {
        let mut interpreter = Interpreter::new();
        let answers = interpreter
            .execute("p(a). p(b). p(X)? q(c). q(X)?")
            .unwrap()
            .unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0]["X"].as_str(), "c");
    }

    #[test]
    fn execute_without_queries_returns_none() {
        let mut interpreter = Interpreter::new();
        assert!(interpreter.execute("p(a). p(b).").unwrap().is_none());
    }

    #[test]
    fn insertion_validates() {
        let mut interpreter = Interpreter::new();
        assert!(interpreter.insert_fact(expr("p", &["X"])).is_err());
        assert!(interpreter
            .insert_rule(rule(expr("p", &["X"]), vec![not("q", &["X"])]))
            .is_err());
    }

    #[test]
    fn validate_catches_unstratifiable_idb() {
        let mut interpreter = Interpreter::new();
        interpreter
            .rule(rule(
                expr("p", &["X"]),
                vec![expr("r", &["X"]), not("q", &["X"])],
            ))
            .unwrap()
            .rule(rule(expr("q", &["X"]), vec![expr("p", &["X"])]))
            .unwrap();
        assert!(matches!(
            interpreter.validate(),
            Err(DatalogError::NotStratified { .. })
        ));
    }

    #[test]
    fn display_dump_is_reparseable() {
        let mut interpreter = Interpreter::new();
        interpreter
            .execute("edge(a, b). path(X, Y) :- edge(X, Y).")
            .unwrap();

        let dump = interpreter.to_string();
        let mut restored = Interpreter::new();
        restored.execute(&dump).unwrap();
        assert_eq!(restored.idb().len(), 1);
        assert_eq!(restored.edb().all_facts().len(), 1);
    }

    #[test]
    fn execute_with_reports_each_query() {
        let mut interpreter = Interpreter::new();
        let mut seen = Vec::new();
        interpreter
            .execute_with("p(a). p(X)? p(a)?", |statement, answers| {
                seen.push((statement.to_string(), answers.len()));
            })
            .unwrap();
        assert_eq!(seen, vec![("p(X)?".to_string(), 1), ("p(a)?".to_string(), 1)]);
    }
}
