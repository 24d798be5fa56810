//! # Rule Safety Validation
//!
//! A rule is safe when every variable it uses is guaranteed a binding by
//! the time it is needed: head variables and the operands of negated and
//! comparison goals must all appear in an earlier positive, non-built-in
//! body goal. Unsafe rules would have infinite answer sets (`p(X) :- not
//! q(X, Y)` matches infinitely many `Y`), so they are rejected at
//! insertion time, before they can ever reach the evaluator.

use crate::ast::{Atom, Rule, Term};
use crate::error::{DatalogError, DatalogResult};
use std::collections::HashSet;

/// Validate a rule, walking the body left to right.
///
/// Only positive, non-built-in goals add to the set of safely bound
/// variables. Because rule bodies are normalized at construction (positive
/// goals first), a rule that is safe in any goal order is accepted.
pub fn validate_rule(rule: &Rule) -> DatalogResult<()> {
    let mut safe: HashSet<&str> = HashSet::new();

    for goal in &rule.body {
        if goal.is_builtin() {
            if goal.arity() != 2 {
                return Err(DatalogError::UnsafeRule(format!(
                    "operator {} must have exactly two operands",
                    goal.predicate
                )));
            }
            let a = &goal.terms[0];
            let b = &goal.terms[1];
            if goal.predicate == "=" {
                // '=' can bind one side, so only both-unbound is an error.
                if is_unbound(a, &safe) && is_unbound(b, &safe) {
                    return Err(DatalogError::UnsafeRule(format!(
                        "both variables of '=' are unbound in clause {a} = {b}"
                    )));
                }
            } else {
                for operand in [a, b] {
                    if is_unbound(operand, &safe) {
                        return Err(DatalogError::UnsafeRule(format!(
                            "unbound variable {operand} in {goal}"
                        )));
                    }
                }
            }
        }
        if goal.negated {
            for term in &goal.terms {
                if is_unbound(term, &safe) {
                    return Err(DatalogError::UnsafeRule(format!(
                        "variable {term} of rule {rule} must appear in at least one positive expression"
                    )));
                }
            }
        } else if !goal.is_builtin() {
            for term in &goal.terms {
                if let Term::Variable(var) = term {
                    safe.insert(var);
                }
            }
        }
    }

    for term in &rule.head.terms {
        match term {
            Term::Constant(_) => {
                return Err(DatalogError::UnsafeRule(format!(
                    "constant {term} in head of rule {rule}"
                )));
            }
            Term::Variable(var) => {
                if !safe.contains(var.as_str()) {
                    return Err(DatalogError::UnsafeRule(format!(
                        "variable {term} from the head of rule {rule} must appear in the body"
                    )));
                }
            }
        }
    }

    Ok(())
}

fn is_unbound(term: &Term, safe: &HashSet<&str>) -> bool {
    term.is_variable() && !safe.contains(term.as_str())
}

/// Validate a fact destined for the EDB: it must be ground and positive.
pub fn validate_fact(fact: &Atom) -> DatalogResult<()> {
    if !fact.is_ground() {
        return Err(DatalogError::InvalidFact(format!("fact {fact} is not ground")));
    }
    if fact.negated {
        return Err(DatalogError::InvalidFact(format!("fact {fact} is negated")));
    }
    Ok(())
}
