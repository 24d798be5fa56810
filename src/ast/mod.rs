//! # Term, Atom and Rule Model
//!
//! The term model is deliberately flat: a term is an atomic string, and
//! whether it is a variable is derived purely from the naming convention
//! (first character uppercase). There are no function symbols, lists or
//! nested terms. Quoted string literals and numerals keep their surface
//! form so that programs round-trip through [`Display`](std::fmt::Display).
//!
//! ## Builders
//!
//! For programmatic construction of atoms and rules, see the [`builders`]
//! module which mirrors the textual syntax: `expr`, `not`, `eq`, `lt`, ...

use crate::binding::{Binding, Lookup, Overlay};
use crate::error::{DatalogError, DatalogResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

pub mod builders;

// ============================================================================
// Term
// ============================================================================

/// A single atomic term: either a variable or a constant.
///
/// The tag is decided once at construction: a term is a variable iff its
/// first character is uppercase. Constants cover bare atoms (`alice`),
/// numerals (`42`, `-3.5`) and quoted strings; a quoted string is stored
/// with a leading `"` marker so its display form stays quoted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Term {
    Variable(String),
    Constant(String),
}

impl Term {
    /// Classify `text` by the variable naming convention.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.chars().next().is_some_and(char::is_uppercase) {
            Term::Variable(text)
        } else {
            Term::Constant(text)
        }
    }

    /// Build a constant for a quoted string literal, keeping the `"` marker.
    pub fn quoted(content: impl AsRef<str>) -> Self {
        Term::Constant(format!("\"{}", content.as_ref()))
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Variable(_))
    }

    /// The raw string form (including any `"` marker on quoted constants).
    pub fn as_str(&self) -> &str {
        match self {
            Term::Variable(s) | Term::Constant(s) => s,
        }
    }

    /// Numeric view used by the comparison built-ins.
    pub fn as_number(&self) -> Option<f64> {
        self.as_str().parse::<f64>().ok()
    }
}

impl From<String> for Term {
    fn from(text: String) -> Self {
        Term::new(text)
    }
}

impl From<Term> for String {
    fn from(term: Term) -> Self {
        match term {
            Term::Variable(s) | Term::Constant(s) => s,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.as_str();
        if let Some(content) = text.strip_prefix('"') {
            write!(f, "\"{}\"", content.replace('"', "\\\""))
        } else {
            f.write_str(text)
        }
    }
}

// ============================================================================
// Atom
// ============================================================================

/// A predicate applied to terms, with an optional negation flag.
///
/// Equality is structural: predicate, negation, arity and terms must match
/// positionally. This is what makes the fact store a true set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Atom {
    pub predicate: String,
    pub terms: Vec<Term>,
    pub negated: bool,
}

impl Atom {
    /// Create a positive atom. `!=` is canonicalized to `<>` so the rest of
    /// the engine only ever sees one spelling of not-equals.
    pub fn new(predicate: impl Into<String>, terms: Vec<Term>) -> Self {
        let mut predicate = predicate.into();
        if predicate == "!=" {
            predicate = "<>".to_string();
        }
        Atom {
            predicate,
            terms,
            negated: false,
        }
    }

    /// Consume `self` and return its negation.
    pub fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    pub fn arity(&self) -> usize {
        self.terms.len()
    }

    /// An atom is ground iff it contains no variables.
    pub fn is_ground(&self) -> bool {
        !self.terms.iter().any(Term::is_variable)
    }

    /// Built-in operators (`=`, `<>`, `<`, `<=`, `>`, `>=`) are recognized
    /// by their leading character: not alphanumeric and not a quote.
    pub fn is_builtin(&self) -> bool {
        self.predicate
            .chars()
            .next()
            .is_some_and(|op| !op.is_alphanumeric() && op != '"')
    }

    /// Names of all variables occurring in this atom.
    pub fn variables(&self) -> HashSet<&str> {
        self.terms
            .iter()
            .filter(|t| t.is_variable())
            .map(Term::as_str)
            .collect()
    }

    /// Unify this atom with `that`, extending `bindings` in place.
    ///
    /// Requires equal predicate and arity. Terms are compared left to right
    /// and the first conflict aborts with `false`; bindings made before the
    /// conflict stay in the overlay, which is why callers hand in a scratch
    /// child frame they can discard.
    pub fn unify(&self, that: &Atom, bindings: &mut Overlay<'_>) -> bool {
        if self.predicate != that.predicate || self.arity() != that.arity() {
            return false;
        }
        for (term1, term2) in self.terms.iter().zip(&that.terms) {
            if let Term::Variable(var1) = term1 {
                // The same variable on both sides unifies without binding.
                if term1 != term2 {
                    match bindings.get(var1) {
                        None => bindings.bind(var1.clone(), term2.clone()),
                        Some(bound) if bound != term2 => return false,
                        Some(_) => {}
                    }
                }
            } else if let Term::Variable(var2) = term2 {
                match bindings.get(var2) {
                    None => bindings.bind(var2.clone(), term1.clone()),
                    Some(bound) if bound != term1 => return false,
                    Some(_) => {}
                }
            } else if term1 != term2 {
                return false;
            }
        }
        true
    }

    /// Unify against a fresh frame, returning the resulting binding map.
    pub fn unify_new(&self, that: &Atom) -> Option<Binding> {
        let mut bindings = Overlay::root();
        if self.unify(that, &mut bindings) {
            Some(bindings.flatten())
        } else {
            None
        }
    }

    /// Replace every bound variable with its value, leaving unbound
    /// variables untouched. Preserves the negation flag; never mutates
    /// `self`.
    pub fn substitute<L: Lookup>(&self, bindings: &L) -> Atom {
        let terms = self
            .terms
            .iter()
            .map(|term| match term {
                Term::Variable(var) => bindings.lookup(var).cloned().unwrap_or_else(|| term.clone()),
                Term::Constant(_) => term.clone(),
            })
            .collect();
        Atom {
            predicate: self.predicate.clone(),
            terms,
            negated: self.negated,
        }
    }

    /// Evaluate a binary built-in under `bindings`.
    ///
    /// `=` may bind a single unbound operand. The comparison operators
    /// require both operands bound; hitting an unbound operand here means
    /// the safety validator was bypassed, which is reported as an internal
    /// invariant violation rather than a user error.
    ///
    /// Ordering operators treat a non-numeric operand as `0.0`; existing
    /// programs rely on this, so the tests pin it down.
    pub fn eval_builtin(&self, bindings: &mut Overlay<'_>) -> DatalogResult<bool> {
        if self.terms.len() != 2 {
            return Err(DatalogError::Internal(format!(
                "built-in {} evaluated with arity {}",
                self.predicate,
                self.terms.len()
            )));
        }
        let resolve = |term: &Term, bindings: &Overlay<'_>| -> Term {
            match term {
                Term::Variable(var) => bindings.get(var).cloned().unwrap_or_else(|| term.clone()),
                Term::Constant(_) => term.clone(),
            }
        };
        let term1 = resolve(&self.terms[0], bindings);
        let term2 = resolve(&self.terms[1], bindings);

        if self.predicate == "=" {
            // '=' is special: it can bind one side.
            return match (&term1, &term2) {
                (Term::Variable(var1), Term::Variable(var2)) => Err(DatalogError::Internal(format!(
                    "both operands of '=' are unbound ({var1}, {var2}) in evaluation of {self}"
                ))),
                (Term::Variable(var1), value) => {
                    bindings.bind(var1.clone(), value.clone());
                    Ok(true)
                }
                (value, Term::Variable(var2)) => {
                    bindings.bind(var2.clone(), value.clone());
                    Ok(true)
                }
                (a, b) => Ok(match (a.as_number(), b.as_number()) {
                    (Some(d1), Some(d2)) => d1 == d2,
                    _ => a.as_str() == b.as_str(),
                }),
            };
        }

        if term1.is_variable() || term2.is_variable() {
            return Err(DatalogError::Internal(format!(
                "unbound variable in evaluation of {self}"
            )));
        }

        if self.predicate == "<>" {
            // '<>' falls back to string inequality for non-numeric operands.
            return Ok(match (term1.as_number(), term2.as_number()) {
                (Some(d1), Some(d2)) => d1 != d2,
                _ => term1.as_str() != term2.as_str(),
            });
        }

        let d1 = term1.as_number().unwrap_or(0.0);
        let d2 = term2.as_number().unwrap_or(0.0);
        match self.predicate.as_str() {
            "<" => Ok(d1 < d2),
            "<=" => Ok(d1 <= d2),
            ">" => Ok(d1 > d2),
            ">=" => Ok(d1 >= d2),
            other => Err(DatalogError::Internal(format!(
                "unimplemented built-in predicate {other}"
            ))),
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "not ")?;
        }
        if self.is_builtin() && self.terms.len() == 2 {
            write!(f, "{} {} {}", self.terms[0], self.predicate, self.terms[1])
        } else {
            write!(f, "{}(", self.predicate)?;
            for (i, term) in self.terms.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{term}")?;
            }
            write!(f, ")")
        }
    }
}

// ============================================================================
// Rule
// ============================================================================

/// A Datalog rule `head :- body`.
///
/// The body is normalized at construction so that positive, non-built-in
/// goals come before negated and comparison goals; see
/// [`crate::engine::reorder_goals`] for why evaluation needs this order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    pub head: Atom,
    pub body: Vec<Atom>,
}

impl Rule {
    pub fn new(head: Atom, body: Vec<Atom>) -> Self {
        Rule {
            head,
            body: crate::engine::reorder_goals(&body),
        }
    }

    /// A new rule with `bindings` substituted into the head and every body
    /// goal. Used for parameterized statement templates.
    pub fn substitute(&self, bindings: &Binding) -> Rule {
        Rule::new(
            self.head.substitute(bindings),
            self.body.iter().map(|goal| goal.substitute(bindings)).collect(),
        )
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} :- ", self.head)?;
        for (i, goal) in self.body.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{goal}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::builders::{eq, expr, gt, not};
    use super::*;

    #[test]
    fn term_classification_follows_case_convention() {
        assert!(Term::new("X").is_variable());
        assert!(Term::new("Xyz").is_variable());
        assert!(!Term::new("x").is_variable());
        assert!(!Term::new("42").is_variable());
        assert!(!Term::new("\"Quoted\"").is_variable());
    }

    #[test]
    fn quoted_constants_round_trip_through_display() {
        let term = Term::quoted("hello \"world\"");
        assert_eq!(term.to_string(), "\"hello \\\"world\\\"\"");
    }

    #[test]
    fn not_equals_is_canonicalized() {
        let atom = Atom::new("!=", vec![Term::new("X"), Term::new("1")]);
        assert_eq!(atom.predicate, "<>");
        assert!(atom.is_builtin());
    }

    #[test]
    fn builtin_detection() {
        assert!(expr("=", &["X", "1"]).is_builtin());
        assert!(expr("<=", &["X", "Y"]).is_builtin());
        assert!(!expr("p", &["X"]).is_builtin());
        assert!(!expr("p2", &["X"]).is_builtin());
    }

    #[test]
    fn unify_binds_variables_to_constants() {
        let fact = expr("p", &["a", "b"]);
        let goal = expr("p", &["X", "b"]);
        let binding = fact.unify_new(&goal).unwrap();
        assert_eq!(binding.get("X"), Some(&Term::new("a")));
        assert_eq!(binding.len(), 1);
    }

    #[test]
    fn unify_allows_coinciding_constants_for_distinct_variables() {
        let fact = expr("p", &["a", "a"]);
        let goal = expr("p", &["X", "Y"]);
        let binding = fact.unify_new(&goal).unwrap();
        assert_eq!(binding.get("X"), Some(&Term::new("a")));
        assert_eq!(binding.get("Y"), Some(&Term::new("a")));
    }

    #[test]
    fn unify_fails_on_conflicting_binding() {
        let fact = expr("p", &["a", "b"]);
        let goal = expr("p", &["X", "X"]);
        assert!(fact.unify_new(&goal).is_none());
    }

    #[test]
    fn unify_fails_on_predicate_or_arity_mismatch() {
        assert!(expr("p", &["a"]).unify_new(&expr("q", &["a"])).is_none());
        assert!(expr("p", &["a"]).unify_new(&expr("p", &["a", "b"])).is_none());
    }

    #[test]
    fn unify_same_variable_both_sides_binds_nothing() {
        let binding = expr("p", &["X"]).unify_new(&expr("p", &["X"])).unwrap();
        assert!(binding.is_empty());
    }

    #[test]
    fn substitute_replaces_bound_and_keeps_unbound() {
        let goal = not("q", &["X", "Y"]);
        let mut bindings = Binding::new();
        bindings.insert("X".to_string(), Term::new("a"));
        let result = goal.substitute(&bindings);
        assert_eq!(result, not("q", &["a", "Y"]));
        assert!(result.negated);
        // Source is untouched.
        assert_eq!(goal.terms[0], Term::new("X"));
    }

    #[test]
    fn eval_eq_binds_single_unbound_operand() {
        let mut bindings = Overlay::root();
        assert!(eq("X", "5").eval_builtin(&mut bindings).unwrap());
        assert_eq!(bindings.get("X"), Some(&Term::new("5")));
    }

    #[test]
    fn eval_eq_compares_numerically_when_both_parse() {
        let mut bindings = Overlay::root();
        assert!(eq("1.0", "1").eval_builtin(&mut bindings).unwrap());
        assert!(!eq("a", "b").eval_builtin(&mut bindings).unwrap());
    }

    #[test]
    fn eval_eq_with_two_unbound_variables_is_internal_error() {
        let mut bindings = Overlay::root();
        let err = eq("X", "Y").eval_builtin(&mut bindings).unwrap_err();
        assert!(matches!(err, DatalogError::Internal(_)));
    }

    #[test]
    fn eval_comparison_with_unbound_operand_is_internal_error() {
        let mut bindings = Overlay::root();
        let err = gt("X", "1").eval_builtin(&mut bindings).unwrap_err();
        assert!(matches!(err, DatalogError::Internal(_)));
    }

    #[test]
    fn ordering_treats_non_numeric_operand_as_zero() {
        // Compatibility quirk: "abc" is not a number, so it compares as 0.0.
        let mut bindings = Overlay::root();
        assert!(gt("1", "abc").eval_builtin(&mut bindings).unwrap());
        assert!(!gt("abc", "1").eval_builtin(&mut bindings).unwrap());
        assert!(!gt("abc", "xyz").eval_builtin(&mut bindings).unwrap());
    }

    #[test]
    fn display_round_trips_syntax() {
        let rule = Rule::new(
            expr("path", &["X", "Y"]),
            vec![expr("edge", &["X", "Z"]), expr("path", &["Z", "Y"])],
        );
        assert_eq!(rule.to_string(), "path(X, Y) :- edge(X, Z), path(Z, Y)");
        assert_eq!(not("q", &["X"]).to_string(), "not q(X)");
        assert_eq!(gt("X", "3").to_string(), "X > 3");
    }

    #[test]
    fn display_handles_malformed_builtin_arity() {
        // Only binary built-ins render infix; anything else falls back to
        // the prefix form instead of panicking.
        let unary = Atom::new("=", vec![Term::new("X")]);
        assert_eq!(unary.to_string(), "=(X)");
        let ternary = Atom::new("<", vec![Term::new("1"), Term::new("2"), Term::new("3")]);
        assert_eq!(ternary.to_string(), "<(1, 2, 3)");
    }
}
