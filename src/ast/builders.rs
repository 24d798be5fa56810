//! Fluent Construction Helpers
//!
//! Short constructors for building atoms, rules and bindings in code,
//! mirroring the textual syntax. Particularly useful in tests:
//!
//! ```
//! use stratalog::ast::builders::{expr, not, rule};
//!
//! let r = rule(expr("r", &["X"]), vec![expr("p", &["X"]), not("q", &["X"])]);
//! assert_eq!(r.to_string(), "r(X) :- p(X), not q(X)");
//! ```

use super::{Atom, Rule, Term};
use crate::binding::Binding;

/// A positive atom with terms classified by the naming convention.
pub fn expr(predicate: &str, terms: &[&str]) -> Atom {
    Atom::new(predicate, terms.iter().map(|term| Term::new(*term)).collect())
}

/// A negated atom, `not predicate(terms...)`.
pub fn not(predicate: &str, terms: &[&str]) -> Atom {
    expr(predicate, terms).negate()
}

/// The built-in `a = b`.
pub fn eq(a: &str, b: &str) -> Atom {
    expr("=", &[a, b])
}

/// The built-in `a <> b`.
pub fn ne(a: &str, b: &str) -> Atom {
    expr("<>", &[a, b])
}

/// The built-in `a < b`.
pub fn lt(a: &str, b: &str) -> Atom {
    expr("<", &[a, b])
}

/// The built-in `a <= b`.
pub fn le(a: &str, b: &str) -> Atom {
    expr("<=", &[a, b])
}

/// The built-in `a > b`.
pub fn gt(a: &str, b: &str) -> Atom {
    expr(">", &[a, b])
}

/// The built-in `a >= b`.
pub fn ge(a: &str, b: &str) -> Atom {
    expr(">=", &[a, b])
}

/// A rule `head :- body` (body goals are reordered as usual).
pub fn rule(head: Atom, body: Vec<Atom>) -> Rule {
    Rule::new(head, body)
}

/// A binding map from `(variable, value)` pairs.
pub fn binding(pairs: &[(&str, &str)]) -> Binding {
    pairs
        .iter()
        .map(|(var, value)| ((*var).to_string(), Term::new(*value)))
        .collect()
}
