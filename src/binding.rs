//! # Binding Overlay
//!
//! Variable bindings produced and consumed during unification and goal
//! matching. The recursive matcher runs one [`Overlay`] frame per branch of
//! the search: reads fall through to the parent frame, writes stay local, so
//! sibling branches never observe each other's bindings and nothing is
//! copied until an answer is materialized with [`Overlay::flatten`].

use crate::ast::Term;
use std::collections::HashMap;

/// A complete mapping from variable name to bound value.
///
/// This is the flattened form handed back to callers as a query answer.
pub type Binding = HashMap<String, Term>;

/// Read access to variable bindings.
///
/// Implemented by both the flat [`Binding`] map and the chained [`Overlay`]
/// so that substitution works the same against either.
pub trait Lookup {
    /// Look up the value bound to `var`, if any.
    fn lookup(&self, var: &str) -> Option<&Term>;
}

impl Lookup for Binding {
    fn lookup(&self, var: &str) -> Option<&Term> {
        self.get(var)
    }
}

/// A chained binding frame.
///
/// Writes always go to the local frame; reads consult the local frame first
/// and then fall through the parent chain. A parent frame is never mutated
/// through its children.
#[derive(Debug, Default)]
pub struct Overlay<'a> {
    local: HashMap<String, Term>,
    parent: Option<&'a Overlay<'a>>,
}

impl<'a> Overlay<'a> {
    /// An empty root frame.
    pub fn root() -> Overlay<'static> {
        Overlay {
            local: HashMap::new(),
            parent: None,
        }
    }

    /// A root frame seeded from a caller-supplied binding.
    pub fn seeded(binding: &Binding) -> Overlay<'static> {
        Overlay {
            local: binding.clone(),
            parent: None,
        }
    }

    /// A fresh empty frame layered over `self`.
    pub fn child(&'a self) -> Overlay<'a> {
        Overlay {
            local: HashMap::new(),
            parent: Some(self),
        }
    }

    /// Read through the frame chain.
    pub fn get(&self, var: &str) -> Option<&Term> {
        match self.local.get(var) {
            Some(value) => Some(value),
            None => self.parent.and_then(|p| p.get(var)),
        }
    }

    /// Whether `var` is bound anywhere in the chain.
    pub fn contains(&self, var: &str) -> bool {
        self.get(var).is_some()
    }

    /// Bind `var` in the local frame, shadowing any parent binding.
    pub fn bind(&mut self, var: impl Into<String>, value: Term) {
        self.local.insert(var.into(), value);
    }

    /// Collapse the chain into a flat binding map.
    ///
    /// Local frames shadow their parents, matching read-through order.
    pub fn flatten(&self) -> Binding {
        let mut flat = match self.parent {
            Some(parent) => parent.flatten(),
            None => Binding::new(),
        };
        for (var, value) in &self.local {
            flat.insert(var.clone(), value.clone());
        }
        flat
    }
}

impl Lookup for Overlay<'_> {
    fn lookup(&self, var: &str) -> Option<&Term> {
        self.get(var)
    }
}
