//! # Indexed Fact Set
//!
//! The working set of the evaluator: a set of ground atoms with structural
//! deduplication, indexed by predicate name so goal matching can fetch all
//! candidate facts for a predicate without scanning the whole database.

use crate::ast::Atom;
use std::collections::{HashMap, HashSet};

/// A set of facts indexed by predicate.
///
/// Membership and per-predicate retrieval are both O(1) amortized. The
/// index also exposes the set of predicates currently present, which drives
/// dependent-rule reactivation during semi-naive iteration.
#[derive(Debug, Clone, Default)]
pub struct FactSet {
    facts: HashSet<Atom>,
    index: HashMap<String, HashSet<Atom>>,
}

impl FactSet {
    pub fn new() -> Self {
        FactSet::default()
    }

    /// Insert a fact; returns false if it was already present.
    pub fn insert(&mut self, fact: Atom) -> bool {
        if !self.facts.insert(fact.clone()) {
            return false;
        }
        self.index.entry(fact.predicate.clone()).or_default().insert(fact);
        true
    }

    /// Structural membership test.
    pub fn contains(&self, fact: &Atom) -> bool {
        self.facts.contains(fact)
    }

    /// Remove every listed fact; returns true if anything was removed.
    pub fn remove_all<'a>(&mut self, facts: impl IntoIterator<Item = &'a Atom>) -> bool {
        let mut removed = false;
        for fact in facts {
            if self.facts.remove(fact) {
                removed = true;
                if let Some(bucket) = self.index.get_mut(&fact.predicate) {
                    bucket.remove(fact);
                    if bucket.is_empty() {
                        self.index.remove(&fact.predicate);
                    }
                }
            }
        }
        removed
    }

    /// All facts stored under `predicate`.
    pub fn facts_for(&self, predicate: &str) -> impl Iterator<Item = &Atom> {
        self.index.get(predicate).into_iter().flatten()
    }

    /// The predicates that currently have at least one fact.
    pub fn predicates(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Atom> {
        self.facts.iter()
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Absorb every fact of `other`.
    pub fn merge(&mut self, other: FactSet) {
        for fact in other.facts {
            self.insert(fact);
        }
    }
}

impl Extend<Atom> for FactSet {
    fn extend<T: IntoIterator<Item = Atom>>(&mut self, iter: T) {
        for fact in iter {
            self.insert(fact);
        }
    }
}

impl FromIterator<Atom> for FactSet {
    fn from_iter<T: IntoIterator<Item = Atom>>(iter: T) -> Self {
        let mut set = FactSet::new();
        set.extend(iter);
        set
    }
}
