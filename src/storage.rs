//! # Fact Storage Backends
//!
//! The interpreter's extensional database (EDB) sits behind the
//! [`FactStorage`] trait so facts can come from places other than process
//! memory. The default [`MemoryStorage`] keeps everything in an indexed
//! in-memory set; it can also snapshot itself to a JSON file and load it
//! back, which is a convenience for the REPL rather than a durability
//! layer.
//!
//! Backends must uphold the ground-fact invariant: only ground,
//! non-negated atoms are ever handed to [`FactStorage::add`] (the
//! interpreter validates before it stores), and a backend must never
//! return anything else.

use crate::ast::Atom;
use crate::error::DatalogResult;
use crate::facts::FactSet;
use std::fs;
use std::path::Path;

/// Contract between the interpreter and an EDB backend.
pub trait FactStorage {
    /// Every fact in the database.
    fn all_facts(&self) -> Vec<Atom>;

    /// Add a fact. Duplicates are ignored.
    fn add(&mut self, fact: Atom);

    /// Remove every listed fact; returns true if anything was removed.
    fn remove_all(&mut self, facts: &[Atom]) -> bool;

    /// All facts stored under `predicate`.
    fn facts_for(&self, predicate: &str) -> Vec<Atom>;
}

/// The default in-memory backend.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    facts: FactSet,
}

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage::default()
    }

    /// Snapshot the EDB to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> DatalogResult<()> {
        let facts: Vec<&Atom> = self.facts.iter().collect();
        let json = serde_json::to_string_pretty(&facts)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load an EDB snapshot written by [`MemoryStorage::save`].
    pub fn load(path: impl AsRef<Path>) -> DatalogResult<Self> {
        let json = fs::read_to_string(path)?;
        let facts: Vec<Atom> = serde_json::from_str(&json)?;
        Ok(MemoryStorage {
            facts: facts.into_iter().collect(),
        })
    }
}

impl FactStorage for MemoryStorage {
    fn all_facts(&self) -> Vec<Atom> {
        self.facts.iter().cloned().collect()
    }

    fn add(&mut self, fact: Atom) {
        self.facts.insert(fact);
    }

    fn remove_all(&mut self, facts: &[Atom]) -> bool {
        self.facts.remove_all(facts)
    }

    fn facts_for(&self, predicate: &str) -> Vec<Atom> {
        self.facts.facts_for(predicate).cloned().collect()
    }
}
