//! # Bottom-Up Evaluation Engine
//!
//! Answers a query in four phases:
//!
//! 1. prune the IDB and EDB down to the predicates reachable from the
//!    query goals,
//! 2. stratify the surviving rules (see [`crate::stratify`]),
//! 3. expand the fact set stratum by stratum with a semi-naive fixpoint
//!    loop, and
//! 4. match the (reordered) query goals against the expanded set.
//!
//! Derivation is monotone within a stratum, so the semi-naive loop only
//! re-fires the rules whose body predicates gained facts in the previous
//! round.

use crate::ast::{Atom, Rule};
use crate::binding::{Binding, Overlay};
use crate::error::DatalogResult;
use crate::facts::FactSet;
use crate::storage::FactStorage;
use crate::stratify::compute_stratification;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, trace};

// ============================================================================
// Goal ordering
// ============================================================================

/// Move negated and comparison goals to the end of a body, keeping the
/// relative order within each group.
///
/// A goal like `not b(X)` or `X > 2` can only be evaluated once `X` is
/// bound, so every positive database goal runs first. The `=` operator is
/// the exception: it produces bindings itself, so it stays where the
/// author put it.
pub fn reorder_goals(goals: &[Atom]) -> Vec<Atom> {
    let deferred = |goal: &Atom| goal.negated || (goal.is_builtin() && goal.predicate != "=");
    let mut ordered: Vec<Atom> = goals.iter().filter(|g| !deferred(g)).cloned().collect();
    ordered.extend(goals.iter().filter(|g| deferred(g)).cloned());
    ordered
}

// ============================================================================
// Relevance pruning
// ============================================================================

/// The predicates reachable from `goals` through the rule graph.
///
/// Breadth-first over rule bodies: a query about reachability should not
/// pull in (or expand) unrelated rule families. Negated goals count as
/// reachable like any other; their predicates must be fully derived for
/// negation-as-failure to be sound.
pub fn relevant_predicates(rules: &[Rule], goals: &[Atom]) -> HashSet<String> {
    let mut relevant: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<&Atom> = goals.iter().collect();
    while let Some(goal) = queue.pop_front() {
        if relevant.insert(goal.predicate.clone()) {
            for rule in rules {
                if rule.head.predicate == goal.predicate {
                    queue.extend(rule.body.iter());
                }
            }
        }
    }
    relevant
}

/// Map each body predicate to the rules that mention it, deduplicated.
/// Drives the semi-naive loop: when a predicate gains facts, exactly these
/// rules can derive something new.
fn build_dependent_rules(rules: &[Rule]) -> HashMap<&str, Vec<&Rule>> {
    let mut map: HashMap<&str, Vec<&Rule>> = HashMap::new();
    for rule in rules {
        for goal in &rule.body {
            let dependants = map.entry(goal.predicate.as_str()).or_default();
            if !dependants.iter().any(|existing| *existing == rule) {
                dependants.push(rule);
            }
        }
    }
    map
}

// ============================================================================
// Fixpoint expansion
// ============================================================================

/// Expand `facts` with everything derivable from `rules`, stratum by
/// stratum.
pub fn expand_database(facts: &mut FactSet, rules: &[Rule]) -> DatalogResult<()> {
    let strata = compute_stratification(rules)?;
    for stratum in &strata {
        expand_stratum(facts, stratum)?;
    }
    Ok(())
}

/// The semi-naive fixpoint loop for a single stratum: fire every rule,
/// fold the derived facts in, then repeat with only the rules dependent
/// on what was new, until a round derives nothing.
fn expand_stratum(facts: &mut FactSet, stratum: &[Rule]) -> DatalogResult<()> {
    if stratum.is_empty() {
        return Ok(());
    }

    let dependents = build_dependent_rules(stratum);
    let mut active: Vec<&Rule> = stratum.iter().collect();

    loop {
        let mut derived = FactSet::new();
        for rule in &active {
            for fact in match_rule(facts, rule)? {
                derived.insert(fact);
            }
        }

        if derived.is_empty() {
            return Ok(());
        }
        trace!(new_facts = derived.len(), "fixpoint round");

        let mut reactivated: HashSet<&Rule> = HashSet::new();
        for predicate in derived.predicates() {
            if let Some(rules) = dependents.get(predicate) {
                reactivated.extend(rules.iter().copied());
            }
        }
        active = reactivated.into_iter().collect();

        facts.merge(derived);
    }
}

/// Fire a single rule against the fact set, returning the head instances
/// it derives that are not already known.
fn match_rule(facts: &FactSet, rule: &Rule) -> DatalogResult<Vec<Atom>> {
    if rule.body.is_empty() {
        return Ok(Vec::new());
    }
    let answers = match_goals(&rule.body, facts, &Overlay::root())?;
    Ok(answers
        .iter()
        .map(|answer| rule.head.substitute(answer))
        .filter(|derived| !facts.contains(derived))
        .collect())
}

// ============================================================================
// Goal matching
// ============================================================================

/// Match a goal list against the fact set, depth-first, threading the
/// bindings through an [`Overlay`] chain so backtracking never mutates a
/// parent frame.
///
/// Positive goals unify against the candidate facts of their predicate.
/// Negated goals are negation-as-failure: the goal is first substituted
/// with the current bindings, and if any fact unifies with it the whole
/// branch dies; otherwise matching continues with the bindings unchanged.
/// Built-in goals evaluate in a child frame so `=` can contribute a
/// binding.
pub fn match_goals(
    goals: &[Atom],
    facts: &FactSet,
    bindings: &Overlay<'_>,
) -> DatalogResult<Vec<Binding>> {
    let (goal, rest) = match goals.split_first() {
        Some(split) => split,
        None => return Ok(Vec::new()),
    };

    if goal.is_builtin() {
        let mut frame = bindings.child();
        let holds = goal.eval_builtin(&mut frame)?;
        if holds != goal.negated {
            if rest.is_empty() {
                return Ok(vec![frame.flatten()]);
            }
            return match_goals(rest, facts, &frame);
        }
        return Ok(Vec::new());
    }

    let mut answers = Vec::new();
    if !goal.negated {
        for fact in facts.facts_for(&goal.predicate) {
            let mut frame = bindings.child();
            if fact.unify(goal, &mut frame) {
                if rest.is_empty() {
                    answers.push(frame.flatten());
                } else {
                    answers.extend(match_goals(rest, facts, &frame)?);
                }
            }
        }
    } else {
        // Ground the goal as far as the current bindings allow, then look
        // for a counterexample.
        let grounded = goal.substitute(bindings);
        for fact in facts.facts_for(&grounded.predicate) {
            let mut frame = bindings.child();
            if fact.unify(&grounded, &mut frame) {
                return Ok(Vec::new());
            }
        }
        if rest.is_empty() {
            answers.push(bindings.flatten());
        } else {
            answers.extend(match_goals(rest, facts, bindings)?);
        }
    }
    Ok(answers)
}

// ============================================================================
// Query entry point
// ============================================================================

/// Answer `goals` against the stored facts and the rule set, optionally
/// seeded with pre-existing bindings.
///
/// Returns one binding map per answer; a query whose goals are all ground
/// yields an empty map per proof found. An empty goal list has no
/// answers.
pub fn query<S: FactStorage + ?Sized>(
    storage: &S,
    idb: &[Rule],
    goals: &[Atom],
    bindings: Option<&Binding>,
) -> DatalogResult<Vec<Binding>> {
    if goals.is_empty() {
        return Ok(Vec::new());
    }

    let ordered = reorder_goals(goals);

    let relevant = relevant_predicates(idb, goals);
    let rules: Vec<Rule> = idb
        .iter()
        .filter(|rule| relevant.contains(&rule.head.predicate))
        .cloned()
        .collect();

    let mut facts = FactSet::new();
    for predicate in &relevant {
        facts.extend(storage.facts_for(predicate));
    }
    debug!(
        goals = goals.len(),
        relevant = relevant.len(),
        rules = rules.len(),
        base_facts = facts.len(),
        "evaluating query"
    );

    expand_database(&mut facts, &rules)?;

    let seed = match bindings {
        Some(seed) => Overlay::seeded(seed),
        None => Overlay::root(),
    };
    match_goals(&ordered, &facts, &seed)
}
