//! # Stratification
//!
//! Splits the IDB into strata so negation is always evaluated against a
//! fully computed lower stratum. A predicate's stratum is one more than
//! the highest stratum it reaches through a negated body goal; a cycle
//! that passes through negation has no consistent assignment and the
//! program is rejected.
//!
//! The search is a depth-first walk of the rule graph with an explicit
//! visit path. When the walk returns to a predicate already on the path,
//! the cycle is benign (stratum 0 contribution) unless some edge on that
//! loop was negated, in which case the path is formatted into a route
//! diagnostic and reported as a stratification failure.

use crate::ast::Rule;
use crate::error::{DatalogError, DatalogResult};
use std::collections::HashMap;
use std::fmt::Write as _;
use tracing::debug;

/// Partition `rules` into strata, lowest first.
///
/// Every rule lands in the stratum of its head predicate. The returned
/// partition carries one extra trailing stratum holding the whole rule
/// set; the evaluator runs it last to catch any derivation the layered
/// passes could still enable.
pub fn compute_stratification(rules: &[Rule]) -> DatalogResult<Vec<Vec<Rule>>> {
    let mut strata: Vec<Vec<Rule>> = Vec::new();
    let mut assigned: HashMap<&str, usize> = HashMap::new();

    for rule in rules {
        let predicate = rule.head.predicate.as_str();
        let stratum = match assigned.get(predicate) {
            Some(&stratum) => stratum,
            None => {
                let mut path = Vec::new();
                let stratum = depth_first_search(predicate, false, rules, &mut path)?;
                debug!(predicate, stratum, "assigned stratum");
                assigned.insert(predicate, stratum);
                stratum
            }
        };

        while stratum >= strata.len() {
            strata.push(Vec::new());
        }
        strata[stratum].push(rule.clone());
    }

    strata.push(rules.to_vec());
    Ok(strata)
}

/// One step on the visit path: the predicate reached and whether the edge
/// into it was negated.
type PathEdge<'a> = (&'a str, bool);

fn depth_first_search<'a>(
    predicate: &'a str,
    negated: bool,
    rules: &'a [Rule],
    path: &mut Vec<PathEdge<'a>>,
) -> DatalogResult<usize> {
    // Walk back along the path; revisiting this predicate closes a cycle.
    // Any negated edge between here and the earlier visit makes it a
    // negative cycle.
    let mut through_negation = negated;
    let mut route = predicate.to_string();
    for &(seen, seen_negated) in path.iter().rev() {
        let _ = write!(route, " <- {}{seen}", if seen_negated { "~" } else { "" });
        if seen == predicate {
            if through_negation {
                return Err(DatalogError::NotStratified {
                    predicate: predicate.to_string(),
                    route,
                });
            }
            return Ok(0);
        }
        if seen_negated {
            through_negation = true;
        }
    }

    path.push((predicate, negated));
    let mut max = 0;
    for rule in rules {
        if rule.head.predicate == predicate {
            for goal in &rule.body {
                let mut reached =
                    depth_first_search(&goal.predicate, goal.negated, rules, path)?;
                if goal.negated {
                    reached += 1;
                }
                max = max.max(reached);
            }
        }
    }
    path.pop();

    Ok(max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builders::{expr, not, rule};

    #[test]
    fn purely_positive_program_is_one_stratum() {
        let rules = vec![
            rule(expr("path", &["X", "Y"]), vec![expr("edge", &["X", "Y"])]),
            rule(
                expr("path", &["X", "Z"]),
                vec![expr("edge", &["X", "Y"]), expr("path", &["Y", "Z"])],
            ),
        ];
        let strata = compute_stratification(&rules).unwrap();
        // One real stratum plus the trailing catch-all pass.
        assert_eq!(strata.len(), 2);
        assert_eq!(strata[0].len(), 2);
        assert_eq!(strata[1].len(), 2);
    }

    #[test]
    fn negation_lifts_the_dependent_predicate() {
        let rules = vec![
            rule(expr("reachable", &["X"]), vec![expr("edge", &["a", "X"])]),
            rule(
                expr("unreachable", &["X"]),
                vec![expr("node", &["X"]), not("reachable", &["X"])],
            ),
        ];
        let strata = compute_stratification(&rules).unwrap();
        assert_eq!(strata.len(), 3);
        assert_eq!(strata[0][0].head.predicate, "reachable");
        assert_eq!(strata[1][0].head.predicate, "unreachable");
    }

    #[test]
    fn rejects_direct_negative_recursion() {
        let rules = vec![rule(
            expr("p", &["X"]),
            vec![expr("q", &["X"]), not("p", &["X"])],
        )];
        let err = compute_stratification(&rules).unwrap_err();
        match err {
            DatalogError::NotStratified { predicate, route } => {
                assert_eq!(predicate, "p");
                assert!(route.starts_with("p <- "));
            }
            other => panic!("expected NotStratified, got {other}"),
        }
    }

    #[test]
    fn rejects_negative_cycle_through_intermediate_predicate() {
        // p depends on ~q, q depends on p: a two-step negative loop.
        let rules = vec![
            rule(expr("p", &["X"]), vec![expr("r", &["X"]), not("q", &["X"])]),
            rule(expr("q", &["X"]), vec![expr("p", &["X"])]),
        ];
        let err = compute_stratification(&rules).unwrap_err();
        assert!(matches!(err, DatalogError::NotStratified { .. }));
    }

    #[test]
    fn accepts_positive_recursion_alongside_negation() {
        let rules = vec![
            rule(expr("path", &["X", "Y"]), vec![expr("edge", &["X", "Y"])]),
            rule(
                expr("path", &["X", "Z"]),
                vec![expr("edge", &["X", "Y"]), expr("path", &["Y", "Z"])],
            ),
            rule(
                expr("cut", &["X", "Y"]),
                vec![expr("node", &["X"]), expr("node", &["Y"]), not("path", &["X", "Y"])],
            ),
        ];
        let strata = compute_stratification(&rules).unwrap();
        assert_eq!(strata.len(), 3);
        assert!(strata[0].iter().all(|r| r.head.predicate == "path"));
        assert_eq!(strata[1][0].head.predicate, "cut");
    }
}
