// Copyright (C) 2026 by GiGa infosystems

//! Select a conflict-free set of moves from a list of [`Comparison`]s, see [`resolve`].

use crate::compare::{Comparison, Status};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

/// Rebind the state of `from` to `to`
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize)]
pub struct Move {
    pub from: String,
    pub to: String,
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// A deletion with matching creations that still didn't get a move.
///
/// Either it matched several unclaimed creations equally well, or every creation it matched was
/// claimed by another deletion.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Ambiguity {
    pub address: String,
    /// The creations it matched, in plan order
    pub candidates: Vec<String>,
    /// The other deletions competing for the same creations, or the ones that got them, in plan
    /// order
    pub rivals: Vec<String>,
    /// The status of the matches that were considered
    pub status: Status,
}

/// The outcome of [`resolve`]
#[derive(Clone, Default, Debug)]
pub struct Resolution {
    /// Moves in plan order of their deletions
    pub moves: Vec<Move>,
    /// Ambiguities in plan order of their deletions
    pub ambiguities: Vec<Ambiguity>,
}

impl Resolution {
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}

/// Statuses that allow a move, best first
const TIERS: [Status; 2] = [Status::Equivalent, Status::IgnoredConflicts];

/// The candidates of a deletion that no move has claimed yet
fn unclaimed<'c, 'a>(
    candidates: &[&'c Comparison<'a>],
    claimed: &BTreeMap<usize, (usize, &'a str)>,
) -> Vec<&'c Comparison<'a>> {
    candidates
        .iter()
        .copied()
        .filter(|candidate| !claimed.contains_key(&candidate.creation.position))
        .collect()
}

/// Choose moves from `comparisons`.
///
/// Pairs are considered tier by tier, [`Status::Equivalent`] first. Within a tier, the first
/// deletion in plan order with exactly one unclaimed candidate takes it, until no deletion is
/// left with a single unclaimed candidate. Deletions left with several unclaimed candidates are
/// reported as an [`Ambiguity`] and not considered in later tiers, their candidates stay
/// available. Deletions whose candidates were all claimed try the next tier, and are reported
/// as an [`Ambiguity`] if they never get a move.
pub fn resolve<'a>(comparisons: &[Comparison<'a>]) -> Resolution {
    // Deletions & creations are identified by their position in the plan, which is unique per
    // side even for replacements
    let mut done = BTreeSet::new();
    // Creation position -> the deletion that claimed it
    let mut claimed = BTreeMap::<usize, (usize, &'a str)>::new();

    let mut moves = BTreeMap::new();
    let mut ambiguities = BTreeMap::new();
    // Deletions that lost all their candidates, kept with their best tier
    let mut outbid = BTreeMap::new();

    for tier in TIERS {
        let mut by_deletion = BTreeMap::<usize, Vec<&Comparison<'a>>>::new();
        for comparison in comparisons
            .iter()
            .filter(|comparison| comparison.status() == tier)
            .filter(|comparison| !done.contains(&comparison.deletion.position))
        {
            by_deletion
                .entry(comparison.deletion.position)
                .or_default()
                .push(comparison);
        }
        for candidates in by_deletion.values_mut() {
            candidates.sort_by_key(|candidate| candidate.creation.position);
        }

        loop {
            let next = by_deletion
                .iter()
                .filter(|(position, _)| !done.contains(*position))
                .find_map(
                    |(&position, candidates)| match unclaimed(candidates, &claimed)[..] {
                        [only] => Some((position, only)),
                        _ => None,
                    },
                );
            let Some((position, only)) = next else {
                break;
            };

            let found = Move {
                from: only.deletion.address.to_owned(),
                to: only.creation.address.to_owned(),
            };
            debug!("found move {found} ({tier})");
            moves.insert(position, found);
            done.insert(position);
            outbid.remove(&position);
            claimed.insert(only.creation.position, (position, only.deletion.address));
        }

        let pending = by_deletion
            .iter()
            .filter(|(position, _)| !done.contains(*position))
            .collect::<Vec<_>>();
        for &(&position, candidates) in &pending {
            let address = candidates[0].deletion.address;
            let open = unclaimed(candidates, &claimed);

            if open.is_empty() {
                let rivals = candidates
                    .iter()
                    .filter_map(|candidate| claimed.get(&candidate.creation.position))
                    .copied()
                    .collect::<BTreeMap<_, _>>();
                outbid.entry(position).or_insert_with(|| Ambiguity {
                    address: address.to_owned(),
                    candidates: candidates
                        .iter()
                        .map(|c| c.creation.address.to_owned())
                        .collect(),
                    rivals: rivals.into_values().map(str::to_owned).collect(),
                    status: tier,
                });
                continue;
            }

            let rivals = pending
                .iter()
                .filter(|(other, _)| **other != position)
                .filter(|(_, theirs)| {
                    theirs.iter().any(|theirs| {
                        open
                            .iter()
                            .any(|ours| ours.creation.position == theirs.creation.position)
                    })
                })
                .map(|(_, theirs)| theirs[0].deletion.address.to_owned())
                .collect();
            let ambiguity = Ambiguity {
                address: address.to_owned(),
                candidates: open
                    .iter()
                    .map(|c| c.creation.address.to_owned())
                    .collect(),
                rivals,
                status: tier,
            };
            debug!("ambiguous match for {address}");
            ambiguities.insert(position, ambiguity);
            outbid.remove(&position);
            done.insert(position);
        }
    }

    for (position, ambiguity) in outbid {
        debug!("every match for {} was claimed", ambiguity.address);
        ambiguities.insert(position, ambiguity);
    }

    Resolution {
        moves: moves.into_values().collect(),
        ambiguities: ambiguities.into_values().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::AttributePath;
    use crate::plan::Resource;
    use serde_json::Value;

    static EMPTY: Value = Value::Null;

    fn resource(address: &str, position: usize) -> Resource<'_> {
        Resource {
            address,
            resource_type: "random_pet",
            attributes: &EMPTY,
            unknown: None,
            position,
        }
    }

    fn comparison<'a>(
        deletion: Resource<'a>,
        creation: Resource<'a>,
        status: Status,
    ) -> Comparison<'a> {
        let path = || AttributePath::from(vec![crate::compare::PathStep::Key("length".into())]);
        Comparison {
            deletion,
            creation,
            matched: BTreeSet::new(),
            conflicts: match status {
                Status::Conflicting => BTreeSet::from([path()]),
                _ => BTreeSet::new(),
            },
            ignored: match status {
                Status::IgnoredConflicts => BTreeSet::from([path()]),
                _ => BTreeSet::new(),
            },
        }
    }

    fn moves(resolution: &Resolution) -> Vec<(&str, &str)> {
        resolution
            .moves
            .iter()
            .map(|m| (m.from.as_str(), m.to.as_str()))
            .collect()
    }

    #[test]
    fn test_unique_pairs_become_moves() {
        let (a, b) = (resource("pet.a", 0), resource("pet.b", 1));
        let (x, y) = (resource("pet.x", 2), resource("pet.y", 3));
        let comparisons = [
            comparison(a, x, Status::Equivalent),
            comparison(a, y, Status::Conflicting),
            comparison(b, x, Status::Conflicting),
            comparison(b, y, Status::Equivalent),
        ];

        let resolution = resolve(&comparisons);
        assert_eq!(moves(&resolution), [("pet.a", "pet.x"), ("pet.b", "pet.y")]);
        assert!(resolution.ambiguities.is_empty());
    }

    #[test]
    fn test_conflicting_pairs_never_move() {
        let comparisons = [comparison(
            resource("pet.a", 0),
            resource("pet.b", 1),
            Status::Conflicting,
        )];
        let resolution = resolve(&comparisons);
        assert!(resolution.is_empty());
        assert!(resolution.ambiguities.is_empty());
    }

    #[test]
    fn test_equivalent_outranks_ignored_conflicts() {
        let a = resource("pet.a", 0);
        let (x, y) = (resource("pet.x", 1), resource("pet.y", 2));
        let comparisons = [
            comparison(a, x, Status::IgnoredConflicts),
            comparison(a, y, Status::Equivalent),
        ];

        let resolution = resolve(&comparisons);
        assert_eq!(moves(&resolution), [("pet.a", "pet.y")]);
    }

    #[test]
    fn test_ignored_conflicts_are_used_after_equivalent_ones() {
        let (a, b) = (resource("pet.a", 0), resource("pet.b", 1));
        let (x, y) = (resource("pet.x", 2), resource("pet.y", 3));
        let comparisons = [
            comparison(a, x, Status::Equivalent),
            comparison(b, x, Status::IgnoredConflicts),
            comparison(b, y, Status::IgnoredConflicts),
        ];

        // `pet.x` is taken by the equivalent match, which leaves `pet.y` for `pet.b`
        let resolution = resolve(&comparisons);
        assert_eq!(moves(&resolution), [("pet.a", "pet.x"), ("pet.b", "pet.y")]);
    }

    #[test]
    fn test_several_candidates_are_ambiguous() {
        let a = resource("pet.a", 0);
        let (x, y) = (resource("pet.x", 1), resource("pet.y", 2));
        let comparisons = [
            comparison(a, x, Status::Equivalent),
            comparison(a, y, Status::Equivalent),
        ];

        let resolution = resolve(&comparisons);
        assert!(resolution.moves.is_empty());
        assert_eq!(
            resolution.ambiguities,
            [Ambiguity {
                address: "pet.a".to_owned(),
                candidates: vec!["pet.x".to_owned(), "pet.y".to_owned()],
                rivals: Vec::new(),
                status: Status::Equivalent,
            }]
        );
    }

    #[test]
    fn test_contested_creation_goes_to_first_deletion() {
        let (a, b) = (resource("pet.a", 0), resource("pet.b", 1));
        let x = resource("pet.x", 2);
        let comparisons = [
            comparison(a, x, Status::Equivalent),
            comparison(b, x, Status::Equivalent),
        ];

        let resolution = resolve(&comparisons);
        assert_eq!(moves(&resolution), [("pet.a", "pet.x")]);
        assert_eq!(
            resolution.ambiguities,
            [Ambiguity {
                address: "pet.b".to_owned(),
                candidates: vec!["pet.x".to_owned()],
                rivals: vec!["pet.a".to_owned()],
                status: Status::Equivalent,
            }]
        );
    }

    #[test]
    fn test_single_candidates_are_taken_first() {
        // `pet.b` matches both creations, but `pet.x` is the only match for `pet.a`
        let (a, b) = (resource("pet.a", 0), resource("pet.b", 1));
        let (x, y) = (resource("pet.x", 2), resource("pet.y", 3));
        let comparisons = [
            comparison(a, x, Status::Equivalent),
            comparison(a, y, Status::Conflicting),
            comparison(b, x, Status::Equivalent),
            comparison(b, y, Status::Equivalent),
        ];

        let resolution = resolve(&comparisons);
        assert_eq!(moves(&resolution), [("pet.a", "pet.x"), ("pet.b", "pet.y")]);
        assert!(resolution.ambiguities.is_empty());
    }

    #[test]
    fn test_ambiguous_candidates_stay_available() {
        let (c, d) = (resource("pet.c", 0), resource("pet.d", 1));
        let (x, y) = (resource("pet.x", 2), resource("pet.y", 3));
        let comparisons = [
            comparison(c, x, Status::Equivalent),
            comparison(c, y, Status::Equivalent),
            comparison(d, x, Status::IgnoredConflicts),
            comparison(d, y, Status::IgnoredConflicts),
        ];

        let resolution = resolve(&comparisons);
        assert!(resolution.moves.is_empty());
        let ambiguous = resolution
            .ambiguities
            .iter()
            .map(|ambiguity| (ambiguity.address.as_str(), ambiguity.status))
            .collect::<Vec<_>>();
        assert_eq!(
            ambiguous,
            [
                ("pet.c", Status::Equivalent),
                ("pet.d", Status::IgnoredConflicts)
            ]
        );
        assert_eq!(resolution.ambiguities[1].candidates, ["pet.x", "pet.y"]);
    }

    #[test]
    fn test_outbid_deletion_tries_the_next_tier() {
        let (a, b) = (resource("pet.a", 0), resource("pet.b", 1));
        let (x, y) = (resource("pet.x", 2), resource("pet.y", 3));
        let comparisons = [
            comparison(a, x, Status::Equivalent),
            comparison(b, x, Status::Equivalent),
            comparison(b, y, Status::IgnoredConflicts),
        ];

        let resolution = resolve(&comparisons);
        assert_eq!(moves(&resolution), [("pet.a", "pet.x"), ("pet.b", "pet.y")]);
        assert!(resolution.ambiguities.is_empty());
    }

    #[test]
    fn test_new_rival_keeps_existing_move() {
        let (a, b) = (resource("pet.a", 0), resource("pet.b", 1));
        let x = resource("pet.x", 2);

        let before = [
            comparison(a, x, Status::IgnoredConflicts),
            comparison(b, x, Status::Conflicting),
        ];
        let after = [
            comparison(a, x, Status::IgnoredConflicts),
            comparison(b, x, Status::IgnoredConflicts),
        ];

        let (before, after) = (resolve(&before), resolve(&after));
        assert_eq!(moves(&before), [("pet.a", "pet.x")]);
        assert_eq!(moves(&after), [("pet.a", "pet.x")]);
        assert_eq!(after.ambiguities.len(), 1);
        assert_eq!(after.ambiguities[0].address, "pet.b");
    }

    #[test]
    fn test_every_matched_deletion_is_accounted_for() {
        let (a, b, c) = (resource("pet.a", 0), resource("pet.b", 1), resource("pet.c", 2));
        let (x, y) = (resource("pet.x", 3), resource("pet.y", 4));
        let comparisons = [
            comparison(a, x, Status::Equivalent),
            comparison(a, y, Status::Equivalent),
            comparison(b, x, Status::IgnoredConflicts),
            comparison(c, y, Status::Equivalent),
            comparison(c, x, Status::Conflicting),
        ];

        let resolution = resolve(&comparisons);
        let mut accounted = resolution
            .moves
            .iter()
            .map(|m| m.from.as_str())
            .chain(resolution.ambiguities.iter().map(|a| a.address.as_str()))
            .collect::<Vec<_>>();
        accounted.sort_unstable();
        assert_eq!(accounted, ["pet.a", "pet.b", "pet.c"]);
        assert_eq!(moves(&resolution), [("pet.a", "pet.x"), ("pet.c", "pet.y")]);
    }

    #[test]
    fn test_moves_follow_deletion_order_across_tiers() {
        let (a, b) = (resource("pet.a", 0), resource("pet.b", 1));
        let (x, y) = (resource("pet.x", 2), resource("pet.y", 3));
        let comparisons = [
            comparison(a, x, Status::IgnoredConflicts),
            comparison(b, y, Status::Equivalent),
        ];

        let resolution = resolve(&comparisons);
        assert_eq!(moves(&resolution), [("pet.a", "pet.x"), ("pet.b", "pet.y")]);
    }
}
