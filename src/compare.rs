// Copyright (C) 2026 by GiGa infosystems

//! Compare every planned deletion with every planned creation of the same type, see
//! [`compare_all`].

use crate::plan::Resource;
use crate::rules::RuleSet;
use itertools::Itertools;
use serde_json::{Number, Value};
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

/// A step into an attribute tree
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum PathStep {
    Key(String),
    Index(usize),
}

/// The location of a value in an attribute tree, displayed dot-separated (`keepers.0.name`)
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct AttributePath(Vec<PathStep>);

impl AttributePath {
    pub fn steps(&self) -> &[PathStep] {
        &self.0
    }

    fn push(&mut self, step: PathStep) {
        self.0.push(step);
    }

    fn pop(&mut self) {
        self.0.pop();
    }
}

impl From<Vec<PathStep>> for AttributePath {
    fn from(steps: Vec<PathStep>) -> Self {
        AttributePath(steps)
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "(root)");
        }

        for (i, step) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            match step {
                PathStep::Key(key) => write!(f, "{key}")?,
                PathStep::Index(index) => write!(f, "{index}")?,
            }
        }
        Ok(())
    }
}

/// A value that differs between a deletion & a creation.
///
/// A side is `None` if the path doesn't exist in that side's attributes.
#[derive(Clone, Debug)]
pub struct Difference<'a> {
    pub path: AttributePath,
    pub before: Option<&'a Value>,
    pub after: Option<&'a Value>,
}

/// The outcome of comparing a deletion with a creation
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Status {
    /// No differences at all
    Equivalent,
    /// All differences were ignored by rules
    IgnoredConflicts,
    /// At least one difference wasn't ignored
    Conflicting,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Equivalent => "equivalent",
            Status::IgnoredConflicts => "equivalent with ignored differences",
            Status::Conflicting => "conflicting",
        };
        write!(f, "{s}")
    }
}

/// The verdict for one (deletion, creation) candidate pair
#[derive(Clone, Debug)]
pub struct Comparison<'a> {
    pub deletion: Resource<'a>,
    pub creation: Resource<'a>,
    /// Leaf paths with equal values on both sides
    pub matched: BTreeSet<AttributePath>,
    /// Paths of differences no rule ignored
    pub conflicts: BTreeSet<AttributePath>,
    /// Paths of differences ignored by a rule
    pub ignored: BTreeSet<AttributePath>,
}

impl Comparison<'_> {
    pub fn status(&self) -> Status {
        if !self.conflicts.is_empty() {
            Status::Conflicting
        } else if !self.ignored.is_empty() {
            Status::IgnoredConflicts
        } else {
            Status::Equivalent
        }
    }
}

/// Compare two numbers by value, such that `1` and `1.0` are equal
fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (a.as_u64(), b.as_u64()) {
        return a == b;
    }
    if a.is_f64() || b.is_f64() {
        return a.as_f64() == b.as_f64();
    }
    // One is a negative integer, the other doesn't fit into an `i64`
    false
}

fn scalars_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
        (Value::String(a), Value::String(b)) => a == b,
        _ => false,
    }
}

/// Terraform fills unset attributes with `null` or empty collections, so these count as matching
/// a missing value
fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) | Value::String(_) => false,
    }
}

/// Lockstep walk over two attribute trees
#[derive(Default)]
struct Walk<'a> {
    path: AttributePath,
    matched: BTreeSet<AttributePath>,
    differences: Vec<Difference<'a>>,
}

impl<'a> Walk<'a> {
    fn matched(&mut self) {
        self.matched.insert(self.path.clone());
    }

    fn differs(&mut self, before: Option<&'a Value>, after: Option<&'a Value>) {
        self.differences.push(Difference {
            path: self.path.clone(),
            before,
            after,
        });
    }

    fn walk(&mut self, before: Option<&'a Value>, after: Option<&'a Value>, unknown: Option<&Value>) {
        // Values only known after apply can't be compared
        if let Some(Value::Bool(true)) = unknown {
            return;
        }

        match (before, after) {
            (None, None) => (),
            (Some(present), None) | (None, Some(present)) => {
                if is_empty(present) {
                    self.matched();
                } else {
                    self.differs(before, after);
                }
            }
            (Some(Value::Object(old)), Some(Value::Object(new))) => {
                if old.is_empty() && new.is_empty() {
                    self.matched();
                    return;
                }

                let keys = old.keys().chain(new.keys()).collect::<BTreeSet<_>>();
                for key in keys {
                    self.path.push(PathStep::Key(key.clone()));
                    self.walk(
                        old.get(key),
                        new.get(key),
                        unknown.and_then(|unknown| unknown.get(key)),
                    );
                    self.path.pop();
                }
            }
            (Some(Value::Array(old)), Some(Value::Array(new))) => {
                if old.len() != new.len() {
                    self.differs(before, after);
                    return;
                }
                if old.is_empty() {
                    self.matched();
                    return;
                }

                for (index, (old, new)) in old.iter().zip(new).enumerate() {
                    self.path.push(PathStep::Index(index));
                    self.walk(
                        Some(old),
                        Some(new),
                        unknown.and_then(|unknown| unknown.get(index)),
                    );
                    self.path.pop();
                }
            }
            (Some(old), Some(new)) => {
                if scalars_equal(old, new) {
                    self.matched();
                } else {
                    self.differs(before, after);
                }
            }
        }
    }
}

/// Compare a single deletion with a single creation, sorting differences into conflicts and
/// ignored differences using `rules`.
///
/// This doesn't check that both have the same type, the type of the deletion is used to select
/// rules.
pub fn compare<'a>(
    deletion: Resource<'a>,
    creation: Resource<'a>,
    rules: &RuleSet,
) -> Comparison<'a> {
    let mut walk = Walk::default();
    walk.walk(
        Some(deletion.attributes),
        Some(creation.attributes),
        creation.unknown,
    );

    let (ignored, conflicts) = walk
        .differences
        .into_iter()
        .partition::<Vec<_>, _>(|difference| rules.ignores(deletion.resource_type, difference));

    Comparison {
        deletion,
        creation,
        matched: walk.matched,
        conflicts: conflicts.into_iter().map(|d| d.path).collect(),
        ignored: ignored.into_iter().map(|d| d.path).collect(),
    }
}

/// Compare every deletion with every creation of the same type (excluding the two halves of a
/// replacement), in plan order of the deletions & then the creations.
pub fn compare_all<'a>(
    deletions: &[Resource<'a>],
    creations: &[Resource<'a>],
    rules: &RuleSet,
) -> Vec<Comparison<'a>> {
    let comparisons = deletions
        .iter()
        .cartesian_product(creations)
        .filter(|(deletion, creation)| {
            deletion.resource_type == creation.resource_type
                && deletion.address != creation.address
        })
        .map(|(deletion, creation)| compare(*deletion, *creation, rules))
        .collect::<Vec<_>>();

    debug!(
        "compared {} deletions with {} creations: {} candidate pairs",
        deletions.len(),
        creations.len(),
        comparisons.len()
    );

    comparisons
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resource<'a>(address: &'a str, attributes: &'a Value, position: usize) -> Resource<'a> {
        Resource {
            address,
            resource_type: "random_pet",
            attributes,
            unknown: None,
            position,
        }
    }

    fn paths(comparison: &BTreeSet<AttributePath>) -> Vec<String> {
        comparison.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_identical_trees_are_equivalent() {
        let attributes = json!({ "length": 2, "separator": "-", "keepers": { "a": [1, 2] } });
        let comparison = compare(
            resource("random_pet.a", &attributes, 0),
            resource("random_pet.b", &attributes, 1),
            &RuleSet::default(),
        );

        assert_eq!(comparison.status(), Status::Equivalent);
        assert_eq!(
            paths(&comparison.matched),
            ["keepers.a.0", "keepers.a.1", "length", "separator"]
        );
    }

    #[test]
    fn test_all_differences_are_recorded() {
        let before = json!({ "length": 2, "prefix": "a", "keepers": { "x": "1" } });
        let after = json!({ "length": 3, "prefix": "b", "keepers": { "x": "1" } });
        let comparison = compare(
            resource("random_pet.a", &before, 0),
            resource("random_pet.b", &after, 1),
            &RuleSet::default(),
        );

        assert_eq!(comparison.status(), Status::Conflicting);
        assert_eq!(paths(&comparison.conflicts), ["length", "prefix"]);
        assert_eq!(paths(&comparison.matched), ["keepers.x"]);
    }

    #[test]
    fn test_numbers_compare_by_value() {
        let before = json!({ "a": 1, "b": 0.5, "c": -3 });
        let after = json!({ "a": 1.0, "b": 0.5, "c": -3.0 });
        let comparison = compare(
            resource("random_pet.a", &before, 0),
            resource("random_pet.b", &after, 1),
            &RuleSet::default(),
        );
        assert_eq!(comparison.status(), Status::Equivalent);

        let after = json!({ "a": "1", "b": 0.5, "c": -3 });
        let comparison = compare(
            resource("random_pet.a", &before, 0),
            resource("random_pet.b", &after, 1),
            &RuleSet::default(),
        );
        assert_eq!(paths(&comparison.conflicts), ["a"]);
    }

    #[test]
    fn test_missing_values_match_null_and_empty() {
        let before = json!({ "prefix": null, "tags": {}, "list": [] });
        let after = json!({});
        let comparison = compare(
            resource("random_pet.a", &before, 0),
            resource("random_pet.b", &after, 1),
            &RuleSet::default(),
        );
        assert_eq!(comparison.status(), Status::Equivalent);

        let before = json!({ "prefix": "x" });
        let comparison = compare(
            resource("random_pet.a", &before, 0),
            resource("random_pet.b", &after, 1),
            &RuleSet::default(),
        );
        assert_eq!(paths(&comparison.conflicts), ["prefix"]);
    }

    #[test]
    fn test_shape_and_length_mismatches_conflict() {
        let before = json!({ "a": [1, 2], "b": { "x": 1 }, "c": "s" });
        let after = json!({ "a": [1], "b": [1], "c": { "s": true } });
        let comparison = compare(
            resource("random_pet.a", &before, 0),
            resource("random_pet.b", &after, 1),
            &RuleSet::default(),
        );
        assert_eq!(paths(&comparison.conflicts), ["a", "b", "c"]);
    }

    #[test]
    fn test_unknown_values_are_skipped() {
        let before = json!({ "id": "happy-cat", "length": 2 });
        let after = json!({ "length": 2 });
        let unknown = json!({ "id": true });
        let creation = Resource {
            unknown: Some(&unknown),
            ..resource("random_pet.b", &after, 1)
        };

        let comparison = compare(
            resource("random_pet.a", &before, 0),
            creation,
            &RuleSet::default(),
        );
        assert_eq!(comparison.status(), Status::Equivalent);
        assert_eq!(paths(&comparison.matched), ["length"]);
    }

    #[test]
    fn test_ignored_differences() {
        let before = json!({ "length": 2, "separator": "-" });
        let after = json!({ "length": 3, "separator": "-" });
        let rules = RuleSet::parse(["everything:random_pet:length"]).unwrap();

        let comparison = compare(
            resource("random_pet.a", &before, 0),
            resource("random_pet.b", &after, 1),
            &rules,
        );
        assert_eq!(comparison.status(), Status::IgnoredConflicts);
        assert_eq!(paths(&comparison.ignored), ["length"]);
        assert!(comparison.conflicts.is_empty());
    }

    #[test]
    fn test_compare_all_only_pairs_same_type_and_distinct_addresses() {
        let attributes = json!({});
        let deletions = [
            resource("random_pet.a", &attributes, 0),
            Resource {
                resource_type: "random_id",
                ..resource("random_id.a", &attributes, 1)
            },
            resource("random_pet.replaced", &attributes, 2),
        ];
        let creations = [
            resource("random_pet.replaced", &attributes, 2),
            resource("random_pet.b", &attributes, 3),
        ];

        let pairs = compare_all(&deletions, &creations, &RuleSet::default())
            .iter()
            .map(|c| (c.deletion.address, c.creation.address))
            .collect::<Vec<_>>();

        assert_eq!(
            pairs,
            [
                ("random_pet.a", "random_pet.replaced"),
                ("random_pet.a", "random_pet.b"),
                ("random_pet.replaced", "random_pet.b"),
            ]
        );
    }
}
