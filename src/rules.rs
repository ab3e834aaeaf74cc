// Copyright (C) 2026 by GiGa infosystems

//! Rules relaxing the comparison of attributes, given on the command line as
//! `<kind>:<type>:<path>`, for example `everything:random_pet:length`.

use crate::compare::{AttributePath, Difference, PathStep};
use crate::{Error, Result};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// What a [`Rule`] does with differences at or below its path
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RuleKind {
    /// Ignore every difference
    Everything,
    /// Ignore differences between strings that only differ in whitespace
    Whitespace,
}

impl RuleKind {
    fn name(self) -> &'static str {
        match self {
            RuleKind::Everything => "everything",
            RuleKind::Whitespace => "whitespace",
        }
    }
}

/// A parsed rule
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Rule {
    pub kind: RuleKind,
    /// The resource type this rule applies to
    pub resource_type: String,
    /// Dot-separated segments, each a mapping key or a sequence index
    pub path: Vec<String>,
}

impl FromStr for Rule {
    type Err = Error;

    fn from_str(rule: &str) -> Result<Self> {
        let invalid = |reason| Error::InvalidRule {
            rule: rule.to_owned(),
            reason,
        };

        let mut parts = rule.splitn(3, ':');
        let (Some(kind), Some(resource_type), Some(path)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid("expected `<kind>:<type>:<path>`"));
        };

        let kind = match kind {
            "everything" => RuleKind::Everything,
            "whitespace" => RuleKind::Whitespace,
            _ => return Err(invalid("the kind must be `everything` or `whitespace`")),
        };

        if resource_type.is_empty() {
            return Err(invalid("the resource type is empty"));
        }

        if path.is_empty() {
            return Err(invalid("the attribute path is empty"));
        }

        let path = path.split('.').map(str::to_owned).collect::<Vec<_>>();
        if path.iter().any(String::is_empty) {
            return Err(invalid("the attribute path contains an empty segment"));
        }

        Ok(Rule {
            kind,
            resource_type: resource_type.to_owned(),
            path,
        })
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.kind.name(),
            self.resource_type,
            self.path.join(".")
        )
    }
}

fn segment_matches(segment: &str, step: &PathStep) -> bool {
    match step {
        PathStep::Key(key) => key == segment,
        PathStep::Index(index) => segment.parse::<usize>() == Ok(*index),
    }
}

fn without_whitespace(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}

impl Rule {
    /// Whether the rule's path is a prefix of `path`
    fn covers(&self, path: &AttributePath) -> bool {
        self.path.len() <= path.steps().len()
            && self
                .path
                .iter()
                .zip(path.steps())
                .all(|(segment, step)| segment_matches(segment, step))
    }

    /// Whether this rule turns `difference` between two resources of `resource_type` into an
    /// ignored one
    pub fn dominates(&self, resource_type: &str, difference: &Difference<'_>) -> bool {
        if self.resource_type != resource_type || !self.covers(&difference.path) {
            return false;
        }

        match self.kind {
            RuleKind::Everything => true,
            RuleKind::Whitespace => match (difference.before, difference.after) {
                (Some(Value::String(before)), Some(Value::String(after))) => {
                    without_whitespace(before) == without_whitespace(after)
                }
                _ => false,
            },
        }
    }
}

/// The ordered set of rules configured for a run
#[derive(Clone, Default, Debug)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        RuleSet { rules }
    }

    /// Parse every rule, failing on the first malformed one
    pub fn parse<S: AsRef<str>>(rules: impl IntoIterator<Item = S>) -> Result<Self> {
        let rules = rules
            .into_iter()
            .map(|rule| rule.as_ref().parse())
            .collect::<Result<Vec<_>>>()?;
        Ok(RuleSet { rules })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Whether any rule ignores `difference` between two resources of `resource_type`
    pub fn ignores(&self, resource_type: &str, difference: &Difference<'_>) -> bool {
        self.rules
            .iter()
            .any(|rule| rule.dominates(resource_type, difference))
    }
}
