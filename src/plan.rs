// Copyright (C) 2026 by GiGa infosystems

//! The planned resource changes as reported by `terraform show -json`, and the two projections
//! the matcher works on: [`Plan::deletions`] & [`Plan::creations`].

use crate::{Error, Result};
use serde::Deserialize;
use serde_json::Value;

/// A single planned action on a resource
#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    NoOp,
    Create,
    Read,
    Update,
    Delete,
}

/// The `change` object of a resource change
#[derive(Clone, Debug, Deserialize)]
pub struct Change {
    /// Replacements are reported as `["delete", "create"]` or `["create", "delete"]`
    pub actions: Vec<Action>,
    #[serde(default)]
    pub before: Option<Value>,
    #[serde(default)]
    pub after: Option<Value>,
    /// A tree mirroring `after`, with `true` for every value only known after apply
    #[serde(default)]
    pub after_unknown: Option<Value>,
}

impl Change {
    fn has(&self, action: Action) -> bool {
        self.actions.contains(&action)
    }

    fn is_no_op(&self) -> bool {
        self.actions.iter().all(|action| *action == Action::NoOp)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ResourceChange {
    pub address: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub change: Change,
}

/// A plan as produced by `terraform show -json <planfile>`.
///
/// Every field not listed here is ignored.
#[derive(Clone, Debug, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub format_version: Option<String>,
    #[serde(default)]
    pub resource_changes: Vec<ResourceChange>,
}

/// One side of a resource change: the state before a deletion or after a creation
#[derive(Clone, Copy, Debug)]
pub struct Resource<'a> {
    pub address: &'a str,
    pub resource_type: &'a str,
    pub attributes: &'a Value,
    /// The `after_unknown` tree for created resources
    pub unknown: Option<&'a Value>,
    /// The index of the originating change in [`Plan::resource_changes`]
    pub position: usize,
}

static NULL: Value = Value::Null;

impl Plan {
    /// Plan format major versions this crate knows how to read
    const SUPPORTED_MAJOR_VERSIONS: [&str; 2] = ["0", "1"];

    /// Parse the JSON representation of a plan, rejecting unknown format versions
    pub fn from_json(json: &str, command: &str) -> Result<Self> {
        let plan = serde_json::from_str::<Plan>(json).map_err(|source| Error::Parse {
            command: command.to_owned(),
            source,
        })?;
        plan.check_format_version()?;
        Ok(plan)
    }

    /// Fails with [`Error::UnsupportedPlanFormat`] unless `format_version` is `0.x` or `1.x`
    pub fn check_format_version(&self) -> Result<()> {
        let supported = self.format_version.as_deref().is_some_and(|version| {
            version
                .split_once('.')
                .is_some_and(|(major, _)| Self::SUPPORTED_MAJOR_VERSIONS.contains(&major))
        });

        if supported {
            Ok(())
        } else {
            Err(Error::UnsupportedPlanFormat(self.format_version.clone()))
        }
    }

    /// Resources that are planned to be deleted, in plan order.
    ///
    /// The deleted half of a replacement is included.
    pub fn deletions(&self) -> Vec<Resource<'_>> {
        self.resource_changes
            .iter()
            .enumerate()
            .filter(|(_, rc)| rc.change.has(Action::Delete))
            .map(|(position, rc)| Resource {
                address: &rc.address,
                resource_type: &rc.resource_type,
                attributes: rc.change.before.as_ref().unwrap_or(&NULL),
                unknown: None,
                position,
            })
            .collect()
    }

    /// Resources that are planned to be created, in plan order.
    ///
    /// The created half of a replacement is included.
    pub fn creations(&self) -> Vec<Resource<'_>> {
        self.resource_changes
            .iter()
            .enumerate()
            .filter(|(_, rc)| rc.change.has(Action::Create))
            .map(|(position, rc)| Resource {
                address: &rc.address,
                resource_type: &rc.resource_type,
                attributes: rc.change.after.as_ref().unwrap_or(&NULL),
                unknown: rc.change.after_unknown.as_ref(),
                position,
            })
            .collect()
    }

    /// The number of changes that are not no-ops
    pub fn num_changes(&self) -> usize {
        self.resource_changes
            .iter()
            .filter(|rc| !rc.change.is_no_op())
            .count()
    }
}
