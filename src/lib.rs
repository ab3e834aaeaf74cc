// Copyright (C) 2026 by GiGa infosystems

//! `automv` finds Terraform resources that a refactoring would destroy & recreate, and generates
//! the moves that keep their state instead.
//!
//! The order of operations is:
//! * Plan the refactored working directory with [`terraform::Runner`] into a [`plan::Plan`]
//! * Compare every planned deletion with every planned creation of the same type with
//!   [`compare::compare_all`], relaxed by [`rules::RuleSet`]
//! * Choose unambiguous pairs with [`resolve::resolve`]
//! * Render the moves as `moved` blocks or `terraform state mv` commands with [`emit::Emitter`]
//!
//! [`find_moves`] runs the comparison & resolution for a plan obtained some other way.
//!
//! Moves are inferred from each resource's own attributes only. Resources that only differ in
//! their dependencies are reported as ambiguous.

mod cmd;
mod error;

pub mod compare;
pub mod emit;
pub mod plan;
pub mod resolve;
pub mod rules;
pub mod terraform;
pub mod ui;

pub use error::{Error, Result};

/// Every comparison between a deletion & a creation of the same type in a plan, with the moves
/// resolved from them
pub struct Analysis<'a> {
    pub comparisons: Vec<compare::Comparison<'a>>,
    pub resolution: resolve::Resolution,
}

/// Compare the deletions & creations of `plan` under `rules` and resolve them into moves
pub fn find_moves<'a>(plan: &'a plan::Plan, rules: &rules::RuleSet) -> Analysis<'a> {
    let deletions = plan.deletions();
    let creations = plan.creations();

    let comparisons = compare::compare_all(&deletions, &creations, rules);
    let resolution = resolve::resolve(&comparisons);

    Analysis {
        comparisons,
        resolution,
    }
}
