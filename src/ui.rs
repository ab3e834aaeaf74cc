// Copyright (C) 2026 by GiGa infosystems

//! Human-readable diagnostics for the terminal

use crate::compare::{Comparison, Status};
use crate::resolve::{Ambiguity, Resolution};
use colored::{ColoredString, Colorize};
use itertools::Itertools;
use std::fmt::Write;

/// Formats diagnostics, with or without ANSI colors
#[derive(Clone, Copy, Debug)]
pub struct Ui {
    color: bool,
}

impl Ui {
    pub fn new(color: bool) -> Self {
        Ui { color }
    }

    pub fn color(&self) -> bool {
        self.color
    }

    fn paint(&self, s: ColoredString) -> ColoredString {
        if self.color { s } else { s.clear() }
    }

    /// A progress message for a pipeline stage
    pub fn step(&self, msg: &str) -> String {
        format!("{} {}", self.paint("▸".blue().bold()), msg)
    }

    pub fn success(&self, msg: &str) -> String {
        format!("{} {}", self.paint("✓".green()), msg)
    }

    pub fn warning(&self, msg: &str) -> String {
        format!("{} {}", self.paint("⚠".yellow()), msg)
    }

    pub fn error(&self, msg: &str) -> String {
        format!("{} {}", self.paint("✗".red().bold()), msg)
    }

    fn status(&self, status: Status) -> ColoredString {
        let text = status.to_string();
        let text = text.as_str();
        self.paint(match status {
            Status::Equivalent => text.green(),
            Status::IgnoredConflicts => text.yellow(),
            Status::Conflicting => text.red(),
        })
    }

    /// One warning per ambiguous deletion
    pub fn ambiguity(&self, ambiguity: &Ambiguity) -> String {
        let mut msg = format!(
            "{} matches {} ({})",
            self.paint(ambiguity.address.as_str().bold()),
            ambiguity.candidates.iter().join(", "),
            ambiguity.status,
        );
        if !ambiguity.rivals.is_empty() {
            let _ = write!(
                msg,
                ", as do {}",
                ambiguity.rivals.iter().join(", ")
            );
        }
        msg.push_str(": not moving it");
        self.warning(&msg)
    }

    /// A summary of the resolved moves
    pub fn summary(&self, resolution: &Resolution) -> String {
        let found = match resolution.moves.len() {
            0 => "No moves found".to_owned(),
            1 => "Found 1 move".to_owned(),
            n => format!("Found {n} moves"),
        };

        let msg = if resolution.ambiguities.is_empty() {
            found
        } else {
            format!(
                "{found}, {} ambiguous",
                self.paint(resolution.ambiguities.len().to_string().as_str().yellow())
            )
        };
        self.success(&msg)
    }

    /// Details for every comparison, grouped by deletion
    pub fn analysis(&self, comparisons: &[Comparison<'_>]) -> String {
        let mut out = String::new();

        for (deletion, group) in &comparisons
            .iter()
            .chunk_by(|comparison| comparison.deletion.address)
        {
            let _ = writeln!(out, "{}", self.paint(deletion.bold()));
            for comparison in group {
                let _ = writeln!(
                    out,
                    "  {} {}: {}",
                    self.paint("→".dimmed()),
                    comparison.creation.address,
                    self.status(comparison.status())
                );
                for path in &comparison.conflicts {
                    let _ = writeln!(out, "      {} {path}", self.paint("✗".red()));
                }
                for path in &comparison.ignored {
                    let _ = writeln!(
                        out,
                        "      {} {path} {}",
                        self.paint("~".yellow()),
                        self.paint("(ignored)".dimmed())
                    );
                }
            }
        }

        out
    }
}
