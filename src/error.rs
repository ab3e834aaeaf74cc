// Copyright (C) 2026 by GiGa infosystems

//! The error type shared by all stages of the pipeline

use semver::Version;
use std::io;
use std::process::ExitStatus;
use thiserror::Error;

/// Result alias for [`Error`]
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong while finding & emitting moves.
///
/// Ambiguous matches are not errors, see [`crate::resolve::Ambiguity`].
#[derive(Debug, Error)]
pub enum Error {
    /// A rule given with `-ignore` could not be parsed
    #[error("invalid rule {rule:?}: {reason}")]
    InvalidRule { rule: String, reason: &'static str },

    #[error("invalid output format {0:?}, expected `blocks` or `commands`")]
    InvalidOutputFormat(String),

    /// `moved` blocks were introduced in Terraform 1.1
    #[error("Terraform {version} does not support moved blocks, use `-output=commands` instead")]
    MovedBlocksUnsupported { version: Version },

    #[error("failed to start `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// The planner ran, but returned a non-zero status code
    #[error("`{command}` failed with {status}:\n{stderr}")]
    PlannerInvocation {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("could not parse the output of `{command}`")]
    Parse {
        command: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not parse a version from output {0:?}")]
    UnparsableVersion(String),

    /// The plan document lacks a `format_version` this crate understands
    #[error("unsupported plan format version {}", .0.as_deref().unwrap_or("(missing)"))]
    UnsupportedPlanFormat(Option<String>),

    #[error("failed to render moves")]
    Render(#[from] minijinja::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// The process exit code for this error: `1` for mistakes in the invocation, `2` for failures
    /// of the planner or the filesystem
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::InvalidRule { .. }
            | Error::InvalidOutputFormat(_)
            | Error::MovedBlocksUnsupported { .. } => 1,
            Error::Spawn { .. }
            | Error::PlannerInvocation { .. }
            | Error::Parse { .. }
            | Error::UnparsableVersion(_)
            | Error::UnsupportedPlanFormat(_)
            | Error::Render(_)
            | Error::Io(_) => 2,
        }
    }
}
