// Copyright (C) 2026 by GiGa infosystems

//! Drive the `terraform` binary in a working directory

use crate::cmd::cmd;
use crate::plan::Plan;
use crate::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use semver::Version;
use serde::Deserialize;
use std::sync::LazyLock;
use tracing::debug;

/// The output of `terraform version -json`
#[derive(Deserialize)]
struct VersionOutput {
    terraform_version: String,
}

/// Before 0.13, `terraform version` ignores `-json` and prints `Terraform v0.12.31` etc.
static TEXT_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\S+ v(\d+\.\d+\.\d+)").expect("valid regex")
});

/// Parse the output of `terraform version -json`, falling back to the free-text output of
/// older versions
pub fn parse_version(output: &str) -> Result<Version> {
    let version = match serde_json::from_str::<VersionOutput>(output) {
        Ok(parsed) => parsed.terraform_version,
        Err(_) => TEXT_VERSION
            .captures(output)
            .map(|captures| captures[1].to_owned())
            .ok_or_else(|| Error::UnparsableVersion(output.to_owned()))?,
    };

    let version = version.strip_prefix('v').unwrap_or(&version);
    version
        .parse()
        .map_err(|_| Error::UnparsableVersion(output.to_owned()))
}

/// A `terraform` binary operating on a working directory
#[derive(Clone, Debug)]
pub struct Runner {
    /// The name or path of the binary, looked up in `PATH`
    bin: String,
    workdir: Utf8PathBuf,
}

impl Runner {
    pub fn new(bin: impl Into<String>, workdir: impl Into<Utf8PathBuf>) -> Self {
        Runner {
            bin: bin.into(),
            workdir: workdir.into(),
        }
    }

    pub fn bin(&self) -> &str {
        &self.bin
    }

    pub fn workdir(&self) -> &Utf8Path {
        &self.workdir
    }

    /// `terraform init`
    pub fn init(&self) -> Result<()> {
        cmd!((&self.bin) [init "-input=false" "-no-color"] in &self.workdir)
    }

    /// `terraform plan` into a temporary file & read it back with `terraform show -json`.
    ///
    /// The temporary plan file is removed on every path out of this function.
    pub fn plan(&self) -> Result<Plan> {
        let plan_file = tempfile::Builder::new()
            .prefix("automv.")
            .suffix(".plan")
            .tempfile()?;
        let plan_path = plan_file.path();

        cmd!((&self.bin) [plan "-input=false" "-no-color" "-out" (plan_path)] in &self.workdir)?;
        let json = cmd!((&self.bin) [show "-no-color" "-json" (plan_path)] -> String in &self.workdir)?;

        let plan = Plan::from_json(&json, &format!("{} show -json", self.bin))?;
        debug!(
            "plan has format version {:?} and {} changes",
            plan.format_version,
            plan.num_changes()
        );
        Ok(plan)
    }

    /// `terraform version`
    pub fn version(&self) -> Result<Version> {
        let output = cmd!((&self.bin) [version "-json"] -> String in &self.workdir)?;
        parse_version(&output)
    }
}
