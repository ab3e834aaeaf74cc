// Copyright (C) 2026 by GiGa infosystems

use std::ffi::OsString;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use clap::error::ErrorKind;
use color_eyre::{
    Report, Result,
    config::{HookBuilder, Theme},
    eyre::WrapErr,
};
use semver::Version;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use automv::emit::{Emitter, Format};
use automv::rules::RuleSet;
use automv::terraform::Runner;
use automv::ui::Ui;
use automv::{Error, find_moves};

/// Generate moves for Terraform resources that a refactoring would otherwise destroy & recreate.
///
/// This runs `terraform plan` in the working directory, matches every resource planned for
/// deletion with a resource of the same type planned for creation if their attributes are the
/// same, and outputs the resulting moves.
///
/// Flags may be given with a single dash, as in `-output=commands`.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The working directory containing the refactored code
    #[arg(default_value = ".")]
    workdir: Utf8PathBuf,
    /// Either `blocks`, to write `moved` blocks to `moves.tf` in the working directory, or
    /// `commands`, to print `terraform state mv` commands
    #[arg(long, default_value = "blocks")]
    output: String,
    /// Ignore differences in an attribute, given as `<kind>:<type>:<path>`
    ///
    /// `<kind>` is `everything` to ignore all differences, or `whitespace` to ignore differences
    /// in whitespace only. `<path>` is dot-separated and may contain list indices, for example
    /// `everything:aws_instance:ebs_block_device.0.tags`. Can be given multiple times.
    #[arg(long, verbatim_doc_comment)]
    ignore: Vec<String>,
    /// Don't use colors in diagnostics
    #[arg(long)]
    no_color: bool,
    /// Print how every deletion compares to every creation of the same type
    #[arg(long)]
    show_analysis: bool,
    /// The Terraform binary to run (also used in the output of `-output=commands`)
    #[arg(long, default_value = "terraform")]
    terraform_bin: String,
    /// Print debug logs
    #[arg(long)]
    verbose: bool,
}

/// Rewrite single-dash long flags (`-no-color`) into the double-dash form clap expects
fn normalize_flags(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    let mut out = Vec::new();
    let mut flags_ended = false;

    for (i, arg) in args.into_iter().enumerate() {
        let normalized = match arg.to_str() {
            Some("--") => {
                flags_ended = true;
                None
            }
            Some(flag)
                if i > 0
                    && !flags_ended
                    && flag.len() > 2
                    && flag.starts_with('-')
                    && !flag.starts_with("--") =>
            {
                Some(format!("-{flag}").into())
            }
            _ => None,
        };
        out.push(normalized.unwrap_or(arg));
    }

    out
}

/// The first Terraform version supporting `moved` blocks
const MOVED_BLOCKS_VERSION: Version = Version::new(1, 1, 0);

struct AppContext {
    runner: Runner,
    rules: RuleSet,
    format: Format,
    show_analysis: bool,
    emitter: Emitter,
    ui: Ui,
}

impl TryFrom<Args> for AppContext {
    type Error = Report;

    fn try_from(args: Args) -> Result<Self> {
        let format = args.output.parse::<Format>()?;
        let rules = RuleSet::parse(&args.ignore)?;
        for rule in rules.rules() {
            debug!("using rule {rule}");
        }

        if !args.workdir.is_dir() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("working directory {:?} doesn't exist", args.workdir),
            ))
            .into());
        }

        Ok(AppContext {
            emitter: Emitter::new(&args.terraform_bin)?,
            runner: Runner::new(args.terraform_bin, args.workdir),
            rules,
            format,
            show_analysis: args.show_analysis,
            ui: Ui::new(!args.no_color),
        })
    }
}

impl AppContext {
    fn progress(&self, msg: &str) {
        eprintln!("{}", self.ui.step(msg));
    }

    fn check_version(&self) -> Result<()> {
        let version = self
            .runner
            .version()
            .wrap_err("Failed to query the Terraform version")?;
        debug!("running Terraform {version}");

        if self.format == Format::Blocks && version < MOVED_BLOCKS_VERSION {
            return Err(Error::MovedBlocksUnsupported { version }.into());
        }

        Ok(())
    }

    fn run(&self) -> Result<()> {
        let bin = self.runner.bin();

        self.check_version()?;

        self.progress(&format!("Running `{bin} init`"));
        self.runner
            .init()
            .wrap_err("Failed to initialize the working directory")?;

        self.progress(&format!("Running `{bin} plan`"));
        let plan = self.runner.plan().wrap_err("Failed to plan")?;

        self.progress("Comparing planned deletions & creations");
        let analysis = find_moves(&plan, &self.rules);

        if self.show_analysis {
            eprint!("{}", self.ui.analysis(&analysis.comparisons));
        }

        let resolution = &analysis.resolution;
        for ambiguity in &resolution.ambiguities {
            eprintln!("{}", self.ui.ambiguity(ambiguity));
        }
        eprintln!("{}", self.ui.summary(resolution));

        match self.format {
            Format::Blocks => {
                let path = self
                    .emitter
                    .write_blocks(self.runner.workdir(), &resolution.moves)
                    .wrap_err("Failed to write moved blocks")?;
                if !resolution.is_empty() {
                    eprintln!(
                        "{}",
                        self.ui.success(&format!("Wrote moved blocks to {path}"))
                    );
                }
            }
            Format::Commands => {
                let commands = self
                    .emitter
                    .render(Format::Commands, &resolution.moves)
                    .wrap_err("Failed to render commands")?;
                print!("{commands}");
            }
        }

        Ok(())
    }
}

fn install_hooks(color: bool, verbose: bool) -> Result<()> {
    let theme = if color { Theme::dark() } else { Theme::new() };
    HookBuilder::default()
        .theme(theme)
        .display_env_section(false)
        .install()?;

    // `colored` only checks whether stdout is a terminal, but diagnostics go to stderr
    colored::control::set_override(color);

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(color)
        .with_target(false)
        .init();

    Ok(())
}

/// The exit code for a failed run, from the first [`Error`] in the chain of causes
fn exit_code(report: &Report) -> u8 {
    report
        .chain()
        .find_map(|cause| cause.downcast_ref::<Error>())
        .map_or(2, Error::exit_code)
}

/// A failed run's report after the error symbol, without the blank line color-eyre starts with
fn failure_message(ui: &Ui, report: &Report) -> String {
    ui.error(format!("{report:?}").trim_start())
}

fn main() -> ExitCode {
    let args = match Args::try_parse_from(normalize_flags(std::env::args_os())) {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(1),
            };
        }
    };

    let ui = Ui::new(!args.no_color);
    if let Err(report) = install_hooks(ui.color(), args.verbose) {
        eprintln!("{}", ui.error(&format!("{report}")));
        return ExitCode::from(2);
    }

    match AppContext::try_from(args).and_then(|ctx| ctx.run()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => {
            eprintln!("{}", failure_message(&ui, &report));
            ExitCode::from(exit_code(&report))
        }
    }
}
