// Copyright (C) 2026 by GiGa infosystems

//! See the documentation of [`cmd!`], a utility macro for running the planner binary.

use itertools::Itertools;
use regex::Regex;
use std::process::Command;
use std::sync::LazyLock;

/// Run an external process to completion in a given working directory
///
/// # Usage
/// Example: `cmd!((bin) [plan "-out" (path)] -> String in workdir)`, where the binary & all
/// arguments (`(bin)`, `plan`, `"-out"` and `(path)`) can be either identifiers, which get
/// stringified, literals or expressions in parentheses.
///
/// Both standard streams are captured and drained before the exit status is inspected. On a
/// non-zero status, this returns early from the surrounding function with
/// [`crate::Error::PlannerInvocation`] carrying the command line & captured standard error.
///
/// Without a return specifier it evaluates to `Result<()>`, with `-> String` it evaluates to the
/// captured standard output.
macro_rules! cmd {
    (@arg $ident:ident) => { stringify!($ident) };
    (@arg $literal:literal) => { $literal };
    (@arg ($expr:expr)) => { $expr };
    (@out $out:ident -> String) => { String::from_utf8_lossy(&$out.stdout).into_owned() };
    (@out $out:ident) => { () };
    ($bin:tt [$($args:tt)*] $(-> $ret:ident)? in $path:expr) => {{
        let mut cmd = std::process::Command::new($crate::cmd::cmd!(@arg $bin));
        $(cmd.arg($crate::cmd::cmd!(@arg $args));)*
        cmd.current_dir($path)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped());

        let command = $crate::cmd::describe(&cmd);
        tracing::debug!("running `{command}`");

        let output = match cmd.spawn().and_then(|child| child.wait_with_output()) {
            Ok(output) => output,
            Err(source) => return Err($crate::Error::Spawn { command, source }),
        };

        if !output.status.success() {
            return Err($crate::Error::PlannerInvocation {
                command,
                status: output.status,
                stderr: $crate::cmd::captured_error(&output),
            });
        }

        <$crate::Result<_>>::Ok($crate::cmd::cmd!(@out output $(-> $ret)?))
    }};
}

pub(crate) use cmd;

/// The command line of `cmd` as it would be typed into a shell (without quoting)
pub(crate) fn describe(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|arg| arg.to_string_lossy())
        .join(" ")
}

/// CSI sequences, as used for colors & text styles
static ANSI_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]").expect("valid regex"));

/// Standard error of a failed process, or standard output if nothing was written to standard
/// error, without escape sequences
pub(crate) fn captured_error(output: &std::process::Output) -> String {
    let stream = if output.stderr.iter().all(u8::is_ascii_whitespace) {
        &output.stdout
    } else {
        &output.stderr
    };
    let captured = String::from_utf8_lossy(stream);
    ANSI_ESCAPE.replace_all(captured.trim_end(), "").into_owned()
}
