// Copyright (C) 2026 by GiGa infosystems

//! Render moves as Terraform `moved` blocks or as `terraform state mv` commands

use crate::resolve::Move;
use crate::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use minijinja::{Environment, context};
use std::fmt;
use std::io::Write;
use std::str::FromStr;

/// The two supported renderings of a set of moves
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Format {
    /// `moved` blocks written to [`Emitter::BLOCKS_FILE`] in the working directory
    #[default]
    Blocks,
    /// `terraform state mv` commands written to standard output
    Commands,
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(format: &str) -> Result<Self> {
        match format {
            "blocks" => Ok(Format::Blocks),
            "commands" => Ok(Format::Commands),
            _ => Err(Error::InvalidOutputFormat(format.to_owned())),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Blocks => write!(f, "blocks"),
            Format::Commands => write!(f, "commands"),
        }
    }
}

const BLOCKS_TEMPLATE: &str = "\
{% for move in moves %}{% if not loop.first %}
{% endif %}moved {
  from = {{ move.from }}
  to   = {{ move.to }}
}
{% endfor %}";

const COMMANDS_TEMPLATE: &str = "\
{% for move in moves %}{{ bin }} state mv {{ move.from|quote }} {{ move.to|quote }}
{% endfor %}";

/// Wrap a shell argument in double quotes, escaping backslashes & double quotes inside
fn quote(value: String) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Renders moves with minijinja templates
pub struct Emitter {
    jinja: Environment<'static>,
    terraform_bin: String,
}

impl Emitter {
    /// The file `moved` blocks get written to
    pub const BLOCKS_FILE: &str = "moves.tf";
    const COMMANDS: &str = "commands.sh";

    /// `terraform_bin` is the command name used in rendered `state mv` commands
    pub fn new(terraform_bin: impl Into<String>) -> Result<Self> {
        let mut jinja = Environment::new();
        jinja.set_auto_escape_callback(|_| minijinja::AutoEscape::None);
        jinja.add_filter("quote", quote);
        jinja.add_template(Self::BLOCKS_FILE, BLOCKS_TEMPLATE)?;
        jinja.add_template(Self::COMMANDS, COMMANDS_TEMPLATE)?;

        Ok(Emitter {
            jinja,
            terraform_bin: terraform_bin.into(),
        })
    }

    /// Render `moves` in the given format. No moves render to an empty string.
    pub fn render(&self, format: Format, moves: &[Move]) -> Result<String> {
        let name = match format {
            Format::Blocks => Self::BLOCKS_FILE,
            Format::Commands => Self::COMMANDS,
        };

        let out = self.jinja.get_template(name)?.render(context! {
            moves => moves,
            bin => &self.terraform_bin,
        })?;
        Ok(out)
    }

    /// Write `moved` blocks for `moves` to [`Self::BLOCKS_FILE`] in `workdir`, replacing the file
    /// if it exists, and return its path
    pub fn write_blocks(&self, workdir: &Utf8Path, moves: &[Move]) -> Result<Utf8PathBuf> {
        let contents = self.render(Format::Blocks, moves)?;

        let path = workdir.join(Self::BLOCKS_FILE);
        let mut update = tempfile::Builder::new()
            .prefix(".moves.tf.")
            .tempfile_in(workdir)?;
        update.write_all(contents.as_bytes())?;
        update.persist(&path).map_err(|err| err.error)?;
        Ok(path)
    }
}
