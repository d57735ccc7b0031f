//! Turns a getopt-style option description into a `clap` command so shell scripts can parse
//! long options and `eval` the result:
//!
//! ```text
//! eval_str=$(getopt my-script "foo-bar:,boo,bar,baz:int" "$@")
//! eval "$eval_str"
//! echo $foo_bar  # www
//! echo $bar      # 0
//! echo $boo      # 1
//! echo $baz      # 33
//! ```

use std::str::FromStr;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

use crate::error::{Error, Result};

/// The value types an option may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Str,
    Int,
    Float,
}

impl FromStr for ValueType {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "" | "str" => Ok(ValueType::Str),
            "int" => Ok(ValueType::Int),
            "float" => Ok(ValueType::Float),
            other => Err(Error::UnknownOptionType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// `name`: 1 when given, 0 otherwise.
    Flag,
    /// `name:type`
    Required(ValueType),
    /// `name::type`; prints `None` when absent.
    Optional(ValueType),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSpec {
    pub name: String,
    pub kind: OptionKind,
}

impl OptionSpec {
    /// The shell variable name: dashes become underscores.
    pub fn dest(&self) -> String {
        self.name.replace('-', "_")
    }
}

impl FromStr for OptionSpec {
    type Err = Error;

    fn from_str(desc: &str) -> Result<Self> {
        let parts: Vec<&str> = desc.split(':').collect();
        let kind = match parts.as_slice() {
            [_] => OptionKind::Flag,
            [_, ty] => OptionKind::Required(ty.parse()?),
            [_, "", ty] => OptionKind::Optional(ty.parse()?),
            _ => return Err(Error::InvalidOptionSpec(desc.to_string())),
        };
        if parts[0].is_empty() {
            return Err(Error::InvalidOptionSpec(desc.to_string()));
        }
        Ok(OptionSpec {
            name: parts[0].to_string(),
            kind,
        })
    }
}

/// Parses a comma-separated description such as `"foo-bar:,boo,baz:int,qux::float"`.
pub fn parse_spec(spec: &str) -> Result<Vec<OptionSpec>> {
    spec.split(',').map(str::parse).collect()
}

/// Builds the command that parses `specs` as long options.
pub fn command(prog: &str, specs: &[OptionSpec]) -> Command {
    let mut cmd = Command::new(prog.to_string()).args_override_self(true);
    for spec in specs {
        let arg = Arg::new(spec.name.clone()).long(spec.name.clone());
        let arg = match spec.kind {
            OptionKind::Flag => arg.action(ArgAction::SetTrue),
            OptionKind::Required(ty) => typed(arg, ty).required(true),
            OptionKind::Optional(ty) => typed(arg, ty).required(false),
        };
        cmd = cmd.arg(arg);
    }
    cmd
}

fn typed(arg: Arg, ty: ValueType) -> Arg {
    let arg = arg.action(ArgAction::Set);
    match ty {
        ValueType::Str => arg.value_parser(value_parser!(String)),
        ValueType::Int => arg.value_parser(value_parser!(i64)),
        ValueType::Float => arg.value_parser(value_parser!(f64)),
    }
}

/// Formats parsed options as `dest=value` pairs sorted by dest and joined with `;`.
pub fn assignments(specs: &[OptionSpec], matches: &ArgMatches) -> String {
    let mut pairs: Vec<(String, String)> = specs
        .iter()
        .map(|spec| (spec.dest(), value_of(spec, matches)))
        .collect();
    pairs.sort();
    pairs
        .into_iter()
        .map(|(dest, value)| format!("{}={}", dest, value))
        .collect::<Vec<_>>()
        .join(";")
}

fn value_of(spec: &OptionSpec, matches: &ArgMatches) -> String {
    let id = spec.name.as_str();
    let ty = match spec.kind {
        OptionKind::Flag => return if matches.get_flag(id) { "1" } else { "0" }.to_string(),
        OptionKind::Required(ty) | OptionKind::Optional(ty) => ty,
    };
    let value = match ty {
        ValueType::Str => matches.get_one::<String>(id).cloned(),
        ValueType::Int => matches.get_one::<i64>(id).map(i64::to_string),
        // Debug keeps the ".0" on whole numbers, like the shell callers expect.
        ValueType::Float => matches.get_one::<f64>(id).map(|v| format!("{:?}", v)),
    };
    value.unwrap_or_else(|| "None".to_string())
}

/// Parses `args` (without the program name) against `spec` and returns the `eval` string.
///
/// The outer error is a bad description; the inner one is a bad command line.
pub fn getopt<I, T>(
    prog: &str,
    spec: &str,
    args: I,
) -> Result<std::result::Result<String, clap::Error>>
where
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    let specs = parse_spec(spec)?;
    let argv = std::iter::once(prog.to_string()).chain(args.into_iter().map(Into::into));
    Ok(command(prog, &specs)
        .try_get_matches_from(argv)
        .map(|matches| assignments(&specs, &matches)))
}
