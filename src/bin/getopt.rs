use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;
use nightly_bench::optshim;

/// Parses long options for a shell script and prints `name=value;...` for it to eval.
///
/// `--help` belongs to the wrapped script, so it is passed through instead of handled here.
#[derive(Parser, Debug)]
#[command(disable_help_flag = true, disable_version_flag = true)]
pub struct Cli {
    /// Program name used in usage and error messages.
    pub prog_name: String,
    /// Comma-separated options: "name" (flag), "name:type" (required), "name::type" (optional).
    /// Types are str, int, and float; an empty type means str.
    pub opt_spec: String,
    /// The script's own arguments.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub options: Vec<String>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Cli::parse();

    match optshim::getopt(&args.prog_name, &args.opt_spec, args.options) {
        Ok(Ok(assignments)) => {
            println!("{}", assignments);
            ExitCode::SUCCESS
        }
        Ok(Err(parse_error)) => parse_error.exit(),
        Err(e) => {
            log::error!("{}", e);
            ExitCode::from(2)
        }
    }
}
