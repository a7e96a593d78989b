/*
 * Copyright Cedar Contributors
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *      https://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

// This modules makes use of `return` to exit early with a particular exit code.
// For consistency, it also uses `return` in some places where it could be
// omitted.
#![allow(clippy::needless_return)]

mod err;

use authz_equiv_core::{
    first_mismatch, translate_filter_json, translate_residual_json, Expr, Principal,
};
use authz_equiv_harness::{DifferentialHarness, HarnessConfig, HarnessError, Scenario};
use clap::{ArgAction, Args, Parser, Subcommand};
use err::IntoDiagnostic;
use miette::{Report, Result, WrapErr};
use std::{
    io::IsTerminal,
    path::Path,
    process::{ExitCode, Termination},
};
use tracing::{debug, level_filters::LevelFilter};

/// Translate and compare row-level authorization filters
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)] // Pull from `Cargo.toml`
pub struct Cli {
    #[command(flatten)]
    pub logging: LoggingArgs,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Translate a partial-evaluation residual into the canonical form
    TranslateResidual(TranslateResidualArgs),
    /// Translate a legacy filter object into the canonical form
    TranslateFilter(TranslateFilterArgs),
    /// Check whether a residual and a legacy filter are equivalent
    Compare(CompareArgs),
    /// Run a differential-test scenario against the live collaborators
    Run(RunArgs),
}

/// Logging options shared by all subcommands
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct LoggingArgs {
    /// Log more (repeat for more detail). Logs go to stderr.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    /// Log in JSON
    #[arg(long, global = true)]
    pub log_json: bool,
}

impl LoggingArgs {
    /// Maximum level to log at
    pub fn level(self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }

    /// Install the global subscriber
    pub fn init(self) {
        let builder = tracing_subscriber::fmt()
            .with_ansi(std::io::stderr().is_terminal())
            .with_max_level(self.level())
            .with_writer(std::io::stderr);
        // Ignore the error if a subscriber is already set (e.g. in tests).
        let _ = if self.log_json {
            builder.json().try_init()
        } else {
            builder.try_init()
        };
    }
}

#[derive(Args, Debug)]
pub struct ResidualArgs {
    /// File containing the residual body as JSON. Reads stdin if omitted.
    #[arg(short, long = "residual", value_name = "FILE")]
    pub residual_file: Option<String>,
    /// File containing the principal (`{ sub, username, subUsername }`) to
    /// substitute. Principal attributes stay unresolved if omitted.
    #[arg(long = "principal", value_name = "FILE")]
    pub principal_file: Option<String>,
}

#[derive(Args, Debug)]
pub struct TranslateResidualArgs {
    #[command(flatten)]
    pub residual: ResidualArgs,
}

#[derive(Args, Debug)]
pub struct TranslateFilterArgs {
    /// File containing the legacy filter as JSON. Reads stdin if omitted.
    #[arg(short, long = "filter", value_name = "FILE")]
    pub filter_file: Option<String>,
}

#[derive(Args, Debug)]
pub struct CompareArgs {
    #[command(flatten)]
    pub residual: ResidualArgs,
    /// File containing the legacy filter as JSON
    #[arg(short, long = "filter", value_name = "FILE")]
    pub filter_file: String,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// File containing the harness configuration
    #[arg(short, long = "config", value_name = "FILE")]
    pub config_file: String,
    /// File containing the scenario to run
    #[arg(short, long = "scenario", value_name = "FILE")]
    pub scenario_file: String,
}

#[derive(Eq, PartialEq, Debug, Copy, Clone)]
pub enum AuthzEquivExitCode {
    // The command completed successfully, and any comparison it made found
    // the two sides equivalent.
    Success,
    // The command failed to complete successfully.
    Failure,
    // The command completed successfully, but the two sides differ.
    Mismatch,
}

impl Termination for AuthzEquivExitCode {
    fn report(self) -> ExitCode {
        match self {
            AuthzEquivExitCode::Success => ExitCode::SUCCESS,
            AuthzEquivExitCode::Failure => ExitCode::FAILURE,
            AuthzEquivExitCode::Mismatch => ExitCode::from(2),
        }
    }
}

fn translate_residual_inner(args: &ResidualArgs) -> Result<Expr> {
    let residual = read_json_from_file_or_stdin(args.residual_file.as_ref(), "residual")?;
    let principal = args
        .principal_file
        .as_ref()
        .map(read_principal)
        .transpose()?;
    debug!(principal = ?principal, "translating residual");
    translate_residual_json(residual, principal.as_ref())
        .map_err(Report::from)
        .wrap_err("failed to translate residual")
}

fn translate_filter_inner(filter_file: Option<impl AsRef<Path>>) -> Result<Expr> {
    let filter = read_json_from_file_or_stdin(filter_file, "filter")?;
    translate_filter_json(&filter)
        .map_err(Report::from)
        .wrap_err("failed to translate filter")
}

fn print_expr(expr: &Expr) -> Result<()> {
    let json = serde_json::to_string_pretty(expr)
        .into_diagnostic()
        .wrap_err("failed to serialize expression")?;
    println!("{json}");
    Ok(())
}

pub fn translate_residual(args: &TranslateResidualArgs) -> AuthzEquivExitCode {
    match translate_residual_inner(&args.residual).and_then(|expr| print_expr(&expr)) {
        Ok(()) => AuthzEquivExitCode::Success,
        Err(e) => {
            eprintln!("{e:?}");
            AuthzEquivExitCode::Failure
        }
    }
}

pub fn translate_filter(args: &TranslateFilterArgs) -> AuthzEquivExitCode {
    match translate_filter_inner(args.filter_file.as_ref()).and_then(|expr| print_expr(&expr)) {
        Ok(()) => AuthzEquivExitCode::Success,
        Err(e) => {
            eprintln!("{e:?}");
            AuthzEquivExitCode::Failure
        }
    }
}

pub fn compare(args: &CompareArgs) -> AuthzEquivExitCode {
    let residual = match translate_residual_inner(&args.residual) {
        Ok(expr) => expr,
        Err(e) => {
            eprintln!("{e:?}");
            return AuthzEquivExitCode::Failure;
        }
    };
    let filter = match translate_filter_inner(Some(&args.filter_file)) {
        Ok(expr) => expr,
        Err(e) => {
            eprintln!("{e:?}");
            return AuthzEquivExitCode::Failure;
        }
    };
    match first_mismatch(&residual, &filter) {
        None => {
            println!("equivalent");
            return AuthzEquivExitCode::Success;
        }
        Some(mismatch) => {
            println!("not equivalent: first difference {mismatch}");
            println!("residual: {residual}");
            println!("filter:   {filter}");
            return AuthzEquivExitCode::Mismatch;
        }
    }
}

fn load_harness(args: &RunArgs) -> Result<(DifferentialHarness, Scenario)> {
    let config = HarnessConfig::from_json_file(&args.config_file)
        .map_err(Report::from)
        .wrap_err("failed to load harness configuration")?;
    let scenario = Scenario::from_json_file(&args.scenario_file)
        .map_err(Report::from)
        .wrap_err("failed to load scenario")?;
    let harness = DifferentialHarness::from_config(config).map_err(Report::from)?;
    Ok((harness, scenario))
}

pub fn run(args: &RunArgs) -> AuthzEquivExitCode {
    let (harness, scenario) = match load_harness(args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("{e:?}");
            return AuthzEquivExitCode::Failure;
        }
    };
    match harness.check(&scenario) {
        Ok(expr) => {
            println!("equivalent: {expr}");
            return AuthzEquivExitCode::Success;
        }
        Err(e @ HarnessError::Mismatch(_)) => {
            println!("{:?}", Report::from(e));
            return AuthzEquivExitCode::Mismatch;
        }
        Err(e) => {
            eprintln!("{:?}", Report::from(e));
            return AuthzEquivExitCode::Failure;
        }
    }
}

fn read_principal(filename: impl AsRef<Path>) -> Result<Principal> {
    let src = read_from_file(filename.as_ref(), "principal")?;
    serde_json::from_str(&src)
        .into_diagnostic()
        .wrap_err_with(|| {
            format!(
                "failed to parse principal from file {}",
                filename.as_ref().display()
            )
        })
}

fn read_json_from_file_or_stdin(
    filename: Option<impl AsRef<Path>>,
    context: &str,
) -> Result<serde_json::Value> {
    let src = read_from_file_or_stdin(filename, context)?;
    serde_json::from_str(&src)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to parse {context} as JSON"))
}

// Read from a file (when `filename` is a `Some`) or stdin (when `filename` is `None`)
fn read_from_file_or_stdin(filename: Option<impl AsRef<Path>>, context: &str) -> Result<String> {
    let mut src_str = String::new();
    match filename.as_ref() {
        Some(path) => {
            src_str = std::fs::read_to_string(path)
                .into_diagnostic()
                .wrap_err_with(|| {
                    format!(
                        "failed to open {} file {}",
                        context,
                        path.as_ref().display()
                    )
                })?;
        }
        None => {
            std::io::Read::read_to_string(&mut std::io::stdin(), &mut src_str)
                .into_diagnostic()
                .wrap_err_with(|| format!("failed to read {} from stdin", context))?;
        }
    };
    Ok(src_str)
}

// Convenient wrapper around `read_from_file_or_stdin` to just read from a file
fn read_from_file(filename: impl AsRef<Path>, context: &str) -> Result<String> {
    read_from_file_or_stdin(Some(filename), context)
}
