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

use authz_equiv_core::{Expr, FilterError, Mismatch, ResidualError};
use miette::Diagnostic;
use smol_str::SmolStr;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from a differential run.
///
/// The variants separate the three ways a run can fail: a collaborator
/// produced something unusable ([`HarnessError::Fixture`]), one side could
/// not be translated, or both sides translated and differ
/// ([`HarnessError::Mismatch`]). Only the last one is an authorization
/// finding.
#[derive(Debug, Diagnostic, Error)]
pub enum HarnessError {
    /// A collaborator's output could not be used
    #[error(transparent)]
    #[diagnostic(transparent)]
    Fixture(#[from] FixtureError),
    /// The legacy filter could not be translated
    #[error(transparent)]
    #[diagnostic(transparent)]
    LegacyTranslation(#[from] FilterError),
    /// The policy residual could not be translated
    #[error(transparent)]
    #[diagnostic(transparent)]
    PolicyTranslation(#[from] ResidualError),
    /// Both sides translated, and they differ
    #[error(transparent)]
    #[diagnostic(transparent)]
    Mismatch(#[from] MismatchError),
}

impl HarnessError {
    /// Is this an equivalence failure, rather than a broken fixture?
    pub fn is_mismatch(&self) -> bool {
        matches!(self, HarnessError::Mismatch(_))
    }
}

/// The legacy filter and the policy residual translated to different
/// expressions
#[derive(Debug, Diagnostic, Error)]
#[error("legacy filter and policy residual are not equivalent: first difference {mismatch}")]
#[diagnostic(code(authz_equiv::harness::mismatch))]
pub struct MismatchError {
    /// Translation of the legacy filter
    pub legacy: Expr,
    /// Translation of the policy residual
    pub policy: Expr,
    /// First difference between the two
    pub mismatch: Mismatch,
    #[help]
    sides: String,
}

impl MismatchError {
    /// Record a mismatch between the two translations
    pub fn new(legacy: Expr, policy: Expr, mismatch: Mismatch) -> Self {
        let sides = format!("legacy: {legacy}\npolicy: {policy}");
        Self {
            legacy,
            policy,
            mismatch,
            sides,
        }
    }
}

/// A collaborator returned output the harness cannot use. These point at a
/// broken scenario or environment, not at an authorization difference.
#[derive(Debug, Diagnostic, Error)]
pub enum FixtureError {
    /// The template-evaluation service could not be reached
    #[error("request to template-evaluation service at `{endpoint}` failed")]
    #[diagnostic(code(authz_equiv::fixture::template_service))]
    TemplateServiceRequest {
        /// service endpoint
        endpoint: String,
        /// underlying error
        #[source]
        source: reqwest::Error,
    },
    /// The template-evaluation service answered with a non-success status
    #[error("template-evaluation service returned status {status}: {body}")]
    #[diagnostic(code(authz_equiv::fixture::template_service_status))]
    TemplateServiceStatus {
        /// HTTP status code
        status: u16,
        /// response body, empty if it could not be read
        body: String,
        /// error reading the response body
        #[source]
        body_error: Option<reqwest::Error>,
    },
    /// The service evaluated the script and reported an error
    #[error("template evaluation failed{}: {message}", .error_type.as_ref().map(|t| format!(" ({t})")).unwrap_or_default())]
    #[diagnostic(code(authz_equiv::fixture::template_evaluation))]
    TemplateEvaluation {
        /// error message from the service
        message: String,
        /// error type from the service, if any
        error_type: Option<String>,
    },
    /// The evaluation result was missing or blank
    #[error("template evaluation returned an empty result")]
    #[diagnostic(
        code(authz_equiv::fixture::empty_evaluation_result),
        help("the script must end with the context-dump line")
    )]
    EmptyEvaluationResult,
    /// The last line of the evaluation result was not JSON
    #[error("last line of the evaluation result is not JSON: `{line}`")]
    #[diagnostic(code(authz_equiv::fixture::non_json_final_line))]
    NonJsonFinalLine {
        /// the offending line
        line: String,
        /// underlying error
        #[source]
        source: serde_json::Error,
    },
    /// The dumped context did not contain the sentinel key
    #[error("evaluation result has no `{key}` entry")]
    #[diagnostic(code(authz_equiv::fixture::missing_sentinel))]
    MissingSentinel {
        /// sentinel key that was expected
        key: SmolStr,
    },
    /// The dumped context had no authorization filter
    #[error("runtime context has no authorization filter at `{path}`")]
    #[diagnostic(code(authz_equiv::fixture::missing_filter))]
    MissingFilter {
        /// dotted path that was looked up
        path: String,
    },
    /// A value could not be serialized for a collaborator
    #[error("failed to serialize {what}")]
    #[diagnostic(code(authz_equiv::fixture::serialize))]
    Serialize {
        /// what was being serialized
        what: &'static str,
        /// underlying error
        #[source]
        source: serde_json::Error,
    },
    /// Scratch files for the policy engine could not be written
    #[error("failed to write policy-engine input `{}`", .path.display())]
    #[diagnostic(code(authz_equiv::fixture::scratch_io))]
    ScratchIo {
        /// file or directory being written
        path: PathBuf,
        /// underlying error
        #[source]
        source: std::io::Error,
    },
    /// The policy-engine binary could not be started
    #[error("failed to run policy engine `{}`", .binary.display())]
    #[diagnostic(code(authz_equiv::fixture::policy_engine_spawn))]
    PolicyEngineSpawn {
        /// binary that was run
        binary: PathBuf,
        /// underlying error
        #[source]
        source: std::io::Error,
    },
    /// The policy-engine binary exited unsuccessfully
    #[error("policy engine exited with {}: {stderr}", .status.map_or_else(|| "a signal".to_string(), |code| format!("status {code}")))]
    #[diagnostic(code(authz_equiv::fixture::policy_engine_exit))]
    PolicyEngineExit {
        /// exit code, if the process exited normally
        status: Option<i32>,
        /// captured standard error
        stderr: String,
    },
    /// The policy engine's standard output was not a partial response
    #[error("policy engine output is not a partial-evaluation response")]
    #[diagnostic(code(authz_equiv::fixture::policy_engine_output))]
    PolicyEngineOutput {
        /// underlying error
        #[source]
        source: serde_json::Error,
    },
    /// The partial response had no residual policies
    #[error("partial-evaluation response has no residuals")]
    #[diagnostic(
        code(authz_equiv::fixture::no_residuals),
        help("a concrete decision means the request did not depend on the resource")
    )]
    NoResiduals,
    /// The first residual had no conditions
    #[error("first residual has no conditions")]
    #[diagnostic(code(authz_equiv::fixture::no_conditions))]
    NoConditions,
    /// The residual body had fewer conjuncts than the static prefix
    #[error("residual body has {found} conjunct(s), expected more than {dropped} static ones")]
    #[diagnostic(
        code(authz_equiv::fixture::too_few_conjuncts),
        help("check `staticConjuncts` in the harness configuration")
    )]
    TooFewConjuncts {
        /// number of leading conjuncts to drop
        dropped: usize,
        /// number of conjuncts found
        found: usize,
    },
}

/// Errors loading harness configuration or scenarios, before any run
#[derive(Debug, Diagnostic, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read `{}`", .path.display())]
    #[diagnostic(code(authz_equiv::config::io))]
    Io {
        /// file being read
        path: PathBuf,
        /// underlying error
        #[source]
        source: std::io::Error,
    },
    /// The file was not valid
    #[error("failed to parse `{}`", .path.display())]
    #[diagnostic(code(authz_equiv::config::parse))]
    Parse {
        /// file being parsed
        path: PathBuf,
        /// underlying error
        #[source]
        source: serde_json::Error,
    },
    /// The HTTP client could not be built
    #[error("failed to build HTTP client for the template-evaluation service")]
    #[diagnostic(code(authz_equiv::config::http_client))]
    HttpClient(#[source] reqwest::Error),
}
