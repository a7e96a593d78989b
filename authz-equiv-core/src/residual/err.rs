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

use crate::principal::UnknownPrincipalAttributeError;
use miette::Diagnostic;
use smol_str::SmolStr;
use thiserror::Error;

/// Errors arising while translating a residual into the IR.
///
/// None of these are recoverable: a node the translator cannot represent
/// exactly is never dropped or approximated.
#[derive(Debug, Diagnostic, Error)]
pub enum ResidualError {
    /// The residual was not JSON of any expression shape
    #[error("failed to decode residual expression: {0}")]
    #[diagnostic(code(authz_equiv::residual::json))]
    Json(#[from] serde_json::Error),
    /// The residual used an operator the translator does not handle
    #[error("unsupported operator `{op}` in residual")]
    #[diagnostic(
        code(authz_equiv::residual::unsupported_operator),
        help("supported operators are `Value`, `Var`, `.`, `==`, `&&`, `||`, `is` and `unknown`")
    )]
    UnsupportedOperator {
        /// The operator that was found
        op: SmolStr,
    },
    /// A supported operator had a payload of the wrong shape
    #[error("malformed `{op}` node in residual")]
    #[diagnostic(code(authz_equiv::residual::malformed_operator))]
    MalformedOperator {
        /// The operator whose payload was malformed
        op: SmolStr,
        /// Shape the payload should have had
        #[help]
        expected: Option<String>,
    },
    /// The residual contained the empty JSON object `{}` where a key
    /// (operator) was expected
    #[error("missing operator, found empty object")]
    #[diagnostic(code(authz_equiv::residual::missing_operator))]
    MissingOperator,
    /// The residual contained an object with multiple keys (operators) where
    /// a single operator was expected
    #[error("found multiple operators where one was expected: {ops:?}")]
    #[diagnostic(code(authz_equiv::residual::multiple_operators))]
    MultipleOperators {
        /// the multiple operators that were found where one was expected
        ops: Vec<SmolStr>,
    },
    /// `unknown` did not hold exactly one string `Value`
    #[error("`unknown` must hold exactly one string `Value` naming the unknown")]
    #[diagnostic(code(authz_equiv::residual::malformed_unknown))]
    MalformedUnknown,
    /// `principal.<attr>` could not be resolved against the supplied principal
    #[error(transparent)]
    #[diagnostic(transparent)]
    UnknownPrincipalAttribute(#[from] UnknownPrincipalAttributeError),
}
