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

use miette::Diagnostic;
use smol_str::SmolStr;
use thiserror::Error;

/// Errors arising while decoding a legacy filter or translating it into the
/// IR
#[derive(Debug, Clone, PartialEq, Eq, Diagnostic, Error)]
pub enum FilterError {
    /// Every filter node is a JSON object
    #[error("expected a filter object, found {found}")]
    #[diagnostic(code(authz_equiv::filter::not_an_object))]
    NotAnObject {
        /// kind of JSON value that was found instead
        found: &'static str,
    },
    /// The filter contained the empty JSON object `{}`
    #[error("empty filter object")]
    #[diagnostic(code(authz_equiv::filter::empty))]
    Empty,
    /// A filter object had more than one key
    #[error("found multiple keys in one filter object: {keys:?}")]
    #[diagnostic(
        code(authz_equiv::filter::multiple_keys),
        help("combine predicates explicitly with `and` or `or`")
    )]
    MultipleKeys {
        /// the keys that were found
        keys: Vec<SmolStr>,
    },
    /// `and`/`or` did not carry an array of filters
    #[error("`{combinator}` must hold an array of filters")]
    #[diagnostic(code(authz_equiv::filter::combinator_not_array))]
    CombinatorNotArray {
        /// `and` or `or`
        combinator: SmolStr,
    },
    /// A field predicate had no operator
    #[error("predicate on field `{field}` has no operator")]
    #[diagnostic(code(authz_equiv::filter::missing_field_operator))]
    MissingFieldOperator {
        /// field being compared
        field: SmolStr,
    },
    /// A field predicate had more than one operator
    #[error("predicate on field `{field}` has multiple operators: {ops:?}")]
    #[diagnostic(code(authz_equiv::filter::multiple_field_operators))]
    MultipleFieldOperators {
        /// field being compared
        field: SmolStr,
        /// the operators that were found
        ops: Vec<SmolStr>,
    },
    /// A field predicate used an operator with no IR counterpart
    #[error("unsupported operator `{op}` on field `{field}`")]
    #[diagnostic(
        code(authz_equiv::filter::unsupported_operator),
        help("supported field operators are: `eq`")
    )]
    UnsupportedOperator {
        /// field being compared
        field: SmolStr,
        /// the operator that was found
        op: SmolStr,
    },
    /// `not` has no IR counterpart
    #[error("negated filters are not supported")]
    #[diagnostic(code(authz_equiv::filter::unsupported_negation))]
    UnsupportedNegation,
}
