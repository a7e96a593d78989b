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

//! Canonical expression IR for row-level authorization filters, together with
//! translators from policy-engine residuals and legacy filter objects, and a
//! strict structural comparator over the result.
//!
//! Both translators are pure functions. The only inputs they consult are the
//! source tree and, for residuals, an optional [`Principal`] whose identity
//! attributes are substituted for `principal.<attr>` references.
#![forbid(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

pub mod compare;
pub mod filter;
pub mod ir;
pub mod principal;
pub mod residual;

#[cfg(any(test, feature = "test-util"))]
pub mod test_utils;

#[cfg(test)]
mod prop_test;

pub use compare::{equivalent, first_mismatch, Mismatch, MismatchReason, PathSegment};
pub use filter::{translate_filter, translate_filter_json, Filter, FilterError, FilterOperator};
pub use ir::{Expr, ExprKind, Var};
pub use principal::{Principal, PrincipalAttr, UnknownPrincipalAttributeError};
pub use residual::{translate_residual, translate_residual_json, ResidualError, ResidualExpr};
