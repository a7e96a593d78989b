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

//! Translation of legacy row filters into the canonical IR.
//!
//! Legacy filters only ever constrain the record being fetched, so every
//! field comparison is rooted at `resource`: `{ "owner": { "eq": "x" } }`
//! becomes `resource.owner == "x"`, the same path a residual uses.

mod err;
pub use err::*;
mod expr;
pub use expr::*;

use crate::ir::{Expr, Var};

/// Translate a decoded legacy filter into the IR.
///
/// `and`/`or` keep their operand order. A combinator nested directly inside
/// the same combinator is spliced into its parent, so the result has the same
/// shape as a flattened residual.
pub fn translate_filter(filter: &Filter) -> Result<Expr, FilterError> {
    match filter {
        Filter::Or(filters) => {
            let mut operands = Vec::new();
            splice_into(filters, as_or, &mut operands)?;
            Ok(Expr::Or(operands))
        }
        Filter::And(filters) => {
            let mut operands = Vec::new();
            splice_into(filters, as_and, &mut operands)?;
            Ok(Expr::And(operands))
        }
        Filter::Not(_) => Err(FilterError::UnsupportedNegation),
        Filter::Field {
            field,
            op: FilterOperator::Eq,
            value,
        } => Ok(Expr::eq(
            Expr::attr(Expr::var(Var::Resource), field.clone()),
            Expr::lit(value.clone()),
        )),
    }
}

/// Decode a legacy filter from JSON and translate it into the IR
pub fn translate_filter_json(json: &serde_json::Value) -> Result<Expr, FilterError> {
    translate_filter(&Filter::from_json(json)?)
}

fn as_or(filter: &Filter) -> Option<&[Filter]> {
    match filter {
        Filter::Or(filters) => Some(filters.as_slice()),
        _ => None,
    }
}

fn as_and(filter: &Filter) -> Option<&[Filter]> {
    match filter {
        Filter::And(filters) => Some(filters.as_slice()),
        _ => None,
    }
}

fn splice_into(
    filters: &[Filter],
    same: fn(&Filter) -> Option<&[Filter]>,
    operands: &mut Vec<Expr>,
) -> Result<(), FilterError> {
    for filter in filters {
        match same(filter) {
            Some(nested) => splice_into(nested, same, operands)?,
            None => operands.push(translate_filter(filter)?),
        }
    }
    Ok(())
}
