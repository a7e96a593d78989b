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

//! Translation of partial-evaluation residuals into the canonical IR.
//!
//! A residual is the condition a policy engine leaves behind when it
//! evaluates a policy against a request whose resource is not yet known.
//! [`translate_residual`] maps each node onto the IR one-to-one, with two
//! normalizations:
//!
//! - chains of binary `&&` (or `||`) are flattened into a single n-ary node,
//!   keeping the operands in left-to-right, depth-first order;
//! - when a [`Principal`] is supplied, `principal.<attr>` is replaced by the
//!   principal's value for `<attr>`.

mod err;
pub use err::*;
mod expr;
pub use expr::*;

use crate::ir::{Expr, Var};
use crate::principal::Principal;
use smol_str::SmolStr;
use std::sync::Arc;

/// Translate a decoded residual into the IR.
///
/// `principal.<attr>` references are left as attribute accesses when
/// `principal` is `None`.
pub fn translate_residual(
    residual: &ResidualExpr,
    principal: Option<&Principal>,
) -> Result<Expr, ResidualError> {
    Translator { principal }.translate(residual)
}

/// Decode a residual from JSON and translate it into the IR
pub fn translate_residual_json(
    json: serde_json::Value,
    principal: Option<&Principal>,
) -> Result<Expr, ResidualError> {
    let residual = ResidualExpr::from_json(json)?;
    translate_residual(&residual, principal)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Junction {
    And,
    Or,
}

#[derive(Debug, Clone, Copy)]
struct Translator<'a> {
    principal: Option<&'a Principal>,
}

impl Translator<'_> {
    fn translate(&self, residual: &ResidualExpr) -> Result<Expr, ResidualError> {
        match residual {
            ResidualExpr::Known(op) => self.translate_op(op),
            ResidualExpr::Other(node) => Err(reject(node)),
        }
    }

    fn translate_op(&self, op: &ResidualOp) -> Result<Expr, ResidualError> {
        match op {
            ResidualOp::Value(v) => Ok(Expr::lit(v.clone())),
            ResidualOp::Var(v) => Ok(Expr::var(*v)),
            ResidualOp::GetAttr { left, attr } => {
                let base = self.translate(left)?;
                self.get_attr(base, attr)
            }
            ResidualOp::Eq { left, right } => {
                Ok(Expr::eq(self.translate(left)?, self.translate(right)?))
            }
            ResidualOp::And { left, right } => {
                Ok(Expr::And(self.junction(Junction::And, left, right)?))
            }
            ResidualOp::Or { left, right } => {
                Ok(Expr::Or(self.junction(Junction::Or, left, right)?))
            }
            ResidualOp::Is {
                left,
                entity_type,
                in_expr,
            } => {
                let in_expr = in_expr
                    .as_deref()
                    .map(|e| self.translate(e))
                    .transpose()?;
                Ok(Expr::Is {
                    left: Arc::new(self.translate(left)?),
                    entity_type: entity_type.clone(),
                    in_expr: in_expr.map(Arc::new),
                })
            }
            ResidualOp::Unknown(args) => match args.as_slice() {
                [ResidualExpr::Known(ResidualOp::Value(serde_json::Value::String(name)))] => {
                    Ok(Expr::unknown(name.as_str()))
                }
                _ => Err(ResidualError::MalformedUnknown),
            },
        }
    }

    /// `base.attr`, resolving identity attributes when `base` is `principal`
    fn get_attr(&self, base: Expr, attr: &SmolStr) -> Result<Expr, ResidualError> {
        match self.principal {
            Some(principal) if base.is_var(Var::Principal) => Ok(principal.resolve(attr)?),
            _ => Ok(Expr::attr(base, attr.clone())),
        }
    }

    /// Operands of a `junction` node whose binary children are `left` and
    /// `right`, with same-junction descendants spliced in place
    fn junction(
        &self,
        junction: Junction,
        left: &ResidualExpr,
        right: &ResidualExpr,
    ) -> Result<Vec<Expr>, ResidualError> {
        let mut operands = Vec::new();
        self.flatten_into(junction, left, &mut operands)?;
        self.flatten_into(junction, right, &mut operands)?;
        Ok(operands)
    }

    fn flatten_into(
        &self,
        junction: Junction,
        residual: &ResidualExpr,
        operands: &mut Vec<Expr>,
    ) -> Result<(), ResidualError> {
        match (junction, residual) {
            (Junction::And, ResidualExpr::Known(ResidualOp::And { left, right }))
            | (Junction::Or, ResidualExpr::Known(ResidualOp::Or { left, right })) => {
                self.flatten_into(junction, left, operands)?;
                self.flatten_into(junction, right, operands)
            }
            _ => {
                operands.push(self.translate(residual)?);
                Ok(())
            }
        }
    }
}

/// The error for a node that did not decode as any supported operator
fn reject(node: &serde_json::Map<String, serde_json::Value>) -> ResidualError {
    let mut keys = node.keys();
    match (keys.next(), keys.next()) {
        (None, _) => ResidualError::MissingOperator,
        (Some(op), None) => match expected_shape(op) {
            Some(shape) => ResidualError::MalformedOperator {
                op: op.into(),
                expected: Some(format!("expected {shape}")),
            },
            None => ResidualError::UnsupportedOperator { op: op.into() },
        },
        (Some(_), Some(_)) => ResidualError::MultipleOperators {
            ops: node.keys().map(SmolStr::new).collect(),
        },
    }
}
