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

//! The canonical expression IR that both translators produce.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt::{self, Display};
use std::sync::Arc;

/// Request variables a residual may refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Var {
    /// the authenticated caller
    Principal,
    /// the operation being authorized
    Action,
    /// the record being accessed
    Resource,
    /// request context
    Context,
}

impl Var {
    /// Name of the variable as it appears in source trees
    pub fn as_str(self) -> &'static str {
        match self {
            Var::Principal => "principal",
            Var::Action => "action",
            Var::Resource => "resource",
            Var::Context => "context",
        }
    }
}

impl Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node of the canonical IR.
///
/// The JSON form is a single-key object per node, keyed by the lower-camel-case
/// variant name (`value`, `var`, `attr`, `eq`, `and`, `or`, `is`, `unknown`).
/// Object keys and operand order are preserved on serialization, so equal
/// trees always serialize to identical bytes.
///
/// `And` and `Or` are n-ary. Translators flatten same-operator chains into a
/// single node; an `And` directly inside an `And` (or `Or` inside `Or`) never
/// comes out of a translator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Expr {
    /// Literal value, carried verbatim (this includes entity references)
    #[serde(rename = "value")]
    Literal(serde_json::Value),
    /// Request variable
    Var(Var),
    /// Attribute projection
    Attr {
        /// Expression the attribute is read from
        left: Arc<Expr>,
        /// Attribute name
        attr: SmolStr,
    },
    /// `==`
    Eq {
        /// Left-hand argument
        left: Arc<Expr>,
        /// Right-hand argument
        right: Arc<Expr>,
    },
    /// Conjunction, in source order
    And(Vec<Expr>),
    /// Disjunction, in source order
    Or(Vec<Expr>),
    /// Entity type test, optionally constrained to a hierarchy
    Is {
        /// Expression to test
        left: Arc<Expr>,
        /// Entity type the expression must have
        #[serde(rename = "entityType")]
        entity_type: SmolStr,
        /// Entity the expression must be `in`, if any
        #[serde(rename = "in", default, skip_serializing_if = "Option::is_none")]
        in_expr: Option<Arc<Expr>>,
    },
    /// Value the partial evaluator could not resolve
    Unknown(SmolStr),
}

/// The kind of an [`Expr`] node, without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExprKind {
    /// [`Expr::Literal`]
    Literal,
    /// [`Expr::Var`]
    Var,
    /// [`Expr::Attr`]
    Attr,
    /// [`Expr::Eq`]
    Eq,
    /// [`Expr::And`]
    And,
    /// [`Expr::Or`]
    Or,
    /// [`Expr::Is`]
    Is,
    /// [`Expr::Unknown`]
    Unknown,
}

impl Display for ExprKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExprKind::Literal => "value",
            ExprKind::Var => "var",
            ExprKind::Attr => "attr",
            ExprKind::Eq => "eq",
            ExprKind::And => "and",
            ExprKind::Or => "or",
            ExprKind::Is => "is",
            ExprKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

impl Expr {
    /// literal
    pub fn lit(value: impl Into<serde_json::Value>) -> Self {
        Expr::Literal(value.into())
    }

    /// principal, action, resource, context
    pub fn var(var: Var) -> Self {
        Expr::Var(var)
    }

    /// `left.attr`
    pub fn attr(left: Expr, attr: impl Into<SmolStr>) -> Self {
        Expr::Attr {
            left: Arc::new(left),
            attr: attr.into(),
        }
    }

    /// `==`
    pub fn eq(left: Expr, right: Expr) -> Self {
        Expr::Eq {
            left: Arc::new(left),
            right: Arc::new(right),
        }
    }

    /// n-ary `&&`. The operands are taken as given; callers are responsible
    /// for flattening.
    pub fn and(operands: impl IntoIterator<Item = Expr>) -> Self {
        Expr::And(operands.into_iter().collect())
    }

    /// n-ary `||`. The operands are taken as given; callers are responsible
    /// for flattening.
    pub fn or(operands: impl IntoIterator<Item = Expr>) -> Self {
        Expr::Or(operands.into_iter().collect())
    }

    /// `left is entity_type`
    pub fn is(left: Expr, entity_type: impl Into<SmolStr>) -> Self {
        Expr::Is {
            left: Arc::new(left),
            entity_type: entity_type.into(),
            in_expr: None,
        }
    }

    /// `left is entity_type in in_expr`
    pub fn is_in(left: Expr, entity_type: impl Into<SmolStr>, in_expr: Expr) -> Self {
        Expr::Is {
            left: Arc::new(left),
            entity_type: entity_type.into(),
            in_expr: Some(Arc::new(in_expr)),
        }
    }

    /// Partial-evaluation unknowns
    pub fn unknown(name: impl Into<SmolStr>) -> Self {
        Expr::Unknown(name.into())
    }

    /// Kind of this node
    pub fn kind(&self) -> ExprKind {
        match self {
            Expr::Literal(_) => ExprKind::Literal,
            Expr::Var(_) => ExprKind::Var,
            Expr::Attr { .. } => ExprKind::Attr,
            Expr::Eq { .. } => ExprKind::Eq,
            Expr::And(_) => ExprKind::And,
            Expr::Or(_) => ExprKind::Or,
            Expr::Is { .. } => ExprKind::Is,
            Expr::Unknown(_) => ExprKind::Unknown,
        }
    }

    /// Immediate subexpressions, in order
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Literal(_) | Expr::Var(_) | Expr::Unknown(_) => Vec::new(),
            Expr::Attr { left, .. } => vec![left.as_ref()],
            Expr::Eq { left, right } => vec![left.as_ref(), right.as_ref()],
            Expr::And(operands) | Expr::Or(operands) => operands.iter().collect(),
            Expr::Is { left, in_expr, .. } => std::iter::once(left.as_ref())
                .chain(in_expr.as_deref())
                .collect(),
        }
    }

    /// Is this the request variable `var`?
    pub fn is_var(&self, var: Var) -> bool {
        matches!(self, Expr::Var(v) if *v == var)
    }

    /// Canonical JSON form of this expression
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Expr::Literal(v) => serde_json::json!({ "value": v }),
            Expr::Var(v) => serde_json::json!({ "var": v.as_str() }),
            Expr::Attr { left, attr } => {
                serde_json::json!({ "attr": { "left": left.to_json(), "attr": attr.as_str() } })
            }
            Expr::Eq { left, right } => {
                serde_json::json!({ "eq": { "left": left.to_json(), "right": right.to_json() } })
            }
            Expr::And(ops) => serde_json::json!({ "and": ops.iter().map(Expr::to_json).collect::<Vec<_>>() }),
            Expr::Or(ops) => serde_json::json!({ "or": ops.iter().map(Expr::to_json).collect::<Vec<_>>() }),
            Expr::Is {
                left,
                entity_type,
                in_expr,
            } => {
                let mut body = serde_json::Map::new();
                body.insert("left".into(), left.to_json());
                body.insert("entityType".into(), entity_type.as_str().into());
                if let Some(in_expr) = in_expr {
                    body.insert("in".into(), in_expr.to_json());
                }
                serde_json::json!({ "is": body })
            }
            Expr::Unknown(name) => serde_json::json!({ "unknown": name.as_str() }),
        }
    }

    /// Whether this node must be parenthesized when it appears as the operand
    /// of a binary operator or attribute access
    fn is_compound(&self) -> bool {
        matches!(
            self,
            Expr::Eq { .. } | Expr::And(_) | Expr::Or(_) | Expr::Is { .. }
        )
    }
}

/// Renders `e` as an operand, wrapping it in parens if `parens` is set
struct Operand<'a> {
    e: &'a Expr,
    parens: bool,
}

impl Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.parens {
            write!(f, "({})", self.e)
        } else {
            write!(f, "{}", self.e)
        }
    }
}

fn tight(e: &Expr) -> Operand<'_> {
    Operand {
        e,
        parens: e.is_compound(),
    }
}

fn junct(e: &Expr) -> Operand<'_> {
    Operand {
        e,
        parens: matches!(e, Expr::And(_) | Expr::Or(_)),
    }
}

/// Policy-language-like rendering, intended for diagnostics
impl Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(v) => write!(f, "{v}"),
            Expr::Var(v) => write!(f, "{v}"),
            Expr::Attr { left, attr } => write!(f, "{}.{attr}", tight(left)),
            Expr::Eq { left, right } => write!(f, "{} == {}", tight(left), tight(right)),
            Expr::And(ops) if ops.is_empty() => write!(f, "true"),
            Expr::Or(ops) if ops.is_empty() => write!(f, "false"),
            Expr::And(ops) => write!(f, "{}", ops.iter().map(junct).join(" && ")),
            Expr::Or(ops) => write!(f, "{}", ops.iter().map(junct).join(" || ")),
            Expr::Is {
                left,
                entity_type,
                in_expr,
            } => {
                write!(f, "{} is {entity_type}", tight(left))?;
                match in_expr {
                    Some(in_expr) => write!(f, " in {}", tight(in_expr)),
                    None => Ok(()),
                }
            }
            Expr::Unknown(name) => write!(f, "unknown({name:?})"),
        }
    }
}
