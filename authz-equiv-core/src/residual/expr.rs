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

use crate::ir::Var;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::sync::Arc;

/// Serde JSON structure for an expression in a policy engine's
/// partial-evaluation residual
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResidualExpr {
    /// One of the operators the translator understands.
    /// We try to match this first, see docs on #[serde(untagged)].
    Known(ResidualOp),
    /// Anything else. This is kept rather than rejected during
    /// deserialization so that the translator can name the operator it
    /// refused.
    Other(serde_json::Map<String, serde_json::Value>),
}

/// Serde JSON structure for the residual operators the translator handles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub enum ResidualOp {
    /// Literal value
    Value(serde_json::Value),
    /// Request variable
    Var(Var),
    /// Get-attribute
    #[serde(rename = ".")]
    GetAttr {
        /// Left-hand argument
        left: Arc<ResidualExpr>,
        /// Attribute name
        attr: SmolStr,
    },
    /// `==`
    #[serde(rename = "==")]
    Eq {
        /// Left-hand argument
        left: Arc<ResidualExpr>,
        /// Right-hand argument
        right: Arc<ResidualExpr>,
    },
    /// `&&`
    #[serde(rename = "&&")]
    And {
        /// Left-hand argument
        left: Arc<ResidualExpr>,
        /// Right-hand argument
        right: Arc<ResidualExpr>,
    },
    /// `||`
    #[serde(rename = "||")]
    Or {
        /// Left-hand argument
        left: Arc<ResidualExpr>,
        /// Right-hand argument
        right: Arc<ResidualExpr>,
    },
    /// `is`, with optional `in`
    #[serde(rename = "is")]
    Is {
        /// Left-hand argument
        left: Arc<ResidualExpr>,
        /// Entity type
        entity_type: SmolStr,
        /// Hierarchy constraint, usually `{ "Value": <entity reference> }`
        #[serde(rename = "in", default, skip_serializing_if = "Option::is_none")]
        in_expr: Option<Arc<ResidualExpr>>,
    },
    /// Unknown (for partial evaluation). The engine emits a one-element array
    /// holding the unknown's name as a `Value`.
    #[serde(rename = "unknown")]
    Unknown(Vec<ResidualExpr>),
}

/// Operator tags of [`ResidualOp`], in declaration order
pub const OPERATORS: [&str; 8] = ["Value", "Var", ".", "==", "&&", "||", "is", "unknown"];

/// Shape the payload of `op` is expected to have, for error messages
pub(crate) fn expected_shape(op: &str) -> Option<&'static str> {
    match op {
        "Value" => Some(r#"{ "Value": <json> }"#),
        "Var" => Some(r#"{ "Var": "principal" | "action" | "resource" | "context" }"#),
        "." => Some(r#"{ ".": { "left": <expr>, "attr": <string> } }"#),
        "==" => Some(r#"{ "==": { "left": <expr>, "right": <expr> } }"#),
        "&&" => Some(r#"{ "&&": { "left": <expr>, "right": <expr> } }"#),
        "||" => Some(r#"{ "||": { "left": <expr>, "right": <expr> } }"#),
        "is" => Some(r#"{ "is": { "left": <expr>, "entity_type": <string>, "in"?: <expr> } }"#),
        "unknown" => Some(r#"{ "unknown": [ { "Value": <string> } ] }"#),
        _ => None,
    }
}

impl ResidualExpr {
    /// Decode a residual expression from JSON
    pub fn from_json(json: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(json)
    }

    /// literal
    pub fn value(v: impl Into<serde_json::Value>) -> Self {
        ResidualExpr::Known(ResidualOp::Value(v.into()))
    }

    /// principal, action, resource, context
    pub fn var(var: Var) -> Self {
        ResidualExpr::Known(ResidualOp::Var(var))
    }

    /// `left.attr`
    pub fn get_attr(left: ResidualExpr, attr: impl Into<SmolStr>) -> Self {
        ResidualExpr::Known(ResidualOp::GetAttr {
            left: Arc::new(left),
            attr: attr.into(),
        })
    }

    /// `==`
    pub fn eq(left: ResidualExpr, right: ResidualExpr) -> Self {
        ResidualExpr::Known(ResidualOp::Eq {
            left: Arc::new(left),
            right: Arc::new(right),
        })
    }

    /// binary `&&`
    pub fn and(left: ResidualExpr, right: ResidualExpr) -> Self {
        ResidualExpr::Known(ResidualOp::And {
            left: Arc::new(left),
            right: Arc::new(right),
        })
    }

    /// binary `||`
    pub fn or(left: ResidualExpr, right: ResidualExpr) -> Self {
        ResidualExpr::Known(ResidualOp::Or {
            left: Arc::new(left),
            right: Arc::new(right),
        })
    }

    /// Unknown named `name`, in the engine's array encoding
    pub fn unknown(name: impl Into<SmolStr>) -> Self {
        let name: SmolStr = name.into();
        ResidualExpr::Known(ResidualOp::Unknown(vec![ResidualExpr::value(name.as_str())]))
    }

    /// The operator tag of this node, if it has exactly one
    pub fn operator(&self) -> Option<&str> {
        match self {
            ResidualExpr::Known(op) => Some(op.tag()),
            ResidualExpr::Other(map) if map.len() == 1 => map.keys().next().map(String::as_str),
            ResidualExpr::Other(_) => None,
        }
    }
}

impl ResidualOp {
    /// The JSON key this operator is tagged with
    pub fn tag(&self) -> &'static str {
        match self {
            ResidualOp::Value(_) => "Value",
            ResidualOp::Var(_) => "Var",
            ResidualOp::GetAttr { .. } => ".",
            ResidualOp::Eq { .. } => "==",
            ResidualOp::And { .. } => "&&",
            ResidualOp::Or { .. } => "||",
            ResidualOp::Is { .. } => "is",
            ResidualOp::Unknown(_) => "unknown",
        }
    }
}
