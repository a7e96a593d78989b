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

//! Structural comparison of IR trees.
//!
//! Comparison is exact: node kinds must agree, literals must be equal JSON
//! values, and `And`/`Or` operands are compared position by position. Two
//! conjunctions holding the same operands in a different order are *not*
//! equivalent; both translators emit operands in source order, so a
//! reordering on either side shows up here instead of being absorbed.

use crate::ir::{Expr, ExprKind};
use std::fmt::{self, Display};

/// Are `a` and `b` the same expression?
pub fn equivalent(a: &Expr, b: &Expr) -> bool {
    first_mismatch(a, b).is_none()
}

/// The first place, in depth-first order, where `a` and `b` differ
pub fn first_mismatch(a: &Expr, b: &Expr) -> Option<Mismatch> {
    let mut path = Vec::new();
    walk(a, b, &mut path)
}

/// One step from a node to one of its children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// `left` of an attribute access, `==` or `is`
    Left,
    /// `right` of `==`
    Right,
    /// `in` of `is`
    In,
    /// an operand of `and`/`or`
    Operand(usize),
}

impl Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Left => write!(f, ".left"),
            PathSegment::Right => write!(f, ".right"),
            PathSegment::In => write!(f, ".in"),
            PathSegment::Operand(i) => write!(f, "[{i}]"),
        }
    }
}

/// Why two nodes at the same path differ
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MismatchReason {
    /// different node kinds
    Kind {
        /// kind on the left
        left: ExprKind,
        /// kind on the right
        right: ExprKind,
    },
    /// different literal values, variables or unknown names
    Value,
    /// different attribute names
    Attr,
    /// different entity types in `is`
    EntityType,
    /// `is` with `in` on one side only
    InPresence,
    /// `and`/`or` with different operand counts
    OperandCount {
        /// count on the left
        left: usize,
        /// count on the right
        right: usize,
    },
}

impl Display for MismatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MismatchReason::Kind { left, right } => write!(f, "`{left}` vs `{right}` node"),
            MismatchReason::Value => write!(f, "different values"),
            MismatchReason::Attr => write!(f, "different attributes"),
            MismatchReason::EntityType => write!(f, "different entity types"),
            MismatchReason::InPresence => write!(f, "`in` present on one side only"),
            MismatchReason::OperandCount { left, right } => {
                write!(f, "{left} operand(s) vs {right}")
            }
        }
    }
}

/// The first difference between two expressions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// Path from the roots to the differing nodes
    pub path: Vec<PathSegment>,
    /// Why the nodes differ
    pub reason: MismatchReason,
    /// The subtree on the left
    pub left: Expr,
    /// The subtree on the right
    pub right: Expr,
}

impl Mismatch {
    /// The path rendered as `$`, `$.left`, `$[2].right`, ...
    pub fn path_string(&self) -> String {
        std::iter::once("$".to_string())
            .chain(self.path.iter().map(ToString::to_string))
            .collect()
    }
}

impl Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "at `{}` ({}): `{}` vs `{}`",
            self.path_string(),
            self.reason,
            self.left,
            self.right
        )
    }
}

fn mismatch(path: &[PathSegment], a: &Expr, b: &Expr, reason: MismatchReason) -> Mismatch {
    Mismatch {
        path: path.to_vec(),
        reason,
        left: a.clone(),
        right: b.clone(),
    }
}

fn child(
    a: &Expr,
    b: &Expr,
    segment: PathSegment,
    path: &mut Vec<PathSegment>,
) -> Option<Mismatch> {
    path.push(segment);
    let found = walk(a, b, path);
    path.pop();
    found
}

fn walk(a: &Expr, b: &Expr, path: &mut Vec<PathSegment>) -> Option<Mismatch> {
    match (a, b) {
        (Expr::Literal(x), Expr::Literal(y)) => {
            (x != y).then(|| mismatch(path, a, b, MismatchReason::Value))
        }
        (Expr::Var(x), Expr::Var(y)) => (x != y).then(|| mismatch(path, a, b, MismatchReason::Value)),
        (Expr::Unknown(x), Expr::Unknown(y)) => {
            (x != y).then(|| mismatch(path, a, b, MismatchReason::Value))
        }
        (
            Expr::Attr {
                left: base_a,
                attr: attr_a,
            },
            Expr::Attr {
                left: base_b,
                attr: attr_b,
            },
        ) => {
            if attr_a != attr_b {
                Some(mismatch(path, a, b, MismatchReason::Attr))
            } else {
                child(base_a, base_b, PathSegment::Left, path)
            }
        }
        (
            Expr::Eq {
                left: left_a,
                right: right_a,
            },
            Expr::Eq {
                left: left_b,
                right: right_b,
            },
        ) => child(left_a, left_b, PathSegment::Left, path)
            .or_else(|| child(right_a, right_b, PathSegment::Right, path)),
        (Expr::And(ops_a), Expr::And(ops_b)) | (Expr::Or(ops_a), Expr::Or(ops_b)) => {
            if ops_a.len() != ops_b.len() {
                return Some(mismatch(
                    path,
                    a,
                    b,
                    MismatchReason::OperandCount {
                        left: ops_a.len(),
                        right: ops_b.len(),
                    },
                ));
            }
            ops_a
                .iter()
                .zip(ops_b)
                .enumerate()
                .find_map(|(i, (x, y))| child(x, y, PathSegment::Operand(i), path))
        }
        (
            Expr::Is {
                left: left_a,
                entity_type: ty_a,
                in_expr: in_a,
            },
            Expr::Is {
                left: left_b,
                entity_type: ty_b,
                in_expr: in_b,
            },
        ) => {
            if ty_a != ty_b {
                return Some(mismatch(path, a, b, MismatchReason::EntityType));
            }
            child(left_a, left_b, PathSegment::Left, path).or_else(|| match (in_a, in_b) {
                (None, None) => None,
                (Some(x), Some(y)) => child(x, y, PathSegment::In, path),
                _ => Some(mismatch(path, a, b, MismatchReason::InPresence)),
            })
        }
        _ => Some(mismatch(
            path,
            a,
            b,
            MismatchReason::Kind {
                left: a.kind(),
                right: b.kind(),
            },
        )),
    }
}
