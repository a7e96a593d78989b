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


//! Property tests for the shape of translated trees: flattening, operand
//! order and serialization stability, over randomly nested `&&`/`||`
//! residuals and `and`/`or` legacy filters.

// PANIC SAFETY: unit tests
#![allow(clippy::unwrap_used)]
// PANIC SAFETY: unit tests
#![allow(clippy::indexing_slicing)]

use crate::filter::translate_filter_json;
use crate::ir::Expr;
use crate::residual::translate_residual_json;
use crate::test_utils::{owner_matches_principal, owner_principal};
use proptest::prelude::*;
use serde_json::{json, Value};

fn residual_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        prop_oneof![Just("sub"), Just("username"), Just("subUsername")]
            .prop_map(owner_matches_principal),
        "[a-z0-9-]{1,12}".prop_map(|owner| json!({
            "==": {
                "left": { ".": { "left": { "Var": "resource" }, "attr": "owner" } },
                "right": { "Value": owner }
            }
        })),
        "[A-Z][a-z]{0,6}".prop_map(|entity_type| json!({
            "is": { "left": { "Var": "resource" }, "entity_type": entity_type }
        })),
        prop_oneof![Just("resource"), Just("context")]
            .prop_map(|name| json!({ "unknown": [{ "Value": name }] })),
        any::<bool>().prop_map(|b| json!({ "Value": b })),
    ]
}

fn binary(op: &str, left: Value, right: Value) -> Value {
    let mut node = serde_json::Map::new();
    node.insert(op.to_string(), json!({ "left": left, "right": right }));
    Value::Object(node)
}

/// Binary `&&`/`||` trees of arbitrary shape, with operators mixed freely
fn residual_tree() -> impl Strategy<Value = Value> {
    residual_leaf().prop_recursive(6, 64, 2, |inner| {
        (prop_oneof![Just("&&"), Just("||")], inner.clone(), inner)
            .prop_map(|(op, left, right)| binary(op, left, right))
    })
}

fn filter_leaf() -> impl Strategy<Value = Value> {
    let value = prop_oneof![
        "[a-z0-9:-]{0,12}".prop_map(Value::from),
        any::<i32>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
    ];
    (prop_oneof![Just("owner"), Just("groupId"), Just("status")], value)
        .prop_map(|(field, value)| json!({ field: { "eq": value } }))
}

/// `and`/`or` filters of arbitrary shape, including empty combinators
fn filter_tree() -> impl Strategy<Value = Value> {
    filter_leaf().prop_recursive(4, 48, 4, |inner| {
        (
            prop_oneof![Just("and"), Just("or")],
            prop::collection::vec(inner, 0..4),
        )
            .prop_map(|(combinator, operands)| {
                let mut node = serde_json::Map::new();
                node.insert(combinator.to_string(), Value::Array(operands));
                Value::Object(node)
            })
    })
}

/// Operands `json` flattens to under the binary operator `op`, in order
fn residual_chain<'a>(json: &'a Value, op: &str, out: &mut Vec<&'a Value>) {
    match json.get(op) {
        Some(node) => {
            residual_chain(&node["left"], op, out);
            residual_chain(&node["right"], op, out);
        }
        None => out.push(json),
    }
}

/// Non-junction nodes of a residual, depth-first
fn residual_leaves<'a>(json: &'a Value, out: &mut Vec<&'a Value>) {
    match json.get("&&").or_else(|| json.get("||")) {
        Some(node) => {
            residual_leaves(&node["left"], out);
            residual_leaves(&node["right"], out);
        }
        None => out.push(json),
    }
}

/// Operands `json` flattens to under `combinator`, in order
fn filter_chain<'a>(json: &'a Value, combinator: &str, out: &mut Vec<&'a Value>) {
    match json.get(combinator).and_then(Value::as_array) {
        Some(operands) => operands
            .iter()
            .for_each(|operand| filter_chain(operand, combinator, out)),
        None => out.push(json),
    }
}

/// Field predicates of a filter, depth-first
fn filter_leaves<'a>(json: &'a Value, out: &mut Vec<&'a Value>) {
    match json
        .get("and")
        .or_else(|| json.get("or"))
        .and_then(Value::as_array)
    {
        Some(operands) => operands
            .iter()
            .for_each(|operand| filter_leaves(operand, out)),
        None => out.push(json),
    }
}

/// Non-junction nodes of an IR tree, depth-first
fn expr_leaves<'a>(e: &'a Expr, out: &mut Vec<&'a Expr>) {
    match e {
        Expr::And(operands) | Expr::Or(operands) => {
            operands.iter().for_each(|operand| expr_leaves(operand, out));
        }
        other => out.push(other),
    }
}

/// No `And` directly inside an `And`, and no `Or` directly inside an `Or`
fn is_flat(e: &Expr) -> bool {
    let nested_same = match e {
        Expr::And(operands) => operands.iter().any(|o| matches!(o, Expr::And(_))),
        Expr::Or(operands) => operands.iter().any(|o| matches!(o, Expr::Or(_))),
        _ => false,
    };
    !nested_same && e.children().into_iter().all(is_flat)
}

fn junction_operands<'a>(e: &'a Expr, tag: &str) -> Option<&'a [Expr]> {
    match (e, tag) {
        (Expr::And(operands), "&&" | "and") | (Expr::Or(operands), "||" | "or") => {
            Some(operands.as_slice())
        }
        _ => None,
    }
}

proptest! {
    #[test]
    fn residual_chains_flatten(json in residual_tree()) {
        let principal = owner_principal();
        let e = translate_residual_json(json.clone(), Some(&principal)).unwrap();
        prop_assert!(is_flat(&e), "{e}");

        for op in ["&&", "||"] {
            if json.get(op).is_some() {
                let mut chain = Vec::new();
                residual_chain(&json, op, &mut chain);
                let operands = junction_operands(&e, op);
                prop_assert!(operands.is_some(), "`{op}` root translated to {e}");
                let operands = operands.unwrap();
                prop_assert_eq!(operands.len(), chain.len());
                for (operand, source) in operands.iter().zip(chain) {
                    let alone = translate_residual_json(source.clone(), Some(&principal)).unwrap();
                    prop_assert_eq!(operand, &alone);
                }
            }
        }

        let mut source = Vec::new();
        residual_leaves(&json, &mut source);
        let mut translated = Vec::new();
        expr_leaves(&e, &mut translated);
        prop_assert_eq!(translated.len(), source.len());
        for (leaf, source) in translated.into_iter().zip(source) {
            let alone = translate_residual_json(source.clone(), Some(&principal)).unwrap();
            prop_assert_eq!(leaf, &alone);
        }
    }

    #[test]
    fn residual_translation_is_deterministic(json in residual_tree()) {
        let principal = owner_principal();
        let first = translate_residual_json(json.clone(), Some(&principal)).unwrap();
        let second = translate_residual_json(json, Some(&principal)).unwrap();
        let bytes = serde_json::to_string(&first).unwrap();
        prop_assert_eq!(&bytes, &serde_json::to_string(&second).unwrap());
        prop_assert_eq!(&bytes, &serde_json::to_string(&first.to_json()).unwrap());
    }

    #[test]
    fn filter_combinators_flatten(json in filter_tree()) {
        let e = translate_filter_json(&json).unwrap();
        prop_assert!(is_flat(&e), "{e}");

        for combinator in ["and", "or"] {
            if json.get(combinator).is_some() {
                let mut chain = Vec::new();
                filter_chain(&json, combinator, &mut chain);
                let operands = junction_operands(&e, combinator);
                prop_assert!(operands.is_some(), "`{combinator}` root translated to {e}");
                let operands = operands.unwrap();
                prop_assert_eq!(operands.len(), chain.len());
                for (operand, source) in operands.iter().zip(chain) {
                    prop_assert_eq!(operand, &translate_filter_json(source).unwrap());
                }
            }
        }

        let mut source = Vec::new();
        filter_leaves(&json, &mut source);
        let mut translated = Vec::new();
        expr_leaves(&e, &mut translated);
        prop_assert_eq!(translated.len(), source.len());
        for (leaf, source) in translated.into_iter().zip(source) {
            prop_assert_eq!(leaf, &translate_filter_json(source).unwrap());
        }
    }

    #[test]
    fn filter_translation_is_deterministic(json in filter_tree()) {
        let first = translate_filter_json(&json).unwrap();
        let second = translate_filter_json(&json).unwrap();
        let bytes = serde_json::to_string(&first).unwrap();
        prop_assert_eq!(&bytes, &serde_json::to_string(&second).unwrap());
        prop_assert_eq!(&bytes, &serde_json::to_string(&first.to_json()).unwrap());
    }
}
