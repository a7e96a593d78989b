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

//! Shared test fixtures for owner-based authorization: the same rule
//! ("the record's owner may access it") expressed as a residual, as a legacy
//! filter, and as the IR both should translate to.

use crate::ir::{Expr, Var};
use crate::principal::Principal;
use serde_json::json;

/// Attribute of the record holding the owner's identity
pub const OWNER_FIELD: &str = "owner";

/// A principal with the usual composite key
pub fn owner_principal() -> Principal {
    Principal::new(
        "1234-5678-90abcdef",
        "my-username",
        "1234-5678-90abcdef::my-username",
    )
}

/// `resource.owner == principal.<attr>` in residual JSON
pub fn owner_matches_principal(attr: &str) -> serde_json::Value {
    json!({
        "==": {
            "left": { ".": { "left": { "Var": "resource" }, "attr": OWNER_FIELD } },
            "right": { ".": { "left": { "Var": "principal" }, "attr": attr } }
        }
    })
}

/// `resource.owner == principal.subUsername || resource.owner == principal.sub
/// || resource.owner == principal.username`, left-nested the way a policy
/// engine emits it
pub fn owner_residual() -> serde_json::Value {
    json!({
        "||": {
            "left": {
                "||": {
                    "left": owner_matches_principal("subUsername"),
                    "right": owner_matches_principal("sub")
                }
            },
            "right": owner_matches_principal("username")
        }
    })
}

/// The legacy filter for `principal`'s records, in the same order as
/// [`owner_residual`]
pub fn owner_filter(principal: &Principal) -> serde_json::Value {
    json!({
        "or": [
            { OWNER_FIELD: { "eq": principal.sub_username() } },
            { OWNER_FIELD: { "eq": principal.sub() } },
            { OWNER_FIELD: { "eq": principal.username() } }
        ]
    })
}

/// The IR both [`owner_residual`] and [`owner_filter`] translate to
pub fn owner_ir(principal: &Principal) -> Expr {
    let owner_is = |value: &str| {
        Expr::eq(
            Expr::attr(Expr::var(Var::Resource), OWNER_FIELD),
            Expr::lit(value),
        )
    };
    Expr::or([
        owner_is(principal.sub_username()),
        owner_is(principal.sub()),
        owner_is(principal.username()),
    ])
}

/// Wrap `rule` in the conjuncts a policy engine puts in front of every
/// residual for a `permit(principal, action, resource is <entity_type>)`
/// policy: two scope conjuncts that evaluated to `true`, then the entity type
/// check
pub fn with_scope_conjuncts(entity_type: &str, rule: serde_json::Value) -> serde_json::Value {
    json!({
        "&&": {
            "left": {
                "&&": {
                    "left": {
                        "&&": {
                            "left": { "Value": true },
                            "right": { "Value": true }
                        }
                    },
                    "right": { "is": { "left": { "Var": "resource" }, "entity_type": entity_type } }
                }
            },
            "right": rule
        }
    })
}
