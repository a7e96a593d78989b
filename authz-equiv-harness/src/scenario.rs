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

//! Differential-test scenarios.

use crate::config::read_json;
use crate::err::ConfigError;
use crate::policy_engine::PolicyInputs;
use authz_equiv_core::Principal;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One operation, described once for each pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Scenario {
    /// Free-form label, used in logs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Inputs of the legacy pipeline
    pub legacy: LegacyInputs,
    /// Inputs of the policy engine
    pub policy: PolicyInputs,
    /// Identity of the caller, substituted into the residual
    pub principal: Principal,
}

/// Inputs of the legacy pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LegacyInputs {
    /// The merged access-control script for the operation
    pub script: String,
    /// Synthetic runtime context the script is evaluated against
    pub request_context: serde_json::Value,
}

impl Scenario {
    /// Load a scenario from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        read_json(path.as_ref())
    }

    /// Label for logs
    pub fn label(&self) -> &str {
        self.description.as_deref().unwrap_or("<unnamed>")
    }
}

#[cfg(test)]
// PANIC SAFETY: unit tests
#[allow(clippy::unwrap_used)]
mod test {
    use super::*;
    use crate::policy_engine::{InputDocument, PolicyRequest};
    use serde_json::json;

    #[test]
    fn parse() {
        let scenario: Scenario = serde_json::from_value(json!({
            "description": "owner reads own todo",
            "legacy": {
                "script": "#set($ctx.stash.authFilter = {})",
                "requestContext": { "identity": { "sub": "1234", "username": "alice" } }
            },
            "policy": {
                "schema": {},
                "policies": "permit(principal, action, resource);",
                "entities": [],
                "request": { "principal": "App::User::\"1234\"", "action": "App::Action::\"Query.getTodo\"" }
            },
            "principal": { "sub": "1234", "username": "alice", "subUsername": "1234::alice" }
        }))
        .unwrap();
        assert_eq!(scenario.label(), "owner reads own todo");
        assert_eq!(scenario.principal, Principal::from_sub_and_username("1234", "alice"));
        assert_eq!(
            scenario.policy.request,
            PolicyRequest::for_field("App", "User", "1234", "Query", "getTodo")
        );
        assert_eq!(
            scenario.policy.policies,
            InputDocument::Text("permit(principal, action, resource);".into())
        );
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(serde_json::from_value::<LegacyInputs>(json!({
            "script": "",
            "requestContext": {},
            "resolver": "Query.getTodo"
        }))
        .is_err());
    }
}
