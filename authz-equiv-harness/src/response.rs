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

//! The policy engine's partial-evaluation response.

use crate::err::FixtureError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Output of a partial evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialResponse {
    /// Concrete decision, when the request did not depend on unknowns
    #[serde(default)]
    pub decision: Option<Value>,
    /// Policies that could not be fully evaluated
    #[serde(default)]
    pub residuals: Vec<ResidualPolicy>,
}

/// A policy left over after partial evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidualPolicy {
    /// `permit` or `forbid`
    pub effect: String,
    /// Principal scope
    #[serde(default)]
    pub principal: Value,
    /// Action scope
    #[serde(default)]
    pub action: Value,
    /// Resource scope
    #[serde(default)]
    pub resource: Value,
    /// `when`/`unless` clauses
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Policy annotations
    #[serde(default)]
    pub annotations: Map<String, Value>,
}

/// One `when`/`unless` clause of a residual policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// `when` or `unless`
    pub kind: String,
    /// Residual expression
    pub body: Value,
}

impl PartialResponse {
    /// Body of the first condition of the first residual
    pub fn first_condition_body(&self) -> Result<&Value, FixtureError> {
        let residual = self.residuals.first().ok_or(FixtureError::NoResiduals)?;
        let condition = residual
            .conditions
            .first()
            .ok_or(FixtureError::NoConditions)?;
        Ok(&condition.body)
    }
}

const AND: &str = "&&";

/// Drop the first `dropped` conjuncts of `body`'s `&&` chain and fold the
/// rest back into a left-nested chain.
///
/// The leading conjuncts are removed by position. A single remaining
/// conjunct is returned as is.
pub fn strip_static_conjuncts(body: &Value, dropped: usize) -> Result<Value, FixtureError> {
    let mut conjuncts = Vec::new();
    flatten_conjuncts(body, &mut conjuncts);
    let found = conjuncts.len();
    if found <= dropped {
        return Err(FixtureError::TooFewConjuncts { dropped, found });
    }
    let mut rest = conjuncts.into_iter().skip(dropped).cloned();
    let first = rest.next().ok_or(FixtureError::TooFewConjuncts { dropped, found })?;
    Ok(rest.fold(first, |left, right| {
        serde_json::json!({ "&&": { "left": left, "right": right } })
    }))
}

fn flatten_conjuncts<'a>(body: &'a Value, out: &mut Vec<&'a Value>) {
    let operands = body
        .as_object()
        .filter(|map| map.len() == 1)
        .and_then(|map| map.get(AND))
        .and_then(|and| Some((and.get("left")?, and.get("right")?)));
    match operands {
        Some((left, right)) => {
            flatten_conjuncts(left, out);
            flatten_conjuncts(right, out);
        }
        None => out.push(body),
    }
}
