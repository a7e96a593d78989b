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

use super::FilterError;
use serde::Deserialize;
use smol_str::SmolStr;
use std::fmt::{self, Display};
use std::str::FromStr;

/// A decoded legacy row filter.
///
/// Every object in the legacy JSON has exactly one key. `and`, `or` and `not`
/// are reserved; any other key names a field of the record being fetched.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "serde_json::Value")]
pub enum Filter {
    /// `{ "or": [ ... ] }`
    Or(Vec<Filter>),
    /// `{ "and": [ ... ] }`
    And(Vec<Filter>),
    /// `{ "not": ... }`
    Not(Box<Filter>),
    /// `{ "<field>": { "<op>": <value> } }`
    Field {
        /// name of the field on the record
        field: SmolStr,
        /// comparison operator
        op: FilterOperator,
        /// value the field is compared against, verbatim
        value: serde_json::Value,
    },
}

/// Field comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    /// `eq`
    Eq,
}

impl FilterOperator {
    /// Name of the operator as it appears in filters
    pub fn as_str(self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
        }
    }
}

impl Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOperator {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eq" => Ok(FilterOperator::Eq),
            _ => Err(()),
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// The single entry of a filter object
fn single_entry<'a>(
    object: &'a serde_json::Map<String, serde_json::Value>,
) -> Result<(&'a String, &'a serde_json::Value), FilterError> {
    let mut entries = object.iter();
    match (entries.next(), entries.next()) {
        (Some(entry), None) => Ok(entry),
        (None, _) => Err(FilterError::Empty),
        (Some(_), Some(_)) => Err(FilterError::MultipleKeys {
            keys: object.keys().map(SmolStr::new).collect(),
        }),
    }
}

impl Filter {
    /// Decode a filter from JSON
    pub fn from_json(json: &serde_json::Value) -> Result<Self, FilterError> {
        let object = json.as_object().ok_or(FilterError::NotAnObject {
            found: json_kind(json),
        })?;
        let (key, body) = single_entry(object)?;
        match key.as_str() {
            "or" => Ok(Filter::Or(Self::list("or", body)?)),
            "and" => Ok(Filter::And(Self::list("and", body)?)),
            "not" => Ok(Filter::Not(Box::new(Self::from_json(body)?))),
            field => Self::field(field, body),
        }
    }

    fn list(combinator: &str, body: &serde_json::Value) -> Result<Vec<Filter>, FilterError> {
        body.as_array()
            .ok_or_else(|| FilterError::CombinatorNotArray {
                combinator: combinator.into(),
            })?
            .iter()
            .map(Self::from_json)
            .collect()
    }

    fn field(field: &str, body: &serde_json::Value) -> Result<Filter, FilterError> {
        let predicate = body.as_object().ok_or(FilterError::NotAnObject {
            found: json_kind(body),
        })?;
        let mut ops = predicate.iter();
        let (op, value) = match (ops.next(), ops.next()) {
            (Some(entry), None) => entry,
            (None, _) => {
                return Err(FilterError::MissingFieldOperator {
                    field: field.into(),
                })
            }
            (Some(_), Some(_)) => {
                return Err(FilterError::MultipleFieldOperators {
                    field: field.into(),
                    ops: predicate.keys().map(SmolStr::new).collect(),
                })
            }
        };
        let op = op
            .parse::<FilterOperator>()
            .map_err(|()| FilterError::UnsupportedOperator {
                field: field.into(),
                op: op.into(),
            })?;
        Ok(Filter::Field {
            field: field.into(),
            op,
            value: value.clone(),
        })
    }
}

impl TryFrom<serde_json::Value> for Filter {
    type Error = FilterError;

    fn try_from(json: serde_json::Value) -> Result<Self, Self::Error> {
        Self::from_json(&json)
    }
}
