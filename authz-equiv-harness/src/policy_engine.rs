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

//! Running the policy engine's partial evaluation on a scenario.

use crate::err::FixtureError;
use crate::response::PartialResponse;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// An input file for the policy engine, given either as text to be written
/// verbatim or as a JSON document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputDocument {
    /// Written as is (e.g. policies in the engine's own syntax)
    Text(String),
    /// Written as pretty-printed JSON
    Json(serde_json::Value),
}

impl InputDocument {
    fn render(&self, what: &'static str) -> Result<String, FixtureError> {
        match self {
            InputDocument::Text(text) => Ok(text.clone()),
            InputDocument::Json(value) => serde_json::to_string_pretty(value)
                .map_err(|source| FixtureError::Serialize { what, source }),
        }
    }
}

impl From<serde_json::Value> for InputDocument {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(text) => InputDocument::Text(text),
            other => InputDocument::Json(other),
        }
    }
}

impl From<&str> for InputDocument {
    fn from(text: &str) -> Self {
        InputDocument::Text(text.to_string())
    }
}

/// The request half of a partial evaluation: principal and action are
/// concrete, the resource is left unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyRequest {
    /// Principal entity reference, e.g. `App::User::"alice"`
    pub principal: String,
    /// Action entity reference, e.g. `App::Action::"Query.getTodo"`
    pub action: String,
}

impl PolicyRequest {
    /// Request from already-formatted entity references
    pub fn new(principal: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            action: action.into(),
        }
    }

    /// Request for reading `type_name.field_name` in `namespace` as the
    /// principal `principal_type::"principal_id"`
    pub fn for_field(
        namespace: &str,
        principal_type: &str,
        principal_id: &str,
        type_name: &str,
        field_name: &str,
    ) -> Self {
        Self {
            principal: entity_ref(namespace, principal_type, principal_id),
            action: entity_ref(namespace, "Action", &format!("{type_name}.{field_name}")),
        }
    }
}

fn entity_ref(namespace: &str, entity_type: &str, id: &str) -> String {
    let escaped = id.replace('\\', "\\\\").replace('"', "\\\"");
    if namespace.is_empty() {
        format!("{entity_type}::\"{escaped}\"")
    } else {
        format!("{namespace}::{entity_type}::\"{escaped}\"")
    }
}

/// Everything the policy engine needs for one partial evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyInputs {
    /// Schema
    pub schema: InputDocument,
    /// Policy set
    pub policies: InputDocument,
    /// Entity graph
    pub entities: InputDocument,
    /// Request with the resource left unknown
    pub request: PolicyRequest,
}

/// Something that can partially evaluate a policy set
pub trait PolicyEngine {
    /// Partially evaluate `inputs` with the resource unknown
    fn partially_evaluate(&self, inputs: &PolicyInputs) -> Result<PartialResponse, FixtureError>;
}

/// [`PolicyEngine`] that runs an external binary as
/// `<binary> -s <schema> -p <policies> -e <entities> -r <request>`
/// and reads the partial response from its standard output
#[derive(Debug, Clone)]
pub struct CliPolicyEngine {
    binary: PathBuf,
    scratch_dir: Option<PathBuf>,
}

impl CliPolicyEngine {
    /// Engine running `binary`, with scratch files under the system
    /// temporary directory
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            scratch_dir: None,
        }
    }

    /// Create the per-run scratch directories inside `dir` instead
    #[must_use]
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// The binary being run
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Directory the per-run scratch directories are created in, if not
    /// the system default
    pub fn scratch_dir(&self) -> Option<&Path> {
        self.scratch_dir.as_deref()
    }

    fn scratch(&self) -> Result<tempfile::TempDir, FixtureError> {
        let builder = {
            let mut b = tempfile::Builder::new();
            b.prefix("authz-equiv-");
            b
        };
        match &self.scratch_dir {
            Some(dir) => builder.tempdir_in(dir).map_err(|source| FixtureError::ScratchIo {
                path: dir.clone(),
                source,
            }),
            None => builder.tempdir().map_err(|source| FixtureError::ScratchIo {
                path: std::env::temp_dir(),
                source,
            }),
        }
    }
}

fn write_input(dir: &Path, name: &str, contents: &str) -> Result<PathBuf, FixtureError> {
    let path = dir.join(name);
    std::fs::write(&path, contents).map_err(|source| FixtureError::ScratchIo {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

impl PolicyEngine for CliPolicyEngine {
    fn partially_evaluate(&self, inputs: &PolicyInputs) -> Result<PartialResponse, FixtureError> {
        // removed when dropped at the end of this call
        let scratch = self.scratch()?;
        let dir = scratch.path();
        let schema = write_input(dir, "schema", &inputs.schema.render("the schema")?)?;
        let policies = write_input(dir, "policies", &inputs.policies.render("the policies")?)?;
        let entities = write_input(dir, "entities.json", &inputs.entities.render("the entities")?)?;
        let request = serde_json::to_string_pretty(&inputs.request).map_err(|source| {
            FixtureError::Serialize {
                what: "the policy request",
                source,
            }
        })?;
        let request = write_input(dir, "request.json", &request)?;

        debug!(binary = %self.binary.display(), scratch = %dir.display(), "running policy engine");
        let output = Command::new(&self.binary)
            .arg("-s")
            .arg(&schema)
            .arg("-p")
            .arg(&policies)
            .arg("-e")
            .arg(&entities)
            .arg("-r")
            .arg(&request)
            .output()
            .map_err(|source| FixtureError::PolicyEngineSpawn {
                binary: self.binary.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(FixtureError::PolicyEngineExit {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
            });
        }
        serde_json::from_slice(&output.stdout)
            .map_err(|source| FixtureError::PolicyEngineOutput { source })
    }
}
