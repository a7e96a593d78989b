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

//! Harness configuration.
//!
//! Everything the harness needs to know about its environment is carried in
//! a [`HarnessConfig`] passed to the harness constructor; nothing is read from
//! environment variables.

use crate::err::ConfigError;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::path::{Path, PathBuf};

/// Default key the dumped runtime context is stored under
pub const DEFAULT_SENTINEL_KEY: &str = "__authzContextDump";

/// Default number of leading conjuncts in a residual body that come from the
/// policy scope rather than from the rule under test: `true` for the principal
/// scope, `true` for the action scope, and the resource's entity type check
pub const DEFAULT_STATIC_CONJUNCTS: usize = 3;

/// Configuration of a [`crate::DifferentialHarness`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HarnessConfig {
    /// Path of the policy-engine binary
    pub policy_engine_binary: PathBuf,
    /// URL the template-evaluation requests are POSTed to
    pub template_service_url: String,
    /// Key the dumped runtime context is stored under
    #[serde(default = "default_sentinel_key")]
    pub sentinel_key: SmolStr,
    /// Path of the authorization filter inside the dumped runtime context
    #[serde(default = "default_filter_path")]
    pub filter_path: Vec<SmolStr>,
    /// Number of leading conjuncts to drop from the residual body
    #[serde(default = "default_static_conjuncts")]
    pub static_conjuncts: usize,
    /// Directory for the policy engine's input files. A fresh temporary
    /// directory is created inside it for every run. Defaults to the system
    /// temporary directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,
}

fn default_sentinel_key() -> SmolStr {
    DEFAULT_SENTINEL_KEY.into()
}

fn default_filter_path() -> Vec<SmolStr> {
    vec!["stash".into(), "authFilter".into()]
}

fn default_static_conjuncts() -> usize {
    DEFAULT_STATIC_CONJUNCTS
}

impl HarnessConfig {
    /// Configuration with defaults for everything but the two collaborators
    pub fn new(policy_engine_binary: impl Into<PathBuf>, template_service_url: impl Into<String>) -> Self {
        Self {
            policy_engine_binary: policy_engine_binary.into(),
            template_service_url: template_service_url.into(),
            sentinel_key: default_sentinel_key(),
            filter_path: default_filter_path(),
            static_conjuncts: default_static_conjuncts(),
            scratch_dir: None,
        }
    }

    /// Load a configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        read_json(path.as_ref())
    }

    /// Set the sentinel key
    pub fn with_sentinel_key(mut self, key: impl Into<SmolStr>) -> Self {
        self.sentinel_key = key.into();
        self
    }

    /// Set the path of the authorization filter in the runtime context
    pub fn with_filter_path<S: Into<SmolStr>>(mut self, path: impl IntoIterator<Item = S>) -> Self {
        self.filter_path = path.into_iter().map(Into::into).collect();
        self
    }

    /// Set the number of leading conjuncts to drop from the residual body
    pub fn with_static_conjuncts(mut self, count: usize) -> Self {
        self.static_conjuncts = count;
        self
    }

    /// Set the scratch directory for policy-engine inputs
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }
}

/// Read and deserialize a JSON file
pub(crate) fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_owned(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_owned(),
        source,
    })
}
