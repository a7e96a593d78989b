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

//! Client side of the template-evaluation service.

use crate::err::{ConfigError, FixtureError};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A request to evaluate an access-control script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRequest {
    /// Script to evaluate
    pub template: String,
    /// Runtime context to evaluate it against, as serialized JSON
    pub context: String,
}

impl EvaluationRequest {
    /// Build a request, serializing `context`
    pub fn new(template: impl Into<String>, context: &serde_json::Value) -> Result<Self, FixtureError> {
        let context = serde_json::to_string(context).map_err(|source| FixtureError::Serialize {
            what: "the template request context",
            source,
        })?;
        Ok(Self {
            template: template.into(),
            context,
        })
    }
}

/// The service's answer. Exactly one of the fields is normally set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResponse {
    /// Evaluation error, if the script failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<EvaluationError>,
    /// Everything the script emitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_result: Option<String>,
}

/// Error reported by the service for a script that failed to evaluate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationError {
    /// Human-readable message
    pub message: String,
    /// Error category
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

impl EvaluationResponse {
    /// The evaluation result, or the failure that prevented one
    pub fn into_result(self) -> Result<String, FixtureError> {
        if let Some(EvaluationError {
            message,
            error_type,
        }) = self.error
        {
            return Err(FixtureError::TemplateEvaluation {
                message,
                error_type,
            });
        }
        match self.evaluation_result {
            Some(result) if !result.trim().is_empty() => Ok(result),
            _ => Err(FixtureError::EmptyEvaluationResult),
        }
    }
}

/// Something that can evaluate access-control scripts
pub trait TemplateEvaluator {
    /// Evaluate `request.template` against `request.context`
    fn evaluate(&self, request: &EvaluationRequest) -> Result<EvaluationResponse, FixtureError>;
}

/// [`TemplateEvaluator`] that POSTs requests as JSON to an HTTP endpoint
#[derive(Debug, Clone)]
pub struct HttpTemplateEvaluator {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl HttpTemplateEvaluator {
    /// Evaluator using a default HTTP client, which applies no timeouts
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ConfigError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(None::<std::time::Duration>)
            .build()
            .map_err(ConfigError::HttpClient)?;
        Ok(Self::with_client(endpoint, client))
    }

    /// Evaluator using a caller-configured HTTP client
    pub fn with_client(endpoint: impl Into<String>, client: reqwest::blocking::Client) -> Self {
        Self {
            endpoint: endpoint.into(),
            client,
        }
    }

    /// The endpoint requests are sent to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl TemplateEvaluator for HttpTemplateEvaluator {
    fn evaluate(&self, request: &EvaluationRequest) -> Result<EvaluationResponse, FixtureError> {
        let transport = |source| FixtureError::TemplateServiceRequest {
            endpoint: self.endpoint.clone(),
            source,
        };
        debug!(endpoint = %self.endpoint, "posting template evaluation request");
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            let (body, body_error) = match response.text() {
                Ok(body) => (body, None),
                Err(e) => (String::new(), Some(e)),
            };
            return Err(FixtureError::TemplateServiceStatus {
                status: status.as_u16(),
                body,
                body_error,
            });
        }
        response.json().map_err(transport)
    }
}
