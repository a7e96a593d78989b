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

//! Differential-testing harness for owner-based authorization.
//!
//! A [`Scenario`] describes one operation twice: as the access-control script
//! the legacy pipeline runs, and as the policies, schema and entities a
//! policy engine evaluates. [`DifferentialHarness`] runs both through their
//! external collaborators, translates each side's filter into the canonical
//! IR, and reports whether they are the same.
//!
//! The collaborators sit behind the [`TemplateEvaluator`] and
//! [`PolicyEngine`] traits. The provided implementations make one blocking
//! call each and apply no retries or timeouts of their own.
#![forbid(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

pub mod config;
pub mod context_dump;
mod err;
pub use err::*;
pub mod harness;
pub mod policy_engine;
pub mod response;
pub mod scenario;
pub mod template;

pub use config::HarnessConfig;
pub use harness::{DifferentialHarness, Outcome};
pub use policy_engine::{CliPolicyEngine, InputDocument, PolicyEngine, PolicyInputs, PolicyRequest};
pub use response::PartialResponse;
pub use scenario::{LegacyInputs, Scenario};
pub use template::{EvaluationRequest, EvaluationResponse, HttpTemplateEvaluator, TemplateEvaluator};
