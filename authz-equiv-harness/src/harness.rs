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

//! The differential harness itself.

use crate::config::HarnessConfig;
use crate::context_dump::{append_context_dump, extract_filter, recover_dumped_context};
use crate::err::{ConfigError, FixtureError, HarnessError, MismatchError};
use crate::policy_engine::{CliPolicyEngine, PolicyEngine, PolicyInputs};
use crate::response::strip_static_conjuncts;
use crate::scenario::{LegacyInputs, Scenario};
use crate::template::{EvaluationRequest, HttpTemplateEvaluator, TemplateEvaluator};
use authz_equiv_core::{
    first_mismatch, translate_filter_json, translate_residual_json, Expr, Mismatch, Principal,
};
use tracing::{debug, info, instrument, warn};

/// Runs scenarios through both pipelines and compares the results
#[derive(Debug)]
pub struct DifferentialHarness<P = CliPolicyEngine, T = HttpTemplateEvaluator> {
    config: HarnessConfig,
    policy_engine: P,
    template_evaluator: T,
}

impl DifferentialHarness {
    /// Harness using the policy-engine binary and template service named in
    /// `config`
    pub fn from_config(config: HarnessConfig) -> Result<Self, ConfigError> {
        let mut policy_engine = CliPolicyEngine::new(&config.policy_engine_binary);
        if let Some(dir) = &config.scratch_dir {
            policy_engine = policy_engine.with_scratch_dir(dir);
        }
        let template_evaluator = HttpTemplateEvaluator::new(&config.template_service_url)?;
        Ok(Self::new(config, policy_engine, template_evaluator))
    }
}

/// Both translations of a scenario, and the first difference between them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Translation of the legacy filter
    pub legacy: Expr,
    /// Translation of the policy residual
    pub policy: Expr,
    /// First difference, if any
    pub mismatch: Option<Mismatch>,
}

impl Outcome {
    /// Compare two translations
    pub fn new(legacy: Expr, policy: Expr) -> Self {
        let mismatch = first_mismatch(&legacy, &policy);
        Self {
            legacy,
            policy,
            mismatch,
        }
    }

    /// Did both pipelines produce the same filter?
    pub fn is_equivalent(&self) -> bool {
        self.mismatch.is_none()
    }

    /// `Ok` with the shared expression, or the mismatch as an error
    pub fn into_result(self) -> Result<Expr, MismatchError> {
        match self.mismatch {
            None => Ok(self.legacy),
            Some(mismatch) => Err(MismatchError::new(self.legacy, self.policy, mismatch)),
        }
    }
}

impl<P: PolicyEngine, T: TemplateEvaluator> DifferentialHarness<P, T> {
    /// Harness over the given collaborators
    pub fn new(config: HarnessConfig, policy_engine: P, template_evaluator: T) -> Self {
        Self {
            config,
            policy_engine,
            template_evaluator,
        }
    }

    /// The configuration in use
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Evaluate the legacy script and return the authorization filter it
    /// leaves in the runtime context
    pub fn legacy_filter(&self, legacy: &LegacyInputs) -> Result<serde_json::Value, FixtureError> {
        let script = append_context_dump(&legacy.script, &self.config.sentinel_key);
        let request = EvaluationRequest::new(script, &legacy.request_context)?;
        let result = self.template_evaluator.evaluate(&request)?.into_result()?;
        debug!(bytes = result.len(), "template evaluated");
        let context = recover_dumped_context(&result, &self.config.sentinel_key)?;
        extract_filter(&context, &self.config.filter_path).cloned()
    }

    /// Partially evaluate the policies and return the residual rule, with the
    /// static scope conjuncts removed
    pub fn policy_residual(&self, inputs: &PolicyInputs) -> Result<serde_json::Value, FixtureError> {
        let response = self.policy_engine.partially_evaluate(inputs)?;
        debug!(residuals = response.residuals.len(), "policy engine responded");
        let body = response.first_condition_body()?;
        strip_static_conjuncts(body, self.config.static_conjuncts)
    }

    /// The legacy side, translated
    pub fn legacy_expr(&self, legacy: &LegacyInputs) -> Result<Expr, HarnessError> {
        let filter = self.legacy_filter(legacy)?;
        Ok(translate_filter_json(&filter)?)
    }

    /// The policy side, translated with `principal` substituted
    pub fn policy_expr(&self, inputs: &PolicyInputs, principal: &Principal) -> Result<Expr, HarnessError> {
        let residual = self.policy_residual(inputs)?;
        Ok(translate_residual_json(residual, Some(principal))?)
    }

    /// Run both pipelines and compare. A mismatch is reported in the
    /// [`Outcome`], not as an error.
    #[instrument(skip_all, fields(scenario = scenario.label()))]
    pub fn run(&self, scenario: &Scenario) -> Result<Outcome, HarnessError> {
        info!("evaluating legacy script");
        let legacy = self.legacy_expr(&scenario.legacy)?;
        info!("partially evaluating policies");
        let policy = self.policy_expr(&scenario.policy, &scenario.principal)?;
        let outcome = Outcome::new(legacy, policy);
        match &outcome.mismatch {
            None => info!(filter = %outcome.legacy, "pipelines agree"),
            Some(mismatch) => warn!(%mismatch, "pipelines disagree"),
        }
        Ok(outcome)
    }

    /// Run both pipelines and fail on a mismatch
    pub fn check(&self, scenario: &Scenario) -> Result<Expr, HarnessError> {
        Ok(self.run(scenario)?.into_result()?)
    }
}

#[cfg(test)]
// PANIC SAFETY: unit tests
#[allow(clippy::unwrap_used)]
// PANIC SAFETY: unit tests
#[allow(clippy::panic)]
mod test {
    use super::*;
    use crate::config::DEFAULT_SENTINEL_KEY;
    use crate::policy_engine::{InputDocument, PolicyRequest};
    use crate::response::PartialResponse;
    use crate::template::{EvaluationError, EvaluationResponse};
    use authz_equiv_core::test_utils::{
        owner_filter, owner_ir, owner_principal, owner_residual, with_scope_conjuncts,
    };
    use authz_equiv_core::{FilterError, ResidualError};
    use cool_asserts::assert_matches;
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use tracing_test::traced_test;

    /// Emits some noise, then the context dump with `context` under the
    /// sentinel key
    #[derive(Debug, Default)]
    struct FakeTemplateService {
        context: Value,
        error: Option<EvaluationError>,
        requests: Mutex<Vec<EvaluationRequest>>,
    }

    impl FakeTemplateService {
        fn with_filter(filter: Value) -> Self {
            Self {
                context: json!({ "stash": { "authFilter": filter } }),
                ..Default::default()
            }
        }
    }

    impl TemplateEvaluator for FakeTemplateService {
        fn evaluate(&self, request: &EvaluationRequest) -> Result<EvaluationResponse, FixtureError> {
            self.requests.lock().unwrap().push(request.clone());
            if let Some(error) = &self.error {
                return Ok(EvaluationResponse {
                    error: Some(error.clone()),
                    evaluation_result: None,
                });
            }
            let dump = json!({ DEFAULT_SENTINEL_KEY: self.context.clone() });
            Ok(EvaluationResponse {
                error: None,
                evaluation_result: Some(format!("\n{{}}\n{dump}\n")),
            })
        }
    }

    struct FakePolicyEngine(Value);

    impl std::fmt::Debug for FakePolicyEngine {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_tuple("FakePolicyEngine").finish()
        }
    }

    impl FakePolicyEngine {
        fn with_body(body: Value) -> Self {
            Self(json!({
                "decision": null,
                "residuals": [{
                    "effect": "permit",
                    "principal": { "op": "All" },
                    "action": { "op": "All" },
                    "resource": { "op": "is", "entity_type": "App::Todo" },
                    "conditions": [{ "kind": "when", "body": body }],
                    "annotations": {}
                }]
            }))
        }
    }

    impl PolicyEngine for FakePolicyEngine {
        fn partially_evaluate(&self, _inputs: &PolicyInputs) -> Result<PartialResponse, FixtureError> {
            serde_json::from_value(self.0.clone())
                .map_err(|source| FixtureError::PolicyEngineOutput { source })
        }
    }

    fn scenario() -> Scenario {
        Scenario {
            description: Some("owner reads own todo".into()),
            legacy: LegacyInputs {
                script: "#set($ctx.stash.authFilter = $filter)\n".into(),
                request_context: json!({ "identity": { "sub": "1234-5678-90abcdef" } }),
            },
            policy: PolicyInputs {
                schema: InputDocument::Json(json!({})),
                policies: InputDocument::Text(
                    "permit(principal, action, resource is App::Todo) when { resource.owner == principal.sub };".into(),
                ),
                entities: InputDocument::Json(json!([])),
                request: PolicyRequest::for_field("App", "User", "1234-5678-90abcdef", "Query", "getTodo"),
            },
            principal: owner_principal(),
        }
    }

    fn harness(
        template: FakeTemplateService,
        engine: FakePolicyEngine,
    ) -> DifferentialHarness<FakePolicyEngine, FakeTemplateService> {
        DifferentialHarness::new(HarnessConfig::new("unused", "unused"), engine, template)
    }

    fn owner_harness() -> DifferentialHarness<FakePolicyEngine, FakeTemplateService> {
        harness(
            FakeTemplateService::with_filter(owner_filter(&owner_principal())),
            FakePolicyEngine::with_body(with_scope_conjuncts("App::Todo", owner_residual())),
        )
    }

    #[test]
    fn from_config_wires_engine_and_service() {
        let config = HarnessConfig::new("/opt/bin/policy-engine", "http://127.0.0.1:9/evaluate")
            .with_scratch_dir("/var/tmp/authz")
            .with_static_conjuncts(1);
        let harness = DifferentialHarness::from_config(config.clone()).unwrap();
        assert_eq!(harness.config(), &config);
        assert_eq!(
            harness.policy_engine.binary(),
            std::path::Path::new("/opt/bin/policy-engine")
        );
        assert_eq!(
            harness.policy_engine.scratch_dir(),
            Some(std::path::Path::new("/var/tmp/authz"))
        );
        assert_eq!(harness.template_evaluator.endpoint(), "http://127.0.0.1:9/evaluate");

        let harness =
            DifferentialHarness::from_config(HarnessConfig::new("policy-engine", "http://localhost/")).unwrap();
        assert_eq!(harness.policy_engine.scratch_dir(), None);
    }

    #[test]
    fn agreeing_pipelines() {
        let harness = owner_harness();
        let expr = harness.check(&scenario()).unwrap();
        assert_eq!(expr, owner_ir(&owner_principal()));
    }

    #[test]
    fn script_gets_context_dump() {
        let harness = owner_harness();
        harness.legacy_filter(&scenario().legacy).unwrap();
        let requests = harness.template_evaluator.requests.lock().unwrap();
        let [request] = requests.as_slice() else {
            panic!("expected one request, got {requests:?}");
        };
        assert_eq!(
            request.template,
            "#set($ctx.stash.authFilter = $filter)\n$util.toJson({\"__authzContextDump\": $ctx})"
        );
        assert_eq!(request.context, r#"{"identity":{"sub":"1234-5678-90abcdef"}}"#);
    }

    #[test]
    #[traced_test]
    fn disagreeing_pipelines() {
        let someone_else = authz_equiv_core::Principal::from_sub_and_username("0000", "other");
        let harness = harness(
            FakeTemplateService::with_filter(owner_filter(&someone_else)),
            FakePolicyEngine::with_body(with_scope_conjuncts("App::Todo", owner_residual())),
        );
        let outcome = harness.run(&scenario()).unwrap();
        assert!(!outcome.is_equivalent());
        assert!(logs_contain("pipelines disagree"));
        assert!(logs_contain("owner reads own todo"));

        let err = harness.check(&scenario()).unwrap_err();
        assert!(err.is_mismatch());
        assert_matches!(
            err,
            HarnessError::Mismatch(MismatchError { mismatch, policy, .. }) => {
                assert_eq!(mismatch.path_string(), "$[0].right");
                assert_eq!(policy, owner_ir(&owner_principal()));
            }
        );
    }

    #[test]
    fn static_conjunct_count_is_configurable() {
        let harness = DifferentialHarness::new(
            HarnessConfig::new("unused", "unused").with_static_conjuncts(0),
            FakePolicyEngine::with_body(owner_residual()),
            FakeTemplateService::with_filter(owner_filter(&owner_principal())),
        );
        harness.check(&scenario()).unwrap();
    }

    #[test]
    fn filter_path_is_configurable() {
        let template = FakeTemplateService {
            context: json!({ "prev": { "result": owner_filter(&owner_principal()) } }),
            ..Default::default()
        };
        let harness = DifferentialHarness::new(
            HarnessConfig::new("unused", "unused").with_filter_path(["prev", "result"]),
            FakePolicyEngine::with_body(with_scope_conjuncts("App::Todo", owner_residual())),
            template,
        );
        harness.check(&scenario()).unwrap();
    }

    #[test]
    fn missing_filter_is_a_fixture_error() {
        let harness = harness(
            FakeTemplateService {
                context: json!({ "stash": {} }),
                ..Default::default()
            },
            FakePolicyEngine::with_body(with_scope_conjuncts("App::Todo", owner_residual())),
        );
        assert_matches!(
            harness.run(&scenario()),
            Err(HarnessError::Fixture(FixtureError::MissingFilter { path })) => {
                assert_eq!(path, "stash.authFilter");
            }
        );
    }

    #[test]
    fn template_error_is_a_fixture_error() {
        let harness = harness(
            FakeTemplateService {
                error: Some(EvaluationError {
                    message: "Unknown variable $filter".into(),
                    error_type: Some("TemplateError".into()),
                }),
                ..Default::default()
            },
            FakePolicyEngine::with_body(owner_residual()),
        );
        assert_matches!(
            harness.run(&scenario()),
            Err(HarnessError::Fixture(FixtureError::TemplateEvaluation { .. }))
        );
    }

    #[test]
    fn missing_sentinel_is_a_fixture_error() {
        let harness = DifferentialHarness::new(
            HarnessConfig::new("unused", "unused").with_sentinel_key("__other"),
            FakePolicyEngine::with_body(owner_residual()),
            FakeTemplateService::with_filter(owner_filter(&owner_principal())),
        );
        assert_matches!(
            harness.run(&scenario()),
            Err(HarnessError::Fixture(FixtureError::MissingSentinel { key })) => {
                assert_eq!(key, "__other");
            }
        );
    }

    #[test]
    fn concrete_decision_is_a_fixture_error() {
        let harness = harness(
            FakeTemplateService::with_filter(owner_filter(&owner_principal())),
            FakePolicyEngine(json!({ "decision": "allow", "residuals": [] })),
        );
        assert_matches!(
            harness.run(&scenario()),
            Err(HarnessError::Fixture(FixtureError::NoResiduals))
        );
    }

    #[test]
    fn unparsable_engine_output_is_a_fixture_error() {
        let harness = harness(
            FakeTemplateService::with_filter(owner_filter(&owner_principal())),
            FakePolicyEngine(json!("not a response")),
        );
        assert_matches!(
            harness.run(&scenario()),
            Err(HarnessError::Fixture(FixtureError::PolicyEngineOutput { .. }))
        );
    }

    #[test]
    fn translation_errors_are_reported_per_side() {
        let harness = harness(
            FakeTemplateService::with_filter(json!({ "owner": { "ne": "x" } })),
            FakePolicyEngine::with_body(owner_residual()),
        );
        assert_matches!(
            harness.run(&scenario()),
            Err(HarnessError::LegacyTranslation(FilterError::UnsupportedOperator { .. }))
        );

        let harness = DifferentialHarness::new(
            HarnessConfig::new("unused", "unused").with_static_conjuncts(0),
            FakePolicyEngine::with_body(json!({ "like": { "left": { "Var": "resource" }, "pattern": [] } })),
            FakeTemplateService::with_filter(owner_filter(&owner_principal())),
        );
        assert_matches!(
            harness.run(&scenario()),
            Err(HarnessError::PolicyTranslation(ResidualError::UnsupportedOperator { .. }))
        );
    }
}
