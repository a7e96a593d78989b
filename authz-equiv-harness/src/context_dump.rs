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

//! The context-dump convention used to read the runtime context back out of
//! the template-evaluation service.
//!
//! The merged access-control script gets one extra line at the end that
//! renders `{"<sentinel>": <full runtime context>}` as JSON. The service
//! returns everything the script emitted; the dump is the last line of it.

use crate::err::FixtureError;
use smol_str::SmolStr;

/// Append the context-dump line for `sentinel_key` to `script`
pub fn append_context_dump(script: &str, sentinel_key: &str) -> String {
    let body = script.trim_end_matches(['\n', '\r']);
    let dump = format!("$util.toJson({{\"{sentinel_key}\": $ctx}})");
    if body.is_empty() {
        dump
    } else {
        format!("{body}\n{dump}")
    }
}

/// Recover the dumped runtime context from an evaluation result.
///
/// Only the last line is considered; whatever the script emitted before it is
/// ignored. Trailing whitespace is trimmed first.
pub fn recover_dumped_context(
    evaluation_result: &str,
    sentinel_key: &str,
) -> Result<serde_json::Value, FixtureError> {
    let trimmed = evaluation_result.trim_end();
    if trimmed.is_empty() {
        return Err(FixtureError::EmptyEvaluationResult);
    }
    let last_line = trimmed
        .rsplit_once('\n')
        .map_or(trimmed, |(_, last)| last)
        .trim();
    let mut dump: serde_json::Value =
        serde_json::from_str(last_line).map_err(|source| FixtureError::NonJsonFinalLine {
            line: last_line.to_owned(),
            source,
        })?;
    dump.as_object_mut()
        .and_then(|object| object.remove(sentinel_key))
        .ok_or_else(|| FixtureError::MissingSentinel {
            key: sentinel_key.into(),
        })
}

/// Look up the authorization filter in a runtime context.
///
/// A `null` at the end of the path counts as missing.
pub fn extract_filter<'a>(
    context: &'a serde_json::Value,
    path: &[SmolStr],
) -> Result<&'a serde_json::Value, FixtureError> {
    let missing = || FixtureError::MissingFilter {
        path: path.join("."),
    };
    let filter = path
        .iter()
        .try_fold(context, |node, segment| node.get(segment.as_str()))
        .ok_or_else(missing)?;
    if filter.is_null() {
        Err(missing())
    } else {
        Ok(filter)
    }
}
