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

//! Exercises [`HttpTemplateEvaluator`] against a one-shot local HTTP server.

// PANIC SAFETY tests
#![allow(clippy::unwrap_used)]

use authz_equiv_harness::{
    EvaluationRequest, FixtureError, HttpTemplateEvaluator, TemplateEvaluator,
};
use cool_asserts::assert_matches;
use serde_json::json;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::thread::JoinHandle;

/// Serve one request with `status` and `body`, returning the request body
fn serve_once(status: &'static str, body: String) -> (String, JoinHandle<String>) {
    let declared_length = body.len();
    serve_truncated(status, body, declared_length)
}

/// Like [`serve_once`], but announce `declared_length` bytes of body and
/// close the connection after writing `body`
fn serve_truncated(
    status: &'static str,
    body: String,
    declared_length: usize,
) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let endpoint = format!("http://{}/evaluate", listener.local_addr().unwrap());
    let handle = std::thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut content_length = 0;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap();
                }
            }
        }
        let mut request = vec![0; content_length];
        reader.read_exact(&mut request).unwrap();
        let mut stream = stream;
        write!(
            stream,
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {declared_length}\r\nConnection: close\r\n\r\n{body}"
        )
        .unwrap();
        stream.flush().unwrap();
        String::from_utf8(request).unwrap()
    });
    (endpoint, handle)
}

#[test]
fn posts_request_and_parses_response() {
    let (endpoint, server) = serve_once(
        "200 OK",
        json!({ "evaluationResult": "{\"__authzContextDump\":{}}" }).to_string(),
    );
    let evaluator = HttpTemplateEvaluator::new(endpoint).unwrap();
    let request = EvaluationRequest::new("$util.toJson($ctx)", &json!({ "arguments": {} })).unwrap();
    let response = evaluator.evaluate(&request).unwrap();
    assert_eq!(
        response.into_result().unwrap(),
        "{\"__authzContextDump\":{}}"
    );
    let sent: serde_json::Value = serde_json::from_str(&server.join().unwrap()).unwrap();
    assert_eq!(
        sent,
        json!({ "template": "$util.toJson($ctx)", "context": "{\"arguments\":{}}" })
    );
}

#[test]
fn non_success_status() {
    let (endpoint, server) = serve_once("500 Internal Server Error", "\"overloaded\"".into());
    let evaluator = HttpTemplateEvaluator::new(endpoint).unwrap();
    let request = EvaluationRequest::new("", &json!({})).unwrap();
    assert_matches!(
        evaluator.evaluate(&request),
        Err(FixtureError::TemplateServiceStatus { status: 500, body, body_error: None }) => {
            assert_eq!(body, "\"overloaded\"");
        }
    );
    server.join().unwrap();
}

#[test]
fn unreadable_error_body() {
    let (endpoint, server) = serve_truncated("503 Service Unavailable", "\"over".into(), 64);
    let evaluator = HttpTemplateEvaluator::new(endpoint).unwrap();
    let request = EvaluationRequest::new("", &json!({})).unwrap();
    assert_matches!(
        evaluator.evaluate(&request),
        Err(FixtureError::TemplateServiceStatus { status: 503, body, body_error: Some(_) }) => {
            assert_eq!(body, "");
        }
    );
    server.join().unwrap();
}

#[test]
fn unreachable_service() {
    // Bind and drop to find a port nothing is listening on.
    let port = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let evaluator = HttpTemplateEvaluator::new(format!("http://127.0.0.1:{port}/evaluate")).unwrap();
    let request = EvaluationRequest::new("", &json!({})).unwrap();
    assert_matches!(
        evaluator.evaluate(&request),
        Err(FixtureError::TemplateServiceRequest { endpoint, .. }) => {
            assert!(endpoint.ends_with("/evaluate"));
        }
    );
}
