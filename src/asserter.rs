use core::fmt;
use std::fmt::Display;
use std::sync::Arc;

use flume::Receiver;
use flume::Sender;
use reqwest::StatusCode;
use thiserror::Error;

use crate::runner::CapturedResponse;
use crate::runner::RunnerResult;
use crate::suite::Assertion;

pub struct Asserter {}

#[derive(Error, Debug)]
pub enum AsserterError {
    #[error("output channel closed")]
    OutputChannelClosed,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum TestResult {
    Pass,
    Fail,
}

#[derive(Debug, Clone)]
pub struct AssertResult {
    pub status: TestResult,
    pub expected: Assertion,
    pub actual: Actual,
}

/// What the response actually contained, for the side of the assertion the
/// expectation was about.
#[derive(Debug, Clone)]
pub enum Actual {
    Status(StatusCode),
    Header {
        name: String,
        value: Option<String>,
    },
    Json {
        pointer: String,
        value: Option<serde_json::Value>,
    },
    RequestFailed(String),
}

impl Display for AssertResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.status, &self.expected, &self.actual) {
            (TestResult::Pass, _, actual) => {
                write!(
                    f,
                    "{} {} {}",
                    console::style("✔").green().bold(),
                    console::style("PASS!").green().bold(),
                    actual
                )
            }

            (TestResult::Fail, Assertion::Status(exp), Actual::Status(act)) => {
                write!(
                    f,
                    "{} {}\n  Expected: {}\n  Actual:   {}",
                    console::style("✘").red().bold(),
                    console::style("FAIL!").red().bold(),
                    console::style(format!("Expected status {}", exp)).green(),
                    console::style(format!("Got status {}", act)).red(),
                )
            }

            (
                TestResult::Fail,
                Assertion::Header { name, expect },
                Actual::Header { value, .. },
            ) => {
                writeln!(
                    f,
                    "{} {}",
                    console::style("✘").red().bold(),
                    console::style("FAIL!").red().bold(),
                )?;
                writeln!(
                    f,
                    "  {}",
                    console::style(format!("Expected header {name}: {expect}")).green()
                )?;
                match value {
                    Some(value) => {
                        writeln!(f, "  {}", console::style(format!("Got {name}: {value}")).red())
                    }
                    None => writeln!(
                        f,
                        "  {}",
                        console::style(format!("Header {name} missing from response")).red()
                    ),
                }
            }

            (
                TestResult::Fail,
                Assertion::JsonEquals { pointer, expect },
                Actual::Json { value, .. },
            ) => {
                writeln!(
                    f,
                    "{} {}",
                    console::style("✘").red().bold(),
                    console::style("FAIL!").red().bold(),
                )?;
                writeln!(
                    f,
                    "  {}",
                    console::style(format!("Expected field {pointer} = {expect}")).green()
                )?;
                match value {
                    Some(value) => writeln!(f, "  {}", console::style(format!("Got {value}")).red()),
                    None => writeln!(
                        f,
                        "  {}",
                        console::style(format!("Field {pointer} missing from response")).red()
                    ),
                }
            }

            (
                TestResult::Fail,
                Assertion::JsonContains { pointer, needle },
                Actual::Json { value, .. },
            ) => {
                writeln!(
                    f,
                    "{} {}",
                    console::style("✘").red().bold(),
                    console::style("FAIL!").red().bold(),
                )?;
                writeln!(
                    f,
                    "  {}",
                    console::style(format!("Expected field {pointer} to contain `{needle}`"))
                        .green()
                )?;
                match value {
                    Some(value) => writeln!(f, "  {}", console::style(format!("Got {value}")).red()),
                    None => writeln!(
                        f,
                        "  {}",
                        console::style(format!("Field {pointer} missing from response")).red()
                    ),
                }
            }

            (TestResult::Fail, Assertion::JsonHas(pointer), Actual::Json { .. }) => {
                writeln!(
                    f,
                    "{} {}",
                    console::style("✘").red().bold(),
                    console::style("FAIL!").red().bold(),
                )?;
                writeln!(
                    f,
                    "  {}",
                    console::style(format!("Expected field {pointer} to be present")).green()
                )?;
                writeln!(
                    f,
                    "  {}",
                    console::style(format!("Field {pointer} missing from response")).red()
                )
            }

            (TestResult::Fail, _, Actual::RequestFailed(err)) => {
                writeln!(
                    f,
                    "{} {}",
                    console::style("✘").red().bold(),
                    console::style("FAIL!").red().bold(),
                )?;
                writeln!(
                    f,
                    "  {} {}",
                    console::style("Request failed with error:").red(),
                    console::style(err).red().bold()
                )
            }

            _ => {
                writeln!(
                    f,
                    "{} {} (unhandled combination)",
                    console::style("⚠").yellow(),
                    console::style("UNKNOWN RESULT").yellow().bold()
                )
            }
        }
    }
}

impl Display for Assertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Assertion::Status(_) => write!(f, "Status test"),
            Assertion::Header { .. } => write!(f, "Header test"),
            Assertion::JsonEquals { .. }
            | Assertion::JsonContains { .. }
            | Assertion::JsonHas(_) => write!(f, "JSON field test"),
            Assertion::RequestFailed => write!(f, "Request failed"),
        }
    }
}

impl Display for Actual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actual::Status(status_code) => write!(f, "Got status {}", status_code),
            Actual::Header { name, value } => match value {
                Some(value) => write!(f, "Got header {name}: {value}"),
                None => write!(f, "Header {name} missing"),
            },
            Actual::Json { pointer, value } => match value {
                Some(value) => write!(f, "Got {pointer} = {value}"),
                None => write!(f, "Field {pointer} missing"),
            },
            Actual::RequestFailed(_) => write!(f, "Request failed"),
        }
    }
}

pub trait Assert {
    fn assert(&self) -> Arc<[AssertResult]>;
}

impl Assert for RunnerResult {
    fn assert(&self) -> Arc<[AssertResult]> {
        // A transport failure stands in for the whole expectation list
        if let Some(error) = &self.error {
            return Arc::from([AssertResult {
                status: TestResult::Fail,
                expected: Assertion::RequestFailed,
                actual: Actual::RequestFailed(error.clone()),
            }]);
        }

        let Some(response) = &self.response else {
            return Arc::from([AssertResult {
                status: TestResult::Fail,
                expected: Assertion::RequestFailed,
                actual: Actual::RequestFailed("no response captured".into()),
            }]);
        };

        Arc::from(
            self.assertions
                .iter()
                .map(|a| evaluate(a, response))
                .collect::<Vec<AssertResult>>(),
        )
    }
}

fn evaluate(assertion: &Assertion, response: &CapturedResponse) -> AssertResult {
    match assertion {
        Assertion::Status(expected) => AssertResult {
            status: assert_status(*expected, response.status),
            expected: assertion.clone(),
            actual: Actual::Status(response.status),
        },

        Assertion::Header { name, expect } => {
            let value = response
                .headers
                .get(name.as_str())
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);

            AssertResult {
                status: assert_header(expect, value.as_deref()),
                expected: assertion.clone(),
                actual: Actual::Header {
                    name: name.clone(),
                    value,
                },
            }
        }

        Assertion::JsonEquals { pointer, expect } => {
            let value = field(response, pointer);

            AssertResult {
                status: assert_json_equals(expect, value.as_ref()),
                expected: assertion.clone(),
                actual: Actual::Json {
                    pointer: pointer.clone(),
                    value,
                },
            }
        }

        Assertion::JsonContains { pointer, needle } => {
            let value = field(response, pointer);

            AssertResult {
                status: assert_json_contains(needle, value.as_ref()),
                expected: assertion.clone(),
                actual: Actual::Json {
                    pointer: pointer.clone(),
                    value,
                },
            }
        }

        Assertion::JsonHas(pointer) => {
            let value = field(response, pointer);
            let status = if value.is_some() {
                TestResult::Pass
            } else {
                TestResult::Fail
            };

            AssertResult {
                status,
                expected: assertion.clone(),
                actual: Actual::Json {
                    pointer: pointer.clone(),
                    value,
                },
            }
        }

        // Only produced by the asserter itself when no response exists
        Assertion::RequestFailed => AssertResult {
            status: TestResult::Fail,
            expected: assertion.clone(),
            actual: Actual::RequestFailed("no response captured".into()),
        },
    }
}

fn field(response: &CapturedResponse, pointer: &str) -> Option<serde_json::Value> {
    response
        .body_json
        .as_ref()
        .and_then(|body| body.pointer(pointer))
        .cloned()
}

impl Asserter {
    pub async fn run(
        rx: Receiver<RunnerResult>,
        output_tx: Sender<(String, String, String, Arc<[AssertResult]>)>,
    ) -> Result<(), AsserterError> {
        while let Ok(msg) = rx.recv_async().await {
            let assert_result = msg.assert();

            let path = msg.url.path().to_string();
            if output_tx
                .send_async((msg.name, msg.method, path, assert_result))
                .await
                .is_err()
            {
                return Err(AsserterError::OutputChannelClosed);
            }
        }

        Ok(())
    }
}

fn assert_status(expected: u16, status: StatusCode) -> TestResult {
    let expected_status = match StatusCode::from_u16(expected) {
        Ok(status) => status,
        Err(_) => return TestResult::Fail,
    };

    if expected_status != status {
        return TestResult::Fail;
    }

    TestResult::Pass
}

fn assert_header(expect: &str, actual: Option<&str>) -> TestResult {
    match actual {
        Some(value) if value == expect => TestResult::Pass,
        _ => TestResult::Fail,
    }
}

fn assert_json_equals(expect: &serde_json::Value, actual: Option<&serde_json::Value>) -> TestResult {
    match actual {
        Some(value) if value == expect => TestResult::Pass,
        _ => TestResult::Fail,
    }
}

fn assert_json_contains(needle: &str, actual: Option<&serde_json::Value>) -> TestResult {
    match actual.and_then(|v| v.as_str()) {
        Some(value) if value.contains(needle) => TestResult::Pass,
        _ => TestResult::Fail,
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use reqwest::StatusCode;
    use reqwest::header::CONTENT_LANGUAGE;
    use reqwest::header::HeaderMap;
    use serde_json::json;
    use url::Url;

    use crate::asserter::Assert;
    use crate::asserter::AssertResult;
    use crate::asserter::Asserter;
    use crate::asserter::TestResult;
    use crate::asserter::assert_header;
    use crate::asserter::assert_json_contains;
    use crate::asserter::assert_json_equals;
    use crate::asserter::assert_status;
    use crate::runner::CapturedResponse;
    use crate::runner::RunnerResult;
    use crate::suite::Assertion;

    fn captured(status: StatusCode, body: serde_json::Value) -> CapturedResponse {
        CapturedResponse {
            status,
            headers: HeaderMap::new(),
            body_text: body.to_string(),
            body_json: Some(body),
        }
    }

    fn result_for(response: CapturedResponse, assertions: Vec<Assertion>) -> RunnerResult {
        RunnerResult {
            name: "test".into(),
            method: "GET".into(),
            url: Url::parse("http://us.battle.net/api/wow/item/2318").unwrap(),
            response: Some(response),
            error: None,
            assertions,
        }
    }

    #[test]
    fn assert_status_test() {
        assert_eq!(assert_status(200, StatusCode::OK), TestResult::Pass);
        assert_eq!(assert_status(404, StatusCode::OK), TestResult::Fail);
        assert_eq!(assert_status(99, StatusCode::OK), TestResult::Fail);
    }

    #[test]
    fn assert_headers() {
        assert_eq!(assert_header("en-US", Some("en-US")), TestResult::Pass);
        assert_eq!(assert_header("en-US", Some("es-MX")), TestResult::Fail);
        assert_eq!(assert_header("en-US", None), TestResult::Fail);
    }

    #[test]
    fn assert_json() {
        let name = json!("Light Leather");

        assert_eq!(
            assert_json_equals(&json!("Light Leather"), Some(&name)),
            TestResult::Pass
        );
        assert_eq!(
            assert_json_equals(&json!("Thunderfury"), Some(&name)),
            TestResult::Fail
        );
        assert_eq!(
            assert_json_equals(&json!("Light Leather"), None),
            TestResult::Fail
        );

        assert_eq!(assert_json_contains("Scale", Some(&name)), TestResult::Pass);
        assert_eq!(
            assert_json_contains("Thunderfury", Some(&name)),
            TestResult::Fail
        );
        assert_eq!(
            assert_json_contains("Scale", Some(&json!(2318))),
            TestResult::Fail
        );
    }

    #[test]
    fn matching_item_payload_passes() {
        let response = captured(
            StatusCode::OK,
            json!({"id": 2318, "name": "Light Leather"}),
        );
        let result = result_for(
            response,
            vec![
                Assertion::Status(200),
                Assertion::JsonEquals {
                    pointer: "/id".into(),
                    expect: json!(2318),
                },
                Assertion::JsonEquals {
                    pointer: "/name".into(),
                    expect: json!("Light Leather"),
                },
            ],
        );

        for res in result.assert().iter() {
            assert_eq!(res.status, TestResult::Pass);
        }
    }

    #[test]
    fn missing_field_fails_only_that_assertion() {
        let response = captured(StatusCode::OK, json!({"id": 110050}));
        let result = result_for(
            response,
            vec![
                Assertion::Status(200),
                Assertion::JsonHas("/availableContexts".into()),
            ],
        );

        let results = result.assert();
        assert_eq!(results[0].status, TestResult::Pass);
        assert_eq!(results[1].status, TestResult::Fail);
    }

    #[test]
    fn missing_field_failure_names_the_field() {
        let response = captured(StatusCode::OK, json!({"id": 110050}));
        let result = result_for(
            response,
            vec![Assertion::JsonHas("/availableContexts".into())],
        );

        let rendered = result.assert()[0].to_string();
        assert!(rendered.contains("Expected field /availableContexts to be present"));
        assert!(rendered.contains("Field /availableContexts missing from response"));
    }

    #[test]
    fn header_assertion_reads_the_response_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LANGUAGE, "en-US".parse().unwrap());

        let response = CapturedResponse {
            status: StatusCode::OK,
            headers,
            body_text: "{}".into(),
            body_json: Some(json!({})),
        };
        let result = result_for(
            response,
            vec![Assertion::Header {
                name: "content-language".into(),
                expect: "en-US".into(),
            }],
        );

        assert_eq!(result.assert()[0].status, TestResult::Pass);
    }

    #[test]
    fn transport_error_becomes_a_failed_assertion() {
        let result = RunnerResult {
            name: "test".into(),
            method: "GET".into(),
            url: Url::parse("http://us.battle.net/api/wow/item/2318").unwrap(),
            response: None,
            error: Some("connection refused".into()),
            assertions: vec![Assertion::Status(200)],
        };

        let results = result.assert();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, TestResult::Fail);
    }

    #[tokio::test]
    async fn test_full() {
        let (runner_tx, asserter_rx) = flume::unbounded::<RunnerResult>();
        let (asserter_tx, outputter_rx) =
            flume::unbounded::<(String, String, String, Arc<[AssertResult]>)>();

        tokio::spawn(async move {
            Asserter::run(asserter_rx, asserter_tx).await.unwrap();
        });

        // First case fails on a missing field, second one passes. The
        // asserter must keep going past the failure.
        runner_tx
            .send_async(result_for(
                captured(StatusCode::OK, json!({"id": 110050})),
                vec![Assertion::JsonHas("/availableContexts".into())],
            ))
            .await
            .unwrap();

        runner_tx
            .send_async(result_for(
                captured(StatusCode::OK, json!({"id": 2318, "name": "Light Leather"})),
                vec![
                    Assertion::Status(200),
                    Assertion::JsonContains {
                        pointer: "/name".into(),
                        needle: "Leather".into(),
                    },
                ],
            ))
            .await
            .unwrap();
        drop(runner_tx);

        let (name, method, path, first) = outputter_rx.recv_async().await.unwrap();
        assert_eq!(name, "test");
        assert_eq!(method, "GET");
        assert_eq!(path, "/api/wow/item/2318");
        assert_eq!(first[0].status, TestResult::Fail);

        let (_, _, _, second) = outputter_rx.recv_async().await.unwrap();
        for res in second.iter() {
            assert_eq!(res.status, TestResult::Pass);
        }
    }
}
