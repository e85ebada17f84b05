use flume::SendError;
use flume::Sender;
use reqwest::Client;
use reqwest::Response;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use thiserror::Error;
use url::Url;

use crate::suite::Assertion;
use crate::suite::TestCase;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("channel error")]
    ChannelError(#[from] SendError<RunnerResult>),
}

#[derive(Debug)]
pub struct RunnerResult {
    pub name: String,
    pub method: String,
    pub url: Url,
    pub response: Option<CapturedResponse>,
    pub error: Option<String>,
    pub assertions: Vec<Assertion>,
}

/// Executes every test case in listed order, one request at a time. A failed
/// request is recorded on the result and never aborts the run.
pub async fn run_tests(
    tests: Vec<TestCase>,
    client: Client,
    tx: Sender<RunnerResult>,
) -> Result<(), RunnerError> {
    for test in tests {
        let method = test.method.to_string();
        let url = test.url.clone();

        let result = client
            .request(test.method, test.url)
            .headers(test.headers)
            .send()
            .await;

        let runner_result = match result {
            Ok(resp) => RunnerResult {
                name: test.name,
                method,
                url,
                response: Some(CapturedResponse::from_response(resp).await),
                error: None,
                assertions: test.assertions,
            },
            Err(err) => RunnerResult {
                name: test.name,
                method,
                url,
                response: None,
                error: Some(err.to_string()),
                assertions: test.assertions,
            },
        };

        tx.send_async(runner_result).await?;
    }

    Ok(())
}

#[derive(Debug)]
pub struct CapturedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body_text: String,
    pub body_json: Option<serde_json::Value>,
}

impl CapturedResponse {
    pub async fn from_response(resp: Response) -> Self {
        let status = resp.status();
        let headers = resp.headers().clone();

        // Consume the body exactly once
        let body_text = match resp.text().await {
            Ok(t) => t,
            Err(err) => format!("Failed to read body: {}", err),
        };

        // Attempt to parse JSON, but don't panic
        let body_json = serde_json::from_str::<serde_json::Value>(&body_text).ok();

        Self {
            status,
            headers,
            body_text,
            body_json,
        }
    }
}
