//! # Response Assertions
//!
//! Fluent checks over a [`PendingResponse`].
//!
//! Each check awaits the response once, evaluates its condition and hands a
//! failure to the configured [`Reporter`]. Checks consume the assertions, so
//! the response is released on every exit path, including errors.
//!
//! ```text
//! Unresolved ──resolve──▶ Resolved ──read body──▶ BodyRead
//!      │                     │                       │
//!      └─────────────────────┴───────────────────────┴──▶ Reported
//! ```

mod inspector;
mod reporter;

pub use inspector::Inspector;
pub use reporter::{
    AssertionFailure, Because, CollectingReporter, FailureKind, Outcome, PanicReporter, Reporter,
};

use crate::error::{Error, Result};
use crate::json;
use crate::dispatch::ExchangeScope;
use crate::response::{read_text, PendingResponse};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Identifier used for the response in composite failure messages
const IDENTIFIER: &str = "http-response";

enum ResponseState {
    Unresolved(PendingResponse),
    Resolved(reqwest::Response, ExchangeScope),
}

pub struct ResponseAssertions {
    state: Option<ResponseState>,
    reporter: Arc<dyn Reporter>,
    because: Because,
}

impl std::fmt::Debug for ResponseAssertions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            Some(ResponseState::Unresolved(_)) => "Unresolved",
            Some(ResponseState::Resolved(..)) => "Resolved",
            None => "Released",
        };
        f.debug_struct("ResponseAssertions")
            .field("state", &state)
            .field("because", &self.because)
            .finish()
    }
}

impl ResponseAssertions {
    /// Assertions that fail the current test by panicking
    pub fn new(pending: PendingResponse) -> Self {
        Self {
            state: Some(ResponseState::Unresolved(pending)),
            reporter: Arc::new(PanicReporter),
            because: Because::default(),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Reason quoted in the failure message of the next check
    pub fn because(mut self, because: impl Into<Because>) -> Self {
        self.because = because.into();
        self
    }

    /// Reason with positional `{0}` arguments, rendered only on failure
    pub fn because_with<I, A>(mut self, template: &str, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: std::fmt::Display,
    {
        self.because = Because::with_args(template, args);
        self
    }

    /// Await the response if that has not happened yet; later calls reuse it
    pub async fn resolve(&mut self) -> Result<&reqwest::Response> {
        if let Some(ResponseState::Unresolved(_)) = self.state {
            if let Some(ResponseState::Unresolved(pending)) = self.state.take() {
                let (response, scope) = pending.exchange().await?;
                tracing::debug!("Resolved response with status {}", response.status());
                self.state = Some(ResponseState::Resolved(response, scope));
            }
        }
        match &self.state {
            Some(ResponseState::Resolved(response, _)) => Ok(response),
            _ => Err(Error::ResponseConsumed),
        }
    }

    pub async fn status(&mut self) -> Result<StatusCode> {
        Ok(self.resolve().await?.status())
    }

    /// Passes for any 2xx status
    pub async fn succeed(self) -> Result<Outcome> {
        self.status_check(
            |status| status.is_success(),
            |actual| format!("Expected HTTP response to be successful{{because}}, but found {actual}."),
        )
        .await
    }

    /// Passes only for `expected`
    pub async fn succeed_with(self, expected: StatusCode) -> Result<Outcome> {
        self.have_status_code(expected).await
    }

    /// Passes for any status outside 2xx
    pub async fn fail(self) -> Result<Outcome> {
        self.status_check(
            |status| !status.is_success(),
            |actual| format!("Expected HTTP response to fail{{because}}, but found {actual}."),
        )
        .await
    }

    pub async fn have_status_code(self, expected: StatusCode) -> Result<Outcome> {
        let expected_text = describe(expected);
        self.status_check(
            move |status| status == expected,
            move |actual| {
                format!(
                    "Expected HTTP response to have status code {expected_text}{{because}}, but found {actual}."
                )
            },
        )
        .await
    }

    /// Passes when `predicate` accepts the status; `expectation` completes
    /// the sentence "Expected HTTP response to ..."
    pub async fn have_status_matching<P>(self, expectation: &str, predicate: P) -> Result<Outcome>
    where
        P: FnOnce(StatusCode) -> bool,
    {
        let expectation = expectation.to_string();
        self.status_check(predicate, move |actual| {
            format!("Expected HTTP response to {expectation}{{because}}, but found {actual}.")
        })
        .await
    }

    /// Deserialize the body into `T` and run `verification` against it.
    ///
    /// Every check the block records is collected; if any failed they are
    /// reported together as one composite failure. An empty body fails
    /// without attempting deserialization. Malformed JSON is an `Err`, not an
    /// assertion failure.
    pub async fn satisfy<T, F>(mut self, verification: F) -> Result<Outcome>
    where
        T: DeserializeOwned,
        F: FnOnce(&T, &mut Inspector),
    {
        let type_name = std::any::type_name::<T>();
        let (response, scope) = self.take_response().await?;
        let text = read_text(response, &scope).await?;

        if text.trim().is_empty() {
            let failure = AssertionFailure::new(
                FailureKind::EmptyOrMissingBody,
                format!(
                    "Expected HTTP response body to be deserializable to {type_name}{}, but it was empty.",
                    self.because.render()
                ),
            );
            return Ok(self.conclude(Some(failure)));
        }

        let body: T =
            json::from_str(&text).map_err(|source| Error::Deserialize { type_name, source })?;
        let failures = Inspector::collect(|inspector| verification(&body, inspector));

        if failures.is_empty() {
            return Ok(self.conclude(None));
        }

        let header = format!(
            "Expected {IDENTIFIER} to match inspector{}, but the inspector was not satisfied:",
            self.because.render()
        );
        Ok(self.conclude(Some(AssertionFailure::composite(header, failures))))
    }

    /// Resolve and take ownership of the response, leaving nothing behind
    async fn take_response(&mut self) -> Result<(reqwest::Response, ExchangeScope)> {
        self.resolve().await?;
        match self.state.take() {
            Some(ResponseState::Resolved(response, scope)) => Ok((response, scope)),
            _ => Err(Error::ResponseConsumed),
        }
    }

    async fn status_check<P, M>(mut self, predicate: P, message: M) -> Result<Outcome>
    where
        P: FnOnce(StatusCode) -> bool,
        M: FnOnce(String) -> String,
    {
        let status = self.status().await?;
        // Release the connection before reporting, so a panicking reporter
        // does not unwind while holding it.
        self.state = None;

        if predicate(status) {
            return Ok(self.conclude(None));
        }
        let rendered = message(describe(status)).replace("{because}", &self.because.render());
        Ok(self.conclude(Some(AssertionFailure::new(FailureKind::Status, rendered))))
    }

    fn conclude(&self, failure: Option<AssertionFailure>) -> Outcome {
        match failure {
            None => Outcome::Passed,
            Some(failure) => {
                tracing::debug!("Assertion failed: {}", failure.message());
                self.reporter.report(&failure);
                Outcome::Failed(failure)
            }
        }
    }
}

/// `"404 (Not Found)"`
fn describe(status: StatusCode) -> String {
    format!(
        "{} ({})",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct TestResponse {
        id: i64,
        name: String,
    }

    fn pending(status: u16, body: &'static str) -> PendingResponse {
        let response = http::Response::builder()
            .status(status)
            .body(body)
            .unwrap();
        PendingResponse::ready(reqwest::Response::from(response))
    }

    fn collecting(pending: PendingResponse) -> (ResponseAssertions, CollectingReporter) {
        let reporter = CollectingReporter::new();
        let assertions = pending.should().with_reporter(Arc::new(reporter.clone()));
        (assertions, reporter)
    }

    #[tokio::test]
    async fn succeed_should_pass_for_every_2xx_status() {
        for code in [200, 201, 204, 299] {
            let (assertions, reporter) = collecting(pending(code, ""));
            assert!(assertions.succeed().await.unwrap().is_passed());
            assert!(reporter.is_empty());
        }
    }

    #[tokio::test]
    async fn succeed_should_report_status_and_reason() {
        let (assertions, reporter) = collecting(pending(500, ""));
        let outcome = assertions.because("the basket exists").succeed().await.unwrap();

        let failure = outcome.failure().unwrap();
        assert_eq!(failure.kind(), FailureKind::Status);
        assert_eq!(
            failure.message(),
            "Expected HTTP response to be successful because the basket exists, but found 500 (Internal Server Error)."
        );
        assert_eq!(reporter.failures().len(), 1);
    }

    #[tokio::test]
    async fn fail_should_pass_for_client_errors() {
        let (assertions, _) = collecting(pending(400, ""));
        assert!(assertions.fail().await.unwrap().is_passed());

        let (assertions, _) = collecting(pending(200, ""));
        let outcome = assertions.fail().await.unwrap();
        assert_eq!(
            outcome.failure().unwrap().message(),
            "Expected HTTP response to fail, but found 200 (OK)."
        );
    }

    #[tokio::test]
    async fn have_status_code_should_name_expected_and_actual() {
        let (assertions, _) = collecting(pending(403, ""));
        assert!(assertions
            .have_status_code(StatusCode::FORBIDDEN)
            .await
            .unwrap()
            .is_passed());

        let (assertions, _) = collecting(pending(404, ""));
        let outcome = assertions
            .because_with("user {0} was deleted", [7])
            .succeed_with(StatusCode::FORBIDDEN)
            .await
            .unwrap();
        assert_eq!(
            outcome.failure().unwrap().message(),
            "Expected HTTP response to have status code 403 (Forbidden) because user 7 was deleted, but found 404 (Not Found)."
        );
    }

    #[tokio::test]
    async fn have_status_matching_should_use_predicate() {
        let (assertions, _) = collecting(pending(503, ""));
        let outcome = assertions
            .have_status_matching("be a client error", |s| s.is_client_error())
            .await
            .unwrap();
        assert_eq!(
            outcome.failure().unwrap().message(),
            "Expected HTTP response to be a client error, but found 503 (Service Unavailable)."
        );
    }

    #[tokio::test]
    async fn resolve_should_be_idempotent() {
        let (mut assertions, _) = collecting(pending(201, ""));
        assert_eq!(assertions.status().await.unwrap(), StatusCode::CREATED);
        assert_eq!(assertions.status().await.unwrap(), StatusCode::CREATED);
        assert!(assertions.succeed().await.unwrap().is_passed());
    }

    #[tokio::test]
    async fn satisfy_should_pass_when_inspector_is_satisfied() {
        let (assertions, reporter) = collecting(pending(200, r#"{"id":42,"name":"The Answer"}"#));
        let outcome = assertions
            .satisfy::<TestResponse, _>(|body, s| {
                s.equal("id", &body.id, &42, "the Id should be 42");
                s.equal("name", body.name.as_str(), "The Answer", "");
            })
            .await
            .unwrap();

        assert!(outcome.is_passed());
        assert!(reporter.is_empty());
    }

    #[tokio::test]
    async fn satisfy_should_aggregate_sub_failures() {
        let (assertions, _) = collecting(pending(200, r#"{"id":42,"name":"The Answer"}"#));
        let outcome = assertions
            .because("the server returned the expected JSON body")
            .satisfy::<TestResponse, _>(|body, s| {
                s.equal("id", &body.id, &1, "the Id should be 1");
                s.equal("name", body.name.as_str(), "Other", "");
            })
            .await
            .unwrap();

        let failure = outcome.failure().unwrap();
        assert_eq!(failure.kind(), FailureKind::Inspector);
        assert_eq!(
            failure.details(),
            &[
                "Expected id to be 1 because the Id should be 1, but found 42.".to_string(),
                "Expected name to be \"Other\", but found \"The Answer\".".to_string(),
            ]
        );
        assert!(failure.message().starts_with(
            "Expected http-response to match inspector because the server returned the expected JSON body, but the inspector was not satisfied:\n"
        ));
        assert!(!failure.message().contains("deserialize"));
    }

    #[tokio::test]
    async fn satisfy_should_fail_on_blank_body_without_deserializing() {
        let (assertions, _) = collecting(pending(200, "   "));
        let outcome = assertions
            .satisfy::<TestResponse, _>(|_, s| {
                s.fail("verification must not run");
            })
            .await
            .unwrap();

        let failure = outcome.failure().unwrap();
        assert_eq!(failure.kind(), FailureKind::EmptyOrMissingBody);
        assert!(failure.message().contains("but it was empty"));
    }

    #[tokio::test]
    async fn satisfy_should_propagate_malformed_json_as_error() {
        let (assertions, reporter) = collecting(pending(200, "{not json"));
        let result = assertions.satisfy::<TestResponse, _>(|_, _| {}).await;

        assert!(matches!(result, Err(Error::Deserialize { .. })));
        assert!(reporter.is_empty());
    }

    #[tokio::test]
    async fn assertions_should_refuse_a_taken_response() {
        let (mut assertions, _) = collecting(pending(200, "{}"));
        assertions.take_response().await.unwrap();

        assert!(matches!(assertions.resolve().await, Err(Error::ResponseConsumed)));
        assert!(matches!(
            assertions.take_response().await,
            Err(Error::ResponseConsumed)
        ));
    }

    #[tokio::test]
    async fn satisfy_should_read_body_within_the_exchange_scope() {
        let cancellation = tokio_util::sync::CancellationToken::new();
        cancellation.cancel();
        let response = http::Response::builder()
            .status(200)
            .body(r#"{"id":42,"name":"The Answer"}"#)
            .unwrap();
        let exchange = (
            reqwest::Response::from(response),
            ExchangeScope::start(None, cancellation),
        );
        let (assertions, reporter) =
            collecting(PendingResponse::scoped(futures::future::ready(Ok(exchange))));

        let result = assertions.satisfy::<TestResponse, _>(|_, _| {}).await;
        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(reporter.is_empty());
    }

    #[tokio::test]
    async fn assertions_should_propagate_dispatch_errors() {
        let pending = PendingResponse::new(async { Err(Error::Cancelled) });
        let result = pending.should().succeed().await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test]
    #[should_panic(expected = "but found 404 (Not Found)")]
    async fn default_reporter_should_panic_on_failure() {
        let _ = pending(404, "").should().succeed().await;
    }
}
