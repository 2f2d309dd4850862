//! # Dispatcher
//!
//! Sends a [`MaterializedRequest`] through the underlying `reqwest` client.
//!
//! The per-request timeout and the caller's ambient cancellation are raced
//! against the exchange together: whichever fires first abandons the
//! request. Both keep applying while the body is read, through the
//! [`ExchangeScope`] handed on with the response. Without a timeout the
//! ambient cancellation alone governs.

use crate::error::{Error, Result};
use crate::request::MaterializedRequest;
use reqwest::Url;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct Dispatcher {
    client: reqwest::Client,
    base_url: Option<Url>,
}

impl Dispatcher {
    pub fn new(client: reqwest::Client, base_url: Option<Url>) -> Self {
        Self { client, base_url }
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Resolve a relative or absolute target against the base URL
    pub fn resolve(&self, target: &str) -> Result<Url> {
        if let Ok(url) = Url::parse(target) {
            return Ok(url);
        }
        match &self.base_url {
            Some(base) => base.join(target).map_err(|e| {
                Error::InvalidRequestConfiguration(format!("cannot resolve '{target}': {e}"))
            }),
            None => Err(Error::InvalidRequestConfiguration(format!(
                "relative target '{target}' requires a base URL"
            ))),
        }
    }

    /// Send the request and wait for the response headers within `scope`.
    /// No retries are attempted.
    pub async fn send(
        &self,
        request: MaterializedRequest,
        scope: &ExchangeScope,
    ) -> Result<reqwest::Response> {
        let (method, target, headers, body) = request.into_parts();
        let url = self.resolve(&target)?;

        tracing::debug!("Sending {method} {url} (timeout: {:?})", scope.timeout());

        let mut builder = self.client.request(method.into(), url.clone()).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let result = scope
            .guard(async move { builder.send().await.map_err(Error::Transport) })
            .await;
        match &result {
            Ok(response) => tracing::debug!("{method} {url} -> {}", response.status()),
            Err(Error::Cancelled) => tracing::warn!("{method} {url} cancelled by caller"),
            Err(Error::TimedOut(elapsed)) => {
                tracing::warn!("{method} {url} timed out after {elapsed:?}")
            }
            Err(e) => tracing::error!("{method} {url} failed: {e}"),
        }
        result
    }
}

/// Deadline and caller cancellation shared by every wait of one exchange.
///
/// The deadline is fixed when the scope starts, so sending the request and
/// reading the body draw on the same budget.
#[derive(Debug, Clone, Default)]
pub struct ExchangeScope {
    deadline: Option<(Instant, Duration)>,
    cancellation: CancellationToken,
}

impl ExchangeScope {
    /// Start the clock for `timeout`, linked with `cancellation`
    pub fn start(timeout: Option<Duration>, cancellation: CancellationToken) -> Self {
        Self {
            deadline: timeout.map(|timeout| (Instant::now() + timeout, timeout)),
            cancellation,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.deadline.map(|(_, timeout)| timeout)
    }

    /// Run `future` until it completes, the deadline passes or the caller
    /// cancels, whichever comes first.
    pub async fn guard<T, F>(&self, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(Error::Cancelled),
            timeout = expire(self.deadline) => Err(Error::TimedOut(timeout)),
            result = future => result,
        }
    }
}

/// Completes at the deadline with the configured timeout, or never
async fn expire(deadline: Option<(Instant, Duration)>) -> Duration {
    match deadline {
        Some((at, timeout)) => {
            tokio::time::sleep_until(at).await;
            timeout
        }
        None => std::future::pending().await,
    }
}
