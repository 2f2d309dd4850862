//! # Pending Response
//!
//! The not-yet-awaited result of dispatching a request. A `PendingResponse`
//! owns the exchange; whoever awaits it owns the `reqwest::Response` and
//! releases it when dropped.

use crate::assertions::ResponseAssertions;
use crate::dispatch::ExchangeScope;
use crate::error::{Error, Result};
use crate::json;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use std::fmt;
use std::future::{Future, IntoFuture};

/// A response together with the scope its body must be read in
pub(crate) type Exchange = (reqwest::Response, ExchangeScope);

pub struct PendingResponse {
    exchange: BoxFuture<'static, Result<Exchange>>,
}

impl fmt::Debug for PendingResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PendingResponse(..)")
    }
}

impl PendingResponse {
    /// Wrap an exchange whose body may be read without a deadline
    pub fn new<F>(exchange: F) -> Self
    where
        F: Future<Output = Result<reqwest::Response>> + Send + 'static,
    {
        Self::scoped(exchange.map(|result| {
            result.map(|response| (response, ExchangeScope::default()))
        }))
    }

    /// Wrap an exchange that hands on the scope it was dispatched in
    pub(crate) fn scoped<F>(exchange: F) -> Self
    where
        F: Future<Output = Result<Exchange>> + Send + 'static,
    {
        Self {
            exchange: exchange.boxed(),
        }
    }

    /// Wrap a response that has already arrived
    pub fn ready(response: reqwest::Response) -> Self {
        Self::new(futures::future::ready(Ok(response)))
    }

    /// Start asserting on this response
    pub fn should(self) -> ResponseAssertions {
        ResponseAssertions::new(self)
    }

    /// Await the response and deserialize its body into `T`
    pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
        let (response, scope) = self.exchange().await?;
        read_json(response, &scope).await
    }

    pub(crate) async fn exchange(self) -> Result<Exchange> {
        self.exchange.await
    }
}

impl From<reqwest::Response> for PendingResponse {
    fn from(response: reqwest::Response) -> Self {
        Self::ready(response)
    }
}

impl IntoFuture for PendingResponse {
    type Output = Result<reqwest::Response>;
    type IntoFuture = BoxFuture<'static, Result<reqwest::Response>>;

    fn into_future(self) -> Self::IntoFuture {
        self.exchange
            .map(|result| result.map(|(response, _)| response))
            .boxed()
    }
}

/// Read the whole body as text within `scope`
pub(crate) async fn read_text(
    response: reqwest::Response,
    scope: &ExchangeScope,
) -> Result<String> {
    scope
        .guard(async move { response.text().await.map_err(Error::BodyRead) })
        .await
}

/// Read the full body and deserialize it.
///
/// An empty or blank body, or a literal `null`, cannot produce a `T`.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
    scope: &ExchangeScope,
) -> Result<T> {
    let type_name = std::any::type_name::<T>();
    let text = read_text(response, scope).await?;
    if text.trim().is_empty() {
        return Err(Error::EmptyBody { type_name });
    }
    match json::from_str::<Option<T>>(&text) {
        Ok(Some(value)) => Ok(value),
        Ok(None) => Err(Error::EmptyBody { type_name }),
        Err(source) => Err(Error::Deserialize { type_name, source }),
    }
}
