//! # Fluent Client
//!
//! Entry point for building requests. [`FluentClient`] wraps a
//! `reqwest::Client` together with an optional base URL and the request
//! defaults; every chain starts from it and produces a [`FluentRequest`].
//!
//! ```no_run
//! # async fn demo() -> fluent_client::Result<()> {
//! use fluent_client::{Credentials, FluentClient};
//!
//! let client = FluentClient::with_base_url(reqwest::Client::new(), "https://lepo.co")?;
//! client
//!     .authorize(Credentials::token("abc123"))?
//!     .with_parameter("page", 2)
//!     .get("/v1/api/basket")?
//!     .should()
//!     .succeed()
//!     .await?;
//! # Ok(())
//! # }
//! ```

use crate::auth::{Authorization, AuthorizationType, Credentials};
use crate::config::RequestDefaults;
use crate::dispatch::{Dispatcher, ExchangeScope};
use crate::error::{Error, Result};
use crate::method::HttpMethod;
use crate::request::{materialize, MaterializedRequest, RequestBody, RequestSpec};
use crate::response::PendingResponse;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct FluentClient {
    dispatcher: Dispatcher,
    defaults: RequestDefaults,
}

impl FluentClient {
    /// Client without a base URL; every path must be absolute
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            dispatcher: Dispatcher::new(client, None),
            defaults: RequestDefaults::from_env(),
        }
    }

    pub fn with_base_url(client: reqwest::Client, base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            Error::InvalidRequestConfiguration(format!("invalid base URL '{base_url}': {e}"))
        })?;
        Ok(Self {
            dispatcher: Dispatcher::new(client, Some(base_url)),
            defaults: RequestDefaults::from_env(),
        })
    }

    pub fn with_defaults(mut self, defaults: RequestDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn defaults(&self) -> &RequestDefaults {
        &self.defaults
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.dispatcher.base_url()
    }

    /// Start an empty chain
    pub fn request(&self) -> FluentRequest {
        FluentRequest {
            dispatcher: self.dispatcher.clone(),
            spec: RequestSpec::new(&self.defaults),
            cancellation: CancellationToken::new(),
        }
    }

    /// Start a chain carrying `body` as its JSON payload
    pub fn with<T>(&self, body: T) -> FluentRequest
    where
        T: Serialize + Send + Sync + 'static,
    {
        self.request().with(body)
    }

    /// Start a chain with an `Authorization` header
    pub fn authorize(&self, credentials: Credentials) -> Result<FluentRequest> {
        self.request().authorize(credentials)
    }

    pub fn query<Q: Serialize + ?Sized>(&self, query: &Q) -> Result<FluentRequest> {
        self.request().query(query)
    }

    pub fn with_parameter(&self, key: impl Into<String>, value: impl ToString) -> FluentRequest {
        self.request().with_parameter(key, value)
    }

    pub fn get(&self, path: &str) -> Result<PendingResponse> {
        self.request().get(path)
    }

    pub fn post(&self, path: &str) -> Result<PendingResponse> {
        self.request().post(path)
    }

    pub fn put(&self, path: &str) -> Result<PendingResponse> {
        self.request().put(path)
    }

    pub fn patch(&self, path: &str) -> Result<PendingResponse> {
        self.request().patch(path)
    }

    pub fn delete(&self, path: &str) -> Result<PendingResponse> {
        self.request().delete(path)
    }

    pub fn head(&self, path: &str) -> Result<PendingResponse> {
        self.request().head(path)
    }

    pub fn options(&self, path: &str) -> Result<PendingResponse> {
        self.request().options(path)
    }

    pub async fn get_as<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request().get_as(path).await
    }

    pub async fn post_as<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request().post_as(path).await
    }

    pub async fn put_as<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request().put_as(path).await
    }

    pub async fn patch_as<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request().patch_as(path).await
    }

    pub async fn delete_as<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request().delete_as(path).await
    }

    pub async fn options_as<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request().options_as(path).await
    }
}

/// One fluent chain: configuration plus the means to send it.
///
/// Every chain method consumes and returns the request. The configuration
/// is snapshotted by [`FluentRequest::send`]; nothing is sent until the
/// returned [`PendingResponse`] is awaited.
#[derive(Debug, Clone)]
pub struct FluentRequest {
    dispatcher: Dispatcher,
    spec: RequestSpec,
    cancellation: CancellationToken,
}

impl FluentRequest {
    pub fn spec(&self) -> &RequestSpec {
        &self.spec
    }

    pub fn spec_mut(&mut self) -> &mut RequestSpec {
        &mut self.spec
    }

    /// Path and encoded query as they would be sent
    pub fn target(&self) -> Result<String> {
        self.spec.target()
    }

    pub fn with<T>(mut self, body: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        self.spec.body = Some(RequestBody::json(body));
        self
    }

    /// Resolve `credentials` now; missing credentials fail immediately
    pub fn authorize(mut self, credentials: Credentials) -> Result<Self> {
        self.spec.authorization = Some(credentials.resolve()?);
        Ok(self)
    }

    pub fn bearer(self, token: impl Into<String>) -> Self {
        let authorization = Authorization::new(AuthorizationType::Bearer, token);
        self.with_authorization(authorization)
    }

    pub fn with_authorization(mut self, authorization: Authorization) -> Self {
        self.spec.authorization = Some(authorization);
        self
    }

    /// Append the fields of `query` as parameters
    pub fn query<Q: Serialize + ?Sized>(mut self, query: &Q) -> Result<Self> {
        self.spec.query.extend_from(query)?;
        Ok(self)
    }

    /// Append one parameter; repeated keys are kept
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.spec.query.push(key, Some(value.to_string()));
        self
    }

    pub fn with_optional_parameter<V: ToString>(
        mut self,
        key: impl Into<String>,
        value: Option<V>,
    ) -> Self {
        self.spec.query.push(key, value.map(|v| v.to_string()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.spec.set_header(name, value);
        self
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.spec.method = method;
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.spec.path = Some(path.into());
        self
    }

    /// Positional value for the next `{n}` placeholder in the path
    pub fn path_arg(mut self, value: impl ToString) -> Self {
        self.spec.path_args.push(value.to_string());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.spec.timeout = Some(timeout);
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.spec.content_type = content_type.into();
        self
    }

    pub fn accept(mut self, accepted_content_type: impl Into<String>) -> Self {
        self.spec.accepted_content_type = accepted_content_type.into();
        self
    }

    pub fn culture(mut self, culture: impl Into<String>) -> Self {
        self.spec.culture = culture.into();
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.spec.user_agent = user_agent.into();
        self
    }

    /// Ambient cancellation that aborts the request when fired
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn materialize(&self) -> Result<MaterializedRequest> {
        materialize(&self.spec)
    }

    /// Snapshot the configuration and return the deferred exchange.
    ///
    /// The timeout starts when the exchange is first awaited and also bounds
    /// reading the body.
    pub fn send(self) -> Result<PendingResponse> {
        let request = materialize(&self.spec)?;
        let dispatcher = self.dispatcher;
        let cancellation = self.cancellation;
        Ok(PendingResponse::scoped(async move {
            let scope = ExchangeScope::start(request.timeout(), cancellation);
            let response = dispatcher.send(request, &scope).await?;
            Ok((response, scope))
        }))
    }

    /// Send and deserialize the response body into `T`
    pub async fn send_as<T: DeserializeOwned>(self) -> Result<T> {
        self.send()?.json().await
    }

    fn verb(self, method: HttpMethod, path: &str) -> Self {
        self.method(method).path(path)
    }

    pub fn get(self, path: &str) -> Result<PendingResponse> {
        self.verb(HttpMethod::Get, path).send()
    }

    pub fn post(self, path: &str) -> Result<PendingResponse> {
        self.verb(HttpMethod::Post, path).send()
    }

    pub fn put(self, path: &str) -> Result<PendingResponse> {
        self.verb(HttpMethod::Put, path).send()
    }

    pub fn patch(self, path: &str) -> Result<PendingResponse> {
        self.verb(HttpMethod::Patch, path).send()
    }

    pub fn delete(self, path: &str) -> Result<PendingResponse> {
        self.verb(HttpMethod::Delete, path).send()
    }

    pub fn head(self, path: &str) -> Result<PendingResponse> {
        self.verb(HttpMethod::Head, path).send()
    }

    pub fn options(self, path: &str) -> Result<PendingResponse> {
        self.verb(HttpMethod::Options, path).send()
    }

    pub async fn get_as<T: DeserializeOwned>(self, path: &str) -> Result<T> {
        self.verb(HttpMethod::Get, path).send_as().await
    }

    pub async fn post_as<T: DeserializeOwned>(self, path: &str) -> Result<T> {
        self.verb(HttpMethod::Post, path).send_as().await
    }

    pub async fn put_as<T: DeserializeOwned>(self, path: &str) -> Result<T> {
        self.verb(HttpMethod::Put, path).send_as().await
    }

    pub async fn patch_as<T: DeserializeOwned>(self, path: &str) -> Result<T> {
        self.verb(HttpMethod::Patch, path).send_as().await
    }

    pub async fn delete_as<T: DeserializeOwned>(self, path: &str) -> Result<T> {
        self.verb(HttpMethod::Delete, path).send_as().await
    }

    pub async fn options_as<T: DeserializeOwned>(self, path: &str) -> Result<T> {
        self.verb(HttpMethod::Options, path).send_as().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Search {
        page: u32,
        limit: u32,
        phrase: &'static str,
    }

    fn client() -> FluentClient {
        FluentClient::with_base_url(reqwest::Client::new(), "https://lepo.co")
            .unwrap()
            .with_defaults(RequestDefaults::default())
    }

    fn search() -> Search {
        Search {
            page: 1,
            limit: 2,
            phrase: "%x",
        }
    }

    #[test]
    fn fluent_request_should_build_query_on_path() {
        let request = client()
            .with(serde_json::json!({ "hello": "world" }))
            .path("/")
            .query(&search())
            .unwrap();

        assert_eq!(request.target().unwrap(), "/?page=1&limit=2&phrase=%25x");
    }

    #[test]
    fn fluent_client_should_build_query_without_path() {
        let request = client().query(&search()).unwrap();
        assert_eq!(request.target().unwrap(), "?page=1&limit=2&phrase=%25x");
    }

    #[test]
    fn fluent_request_should_append_duplicate_parameters() {
        let request = client()
            .query(&search())
            .unwrap()
            .with_parameter("page", 2)
            .with_parameter("page", 3);

        assert_eq!(
            request.target().unwrap(),
            "?page=1&limit=2&phrase=%25x&page=2&page=3"
        );
    }

    #[test]
    fn fluent_request_should_encode_optional_parameter_as_empty() {
        let request = client()
            .request()
            .with_optional_parameter::<u32>("cursor", None)
            .with_optional_parameter("size", Some(10))
            .path("/items");
        assert_eq!(request.target().unwrap(), "/items?cursor=&size=10");
    }

    #[test]
    fn fluent_client_should_fail_authorize_without_credentials() {
        let result = client().authorize(Credentials::default());
        assert!(matches!(result, Err(Error::MissingCredentials)));
    }

    #[test]
    fn fluent_request_should_keep_authorization_over_later_headers() {
        let request = client()
            .authorize(Credentials::basic("user", "pass"))
            .unwrap()
            .header("authorization", "Bearer sneaky")
            .header("X-Request-Id", "r-1")
            .path("/");

        let materialized = request.materialize().unwrap();
        assert_eq!(
            materialized.headers()[reqwest::header::AUTHORIZATION],
            "Basic dXNlcjpwYXNz"
        );
        assert_eq!(materialized.headers()["x-request-id"], "r-1");
    }

    #[test]
    fn fluent_request_should_override_default_headers() {
        let materialized = client()
            .request()
            .culture("pl-PL")
            .accept("application/xml")
            .user_agent("probe/1.0")
            .path("/")
            .materialize()
            .unwrap();

        let headers = materialized.headers();
        assert_eq!(headers[reqwest::header::ACCEPT_LANGUAGE], "pl-PL");
        assert_eq!(headers["lang"], "pl-PL");
        assert_eq!(headers[reqwest::header::ACCEPT], "application/xml");
        assert_eq!(headers[reqwest::header::USER_AGENT], "probe/1.0");
    }

    #[test]
    fn fluent_request_should_set_bearer_token() {
        let materialized = client().request().bearer("t0k").path("/").materialize().unwrap();
        assert_eq!(
            materialized.headers()[reqwest::header::AUTHORIZATION],
            "Bearer t0k"
        );
    }

    #[test]
    fn fluent_request_send_should_fail_without_path() {
        let result = client().with_parameter("page", 1).send();
        assert!(matches!(result, Err(Error::InvalidRequestConfiguration(_))));
    }

    #[test]
    fn fluent_request_should_fill_path_arguments() {
        let request = client()
            .request()
            .path("/users/{0}")
            .path_arg("a/b")
            .with_parameter("q", "{0}");
        assert_eq!(request.target().unwrap(), "/users/a%2Fb?q=%7B0%7D");
    }

    #[test]
    fn fluent_request_should_carry_timeout_into_materialized_request() {
        let materialized = client()
            .request()
            .timeout(Duration::from_millis(100))
            .path("/")
            .materialize()
            .unwrap();
        assert_eq!(materialized.timeout(), Some(Duration::from_millis(100)));
    }
}
