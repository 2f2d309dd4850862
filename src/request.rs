//! # Request Specification
//!
//! [`RequestSpec`] is the mutable configuration a fluent chain accumulates.
//! [`materialize`] turns a snapshot of it into a [`MaterializedRequest`]
//! without touching the network.

use crate::auth::Authorization;
use crate::config::RequestDefaults;
use crate::error::{Error, Result};
use crate::json;
use crate::method::HttpMethod;
use crate::query::QuerySpec;
use regex::Regex;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION, CONTENT_TYPE,
    USER_AGENT,
};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

/// Custom header carrying the culture next to `Accept-Language`
pub const LANG_HEADER: &str = "lang";

/// `{n}` positional placeholder
pub(crate) static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\d+)\}").expect("placeholder pattern is valid"));

type RenderFn = dyn Fn() -> serde_json::Result<String> + Send + Sync;

/// A request payload that is serialized only when the request is materialized
#[derive(Clone)]
pub struct RequestBody(Arc<RenderFn>);

impl RequestBody {
    pub fn json<T>(value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        Self(Arc::new(move || json::to_string(&value)))
    }

    pub fn render(&self) -> serde_json::Result<String> {
        (self.0)()
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RequestBody(..)")
    }
}

/// Configuration of one request; pure data until materialized
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: HttpMethod,
    /// Relative or absolute target, optionally with `{0}`-style placeholders
    pub path: Option<String>,
    /// Positional values for the path placeholders
    pub path_args: Vec<String>,
    pub query: QuerySpec,
    pub body: Option<RequestBody>,
    pub content_type: String,
    pub accepted_content_type: String,
    pub culture: String,
    pub user_agent: String,
    pub authorization: Option<Authorization>,
    pub timeout: Option<Duration>,
    headers: Vec<(String, String)>,
}

impl RequestSpec {
    pub fn new(defaults: &RequestDefaults) -> Self {
        Self {
            method: HttpMethod::default(),
            path: defaults.path.clone(),
            path_args: Vec::new(),
            query: QuerySpec::new(),
            body: None,
            content_type: defaults.content_type.clone(),
            accepted_content_type: defaults.accepted_content_type.clone(),
            culture: defaults.culture.clone(),
            user_agent: defaults.user_agent.clone(),
            authorization: None,
            timeout: defaults.timeout,
            headers: Vec::new(),
        }
    }

    /// Set an explicit header; a later call with the same name (in any case) replaces it
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(entry) => *entry = (name, value),
            None => self.headers.push((name, value)),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Path (with placeholders filled) plus the encoded query string.
    ///
    /// An unset path renders as empty here; [`materialize`] rejects it.
    pub fn target(&self) -> Result<String> {
        let path = format_path(self.path.as_deref().unwrap_or_default(), &self.path_args)?;
        if self.query.is_empty() {
            return Ok(path);
        }
        let separator = if path.contains('?') { '&' } else { '?' };
        Ok(format!("{path}{separator}{}", self.query.encode()))
    }
}

/// Replace `{n}` placeholders with the percent-encoded `n`th argument.
///
/// Without arguments the path is returned verbatim, braces included.
pub fn format_path(template: &str, args: &[String]) -> Result<String> {
    if args.is_empty() {
        return Ok(template.to_string());
    }

    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(template) {
        let (Some(whole), Some(index)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let arg = index
            .as_str()
            .parse::<usize>()
            .ok()
            .and_then(|i| args.get(i))
            .ok_or_else(|| {
                Error::InvalidRequestConfiguration(format!(
                    "path placeholder {} has no matching argument ({} given)",
                    whole.as_str(),
                    args.len()
                ))
            })?;
        out.push_str(&template[last..whole.start()]);
        out.push_str(&urlencoding::encode(arg));
        last = whole.end();
    }
    out.push_str(&template[last..]);
    Ok(out)
}

/// A fully resolved request ready for the transport
#[derive(Debug, Clone)]
pub struct MaterializedRequest {
    method: HttpMethod,
    target: String,
    headers: HeaderMap,
    body: Option<String>,
    timeout: Option<Duration>,
}

impl MaterializedRequest {
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Relative or absolute target including the query string
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Serialized JSON payload, if any
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub(crate) fn into_parts(self) -> (HttpMethod, String, HeaderMap, Option<String>) {
        (self.method, self.target, self.headers, self.body)
    }
}

/// Snapshot `spec` into a request.
///
/// Header precedence, lowest first: user agent, accept, culture, explicit
/// headers, body content type, authorization. Transport-level defaults sit
/// underneath all of these.
pub fn materialize(spec: &RequestSpec) -> Result<MaterializedRequest> {
    if spec.path.is_none() {
        return Err(Error::InvalidRequestConfiguration(
            "request path is not set and no default path is configured".to_string(),
        ));
    }
    let target = spec.target()?;

    let mut headers = HeaderMap::new();
    insert_header(&mut headers, USER_AGENT, &spec.user_agent)?;
    insert_header(&mut headers, ACCEPT, &spec.accepted_content_type)?;
    insert_header(&mut headers, ACCEPT_LANGUAGE, &spec.culture)?;
    insert_header(&mut headers, HeaderName::from_static(LANG_HEADER), &spec.culture)?;

    for (name, value) in &spec.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| Error::InvalidHeader { name: name.clone() })?;
        insert_header(&mut headers, header_name, value)?;
    }

    let body = match &spec.body {
        Some(body) => {
            let text = body.render().map_err(Error::Serialize)?;
            insert_header(&mut headers, CONTENT_TYPE, &spec.content_type)?;
            Some(text)
        }
        None => None,
    };

    if let Some(authorization) = &spec.authorization {
        insert_header(&mut headers, AUTHORIZATION, &authorization.header_value())?;
    }

    tracing::debug!(
        "Materialized {} {} with {} headers{}",
        spec.method,
        target,
        headers.len(),
        if body.is_some() { " and a JSON body" } else { "" }
    );

    Ok(MaterializedRequest {
        method: spec.method,
        target,
        headers,
        body,
        timeout: spec.timeout,
    })
}

fn insert_header(headers: &mut HeaderMap, name: HeaderName, value: &str) -> Result<()> {
    if value.is_empty() {
        return Ok(());
    }
    let value = HeaderValue::from_str(value).map_err(|_| Error::InvalidHeader {
        name: name.to_string(),
    })?;
    headers.insert(name, value);
    Ok(())
}
