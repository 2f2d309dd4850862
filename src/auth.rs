//! # Authorization
//!
//! Resolves credentials into the scheme and credential text of an
//! `Authorization` header.

use crate::error::{Error, Result};
use base64::Engine;
use std::fmt;

/// Scheme written in front of the credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationType {
    /// Bearer tokens, typically OAuth 2.0 access tokens or JWTs
    Bearer,
    /// Base64 encoded `username:password`
    Basic,
    Digest,
    ApiKey,
    OAuth,
}

impl AuthorizationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorizationType::Bearer => "Bearer",
            AuthorizationType::Basic => "Basic",
            AuthorizationType::Digest => "Digest",
            AuthorizationType::ApiKey => "ApiKey",
            AuthorizationType::OAuth => "OAuth",
        }
    }
}

impl fmt::Display for AuthorizationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw inputs to `authorize`; any field may be absent
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    username: Option<String>,
    password: Option<String>,
    token: Option<String>,
    scheme: Option<AuthorizationType>,
}

impl Credentials {
    pub fn new(
        username: Option<&str>,
        password: Option<&str>,
        token: Option<&str>,
        scheme: Option<AuthorizationType>,
    ) -> Self {
        Self {
            username: username.map(str::to_string),
            password: password.map(str::to_string),
            token: token.map(str::to_string),
            scheme,
        }
    }

    pub fn token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Self::default()
        }
    }

    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
            ..Self::default()
        }
    }

    /// Override the scheme that would otherwise be inferred
    pub fn with_scheme(mut self, scheme: AuthorizationType) -> Self {
        self.scheme = Some(scheme);
        self
    }

    /// Turn the credentials into a header value.
    ///
    /// A username/password pair takes priority over a token. With neither,
    /// fails with [`Error::MissingCredentials`].
    pub fn resolve(&self) -> Result<Authorization> {
        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            let encoded =
                base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
            return Ok(Authorization {
                scheme: self.scheme.unwrap_or(AuthorizationType::Basic),
                credential: encoded,
            });
        }

        if let Some(token) = &self.token {
            return Ok(Authorization {
                scheme: self.scheme.unwrap_or(AuthorizationType::Bearer),
                credential: token.clone(),
            });
        }

        Err(Error::MissingCredentials)
    }
}

/// A resolved `(scheme, credential)` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    scheme: AuthorizationType,
    credential: String,
}

impl Authorization {
    pub fn new(scheme: AuthorizationType, credential: impl Into<String>) -> Self {
        Self {
            scheme,
            credential: credential.into(),
        }
    }

    pub fn scheme(&self) -> AuthorizationType {
        self.scheme
    }

    pub fn credential(&self) -> &str {
        &self.credential
    }

    /// Text of the `Authorization` header
    pub fn header_value(&self) -> String {
        format!("{} {}", self.scheme, self.credential)
    }
}
