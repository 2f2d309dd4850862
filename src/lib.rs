//! # fluent-client - Fluent HTTP Requests and Response Assertions
//!
//! Describe a request declaratively, send it, then assert on the response
//! with chainable checks instead of manual status checks and JSON parsing.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐ chain  ┌─────────────┐ materialize ┌────────────────────┐
//! │ FluentClient │───────▶│ RequestSpec │────────────▶│ MaterializedRequest│
//! └──────────────┘        └─────────────┘             └─────────┬──────────┘
//!                                                               │ Dispatcher
//!                                                               ▼ (timeout ∧ cancellation)
//! ┌────────────────────┐      should()       ┌─────────────────────────────┐
//! │ ResponseAssertions │◀────────────────────│      PendingResponse        │
//! │ succeed / fail /   │                     │ owns the in-flight exchange │
//! │ satisfy<T>         │                     └─────────────────────────────┘
//! └─────────┬──────────┘
//!           │ failures
//!           ▼
//!      Reporter (panic / collect)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! # async fn demo() -> fluent_client::Result<()> {
//! use fluent_client::FluentClient;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Basket {
//!     id: i64,
//! }
//!
//! let client = FluentClient::with_base_url(reqwest::Client::new(), "https://lepo.co")?;
//! client
//!     .with(serde_json::json!({ "cartItem": "esp32-dev-board" }))
//!     .post("/v1/api/basket")?
//!     .should()
//!     .because("the basket was created")
//!     .satisfy::<Basket, _>(|basket, s| {
//!         s.check(basket.id > 0, "basket id should be positive");
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod assertions;
pub mod auth;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod json;
pub mod method;
pub mod query;
pub mod request;
pub mod response;

// Re-export main types for easy access
pub use assertions::{
    AssertionFailure, Because, CollectingReporter, FailureKind, Inspector, Outcome, PanicReporter,
    Reporter, ResponseAssertions,
};
pub use auth::{Authorization, AuthorizationType, Credentials};
pub use client::{FluentClient, FluentRequest};
pub use config::RequestDefaults;
pub use dispatch::{Dispatcher, ExchangeScope};
pub use error::{Error, Result};
pub use method::HttpMethod;
pub use query::QuerySpec;
pub use request::{materialize, MaterializedRequest, RequestBody, RequestSpec};
pub use response::PendingResponse;
pub use tokio_util::sync::CancellationToken;
