//! Token fetch operations

use async_trait::async_trait;
use std::{error, sync::Arc};

#[cfg(feature = "issue-token")]
pub mod issue_token;

#[cfg(feature = "issue-token")]
pub use issue_token::{IssueTokenError, IssueTokenFetcher};

/// The raw outcome of a token request that reached the issuing endpoint
///
/// The status is not interpreted here; the lifecycle manager decides whether the
/// response represents a usable token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchResponse {
    /// The transport status code
    pub status: u16,
    /// The raw response body
    pub body: String,
}

impl FetchResponse {
    /// Constructs a new fetch response
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// An asynchronous operation that exchanges credentials for a new token
#[async_trait]
pub trait TokenFetcher: Send + Sync + 'static {
    /// The error type returned when the endpoint could not be reached
    type Error: error::Error + Send + Sync + 'static;

    /// Requests a new token from the issuing endpoint
    async fn fetch_token(&self) -> Result<FetchResponse, Self::Error>;
}

#[async_trait]
impl<T: TokenFetcher + ?Sized> TokenFetcher for Arc<T> {
    type Error = T::Error;

    async fn fetch_token(&self) -> Result<FetchResponse, Self::Error> {
        (**self).fetch_token().await
    }
}
