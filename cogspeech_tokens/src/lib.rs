//! Acquisition, caching, and background renewal of speech service access tokens
//!
//! The speech service authorizes recognition requests with short-lived bearer tokens,
//! which are obtained by exchanging a subscription key at a token issuing endpoint. Each
//! token is valid for ten minutes.
//!
//! A [`TokenLifecycleManager`] holds the current token and hands it out to any number of
//! concurrent callers. While the token is valid, callers are served from the cache without
//! touching the network. Once it has expired, the first caller starts a fetch and every
//! caller arriving before that fetch completes waits on it, so only one request is ever
//! made to the issuing endpoint at a time.
//!
//! Optionally, the manager can run a background timer that periodically requests a token
//! through the same path, so that an expired token is replaced without waiting for the
//! next caller.
//!
//! ```no_run
//! use cogspeech_tokens::{Region, SpeechAuthConfig, SubscriptionKey};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let auth = SpeechAuthConfig::new(SubscriptionKey::new("my-subscription-key".into()))
//!     .with_region(Region::from_static("westus"))
//!     .with_autorenew(true)
//!     .build(reqwest::Client::new())?;
//!
//! let token = auth.token().await?;
//!
//! tracing::info!(token = format_args!("{:#?}", token), "obtained access token");
//! # Ok(())
//! # }
//! ```
//!
//! Fetching is abstracted behind [`TokenFetcher`][sources::TokenFetcher], and the manager
//! reads time from a [`Clock`][cogspeech_clock::Clock], so both can be replaced in tests.
//!
//! # Features
//!
//! * `issue-token` (default): Provides [`IssueTokenFetcher`][sources::IssueTokenFetcher],
//!   which exchanges a subscription key at the issuing endpoint, and [`SpeechAuthConfig`].

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

mod braids;
#[cfg(feature = "issue-token")]
mod config;
mod error;
mod manager;
pub mod renew;
pub mod sources;
mod tokens;

pub use braids::*;
#[cfg(feature = "issue-token")]
pub use config::{SpeechAuthClient, SpeechAuthConfig};
pub use error::TokenError;
pub use manager::{TokenLifecycleManager, TokenResult, DEFAULT_RENEW_INTERVAL, TOKEN_LIFETIME};
pub use tokens::TokenStore;
