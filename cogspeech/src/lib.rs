//! A client for a speech recognizer authorized by short-lived bearer tokens
//!
//! Recognition requests are authorized with an access token obtained from a
//! [`TokenLifecycleManager`][cogspeech_tokens::TokenLifecycleManager]. The token is
//! attached to each request by [`AccessTokenMiddleware`], so a single token is shared
//! by every request made while it is valid, and only one request for a new token is
//! made when it expires.
//!
//! ```no_run
//! use cogspeech::{SpeechClient, SpeechOptions, DEFAULT_ENDPOINT};
//! use cogspeech_tokens::{SpeechAuthConfig, SubscriptionKey};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let auth = SpeechAuthConfig::new(SubscriptionKey::new("my-subscription-key".into()))
//!     .with_autorenew(true)
//!     .build(reqwest::Client::new())?;
//!
//! let client = SpeechClient::new(DEFAULT_ENDPOINT.parse()?, auth);
//!
//! let audio = std::fs::read("hello.wav")?;
//! let speech = client
//!     .recognize(audio, &SpeechOptions::default().with_locale("en-GB"))
//!     .await?;
//!
//! if let Some(text) = speech.best_text() {
//!     println!("{text}");
//! }
//! # Ok(())
//! # }
//! ```

#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

mod client;
mod middleware;
mod speech;

pub use client::{RecognizeError, SpeechClient, DEFAULT_ENDPOINT};
pub use middleware::{bearer_header, AccessTokenMiddleware};
pub use speech::{
    RecognizedSpeechHeader, RecognizedSpeechResult, SpeechOptions, SpeechProperty, SpeechResult,
    SpeechStatus, DEFAULT_LOCALE, DEFAULT_SAMPLE_RATE, DEFAULT_SCENARIOS,
};
