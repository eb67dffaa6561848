//! Middleware to automatically attach authorization to outgoing requests
//!
//! When using [`ClientWithMiddleware`](reqwest_middleware::ClientWithMiddleware),
//! include the [`AccessTokenMiddleware`] in the middleware stack to obtain a token
//! from a [`TokenLifecycleManager`] for each outbound request.
//!
//! If a request already has specified an `Authorization` header value by
//! the time that the middleware executes, the existing value will be left
//! in place, allowing overrides to be specified as required.

use std::fmt;

use bytes::{BufMut, BytesMut};
use cogspeech_clock::{Clock, System};
use cogspeech_tokens::{sources::TokenFetcher, AccessTokenRef, TokenLifecycleManager};
use reqwest::{header, Request, Response};
use reqwest_middleware::{Middleware, Next, Result};

/// A middleware that injects a bearer token into outgoing requests
///
/// Failures to obtain a token are reported as
/// [`reqwest_middleware::Error::Middleware`] wrapping the
/// [`TokenError`][cogspeech_tokens::TokenError].
pub struct AccessTokenMiddleware<F: TokenFetcher, C = System> {
    auth: TokenLifecycleManager<F, C>,
}

impl<F: TokenFetcher, C> Clone for AccessTokenMiddleware<F, C> {
    fn clone(&self) -> Self {
        Self {
            auth: self.auth.clone(),
        }
    }
}

impl<F, C> fmt::Debug for AccessTokenMiddleware<F, C>
where
    F: TokenFetcher + fmt::Debug,
    C: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("AccessTokenMiddleware")
            .field("auth", &self.auth)
            .finish()
    }
}

impl<F: TokenFetcher, C> AccessTokenMiddleware<F, C> {
    /// Constructs a new middleware from a token manager
    pub fn new(auth: TokenLifecycleManager<F, C>) -> Self {
        Self { auth }
    }
}

/// Formats `token` as a sensitive `Bearer` authorization header value
pub fn bearer_header(
    token: &AccessTokenRef,
) -> std::result::Result<header::HeaderValue, header::InvalidHeaderValue> {
    let mut header_value = BytesMut::with_capacity(token.as_str().len() + 7);
    header_value.put_slice(b"Bearer ");
    header_value.put_slice(token.as_str().as_bytes());
    let mut value = header::HeaderValue::from_maybe_shared(header_value.freeze())?;
    value.set_sensitive(true);
    Ok(value)
}

#[async_trait::async_trait]
impl<F, C> Middleware for AccessTokenMiddleware<F, C>
where
    F: TokenFetcher,
    C: Clock + Send + Sync + 'static,
{
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut http::Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        if !req.headers().contains_key(header::AUTHORIZATION) {
            let token = self
                .auth
                .token()
                .await
                .map_err(reqwest_middleware::Error::middleware)?;
            let value = bearer_header(&token).map_err(reqwest_middleware::Error::middleware)?;

            tracing::trace!("attaching access token to request");
            req.headers_mut().insert(header::AUTHORIZATION, value);
        }

        next.run(req, extensions).await
    }
}
