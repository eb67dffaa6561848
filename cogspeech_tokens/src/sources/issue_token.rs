//! A token fetcher that exchanges a subscription key at the speech service's
//! token issuing endpoint

use async_trait::async_trait;
use thiserror::Error;

use super::{FetchResponse, TokenFetcher};
use crate::{Region, RegionRef, SubscriptionKey};

/// The header used to present the subscription key
pub const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

const ISSUE_TOKEN_PATH: &str = "sts/v1.0/issueToken";

/// Builds the issuing endpoint URL for the given region
///
/// Without a region, the global endpoint is used.
pub fn issue_token_url(region: Option<&RegionRef>) -> Result<reqwest::Url, url::ParseError> {
    let url = match region {
        Some(region) => format!(
            "https://{}.api.cognitive.microsoft.com/{}",
            region, ISSUE_TOKEN_PATH
        ),
        None => format!("https://api.cognitive.microsoft.com/{}", ISSUE_TOKEN_PATH),
    };
    reqwest::Url::parse(&url)
}

/// Fetches tokens by posting a subscription key to the issuing endpoint
#[derive(Debug)]
pub struct IssueTokenFetcher {
    client: reqwest::Client,
    token_url: reqwest::Url,
    subscription_key: SubscriptionKey,
    region: Option<Region>,
}

impl IssueTokenFetcher {
    /// Constructs a new fetcher for the issuing endpoint of `region`
    pub fn new(
        client: reqwest::Client,
        subscription_key: SubscriptionKey,
        region: Option<Region>,
    ) -> Result<Self, url::ParseError> {
        let token_url = issue_token_url(region.as_deref())?;
        Ok(Self {
            client,
            token_url,
            subscription_key,
            region,
        })
    }

    /// Sends token requests to `token_url` instead of the regional endpoint
    pub fn with_token_url(mut self, token_url: reqwest::Url) -> Self {
        self.token_url = token_url;
        self
    }

    /// The URL token requests are sent to
    pub fn token_url(&self) -> &reqwest::Url {
        &self.token_url
    }
}

/// An error while attempting to reach the issuing endpoint
#[derive(Debug, Error)]
pub enum IssueTokenError {
    /// Unable to send a token request to the endpoint
    #[error("error sending request to token endpoint")]
    RequestSend(#[source] reqwest::Error),
    /// Unable to read the response
    #[error("error reading token response body")]
    BodyRead(#[source] reqwest::Error),
}

#[async_trait]
impl TokenFetcher for IssueTokenFetcher {
    type Error = IssueTokenError;

    #[tracing::instrument(
        err,
        skip(self),
        fields(
            token_url = %self.token_url,
            region = self.region.as_ref().map(|r| r.as_str()).unwrap_or("global"),
        ),
    )]
    async fn fetch_token(&self) -> Result<FetchResponse, Self::Error> {
        tracing::trace!("requesting token from issuing endpoint");

        let resp = self
            .client
            .post(self.token_url.clone())
            .header(SUBSCRIPTION_KEY_HEADER, self.subscription_key.as_str())
            .header(reqwest::header::CONTENT_LENGTH, 0)
            .send()
            .await
            .map_err(IssueTokenError::RequestSend)?;

        let status = resp.status().as_u16();
        tracing::debug!(
            response.status = status,
            "received token response from issuing endpoint"
        );

        let body = resp.text().await.map_err(IssueTokenError::BodyRead)?;

        Ok(FetchResponse { status, body })
    }
}
