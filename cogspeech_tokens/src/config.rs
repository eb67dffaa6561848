//! Configuration for a token manager backed by the issuing endpoint

use serde::Deserialize;

use crate::{
    sources::IssueTokenFetcher, Region, SubscriptionKey, TokenLifecycleManager,
    DEFAULT_RENEW_INTERVAL,
};

/// A token manager that exchanges a subscription key at the issuing endpoint
pub type SpeechAuthClient = TokenLifecycleManager<IssueTokenFetcher>;

/// Settings for a [`SpeechAuthClient`]
#[derive(Debug, Deserialize)]
pub struct SpeechAuthConfig {
    /// The subscription key exchanged for tokens
    pub subscription_key: SubscriptionKey,

    /// The region of the issuing endpoint; the global endpoint is used if absent
    #[serde(default)]
    pub region: Option<Region>,

    /// Whether to renew the token in the background
    #[serde(default)]
    pub autorenew: bool,
}

impl SpeechAuthConfig {
    /// Constructs a configuration for the global endpoint without auto-renew
    pub fn new(subscription_key: SubscriptionKey) -> Self {
        Self {
            subscription_key,
            region: None,
            autorenew: false,
        }
    }

    /// Targets the issuing endpoint of `region`
    pub fn with_region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    /// Enables or disables background renewal
    pub fn with_autorenew(mut self, autorenew: bool) -> Self {
        self.autorenew = autorenew;
        self
    }

    /// Builds the token manager
    ///
    /// When auto-renew is enabled, renewal starts immediately at
    /// [`DEFAULT_RENEW_INTERVAL`], so this must be called from within a tokio runtime.
    pub fn build(self, client: reqwest::Client) -> Result<SpeechAuthClient, url::ParseError> {
        let fetcher = IssueTokenFetcher::new(client, self.subscription_key, self.region)?;
        let manager = TokenLifecycleManager::new(fetcher);

        if self.autorenew {
            manager.start_auto_renew(DEFAULT_RENEW_INTERVAL);
        }

        Ok(manager)
    }
}

#[cfg(test)]
mod tests {
    use httpmock::Method::POST;
    use httpmock::MockServer;

    use super::*;

    #[test]
    fn deserializes_with_defaults() {
        let config: SpeechAuthConfig =
            serde_json::from_str(r#"{ "subscription_key": "0123456789abcdef" }"#).unwrap();

        assert_eq!(config.subscription_key.as_str(), "0123456789abcdef");
        assert_eq!(config.region, None);
        assert!(!config.autorenew);
    }

    #[test]
    fn deserializes_region_and_autorenew() {
        let config: SpeechAuthConfig = serde_json::from_str(
            r#"{ "subscription_key": "key", "region": "westus", "autorenew": true }"#,
        )
        .unwrap();

        assert_eq!(config.region.as_deref().map(|r| r.as_str()), Some("westus"));
        assert!(config.autorenew);
    }

    #[tokio::test]
    async fn autorenew_starts_renewal_on_build() {
        let manager = SpeechAuthConfig::new(SubscriptionKey::from_static("key"))
            .with_autorenew(true)
            .build(reqwest::Client::new())
            .unwrap();

        assert!(manager.is_auto_renewing());
        manager.stop_auto_renew();
    }

    #[tokio::test]
    async fn manager_fetches_through_the_issuing_endpoint() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/sts/v1.0/issueToken")
                    .header("Ocp-Apim-Subscription-Key", "key");
                then.status(200).body("token-abc");
            })
            .await;

        let fetcher = IssueTokenFetcher::new(
            reqwest::Client::new(),
            SubscriptionKey::from_static("key"),
            Some(Region::from_static("westus")),
        )
        .unwrap()
        .with_token_url(server.url("/sts/v1.0/issueToken").parse().unwrap());
        let manager = TokenLifecycleManager::new(fetcher);

        let (a, b) = tokio::join!(manager.token(), manager.token());
        let again = manager.token().await.unwrap();

        assert_eq!(a.unwrap().as_str(), "token-abc");
        assert_eq!(b.unwrap().as_str(), "token-abc");
        assert_eq!(again.as_str(), "token-abc");
        mock.assert_calls_async(1).await;
    }
}
