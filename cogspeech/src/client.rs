//! The speech recognition client

use std::fmt;

use cogspeech_clock::{Clock, System};
use cogspeech_tokens::{sources::TokenFetcher, TokenError, TokenLifecycleManager};
use reqwest::{header, StatusCode, Url};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use thiserror::Error;
use uuid::Uuid;

use crate::{AccessTokenMiddleware, SpeechOptions, SpeechProperty, SpeechResult};

/// The default recognition endpoint
pub const DEFAULT_ENDPOINT: &str = "https://speech.platform.bing.com/recognize";

const APP_ID: &str = "31b3d95b-af74-4550-9619-de76fe33f0f0";
const DEVICE_OS: &str = "Windows";
const FORMAT: &str = "json";
const API_VERSION: &str = "3.0";

/// An error while attempting to recognize speech
#[derive(Debug, Error)]
pub enum RecognizeError<E> {
    /// Unable to obtain an access token
    #[error("unable to obtain access token")]
    Auth(#[source] TokenError<E>),
    /// Unable to send the recognition request
    #[error("error sending recognition request")]
    Request(#[source] reqwest_middleware::Error),
    /// The recognizer answered with a status other than `200`
    #[error("speech recognizer returned HTTP {status}: {reason}")]
    Http {
        /// The status code
        status: u16,
        /// The status text
        reason: String,
    },
    /// Unable to read the response
    #[error("error reading recognition response body")]
    BodyRead(#[source] reqwest::Error),
    /// Unable to deserialize the recognition result
    #[error("error deserializing recognition result")]
    Body(#[from] serde_json::Error),
    /// The recognizer could not recognize the audio
    #[error("{0}")]
    Recognition(SpeechProperty),
}

impl<E> RecognizeError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from_middleware(error: reqwest_middleware::Error) -> Self {
        match error {
            reqwest_middleware::Error::Middleware(error) => {
                match error.downcast::<TokenError<E>>() {
                    Ok(error) => Self::Auth(error),
                    Err(error) => Self::Request(reqwest_middleware::Error::Middleware(error)),
                }
            }
            error => Self::Request(error),
        }
    }
}

/// A client for the speech recognizer
///
/// Each client identifies itself with a random instance ID, and each request carries
/// a fresh request ID.
pub struct SpeechClient<F: TokenFetcher, C = System> {
    client: ClientWithMiddleware,
    endpoint: Url,
    instance_id: Uuid,
    auth: TokenLifecycleManager<F, C>,
}

impl<F, C> fmt::Debug for SpeechClient<F, C>
where
    F: TokenFetcher + fmt::Debug,
    C: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SpeechClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("instance_id", &self.instance_id)
            .field("auth", &self.auth)
            .finish()
    }
}

impl<F, C> SpeechClient<F, C>
where
    F: TokenFetcher,
    C: Clock + Send + Sync + 'static,
{
    /// Constructs a new client for the recognizer at `endpoint`
    pub fn new(endpoint: Url, auth: TokenLifecycleManager<F, C>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint, auth)
    }

    /// Constructs a new client that sends requests with `client`
    pub fn with_client(
        client: reqwest::Client,
        endpoint: Url,
        auth: TokenLifecycleManager<F, C>,
    ) -> Self {
        let client = ClientBuilder::new(client)
            .with(AccessTokenMiddleware::new(auth.clone()))
            .build();

        Self {
            client,
            endpoint,
            instance_id: Uuid::new_v4(),
            auth,
        }
    }

    /// The token manager used to authorize requests
    pub fn auth(&self) -> &TokenLifecycleManager<F, C> {
        &self.auth
    }

    /// The random ID identifying this client instance
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Recognizes speech in WAV `audio`
    #[tracing::instrument(
        err,
        skip(self, audio),
        fields(
            endpoint = %self.endpoint,
            locale = options.locale(),
            request_id = tracing::field::Empty,
        ),
    )]
    pub async fn recognize(
        &self,
        audio: impl Into<reqwest::Body>,
        options: &SpeechOptions,
    ) -> Result<SpeechResult, RecognizeError<F::Error>> {
        let instance_id = self.instance_id.to_string();
        let request_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("request_id", request_id.as_str());

        let resp = self
            .client
            .post(self.endpoint.clone())
            .query(&[
                ("appid", APP_ID),
                ("device.os", DEVICE_OS),
                ("format", FORMAT),
                ("instanceid", instance_id.as_str()),
                ("version", API_VERSION),
                ("locale", options.locale()),
                ("requestid", request_id.as_str()),
                ("scenarios", options.scenarios()),
            ])
            .header(
                header::CONTENT_TYPE,
                format!("audio/wav; samplerate={}", options.sample_rate()),
            )
            .body(audio)
            .send()
            .await
            .map_err(RecognizeError::from_middleware)?;

        let status = resp.status();
        tracing::debug!(
            response.status = status.as_u16(),
            "received recognition response"
        );

        if status != StatusCode::OK {
            return Err(RecognizeError::Http {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_owned(),
            });
        }

        let body = resp.bytes().await.map_err(RecognizeError::BodyRead)?;
        let speech: SpeechResult = serde_json::from_slice(&body)?;

        if !speech.is_success() {
            return Err(RecognizeError::Recognition(speech.failure_reason()));
        }

        tracing::info!(results = speech.results.len(), "recognized speech");
        Ok(speech)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use async_trait::async_trait;
    use cogspeech_tokens::sources::FetchResponse;
    use httpmock::Method::POST;
    use httpmock::MockServer;
    use serde_json::json;

    use super::*;

    const AUDIO: &[u8] = b"RIFF\x24\x00\x00\x00WAVEfmt ";

    #[derive(Debug, thiserror::Error)]
    #[error("unreachable")]
    struct Unreachable;

    #[derive(Debug)]
    struct FixedFetcher {
        status: u16,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TokenFetcher for FixedFetcher {
        type Error = Unreachable;

        async fn fetch_token(&self) -> Result<FetchResponse, Unreachable> {
            self.calls.fetch_add(1, Ordering::AcqRel);
            Ok(FetchResponse::new(self.status, "tok1"))
        }
    }

    fn client_for(
        server: &MockServer,
        token_status: u16,
    ) -> (SpeechClient<Arc<FixedFetcher>>, Arc<FixedFetcher>) {
        let fetcher = Arc::new(FixedFetcher {
            status: token_status,
            calls: AtomicUsize::new(0),
        });
        let auth = TokenLifecycleManager::new(Arc::clone(&fetcher));
        let endpoint = server.url("/recognize").parse().unwrap();
        (SpeechClient::new(endpoint, auth), fetcher)
    }

    #[tokio::test]
    async fn sends_audio_with_token_and_default_options() {
        let server = MockServer::start_async().await;
        let (client, fetcher) = client_for(&server, 200);
        let instance_id = client.instance_id().to_string();

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/recognize")
                    .query_param("appid", APP_ID)
                    .query_param("device.os", "Windows")
                    .query_param("format", "json")
                    .query_param("instanceid", instance_id.as_str())
                    .query_param("version", "3.0")
                    .query_param("locale", "en-US")
                    .query_param("scenarios", "ulm")
                    .query_param_exists("requestid")
                    .header("authorization", "Bearer tok1")
                    .header("content-type", "audio/wav; samplerate=16000");
                then.status(200).json_body(json!({
                    "version": "3.0",
                    "header": {
                        "status": "success",
                        "name": "hello world",
                        "lexical": "hello world",
                        "properties": { "HIGHCONF": "1" }
                    },
                    "results": [
                        { "name": "hello world", "lexical": "hello world", "confidence": "0.87" }
                    ]
                }));
            })
            .await;

        let speech = client
            .recognize(AUDIO, &SpeechOptions::default())
            .await
            .unwrap();
        client
            .recognize(AUDIO, &SpeechOptions::default())
            .await
            .unwrap();

        mock.assert_calls_async(2).await;
        assert_eq!(speech.best_text(), Some("hello world"));
        assert_eq!(speech.results[0].confidence, Some(0.87));
        assert_eq!(fetcher.calls.load(Ordering::Acquire), 1);
    }

    #[tokio::test]
    async fn explicit_options_are_sent() {
        let server = MockServer::start_async().await;
        let (client, _) = client_for(&server, 200);

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/recognize")
                    .query_param("locale", "fr-FR")
                    .query_param("scenarios", "smd")
                    .header("content-type", "audio/wav; samplerate=8000");
                then.status(200)
                    .json_body(json!({ "version": "3.0", "header": { "status": "success" } }));
            })
            .await;

        let options = SpeechOptions::default()
            .with_locale("fr-FR")
            .with_scenarios("smd")
            .with_sample_rate(8_000);
        let speech = client.recognize(AUDIO, &options).await.unwrap();

        mock.assert_async().await;
        assert!(speech.results.is_empty());
    }

    #[tokio::test]
    async fn token_failures_are_auth_errors() {
        let server = MockServer::start_async().await;
        let (client, _) = client_for(&server, 401);
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/recognize");
                then.status(200);
            })
            .await;

        let error = client
            .recognize(AUDIO, &SpeechOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            RecognizeError::Auth(TokenError::Http { status: 401 })
        ));
        mock.assert_calls_async(0).await;
    }

    #[tokio::test]
    async fn non_success_status_is_an_http_error() {
        let server = MockServer::start_async().await;
        let (client, _) = client_for(&server, 200);
        server
            .mock_async(|when, then| {
                when.method(POST).path("/recognize");
                then.status(403);
            })
            .await;

        let error = client
            .recognize(AUDIO, &SpeechOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(error, RecognizeError::Http { status: 403, .. }));
        assert_eq!(
            error.to_string(),
            "speech recognizer returned HTTP 403: Forbidden"
        );
    }

    #[tokio::test]
    async fn failed_recognition_reports_the_reason() {
        let server = MockServer::start_async().await;
        let (client, _) = client_for(&server, 200);
        server
            .mock_async(|when, then| {
                when.method(POST).path("/recognize");
                then.status(200).json_body(json!({
                    "version": "3.0",
                    "header": {
                        "status": "error",
                        "properties": { "requestid": "abc", "NOSPEECH": "1" }
                    }
                }));
            })
            .await;

        let error = client
            .recognize(AUDIO, &SpeechOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            RecognizeError::Recognition(SpeechProperty::NoSpeech)
        ));
        assert_eq!(error.to_string(), "NOSPEECH");
    }

    #[tokio::test]
    async fn malformed_bodies_are_rejected() {
        let server = MockServer::start_async().await;
        let (client, _) = client_for(&server, 200);
        server
            .mock_async(|when, then| {
                when.method(POST).path("/recognize");
                then.status(200).body("<html>not json</html>");
            })
            .await;

        let error = client
            .recognize(AUDIO, &SpeechOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(error, RecognizeError::Body(_)));
    }

    #[test]
    fn each_client_has_its_own_instance_id() {
        let fetcher = Arc::new(FixedFetcher {
            status: 200,
            calls: AtomicUsize::new(0),
        });
        let auth = TokenLifecycleManager::new(fetcher);
        let endpoint: Url = DEFAULT_ENDPOINT.parse().unwrap();

        let a = SpeechClient::new(endpoint.clone(), auth.clone());
        let b = SpeechClient::new(endpoint, auth);

        assert_ne!(a.instance_id(), b.instance_id());
    }
}
