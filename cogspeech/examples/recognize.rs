use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use cogspeech::{SpeechClient, SpeechOptions, DEFAULT_ENDPOINT};
use cogspeech_tokens::{Region, SpeechAuthConfig, SubscriptionKey};
use tokio::task::JoinSet;

#[derive(Debug, Parser)]
struct Opts {
    /// The subscription key exchanged for access tokens
    #[arg(short = 'k', long, env, hide_env_values = true)]
    subscription_key: SubscriptionKey,

    /// The region of the token issuing endpoint
    #[arg(short, long, env)]
    region: Option<Region>,

    /// The recognizer endpoint
    #[arg(short, long, env, default_value = DEFAULT_ENDPOINT)]
    endpoint: reqwest::Url,

    /// The locale of the spoken audio
    #[arg(short, long, env)]
    locale: Option<String>,

    /// The sample rate of the audio, in Hz
    #[arg(short, long, env)]
    sample_rate: Option<u32>,

    /// Keep the token fresh in the background
    #[arg(long, env)]
    autorenew: bool,

    /// WAV files to recognize
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    dotenvy::dotenv().ok();
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .pretty()
        .with_env_filter(tracing_subscriber::filter::EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();

    let mut config = SpeechAuthConfig::new(opts.subscription_key).with_autorenew(opts.autorenew);
    if let Some(region) = opts.region {
        config = config.with_region(region);
    }

    let http = reqwest::Client::builder().https_only(true).build()?;
    let auth = config.build(http.clone())?;
    let client = Arc::new(SpeechClient::with_client(http, opts.endpoint, auth));

    let options = Arc::new(SpeechOptions {
        locale: opts.locale,
        sample_rate: opts.sample_rate,
        ..SpeechOptions::default()
    });

    // All files are recognized concurrently, sharing a single token
    let mut tasks = JoinSet::new();
    for path in opts.files {
        let client = Arc::clone(&client);
        let options = Arc::clone(&options);
        tasks.spawn(async move {
            let audio = tokio::fs::read(&path).await?;
            let speech = client.recognize(audio, &options).await?;
            color_eyre::Result::<_>::Ok((path, speech))
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined? {
            Ok((path, speech)) => {
                tracing::info!(
                    file = %path.display(),
                    text = speech.best_text().unwrap_or_default(),
                    confidence = speech.results.first().and_then(|r| r.confidence),
                    "recognized"
                );
                println!("{}", serde_json::to_string_pretty(&speech)?);
            }
            Err(error) => {
                tracing::error!(error = %error, "recognition failed");
            }
        }
    }

    Ok(())
}
