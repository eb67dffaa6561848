//! Recognition options and results

use std::{collections::HashMap, fmt};

use serde::{de, Deserialize, Deserializer, Serialize};

/// The default recognition locale
pub const DEFAULT_LOCALE: &str = "en-US";

/// The default recognition scenario
pub const DEFAULT_SCENARIOS: &str = "ulm";

/// The default audio sample rate, in Hz
pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;

/// Options for a single recognition request
///
/// Unset options take their defaults: locale `en-US`, scenario `ulm`, and a sample
/// rate of 16 kHz.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechOptions {
    /// The locale of the spoken audio
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    /// The recognition scenario
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenarios: Option<String>,
    /// The sample rate of the audio, in Hz
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
}

impl SpeechOptions {
    /// Sets the locale
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Sets the recognition scenario
    pub fn with_scenarios(mut self, scenarios: impl Into<String>) -> Self {
        self.scenarios = Some(scenarios.into());
        self
    }

    /// Sets the sample rate
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }

    /// The locale, or the default if unset
    pub fn locale(&self) -> &str {
        self.locale.as_deref().unwrap_or(DEFAULT_LOCALE)
    }

    /// The recognition scenario, or the default if unset
    pub fn scenarios(&self) -> &str {
        self.scenarios.as_deref().unwrap_or(DEFAULT_SCENARIOS)
    }

    /// The sample rate, or the default if unset
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE)
    }
}

/// The overall status of a recognition
///
/// Any status other than `success` is treated as an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechStatus {
    /// The audio was recognized
    Success,
    /// Recognition failed
    Error,
}

impl<'de> Deserialize<'de> for SpeechStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let status = String::deserialize(deserializer)?;
        if status == "success" {
            Ok(Self::Success)
        } else {
            Ok(Self::Error)
        }
    }
}

/// A property flag attached to a recognition
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpeechProperty {
    /// Recognition failed for an unspecified reason
    Error,
    /// The audio did not match the expected grammar
    FalseReco,
    /// High confidence result
    HighConf,
    /// Low confidence result
    LowConf,
    /// Medium confidence result
    MidConf,
    /// No speech was detected in the audio
    NoSpeech,
}

impl SpeechProperty {
    /// The property's key as it appears in a result's properties
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::FalseReco => "FALSERECO",
            Self::HighConf => "HIGHCONF",
            Self::LowConf => "LOWCONF",
            Self::MidConf => "MIDCONF",
            Self::NoSpeech => "NOSPEECH",
        }
    }
}

impl fmt::Display for SpeechProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recognition result as returned by the recognizer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeechResult {
    /// The summary of the recognition
    pub header: RecognizedSpeechHeader,
    /// The recognized phrases, most likely first
    #[serde(default)]
    pub results: Vec<RecognizedSpeechResult>,
    /// The API version
    #[serde(default)]
    pub version: String,
}

impl SpeechResult {
    /// Whether the recognizer reported success
    pub fn is_success(&self) -> bool {
        self.header.status == SpeechStatus::Success
    }

    /// The most specific reason for a failed recognition
    ///
    /// `NOSPEECH` takes precedence over `FALSERECO`; anything else is `ERROR`.
    pub fn failure_reason(&self) -> SpeechProperty {
        let properties = &self.header.properties;
        if properties.contains_key(SpeechProperty::NoSpeech.as_str()) {
            SpeechProperty::NoSpeech
        } else if properties.contains_key(SpeechProperty::FalseReco.as_str()) {
            SpeechProperty::FalseReco
        } else {
            SpeechProperty::Error
        }
    }

    /// The text of the best recognized phrase, if any
    pub fn best_text(&self) -> Option<&str> {
        self.results.first().map(|r| r.name.as_str())
    }
}

/// The summary section of a recognition result
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecognizedSpeechHeader {
    /// The recognition status
    pub status: SpeechStatus,
    /// The display form of the best phrase
    #[serde(default)]
    pub name: String,
    /// The lexical form of the best phrase
    #[serde(default)]
    pub lexical: String,
    /// Property flags for the recognition
    #[serde(default)]
    pub properties: HashMap<String, String>,
    /// The recognition scenario
    #[serde(default)]
    pub scenario: String,
}

/// A single recognized phrase
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecognizedSpeechResult {
    /// The display form of the phrase
    #[serde(default)]
    pub name: String,
    /// The lexical form of the phrase
    #[serde(default)]
    pub lexical: String,
    /// The confidence of the phrase, between 0 and 1
    #[serde(
        default,
        deserialize_with = "number_or_numeric_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub confidence: Option<f64>,
    /// Property flags for the phrase
    #[serde(default)]
    pub properties: HashMap<String, String>,
    /// The recognition scenario
    #[serde(default)]
    pub scenario: String,
}

// The recognizer reports confidence as a string, such as "0.9196"
fn number_or_numeric_string<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Confidence {
        Number(f64),
        Text(String),
    }

    match Option::<Confidence>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Confidence::Number(n)) => Ok(Some(n)),
        Some(Confidence::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Confidence::Text(s)) => s.trim().parse().map(Some).map_err(de::Error::custom),
    }
}
