//! Configuration types for artifact-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Browser-like user agent; many publisher sites refuse obvious bot agents
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Top-level downloader configuration
///
/// Every field has a default, so `Config::default()` downloads PDFs with five
/// concurrent transfers, three attempts per URL and a 30 second request timeout.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Maximum number of transfers in flight at once (default: 5)
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Total timeout for a single GET, including reading the body (default: 30 seconds)
    #[serde(default = "default_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Accept-Language header sent with every request (default: "en-US,en;q=0.5")
    #[serde(default = "default_accept_language")]
    pub accept_language: String,

    /// Size of the blocking write pool (default: 0 = same as `max_concurrency`)
    #[serde(default)]
    pub write_workers: usize,

    /// Retry behavior for transient failures
    #[serde(default)]
    pub retry: RetryConfig,

    /// The artifact type every download must match
    #[serde(default)]
    pub artifact: ArtifactConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            timeout: default_timeout(),
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
            write_workers: 0,
            retry: RetryConfig::default(),
            artifact: ArtifactConfig::default(),
        }
    }
}

impl Config {
    /// Load a configuration from JSON, filling absent fields with defaults
    ///
    /// The result is validated before it is returned.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values that would make a batch impossible to run
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(Error::config(
                "max_concurrency",
                "max_concurrency must be greater than zero",
            ));
        }
        if self.timeout.is_zero() {
            return Err(Error::config("timeout", "timeout must be greater than zero"));
        }
        self.retry.validate()?;
        self.artifact.validate()
    }

    /// Effective size of the blocking write pool
    pub fn effective_write_workers(&self) -> usize {
        if self.write_workers == 0 {
            self.max_concurrency
        } else {
            self.write_workers
        }
    }
}

/// Retry configuration for transient failures
///
/// The delay after the zero-based attempt `n` is
/// `min(initial_delay * backoff_multiplier^n, max_delay)`, which with the
/// defaults is `min(2^n, 32)` seconds.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total number of attempts per URL, including the first (default: 3)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay after the first failed attempt (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Ceiling for any single backoff delay (default: 32 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
        }
    }
}

impl RetryConfig {
    fn validate(&self) -> Result<()> {
        if self.max_retries == 0 {
            return Err(Error::config(
                "retry.max_retries",
                "max_retries must allow at least one attempt",
            ));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(Error::config(
                "retry.backoff_multiplier",
                "backoff_multiplier must be a finite value of at least 1.0",
            ));
        }
        if self.initial_delay > self.max_delay {
            return Err(Error::config(
                "retry.initial_delay",
                "initial_delay must not exceed max_delay",
            ));
        }
        Ok(())
    }
}

/// Description of the artifact type a batch accepts
///
/// A response is accepted only when its `Content-Type` names one of
/// `media_types` and its body starts with `signature`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Acceptable media types; also sent as the `Accept` header
    #[serde(default = "default_media_types")]
    pub media_types: Vec<String>,

    /// Leading magic bytes of a valid body
    #[serde(default = "default_signature")]
    pub signature: Vec<u8>,

    /// File extension forced onto every written file, without the dot
    #[serde(default = "default_extension")]
    pub extension: String,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self::pdf()
    }
}

impl ArtifactConfig {
    /// PDF documents: `application/pdf`, `%PDF`, `.pdf`
    pub fn pdf() -> Self {
        Self {
            media_types: default_media_types(),
            signature: default_signature(),
            extension: default_extension(),
        }
    }

    /// Any other artifact type
    pub fn new(
        media_types: impl IntoIterator<Item = impl Into<String>>,
        signature: impl Into<Vec<u8>>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            media_types: media_types.into_iter().map(Into::into).collect(),
            signature: signature.into(),
            extension: extension.into(),
        }
    }

    /// Value of the `Accept` request header
    pub fn accept_header(&self) -> String {
        self.media_types.join(",")
    }

    fn validate(&self) -> Result<()> {
        if self.media_types.iter().all(|m| m.trim().is_empty()) {
            return Err(Error::config(
                "artifact.media_types",
                "at least one media type is required",
            ));
        }
        if self.signature.is_empty() {
            return Err(Error::config(
                "artifact.signature",
                "signature must contain at least one byte",
            ));
        }
        if self.extension.is_empty()
            || self.extension.contains('.')
            || self.extension.contains(['/', '\\'])
        {
            return Err(Error::config(
                "artifact.extension",
                "extension must be a bare name such as \"pdf\"",
            ));
        }
        Ok(())
    }
}

fn default_max_concurrency() -> usize {
    5
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_accept_language() -> String {
    "en-US,en;q=0.5".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(32)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_media_types() -> Vec<String> {
    vec!["application/pdf".to_string(), "application/x-pdf".to_string()]
}

fn default_signature() -> Vec<u8> {
    b"%PDF".to_vec()
}

fn default_extension() -> String {
    "pdf".to_string()
}

// Duration serialization helper (seconds; fractional below one second)
mod duration_serde {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_nanos() == 0 {
            serializer.serialize_u64(duration.as_secs())
        } else {
            serializer.serialize_f64(duration.as_secs_f64())
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(D::Error::custom(format!(
                "invalid duration {secs}: expected a non-negative number of seconds"
            )));
        }

        // Rounded to whole nanoseconds so values like 0.3 come back exact
        let nanos = (secs * 1e9).round();
        if nanos >= u64::MAX as f64 {
            return Err(D::Error::custom(format!("duration {secs}s is too large")));
        }
        Ok(Duration::from_nanos(nanos as u64))
    }
}
