//! Client configuration from the environment

use crate::speech::{RecognizerConfig, DEFAULT_REPLAY_PACE};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL, without the `/assistant` suffix
    pub api_url: String,
    pub api_token: Option<String>,
    pub timeout: Duration,
    pub recognizer: RecognizerConfig,
    /// JSON-lines speech events used in place of a microphone
    pub speech_replay: Option<PathBuf>,
    /// Delay between replayed speech events
    pub speech_replay_pace: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            recognizer: RecognizerConfig::default(),
            speech_replay: None,
            speech_replay_pace: DEFAULT_REPLAY_PACE,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let timeout = match var("ASSISTANT_TIMEOUT_SECS") {
            Some(value) => match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "ASSISTANT_TIMEOUT_SECS",
                        expected: "a positive number of seconds",
                        value,
                    })
                }
            },
            None => defaults.timeout,
        };

        let speech_replay_pace = match var("ASSISTANT_SPEECH_REPLAY_PACE_MS") {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::Invalid {
                    name: "ASSISTANT_SPEECH_REPLAY_PACE_MS",
                    expected: "a number of milliseconds",
                    value,
                })?,
            None => defaults.speech_replay_pace,
        };

        let continuous = match var("ASSISTANT_SPEECH_CONTINUOUS") {
            Some(value) => parse_flag(&value).ok_or(ConfigError::Invalid {
                name: "ASSISTANT_SPEECH_CONTINUOUS",
                expected: "true or false",
                value,
            })?,
            None => defaults.recognizer.continuous,
        };

        Ok(Self {
            api_url: var("ASSISTANT_API_URL").map_or(defaults.api_url, |url| {
                url.trim_end_matches('/').to_string()
            }),
            api_token: var("ASSISTANT_API_TOKEN"),
            timeout,
            recognizer: RecognizerConfig {
                language: var("ASSISTANT_SPEECH_LANG").unwrap_or(defaults.recognizer.language),
                continuous,
                interim_results: defaults.recognizer.interim_results,
            },
            speech_replay: var("ASSISTANT_SPEECH_REPLAY").map(PathBuf::from),
            speech_replay_pace,
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
