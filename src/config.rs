//! Application configuration and environment variable parsing.
//!
//! This module handles loading configuration settings from the environment (e.g., .env file).
//! It defines the `AppConfig` struct which governs where the tracker lives, how to
//! authenticate, which issues to report on, and where the report artifacts go.

use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::PathBuf;

/// Basic-auth credentials for the tracker, parsed from `user:token`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub token: String,
}

impl Credentials {
    /// Splits on the first `:`; the token itself may contain colons.
    pub fn parse(s: &str) -> Option<Self> {
        let (username, token) = s.split_once(':')?;
        if username.is_empty() {
            return None;
        }
        Some(Self {
            username: username.to_string(),
            token: token.to_string(),
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Application configuration loaded from environment variables.
#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    /// Base URL of the tracker (e.g., "https://example.atlassian.net").
    pub jira_endpoint: String,

    /// Credentials in the form "user:token".
    #[serde(deserialize_with = "deserialize_credentials")]
    pub jira_credentials: Credentials,

    /// Search expression selecting the issues to report on.
    pub jira_jql: String,

    /// Number of issues requested per search page.
    #[serde(default = "default_page_size")]
    pub search_page_size: u32,

    /// Number of change events requested per changelog page.
    #[serde(default = "default_page_size")]
    pub changelog_page_size: u32,

    /// Where the per-issue CSV report is written.
    #[serde(default = "default_output_csv")]
    pub output_csv: PathBuf,

    /// Optional file the hotspot summary is also written to.
    pub hotspots_json: Option<PathBuf>,
}

fn default_page_size() -> u32 {
    10
}

fn default_output_csv() -> PathBuf {
    PathBuf::from("output.csv")
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }
}

fn deserialize_credentials<'de, D>(deserializer: D) -> Result<Credentials, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Credentials::parse(&s)
        .ok_or_else(|| serde::de::Error::custom("expected credentials in the form user:token"))
}
