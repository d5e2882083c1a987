//! Configuration management for the skill Lambda.

use std::env;

const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Application configuration loaded from environment variables.
#[derive(Clone, Default)]
pub struct Config {
    /// Gemini API key
    pub gemini_api_key: Option<String>,
    /// ARN of the secret holding the Gemini API key
    pub gemini_api_key_secret_arn: Option<String>,
    /// Gemini model name
    pub gemini_model: String,
    /// Gemini REST base URL (no trailing slash)
    pub gemini_api_base: String,
    /// Expected Alexa skill ID, if requests should be pinned to one skill
    pub alexa_skill_id: Option<String>,
    /// AWS region
    pub aws_region: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Blank values are treated the same as missing ones.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_api_key_secret_arn: get("GEMINI_API_KEY_SECRET_ARN"),
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            gemini_api_base: get("GEMINI_API_BASE")
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            alexa_skill_id: get("ALEXA_SKILL_ID"),
            aws_region: get("AWS_REGION").unwrap_or_else(|| "us-east-1".to_string()),
        }
    }

    /// URL of the generateContent endpoint for the configured model, without the key.
    pub fn gemini_endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.gemini_api_base, self.gemini_model
        )
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "<redacted>"))
            .field("gemini_api_key_secret_arn", &self.gemini_api_key_secret_arn)
            .field("gemini_model", &self.gemini_model)
            .field("gemini_api_base", &self.gemini_api_base)
            .field("alexa_skill_id", &self.alexa_skill_id)
            .field("aws_region", &self.aws_region)
            .finish()
    }
}
