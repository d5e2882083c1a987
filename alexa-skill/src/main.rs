//! Alexa Skill Lambda - Answers free-form voice questions with Gemini.
//!
//! This Lambda receives signed Alexa webhook calls through a function URL,
//! verifies the signature over the raw body, dispatches on the request
//! type and relays free-form questions to the Gemini API.

mod handler;
mod intents;
mod request;
mod response;
mod verifier;

use std::sync::Arc;

use lambda_http::{run, service_fn, Error};
use shared::{Config, GeminiClient};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::handler::Skill;
use crate::verifier::AlexaRequestVerifier;

impl Skill {
    async fn from_env() -> Result<Self, Error> {
        let mut config = Config::from_env();
        info!("Loaded configuration: {:?}", config);

        if config.gemini_api_key.is_none() {
            if let Some(secret_arn) = config.gemini_api_key_secret_arn.clone() {
                config.gemini_api_key = load_api_key(&config, &secret_arn).await;
            }
        }

        if config.gemini_api_key.is_none() {
            warn!("GEMINI_API_KEY not configured; free-form questions will get the fallback reply");
        }

        let http_client = reqwest::Client::new();

        Ok(Self::new(
            Arc::new(AlexaRequestVerifier::new(http_client.clone())),
            Arc::new(GeminiClient::from_config(http_client, &config)),
            config.alexa_skill_id.clone(),
        ))
    }
}

/// Fetch the API key from Secrets Manager, leaving it unset on failure.
async fn load_api_key(config: &Config, secret_arn: &str) -> Option<String> {
    let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(config.aws_region.clone()))
        .load()
        .await;
    let secrets_client = aws_sdk_secretsmanager::Client::new(&aws_config);

    match shared::get_api_key(&secrets_client, secret_arn).await {
        Ok(key) => Some(key),
        Err(e) => {
            warn!("Failed to load Gemini API key from secret: {}", e);
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let skill = Arc::new(Skill::from_env().await?);

    run(service_fn(move |event| {
        let skill = Arc::clone(&skill);
        async move { skill.handle(event).await }
    }))
    .await
}
