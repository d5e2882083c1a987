//! AWS Secrets Manager integration.

use aws_sdk_secretsmanager::Client as SecretsClient;
use serde_json::Value;

use crate::{Error, Result};

/// JSON keys accepted when the secret is stored as a key/value object.
const API_KEY_FIELDS: [&str; 2] = ["GEMINI_API_KEY", "api_key"];

/// Get a secret value from Secrets Manager.
pub async fn get_secret(client: &SecretsClient, secret_arn: &str) -> Result<String> {
    let response = client
        .get_secret_value()
        .secret_id(secret_arn)
        .send()
        .await
        .map_err(|e| Error::Aws(format!("Failed to get secret: {}", e)))?;

    let secret_string = response
        .secret_string()
        .ok_or_else(|| Error::Aws("Secret has no string value".to_string()))?
        .to_string();

    Ok(secret_string)
}

/// Extract an API key from a secret string.
///
/// Accepts either the bare key or a JSON object holding it under one of
/// [`API_KEY_FIELDS`].
pub fn parse_api_key(secret_string: &str) -> Result<String> {
    let trimmed = secret_string.trim();

    if trimmed.starts_with('{') {
        let value: Value = serde_json::from_str(trimmed)?;
        return API_KEY_FIELDS
            .iter()
            .find_map(|field| value.get(*field).and_then(Value::as_str))
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| Error::Config("Secret JSON has no API key field".to_string()));
    }

    if trimmed.is_empty() {
        return Err(Error::Config("Secret is empty".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Fetch the Gemini API key stored in Secrets Manager.
pub async fn get_api_key(client: &SecretsClient, secret_arn: &str) -> Result<String> {
    let secret_string = get_secret(client, secret_arn).await?;
    parse_api_key(&secret_string)
}
