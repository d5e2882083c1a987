//! Alexa request signature verification.
//!
//! Every request Alexa sends carries a base64 RSA signature over the exact
//! body bytes and the URL of the signing certificate chain. A request is
//! authentic only when:
//!
//! 1. the chain URL points at Amazon's `echo.api` bucket over HTTPS,
//! 2. the leaf certificate chains to a trusted root, is currently valid
//!    and names `echo-api.amazon.com`,
//! 3. the signature verifies against the leaf's public key, and
//! 4. `request.timestamp` is no more than 150 seconds from now.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use rustls_pki_types::{CertificateDer, ServerName, TrustAnchor, UnixTime};
use shared::{Error, Result};
use tracing::info;
use url::Url;
use webpki::{EndEntityCert, KeyUsage};

use crate::request::AlexaRequest;

const CERT_HOST: &str = "s3.amazonaws.com";
const CERT_PATH_PREFIX: &str = "/echo.api/";
const CERT_SUBJECT_NAME: &str = "echo-api.amazon.com";
const TIMESTAMP_TOLERANCE_SECS: i64 = 150;

/// Checks that a raw request body was signed by the voice platform.
///
/// Every failure is reported as [`Error::Verification`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SignatureVerifier: Send + Sync {
    /// Verify `body` against the signature and certificate-chain URL headers.
    async fn verify(&self, signature: &str, cert_chain_url: &str, body: &[u8]) -> Result<()>;
}

/// Production verifier that fetches and validates Amazon's signing certificate.
pub struct AlexaRequestVerifier {
    http_client: reqwest::Client,
    trust_anchors: Vec<TrustAnchor<'static>>,
}

impl AlexaRequestVerifier {
    /// Verifier trusting the Mozilla root set.
    pub fn new(http_client: reqwest::Client) -> Self {
        Self::with_trust_anchors(http_client, webpki_roots::TLS_SERVER_ROOTS.to_vec())
    }

    pub fn with_trust_anchors(
        http_client: reqwest::Client,
        trust_anchors: Vec<TrustAnchor<'static>>,
    ) -> Self {
        Self {
            http_client,
            trust_anchors,
        }
    }

    async fn check(&self, signature: &str, cert_chain_url: &str, body: &[u8]) -> Result<()> {
        let url = validate_cert_url(cert_chain_url)?;
        check_request_timestamp(body, Utc::now())?;

        let signature = BASE64
            .decode(signature.trim())
            .map_err(|e| Error::Verification(format!("Signature is not base64: {}", e)))?;

        let chain = self.fetch_chain(&url).await?;
        verify_chain_and_signature(
            &chain,
            &self.trust_anchors,
            UnixTime::now(),
            &signature,
            body,
        )
    }

    async fn fetch_chain(&self, url: &Url) -> Result<Vec<CertificateDer<'static>>> {
        let response = self.http_client.get(url.clone()).send().await?;

        if !response.status().is_success() {
            return Err(Error::Verification(format!(
                "Certificate download returned {}",
                response.status()
            )));
        }

        let pem = response.bytes().await?;
        parse_pem_chain(&pem)
    }
}

#[async_trait]
impl SignatureVerifier for AlexaRequestVerifier {
    async fn verify(&self, signature: &str, cert_chain_url: &str, body: &[u8]) -> Result<()> {
        self.check(signature, cert_chain_url, body)
            .await
            .map_err(into_verification_error)?;

        info!("Request signature verified");
        Ok(())
    }
}

/// Fold transport and parsing failures into a verification failure.
fn into_verification_error(error: Error) -> Error {
    match error {
        Error::Verification(_) => error,
        other => Error::Verification(other.to_string()),
    }
}

/// Validate the certificate chain URL and return it normalized.
pub fn validate_cert_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| Error::Verification(format!("Invalid certificate URL: {}", e)))?;

    // Url lowercases scheme and host and resolves dot segments.
    if url.scheme() != "https" {
        return Err(Error::Verification("Certificate URL must use https".to_string()));
    }
    if url.host_str() != Some(CERT_HOST) {
        return Err(Error::Verification(format!(
            "Certificate URL host must be {}",
            CERT_HOST
        )));
    }
    if url.port_or_known_default() != Some(443) {
        return Err(Error::Verification("Certificate URL port must be 443".to_string()));
    }
    if !url.path().starts_with(CERT_PATH_PREFIX) {
        return Err(Error::Verification(format!(
            "Certificate URL path must start with {}",
            CERT_PATH_PREFIX
        )));
    }

    Ok(url)
}

/// Reject requests whose timestamp is missing or outside the tolerance window.
pub fn check_request_timestamp(body: &[u8], now: DateTime<Utc>) -> Result<()> {
    let request: AlexaRequest = serde_json::from_slice(body)
        .map_err(|e| Error::Verification(format!("Body is not a voice request: {}", e)))?;

    let timestamp = request
        .request
        .timestamp
        .as_deref()
        .ok_or_else(|| Error::Verification("Request timestamp missing".to_string()))?;

    let sent_at = DateTime::parse_from_rfc3339(timestamp)
        .map_err(|e| Error::Verification(format!("Invalid request timestamp: {}", e)))?
        .with_timezone(&Utc);

    if (now - sent_at).num_seconds().abs() > TIMESTAMP_TOLERANCE_SECS {
        return Err(Error::Verification(format!(
            "Request timestamp {} outside tolerance",
            timestamp
        )));
    }

    Ok(())
}

/// Parse every certificate in a PEM bundle, leaf first.
pub fn parse_pem_chain(pem: &[u8]) -> Result<Vec<CertificateDer<'static>>> {
    let mut reader = pem;
    let chain = rustls_pemfile::certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::Verification(format!("Invalid certificate PEM: {}", e)))?;

    if chain.is_empty() {
        return Err(Error::Verification("Certificate chain is empty".to_string()));
    }

    Ok(chain)
}

fn verify_chain_and_signature(
    chain: &[CertificateDer<'static>],
    trust_anchors: &[TrustAnchor<'static>],
    now: UnixTime,
    signature: &[u8],
    body: &[u8],
) -> Result<()> {
    let (leaf, intermediates) = chain
        .split_first()
        .ok_or_else(|| Error::Verification("Certificate chain is empty".to_string()))?;

    let cert = EndEntityCert::try_from(leaf)
        .map_err(|e| Error::Verification(format!("Invalid signing certificate: {}", e)))?;

    cert.verify_for_usage(
        webpki::ALL_VERIFICATION_ALGS,
        trust_anchors,
        intermediates,
        now,
        KeyUsage::server_auth(),
        None,
        None,
    )
    .map_err(|e| Error::Verification(format!("Untrusted certificate chain: {}", e)))?;

    let subject = ServerName::try_from(CERT_SUBJECT_NAME)
        .map_err(|e| Error::Internal(format!("Invalid subject name: {}", e)))?;
    cert.verify_is_valid_for_subject_name(&subject)
        .map_err(|e| Error::Verification(format!("Certificate subject mismatch: {}", e)))?;

    cert.verify_signature(webpki::ring::RSA_PKCS1_2048_8192_SHA256, body, signature)
        .map_err(|e| Error::Verification(format!("Signature mismatch: {}", e)))?;

    Ok(())
}
