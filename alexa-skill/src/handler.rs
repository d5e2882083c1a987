//! Webhook entry point: verify, parse, dispatch.

use std::sync::Arc;

use lambda_http::http::{HeaderMap, Method};
use lambda_http::{Body, Error, Request, Response};
use shared::http::{json_response, text_response};
use shared::QueryClient;
use tracing::{error, info, warn};

use crate::intents::dispatch_intent;
use crate::request::{AlexaRequest, RequestKind, QUERY_SLOT};
use crate::response::AlexaResponse;
use crate::verifier::SignatureVerifier;

pub const HEALTH_MESSAGE: &str = "GET request successful. Endpoint is online.";
pub const VERIFICATION_FAILED: &str = "Request verification failed.";
pub const METHOD_NOT_ALLOWED: &str = "Method not allowed.";

pub const WELCOME: &str = "Welcome to Gemini. What would you like to ask?";
pub const WELCOME_REPROMPT: &str = "Ask me any question.";
pub const UNKNOWN_REQUEST: &str = "Sorry, I don't understand that request.";
pub const INTERNAL_ERROR: &str = "Sorry, something went wrong. Please try again later.";

/// Alexa signs with SHA-256 under this header and SHA-1 under `signature`.
/// Only the SHA-256 signature is accepted.
const SIGNATURE_256_HEADER: &str = "signature-256";
const LEGACY_SIGNATURE_HEADER: &str = "signature";
const CERT_CHAIN_HEADER: &str = "signaturecertchainurl";

/// The skill and its collaborators, built once per cold start.
pub struct Skill {
    verifier: Arc<dyn SignatureVerifier>,
    query_client: Arc<dyn QueryClient>,
    skill_id: Option<String>,
}

impl Skill {
    pub fn new(
        verifier: Arc<dyn SignatureVerifier>,
        query_client: Arc<dyn QueryClient>,
        skill_id: Option<String>,
    ) -> Self {
        Self {
            verifier,
            query_client,
            skill_id,
        }
    }

    /// Handle one webhook call.
    pub async fn handle(&self, event: Request) -> Result<Response<Body>, Error> {
        info!("Function started for a {} request", event.method());

        match *event.method() {
            Method::GET => text_response(200, HEALTH_MESSAGE),
            Method::POST => {
                // Copy the bytes untouched; the signature covers exactly these.
                let raw_body = event.body().as_ref().to_vec();
                self.handle_post(event.headers(), &raw_body).await
            }
            _ => text_response(405, METHOD_NOT_ALLOWED),
        }
    }

    async fn handle_post(
        &self,
        headers: &HeaderMap,
        raw_body: &[u8],
    ) -> Result<Response<Body>, Error> {
        info!("Read {} byte request body", raw_body.len());

        let (signature, cert_chain_url) = match signature_headers(headers) {
            Ok(pair) => pair,
            Err(reason) => {
                warn!("Request verification failed: {}", reason);
                return text_response(400, VERIFICATION_FAILED);
            }
        };

        if let Err(e) = self.verifier.verify(signature, cert_chain_url, raw_body).await {
            warn!("Request verification failed: {}", e);
            return text_response(e.status_code(), VERIFICATION_FAILED);
        }

        let request: AlexaRequest = match serde_json::from_slice(raw_body) {
            Ok(request) => request,
            Err(e) => {
                error!("Failed to parse request body: {}", e);
                return json_response(200, &AlexaResponse::tell(INTERNAL_ERROR));
            }
        };

        if !self.skill_id_matches(&request) {
            warn!(
                "Request for skill {:?} rejected",
                request.application_id().unwrap_or("<none>")
            );
            return text_response(400, VERIFICATION_FAILED);
        }

        let reply = self.dispatch(&request).await;
        info!("Replying: {}", reply.speech().unwrap_or("<no speech>"));
        json_response(200, &reply)
    }

    fn skill_id_matches(&self, request: &AlexaRequest) -> bool {
        match &self.skill_id {
            Some(expected) => request.application_id() == Some(expected.as_str()),
            None => true,
        }
    }

    async fn dispatch(&self, request: &AlexaRequest) -> AlexaResponse {
        info!(
            "Request type is {} (id {}, locale {})",
            request.request.request_type,
            request.request.request_id.as_deref().unwrap_or("-"),
            request.request.locale.as_deref().unwrap_or("-")
        );

        match request.kind() {
            RequestKind::Launch => AlexaResponse::ask(WELCOME, WELCOME_REPROMPT),
            RequestKind::Intent => {
                let intent_name = request.intent_name();
                info!("Dispatching intent {}", intent_name);
                dispatch_intent(
                    self.query_client.as_ref(),
                    intent_name,
                    request.slot_value(QUERY_SLOT),
                )
                .await
            }
            RequestKind::SessionEnded => {
                info!(
                    "Session ended: {}",
                    request.request.reason.as_deref().unwrap_or("unknown reason")
                );
                AlexaResponse::empty()
            }
            RequestKind::Other(kind) => {
                warn!("Unsupported request type '{}'", kind);
                AlexaResponse::tell(UNKNOWN_REQUEST)
            }
        }
    }
}

/// Pull the SHA-256 signature and certificate URL out of the headers.
fn signature_headers(headers: &HeaderMap) -> Result<(&str, &str), &'static str> {
    let signature = match header_value(headers, SIGNATURE_256_HEADER) {
        Some(signature) => signature,
        None if header_value(headers, LEGACY_SIGNATURE_HEADER).is_some() => {
            return Err("only the legacy SHA-1 signature header is present; signature-256 is required")
        }
        None => return Err("missing signature-256 header"),
    };
    let cert_chain_url =
        header_value(headers, CERT_CHAIN_HEADER).ok_or("missing signaturecertchainurl header")?;
    Ok((signature, cert_chain_url))
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
