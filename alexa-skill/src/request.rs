//! Inbound Alexa request envelope.
//!
//! Only the fields the skill reads are modeled, and all of them are
//! optional so that a sparse or unexpected payload still deserializes.

use std::collections::HashMap;

use serde::Deserialize;

/// Slot carrying the free-form question text.
pub const QUERY_SLOT: &str = "query";

/// Top-level Alexa request.
#[derive(Debug, Default, Deserialize)]
pub struct AlexaRequest {
    #[serde(default)]
    pub session: Option<Session>,
    #[serde(default)]
    pub context: Option<Context>,
    #[serde(default)]
    pub request: RequestBody,
}

#[derive(Debug, Default, Deserialize)]
pub struct Session {
    pub application: Option<Application>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Context {
    #[serde(rename = "System")]
    pub system: Option<SystemState>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SystemState {
    pub application: Option<Application>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub application_id: Option<String>,
}

/// The `request` object of the envelope.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBody {
    #[serde(rename = "type", default)]
    pub request_type: String,
    pub request_id: Option<String>,
    pub timestamp: Option<String>,
    pub locale: Option<String>,
    pub intent: Option<Intent>,
    /// Set on `SessionEndedRequest`
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Intent {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slots: HashMap<String, Slot>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Slot {
    pub value: Option<String>,
}

/// Request types the skill branches on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestKind {
    Launch,
    Intent,
    SessionEnded,
    Other(String),
}

impl AlexaRequest {
    pub fn kind(&self) -> RequestKind {
        match self.request.request_type.as_str() {
            "LaunchRequest" => RequestKind::Launch,
            "IntentRequest" => RequestKind::Intent,
            "SessionEndedRequest" => RequestKind::SessionEnded,
            other => RequestKind::Other(other.to_string()),
        }
    }

    /// Intent name, or an empty string when there is no intent.
    pub fn intent_name(&self) -> &str {
        self.request
            .intent
            .as_ref()
            .map(|i| i.name.as_str())
            .unwrap_or("")
    }

    /// Value of the named slot, if the user filled it.
    pub fn slot_value(&self, slot: &str) -> Option<&str> {
        self.request
            .intent
            .as_ref()?
            .slots
            .get(slot)?
            .value
            .as_deref()
    }

    /// Skill ID the request was addressed to.
    pub fn application_id(&self) -> Option<&str> {
        let from_context = self
            .context
            .as_ref()
            .and_then(|c| c.system.as_ref())
            .and_then(|s| s.application.as_ref())
            .and_then(|a| a.application_id.as_deref());

        from_context.or_else(|| {
            self.session
                .as_ref()
                .and_then(|s| s.application.as_ref())
                .and_then(|a| a.application_id.as_deref())
        })
    }
}
