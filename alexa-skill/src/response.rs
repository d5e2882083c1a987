//! Alexa response envelope.

use serde::Serialize;

const RESPONSE_VERSION: &str = "1.0";

/// Alexa rejects speech longer than 8000 characters.
pub const MAX_SPEECH_CHARS: usize = 7900;

const TRUNCATION_NOTE: &str = "... Response truncated.";

#[derive(Debug, Serialize)]
pub struct AlexaResponse {
    pub version: String,
    pub response: AlexaResponseBody,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlexaResponseBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_speech: Option<OutputSpeech>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reprompt: Option<Reprompt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub should_end_session: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct OutputSpeech {
    #[serde(rename = "type")]
    pub speech_type: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reprompt {
    pub output_speech: OutputSpeech,
}

impl OutputSpeech {
    fn plain(text: &str) -> Self {
        Self {
            speech_type: "PlainText".to_string(),
            text: truncate_speech(text),
        }
    }
}

impl AlexaResponse {
    /// Speak and keep the session open, with a reprompt.
    pub fn ask(speech: &str, reprompt: &str) -> Self {
        Self::with_body(AlexaResponseBody {
            output_speech: Some(OutputSpeech::plain(speech)),
            reprompt: Some(Reprompt {
                output_speech: OutputSpeech::plain(reprompt),
            }),
            should_end_session: Some(false),
        })
    }

    /// Speak and end the session.
    pub fn tell(speech: &str) -> Self {
        Self::with_body(AlexaResponseBody {
            output_speech: Some(OutputSpeech::plain(speech)),
            reprompt: None,
            should_end_session: Some(true),
        })
    }

    /// Bare acknowledgement, used for `SessionEndedRequest`.
    pub fn empty() -> Self {
        Self::with_body(AlexaResponseBody::default())
    }

    fn with_body(response: AlexaResponseBody) -> Self {
        Self {
            version: RESPONSE_VERSION.to_string(),
            response,
        }
    }

    /// Spoken text, if any.
    pub fn speech(&self) -> Option<&str> {
        self.response.output_speech.as_ref().map(|s| s.text.as_str())
    }
}

fn truncate_speech(text: &str) -> String {
    truncate_speech_to(text, MAX_SPEECH_CHARS)
}

/// Cap speech at `limit` chars, note included, cutting on a char boundary.
pub fn truncate_speech_to(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }

    let keep = limit.saturating_sub(TRUNCATION_NOTE.len());
    let cut = text
        .char_indices()
        .nth(keep)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    format!("{}{}", &text[..cut], TRUNCATION_NOTE)
}
