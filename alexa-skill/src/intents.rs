//! Intent routing.

use shared::QueryClient;
use tracing::{error, info};

use crate::response::{truncate_speech_to, AlexaResponse, MAX_SPEECH_CHARS};

pub const STOP_INTENT: &str = "AMAZON.StopIntent";
pub const CANCEL_INTENT: &str = "AMAZON.CancelIntent";
pub const HELP_INTENT: &str = "AMAZON.HelpIntent";
pub const FREEFORM_INTENT: &str = "FreeformQuery";

pub const GOODBYE: &str = "Goodbye!";
pub const FOLLOW_UP: &str = "What else would you like to know?";
pub const ASK_PROMPT: &str = "What would you like to ask?";
pub const UPSTREAM_APOLOGY: &str =
    "Sorry, I couldn't get an answer from Gemini right now. Please try again.";
pub const UPSTREAM_REPROMPT: &str = "You can ask me something else, or try that question again.";
pub const HELP_SPEECH: &str =
    "You can ask me anything, like: what is the tallest mountain in the world? What would you like to ask?";
pub const UNKNOWN_INTENT: &str = "I'm not sure how to handle that. Try asking me a question.";

/// Route an intent to its reply.
///
/// Upstream failures are turned into a spoken apology here and never
/// propagate to the caller.
pub async fn dispatch_intent(
    client: &dyn QueryClient,
    intent_name: &str,
    slot_value: Option<&str>,
) -> AlexaResponse {
    match intent_name {
        STOP_INTENT | CANCEL_INTENT => AlexaResponse::tell(GOODBYE),
        HELP_INTENT => AlexaResponse::ask(HELP_SPEECH, ASK_PROMPT),
        FREEFORM_INTENT => answer_query(client, slot_value).await,
        other => {
            info!("Unhandled intent '{}'", other);
            AlexaResponse::ask(UNKNOWN_INTENT, ASK_PROMPT)
        }
    }
}

async fn answer_query(client: &dyn QueryClient, slot_value: Option<&str>) -> AlexaResponse {
    let prompt = match slot_value.map(str::trim).filter(|q| !q.is_empty()) {
        Some(q) => q,
        None => return AlexaResponse::ask(ASK_PROMPT, ASK_PROMPT),
    };

    match client.query(prompt).await {
        Ok(answer) => {
            // Leave room for the follow-up so a long answer never cuts it off.
            let answer = truncate_speech_to(&answer, MAX_SPEECH_CHARS - FOLLOW_UP.len() - 1);
            AlexaResponse::ask(&format!("{} {}", answer, FOLLOW_UP), FOLLOW_UP)
        }
        Err(e) => {
            error!("Gemini query failed: {}", e);
            AlexaResponse::ask(UPSTREAM_APOLOGY, UPSTREAM_REPROMPT)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Error, MockQueryClient};

    fn reprompt_text(response: &AlexaResponse) -> Option<&str> {
        response
            .response
            .reprompt
            .as_ref()
            .map(|r| r.output_speech.text.as_str())
    }

    #[tokio::test]
    async fn test_stop_and_cancel_end_session() {
        let mut client = MockQueryClient::new();
        client.expect_query().never();

        for intent in [STOP_INTENT, CANCEL_INTENT] {
            let response = dispatch_intent(&client, intent, None).await;
            assert_eq!(response.speech(), Some(GOODBYE));
            assert_eq!(response.response.should_end_session, Some(true));
            assert!(response.response.reprompt.is_none());
        }
    }

    #[tokio::test]
    async fn test_freeform_success_appends_follow_up() {
        let mut client = MockQueryClient::new();
        client
            .expect_query()
            .withf(|prompt: &str| prompt == "meaning of life")
            .times(1)
            .returning(|_| Ok("42".to_string()));

        let response = dispatch_intent(&client, FREEFORM_INTENT, Some("  meaning of life ")).await;

        assert_eq!(response.speech(), Some("42 What else would you like to know?"));
        assert_eq!(response.response.should_end_session, Some(false));
        assert_eq!(reprompt_text(&response), Some(FOLLOW_UP));
    }

    #[tokio::test]
    async fn test_long_answer_keeps_follow_up() {
        let mut client = MockQueryClient::new();
        client
            .expect_query()
            .times(1)
            .returning(|_| Ok("a".repeat(8000)));

        let response = dispatch_intent(&client, FREEFORM_INTENT, Some("q")).await;
        let speech = response.speech().unwrap();

        assert!(speech.ends_with(FOLLOW_UP), "follow-up missing from long answer");
        assert!(speech.contains("... Response truncated."));
        assert!(speech.chars().count() <= MAX_SPEECH_CHARS);
    }

    #[tokio::test]
    async fn test_freeform_failure_apologizes() {
        let mut client = MockQueryClient::new();
        client
            .expect_query()
            .times(1)
            .returning(|_| Err(Error::Upstream("Gemini returned 503".to_string())));

        let response = dispatch_intent(&client, FREEFORM_INTENT, Some("anything")).await;

        assert_eq!(response.speech(), Some(UPSTREAM_APOLOGY));
        assert_eq!(response.response.should_end_session, Some(false));
        assert_eq!(reprompt_text(&response), Some(UPSTREAM_REPROMPT));
        assert_ne!(UPSTREAM_REPROMPT, FOLLOW_UP);
    }

    #[tokio::test]
    async fn test_freeform_without_query_reprompts() {
        let mut client = MockQueryClient::new();
        client.expect_query().never();

        for slot in [None, Some(""), Some("   ")] {
            let response = dispatch_intent(&client, FREEFORM_INTENT, slot).await;
            assert_eq!(response.speech(), Some(ASK_PROMPT));
            assert_eq!(response.response.should_end_session, Some(false));
        }
    }

    #[tokio::test]
    async fn test_help_and_unknown_keep_session_open() {
        let mut client = MockQueryClient::new();
        client.expect_query().never();

        let help = dispatch_intent(&client, HELP_INTENT, None).await;
        assert_eq!(help.speech(), Some(HELP_SPEECH));
        assert_eq!(help.response.should_end_session, Some(false));

        let unknown = dispatch_intent(&client, "OrderPizzaIntent", None).await;
        assert_eq!(unknown.speech(), Some(UNKNOWN_INTENT));
        assert_eq!(unknown.response.should_end_session, Some(false));
        assert!(unknown.response.reprompt.is_some());
    }
}
