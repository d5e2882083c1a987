//! Shared library for the Gemini voice skill.
//!
//! This crate provides configuration, error types, HTTP helpers and the
//! Gemini client used by the skill Lambda.

pub mod config;
pub mod error;
pub mod gemini;
pub mod http;
pub mod secrets;

pub use config::Config;
pub use error::{Error, Result};
pub use gemini::{GeminiClient, QueryClient, EMPTY_ANSWER_FILLER};
#[cfg(any(test, feature = "testing"))]
pub use gemini::MockQueryClient;
pub use secrets::{get_api_key, get_secret, parse_api_key};
