//! Request and response bodies for the chat-completion endpoint.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::GradeConfig;
use crate::processing::EncodedImage;

pub const SYSTEM_PROMPT: &str = "You are a professional Pokemon card grader working for PSA, \
the largest card grader in the world. Be very meticulous and scrutinize details heavily, \
because if a flaw shows in an image it is probably worse in real life. Do not answer \
conversationally or with filler such as \"Sure! Here!\"; this text is shown directly to \
the end user of a product.";

pub const INSTRUCTION_PROMPT: &str = "The image I sent is the Pokemon card that I want graded. \
Using what you know about card grading, estimate the grade of the card on the PSA 1-10 scale. \
Do not say you cannot do it; I only want an estimate and a short answer for each metric \
that led you to that conclusion. If you must give a range, keep it within one value, \
for example 9-8 or 7-6.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

/// Body of the `POST` to the chat-completion endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

/// Persona, instructions, then the photo as a data URI.
pub fn build_request(config: &GradeConfig, image: &EncodedImage) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: config.model.clone(),
        messages: vec![
            ChatMessage {
                role: Role::System,
                content: MessageContent::Text(SYSTEM_PROMPT.to_string()),
            },
            ChatMessage {
                role: Role::User,
                content: MessageContent::Text(INSTRUCTION_PROMPT.to_string()),
            },
            ChatMessage {
                role: Role::User,
                content: MessageContent::Parts(vec![ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image.data_uri(),
                    },
                }]),
            },
        ],
        temperature: config.temperature,
        max_tokens: config.max_tokens,
        top_p: config.top_p,
        frequency_penalty: config.frequency_penalty,
        presence_penalty: config.presence_penalty,
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Why a response body carried no verdict.
#[derive(Debug)]
pub enum ResponseShapeError {
    Malformed(serde_json::Error),
    NoChoices,
    EmptyContent,
    Api(String),
}

impl fmt::Display for ResponseShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseShapeError::Malformed(e) => write!(f, "malformed response body: {}", e),
            ResponseShapeError::NoChoices => write!(f, "response has no choices"),
            ResponseShapeError::EmptyContent => write!(f, "first choice has no text content"),
            ResponseShapeError::Api(message) => write!(f, "service error: {}", message),
        }
    }
}

impl std::error::Error for ResponseShapeError {}

/// Extract the trimmed text of the first completion.
pub fn extract_verdict(body: &str) -> Result<String, ResponseShapeError> {
    let parsed: ChatCompletionResponse = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(e) => {
            if let Ok(envelope) = serde_json::from_str::<ApiErrorEnvelope>(body) {
                return Err(ResponseShapeError::Api(envelope.error.message));
            }
            return Err(ResponseShapeError::Malformed(e));
        }
    };

    let first = parsed
        .choices
        .into_iter()
        .next()
        .ok_or(ResponseShapeError::NoChoices)?;
    let text = first
        .message
        .content
        .map(|c| c.trim().to_string())
        .unwrap_or_default();
    if text.is_empty() {
        return Err(ResponseShapeError::EmptyContent);
    }
    Ok(text)
}
