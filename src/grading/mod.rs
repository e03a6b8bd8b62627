//! # Grading Module
//!
//! One request to a hosted chat-completion model per photo. The model is told
//! to act as a strict professional grader and to answer with a PSA-scale
//! estimate plus a short note per metric; whatever text comes back is the
//! verdict, shown to the user as-is.
//!
//! - [`payload`]: fixed prompt, request body and response parsing
//! - [`client`]: the `reqwest` implementation of [`Grader`]

pub mod client;
pub mod payload;

use async_trait::async_trait;

use crate::error::GradeResult;
use crate::processing::EncodedImage;

pub use client::ChatCompletionGrader;

/// Outcome of a grading call that reached the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Trimmed text of the first completion.
    Graded(String),
    /// The response body had no usable completion; the raw body has been logged.
    NoValidResponse,
}

impl Verdict {
    /// Text shown to the user when there is no usable completion.
    pub const NO_VALID_RESPONSE: &'static str = "No valid response";

    pub fn text(&self) -> &str {
        match self {
            Verdict::Graded(text) => text,
            Verdict::NoValidResponse => Self::NO_VALID_RESPONSE,
        }
    }
}

/// Abstract grading backend.
///
/// Transport failures are errors; a response without a usable completion is
/// `Ok(Verdict::NoValidResponse)`. Implementations never retry.
#[async_trait]
pub trait Grader: Send + Sync {
    async fn grade(&self, image: &EncodedImage) -> GradeResult<Verdict>;
}
