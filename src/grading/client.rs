//! `reqwest` grading client for OpenAI-compatible chat-completion endpoints.

use async_trait::async_trait;
use tracing::{error, info, warn};

use super::payload::{build_request, extract_verdict};
use super::{Grader, Verdict};
use crate::config::{ApiKey, GradeConfig};
use crate::error::{GradeError, GradeResult};
use crate::processing::EncodedImage;

/// Sends one chat-completion request per photo.
pub struct ChatCompletionGrader {
    client: reqwest::Client,
    config: GradeConfig,
    api_key: ApiKey,
}

impl ChatCompletionGrader {
    /// Validates `config`, requires a credential and builds the HTTP client.
    pub fn new(config: &GradeConfig) -> GradeResult<Self> {
        config.validate()?;
        let api_key = config.require_api_key()?.clone();
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("cardgrade/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                GradeError::network("build HTTP client")
                    .with_source(e)
                    .with_recovery_suggestion("Check the TLS setup of this machine")
            })?;

        Ok(Self {
            client,
            config: config.clone(),
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    fn transport_error(&self, e: reqwest::Error) -> GradeError {
        if e.is_timeout() {
            GradeError::timeout("grading request", self.config.timeout().as_millis() as u64)
        } else {
            GradeError::from(e).with_address(self.config.endpoint.clone())
        }
    }
}

#[async_trait]
impl Grader for ChatCompletionGrader {
    async fn grade(&self, image: &EncodedImage) -> GradeResult<Verdict> {
        let request = build_request(&self.config, image);
        info!(
            endpoint = %self.config.endpoint,
            model = %self.config.model,
            image_bytes = image.bytes.len(),
            "sending grading request"
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(self.api_key.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            warn!(%status, body = %body, "grading service returned an error status");
            return Ok(Verdict::NoValidResponse);
        }

        match extract_verdict(&body) {
            Ok(text) => {
                info!(%status, verdict_chars = text.len(), "grading response received");
                Ok(Verdict::Graded(text))
            }
            Err(reason) => {
                error!(%status, %reason, body = %body, "error parsing grading response");
                Ok(Verdict::NoValidResponse)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_credential() {
        let config = GradeConfig {
            api_key: None,
            ..GradeConfig::default()
        };
        let err = ChatCompletionGrader::new(&config).err().unwrap();
        assert_eq!(err.category(), "config");
    }

    #[test]
    fn rejects_invalid_config_before_building_client() {
        let config = GradeConfig::default()
            .with_api_key(ApiKey::new("sk-test"))
            .with_endpoint("not a url");
        let err = ChatCompletionGrader::new(&config).err().unwrap();
        assert!(err.to_string().contains("endpoint"));
    }

    #[test]
    fn builds_with_credential() {
        let config = GradeConfig::default()
            .with_api_key(ApiKey::new("sk-test"))
            .with_endpoint("http://127.0.0.1:9/v1/chat/completions");
        let grader = ChatCompletionGrader::new(&config).unwrap();
        assert_eq!(grader.endpoint(), "http://127.0.0.1:9/v1/chat/completions");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_network_error() {
        // port 9 (discard) is closed on test machines
        let config = GradeConfig::default()
            .with_api_key(ApiKey::new("sk-test"))
            .with_endpoint("http://127.0.0.1:9/v1/chat/completions")
            .with_timeout_secs(5);
        let grader = ChatCompletionGrader::new(&config).unwrap();
        let image = EncodedImage {
            bytes: vec![0xFF, 0xD8],
            size: grade_scale::presets::Size { w: 1, h: 1 },
            mime: "image/jpeg",
        };

        let err = grader.grade(&image).await.unwrap_err();
        assert!(matches!(err.category(), "network" | "timeout"));
    }
}
