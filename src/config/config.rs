//! # Grading Configuration
//!
//! [`GradeConfig`] holds everything the pipeline needs that is not a photo:
//! where the grading service lives and how to ask it, how aggressively to
//! shrink photos, and where the upload history is stored.
//!
//! ## Configuration Parameters
//!
//! | Parameter | Default | Description |
//! |-----------|---------|-------------|
//! | `endpoint` | `https://api.openai.com/v1/chat/completions` | Chat-completion URL |
//! | `model` | `gpt-4o-2024-11-20` | Vision-capable model name |
//! | `temperature` | 1.0 | Sampling temperature, 0.0-2.0 |
//! | `max_tokens` | 2048 | Completion length cap |
//! | `top_p` | 1.0 | Nucleus sampling, 0.0-1.0 |
//! | `frequency_penalty` | 0.0 | -2.0-2.0 |
//! | `presence_penalty` | 0.0 | -2.0-2.0 |
//! | `timeout_secs` | 60 | Whole-request deadline for the grading call |
//! | `max_long_side` | 1024 | Longest side of the uploaded photo in pixels |
//! | `jpeg_quality` | 70 | JPEG quality of the uploaded photo, 1-100 |
//! | `db_path` | `<data dir>/cardgrade/uploads.db` | Upload history |
//!
//! ## Credential
//!
//! The bearer token is baked in at build time from `CARDGRADE_API_KEY` and can
//! be overridden at run time by the same environment variable. It is never
//! printed: [`ApiKey`] redacts itself in `Debug` output.
//!
//! ```rust
//! use card_grade::config::{ApiKey, GradeConfig};
//!
//! let config = GradeConfig::default()
//!     .with_api_key(ApiKey::new("sk-test"))
//!     .with_jpeg_quality(80);
//! assert!(config.validate().is_ok());
//! assert_eq!(format!("{:?}", config.api_key), "Some(ApiKey(<redacted>))");
//! ```

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{GradeError, GradeResult};

/// Environment variable holding the grading service credential.
pub const API_KEY_ENV: &str = "CARDGRADE_API_KEY";

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-2024-11-20";

/// Bearer credential for the grading service.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw token, for building the `Authorization` header only.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Runtime environment first, then the value captured at build time.
    pub fn from_environment() -> Option<Self> {
        Self::resolve(
            std::env::var(API_KEY_ENV).ok().as_deref(),
            option_env!("CARDGRADE_API_KEY"),
        )
    }

    /// A blank value counts as unset, so it never hides the other source.
    fn resolve(runtime: Option<&str>, build_time: Option<&str>) -> Option<Self> {
        let usable = |k: &str| {
            let k = k.trim();
            (!k.is_empty()).then(|| Self(k.to_string()))
        };
        runtime.and_then(usable).or_else(|| build_time.and_then(usable))
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// Configuration for a grading run.
#[derive(Debug, Clone)]
pub struct GradeConfig {
    /// Chat-completion endpoint receiving the `POST`.
    pub endpoint: String,
    /// Model name sent in the request body.
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    /// Deadline for the whole grading request, connect through body.
    pub timeout_secs: u64,
    /// Credential; optional so that history commands work without one.
    pub api_key: Option<ApiKey>,
    /// Longest side of the uploaded photo in pixels.
    pub max_long_side: u32,
    /// JPEG quality of the uploaded photo.
    pub jpeg_quality: u8,
    /// SQLite file holding the upload history.
    pub db_path: PathBuf,
}

impl Default for GradeConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 1.0,
            max_tokens: 2048,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            timeout_secs: 60,
            api_key: None,
            max_long_side: grade_scale::presets::LongSidePreset::Standard.max_long_side(),
            jpeg_quality: 70,
            db_path: default_db_path(),
        }
    }
}

impl GradeConfig {
    /// Defaults plus whatever credential the environment provides.
    pub fn from_environment() -> Self {
        Self {
            api_key: ApiKey::from_environment(),
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, key: ApiKey) -> Self {
        self.api_key = Some(key);
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }

    pub fn with_max_long_side(mut self, max_long_side: u32) -> Self {
        self.max_long_side = max_long_side;
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The credential, or a config error telling the user how to set one.
    pub fn require_api_key(&self) -> GradeResult<&ApiKey> {
        self.api_key.as_ref().ok_or_else(|| {
            GradeError::config(API_KEY_ENV, "<unset>", "no grading credential configured")
                .with_recovery_suggestion(format!(
                    "Export {} or rebuild with it set",
                    API_KEY_ENV
                ))
        })
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> GradeResult<()> {
        if !(self.endpoint.starts_with("https://") || self.endpoint.starts_with("http://")) {
            return Err(GradeError::config(
                "endpoint",
                &self.endpoint,
                "must be an http(s) URL",
            ));
        }
        if self.model.trim().is_empty() {
            return Err(GradeError::config("model", &self.model, "must not be empty"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(GradeError::config(
                "temperature",
                self.temperature.to_string(),
                "must be between 0.0 and 2.0",
            ));
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(GradeError::config(
                "top_p",
                self.top_p.to_string(),
                "must be between 0.0 and 1.0",
            ));
        }
        for (field, value) in [
            ("frequency_penalty", self.frequency_penalty),
            ("presence_penalty", self.presence_penalty),
        ] {
            if !(-2.0..=2.0).contains(&value) {
                return Err(GradeError::config(
                    field,
                    value.to_string(),
                    "must be between -2.0 and 2.0",
                ));
            }
        }
        if self.max_tokens == 0 {
            return Err(GradeError::config("max_tokens", "0", "must be greater than 0"));
        }
        if self.timeout_secs == 0 {
            return Err(GradeError::config("timeout_secs", "0", "must be greater than 0"));
        }
        if self.max_long_side < 64 {
            return Err(GradeError::config(
                "max_long_side",
                self.max_long_side.to_string(),
                "must be at least 64 pixels",
            ));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(GradeError::config(
                "jpeg_quality",
                self.jpeg_quality.to_string(),
                "must be between 1 and 100",
            ));
        }
        Ok(())
    }
}

/// Platform data directory, falling back to the working directory.
///
/// - Linux: ~/.local/share/cardgrade/uploads.db
/// - macOS: ~/Library/Application Support/cardgrade/uploads.db
/// - Windows: %APPDATA%\cardgrade\uploads.db
pub fn default_db_path() -> PathBuf {
    let mut path = dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    path.push("cardgrade");
    path.push("uploads.db");
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GradeConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.max_tokens, 2048);
        assert_eq!(config.max_long_side, 1024);
        assert_eq!(config.jpeg_quality, 70);
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert!(config.db_path.ends_with("cardgrade/uploads.db"));
    }

    #[test]
    fn test_config_validation() {
        let mut config = GradeConfig::default();
        assert!(config.validate().is_ok());

        config.jpeg_quality = 0;
        assert!(config.validate().is_err());
        config.jpeg_quality = 70;

        config.temperature = 3.0;
        assert!(config.validate().is_err());
        config.temperature = 1.0;

        config.endpoint = "ftp://example.test".to_string();
        assert!(config.validate().is_err());
        config.endpoint = DEFAULT_ENDPOINT.to_string();

        config.max_long_side = 10;
        assert!(config.validate().is_err());
        config.max_long_side = 1024;

        config.presence_penalty = -2.5;
        assert!(config.validate().is_err());
        config.presence_penalty = 0.0;

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let config = GradeConfig {
            api_key: None,
            ..GradeConfig::default()
        };
        let err = config.require_api_key().unwrap_err();
        assert_eq!(err.category(), "config");
        assert!(!err.to_string().contains("sk-"));
    }

    #[test]
    fn test_blank_runtime_key_falls_back_to_build_time() {
        let key = ApiKey::resolve(Some(""), Some("sk-built-in")).unwrap();
        assert_eq!(key.expose(), "sk-built-in");
        let key = ApiKey::resolve(Some("  \n"), Some(" sk-built-in ")).unwrap();
        assert_eq!(key.expose(), "sk-built-in");
    }

    #[test]
    fn test_runtime_key_wins_and_blanks_are_unset() {
        let key = ApiKey::resolve(Some(" sk-runtime "), Some("sk-built-in")).unwrap();
        assert_eq!(key.expose(), "sk-runtime");
        assert!(ApiKey::resolve(Some(" "), Some("")).is_none());
        assert!(ApiKey::resolve(None, None).is_none());
    }

    #[test]
    fn test_api_key_is_redacted() {
        let key = ApiKey::new("sk-secret-value");
        assert_eq!(format!("{:?}", key), "ApiKey(<redacted>)");
        let config = GradeConfig::default().with_api_key(key);
        assert!(!format!("{:?}", config).contains("sk-secret-value"));
        assert_eq!(config.require_api_key().unwrap().expose(), "sk-secret-value");
    }
}
