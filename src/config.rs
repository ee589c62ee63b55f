//! Encoder configuration.
//!
//! Configuration is immutable after construction, so one `EncoderConfig`
//! can be shared by every worker of a batch encode.
//!
//! # Example
//!
//! ```rust
//! use syntax_buffer::config::EncoderConfig;
//!
//! let config = EncoderConfig::builder()
//!     .file_name("src/main.res")
//!     .list_run(64)
//!     .build();
//!
//! assert_eq!(config.file_name.as_deref(), Some("src/main.res"));
//! assert_eq!(config.list_run, 64);
//! assert!(!config.verify);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{EncodeError, EncodeResult};
use crate::format::MAX_CHILD_COUNT;

/// Immutable encoder configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// File name stored with the root record.
    pub file_name: Option<String>,
    /// Caller-defined identifier stored with the root record.
    pub source_id: Option<String>,
    /// Maximum number of items in one list record.
    pub list_run: u8,
    /// Decode and verify every buffer before returning it.
    pub verify: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            file_name: None,
            source_id: None,
            list_run: MAX_CHILD_COUNT as u8,
            verify: false,
        }
    }
}

impl EncoderConfig {
    /// Create a new builder for `EncoderConfig`.
    pub fn builder() -> EncoderConfigBuilder {
        EncoderConfigBuilder::default()
    }

    /// Whether the root record carries the extended source-file entry.
    pub fn has_source_info(&self) -> bool {
        self.file_name.is_some() || self.source_id.is_some()
    }

    /// Reject settings the encoder cannot honor.
    pub fn validate(&self) -> EncodeResult<()> {
        if self.list_run == 0 {
            return Err(EncodeError::InvalidConfig("list_run must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Builder for `EncoderConfig`.
#[derive(Debug, Default)]
pub struct EncoderConfigBuilder {
    config: EncoderConfig,
}

impl EncoderConfigBuilder {
    /// Set the file name stored with the root record.
    pub fn file_name(mut self, value: impl Into<String>) -> Self {
        self.config.file_name = Some(value.into());
        self
    }

    /// Set the identifier stored with the root record.
    pub fn source_id(mut self, value: impl Into<String>) -> Self {
        self.config.source_id = Some(value.into());
        self
    }

    /// Set the maximum number of items in one list record.
    pub fn list_run(mut self, value: u8) -> Self {
        self.config.list_run = value;
        self
    }

    /// Verify each buffer after assembly.
    pub fn verify(mut self, value: bool) -> Self {
        self.config.verify = value;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> EncoderConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EncoderConfig::default();
        assert_eq!(config.list_run, 255);
        assert!(!config.has_source_info());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_list_run_is_rejected() {
        let config = EncoderConfig::builder().list_run(0).build();
        assert!(matches!(config.validate(), Err(EncodeError::InvalidConfig(_))));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EncoderConfig = serde_json::from_str(r#"{"source_id": "42"}"#).unwrap();
        assert_eq!(config.source_id.as_deref(), Some("42"));
        assert_eq!(config.list_run, 255);
        assert!(config.has_source_info());
    }
}
