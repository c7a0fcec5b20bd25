use std::fmt;
use std::str::FromStr;

use beacon_core::ConfigurationError;
use serde_json::{Value, json};

use crate::ServeArgs;

pub const API_KEY_ENV: &str = "API_KEY";
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

/// Process-wide settings, resolved once at start-up and injected into the
/// server.
#[derive(Clone, PartialEq, Eq)]
pub struct Configuration {
    pub log_level: String,
    pub log_json: bool,
    api_key: Option<String>,
}

impl Configuration {
    pub fn from_args(args: &ServeArgs) -> Result<Self, ConfigurationError> {
        let log_level = parse_log_level(&args.log_level)?;
        let api_key = args
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string);
        if args.require_api_key && api_key.is_none() {
            return Err(ConfigurationError::MissingValue {
                key: API_KEY_ENV.to_string(),
            });
        }
        Ok(Self {
            log_level,
            log_json: args.log_json,
            api_key,
        })
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_json: false,
            api_key: None,
        }
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("log_level", &self.log_level)
            .field("log_json", &self.log_json)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Accepts any `tracing` level name (case-insensitive) or `off`.
pub fn parse_log_level(raw: &str) -> Result<String, ConfigurationError> {
    let normalized = raw.trim().to_ascii_lowercase();
    if normalized == "off" || tracing::Level::from_str(&normalized).is_ok() {
        Ok(normalized)
    } else {
        Err(ConfigurationError::InvalidValue {
            key: LOG_LEVEL_ENV.to_string(),
            reason: format!("'{raw}' is not one of trace, debug, info, warn, error, off"),
        })
    }
}

/// Name and version the host reports in `initialize`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessIdentity {
    pub name: String,
    pub version: String,
    pub title: Option<String>,
}

impl ProcessIdentity {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn to_value(&self) -> Value {
        let mut info = json!({
            "name": self.name,
            "version": self.version,
        });
        if let Some(title) = &self.title {
            info["title"] = Value::String(title.clone());
        }
        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> ServeArgs {
        ServeArgs {
            log_level: "info".to_string(),
            log_json: false,
            api_key: None,
            require_api_key: false,
        }
    }

    #[test]
    fn defaults_resolve_without_api_key() {
        let config = Configuration::from_args(&args()).unwrap();
        assert_eq!(config.log_level, "info");
        assert!(!config.log_json);
        assert!(config.api_key().is_none());
    }

    #[test]
    fn required_api_key_must_be_present_and_non_blank() {
        let mut serve = args();
        serve.require_api_key = true;
        let err = Configuration::from_args(&serve).unwrap_err();
        assert_eq!(err.to_string(), "API_KEY must be set");

        serve.api_key = Some("   ".to_string());
        assert!(Configuration::from_args(&serve).is_err());

        serve.api_key = Some(" secret ".to_string());
        let config = Configuration::from_args(&serve).unwrap();
        assert_eq!(config.api_key(), Some("secret"));
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let mut serve = args();
        serve.api_key = Some("hunter2".to_string());
        let config = Configuration::from_args(&serve).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn log_level_is_validated_and_normalized() {
        assert_eq!(parse_log_level("DEBUG").unwrap(), "debug");
        assert_eq!(parse_log_level("off").unwrap(), "off");
        let err = parse_log_level("loud").unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::InvalidValue { ref key, .. } if key == "LOG_LEVEL"
        ));
    }

    #[test]
    fn identity_serializes_server_info() {
        let identity = ProcessIdentity::new("beacon-mcp", "1.2.3");
        assert_eq!(
            identity.to_value(),
            json!({ "name": "beacon-mcp", "version": "1.2.3" })
        );
        let titled = identity.with_title("Beacon");
        assert_eq!(titled.to_value()["title"], json!("Beacon"));
    }
}
