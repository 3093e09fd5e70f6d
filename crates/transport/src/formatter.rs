// Formatter stage: message <-> bytes

use crate::error::{Result, TransportError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How strictly type versions are checked between peers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Versioning {
    /// Include versions and reject mismatches
    #[default]
    Strict,
    /// Omit versions and accept any peer
    Lenient,
}

impl fmt::Display for Versioning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Versioning::Strict => write!(f, "strict"),
            Versioning::Lenient => write!(f, "lenient"),
        }
    }
}

impl FromStr for Versioning {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(Versioning::Strict),
            "lenient" => Ok(Versioning::Lenient),
            other => Err(TransportError::Config(format!(
                "unknown versioning mode '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatterSettings {
    pub versioning: Versioning,
    /// Version stamped on outgoing messages in strict mode
    pub type_version: String,
}

impl Default for FormatterSettings {
    fn default() -> Self {
        Self {
            versioning: Versioning::Strict,
            type_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Envelope written by the formatter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub body: serde_json::Value,
}

pub trait Formatter: Send + Sync {
    fn name(&self) -> &str;

    fn serialize(&self, message: &serde_json::Value) -> Result<Vec<u8>>;

    fn deserialize(&self, bytes: &[u8]) -> Result<serde_json::Value>;
}

/// JSON formatter honoring the versioning mode
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    settings: FormatterSettings,
}

impl JsonFormatter {
    pub fn new(settings: FormatterSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &FormatterSettings {
        &self.settings
    }
}

impl Formatter for JsonFormatter {
    fn name(&self) -> &str {
        "json"
    }

    fn serialize(&self, message: &serde_json::Value) -> Result<Vec<u8>> {
        let envelope = WireMessage {
            version: match self.settings.versioning {
                Versioning::Strict => Some(self.settings.type_version.clone()),
                Versioning::Lenient => None,
            },
            body: message.clone(),
        };
        Ok(serde_json::to_vec(&envelope)?)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<serde_json::Value> {
        let envelope: WireMessage = serde_json::from_slice(bytes)?;
        if self.settings.versioning == Versioning::Strict {
            let actual = envelope.version.as_deref().unwrap_or("");
            if actual != self.settings.type_version {
                return Err(TransportError::VersionMismatch {
                    expected: self.settings.type_version.clone(),
                    actual: actual.to_string(),
                });
            }
        }
        Ok(envelope.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn formatter(versioning: Versioning, version: &str) -> JsonFormatter {
        JsonFormatter::new(FormatterSettings {
            versioning,
            type_version: version.to_string(),
        })
    }

    #[test]
    fn test_strict_stamps_version() {
        let bytes = formatter(Versioning::Strict, "1.2.0")
            .serialize(&json!({"m": "Add"}))
            .unwrap();
        let envelope: WireMessage = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(envelope.version.as_deref(), Some("1.2.0"));

        let lenient = formatter(Versioning::Lenient, "1.2.0")
            .serialize(&json!(1))
            .unwrap();
        let envelope: WireMessage = serde_json::from_slice(&lenient).unwrap();
        assert!(envelope.version.is_none());
    }

    #[test]
    fn test_strict_rejects_mismatch_lenient_tolerates() {
        let bytes = formatter(Versioning::Strict, "1.0.0")
            .serialize(&json!("payload"))
            .unwrap();

        let err = formatter(Versioning::Strict, "2.0.0")
            .deserialize(&bytes)
            .unwrap_err();
        assert!(matches!(err, TransportError::VersionMismatch { .. }));

        let body = formatter(Versioning::Lenient, "2.0.0")
            .deserialize(&bytes)
            .unwrap();
        assert_eq!(body, json!("payload"));
    }

    #[test]
    fn test_strict_rejects_unversioned_message() {
        let bytes = formatter(Versioning::Lenient, "1.0.0")
            .serialize(&json!(null))
            .unwrap();
        assert!(formatter(Versioning::Strict, "1.0.0")
            .deserialize(&bytes)
            .is_err());
    }

    #[test]
    fn test_versioning_from_str() {
        assert_eq!("Strict".parse::<Versioning>().unwrap(), Versioning::Strict);
        assert_eq!("lenient".parse::<Versioning>().unwrap(), Versioning::Lenient);
        assert!("loose".parse::<Versioning>().is_err());
    }
}
