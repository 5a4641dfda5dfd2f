use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::{Error, Result};
use tracing::debug;

// Serializers are resolved once, at cache construction, from a
// configuration token. An unknown token is a configuration error.

/// Turns a cache key into the bytes appended to the namespace prefix.
///
/// Returning `None` means the key has no usable representation (for
/// example a unit or `None` key); callers must treat that as fatal,
/// never as a miss.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KeySerializer {
    /// Plain text: string keys are stored verbatim, everything else as
    /// its JSON rendering. The default.
    #[default]
    Utf8,
    /// Full JSON rendering, string keys included (quoted).
    Json,
}

impl KeySerializer {
    pub fn from_token(token: Option<&str>) -> Result<Self> {
        match token {
            None | Some("utf8") => Ok(Self::Utf8),
            Some("json") => Ok(Self::Json),
            Some(other) => Err(Error::Configuration(format!(
                "unknown key serializer: {other}"
            ))),
        }
    }

    pub fn serialize<K: Serialize>(&self, key: &K) -> Option<Vec<u8>> {
        let value = serde_json::to_value(key).ok()?;
        match self {
            Self::Utf8 => match value {
                serde_json::Value::Null => None,
                serde_json::Value::String(s) if s.is_empty() => None,
                serde_json::Value::String(s) => Some(s.into_bytes()),
                other => Some(other.to_string().into_bytes()),
            },
            Self::Json => {
                if value.is_null() {
                    None
                } else {
                    Some(value.to_string().into_bytes())
                }
            }
        }
    }
}

/// Encodes and decodes cached values.
///
/// Both directions degrade rather than fail: a value that cannot be
/// encoded is reported as non-cacheable (`None`, the writer evicts the
/// slot instead of storing), and stored bytes that do not decode are
/// reported as a miss.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ValueSerializer {
    /// JSON via serde, the only built-in value codec.
    #[default]
    Json,
}

impl ValueSerializer {
    pub fn from_token(token: Option<&str>) -> Result<Self> {
        match token {
            None | Some("json") => Ok(Self::Json),
            Some(other) => Err(Error::Configuration(format!(
                "unknown value serializer: {other}"
            ))),
        }
    }

    pub fn serialize<V: Serialize>(&self, value: &V) -> Option<Vec<u8>> {
        match self {
            Self::Json => match serde_json::to_vec(value) {
                Ok(bytes) => Some(bytes),
                Err(err) => {
                    debug!(error = %err, "value has no serialized form, treating as non-cacheable");
                    None
                }
            },
        }
    }

    pub fn deserialize<V: DeserializeOwned>(&self, bytes: &[u8]) -> Option<V> {
        match self {
            Self::Json => match serde_json::from_slice(bytes) {
                Ok(value) => Some(value),
                Err(err) => {
                    debug!(error = %err, "stored value does not decode, treating as miss");
                    None
                }
            },
        }
    }
}
