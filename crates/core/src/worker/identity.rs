//! Worker identity model

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Credentials issued by the tracker when a worker registers.
///
/// Read-only once the drone has started.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerIdentity {
    pub id: i64,
    pub alias: String,
    /// Raw secret bytes, base64 in JSON
    #[serde(with = "base64_bytes")]
    pub secret: Vec<u8>,
}

impl WorkerIdentity {
    pub fn new(id: i64, alias: impl Into<String>, secret: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            alias: alias.into(),
            secret: secret.into(),
        }
    }

    /// Value of the `X-Secret` header
    pub fn encoded_secret(&self) -> String {
        STANDARD.encode(&self.secret)
    }
}

// Keeps the secret out of log lines.
impl std::fmt::Debug for WorkerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerIdentity")
            .field("id", &self.id)
            .field("alias", &self.alias)
            .field("secret", &"<redacted>")
            .finish()
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
