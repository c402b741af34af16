use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignatureError {
    #[error("Missing signature header")]
    Missing,

    #[error("Signature is not valid base64")]
    Malformed,

    #[error("Signature does not match any configured key")]
    Mismatch,
}

/// HMAC-SHA256 verification of gateway callbacks.
///
/// The signed bytes are the notification URL (when the gateway includes it)
/// followed by the exact request body. Several keys may be active at once
/// during rotation; a match against any of them is accepted.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    keys: Vec<String>,
    notification_url: Option<String>,
}

impl SignatureVerifier {
    pub fn new(keys: Vec<String>, notification_url: Option<String>) -> Self {
        Self {
            keys,
            notification_url,
        }
    }

    /// An empty key set (or only empty keys) turns verification off.
    pub fn is_enabled(&self) -> bool {
        self.keys.iter().any(|key| !key.is_empty())
    }

    pub fn verify(&self, body: &[u8], signature: Option<&str>) -> Result<(), SignatureError> {
        if !self.is_enabled() {
            debug!("Webhook signature verification disabled");
            return Ok(());
        }

        let signature = signature
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(SignatureError::Missing)?;
        let expected = STANDARD.decode(signature).map_err(|_| SignatureError::Malformed)?;

        for key in self.keys.iter().filter(|key| !key.is_empty()) {
            let mut mac = match HmacSha256::new_from_slice(key.as_bytes()) {
                Ok(mac) => mac,
                Err(_) => continue,
            };
            if let Some(url) = &self.notification_url {
                mac.update(url.as_bytes());
            }
            mac.update(body);

            // verify_slice compares in constant time
            if mac.verify_slice(&expected).is_ok() {
                return Ok(());
            }
        }

        Err(SignatureError::Mismatch)
    }

    /// Produces the header value a gateway would send for `body` under `key`.
    pub fn sign(key: &str, notification_url: Option<&str>, body: &[u8]) -> String {
        let Ok(mut mac) = HmacSha256::new_from_slice(key.as_bytes()) else {
            return String::new();
        };
        if let Some(url) = notification_url {
            mac.update(url.as_bytes());
        }
        mac.update(body);
        STANDARD.encode(mac.finalize().into_bytes())
    }
}
