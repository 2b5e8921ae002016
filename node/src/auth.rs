use std::fmt::Write as _;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Utc;
use sha2::{Digest, Sha256};

use airnode_common::{CredentialError, CredentialSource, CredentialToken};

/// Derives bounded-lifetime connection passwords from the device private
/// key blob. Each issued token is unique and carries its own expiry; the
/// connect path consumes it by value.
pub struct KeyTokenSource {
    key: Vec<u8>,
    validity_secs: i64,
    nonce: AtomicU64,
}

impl KeyTokenSource {
    pub fn new(key: Vec<u8>, validity_secs: i64) -> Self {
        Self {
            key,
            validity_secs,
            nonce: AtomicU64::new(0),
        }
    }

    pub fn from_file(path: &Path, validity_secs: i64) -> Result<Self, CredentialError> {
        let key = std::fs::read(path)
            .map_err(|err| CredentialError::KeyUnavailable(format!("{}: {err}", path.display())))?;
        if key.is_empty() {
            return Err(CredentialError::KeyUnavailable(format!(
                "{}: key file is empty",
                path.display()
            )));
        }
        Ok(Self::new(key, validity_secs))
    }

    /// Process-local key for development hosts without a provisioned key
    /// file. Tokens from it will not authenticate against a real broker.
    pub fn ephemeral(validity_secs: i64) -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos())
            .unwrap_or_default();
        let key = format!("ephemeral:{}:{seed}", std::process::id()).into_bytes();
        Self::new(key, validity_secs)
    }
}

impl CredentialSource for KeyTokenSource {
    fn issue(&self, project_id: &str) -> Result<CredentialToken, CredentialError> {
        let issued = Utc::now().timestamp();
        let expires = issued + self.validity_secs;
        let nonce = self.nonce.fetch_add(1, Ordering::Relaxed);

        let mut hasher = Sha256::new();
        hasher.update(&self.key);
        hasher.update(project_id.as_bytes());
        hasher.update(issued.to_be_bytes());
        hasher.update(expires.to_be_bytes());
        hasher.update(nonce.to_be_bytes());
        let digest = hasher.finalize();

        let mut signature = String::with_capacity(64);
        for byte in digest {
            write!(&mut signature, "{byte:02x}")
                .map_err(|err| CredentialError::Signing(err.to_string()))?;
        }

        Ok(CredentialToken::new(
            format!("ct1.{issued}.{expires}.{signature}"),
            expires,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique_per_issue() {
        let source = KeyTokenSource::new(b"test-key".to_vec(), 86_400);

        let first = source.issue("airnode").unwrap().into_secret();
        let second = source.issue("airnode").unwrap().into_secret();

        assert_ne!(first, second);
    }

    #[test]
    fn expiry_tracks_the_validity_window() {
        let source = KeyTokenSource::new(b"test-key".to_vec(), 86_400);
        let before = Utc::now().timestamp();

        let token = source.issue("airnode").unwrap();

        assert!(token.expires_epoch() >= before + 86_400);
        assert!(token.expires_epoch() <= Utc::now().timestamp() + 86_400);
    }

    #[test]
    fn missing_key_file_is_reported() {
        let result = KeyTokenSource::from_file(Path::new("/nonexistent/device_key.pem"), 86_400);

        assert!(matches!(result, Err(CredentialError::KeyUnavailable(_))));
    }
}
