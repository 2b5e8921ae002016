use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("device key unavailable: {0}")]
    KeyUnavailable(String),
    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Single-use broker password with a bounded validity window. The secret
/// can only be taken by value, so a token consumed by one connection
/// attempt cannot be presented again.
#[derive(Debug)]
pub struct CredentialToken {
    secret: String,
    expires_epoch: i64,
}

impl CredentialToken {
    pub fn new(secret: String, expires_epoch: i64) -> Self {
        Self {
            secret,
            expires_epoch,
        }
    }

    pub fn expires_epoch(&self) -> i64 {
        self.expires_epoch
    }

    pub fn into_secret(self) -> String {
        self.secret
    }
}

pub trait CredentialSource: Send + Sync {
    fn issue(&self, project_id: &str) -> Result<CredentialToken, CredentialError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn token_surrenders_its_secret_once() {
        let token = CredentialToken::new("s3cret".to_string(), 1_700_086_400);

        assert_eq!(token.expires_epoch(), 1_700_086_400);
        assert_eq!(token.into_secret(), "s3cret");
        // `token` is moved out above; a second use is a compile error.
    }
}
