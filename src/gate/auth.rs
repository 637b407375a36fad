//! Shared-secret authentication for the gate.

use subtle::ConstantTimeEq;

/// Header carrying the caller's API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// The configured credential.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Uses constant-time comparison to prevent timing attacks.
    pub fn verify(&self, candidate: Option<&str>) -> bool {
        match candidate {
            Some(candidate) => bool::from(candidate.as_bytes().ct_eq(self.0.as_bytes())),
            None => false,
        }
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(***)")
    }
}
