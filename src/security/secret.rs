//! Secret digests and constant-time comparison.
//!
//! Stored secrets are encoded as `sha256:<hex digest>`; presented secrets are
//! hashed and compared against the stored digest.

use sha2::{Digest, Sha256};

const SHA256_PREFIX: &str = "sha256:";

/// A parsed secret digest.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretHash([u8; 32]);

/// Error for secret hashes that are not `sha256:<64 hex digits>`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecretHashError {
    #[error("secret hash must start with 'sha256:'")]
    UnsupportedScheme,
    #[error("secret hash digest is not valid hex")]
    InvalidHex,
    #[error("secret hash digest must be 32 bytes, got {0}")]
    InvalidLength(usize),
}

impl SecretHash {
    /// Parse the `sha256:<hex>` encoding used in `credentials.yaml`.
    pub fn parse(encoded: &str) -> Result<Self, SecretHashError> {
        let hex_digest = encoded
            .trim()
            .strip_prefix(SHA256_PREFIX)
            .ok_or(SecretHashError::UnsupportedScheme)?;
        let bytes = hex::decode(hex_digest).map_err(|_| SecretHashError::InvalidHex)?;
        let digest: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| SecretHashError::InvalidLength(bytes.len()))?;
        Ok(Self(digest))
    }

    /// Digest a plaintext secret.
    pub fn of(secret: &str) -> Self {
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&Sha256::digest(secret.as_bytes()));
        Self(digest)
    }

    /// Check a presented plaintext secret in constant time.
    pub fn verify(&self, presented: &str) -> bool {
        constant_time_eq(&self.0, &Self::of(presented).0)
    }

    /// The `sha256:<hex>` encoding.
    pub fn encode(&self) -> String {
        format!("{}{}", SHA256_PREFIX, hex::encode(self.0))
    }
}

impl std::fmt::Debug for SecretHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretHash(..)")
    }
}

/// Compare two byte strings without short-circuiting on the first mismatch.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
