use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand_core::OsRng;
use thiserror::Error;
use tracing::warn;

/// Iteration count applied when no cost is configured.
pub const DEFAULT_HASH_COST: u32 = 8;

const DECOY_PASSWORD: &str = "decoy-password-for-unknown-accounts";

/// Errors produced by the common-crypto helpers.
#[derive(Debug, Error)]
pub enum HashError {
    #[error("invalid hashing parameters: {0}")]
    InvalidParams(String),
    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Cost settings for credential hashing, loaded once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingConfig {
    /// Argon2 time cost (iterations).
    pub cost: u32,
}

impl HashingConfig {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_COST)
    }
}

/// Salted one-way hashing of user passwords (Argon2id, PHC string output).
///
/// Digests embed their salt and parameters, so verification keeps working
/// for digests produced under an older cost.
pub struct CredentialHasher {
    argon2: Argon2<'static>,
    decoy_digest: String,
}

impl CredentialHasher {
    pub fn new(config: &HashingConfig) -> Result<Self, HashError> {
        let params = Params::new(Params::DEFAULT_M_COST, config.cost, Params::DEFAULT_P_COST, None)
            .map_err(|err| HashError::InvalidParams(err.to_string()))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let decoy_digest = hash_with(&argon2, DECOY_PASSWORD)?;
        Ok(Self { argon2, decoy_digest })
    }

    pub fn hash(&self, plaintext: &str) -> Result<String, HashError> {
        hash_with(&self.argon2, plaintext)
    }

    /// Constant-time check of `plaintext` against a stored digest.
    pub fn verify(&self, plaintext: &str, digest: &str) -> bool {
        let parsed = match PasswordHash::new(digest) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(error = %err, "stored password digest is malformed");
                return false;
            }
        };
        self.argon2
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }

    /// Burns the same work as [`CredentialHasher::verify`] for logins against unknown accounts.
    pub fn verify_decoy(&self, plaintext: &str) {
        let _ = self.verify(plaintext, &self.decoy_digest);
    }
}

impl std::fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialHasher").finish_non_exhaustive()
    }
}

fn hash_with(argon2: &Argon2<'_>, plaintext: &str) -> Result<String, HashError> {
    let salt = SaltString::generate(&mut OsRng);
    argon2
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| HashError::Hash(err.to_string()))
}
