use crate::error::{SchoolError, SchoolResult};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

/// Turns a password into the credential stored in `users.password` and checks
/// candidates against it. The record store never compares passwords itself.
pub trait CredentialVerifier: Send + Sync {
    fn scheme(&self) -> &'static str;

    fn encode(&self, password: &str) -> SchoolResult<String>;

    fn verify(&self, password: &str, stored: &str) -> SchoolResult<bool>;
}

/// Stores passwords as-is. Reads databases whose users table holds
/// plaintext credentials.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaintextVerifier;

impl CredentialVerifier for PlaintextVerifier {
    fn scheme(&self) -> &'static str {
        "plaintext"
    }

    fn encode(&self, password: &str) -> SchoolResult<String> {
        Ok(password.to_string())
    }

    fn verify(&self, password: &str, stored: &str) -> SchoolResult<bool> {
        Ok(password == stored)
    }
}

/// Argon2id with default parameters, stored as a PHC string.
#[derive(Debug, Default, Clone, Copy)]
pub struct Argon2Verifier;

impl CredentialVerifier for Argon2Verifier {
    fn scheme(&self) -> &'static str {
        "argon2"
    }

    fn encode(&self, password: &str) -> SchoolResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| SchoolError::Credential(e.to_string()))
    }

    fn verify(&self, password: &str, stored: &str) -> SchoolResult<bool> {
        // A row written under another scheme is a mismatch, not a failure.
        let Ok(parsed) = PasswordHash::new(stored) else {
            tracing::warn!("stored credential is not an argon2 hash; treating as mismatch");
            return Ok(false);
        };
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}
