//! Password hashing
//!
//! Passwords are never stored or compared in the clear. Each credential is an
//! argon2id hash with a random salt, encoded as a PHC string so the cost
//! parameters travel with the hash and verification keeps working after the
//! configured costs change.

use crate::types::BookstoreError;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

/// argon2 cost parameters for new hashes
#[derive(Debug, Clone, PartialEq)]
pub struct HashingConfig {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// Salted argon2id hasher
#[derive(Debug, Clone)]
pub struct CredentialHasher {
    params: Params,
}

impl CredentialHasher {
    /// # Errors
    ///
    /// Returns `CredentialHash` if argon2 rejects the cost parameters.
    pub fn new(config: &HashingConfig) -> Result<Self, BookstoreError> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(BookstoreError::credential_hash)?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password with a fresh random salt
    pub fn hash(&self, password: &str) -> Result<String, BookstoreError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(BookstoreError::credential_hash)
    }

    /// Check a password against a stored credential
    ///
    /// # Errors
    ///
    /// Returns `CredentialHash` if the stored credential is not a valid PHC
    /// string. A wrong password is `Ok(false)`, not an error.
    pub fn verify(&self, password: &str, credential: &str) -> Result<bool, BookstoreError> {
        let parsed = PasswordHash::new(credential).map_err(BookstoreError::credential_hash)?;
        match self.argon2().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(BookstoreError::credential_hash(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap_hasher() -> CredentialHasher {
        CredentialHasher::new(&HashingConfig {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap()
    }

    #[test]
    fn test_hash_round_trip() {
        let hasher = cheap_hasher();

        let credential = hasher.hash("hunter2").unwrap();

        assert!(credential.starts_with("$argon2id$"));
        assert!(!credential.contains("hunter2"));
        assert!(hasher.verify("hunter2", &credential).unwrap());
        assert!(!hasher.verify("hunter3", &credential).unwrap());
    }

    #[test]
    fn test_same_password_gets_different_salts() {
        let hasher = cheap_hasher();

        let first = hasher.hash("secret").unwrap();
        let second = hasher.hash("secret").unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_verify_malformed_credential_is_error() {
        let hasher = cheap_hasher();

        let result = hasher.verify("secret", "plaintext-password");

        assert!(matches!(result, Err(BookstoreError::CredentialHash { .. })));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let result = CredentialHasher::new(&HashingConfig {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        });

        assert!(matches!(result, Err(BookstoreError::CredentialHash { .. })));
    }
}
