//! Password hashing for the configured users.

use bcrypt::{hash, verify, BcryptError, DEFAULT_COST};
use log::warn;

pub fn hash_password(password: &str) -> Result<String, BcryptError> {
    hash(password, DEFAULT_COST)
}

/// False for a wrong password and for a hash bcrypt cannot read.
pub fn verify_password(password: &str, hashed_password: &str) -> bool {
    verify(password, hashed_password).unwrap_or_else(|e| {
        warn!("Unreadable password hash: {}", e);
        false
    })
}
