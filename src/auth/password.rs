//! One-way password hashing.
//!
//! bcrypt salts every digest and compares in constant time, so neither the
//! stored digest nor verification timing reveals anything about the input.

use bcrypt::BcryptError;

/// Hash a plaintext password for storage
pub fn hash(plain: &str) -> Result<String, BcryptError> {
    bcrypt::hash(plain, bcrypt::DEFAULT_COST)
}

/// Check a plaintext password against a stored digest
pub fn verify(plain: &str, digest: &str) -> Result<bool, BcryptError> {
    bcrypt::verify(plain, digest)
}
