//! Passphrase-based derivation of the field encryption key.
//!
//! The key is scrypt(passphrase, "salt") with node's `scryptSync` default cost
//! parameters. The salt is a fixed constant: the key is never stored, so every
//! process start must re-derive the same bytes from configuration alone. Any
//! change to the salt or cost parameters makes every persisted token
//! unreadable and needs a versioned migration.

use scrypt::Params;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Byte length of the derived AES-256 key.
pub const KEY_LEN: usize = 32;

/// Constant salt shared by every installation.
pub const KDF_SALT: &[u8] = b"salt";

/// scrypt CPU/memory cost as log2(N); N = 16384.
const SCRYPT_LOG_N: u8 = 14;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;

/// Errors produced while deriving key material.
#[derive(Debug, Error)]
pub enum KdfError {
    /// The passphrase is empty or whitespace only.
    #[error("passphrase must not be empty")]
    EmptyPassphrase,

    /// scrypt rejected its parameters or output length.
    #[error("scrypt derivation failed")]
    Scrypt,
}

/// A 32-byte symmetric key derived from the operator passphrase.
///
/// The bytes are zeroed on drop and never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey([u8; KEY_LEN]);

impl DerivedKey {
    /// Borrow the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey([REDACTED])")
    }
}

/// Derive the field encryption key from `passphrase`.
///
/// Deterministic: the same passphrase always yields the same key.
///
/// # Errors
///
/// Returns [`KdfError::EmptyPassphrase`] for a blank passphrase, never a
/// weak default key.
pub fn derive_key(passphrase: &str) -> Result<DerivedKey, KdfError> {
    if passphrase.trim().is_empty() {
        return Err(KdfError::EmptyPassphrase);
    }
    let mut key = DerivedKey([0u8; KEY_LEN]);
    scrypt_into(passphrase.as_bytes(), KDF_SALT, &mut key.0)?;
    Ok(key)
}

fn scrypt_into(password: &[u8], salt: &[u8], out: &mut [u8]) -> Result<(), KdfError> {
    let params =
        Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, out.len()).map_err(|_| KdfError::Scrypt)?;
    scrypt::scrypt(password, salt, &params, out).map_err(|_| KdfError::Scrypt)
}
