//! Read-only support for tokens written by the first generation of the vault.
//!
//! Those tokens were produced with node's deprecated `crypto.createCipher`,
//! which ignores the IV stored in the token. Key and nonce come from OpenSSL's
//! `EVP_BytesToKey(MD5, no salt, 1 round)` applied to the scrypt-derived key
//! bytes, so every legacy token shares one (key, nonce) pair. The token layout
//! is identical to the current one.
//!
//! Nothing is ever sealed with this schedule.

use aes_gcm::{
    aead::{AeadInPlace, KeyInit},
    Aes256Gcm, Key, Nonce, Tag,
};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::cipher::{CipherError, ASSOCIATED_DATA};
use super::kdf::{DerivedKey, KEY_LEN};
use super::token::SecretToken;

/// Nonce length `createCipher` derives for AES-GCM.
const LEGACY_NONCE_LEN: usize = 12;

/// MD5 digest length.
const MD5_LEN: usize = 16;

/// Key and nonce derived the way `crypto.createCipher` derives them.
///
/// The nonce is fixed, so GCM's authentication key is recoverable from any two
/// legacy tokens and a successful open here does not prove authenticity. Keep
/// it enabled only until old values are re-encrypted.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct LegacySchedule {
    key: [u8; KEY_LEN],
    nonce: [u8; LEGACY_NONCE_LEN],
}

impl LegacySchedule {
    /// Derive the legacy schedule from the current field key.
    pub fn from_key(key: &DerivedKey) -> Self {
        let material = evp_bytes_to_key(key.as_bytes(), KEY_LEN + LEGACY_NONCE_LEN);
        let mut schedule = Self {
            key: [0u8; KEY_LEN],
            nonce: [0u8; LEGACY_NONCE_LEN],
        };
        schedule.key.copy_from_slice(&material[..KEY_LEN]);
        schedule.nonce.copy_from_slice(&material[KEY_LEN..KEY_LEN + LEGACY_NONCE_LEN]);
        schedule
    }

    /// Decrypt and authenticate a legacy token. The token's IV is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::AeadFailure`] if the tag does not verify.
    pub fn open(&self, token: &SecretToken) -> Result<Vec<u8>, CipherError> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let mut buffer = token.ciphertext.clone();
        cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(&self.nonce),
                ASSOCIATED_DATA,
                &mut buffer,
                Tag::from_slice(&token.tag),
            )
            .map_err(|_| CipherError::AeadFailure)?;
        Ok(buffer)
    }
}

impl std::fmt::Debug for LegacySchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("LegacySchedule([REDACTED])")
    }
}

/// OpenSSL `EVP_BytesToKey` with MD5, no salt and a single round:
/// `D_1 = MD5(password)`, `D_i = MD5(D_{i-1} || password)`.
fn evp_bytes_to_key(password: &[u8], len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(len + MD5_LEN);
    let mut previous: Option<[u8; MD5_LEN]> = None;
    while out.len() < len {
        let mut ctx = md5::Context::new();
        if let Some(block) = previous {
            ctx.consume(block);
        }
        ctx.consume(password);
        let digest = ctx.compute().0;
        out.extend_from_slice(&digest);
        previous = Some(digest);
    }
    out.truncate(len);
    out
}
