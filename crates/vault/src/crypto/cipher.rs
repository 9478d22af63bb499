//! AES-256-GCM sealing and opening of individual field values.
//!
//! Each call to [`seal`] draws a fresh 16-byte IV from the OS CSPRNG. GCM
//! with a repeated (key, IV) pair loses both confidentiality and
//! authenticity, so IVs are never cached, shared, or derived.
//!
//! A 16-byte IV is not the 96-bit GCM fast path: the initial counter block is
//! GHASHed from it, which is what node's `createCipheriv("aes-256-gcm", key, iv)`
//! does with the same IV length.

use aes_gcm::{
    aead::{consts::U16, rand_core::RngCore, AeadInPlace, KeyInit, OsRng},
    aes::Aes256,
    AesGcm, Key, Nonce, Tag,
};
use thiserror::Error;

use super::kdf::DerivedKey;
use super::token::{SecretToken, IV_LEN, TAG_LEN};

/// AES-256-GCM with a 128-bit nonce and 128-bit tag.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Associated data bound into every token. Scopes tokens to this application.
pub const ASSOCIATED_DATA: &[u8] = b"SecureVault";

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// AES-GCM encryption or tag verification failed.
    #[error("aead operation failed")]
    AeadFailure,
}

/// Encrypt `plaintext` under `key` into a new [`SecretToken`].
///
/// # Errors
///
/// Returns [`CipherError::AeadFailure`] only if the AEAD primitive refuses the
/// input, which does not happen for in-memory string sizes.
pub fn seal(key: &DerivedKey, plaintext: &[u8]) -> Result<SecretToken, CipherError> {
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);

    let mut buffer = plaintext.to_vec();
    let tag = build_cipher(key)
        .encrypt_in_place_detached(Nonce::<U16>::from_slice(&iv), ASSOCIATED_DATA, &mut buffer)
        .map_err(|_| CipherError::AeadFailure)?;

    let mut tag_bytes = [0u8; TAG_LEN];
    tag_bytes.copy_from_slice(&tag);

    Ok(SecretToken {
        iv,
        tag: tag_bytes,
        ciphertext: buffer,
    })
}

/// Decrypt and authenticate `token` under `key`.
///
/// # Errors
///
/// Returns [`CipherError::AeadFailure`] if the tag does not verify: wrong key,
/// tampered IV, tag or ciphertext, or a token produced by another scheme.
pub fn open(key: &DerivedKey, token: &SecretToken) -> Result<Vec<u8>, CipherError> {
    let mut buffer = token.ciphertext.clone();
    build_cipher(key)
        .decrypt_in_place_detached(
            Nonce::<U16>::from_slice(&token.iv),
            ASSOCIATED_DATA,
            &mut buffer,
            Tag::<U16>::from_slice(&token.tag),
        )
        .map_err(|_| CipherError::AeadFailure)?;
    Ok(buffer)
}

fn build_cipher(key: &DerivedKey) -> Aes256Gcm16 {
    Aes256Gcm16::new(Key::<Aes256Gcm16>::from_slice(key.as_bytes()))
}
