//! [`FieldCodec`]: the only encrypt/decrypt surface the storage layer uses.
//!
//! The codec is built once from configuration and cloned freely; the key
//! material sits behind an `Arc` and is never mutated after construction.

use std::{collections::BTreeMap, sync::Arc};

use thiserror::Error;
use tracing::{debug, warn};

use super::cipher::{self, CipherError};
use super::kdf::{derive_key, DerivedKey, KdfError};
use super::legacy::LegacySchedule;
use super::token::{SecretToken, TokenError};

/// Field name → value mapping of one secret. Plaintext or tokens depending
/// on which side of the codec it sits.
pub type FieldValues = BTreeMap<String, String>;

/// Errors surfaced by the codec to its callers.
///
/// [`CodecError::Decryption`] deliberately carries no cause: a malformed
/// token, bad hex, and a failed tag check are indistinguishable from outside.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// No passphrase was configured, so no key exists.
    #[error("encryption passphrase is not configured")]
    Configuration,

    /// The cipher refused to seal a value.
    #[error("failed to encrypt data")]
    Encryption,

    /// A token could not be decrypted.
    #[error("failed to decrypt data")]
    Decryption,
}

/// Internal reasons a single decrypt failed. Logged, never returned.
#[derive(Debug, Error)]
enum OpenFailure {
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("authentication tag did not verify")]
    Authentication,
    #[error("plaintext is not valid UTF-8")]
    Utf8,
}

struct KeyMaterial {
    key: DerivedKey,
    legacy: Option<LegacySchedule>,
}

/// Encrypts and decrypts secret field values.
#[derive(Clone)]
pub struct FieldCodec {
    keys: Option<Arc<KeyMaterial>>,
}

impl FieldCodec {
    /// Build a codec from the configured passphrase.
    ///
    /// With `legacy_tokens` set, tokens written by the first-generation
    /// service are also accepted on decrypt.
    ///
    /// A missing or blank passphrase yields a codec on which every operation
    /// fails with [`CodecError::Configuration`].
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Configuration`] if scrypt itself fails.
    pub fn new(passphrase: Option<&str>, legacy_tokens: bool) -> Result<Self, CodecError> {
        let key = match passphrase.map(derive_key) {
            None | Some(Err(KdfError::EmptyPassphrase)) => {
                warn!("no encryption passphrase configured; field codec disabled");
                return Ok(Self::disabled());
            }
            Some(Err(e)) => {
                warn!(error = %e, "key derivation failed");
                return Err(CodecError::Configuration);
            }
            Some(Ok(key)) => key,
        };
        let legacy = legacy_tokens.then(|| LegacySchedule::from_key(&key));
        Ok(Self {
            keys: Some(Arc::new(KeyMaterial { key, legacy })),
        })
    }

    /// A codec with no key. Every operation fails with
    /// [`CodecError::Configuration`].
    pub fn disabled() -> Self {
        Self { keys: None }
    }

    /// Returns `true` if a key is available.
    pub fn is_configured(&self) -> bool {
        self.keys.is_some()
    }

    /// Encrypt one plaintext value into a token string.
    ///
    /// # Errors
    ///
    /// [`CodecError::Configuration`] without a key; [`CodecError::Encryption`]
    /// if the cipher refuses the input.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CodecError> {
        let keys = self.keys()?;
        let token = cipher::seal(&keys.key, plaintext.as_bytes()).map_err(|e| {
            warn!(error = %e, "field encryption failed");
            CodecError::Encryption
        })?;
        Ok(token.to_string())
    }

    /// Decrypt one token string back to its plaintext.
    ///
    /// # Errors
    ///
    /// [`CodecError::Configuration`] without a key; [`CodecError::Decryption`]
    /// for any malformed, tampered, or foreign token.
    pub fn decrypt(&self, token: &str) -> Result<String, CodecError> {
        let keys = self.keys()?;
        open(keys, token).map_err(|cause| {
            debug!(error = %cause, "field decryption failed");
            CodecError::Decryption
        })
    }

    /// Encrypt every value of `plain`. Fails as a whole if any value fails.
    ///
    /// # Errors
    ///
    /// See [`FieldCodec::encrypt`].
    pub fn encrypt_fields(&self, plain: &FieldValues) -> Result<FieldValues, CodecError> {
        self.keys()?;
        plain
            .iter()
            .map(|(name, value)| Ok((name.clone(), self.encrypt(value)?)))
            .collect()
    }

    /// Decrypt every token of `tokens`. One bad token fails the whole mapping;
    /// no partial result is ever returned.
    ///
    /// # Errors
    ///
    /// See [`FieldCodec::decrypt`].
    pub fn decrypt_fields(&self, tokens: &FieldValues) -> Result<FieldValues, CodecError> {
        self.keys()?;
        tokens
            .iter()
            .map(|(name, token)| {
                let value = self.decrypt(token).inspect_err(|_| {
                    warn!(field = %name, "stored field could not be decrypted");
                })?;
                Ok((name.clone(), value))
            })
            .collect()
    }

    fn keys(&self) -> Result<&KeyMaterial, CodecError> {
        self.keys.as_deref().ok_or(CodecError::Configuration)
    }
}

impl std::fmt::Debug for FieldCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldCodec")
            .field("configured", &self.is_configured())
            .finish()
    }
}

fn open(keys: &KeyMaterial, token: &str) -> Result<String, OpenFailure> {
    let token: SecretToken = token.parse()?;
    let plaintext = match cipher::open(&keys.key, &token) {
        Ok(p) => p,
        Err(CipherError::AeadFailure) => keys
            .legacy
            .as_ref()
            .ok_or(OpenFailure::Authentication)?
            .open(&token)
            .map_err(|_| OpenFailure::Authentication)?,
    };
    String::from_utf8(plaintext).map_err(|_| OpenFailure::Utf8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> FieldCodec {
        FieldCodec::new(Some("test-passphrase"), true).unwrap()
    }

    fn fields(pairs: &[(&str, &str)]) -> FieldValues {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn round_trips_awkward_plaintexts() {
        let codec = codec();
        for s in ["", "sk_live_123", "a:b:c", ":::", "pässwörd 🔑 秘密", "line\nbreak"] {
            let token = codec.encrypt(s).unwrap();
            assert_eq!(codec.decrypt(&token).unwrap(), s);
        }
    }

    #[test]
    fn token_has_three_hex_components() {
        let token = codec().encrypt("value").unwrap();
        let parts: Vec<&str> = token.split(':').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 32);
        assert_eq!(parts[1].len(), 32);
        assert_eq!(parts[2].len(), "value".len() * 2);
        assert!(parts.iter().all(|p| p.chars().all(|c| c.is_ascii_hexdigit())));
    }

    #[test]
    fn same_plaintext_encrypts_differently() {
        let codec = codec();
        let a = codec.encrypt("repeat").unwrap();
        let b = codec.encrypt("repeat").unwrap();
        assert_ne!(a, b);
        assert_eq!(codec.decrypt(&a).unwrap(), "repeat");
        assert_eq!(codec.decrypt(&b).unwrap(), "repeat");
    }

    #[test]
    fn every_single_bit_flip_is_detected() {
        let codec = codec();
        let token: SecretToken = codec.encrypt("flip").unwrap().parse().unwrap();

        let tag_len = token.tag.len();
        for byte in 0..tag_len + token.ciphertext.len() {
            for bit in 0..8 {
                let mut tampered = token.clone();
                if byte < tag_len {
                    tampered.tag[byte] ^= 1 << bit;
                } else {
                    tampered.ciphertext[byte - tag_len] ^= 1 << bit;
                }
                assert_eq!(
                    codec.decrypt(&tampered.to_string()),
                    Err(CodecError::Decryption),
                    "flip of bit {bit} in byte {byte} went undetected"
                );
            }
        }
    }

    #[test]
    fn malformed_tokens_fail_opaquely() {
        let codec = codec();
        for bad in ["", "not-a-token", "aa:bb", "aa:bb:cc:dd", "zz:zz:zz", "::"] {
            assert_eq!(codec.decrypt(bad), Err(CodecError::Decryption), "input: {bad:?}");
        }
    }

    #[test]
    fn wrong_passphrase_cannot_decrypt() {
        let token = codec().encrypt("mine").unwrap();
        let other = FieldCodec::new(Some("someone-else"), true).unwrap();
        assert_eq!(other.decrypt(&token), Err(CodecError::Decryption));
    }

    #[test]
    fn reads_tokens_from_both_generations() {
        let codec = codec();
        let current = "000102030405060708090a0b0c0d0e0f:5a93a3b2a542a8eef7911d1cd1de613e:37d7cbc94df7d2714ab891bda7d239";
        let legacy = "00112233445566778899aabbccddeeff:e54c82b035de3d4e8618ff9aa6257a5a:a8cd83b585b1d336f31b2d5c9f1cdc7c853f";
        let empty = "f0e0d0c0b0a090807060504030201000:5f055995b39d570b71aff5c30ffaec06:";
        assert_eq!(codec.decrypt(current).unwrap(), "sk_live_51H8xyz");
        assert_eq!(codec.decrypt(legacy).unwrap(), "ghp_legacyToken123");
        assert_eq!(codec.decrypt(empty).unwrap(), "");
    }

    #[test]
    fn legacy_tokens_rejected_when_disabled() {
        let codec = FieldCodec::new(Some("test-passphrase"), false).unwrap();
        let legacy = "00112233445566778899aabbccddeeff:e54c82b035de3d4e8618ff9aa6257a5a:a8cd83b585b1d336f31b2d5c9f1cdc7c853f";
        assert_eq!(codec.decrypt(legacy), Err(CodecError::Decryption));
    }

    #[test]
    fn fields_round_trip_with_same_key_set() {
        let codec = codec();
        let plain = fields(&[("api_key", "AKIA123"), ("secret", "s3cr3t"), ("region", "")]);
        let tokens = codec.encrypt_fields(&plain).unwrap();
        assert_eq!(tokens.keys().collect::<Vec<_>>(), plain.keys().collect::<Vec<_>>());
        assert_ne!(tokens["api_key"], "AKIA123");
        assert_eq!(codec.decrypt_fields(&tokens).unwrap(), plain);
    }

    #[test]
    fn one_bad_field_fails_the_whole_mapping() {
        let codec = codec();
        let mut tokens = FieldValues::new();
        tokens.insert("a".into(), codec.encrypt("x").unwrap());
        tokens.insert("b".into(), "not-a-token".into());
        assert_eq!(codec.decrypt_fields(&tokens), Err(CodecError::Decryption));
    }

    #[test]
    fn unconfigured_codec_fails_with_configuration() {
        for passphrase in [None, Some(""), Some("  ")] {
            let codec = FieldCodec::new(passphrase, true).unwrap();
            assert!(!codec.is_configured());
            assert_eq!(codec.encrypt("x"), Err(CodecError::Configuration));
            assert_eq!(codec.decrypt("aa:bb:cc"), Err(CodecError::Configuration));
            assert_eq!(
                codec.encrypt_fields(&fields(&[("k", "v")])),
                Err(CodecError::Configuration)
            );
            assert_eq!(
                codec.decrypt_fields(&fields(&[("k", "not-a-token")])),
                Err(CodecError::Configuration)
            );
        }
    }

    #[test]
    fn empty_mappings_need_a_key_too() {
        let codec = FieldCodec::new(None, false).unwrap();
        assert_eq!(codec.encrypt_fields(&FieldValues::new()), Err(CodecError::Configuration));
    }

    #[test]
    fn debug_does_not_leak_key() {
        let printed = format!("{:?}", codec());
        assert_eq!(printed, "FieldCodec { configured: true }");
    }
}
