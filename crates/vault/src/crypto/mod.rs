//! Encryption at rest for secret field values.
//!
//! This module is free of storage and HTTP dependencies. The storage layer
//! talks to it only through [`FieldCodec::encrypt_fields`] and
//! [`FieldCodec::decrypt_fields`].
//!
//! # Token format
//!
//! ```text
//! <hex(iv, 16 bytes)>:<hex(gcm tag, 16 bytes)>:<hex(ciphertext)>
//! ```
//!
//! AES-256-GCM, key = scrypt(passphrase, "salt"), associated data
//! `"SecureVault"`. Tokens written by the first-generation service share this
//! layout and are readable through [`legacy`].

pub mod cipher;
pub mod codec;
pub mod kdf;
pub mod legacy;
pub mod token;

pub use codec::{CodecError, FieldCodec, FieldValues};
