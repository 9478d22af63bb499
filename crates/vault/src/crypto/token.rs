//! Serialized form of one encrypted field value.
//!
//! ```text
//! <hex(iv)>:<hex(tag)>:<hex(ciphertext)>
//! ```
//!
//! The component order and the `:` delimiter are the durability contract for
//! every token already persisted; neither may change.

use std::{fmt, str::FromStr};

use thiserror::Error;

/// Byte length of the per-encryption initialization vector.
pub const IV_LEN: usize = 16;

/// Byte length of the GCM authentication tag.
pub const TAG_LEN: usize = 16;

/// Separator between token components. Never produced by hex encoding.
pub const DELIMITER: char = ':';

/// Reasons a string could not be parsed as a [`SecretToken`].
///
/// These are diagnostic only. Callers outside the codec see a single opaque
/// decryption failure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    /// The token did not split into exactly three components.
    #[error("malformed token: expected 3 components, found {0}")]
    ComponentCount(usize),

    /// A component is not valid hex.
    #[error("malformed token: {0} is not valid hex")]
    InvalidHex(&'static str),

    /// A fixed-size component decoded to the wrong number of bytes.
    #[error("malformed token: {component} must be {expected} bytes, got {actual}")]
    InvalidLength {
        component: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// A parsed token: IV, authentication tag, and ciphertext without the tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretToken {
    pub iv: [u8; IV_LEN],
    pub tag: [u8; TAG_LEN],
    pub ciphertext: Vec<u8>,
}

impl fmt::Display for SecretToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{DELIMITER}{}{DELIMITER}{}",
            hex::encode(self.iv),
            hex::encode(self.tag),
            hex::encode(&self.ciphertext),
        )
    }
}

impl FromStr for SecretToken {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(DELIMITER).collect();
        let &[iv, tag, ciphertext] = parts.as_slice() else {
            return Err(TokenError::ComponentCount(parts.len()));
        };

        Ok(Self {
            iv: decode_fixed(iv, "iv")?,
            tag: decode_fixed(tag, "tag")?,
            ciphertext: hex::decode(ciphertext).map_err(|_| TokenError::InvalidHex("ciphertext"))?,
        })
    }
}

fn decode_fixed<const N: usize>(s: &str, component: &'static str) -> Result<[u8; N], TokenError> {
    let bytes = hex::decode(s).map_err(|_| TokenError::InvalidHex(component))?;
    bytes.try_into().map_err(|b: Vec<u8>| TokenError::InvalidLength {
        component,
        expected: N,
        actual: b.len(),
    })
}
