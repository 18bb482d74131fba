// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Symmetric authenticated encryption for the credentials cookie.
//!
//! AES-256-GCM with a random 96-bit nonce per message. The wire format is
//! url-safe base64 (unpadded) of `nonce || ciphertext || tag`, so the output
//! can be used as a cookie value as-is.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};

const KEY_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    #[error("Encryption key must be 32 bytes long after base64 decoding")]
    InvalidKey,

    #[error("Encryption failed")]
    Encryption,

    #[error("Decryption failed")]
    Decryption,
}

/// Process-wide cookie cipher. The key never changes after construction.
#[derive(Clone)]
pub struct Cipher {
    key: [u8; KEY_LEN],
    rng: SystemRandom,
}

impl std::fmt::Debug for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cipher").finish_non_exhaustive()
    }
}

impl Cipher {
    /// Build a cipher from a url-safe base64 key (padding optional).
    pub fn from_base64_key(encoded: &str) -> Result<Self, CipherError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(encoded.trim().trim_end_matches('='))
            .map_err(|_| CipherError::InvalidKey)?;
        let key: [u8; KEY_LEN] = bytes.try_into().map_err(|_| CipherError::InvalidKey)?;
        Ok(Self {
            key,
            rng: SystemRandom::new(),
        })
    }

    fn sealing_key(&self) -> Result<LessSafeKey, CipherError> {
        let unbound = UnboundKey::new(&AES_256_GCM, &self.key).map_err(|_| CipherError::InvalidKey)?;
        Ok(LessSafeKey::new(unbound))
    }

    /// Encrypt a string. Empty input is returned unchanged.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| CipherError::Encryption)?;

        let mut in_out = plaintext.as_bytes().to_vec();
        self.sealing_key()?
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::empty(),
                &mut in_out,
            )
            .map_err(|_| CipherError::Encryption)?;

        let mut output = Vec::with_capacity(NONCE_LEN + in_out.len());
        output.extend_from_slice(&nonce_bytes);
        output.extend_from_slice(&in_out);
        Ok(URL_SAFE_NO_PAD.encode(output))
    }

    /// Decrypt a value produced by [`Cipher::encrypt`]. Empty input is returned
    /// unchanged; anything that fails authentication is an error.
    pub fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
        if ciphertext.is_empty() {
            return Ok(String::new());
        }

        let bytes = URL_SAFE_NO_PAD
            .decode(ciphertext)
            .map_err(|_| CipherError::Decryption)?;
        if bytes.len() < NONCE_LEN + AES_256_GCM.tag_len() {
            return Err(CipherError::Decryption);
        }

        let (nonce_bytes, sealed) = bytes.split_at(NONCE_LEN);
        let nonce =
            Nonce::try_assume_unique_for_key(nonce_bytes).map_err(|_| CipherError::Decryption)?;
        let mut in_out = sealed.to_vec();
        let plaintext = self
            .sealing_key()?
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| CipherError::Decryption)?;

        String::from_utf8(plaintext.to_vec()).map_err(|_| CipherError::Decryption)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "KioqKioqKioqKioqKioqKioqKioqKioqKioqKioqKio=";
    const OTHER_KEY: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

    #[test]
    fn test_roundtrip() {
        let cipher = Cipher::from_base64_key(KEY).unwrap();
        let plaintext = r#"{"access_token":"at","refresh_token":"rt"}"#;

        let encrypted = cipher.encrypt(plaintext).unwrap();
        assert_ne!(encrypted, plaintext);
        assert_eq!(cipher.decrypt(&encrypted).unwrap(), plaintext);
    }

    #[test]
    fn test_nonce_differs_between_calls() {
        let cipher = Cipher::from_base64_key(KEY).unwrap();
        assert_ne!(cipher.encrypt("same").unwrap(), cipher.encrypt("same").unwrap());
    }

    #[test]
    fn test_empty_passthrough() {
        let cipher = Cipher::from_base64_key(KEY).unwrap();
        assert_eq!(cipher.encrypt("").unwrap(), "");
        assert_eq!(cipher.decrypt("").unwrap(), "");
    }

    #[test]
    fn test_tampered_ciphertext_rejected() {
        let cipher = Cipher::from_base64_key(KEY).unwrap();
        let encrypted = cipher.encrypt("secret value").unwrap();

        let mut bytes = URL_SAFE_NO_PAD.decode(&encrypted).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let tampered = URL_SAFE_NO_PAD.encode(bytes);

        assert!(matches!(
            cipher.decrypt(&tampered),
            Err(CipherError::Decryption)
        ));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let cipher = Cipher::from_base64_key(KEY).unwrap();
        let other = Cipher::from_base64_key(OTHER_KEY).unwrap();
        let encrypted = cipher.encrypt("secret value").unwrap();

        assert!(matches!(
            other.decrypt(&encrypted),
            Err(CipherError::Decryption)
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        let cipher = Cipher::from_base64_key(KEY).unwrap();
        assert!(cipher.decrypt("not base64 !!").is_err());
        assert!(cipher.decrypt("c2hvcnQ").is_err());
    }

    #[test]
    fn test_key_length_validated() {
        assert!(matches!(
            Cipher::from_base64_key("c2hvcnQ="),
            Err(CipherError::InvalidKey)
        ));
        assert!(Cipher::from_base64_key("%%%").is_err());
    }
}
