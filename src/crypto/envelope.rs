//! Envelope mode (C3): whole-buffer AEAD for records, sidecars, and the
//! keys-record. Framing is `nonce(24) || ciphertext || tag(16)`.

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use rand::RngCore;

use crate::error::{CoreError, CoreResult};

pub const NONCE_LEN: usize = 24;
pub const TAG_LEN: usize = 16;

/// Encrypts `plaintext` under `key` (32 bytes), binding `aad` into the tag.
/// Returns `nonce || ciphertext || tag`.
pub fn seal(key: &[u8], plaintext: &[u8], aad: &[u8]) -> CoreResult<Vec<u8>> {
    let cipher = cipher_from_key(key)?;
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::rng().fill_bytes(&mut nonce_bytes);
    let nonce = XNonce::from_slice(&nonce_bytes);
    let ciphertext = cipher
        .encrypt(
            nonce,
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| CoreError::Crypto(format!("envelope seal failed: {e}")))?;
    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypts a buffer produced by [`seal`]. Returns a typed `Crypto` error on
/// truncation or tamper (tag mismatch).
pub fn open(key: &[u8], sealed: &[u8], aad: &[u8]) -> CoreResult<Vec<u8>> {
    if sealed.len() < NONCE_LEN + TAG_LEN {
        return Err(CoreError::Crypto("sealed buffer truncated".into()));
    }
    let cipher = cipher_from_key(key)?;
    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
    let nonce = XNonce::from_slice(nonce_bytes);
    cipher
        .decrypt(
            nonce,
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|e| CoreError::Crypto(format!("envelope open failed: {e}")))
}

fn cipher_from_key(key: &[u8]) -> CoreResult<XChaCha20Poly1305> {
    if key.len() != 32 {
        return Err(CoreError::Crypto(format!(
            "envelope key must be 32 bytes, got {}",
            key.len()
        )));
    }
    XChaCha20Poly1305::new_from_slice(key)
        .map_err(|e| CoreError::Crypto(format!("bad envelope key: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let key = [7u8; 32];
        let sealed = seal(&key, b"hello world", b"aad").unwrap();
        let opened = open(&key, &sealed, b"aad").unwrap();
        assert_eq!(opened, b"hello world");
    }

    #[test]
    fn tamper_is_detected() {
        let key = [7u8; 32];
        let mut sealed = seal(&key, b"hello world", b"").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0xff;
        assert!(open(&key, &sealed, b"").is_err());
    }

    #[test]
    fn wrong_aad_is_rejected() {
        let key = [9u8; 32];
        let sealed = seal(&key, b"payload", b"ctx-a").unwrap();
        assert!(open(&key, &sealed, b"ctx-b").is_err());
    }

    #[test]
    fn empty_plaintext_round_trips() {
        let key = [1u8; 32];
        let sealed = seal(&key, b"", b"").unwrap();
        assert_eq!(open(&key, &sealed, b"").unwrap(), Vec::<u8>::new());
    }
}
