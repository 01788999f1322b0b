//! Streaming mode (C3): per-chunk AEAD framing whose header (the random
//! nonce prefix the chunk was sealed under) is itself encrypted and
//! persisted separately from the ciphertext, so an attacker holding only
//! the content blobs cannot learn anything about how they were sealed.
//!
//! Each chunk is encrypted as a single STREAM "last block" frame
//! (`EncryptorBE32`/`DecryptorBE32` from `chacha20poly1305::aead::stream`)
//! rather than as multiple sub-frames, since content is already split into
//! right-sized chunks before this layer ever sees them (§4.3, §4.8.8).

use chacha20poly1305::aead::generic_array::GenericArray;
use chacha20poly1305::aead::stream::{DecryptorBE32, EncryptorBE32};
use chacha20poly1305::aead::KeyInit;
use chacha20poly1305::XChaCha20Poly1305;
use rand::RngCore;

use crate::crypto::envelope;
use crate::error::{CoreError, CoreResult};

/// Length of the random nonce prefix a chunk is sealed under (`XChaCha20Poly1305`
/// nonce size, 24, minus the 4-byte counter and 1-byte last-block flag STREAM reserves).
pub const NONCE_PREFIX_LEN: usize = 19;

/// Encrypted-header format in use. Stored in the file record's
/// `data.format` field so future revisions can coexist with old files.
pub const CHUNK_FORMAT_V1: u32 = 1;
/// Format of the aggregate-header blob's own outer encryption.
pub const HEADER_BLOB_FORMAT_V1: u32 = 1;

/// Encrypts one content chunk. Returns `(ciphertext, encrypted_header)`.
/// `aad` should bind the file's `uid` and the chunk index so blobs cannot
/// be swapped between files or reordered undetected.
pub fn encrypt_chunk(
    persistent_aead_key: &[u8],
    plaintext: &[u8],
    aad: &[u8],
) -> CoreResult<(Vec<u8>, Vec<u8>)> {
    let mut nonce_prefix = [0u8; NONCE_PREFIX_LEN];
    rand::rng().fill_bytes(&mut nonce_prefix);

    let cipher = cipher_from_key(persistent_aead_key)?;
    let encryptor = EncryptorBE32::from_aead(cipher, GenericArray::from_slice(&nonce_prefix));
    let ciphertext = encryptor
        .encrypt_last((plaintext, aad))
        .map_err(|e| CoreError::Crypto(format!("chunk encryption failed: {e}")))?;

    let encrypted_header = envelope::seal(persistent_aead_key, &nonce_prefix, aad)?;
    Ok((ciphertext, encrypted_header))
}

/// Decrypts one content chunk given its ciphertext and encrypted header.
pub fn decrypt_chunk(
    persistent_aead_key: &[u8],
    ciphertext: &[u8],
    encrypted_header: &[u8],
    aad: &[u8],
) -> CoreResult<Vec<u8>> {
    let nonce_prefix = envelope::open(persistent_aead_key, encrypted_header, aad)?;
    if nonce_prefix.len() != NONCE_PREFIX_LEN {
        return Err(CoreError::Corruption(
            "decrypted chunk header has the wrong length".into(),
        ));
    }
    let cipher = cipher_from_key(persistent_aead_key)?;
    let decryptor = DecryptorBE32::from_aead(cipher, GenericArray::from_slice(&nonce_prefix));
    decryptor
        .decrypt_last((ciphertext, aad))
        .map_err(|e| CoreError::Crypto(format!("chunk decryption failed: {e}")))
}

/// Seals the concatenation of every chunk's encrypted header into the
/// aggregate-header blob (the header-blob-specific sub-mode of §4.3).
pub fn seal_header_blob(persistent_aead_key: &[u8], concatenated_headers: &[u8]) -> CoreResult<Vec<u8>> {
    envelope::seal(persistent_aead_key, concatenated_headers, b"header-blob")
}

/// Opens an aggregate-header blob sealed by [`seal_header_blob`].
pub fn open_header_blob(persistent_aead_key: &[u8], sealed: &[u8]) -> CoreResult<Vec<u8>> {
    envelope::open(persistent_aead_key, sealed, b"header-blob")
}

fn cipher_from_key(key: &[u8]) -> CoreResult<XChaCha20Poly1305> {
    XChaCha20Poly1305::new_from_slice(key)
        .map_err(|e| CoreError::Crypto(format!("bad stream key: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_round_trips() {
        let key = [3u8; 32];
        let aad = b"uid:0";
        let (ct, header) = encrypt_chunk(&key, b"plaintext chunk", aad).unwrap();
        let pt = decrypt_chunk(&key, &ct, &header, aad).unwrap();
        assert_eq!(pt, b"plaintext chunk");
    }

    #[test]
    fn header_blob_round_trips_with_offsets() {
        let key = [5u8; 32];
        let (ct0, h0) = encrypt_chunk(&key, b"chunk-a", b"f:0").unwrap();
        let (ct1, h1) = encrypt_chunk(&key, b"chunk-b", b"f:1").unwrap();

        let mut concatenated = Vec::new();
        let mut offsets = vec![0usize];
        concatenated.extend_from_slice(&h0);
        offsets.push(concatenated.len());
        concatenated.extend_from_slice(&h1);
        offsets.push(concatenated.len());

        let sealed = seal_header_blob(&key, &concatenated).unwrap();
        let opened = open_header_blob(&key, &sealed).unwrap();

        let header0 = &opened[offsets[0]..offsets[1]];
        let header1 = &opened[offsets[1]..offsets[2]];
        assert_eq!(decrypt_chunk(&key, &ct0, header0, b"f:0").unwrap(), b"chunk-a");
        assert_eq!(decrypt_chunk(&key, &ct1, header1, b"f:1").unwrap(), b"chunk-b");
    }

    #[test]
    fn chunk_at_either_size_bound_encrypts() {
        let key = [8u8; 32];
        let small = vec![1u8; 1];
        let large = vec![2u8; 4 * 1024 * 1024];
        for chunk in [small, large] {
            let (ct, header) = encrypt_chunk(&key, &chunk, b"aad").unwrap();
            assert_eq!(decrypt_chunk(&key, &ct, &header, b"aad").unwrap(), chunk);
        }
    }
}
