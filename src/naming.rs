//! # Name Hasher (C2)
//!
//! Deterministic keyed-hash obfuscation of a single path component: the
//! same component under the same naming key always maps to the same
//! fixed-length, filesystem-safe, case-stable token; different components
//! map to statistically unique tokens. Production code always hashes;
//! `plain_text_mode` (diagnostic builds only, see [`crate::config::Config`])
//! makes the function the identity.

use data_encoding::Encoding;
use data_encoding_macro::new_encoding;
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Custom base32 alphabet: lowercase-only (case stability, spec invariant 6)
/// and free of characters that are awkward across adapters (no padding, no
/// `=`/`+`/`/`).
const ALPHABET: Encoding = new_encoding! {
    symbols: "abcdefghijklmnopqrstuvwxyz234567",
    padding: None,
};

#[derive(Clone)]
pub struct NameHasher {
    hmac_key: Vec<u8>,
    plain_text_mode: bool,
}

impl NameHasher {
    pub fn new(hmac_key: impl Into<Vec<u8>>, plain_text_mode: bool) -> Self {
        Self {
            hmac_key: hmac_key.into(),
            plain_text_mode,
        }
    }

    /// Hashes a single path component. Same input -> same output, given the
    /// same naming key.
    pub fn hash_component(&self, component: &str) -> String {
        if self.plain_text_mode {
            log::warn!("plain_text_mode is active: path components are not hashed");
            return component.to_string();
        }
        let tag = self.tag(&pae(&[component.as_bytes()]));
        ALPHABET.encode(&tag)
    }

    /// Hashes an arbitrary already-PAE-encoded frame (used by the content
    /// blob locator over `(uid, chunkIndex)` and by name-recovery sidecar
    /// addressing over a hashed name). Always hashes, irrespective of
    /// `plain_text_mode`, since these are storage-internal addresses rather
    /// than the client-visible name itself.
    pub fn hash_frame(&self, frame: &[u8]) -> String {
        let tag = self.tag(frame);
        ALPHABET.encode(&tag)
    }

    /// Raw 160-bit tag, no encoding. Exposed for callers building their own
    /// PAE frames (content blob locator, name-recovery sidecar locator).
    pub fn tag(&self, frame: &[u8]) -> [u8; 20] {
        let mut mac = <HmacSha1 as Mac>::new_from_slice(&self.hmac_key)
            .expect("HMAC accepts keys of any length");
        mac.update(frame);
        let out = mac.finalize().into_bytes();
        out.into()
    }
}

/// Pre-authentication encoding: a length-prefixed framing of a sequence of
/// byte strings. Domain-separates distinct derivations so that no
/// single-component input can collide with the concatenation used by
/// another derivation (e.g. `(uid, chunkIndex)`).
pub fn pae(pieces: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(pieces.len() as u64).to_le_bytes());
    for piece in pieces {
        out.extend_from_slice(&(piece.len() as u64).to_le_bytes());
        out.extend_from_slice(piece);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_and_case_stable() {
        let hasher = NameHasher::new(b"a naming key".to_vec(), false);
        let a = hasher.hash_component("Documents");
        let b = hasher.hash_component("Documents");
        assert_eq!(a, b);
        assert_eq!(a, a.to_lowercase());
    }

    #[test]
    fn different_inputs_differ() {
        let hasher = NameHasher::new(b"a naming key".to_vec(), false);
        assert_ne!(hasher.hash_component("a"), hasher.hash_component("b"));
    }

    #[test]
    fn plain_text_mode_is_identity() {
        let hasher = NameHasher::new(b"irrelevant".to_vec(), true);
        assert_eq!(hasher.hash_component("literal"), "literal");
    }

    #[test]
    fn pae_prevents_trivial_concatenation_collisions() {
        let a = pae(&[b"ab", b"c"]);
        let b = pae(&[b"a", b"bc"]);
        assert_ne!(a, b);
    }

    #[test]
    fn unicode_component_hashes() {
        let hasher = NameHasher::new(b"k".to_vec(), false);
        let tag = hasher.hash_component("café 名前-file_1.2");
        assert_eq!(tag, hasher.hash_component("café 名前-file_1.2"));
    }
}
