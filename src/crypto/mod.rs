//! # Crypto Envelope (C3)
//!
//! Two modes: whole-buffer envelope encryption ([`envelope`]) for records,
//! sidecars, and the keys-record, and streaming chunked AEAD ([`stream`])
//! for file content. Key derivation and keys-record handling live in
//! [`keys`].

pub mod envelope;
pub mod keys;
pub mod stream;
