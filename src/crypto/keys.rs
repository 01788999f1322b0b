//! Key hierarchy (C3 support). Derives, once at init, the intermediate
//! envelope/HMAC keys used only to read/write the keys-record, then
//! materializes (or generates) the persistent AEAD and HMAC keys used for
//! everything else. This lets the externally supplied derivation key and
//! the root folder name rotate independently of all stored content.

use hkdf::Hkdf;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::config::Config;
use crate::crypto::envelope;
use crate::error::{CoreError, CoreResult};

const KEY_LEN: usize = 32;

/// Keys derived directly from the externally supplied derivation key.
/// Used only to encrypt/decrypt the keys-record at the storage root.
pub struct IntermediateKeys {
    pub envelope_key: Zeroizing<Vec<u8>>,
    pub naming_key: Zeroizing<Vec<u8>>,
}

/// The keys actually used for all subsequent tree/lookup/content operations.
/// Materialized from the keys-record: random on first init, persisted
/// (envelope-encrypted under the intermediate keys) thereafter.
#[derive(Clone)]
pub struct PersistentKeys {
    pub aead_key: Zeroizing<Vec<u8>>,
    pub hmac_key: Zeroizing<Vec<u8>>,
}

/// On-disk payload of the keys-record, after envelope decryption.
#[derive(Serialize, Deserialize)]
struct KeysRecordPayload {
    #[serde(with = "hex")]
    aead_key: Vec<u8>,
    #[serde(with = "hex")]
    hmac_key: Vec<u8>,
}

/// Derives the intermediate keys from the externally supplied derivation
/// key, domain-separated by the configured labels via HKDF-SHA256.
pub fn derive_intermediate_keys(derivation_key: &[u8], config: &Config) -> IntermediateKeys {
    let hk = Hkdf::<Sha256>::new(None, derivation_key);

    let mut envelope_key = Zeroizing::new(vec![0u8; KEY_LEN]);
    hk.expand(&config.crypt_label, &mut envelope_key)
        .expect("32 bytes is a valid HKDF-SHA256 output length");

    let mut naming_key = Zeroizing::new(vec![0u8; KEY_LEN]);
    hk.expand(&config.hmac_label, &mut naming_key)
        .expect("32 bytes is a valid HKDF-SHA256 output length");

    IntermediateKeys {
        envelope_key,
        naming_key,
    }
}

/// Generates fresh, random persistent key material (first init).
pub fn generate_persistent_keys() -> PersistentKeys {
    let mut aead_key = Zeroizing::new(vec![0u8; KEY_LEN]);
    rand::rng().fill_bytes(&mut aead_key);
    let mut hmac_key = Zeroizing::new(vec![0u8; KEY_LEN]);
    rand::rng().fill_bytes(&mut hmac_key);
    PersistentKeys {
        aead_key,
        hmac_key,
    }
}

/// Encrypts the persistent keys into the keys-record payload, under the
/// intermediate envelope key.
pub fn seal_keys_record(intermediate: &IntermediateKeys, persistent: &PersistentKeys) -> CoreResult<Vec<u8>> {
    let payload = KeysRecordPayload {
        aead_key: persistent.aead_key.to_vec(),
        hmac_key: persistent.hmac_key.to_vec(),
    };
    let json = serde_json::to_vec(&payload)?;
    envelope::seal(&intermediate.envelope_key, &json, b"keys-record")
}

/// Decrypts and parses an existing keys-record.
pub fn open_keys_record(intermediate: &IntermediateKeys, sealed: &[u8]) -> CoreResult<PersistentKeys> {
    let json = envelope::open(&intermediate.envelope_key, sealed, b"keys-record")?;
    let payload: KeysRecordPayload = serde_json::from_slice(&json)?;
    if payload.aead_key.len() != KEY_LEN || payload.hmac_key.len() != KEY_LEN {
        return Err(CoreError::Corruption(
            "keys-record key material has the wrong length".into(),
        ));
    }
    Ok(PersistentKeys {
        aead_key: Zeroizing::new(payload.aead_key),
        hmac_key: Zeroizing::new(payload.hmac_key),
    })
}

mod hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Vec<u8>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_record_round_trips() {
        let config = Config::default();
        let intermediate = derive_intermediate_keys(b"a derivation key", &config);
        let persistent = generate_persistent_keys();

        let sealed = seal_keys_record(&intermediate, &persistent).unwrap();
        let reopened = open_keys_record(&intermediate, &sealed).unwrap();

        assert_eq!(reopened.aead_key.as_slice(), persistent.aead_key.as_slice());
        assert_eq!(reopened.hmac_key.as_slice(), persistent.hmac_key.as_slice());
    }

    #[test]
    fn derivation_is_deterministic_per_derivation_key() {
        let config = Config::default();
        let a = derive_intermediate_keys(b"same key", &config);
        let b = derive_intermediate_keys(b"same key", &config);
        assert_eq!(a.envelope_key.as_slice(), b.envelope_key.as_slice());
        assert_eq!(a.naming_key.as_slice(), b.naming_key.as_slice());
    }
}
