//! Self-describing encrypted envelopes.
//!
//! Each call to `Envelope::seal` generates a fresh random salt and IV,
//! derives a one-off AES-256 key from the master key + salt, and
//! encrypts with AES-256-GCM.  The resulting envelope carries
//! everything needed to decrypt it later — salt, IV, auth tag,
//! ciphertext, and the KDF iteration count — so each envelope is
//! independently decryptable and config changes never orphan old
//! ciphertexts.
//!
//! Envelopes serialize to JSON with binary fields base64-encoded:
//!
//! ```json
//! {"version":1,"salt":"...","iv":"...","authTag":"...","ciphertext":"...","iterations":100000}
//! ```
//!
//! The `version` field tags the envelope format so a future cipher
//! migration can keep a fallback decrypt path for old blobs.

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{AesGcm, Nonce};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::crypto::kdf::{self, IV_LEN};
use crate::crypto::keys::MasterKey;
use crate::errors::{Result, VaultError};

/// AES-256-GCM with a 16-byte IV.
type Cipher = AesGcm<aes_gcm::aes::Aes256, U16>;

/// Current envelope format version.
pub const ENVELOPE_VERSION: u8 = 1;

/// Length of the GCM authentication tag in bytes.
const TAG_LEN: usize = 16;

/// A sealed secret: salt, IV, auth tag, and ciphertext, plus the KDF
/// parameters used to derive the encryption key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub version: u8,

    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub salt: Vec<u8>,

    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub iv: Vec<u8>,

    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub auth_tag: Vec<u8>,

    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub ciphertext: Vec<u8>,

    /// PBKDF2 iteration count used when this envelope was sealed.
    pub iterations: u32,
}

impl Envelope {
    /// Encrypt `plaintext` under `master_key` with fresh salt and IV.
    pub fn seal(plaintext: &str, master_key: &MasterKey, iterations: u32) -> Result<Self> {
        let salt = kdf::generate_salt();
        let iv = kdf::generate_iv();

        let mut key = kdf::derive_key(master_key.as_bytes(), &salt, iterations)?;

        let cipher = Cipher::new_from_slice(&key)
            .map_err(|e| VaultError::EncryptionFailed(format!("invalid key length: {e}")))?;

        let sealed = cipher
            .encrypt(Nonce::from_slice(&iv), plaintext.as_bytes())
            .map_err(|e| VaultError::EncryptionFailed(format!("cipher error: {e}")));
        key.zeroize();
        let mut sealed = sealed?;

        // The aead crate appends the 16-byte tag to the ciphertext;
        // split it back out so the envelope stores them separately.
        if sealed.len() < TAG_LEN {
            return Err(VaultError::EncryptionFailed(
                "cipher output shorter than auth tag".into(),
            ));
        }
        let auth_tag = sealed.split_off(sealed.len() - TAG_LEN);

        Ok(Self {
            version: ENVELOPE_VERSION,
            salt: salt.to_vec(),
            iv: iv.to_vec(),
            auth_tag,
            ciphertext: sealed,
            iterations,
        })
    }

    /// Decrypt this envelope with `master_key`.
    ///
    /// Fails closed: any tag mismatch, malformed field, or unknown
    /// version raises `DecryptionFailed` and no output is returned.
    pub fn open(&self, master_key: &MasterKey) -> Result<String> {
        if self.version != ENVELOPE_VERSION {
            return Err(VaultError::DecryptionFailed);
        }
        if self.iv.len() != IV_LEN || self.auth_tag.len() != TAG_LEN {
            return Err(VaultError::DecryptionFailed);
        }

        let mut key = kdf::derive_key(master_key.as_bytes(), &self.salt, self.iterations)
            .map_err(|_| VaultError::DecryptionFailed)?;

        let cipher = Cipher::new_from_slice(&key).map_err(|_| VaultError::DecryptionFailed);

        // Re-join ciphertext || tag for the aead API, then verify-and-decrypt.
        let mut combined = Vec::with_capacity(self.ciphertext.len() + TAG_LEN);
        combined.extend_from_slice(&self.ciphertext);
        combined.extend_from_slice(&self.auth_tag);

        let plaintext = cipher.and_then(|c| {
            c.decrypt(Nonce::from_slice(&self.iv), combined.as_slice())
                .map_err(|_| VaultError::DecryptionFailed)
        });
        key.zeroize();
        let plaintext = plaintext?;

        String::from_utf8(plaintext).map_err(|e| {
            let mut bad_bytes = e.into_bytes();
            bad_bytes.zeroize();
            VaultError::DecryptionFailed
        })
    }

    /// Serialize to the JSON string stored in `Credential::encrypted_data`.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| VaultError::Serialization(format!("envelope: {e}")))
    }

    /// Parse an envelope from its stored JSON string.
    ///
    /// A malformed blob fails closed as `DecryptionFailed` — the caller
    /// must never see partial structure.
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|_| VaultError::DecryptionFailed)
    }
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

pub(crate) fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let encoded = BASE64.encode(data);
    serializer.serialize_str(&encoded)
}

pub(crate) fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}
