//! Credential encryption at rest.
//!
//! AES-256-GCM with HKDF per-company key derivation: one master key,
//! per-company derived keys so a cross-company blob never decrypts.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use hkdf::Hkdf;
use sha2::Sha256;

use crate::error::{AdapterError, AdapterResult};
use crate::ids::CompanyId;

/// Length of AES-256 key in bytes.
const KEY_LENGTH: usize = 32;

/// Length of GCM nonce in bytes.
const NONCE_LENGTH: usize = 12;

/// Length of GCM authentication tag in bytes.
const TAG_LENGTH: usize = 16;

/// Context string for HKDF key derivation.
const HKDF_INFO: &[u8] = b"fieldsync-provider-credentials-v1";

/// Encrypts and decrypts credential blobs with company-derived keys.
#[derive(Clone)]
pub struct CredentialCipher {
    master_key: [u8; KEY_LENGTH],
}

impl CredentialCipher {
    /// Create a cipher from a 32-byte master key.
    #[must_use]
    pub fn new(master_key: [u8; KEY_LENGTH]) -> Self {
        Self { master_key }
    }

    /// Create a cipher from a hex-encoded master key.
    pub fn from_hex(hex_key: &str) -> AdapterResult<Self> {
        let bytes = hex::decode(hex_key).map_err(|e| AdapterError::EncryptionFailed {
            message: format!("invalid hex key: {e}"),
        })?;
        Self::from_bytes(&bytes)
    }

    /// Create a cipher from a base64-encoded master key.
    pub fn from_base64(b64_key: &str) -> AdapterResult<Self> {
        use base64::{engine::general_purpose::STANDARD, Engine};

        let bytes = STANDARD
            .decode(b64_key)
            .map_err(|e| AdapterError::EncryptionFailed {
                message: format!("invalid base64 key: {e}"),
            })?;
        Self::from_bytes(&bytes)
    }

    fn from_bytes(bytes: &[u8]) -> AdapterResult<Self> {
        if bytes.len() != KEY_LENGTH {
            return Err(AdapterError::EncryptionFailed {
                message: format!("key must be {} bytes, got {}", KEY_LENGTH, bytes.len()),
            });
        }
        let mut key = [0u8; KEY_LENGTH];
        key.copy_from_slice(bytes);
        Ok(Self::new(key))
    }

    /// Derive a company-specific key using HKDF with the company id as salt.
    fn derive_company_key(&self, company_id: CompanyId) -> [u8; KEY_LENGTH] {
        let hkdf = Hkdf::<Sha256>::new(Some(company_id.as_uuid().as_bytes()), &self.master_key);
        let mut derived = [0u8; KEY_LENGTH];
        // 32 bytes is always a valid HKDF-SHA256 output length.
        hkdf.expand(HKDF_INFO, &mut derived)
            .expect("HKDF-SHA256 supports 32-byte output");
        derived
    }

    /// Encrypt a blob for a company. Output layout: nonce || ciphertext || tag.
    pub fn encrypt(&self, company_id: CompanyId, plaintext: &[u8]) -> AdapterResult<Vec<u8>> {
        let key = self.derive_company_key(company_id);
        let cipher =
            Aes256Gcm::new_from_slice(&key).map_err(|e| AdapterError::EncryptionFailed {
                message: format!("failed to create cipher: {e}"),
            })?;

        use rand::rngs::OsRng;
        use rand::RngCore;
        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext =
            cipher
                .encrypt(nonce, plaintext)
                .map_err(|e| AdapterError::EncryptionFailed {
                    message: format!("encryption failed: {e}"),
                })?;

        let mut out = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Decrypt a blob for a company.
    pub fn decrypt(&self, company_id: CompanyId, blob: &[u8]) -> AdapterResult<Vec<u8>> {
        if blob.len() < NONCE_LENGTH + TAG_LENGTH {
            return Err(AdapterError::DecryptionFailed {
                message: "ciphertext too short".to_string(),
            });
        }

        let key = self.derive_company_key(company_id);
        let cipher =
            Aes256Gcm::new_from_slice(&key).map_err(|e| AdapterError::DecryptionFailed {
                message: format!("failed to create cipher: {e}"),
            })?;

        let (nonce_bytes, encrypted) = blob.split_at(NONCE_LENGTH);
        let nonce = Nonce::from_slice(nonce_bytes);

        cipher
            .decrypt(nonce, encrypted)
            .map_err(|e| AdapterError::DecryptionFailed {
                message: format!("decryption failed: {e}"),
            })
    }

    /// Encrypt a serde-serializable value as JSON.
    pub fn encrypt_json<T: serde::Serialize>(
        &self,
        company_id: CompanyId,
        value: &T,
    ) -> AdapterResult<Vec<u8>> {
        let json = serde_json::to_vec(value).map_err(|e| AdapterError::Serialization {
            message: format!("failed to serialize credentials: {e}"),
        })?;
        self.encrypt(company_id, &json)
    }

    /// Decrypt a blob into a serde-deserializable value.
    pub fn decrypt_json<T: serde::de::DeserializeOwned>(
        &self,
        company_id: CompanyId,
        blob: &[u8],
    ) -> AdapterResult<T> {
        let plaintext = self.decrypt(company_id, blob)?;
        serde_json::from_slice(&plaintext).map_err(|e| AdapterError::Serialization {
            message: format!("failed to deserialize credentials: {e}"),
        })
    }
}

impl std::fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCipher")
            .field("master_key", &"[REDACTED]")
            .finish()
    }
}

/// Generate a random master key. Intended for setup and tests.
#[must_use]
pub fn generate_master_key() -> [u8; KEY_LENGTH] {
    use rand::rngs::OsRng;
    use rand::RngCore;
    let mut key = [0u8; KEY_LENGTH];
    OsRng.fill_bytes(&mut key);
    key
}
