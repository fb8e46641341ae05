//! The reversible transform applied to record values flagged `encrypt`.
//!
//! Key derivation: HKDF-SHA256(salt, key_material) -> 256-bit AES key
//! Encryption: AES-256-GCM with random 12-byte nonce
//! Body format: base64(nonce (12 bytes) || ciphertext (includes GCM tag))
//!
//! Key material is whatever the operator stored in the reserved `key`
//! record; HKDF normalizes it to key length, so any non-empty byte string
//! works. Non-deterministic (fresh nonce per call), reversible given the
//! same key material.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hkdf::Hkdf;
use rand::Rng;
use sha2::Sha256;

/// Salt for HKDF key derivation (domain separation)
const HKDF_SALT: &[u8] = b"metadata-value-key-v1";

/// Info string for HKDF key derivation (purpose binding)
const HKDF_INFO: &[u8] = b"metadata-server-value-encryption";

#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("encrypted body is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("encrypted body too short (< 12 bytes)")]
    Truncated,

    #[error("cipher operation failed")]
    Cipher,

    #[error("decrypted value is not valid UTF-8")]
    NotText,
}

/// Derive the AES-256-GCM key from operator-supplied key material.
fn derive_key(key_material: &[u8]) -> Key<Aes256Gcm> {
    let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), key_material);
    let mut okm = [0u8; 32];
    hk.expand(HKDF_INFO, &mut okm)
        .expect("HKDF expand should not fail for 32-byte output");
    Key::<Aes256Gcm>::from(okm)
}

/// Encrypt a record value for transport. Returns the response body:
/// base64 over `nonce || ciphertext`.
pub fn encrypt_value(key_material: &[u8], plaintext: &str) -> Result<String, TransformError> {
    let key = derive_key(key_material);
    let cipher = Aes256Gcm::new(&key);
    let nonce_bytes: [u8; 12] = rand::rng().random();
    let nonce = Nonce::from_slice(&nonce_bytes);
    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|_| TransformError::Cipher)?;

    let mut sealed = Vec::with_capacity(12 + ciphertext.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(sealed))
}

/// Invert [`encrypt_value`] given the same key material. Not used by the
/// request path; exists for consumers of encrypted responses and tests.
pub fn decrypt_value(key_material: &[u8], body: &str) -> Result<String, TransformError> {
    let sealed = STANDARD.decode(body)?;
    if sealed.len() < 12 {
        return Err(TransformError::Truncated);
    }
    let key = derive_key(key_material);
    let cipher = Aes256Gcm::new(&key);
    let nonce = Nonce::from_slice(&sealed[..12]);
    let plaintext = cipher
        .decrypt(nonce, &sealed[12..])
        .map_err(|_| TransformError::Cipher)?;
    String::from_utf8(plaintext).map_err(|_| TransformError::NotText)
}
