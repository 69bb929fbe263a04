use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use base64::Engine;
use sha2::{Digest, Sha256};

const GCM_NONCE_LEN: usize = 12;

/// Symmetric sealing primitives over the node-local master key, plus one-time
/// sealing under a key derived from a job nonce. Sealed payloads travel as
/// base64 text with the random 12-byte GCM nonce prepended to the ciphertext.
pub struct Sealer {
    cipher: Aes256Gcm,
}

impl Sealer {
    /// Create from a base64-encoded 32-byte master key.
    pub fn new(key_base64: &str) -> Result<Self, SealError> {
        let key_bytes = base64::engine::general_purpose::STANDARD
            .decode(key_base64)
            .map_err(|_| SealError::InvalidKey)?;

        if key_bytes.len() != 32 {
            return Err(SealError::InvalidKey);
        }

        let cipher = Aes256Gcm::new_from_slice(&key_bytes).map_err(|_| SealError::InvalidKey)?;
        Ok(Self { cipher })
    }

    /// Seal under the master key.
    pub fn seal(&self, plaintext: &[u8]) -> Result<String, SealError> {
        seal_with_cipher(&self.cipher, plaintext)
    }

    /// Unseal a payload sealed under the master key.
    pub fn unseal(&self, sealed: &str) -> Result<Vec<u8>, SealError> {
        unseal_with_cipher(&self.cipher, sealed)
    }

    /// Seal under a one-time key derived from `key_material` (a job nonce).
    /// The same material must never seal two different payloads.
    pub fn seal_with_key(key_material: &str, plaintext: &[u8]) -> Result<String, SealError> {
        seal_with_cipher(&derived_cipher(key_material), plaintext)
    }

    /// Unseal a payload sealed with [`Sealer::seal_with_key`]. Fails hard when
    /// the material does not match; partial plaintext is never returned.
    pub fn unseal_with_key(key_material: &str, sealed: &str) -> Result<Vec<u8>, SealError> {
        unseal_with_cipher(&derived_cipher(key_material), sealed)
    }
}

fn derived_cipher(key_material: &str) -> Aes256Gcm {
    // The SHA-256 digest is exactly a 256-bit AES key.
    Aes256Gcm::new(&Sha256::digest(key_material.as_bytes()))
}

fn seal_with_cipher(cipher: &Aes256Gcm, plaintext: &[u8]) -> Result<String, SealError> {
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| SealError::SealFailed)?;

    let mut output = nonce.to_vec();
    output.extend(ciphertext);
    Ok(base64::engine::general_purpose::STANDARD.encode(output))
}

fn unseal_with_cipher(cipher: &Aes256Gcm, sealed: &str) -> Result<Vec<u8>, SealError> {
    let data = base64::engine::general_purpose::STANDARD
        .decode(sealed)
        .map_err(|_| SealError::UnsealFailed)?;

    if data.len() < GCM_NONCE_LEN {
        return Err(SealError::UnsealFailed);
    }

    let (nonce_bytes, ciphertext) = data.split_at(GCM_NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| SealError::UnsealFailed)
}

#[derive(Debug, thiserror::Error)]
pub enum SealError {
    #[error("invalid sealing key (must be 32 bytes, base64-encoded)")]
    InvalidKey,

    #[error("sealing failed")]
    SealFailed,

    #[error("unsealing failed")]
    UnsealFailed,
}
