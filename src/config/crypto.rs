//! At-rest obfuscation of config documents.
//!
//! AES-256-GCM under a key compiled into the binary, random nonce per
//! write, stored as base64 of `nonce || ciphertext`. Anyone with the
//! binary can decode these files: this keeps casual readers and naive
//! editors out, it does not protect secrets. A deployment that needs
//! confidentiality should derive the key from host secret material.

use crate::error::{HubError, Result};
use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;

const NONCE_LEN: usize = 12;

const AT_REST_KEY: [u8; 32] = *b"hubctl/config-at-rest/v1\x00\x00\x00\x00\x00\x00\x00\x00";

fn cipher() -> Result<Aes256Gcm> {
    Aes256Gcm::new_from_slice(&AT_REST_KEY).map_err(|e| HubError::Crypto(e.to_string()))
}

pub fn encode(plain: &[u8]) -> Result<String> {
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);

    let sealed = cipher()?
        .encrypt(Nonce::from_slice(&nonce), plain)
        .map_err(|e| HubError::Crypto(e.to_string()))?;

    let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&sealed);
    Ok(STANDARD.encode(out))
}

pub fn decode(text: &str) -> Result<Vec<u8>> {
    let raw = STANDARD
        .decode(text.trim())
        .map_err(|e| HubError::Crypto(format!("not base64: {}", e)))?;
    if raw.len() <= NONCE_LEN {
        return Err(HubError::Crypto("payload too short".to_string()));
    }

    let (nonce, sealed) = raw.split_at(NONCE_LEN);
    cipher()?
        .decrypt(Nonce::from_slice(nonce), sealed)
        .map_err(|e| HubError::Crypto(e.to_string()))
}
