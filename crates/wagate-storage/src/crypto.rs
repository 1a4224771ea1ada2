// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AES-256-GCM sealing of device blobs.
//!
//! Every [`seal`] draws a fresh 96-bit nonce from the system CSPRNG.

use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};
use wagate_core::WagateError;

fn crypto_err(message: &str) -> WagateError {
    WagateError::Storage {
        source: message.to_string().into(),
    }
}

fn cipher(key: &[u8; 32]) -> Result<LessSafeKey, WagateError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key)
        .map_err(|_| crypto_err("failed to create AES-256-GCM key"))?;
    Ok(LessSafeKey::new(unbound))
}

/// Encrypt `plaintext`, returning `(ciphertext_with_tag, nonce)`.
pub fn seal(key: &[u8; 32], plaintext: &[u8]) -> Result<(Vec<u8>, [u8; NONCE_LEN]), WagateError> {
    let sealing = cipher(key)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    SystemRandom::new()
        .fill(&mut nonce_bytes)
        .map_err(|_| crypto_err("failed to generate random nonce"))?;

    let mut in_out = plaintext.to_vec();
    sealing
        .seal_in_place_append_tag(
            Nonce::assume_unique_for_key(nonce_bytes),
            Aad::empty(),
            &mut in_out,
        )
        .map_err(|_| crypto_err("device blob encryption failed"))?;

    Ok((in_out, nonce_bytes))
}

/// Decrypt a blob produced by [`seal`]. A wrong key, a malformed nonce or
/// tampered ciphertext all fail.
pub fn open(key: &[u8; 32], nonce: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, WagateError> {
    let nonce: [u8; NONCE_LEN] = nonce
        .try_into()
        .map_err(|_| crypto_err("stored nonce has the wrong length"))?;
    let opening = cipher(key)?;

    let mut in_out = ciphertext.to_vec();
    let plaintext = opening
        .open_in_place(Nonce::assume_unique_for_key(nonce), Aad::empty(), &mut in_out)
        .map_err(|_| crypto_err("device blob decryption failed: wrong key or corrupted data"))?;
    Ok(plaintext.to_vec())
}

/// A random 32-byte key.
pub fn generate_key() -> Result<[u8; 32], WagateError> {
    let mut key = [0u8; 32];
    SystemRandom::new()
        .fill(&mut key)
        .map_err(|_| crypto_err("failed to generate random key"))?;
    Ok(key)
}
