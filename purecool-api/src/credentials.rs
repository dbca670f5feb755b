//! Decryption of the per-device credential carried in the cloud manifest
//!
//! The manifest ships each device's local broker password as base64 text
//! encrypted with AES-256-CBC under a key that is fixed and public, with an
//! all-zero IV. The plaintext is a small JSON envelope whose `apPasswordHash`
//! field is the password the broker expects.

use aes::Aes256;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, KeyIvInit};
use serde::Deserialize;

use crate::error::{ApiError, Result};

type Aes256CbcDec = cbc::Decryptor<Aes256>;

const CREDENTIAL_KEY: [u8; 32] = [
    0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f, 0x10,
    0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1a, 0x1b, 0x1c, 0x1d, 0x1e, 0x1f, 0x20,
];

const CREDENTIAL_IV: [u8; 16] = [0u8; 16];

#[derive(Deserialize)]
struct CredentialEnvelope {
    #[serde(rename = "apPasswordHash")]
    ap_password_hash: String,
}

/// Decrypt a manifest credential blob into the broker password.
///
/// # Errors
///
/// Returns `ApiError::CredentialDecode` if the blob is not valid base64, does
/// not decrypt to correctly padded data, or does not contain the expected
/// JSON envelope. No partial password is ever returned.
///
/// # Examples
///
/// ```
/// use purecool_api::credentials::decrypt_password;
///
/// let blob = concat!(
///     "1/aJ5t52WvAfn+z+fjDuef86kQDQPefbQ6/70ZGysII1Ke1i0Z",
///     "HakFH84DZuxsSQ4KTT2vbCm7uYeTORULKLKQ==",
/// );
/// assert_eq!(decrypt_password(blob).unwrap(), "password1");
/// ```
pub fn decrypt_password(blob: &str) -> Result<String> {
    let ciphertext = STANDARD
        .decode(blob.trim())
        .map_err(|e| ApiError::CredentialDecode(format!("invalid base64: {}", e)))?;

    let plaintext = Aes256CbcDec::new(&CREDENTIAL_KEY.into(), &CREDENTIAL_IV.into())
        .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
        .map_err(|_| ApiError::CredentialDecode("decryption failed".to_string()))?;

    let envelope: CredentialEnvelope = serde_json::from_slice(&plaintext)
        .map_err(|e| ApiError::CredentialDecode(format!("invalid credential envelope: {}", e)))?;

    Ok(envelope.ap_password_hash)
}
