use aes_gcm::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng},
    Aes128Gcm, Key, Nonce,
};
use hkdf::Hkdf;
use p256::{ecdh::EphemeralSecret, elliptic_curve::sec1::ToEncodedPoint, PublicKey};
use sha2::Sha256;
use thiserror::Error;

/// Record size advertised in the `aes128gcm` header. Payloads are always a
/// single record.
pub const RECORD_SIZE: u32 = 4096;

const SALT_LEN: usize = 16;
const TAG_LEN: usize = 16;
const AUTH_SECRET_LEN: usize = 16;
const KEY_INFO_PREFIX: &[u8] = b"WebPush: info\0";
const CEK_INFO: &[u8] = b"Content-Encoding: aes128gcm\0";
const NONCE_INFO: &[u8] = b"Content-Encoding: nonce\0";
const LAST_RECORD_DELIMITER: u8 = 0x02;

#[derive(Debug, Error)]
pub enum EncryptionError {
    #[error("invalid subscription public key")]
    InvalidPublicKey,
    #[error("auth secret must be 16 bytes, got {0}")]
    InvalidAuthSecret(usize),
    #[error("payload of {0} bytes does not fit in one record")]
    PayloadTooLarge(usize),
    #[error("key derivation failed")]
    KeyDerivation,
    #[error("encryption failed")]
    Encryption,
}

/// Encrypts a push message body for one subscription (RFC 8291, `aes128gcm`).
///
/// `ua_public` is the subscription's `p256dh` point and `auth_secret` its
/// `auth` value, both raw bytes. A fresh sender key pair and salt are drawn
/// for every message; the returned bytes are the complete request body.
pub fn encrypt_payload(
    plaintext: &[u8],
    ua_public: &[u8],
    auth_secret: &[u8],
) -> Result<Vec<u8>, EncryptionError> {
    if plaintext.len() + 1 + TAG_LEN > RECORD_SIZE as usize {
        return Err(EncryptionError::PayloadTooLarge(plaintext.len()));
    }
    if auth_secret.len() != AUTH_SECRET_LEN {
        return Err(EncryptionError::InvalidAuthSecret(auth_secret.len()));
    }
    let ua_key = PublicKey::from_sec1_bytes(ua_public).map_err(|_| EncryptionError::InvalidPublicKey)?;

    let sender_secret = EphemeralSecret::random(&mut OsRng);
    let sender_public = sender_secret.public_key().to_encoded_point(false);
    let shared = sender_secret.diffie_hellman(&ua_key);

    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let key_info = key_info(ua_key.to_encoded_point(false).as_bytes(), sender_public.as_bytes());
    let ikm: [u8; 32] = hkdf_expand(auth_secret, shared.raw_secret_bytes().as_slice(), &key_info)?;
    let cek: [u8; 16] = hkdf_expand(&salt, &ikm, CEK_INFO)?;
    let nonce: [u8; 12] = hkdf_expand(&salt, &ikm, NONCE_INFO)?;

    let mut record = Vec::with_capacity(plaintext.len() + 1);
    record.extend_from_slice(plaintext);
    record.push(LAST_RECORD_DELIMITER);

    let cipher = Aes128Gcm::new(Key::<Aes128Gcm>::from_slice(&cek));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), record.as_slice())
        .map_err(|_| EncryptionError::Encryption)?;

    let key_id = sender_public.as_bytes();
    let mut body = Vec::with_capacity(SALT_LEN + 5 + key_id.len() + ciphertext.len());
    body.extend_from_slice(&salt);
    body.extend_from_slice(&RECORD_SIZE.to_be_bytes());
    body.push(key_id.len() as u8);
    body.extend_from_slice(key_id);
    body.extend_from_slice(&ciphertext);

    Ok(body)
}

fn key_info(ua_public: &[u8], sender_public: &[u8]) -> Vec<u8> {
    let mut info = Vec::with_capacity(KEY_INFO_PREFIX.len() + ua_public.len() + sender_public.len());
    info.extend_from_slice(KEY_INFO_PREFIX);
    info.extend_from_slice(ua_public);
    info.extend_from_slice(sender_public);
    info
}

fn hkdf_expand<const N: usize>(salt: &[u8], ikm: &[u8], info: &[u8]) -> Result<[u8; N], EncryptionError> {
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut okm = [0u8; N];
    hk.expand(info, &mut okm)
        .map_err(|_| EncryptionError::KeyDerivation)?;
    Ok(okm)
}
