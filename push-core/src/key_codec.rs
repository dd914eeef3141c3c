use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use thiserror::Error;

/// Standard alphabet that ignores non-zero bits after the last full byte,
/// as `atob` does.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

#[derive(Debug, Error)]
pub enum KeyCodecError {
    #[error("invalid base64 key: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}

/// Decodes a base64url application server key into the raw bytes a push
/// channel is opened with.
///
/// Input is padded with `=` to a multiple of four and translated to the
/// standard alphabet before decoding, so both padded and unpadded keys are
/// accepted.
pub fn url_base64_to_bytes(input: &str) -> Result<Vec<u8>, KeyCodecError> {
    let padding = (4 - input.len() % 4) % 4;
    let mut standard = String::with_capacity(input.len() + padding);
    for c in input.chars() {
        standard.push(match c {
            '-' => '+',
            '_' => '/',
            other => other,
        });
    }
    standard.extend(std::iter::repeat('=').take(padding));

    Ok(LENIENT.decode(standard)?)
}

/// Standard base64 form used for persisted `p256dh` and `auth` values.
pub fn encode_key(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Reads a persisted key back; tolerates records written with the url-safe
/// alphabet by other clients.
pub fn decode_key(value: &str) -> Result<Vec<u8>, KeyCodecError> {
    match STANDARD.decode(value) {
        Ok(bytes) => Ok(bytes),
        Err(_) => Ok(URL_SAFE_NO_PAD.decode(value.trim_end_matches('='))?),
    }
}
