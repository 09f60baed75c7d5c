use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use ring::rand::SecureRandom;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum UtilError {
    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Invalid format: {0}")]
    Format(String),
}

pub fn base64url_decode(input: &str) -> Result<Vec<u8>, UtilError> {
    let decoded = URL_SAFE_NO_PAD
        .decode(input)
        .map_err(|_| UtilError::Format("Failed to decode base64url".to_string()))?;
    Ok(decoded)
}

pub fn base64url_encode(input: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(input)
}

/// Fills a fixed-size array from the system CSPRNG.
pub(crate) fn gen_random_bytes<const N: usize>() -> Result<[u8; N], UtilError> {
    let rng = ring::rand::SystemRandom::new();
    let mut bytes = [0u8; N];
    rng.fill(&mut bytes)
        .map_err(|_| UtilError::Crypto("Failed to generate random bytes".to_string()))?;
    Ok(bytes)
}

/// String transport for binary values exchanged with the client.
///
/// Challenges, credential ids and the raw response buffers travel as strings.
/// The default is unpadded base64url, which is what browsers produce.
pub trait Codec: Send + Sync {
    fn encode_to_string(&self, bytes: &[u8]) -> String;
    fn decode_string(&self, s: &str) -> Result<Vec<u8>, UtilError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Base64UrlCodec;

impl Codec for Base64UrlCodec {
    fn encode_to_string(&self, bytes: &[u8]) -> String {
        base64url_encode(bytes)
    }

    fn decode_string(&self, s: &str) -> Result<Vec<u8>, UtilError> {
        base64url_decode(s)
    }
}
