use serde::Deserialize;

use crate::config::WebAuthnConfig;
use crate::passkey::errors::WebAuthnError;
use crate::utils::base64url_decode;

use super::challenge::{CHALLENGE_SIZE, Challenge};

pub(crate) const CLIENT_DATA_TYPE_CREATE: &str = "webauthn.create";
pub(crate) const CLIENT_DATA_TYPE_GET: &str = "webauthn.get";

/// `clientDataJSON` as produced by the browser.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientData {
    #[serde(rename = "type")]
    pub type_: String,
    pub challenge: String,
    pub origin: String,
    #[serde(default)]
    pub cross_origin: Option<bool>,
}

impl ClientData {
    pub fn decode(json: &[u8]) -> Result<Self, WebAuthnError> {
        serde_json::from_slice(json).map_err(|e| WebAuthnError::MalformedClientData(e.to_string()))
    }

    pub fn check_type(&self, expected: &str) -> Result<(), WebAuthnError> {
        if self.type_ != expected {
            return Err(WebAuthnError::ClientDataTypeMismatch {
                expected: expected.to_string(),
                actual: self.type_.clone(),
            });
        }
        Ok(())
    }

    /// The embedded challenge, which is always unpadded base64url.
    pub fn decode_challenge(&self) -> Result<Challenge, WebAuthnError> {
        let bytes =
            base64url_decode(&self.challenge).map_err(|_| WebAuthnError::InvalidChallengeEncoding)?;
        let bytes: [u8; CHALLENGE_SIZE] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| WebAuthnError::InvalidChallengeSize(bytes.len()))?;
        Ok(Challenge::from_bytes(bytes))
    }

    /// Origin and cross-origin policy applied by both ceremonies.
    pub(crate) fn check_origin(&self, config: &WebAuthnConfig) -> Result<(), WebAuthnError> {
        if !config.is_allowed_origin(&self.origin) {
            return Err(WebAuthnError::OriginMismatch(self.origin.clone()));
        }
        if self.cross_origin == Some(true) && !config.allow_cross_origin {
            return Err(WebAuthnError::CrossOriginNotAllowed);
        }
        Ok(())
    }
}
