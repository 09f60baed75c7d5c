use ring::digest;

use crate::passkey::errors::WebAuthnError;

use super::none::verify_none_attestation;
use super::object::AttestationObject;
use super::packed::verify_packed_attestation;

/// Verifies the attestation statement for its declared format.
///
/// The set of formats is closed: anything other than "none" and "packed"
/// is refused rather than accepted without checking.
pub fn verify_attestation(
    attestation: &AttestationObject,
    client_data_json: &[u8],
) -> Result<(), WebAuthnError> {
    let client_data_hash = digest::digest(&digest::SHA256, client_data_json);

    match attestation.fmt.as_str() {
        "none" => {
            tracing::debug!("Using 'none' attestation format");
            verify_none_attestation(attestation)
        }
        "packed" => {
            tracing::debug!("Using 'packed' attestation format");
            verify_packed_attestation(attestation, client_data_hash.as_ref())
        }
        other => Err(WebAuthnError::UnsupportedAttestationFormat(
            other.to_string(),
        )),
    }
}
