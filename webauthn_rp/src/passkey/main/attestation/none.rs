use crate::passkey::errors::WebAuthnError;

use super::object::AttestationObject;

/// "none" carries no proof, so there is nothing to check in `attStmt`.
pub(super) fn verify_none_attestation(
    attestation: &AttestationObject,
) -> Result<(), WebAuthnError> {
    if !attestation.att_stmt.is_empty() {
        tracing::debug!(
            "Ignoring {} attStmt entries of 'none' attestation",
            attestation.att_stmt.len()
        );
    }
    Ok(())
}
