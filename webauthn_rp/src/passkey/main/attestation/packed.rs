use uuid::Uuid;
use x509_parser::certificate::X509Certificate;
use x509_parser::extensions::ParsedExtension;
use x509_parser::prelude::FromDer;
use x509_parser::time::ASN1Time;
use x509_parser::x509::X509Version;

use crate::passkey::errors::WebAuthnError;
use crate::passkey::main::keys::{KeyType, PublicKey};
use crate::passkey::main::signature::verify_message;

use super::object::AttestationObject;
use super::utils::{get_cert_chain, get_sig_from_stmt, stmt_value};

// id-fido-gen-ce-aaguid
const OID_FIDO_GEN_CE_AAGUID: &str = "1.3.6.1.4.1.45724.1.1.4";
const ATTESTATION_OU: &str = "Authenticator Attestation";

fn invalid(msg: impl Into<String>) -> WebAuthnError {
    WebAuthnError::AttestationInvalid(msg.into())
}

/// Verifies a packed attestation statement
///
/// # Arguments
/// * `attestation` - The decoded attestation object
/// * `client_data_hash` - SHA-256 of `clientDataJSON`
///
/// # Errors
/// * `WebAuthnError::AttestationInvalid` - If the statement or certificate fails any check
/// * `WebAuthnError::MissingAttestedCredential` - If self attestation has no credential key
///   to check against
pub(super) fn verify_packed_attestation(
    attestation: &AttestationObject,
    client_data_hash: &[u8],
) -> Result<(), WebAuthnError> {
    let (alg, sig) = get_sig_from_stmt(&attestation.att_stmt)?;
    let alg = KeyType(alg);

    let mut signed_data =
        Vec::with_capacity(attestation.raw_auth_data.len() + client_data_hash.len());
    signed_data.extend_from_slice(&attestation.raw_auth_data);
    signed_data.extend_from_slice(client_data_hash);

    if stmt_value(&attestation.att_stmt, "ecdaaKeyId").is_some() {
        return Err(invalid("ECDAA attestation not supported"));
    }

    match get_cert_chain(&attestation.att_stmt)? {
        Some(x5c) => {
            tracing::debug!("Full attestation with certificate chain of {}", x5c.len());

            let (_, cert) = X509Certificate::from_der(&x5c[0])
                .map_err(|e| invalid(format!("Failed to parse attestation certificate: {e}")))?;
            let cert_key = PublicKey::from_spki(cert.public_key())
                .map_err(|e| invalid(format!("attestation certificate key: {e}")))?;

            check_signature(&cert_key, alg, &sig, &signed_data)?;
            verify_packed_attestation_cert(&cert, attestation)?;
        }
        None => {
            tracing::debug!("Self attestation");

            let attested = attestation
                .auth_data
                .attested_credential
                .as_ref()
                .ok_or(WebAuthnError::MissingAttestedCredential)?;
            let (credential_key, credential_alg) = attested.public_key()?;
            if alg != credential_alg {
                return Err(invalid(format!(
                    "self attestation alg {} does not match credential alg {}",
                    alg.0, credential_alg.0
                )));
            }
            check_signature(&credential_key, alg, &sig, &signed_data)?;
        }
    }

    Ok(())
}

fn check_signature(
    key: &PublicKey,
    alg: KeyType,
    sig: &[u8],
    signed_data: &[u8],
) -> Result<(), WebAuthnError> {
    match verify_message(key, alg, sig, signed_data) {
        Ok(true) => Ok(()),
        Ok(false) => Err(invalid("Attestation signature invalid")),
        Err(e) => Err(invalid(format!("Attestation signature unverifiable: {e}"))),
    }
}

fn verify_packed_attestation_cert(
    cert: &X509Certificate,
    attestation: &AttestationObject,
) -> Result<(), WebAuthnError> {
    if cert.version() != X509Version::V3 {
        return Err(invalid("Attestation certificate must be version 3"));
    }

    let has_attestation_ou = cert
        .subject()
        .iter_organizational_unit()
        .any(|ou| ou.as_str().is_ok_and(|s| s == ATTESTATION_OU));
    if !has_attestation_ou {
        return Err(invalid(format!(
            "Certificate subject OU must be '{ATTESTATION_OU}'"
        )));
    }

    // Check that it's not a CA certificate
    let basic_constraints = cert
        .get_extension_unique(&oid_registry::OID_X509_EXT_BASIC_CONSTRAINTS)
        .map_err(|e| invalid(format!("Invalid basic constraints: {e}")))?;
    if let Some(ext) = basic_constraints {
        if let ParsedExtension::BasicConstraints(bc) = ext.parsed_extension() {
            if bc.ca {
                return Err(invalid("Certificate must not be a CA certificate"));
            }
        }
    }

    let now = ASN1Time::from_timestamp(chrono::Utc::now().timestamp())
        .map_err(|e| invalid(format!("Failed to convert time: {e}")))?;
    if !cert.validity().is_valid_at(now) {
        return Err(invalid("Attestation certificate is not currently valid"));
    }

    if let Some(fido_ext) = cert
        .extensions()
        .iter()
        .find(|ext| ext.oid.to_id_string() == OID_FIDO_GEN_CE_AAGUID)
    {
        if fido_ext.critical {
            return Err(invalid("AAGUID extension must not be critical"));
        }

        // OCTET STRING (0x04) of length 16 (0x10)
        let value = fido_ext.value;
        if value.len() != 18 || value[0] != 0x04 || value[1] != 0x10 {
            return Err(invalid("Malformed AAGUID extension"));
        }
        let cert_aaguid = &value[2..];

        let attested = attestation
            .auth_data
            .attested_credential
            .as_ref()
            .ok_or(WebAuthnError::MissingAttestedCredential)?;
        tracing::debug!(
            "Authenticator AAGUID: {}, certificate AAGUID: {:?}",
            attested.aaguid_string(),
            Uuid::from_slice(cert_aaguid).map(|u| u.hyphenated().to_string())
        );

        if attested.aaguid[..] != cert_aaguid[..] {
            return Err(invalid(
                "AAGUID mismatch between certificate and authenticator data",
            ));
        }
    }

    Ok(())
}
