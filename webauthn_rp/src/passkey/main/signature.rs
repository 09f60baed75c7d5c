use ring::digest;
use ring::signature::{
    ECDSA_P256_SHA256_ASN1, ECDSA_P384_SHA384_ASN1, RSA_PKCS1_2048_8192_SHA256,
    RSA_PKCS1_2048_8192_SHA384, RSA_PKCS1_2048_8192_SHA512, RSA_PSS_2048_8192_SHA256,
    RSA_PSS_2048_8192_SHA384, RSA_PSS_2048_8192_SHA512, RsaParameters, RsaPublicKeyComponents,
    UnparsedPublicKey,
};

use crate::passkey::errors::WebAuthnError;

use super::keys::{Curve, HashAlg, KeyType, PublicKey, SignatureScheme};

/// Verifies a WebAuthn signature over `authenticatorData || SHA-256(clientDataJSON)`.
///
/// Returns `Ok(false)` when the signature simply does not verify. Errors are
/// reserved for keys and algorithms that cannot be checked at all.
pub fn verify_signature(
    public_key: &PublicKey,
    alg: KeyType,
    signature: &[u8],
    client_data_json: &[u8],
    authenticator_data: &[u8],
) -> Result<bool, WebAuthnError> {
    let client_data_hash = digest::digest(&digest::SHA256, client_data_json);
    let mut signed_data = Vec::with_capacity(authenticator_data.len() + 32);
    signed_data.extend_from_slice(authenticator_data);
    signed_data.extend_from_slice(client_data_hash.as_ref());

    verify_message(public_key, alg, signature, &signed_data)
}

/// Verifies `signature` over an arbitrary message with the hash `alg` selects.
pub(crate) fn verify_message(
    public_key: &PublicKey,
    alg: KeyType,
    signature: &[u8],
    message: &[u8],
) -> Result<bool, WebAuthnError> {
    let params = alg
        .params()
        .ok_or_else(|| WebAuthnError::UnsupportedAlgorithm(format!("COSE algorithm {}", alg.0)))?;
    if !alg.check_key(public_key) {
        return Err(WebAuthnError::InvalidKeyForAlgorithm(alg.0));
    }

    match public_key {
        PublicKey::Ec2 { curve, .. } => {
            let point = public_key.sec1_point()?;
            let ring_alg = match (curve, params.hash) {
                (Curve::P256, HashAlg::Sha256) => &ECDSA_P256_SHA256_ASN1,
                (Curve::P384, HashAlg::Sha384) => &ECDSA_P384_SHA384_ASN1,
                (Curve::P521, HashAlg::Sha512) => {
                    return Ok(verify_p521(&point, signature, message));
                }
                _ => {
                    return Err(WebAuthnError::UnsupportedAlgorithm(format!(
                        "{curve:?} with {:?}",
                        params.hash
                    )));
                }
            };
            Ok(UnparsedPublicKey::new(ring_alg, &point)
                .verify(message, signature)
                .is_ok())
        }
        PublicKey::Rsa { n, e } => {
            let rsa_params = rsa_parameters(params.scheme, params.hash)?;
            let components = RsaPublicKeyComponents { n, e };
            Ok(components.verify(rsa_params, message, signature).is_ok())
        }
    }
}

fn rsa_parameters(
    scheme: SignatureScheme,
    hash: HashAlg,
) -> Result<&'static RsaParameters, WebAuthnError> {
    match (scheme, hash) {
        (SignatureScheme::RsaPss, HashAlg::Sha256) => Ok(&RSA_PSS_2048_8192_SHA256),
        (SignatureScheme::RsaPss, HashAlg::Sha384) => Ok(&RSA_PSS_2048_8192_SHA384),
        (SignatureScheme::RsaPss, HashAlg::Sha512) => Ok(&RSA_PSS_2048_8192_SHA512),
        (SignatureScheme::RsaPkcs1, HashAlg::Sha256) => Ok(&RSA_PKCS1_2048_8192_SHA256),
        (SignatureScheme::RsaPkcs1, HashAlg::Sha384) => Ok(&RSA_PKCS1_2048_8192_SHA384),
        (SignatureScheme::RsaPkcs1, HashAlg::Sha512) => Ok(&RSA_PKCS1_2048_8192_SHA512),
        (SignatureScheme::Ecdsa, _) => Err(WebAuthnError::UnsupportedAlgorithm(
            "ECDSA with an RSA key".to_string(),
        )),
    }
}

// ring has no P-521 verifier.
fn verify_p521(point: &[u8], signature: &[u8], message: &[u8]) -> bool {
    use p521::ecdsa::signature::Verifier;
    use p521::ecdsa::{Signature, VerifyingKey};

    let Ok(key) = VerifyingKey::from_sec1_bytes(point) else {
        return false;
    };
    let Ok(signature) = Signature::from_der(signature) else {
        return false;
    };
    key.verify(message, &signature).is_ok()
}
