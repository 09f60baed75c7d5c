//! Software authenticator for driving full ceremonies
//!
//! Holds one credential key pair and answers registration and authentication
//! challenges the way a browser plus authenticator would, producing the JSON
//! payloads the engine consumes.

use ciborium::value::Value as CborValue;
use ring::digest;
use ring::rand::SystemRandom;
use ring::signature::{
    ECDSA_P256_SHA256_ASN1_SIGNING, ECDSA_P384_SHA384_ASN1_SIGNING, EcdsaKeyPair, KeyPair,
    RSA_PKCS1_SHA256, RSA_PSS_SHA256, RsaEncoding, RsaKeyPair,
};
use rsa::pkcs8::DecodePrivateKey;
use rsa::traits::PublicKeyParts;

use webauthn_rp::{
    AuthenticationChallenge, AuthenticationResponse, AuthenticatorAssertionResponse,
    AuthenticatorAttestationResponse, AuthenticatorFlags, KeyType, RegistrationChallenge,
    RegistrationResponse, base64url_decode, base64url_encode,
};

use super::fixtures::{AAGUID, ORIGIN, RSA_PKCS8};

const P521_SCALAR: [u8; 66] = {
    let mut bytes = [0x33u8; 66];
    bytes[0] = 0x01;
    bytes
};

enum Signer {
    Ecdsa(EcdsaKeyPair),
    P521(p521::ecdsa::SigningKey),
    Rsa(RsaKeyPair, &'static dyn RsaEncoding),
}

/// How the authenticator attests a new credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attestation {
    None,
    PackedSelf,
}

pub struct SoftAuthenticator {
    pub alg: KeyType,
    pub credential_id: Vec<u8>,
    pub origin: String,
    pub flags: u8,
    sign_count: u32,
    cose_key: Vec<u8>,
    signer: Signer,
}

impl SoftAuthenticator {
    /// Supports ES256, ES384, ES512, PS256 and RS256.
    pub fn new(alg: KeyType, credential_id: &[u8]) -> Self {
        let rng = SystemRandom::new();
        let (signer, cose_key) = match alg {
            KeyType::ES256 | KeyType::ES384 => {
                let (signing_alg, crv, len) = if alg == KeyType::ES256 {
                    (&ECDSA_P256_SHA256_ASN1_SIGNING, 1, 32)
                } else {
                    (&ECDSA_P384_SHA384_ASN1_SIGNING, 2, 48)
                };
                let pkcs8 = EcdsaKeyPair::generate_pkcs8(signing_alg, &rng).unwrap();
                let pair = EcdsaKeyPair::from_pkcs8(signing_alg, pkcs8.as_ref(), &rng).unwrap();
                let cose = ec2_cose_key(alg.0, crv, pair.public_key().as_ref(), len);
                (Signer::Ecdsa(pair), cose)
            }
            KeyType::ES512 => {
                use p521::elliptic_curve::sec1::ToEncodedPoint;
                let secret = p521::SecretKey::from_slice(&P521_SCALAR).unwrap();
                let point = secret.public_key().to_encoded_point(false);
                let cose = ec2_cose_key(alg.0, 3, point.as_bytes(), 66);
                let key = p521::ecdsa::SigningKey::from_slice(&P521_SCALAR).unwrap();
                (Signer::P521(key), cose)
            }
            KeyType::PS256 | KeyType::RS256 => {
                let encoding: &'static dyn RsaEncoding = if alg == KeyType::PS256 {
                    &RSA_PSS_SHA256
                } else {
                    &RSA_PKCS1_SHA256
                };
                let public = rsa::RsaPrivateKey::from_pkcs8_der(RSA_PKCS8).unwrap();
                let cose = to_cbor(CborValue::Map(vec![
                    (int(1), int(3)),
                    (int(3), int(alg.0)),
                    (int(-1), CborValue::Bytes(public.n().to_bytes_be())),
                    (int(-2), CborValue::Bytes(public.e().to_bytes_be())),
                ]));
                let pair = RsaKeyPair::from_pkcs8(RSA_PKCS8).unwrap();
                (Signer::Rsa(pair, encoding), cose)
            }
            other => panic!("SoftAuthenticator does not support {other:?}"),
        };

        Self {
            alg,
            credential_id: credential_id.to_vec(),
            origin: ORIGIN.to_string(),
            flags: AuthenticatorFlags::USER_PRESENT | AuthenticatorFlags::USER_VERIFIED,
            sign_count: 0,
            cose_key,
            signer,
        }
    }

    fn sign(&self, message: &[u8]) -> Vec<u8> {
        let rng = SystemRandom::new();
        match &self.signer {
            Signer::Ecdsa(pair) => pair.sign(&rng, message).unwrap().as_ref().to_vec(),
            Signer::P521(key) => {
                use p521::ecdsa::signature::Signer as _;
                let sig: p521::ecdsa::Signature = key.sign(message);
                sig.to_der().as_bytes().to_vec()
            }
            Signer::Rsa(pair, encoding) => {
                let mut sig = vec![0u8; pair.public().modulus_len()];
                pair.sign(*encoding, &rng, message, &mut sig).unwrap();
                sig
            }
        }
    }

    fn signed_over(&self, auth_data: &[u8], client_data_json: &[u8]) -> Vec<u8> {
        let mut message = auth_data.to_vec();
        message.extend_from_slice(digest::digest(&digest::SHA256, client_data_json).as_ref());
        self.sign(&message)
    }

    fn auth_data(&self, rp_id: &str, attested: bool) -> Vec<u8> {
        let mut out = digest::digest(&digest::SHA256, rp_id.as_bytes())
            .as_ref()
            .to_vec();
        let mut flags = self.flags;
        if attested {
            flags |= AuthenticatorFlags::ATTESTED_CREDENTIAL_DATA;
        }
        out.push(flags);
        out.extend_from_slice(&self.sign_count.to_be_bytes());
        if attested {
            out.extend_from_slice(&AAGUID);
            out.extend_from_slice(&(self.credential_id.len() as u16).to_be_bytes());
            out.extend_from_slice(&self.credential_id);
            out.extend_from_slice(&self.cose_key);
        }
        out
    }

    fn client_data(&self, type_: &str, challenge: &str) -> Vec<u8> {
        // The browser always embeds the raw challenge as base64url
        let raw = base64url_decode(challenge).unwrap();
        serde_json::json!({
            "type": type_,
            "challenge": base64url_encode(&raw),
            "origin": self.origin,
            "crossOrigin": false,
        })
        .to_string()
        .into_bytes()
    }

    pub fn register(
        &mut self,
        options: &RegistrationChallenge,
        attestation: Attestation,
    ) -> RegistrationResponse {
        let client_data = self.client_data("webauthn.create", &options.challenge);
        let auth_data = self.auth_data(&options.rp.id, true);

        let att_stmt = match attestation {
            Attestation::None => vec![],
            Attestation::PackedSelf => vec![
                (text("alg"), int(self.alg.0)),
                (
                    text("sig"),
                    CborValue::Bytes(self.signed_over(&auth_data, &client_data)),
                ),
            ],
        };
        let fmt = match attestation {
            Attestation::None => "none",
            Attestation::PackedSelf => "packed",
        };
        let attestation_object = to_cbor(CborValue::Map(vec![
            (text("fmt"), text(fmt)),
            (text("attStmt"), CborValue::Map(att_stmt)),
            (text("authData"), CborValue::Bytes(auth_data)),
        ]));

        RegistrationResponse {
            challenge: Some(options.challenge.clone()),
            token: options.token.clone(),
            credential_id: base64url_encode(&self.credential_id),
            response: AuthenticatorAttestationResponse {
                client_data_json: base64url_encode(&client_data),
                attestation_object: base64url_encode(&attestation_object),
            },
        }
    }

    /// Answers an authentication challenge, bumping the signature counter.
    pub fn authenticate(
        &mut self,
        options: &AuthenticationChallenge,
        user_handle: Option<&[u8]>,
    ) -> AuthenticationResponse {
        self.sign_count += 1;
        let client_data = self.client_data("webauthn.get", &options.challenge);
        let auth_data = self.auth_data(&options.rp_id, false);
        let signature = self.signed_over(&auth_data, &client_data);

        AuthenticationResponse {
            challenge: Some(options.challenge.clone()),
            token: options.token.clone(),
            credential_id: base64url_encode(&self.credential_id),
            response: AuthenticatorAssertionResponse {
                authenticator_data: base64url_encode(&auth_data),
                client_data_json: base64url_encode(&client_data),
                signature: base64url_encode(&signature),
                user_handle: user_handle.map(base64url_encode),
            },
        }
    }
}

fn ec2_cose_key(alg: i64, crv: i64, point: &[u8], len: usize) -> Vec<u8> {
    to_cbor(CborValue::Map(vec![
        (int(1), int(2)),
        (int(3), int(alg)),
        (int(-1), int(crv)),
        (int(-2), CborValue::Bytes(point[1..1 + len].to_vec())),
        (int(-3), CborValue::Bytes(point[1 + len..].to_vec())),
    ]))
}

fn int(i: i64) -> CborValue {
    CborValue::Integer(i.into())
}

fn text(s: &str) -> CborValue {
    CborValue::Text(s.to_string())
}

fn to_cbor(value: CborValue) -> Vec<u8> {
    let mut out = Vec::new();
    ciborium::ser::into_writer(&value, &mut out).unwrap();
    out
}
