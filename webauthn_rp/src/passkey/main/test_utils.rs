//! Test utilities for the ceremony modules
//!
//! A small software authenticator: key pairs for every supported algorithm,
//! COSE encoding of their public halves, client data and attestation object
//! builders, and a DER writer for throwaway attestation certificates.

use ciborium::value::Value as CborValue;
use ring::rand::SystemRandom;
use ring::signature::{
    ECDSA_P256_SHA256_ASN1_SIGNING, ECDSA_P384_SHA384_ASN1_SIGNING, EcdsaKeyPair, KeyPair,
    RSA_PKCS1_SHA256, RSA_PKCS1_SHA384, RSA_PKCS1_SHA512, RSA_PSS_SHA256, RSA_PSS_SHA384,
    RSA_PSS_SHA512, RsaEncoding, RsaKeyPair,
};
use rsa::pkcs8::DecodePrivateKey;
use rsa::traits::PublicKeyParts;

use std::sync::Arc;

use crate::config::{RelyingParty, WebAuthnConfig};
use crate::passkey::types::{
    AuthenticationResponse, AuthenticatorAssertionResponse, AuthenticatorAttestationResponse,
    RegistrationResponse, User,
};
use crate::storage::InMemoryStore;
use crate::utils::base64url_encode;

use super::ceremony::WebAuthn;
use super::challenge::StoreLedger;
use super::keys::{Curve, KeyType, PublicKey};

pub(crate) const RSA_PKCS8: &[u8] = include_bytes!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/tests/fixtures/rsa2048.pk8"
));

const P521_SCALAR: [u8; 66] = {
    let mut bytes = [0x5au8; 66];
    bytes[0] = 0x00;
    bytes
};

pub(crate) const TEST_RP_ID: &str = "example.com";
pub(crate) const TEST_ORIGIN: &str = "https://example.com";
pub(crate) const TEST_AAGUID: [u8; 16] = [
    0xad, 0xce, 0x00, 0x02, 0x35, 0xbc, 0xc6, 0x0a, 0x64, 0x8b, 0x0b, 0x25, 0xf1, 0xf0, 0x55, 0x03,
];

enum Signer {
    Ecdsa(EcdsaKeyPair),
    P521(p521::ecdsa::SigningKey),
    Rsa(RsaKeyPair, &'static dyn RsaEncoding),
}

/// A credential key pair held by the software authenticator.
pub(crate) struct TestKey {
    pub alg: KeyType,
    pub public: PublicKey,
    signer: Signer,
}

impl TestKey {
    pub(crate) fn generate(alg: KeyType) -> Self {
        let rng = SystemRandom::new();
        match alg {
            KeyType::ES256 | KeyType::ES384 => {
                let (signing_alg, curve) = if alg == KeyType::ES256 {
                    (&ECDSA_P256_SHA256_ASN1_SIGNING, Curve::P256)
                } else {
                    (&ECDSA_P384_SHA384_ASN1_SIGNING, Curve::P384)
                };
                let pkcs8 = EcdsaKeyPair::generate_pkcs8(signing_alg, &rng).unwrap();
                let pair = EcdsaKeyPair::from_pkcs8(signing_alg, pkcs8.as_ref(), &rng).unwrap();
                let public = ec_public_from_point(curve, pair.public_key().as_ref());
                TestKey {
                    alg,
                    public,
                    signer: Signer::Ecdsa(pair),
                }
            }
            KeyType::ES512 => TestKey {
                alg,
                public: p521_public_key(),
                signer: Signer::P521(p521::ecdsa::SigningKey::from_slice(&P521_SCALAR).unwrap()),
            },
            _ => {
                let encoding: &'static dyn RsaEncoding = match alg {
                    KeyType::PS256 => &RSA_PSS_SHA256,
                    KeyType::PS384 => &RSA_PSS_SHA384,
                    KeyType::PS512 => &RSA_PSS_SHA512,
                    KeyType::RS256 => &RSA_PKCS1_SHA256,
                    KeyType::RS384 => &RSA_PKCS1_SHA384,
                    KeyType::RS512 => &RSA_PKCS1_SHA512,
                    other => panic!("No test signer for {other:?}"),
                };
                TestKey {
                    alg,
                    public: rsa_public_key(),
                    signer: Signer::Rsa(RsaKeyPair::from_pkcs8(RSA_PKCS8).unwrap(), encoding),
                }
            }
        }
    }

    pub(crate) fn sign(&self, message: &[u8]) -> Vec<u8> {
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

    /// Signs `authData || SHA-256(clientDataJSON)`.
    pub(crate) fn sign_assertion(&self, auth_data: &[u8], client_data_json: &[u8]) -> Vec<u8> {
        let hash = ring::digest::digest(&ring::digest::SHA256, client_data_json);
        let mut signed = auth_data.to_vec();
        signed.extend_from_slice(hash.as_ref());
        self.sign(&signed)
    }

    pub(crate) fn cose_key(&self) -> Vec<u8> {
        cose_key(&self.public, self.alg.0)
    }
}

fn ec_public_from_point(curve: Curve, point: &[u8]) -> PublicKey {
    let len = curve.coordinate_len();
    PublicKey::Ec2 {
        curve,
        x: point[1..1 + len].to_vec(),
        y: point[1 + len..].to_vec(),
    }
}

pub(crate) fn p256_public_key() -> PublicKey {
    TestKey::generate(KeyType::ES256).public
}

pub(crate) fn p521_public_key() -> PublicKey {
    use p521::elliptic_curve::sec1::ToEncodedPoint;
    let secret = p521::SecretKey::from_slice(&P521_SCALAR).unwrap();
    let point = secret.public_key().to_encoded_point(false);
    ec_public_from_point(Curve::P521, point.as_bytes())
}

pub(crate) fn rsa_public_key() -> PublicKey {
    let key = rsa::RsaPrivateKey::from_pkcs8_der(RSA_PKCS8).unwrap();
    PublicKey::rsa(&key.n().to_bytes_be(), &key.e().to_bytes_be())
}

fn int(i: i64) -> CborValue {
    CborValue::Integer(i.into())
}

fn text(s: &str) -> CborValue {
    CborValue::Text(s.to_string())
}

pub(crate) fn to_cbor(value: &CborValue) -> Vec<u8> {
    let mut out = Vec::new();
    ciborium::ser::into_writer(value, &mut out).unwrap();
    out
}

pub(crate) fn cose_key(key: &PublicKey, alg: i64) -> Vec<u8> {
    let map = match key {
        PublicKey::Ec2 { curve, x, y } => vec![
            (int(1), int(2)),
            (int(3), int(alg)),
            (int(-1), int(curve.cose_id())),
            (int(-2), CborValue::Bytes(x.clone())),
            (int(-3), CborValue::Bytes(y.clone())),
        ],
        PublicKey::Rsa { n, e } => vec![
            (int(1), int(3)),
            (int(3), int(alg)),
            (int(-1), CborValue::Bytes(n.clone())),
            (int(-2), CborValue::Bytes(e.clone())),
        ],
    };
    to_cbor(&CborValue::Map(map))
}

pub(crate) fn client_data_json(type_: &str, challenge: &[u8], origin: &str) -> Vec<u8> {
    serde_json::json!({
        "type": type_,
        "challenge": base64url_encode(challenge),
        "origin": origin,
        "crossOrigin": false,
    })
    .to_string()
    .into_bytes()
}

pub(crate) fn attestation_object(
    fmt: &str,
    auth_data: &[u8],
    att_stmt: Vec<(CborValue, CborValue)>,
) -> Vec<u8> {
    to_cbor(&CborValue::Map(vec![
        (text("fmt"), text(fmt)),
        (text("attStmt"), CborValue::Map(att_stmt)),
        (text("authData"), CborValue::Bytes(auth_data.to_vec())),
    ]))
}

pub(crate) fn packed_att_stmt(
    alg: i64,
    sig: Vec<u8>,
    x5c: Option<Vec<Vec<u8>>>,
) -> Vec<(CborValue, CborValue)> {
    let mut stmt = vec![(text("alg"), int(alg)), (text("sig"), CborValue::Bytes(sig))];
    if let Some(certs) = x5c {
        stmt.push((
            text("x5c"),
            CborValue::Array(certs.into_iter().map(CborValue::Bytes).collect()),
        ));
    }
    stmt
}

/// Authenticator data for [`TEST_RP_ID`], optionally carrying an attested credential.
pub(crate) fn authenticator_data(
    flags: u8,
    sign_count: u32,
    attested: Option<(&[u8], &[u8])>,
) -> Vec<u8> {
    let mut out = ring::digest::digest(&ring::digest::SHA256, TEST_RP_ID.as_bytes())
        .as_ref()
        .to_vec();
    out.push(flags);
    out.extend_from_slice(&sign_count.to_be_bytes());
    if let Some((credential_id, cose_key)) = attested {
        out.extend_from_slice(&TEST_AAGUID);
        out.extend_from_slice(&(credential_id.len() as u16).to_be_bytes());
        out.extend_from_slice(credential_id);
        out.extend_from_slice(cose_key);
    }
    out
}

pub(crate) fn test_user(id: &str) -> User {
    User {
        id: id.to_string(),
        name: format!("{id}@example.com"),
        display_name: id.to_string(),
    }
}

pub(crate) fn test_config() -> WebAuthnConfig {
    WebAuthnConfig::new(RelyingParty {
        id: TEST_RP_ID.to_string(),
        name: "Example".to_string(),
    })
}

/// Engine over a fresh in-memory store with a store-backed ledger.
pub(crate) fn test_engine(config: WebAuthnConfig) -> (WebAuthn, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let ledger = Arc::new(StoreLedger::new(store.clone()));
    let webauthn = WebAuthn::new(config, store.clone(), ledger).with_users(store.clone());
    (webauthn, store)
}

/// Registration response with "none" attestation for `key`.
pub(crate) fn none_registration(
    key: &TestKey,
    challenge: &[u8],
    credential_id: &[u8],
    flags: u8,
) -> RegistrationResponse {
    let auth_data = authenticator_data(flags, 0, Some((credential_id, &key.cose_key())));
    let client_data = client_data_json("webauthn.create", challenge, TEST_ORIGIN);
    RegistrationResponse {
        challenge: None,
        token: None,
        credential_id: base64url_encode(credential_id),
        response: AuthenticatorAttestationResponse {
            client_data_json: base64url_encode(&client_data),
            attestation_object: base64url_encode(&attestation_object("none", &auth_data, vec![])),
        },
    }
}

/// Assertion signed by `key` over fresh authenticator and client data.
pub(crate) fn assertion(
    key: &TestKey,
    challenge: &[u8],
    credential_id: &[u8],
    flags: u8,
    sign_count: u32,
) -> AuthenticationResponse {
    let auth_data = authenticator_data(flags, sign_count, None);
    let client_data = client_data_json("webauthn.get", challenge, TEST_ORIGIN);
    let signature = key.sign_assertion(&auth_data, &client_data);
    AuthenticationResponse {
        challenge: None,
        token: None,
        credential_id: base64url_encode(credential_id),
        response: AuthenticatorAssertionResponse {
            authenticator_data: base64url_encode(&auth_data),
            client_data_json: base64url_encode(&client_data),
            signature: base64url_encode(&signature),
            user_handle: None,
        },
    }
}

/// Minimal DER writer for building certificates in tests.
pub(crate) mod der {
    pub(crate) fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
        let mut out = vec![tag];
        let len = content.len();
        if len < 0x80 {
            out.push(len as u8);
        } else {
            let bytes: Vec<u8> = len
                .to_be_bytes()
                .into_iter()
                .skip_while(|b| *b == 0)
                .collect();
            out.push(0x80 | bytes.len() as u8);
            out.extend_from_slice(&bytes);
        }
        out.extend_from_slice(content);
        out
    }

    pub(crate) fn seq(parts: &[Vec<u8>]) -> Vec<u8> {
        tlv(0x30, &parts.concat())
    }

    pub(crate) fn set(parts: &[Vec<u8>]) -> Vec<u8> {
        tlv(0x31, &parts.concat())
    }

    pub(crate) fn oid(arcs: &[u64]) -> Vec<u8> {
        let mut body = vec![(arcs[0] * 40 + arcs[1]) as u8];
        for &arc in &arcs[2..] {
            let mut chunk = vec![(arc & 0x7f) as u8];
            let mut rest = arc >> 7;
            while rest > 0 {
                chunk.push(0x80 | (rest & 0x7f) as u8);
                rest >>= 7;
            }
            chunk.reverse();
            body.extend(chunk);
        }
        tlv(0x06, &body)
    }

    pub(crate) fn utf8(s: &str) -> Vec<u8> {
        tlv(0x0c, s.as_bytes())
    }

    pub(crate) fn octets(bytes: &[u8]) -> Vec<u8> {
        tlv(0x04, bytes)
    }

    pub(crate) fn bit_string(bytes: &[u8]) -> Vec<u8> {
        let mut body = vec![0x00];
        body.extend_from_slice(bytes);
        tlv(0x03, &body)
    }

    pub(crate) fn integer(value: u8) -> Vec<u8> {
        tlv(0x02, &[value])
    }

    pub(crate) fn boolean(value: bool) -> Vec<u8> {
        tlv(0x01, &[if value { 0xff } else { 0x00 }])
    }

    pub(crate) fn utc_time(s: &str) -> Vec<u8> {
        tlv(0x17, s.as_bytes())
    }

    pub(crate) fn explicit(tag_number: u8, inner: &[u8]) -> Vec<u8> {
        tlv(0xa0 | tag_number, inner)
    }
}

/// Options for [`attestation_cert`].
pub(crate) struct CertSpec {
    pub organizational_unit: &'static str,
    /// `(critical, extension value)` for the FIDO AAGUID extension
    pub aaguid_ext: Option<(bool, Vec<u8>)>,
    pub is_ca: bool,
    pub not_after: &'static str,
}

impl Default for CertSpec {
    fn default() -> Self {
        CertSpec {
            organizational_unit: "Authenticator Attestation",
            aaguid_ext: Some((false, der::octets(&TEST_AAGUID))),
            is_ca: false,
            not_after: "491231235959Z",
        }
    }
}

/// Builds an X.509 v3 certificate for `spki_der`.
///
/// The outer signature is filler; nothing in the packed verifier checks the
/// certificate's own signature, only the statement signature made with its key.
pub(crate) fn attestation_cert(spki_der: &[u8], spec: &CertSpec) -> Vec<u8> {
    use der::*;

    let ecdsa_with_sha256 = seq(&[oid(&[1, 2, 840, 10045, 4, 3, 2])]);
    let attr = |arcs: &[u64], value: &str| set(&[seq(&[oid(arcs), utf8(value)])]);

    let issuer = seq(&[attr(&[2, 5, 4, 3], "Test Attestation Root")]);
    let subject = seq(&[
        attr(&[2, 5, 4, 6], "US"),
        attr(&[2, 5, 4, 10], "Test Vendor"),
        attr(&[2, 5, 4, 11], spec.organizational_unit),
        attr(&[2, 5, 4, 3], "Test Authenticator"),
    ]);
    let validity = seq(&[utc_time("250101000000Z"), utc_time(spec.not_after)]);

    let basic_constraints = if spec.is_ca {
        seq(&[boolean(true)])
    } else {
        seq(&[])
    };
    let mut extensions = vec![seq(&[
        oid(&[2, 5, 29, 19]),
        boolean(true),
        octets(&basic_constraints),
    ])];
    if let Some((critical, value)) = &spec.aaguid_ext {
        let mut ext = vec![oid(&[1, 3, 6, 1, 4, 1, 45724, 1, 1, 4])];
        if *critical {
            ext.push(boolean(true));
        }
        ext.push(octets(value));
        extensions.push(seq(&ext));
    }

    let tbs = seq(&[
        explicit(0, &integer(2)),
        integer(1),
        ecdsa_with_sha256.clone(),
        issuer,
        validity,
        subject,
        spki_der.to_vec(),
        explicit(3, &seq(&extensions)),
    ]);

    let filler_sig = seq(&[integer(1), integer(1)]);
    seq(&[tbs, ecdsa_with_sha256, bit_string(&filler_sig)])
}
