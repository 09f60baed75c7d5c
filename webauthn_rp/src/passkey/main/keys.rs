use ring::digest;
use rsa::{BigUint, RsaPublicKey};
use x509_parser::prelude::FromDer;
use x509_parser::public_key::PublicKey as X509PublicKey;
use x509_parser::x509::SubjectPublicKeyInfo;

use crate::passkey::errors::WebAuthnError;

const OID_EC_P256: &str = "1.2.840.10045.3.1.7";
const OID_EC_P384: &str = "1.3.132.0.34";
const OID_EC_P521: &str = "1.3.132.0.35";

const RSA_MAX_MODULUS_BITS: usize = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Curve {
    P256,
    P384,
    P521,
}

impl Curve {
    pub(crate) fn from_cose(crv: i64) -> Option<Self> {
        match crv {
            1 => Some(Curve::P256),
            2 => Some(Curve::P384),
            3 => Some(Curve::P521),
            _ => None,
        }
    }

    pub(crate) fn cose_id(self) -> i64 {
        match self {
            Curve::P256 => 1,
            Curve::P384 => 2,
            Curve::P521 => 3,
        }
    }

    /// Byte length of one affine coordinate
    pub(crate) fn coordinate_len(self) -> usize {
        match self {
            Curve::P256 => 32,
            Curve::P384 => 48,
            Curve::P521 => 66,
        }
    }

    fn from_oid(oid: &str) -> Option<Self> {
        match oid {
            OID_EC_P256 => Some(Curve::P256),
            OID_EC_P384 => Some(Curve::P384),
            OID_EC_P521 => Some(Curve::P521),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureScheme {
    Ecdsa,
    RsaPss,
    RsaPkcs1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlg {
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlg {
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        let alg = match self {
            HashAlg::Sha256 => &digest::SHA256,
            HashAlg::Sha384 => &digest::SHA384,
            HashAlg::Sha512 => &digest::SHA512,
        };
        digest::digest(alg, data).as_ref().to_vec()
    }
}

#[derive(Debug)]
pub struct KeyParams {
    pub name: &'static str,
    pub scheme: SignatureScheme,
    pub hash: HashAlg,
    /// Required curve for ECDSA algorithms
    pub curve: Option<Curve>,
}

/// COSE algorithm identifier.
///
/// Any integer can be carried, but only the values in [`KeyType::ALL`] have
/// parameters and can be verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyType(pub i64);

impl KeyType {
    pub const ES256: KeyType = KeyType(-7);
    pub const ES384: KeyType = KeyType(-35);
    pub const ES512: KeyType = KeyType(-36);
    pub const PS256: KeyType = KeyType(-37);
    pub const PS384: KeyType = KeyType(-38);
    pub const PS512: KeyType = KeyType(-39);
    pub const RS256: KeyType = KeyType(-257);
    pub const RS384: KeyType = KeyType(-258);
    pub const RS512: KeyType = KeyType(-259);

    pub const ALL: [KeyType; 9] = [
        KeyType::ES256,
        KeyType::ES384,
        KeyType::ES512,
        KeyType::PS256,
        KeyType::PS384,
        KeyType::PS512,
        KeyType::RS256,
        KeyType::RS384,
        KeyType::RS512,
    ];

    pub fn params(self) -> Option<&'static KeyParams> {
        const fn ec(name: &'static str, hash: HashAlg, curve: Curve) -> KeyParams {
            KeyParams {
                name,
                scheme: SignatureScheme::Ecdsa,
                hash,
                curve: Some(curve),
            }
        }
        const fn rsa(name: &'static str, scheme: SignatureScheme, hash: HashAlg) -> KeyParams {
            KeyParams {
                name,
                scheme,
                hash,
                curve: None,
            }
        }

        static ES256: KeyParams = ec("ES256", HashAlg::Sha256, Curve::P256);
        static ES384: KeyParams = ec("ES384", HashAlg::Sha384, Curve::P384);
        static ES512: KeyParams = ec("ES512", HashAlg::Sha512, Curve::P521);
        static PS256: KeyParams = rsa("PS256", SignatureScheme::RsaPss, HashAlg::Sha256);
        static PS384: KeyParams = rsa("PS384", SignatureScheme::RsaPss, HashAlg::Sha384);
        static PS512: KeyParams = rsa("PS512", SignatureScheme::RsaPss, HashAlg::Sha512);
        static RS256: KeyParams = rsa("RS256", SignatureScheme::RsaPkcs1, HashAlg::Sha256);
        static RS384: KeyParams = rsa("RS384", SignatureScheme::RsaPkcs1, HashAlg::Sha384);
        static RS512: KeyParams = rsa("RS512", SignatureScheme::RsaPkcs1, HashAlg::Sha512);

        match self {
            KeyType::ES256 => Some(&ES256),
            KeyType::ES384 => Some(&ES384),
            KeyType::ES512 => Some(&ES512),
            KeyType::PS256 => Some(&PS256),
            KeyType::PS384 => Some(&PS384),
            KeyType::PS512 => Some(&PS512),
            KeyType::RS256 => Some(&RS256),
            KeyType::RS384 => Some(&RS384),
            KeyType::RS512 => Some(&RS512),
            _ => None,
        }
    }

    pub fn from_name(name: &str) -> Option<KeyType> {
        KeyType::ALL
            .into_iter()
            .find(|k| k.params().is_some_and(|p| p.name.eq_ignore_ascii_case(name)))
    }

    pub fn name(self) -> Option<&'static str> {
        self.params().map(|p| p.name)
    }

    pub fn hash(self) -> Option<HashAlg> {
        self.params().map(|p| p.hash)
    }

    /// Reports whether `key` has the shape this algorithm requires.
    ///
    /// ECDSA algorithms need an EC2 key on their own curve and the RSA
    /// families need an RSA key. Unknown algorithms accept nothing.
    pub fn check_key(self, key: &PublicKey) -> bool {
        let Some(params) = self.params() else {
            return false;
        };
        match (params.scheme, key) {
            (SignatureScheme::Ecdsa, PublicKey::Ec2 { curve, .. }) => params.curve == Some(*curve),
            (SignatureScheme::RsaPss | SignatureScheme::RsaPkcs1, PublicKey::Rsa { .. }) => true,
            _ => false,
        }
    }
}

/// Credential public key in a representation independent of COSE and DER.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    Ec2 {
        curve: Curve,
        x: Vec<u8>,
        y: Vec<u8>,
    },
    /// Modulus and exponent without leading zero bytes
    Rsa { n: Vec<u8>, e: Vec<u8> },
}

impl PublicKey {
    pub(crate) fn rsa(n: &[u8], e: &[u8]) -> Self {
        PublicKey::Rsa {
            n: strip_leading_zeros(n).to_vec(),
            e: strip_leading_zeros(e).to_vec(),
        }
    }

    /// Uncompressed SEC1 encoding, `0x04 || x || y` with fixed-width coordinates.
    pub(crate) fn sec1_point(&self) -> Result<Vec<u8>, WebAuthnError> {
        let PublicKey::Ec2 { curve, x, y } = self else {
            return Err(WebAuthnError::MalformedKey(
                "SEC1 encoding requires an EC2 key".to_string(),
            ));
        };
        let len = curve.coordinate_len();
        let mut point = Vec::with_capacity(1 + 2 * len);
        point.push(0x04);
        for coord in [x, y] {
            let coord = strip_leading_zeros(coord);
            if coord.len() > len {
                return Err(WebAuthnError::MalformedKey(format!(
                    "coordinate longer than {len} bytes"
                )));
            }
            point.resize(point.len() + len - coord.len(), 0);
            point.extend_from_slice(coord);
        }
        Ok(point)
    }

    /// DER SubjectPublicKeyInfo, the form credentials are stored in.
    pub fn to_spki_der(&self) -> Result<Vec<u8>, WebAuthnError> {
        let der = match self {
            PublicKey::Ec2 { curve, .. } => {
                let point = self.sec1_point()?;
                match curve {
                    Curve::P256 => {
                        use p256::pkcs8::EncodePublicKey;
                        p256::PublicKey::from_sec1_bytes(&point)
                            .map_err(|_| invalid_point("P-256"))?
                            .to_public_key_der()
                            .map_err(|e| WebAuthnError::Crypto(e.to_string()))?
                    }
                    Curve::P384 => {
                        use p384::pkcs8::EncodePublicKey;
                        p384::PublicKey::from_sec1_bytes(&point)
                            .map_err(|_| invalid_point("P-384"))?
                            .to_public_key_der()
                            .map_err(|e| WebAuthnError::Crypto(e.to_string()))?
                    }
                    Curve::P521 => {
                        use p521::pkcs8::EncodePublicKey;
                        p521::PublicKey::from_sec1_bytes(&point)
                            .map_err(|_| invalid_point("P-521"))?
                            .to_public_key_der()
                            .map_err(|e| WebAuthnError::Crypto(e.to_string()))?
                    }
                }
            }
            PublicKey::Rsa { n, e } => {
                use rsa::pkcs8::EncodePublicKey;
                RsaPublicKey::new_with_max_size(
                    BigUint::from_bytes_be(n),
                    BigUint::from_bytes_be(e),
                    RSA_MAX_MODULUS_BITS,
                )
                .map_err(|e| WebAuthnError::MalformedKey(format!("invalid RSA key: {e}")))?
                .to_public_key_der()
                .map_err(|e| WebAuthnError::Crypto(e.to_string()))?
            }
        };
        Ok(der.as_bytes().to_vec())
    }

    pub fn from_spki_der(der: &[u8]) -> Result<Self, WebAuthnError> {
        let (rest, spki) = SubjectPublicKeyInfo::from_der(der)
            .map_err(|e| WebAuthnError::MalformedKey(format!("invalid SPKI: {e}")))?;
        if !rest.is_empty() {
            return Err(WebAuthnError::MalformedKey(
                "trailing bytes after SPKI".to_string(),
            ));
        }
        Self::from_spki(&spki)
    }

    pub(crate) fn from_spki(spki: &SubjectPublicKeyInfo) -> Result<Self, WebAuthnError> {
        let parsed = spki
            .parsed()
            .map_err(|e| WebAuthnError::MalformedKey(format!("unreadable public key: {e}")))?;

        match parsed {
            X509PublicKey::EC(point) => {
                let curve_oid = spki
                    .algorithm
                    .parameters
                    .as_ref()
                    .and_then(|p| p.as_oid().ok())
                    .map(|oid| oid.to_id_string())
                    .ok_or_else(|| {
                        WebAuthnError::MalformedKey("EC key without curve".to_string())
                    })?;
                let curve = Curve::from_oid(&curve_oid).ok_or_else(|| {
                    WebAuthnError::UnsupportedAlgorithm(format!("EC curve {curve_oid}"))
                })?;

                let data = point.data();
                let len = curve.coordinate_len();
                if data.len() != 1 + 2 * len || data[0] != 0x04 {
                    return Err(WebAuthnError::MalformedKey(
                        "EC point must be uncompressed".to_string(),
                    ));
                }
                Ok(PublicKey::Ec2 {
                    curve,
                    x: data[1..1 + len].to_vec(),
                    y: data[1 + len..].to_vec(),
                })
            }
            X509PublicKey::RSA(rsa) => Ok(PublicKey::rsa(rsa.modulus, rsa.exponent)),
            _ => Err(WebAuthnError::UnsupportedAlgorithm(format!(
                "public key algorithm {}",
                spki.algorithm.algorithm.to_id_string()
            ))),
        }
    }
}

fn invalid_point(curve: &str) -> WebAuthnError {
    WebAuthnError::MalformedKey(format!("point is not on {curve}"))
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[first..]
}
