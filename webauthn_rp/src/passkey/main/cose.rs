use ciborium::value::Value as CborValue;

use crate::passkey::errors::WebAuthnError;

use super::keys::{Curve, KeyType, PublicKey};

const LABEL_KTY: i128 = 1;
const LABEL_ALG: i128 = 3;
const LABEL_CRV: i128 = -1;
const LABEL_X: i128 = -2;
const LABEL_Y: i128 = -3;
const LABEL_N: i128 = -1;
const LABEL_E: i128 = -2;

const KTY_EC2: i64 = 2;
const KTY_RSA: i64 = 3;

/// Decodes a COSE_Key map into a typed key and its algorithm.
///
/// Whether the algorithm fits the key is not checked here; see
/// [`KeyType::check_key`].
pub fn decode_cose_key(bytes: &[u8]) -> Result<(PublicKey, KeyType), WebAuthnError> {
    let value: CborValue = ciborium::de::from_reader(bytes)
        .map_err(|e| WebAuthnError::MalformedKey(format!("invalid CBOR: {e}")))?;
    let CborValue::Map(entries) = value else {
        return Err(WebAuthnError::MalformedKey(
            "COSE key is not a map".to_string(),
        ));
    };

    let kty = int_label(&entries, LABEL_KTY, "kty")?;
    let key = match kty {
        KTY_EC2 => {
            let crv = int_label(&entries, LABEL_CRV, "crv")?;
            let curve = Curve::from_cose(crv).ok_or(WebAuthnError::UnsupportedCurve(crv))?;
            PublicKey::Ec2 {
                curve,
                x: bytes_label(&entries, LABEL_X, "x")?.to_vec(),
                y: bytes_label(&entries, LABEL_Y, "y")?.to_vec(),
            }
        }
        KTY_RSA => PublicKey::rsa(
            bytes_label(&entries, LABEL_N, "n")?,
            bytes_label(&entries, LABEL_E, "e")?,
        ),
        other => return Err(WebAuthnError::UnsupportedKeyType(other)),
    };
    let alg = int_label(&entries, LABEL_ALG, "alg")?;

    Ok((key, KeyType(alg)))
}

fn find_label(entries: &[(CborValue, CborValue)], label: i128) -> Option<&CborValue> {
    entries.iter().find_map(|(k, v)| match k {
        CborValue::Integer(i) if i128::from(*i) == label => Some(v),
        _ => None,
    })
}

fn int_label(
    entries: &[(CborValue, CborValue)],
    label: i128,
    name: &str,
) -> Result<i64, WebAuthnError> {
    match find_label(entries, label) {
        Some(CborValue::Integer(i)) => i64::try_from(*i)
            .map_err(|_| WebAuthnError::MalformedKey(format!("{name} out of range"))),
        Some(_) => Err(WebAuthnError::MalformedKey(format!(
            "{name} is not an integer"
        ))),
        None => Err(WebAuthnError::MalformedKey(format!("missing {name}"))),
    }
}

fn bytes_label<'a>(
    entries: &'a [(CborValue, CborValue)],
    label: i128,
    name: &str,
) -> Result<&'a [u8], WebAuthnError> {
    match find_label(entries, label) {
        Some(CborValue::Bytes(b)) => Ok(b),
        Some(_) => Err(WebAuthnError::MalformedKey(format!(
            "{name} is not a byte string"
        ))),
        None => Err(WebAuthnError::MalformedKey(format!("missing {name}"))),
    }
}
