use ciborium::value::Value as CborValue;

use crate::passkey::errors::WebAuthnError;

fn invalid(msg: &str) -> WebAuthnError {
    WebAuthnError::AttestationInvalid(msg.to_string())
}

pub(super) fn stmt_value<'a>(
    att_stmt: &'a [(CborValue, CborValue)],
    name: &str,
) -> Option<&'a CborValue> {
    att_stmt.iter().find_map(|(k, v)| match k {
        CborValue::Text(key) if key == name => Some(v),
        _ => None,
    })
}

pub(super) fn get_sig_from_stmt(
    att_stmt: &[(CborValue, CborValue)],
) -> Result<(i64, Vec<u8>), WebAuthnError> {
    let alg = match stmt_value(att_stmt, "alg") {
        Some(CborValue::Integer(a)) => {
            i64::try_from(*a).map_err(|_| invalid("alg out of range"))?
        }
        Some(_) => return Err(invalid("alg is not an integer")),
        None => return Err(invalid("missing alg")),
    };
    let sig = match stmt_value(att_stmt, "sig") {
        Some(CborValue::Bytes(s)) => s.clone(),
        Some(_) => return Err(invalid("sig is not a byte string")),
        None => return Err(invalid("missing sig")),
    };
    Ok((alg, sig))
}

/// Reads `x5c` when present. An empty array or a non-bytes element is invalid.
pub(super) fn get_cert_chain(
    att_stmt: &[(CborValue, CborValue)],
) -> Result<Option<Vec<Vec<u8>>>, WebAuthnError> {
    let Some(value) = stmt_value(att_stmt, "x5c") else {
        return Ok(None);
    };
    let CborValue::Array(certs) = value else {
        return Err(invalid("x5c is not an array"));
    };
    if certs.is_empty() {
        return Err(invalid("x5c is empty"));
    }
    certs
        .iter()
        .map(|cert| match cert {
            CborValue::Bytes(der) => Ok(der.clone()),
            _ => Err(invalid("x5c entry is not a byte string")),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}
