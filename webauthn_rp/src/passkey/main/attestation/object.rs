use ciborium::value::Value as CborValue;

use crate::passkey::errors::WebAuthnError;
use crate::passkey::main::auth_data::AuthenticatorData;

/// CBOR envelope returned by the authenticator at registration.
#[derive(Debug, Clone)]
pub struct AttestationObject {
    pub fmt: String,
    /// `authData` exactly as received; attestation signatures cover these bytes
    pub raw_auth_data: Vec<u8>,
    pub auth_data: AuthenticatorData,
    pub att_stmt: Vec<(CborValue, CborValue)>,
}

impl AttestationObject {
    pub fn decode(cbor: &[u8]) -> Result<Self, WebAuthnError> {
        let value: CborValue = ciborium::de::from_reader(cbor)
            .map_err(|e| malformed(&format!("invalid CBOR: {e}")))?;
        let CborValue::Map(entries) = value else {
            return Err(malformed("not a map"));
        };

        let mut fmt = None;
        let mut raw_auth_data = None;
        let mut att_stmt = None;

        for (k, v) in entries {
            let CborValue::Text(key) = k else {
                continue;
            };
            match (key.as_str(), v) {
                ("fmt", CborValue::Text(s)) => fmt = Some(s),
                ("authData", CborValue::Bytes(b)) => raw_auth_data = Some(b),
                ("attStmt", CborValue::Map(m)) => att_stmt = Some(m),
                ("fmt" | "authData" | "attStmt", _) => {
                    return Err(malformed(&format!("{key} has the wrong type")));
                }
                _ => {}
            }
        }

        let fmt = fmt.ok_or_else(|| malformed("missing fmt"))?;
        let raw_auth_data = raw_auth_data.ok_or_else(|| malformed("missing authData"))?;
        let att_stmt = att_stmt.ok_or_else(|| malformed("missing attStmt"))?;
        let auth_data = AuthenticatorData::decode(&raw_auth_data)?;

        Ok(AttestationObject {
            fmt,
            raw_auth_data,
            auth_data,
            att_stmt,
        })
    }
}

fn malformed(msg: &str) -> WebAuthnError {
    WebAuthnError::MalformedAttestationObject(msg.to_string())
}
