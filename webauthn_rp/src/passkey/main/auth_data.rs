use std::io::Cursor;

use ciborium::value::Value as CborValue;
use uuid::Uuid;

use crate::passkey::errors::WebAuthnError;

use super::cose::decode_cose_key;
use super::keys::{KeyType, PublicKey};

const RP_ID_HASH_LEN: usize = 32;
const HEADER_LEN: usize = 37;
const AAGUID_LEN: usize = 16;

/// Authenticator data flag bits.
pub struct AuthenticatorFlags;

impl AuthenticatorFlags {
    pub const USER_PRESENT: u8 = 0x01;
    pub const USER_VERIFIED: u8 = 0x04;
    pub const BACKUP_ELIGIBLE: u8 = 0x08;
    pub const BACKED_UP: u8 = 0x10;
    pub const ATTESTED_CREDENTIAL_DATA: u8 = 0x40;
    pub const EXTENSION_DATA: u8 = 0x80;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestedCredentialData {
    pub aaguid: [u8; AAGUID_LEN],
    pub credential_id: Vec<u8>,
    /// COSE_Key bytes exactly as the authenticator sent them
    pub credential_public_key: Vec<u8>,
}

impl AttestedCredentialData {
    pub fn public_key(&self) -> Result<(PublicKey, KeyType), WebAuthnError> {
        decode_cose_key(&self.credential_public_key)
    }

    pub fn aaguid_string(&self) -> String {
        Uuid::from_bytes(self.aaguid).hyphenated().to_string()
    }
}

/// Decoded authenticator data.
///
/// `extensions` holds whatever follows the fixed header (or the attested
/// block) without interpreting it, so that encoding reproduces the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatorData {
    pub rp_id_hash: [u8; RP_ID_HASH_LEN],
    pub flags: u8,
    pub sign_count: u32,
    pub attested_credential: Option<AttestedCredentialData>,
    pub extensions: Vec<u8>,
}

impl AuthenticatorData {
    pub fn decode(data: &[u8]) -> Result<Self, WebAuthnError> {
        if data.len() < HEADER_LEN {
            return Err(WebAuthnError::TruncatedInput(format!(
                "authenticator data is {} bytes, need at least {HEADER_LEN}",
                data.len()
            )));
        }

        let mut rp_id_hash = [0u8; RP_ID_HASH_LEN];
        rp_id_hash.copy_from_slice(&data[..RP_ID_HASH_LEN]);
        let flags = data[32];
        let sign_count = u32::from_be_bytes([data[33], data[34], data[35], data[36]]);

        let mut rest = &data[HEADER_LEN..];
        let mut attested_credential = None;

        if flags & AuthenticatorFlags::ATTESTED_CREDENTIAL_DATA != 0 {
            if rest.len() < AAGUID_LEN + 2 {
                return Err(WebAuthnError::TruncatedInput(
                    "attested credential data header".to_string(),
                ));
            }
            let mut aaguid = [0u8; AAGUID_LEN];
            aaguid.copy_from_slice(&rest[..AAGUID_LEN]);
            let id_len = u16::from_be_bytes([rest[AAGUID_LEN], rest[AAGUID_LEN + 1]]) as usize;
            rest = &rest[AAGUID_LEN + 2..];

            if rest.len() < id_len {
                return Err(WebAuthnError::TruncatedInput(format!(
                    "credential id length {id_len} exceeds remaining {} bytes",
                    rest.len()
                )));
            }
            let credential_id = rest[..id_len].to_vec();
            rest = &rest[id_len..];

            // Without extension data the key runs to the end of the buffer.
            let key_len = if flags & AuthenticatorFlags::EXTENSION_DATA != 0 {
                cbor_item_len(rest)?
            } else {
                rest.len()
            };
            if key_len == 0 {
                return Err(WebAuthnError::TruncatedInput(
                    "credential public key missing".to_string(),
                ));
            }

            attested_credential = Some(AttestedCredentialData {
                aaguid,
                credential_id,
                credential_public_key: rest[..key_len].to_vec(),
            });
            rest = &rest[key_len..];
        }

        Ok(AuthenticatorData {
            rp_id_hash,
            flags,
            sign_count,
            attested_credential,
            extensions: rest.to_vec(),
        })
    }

    /// Inverse of [`decode`](Self::decode).
    ///
    /// Fails when the credential id is longer than its `u16` length prefix
    /// can express.
    pub fn encode(&self) -> Result<Vec<u8>, WebAuthnError> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.extensions.len());
        out.extend_from_slice(&self.rp_id_hash);
        out.push(self.flags);
        out.extend_from_slice(&self.sign_count.to_be_bytes());
        if let Some(attested) = &self.attested_credential {
            let id_len = u16::try_from(attested.credential_id.len())
                .map_err(|_| WebAuthnError::CredentialIdTooLong(attested.credential_id.len()))?;
            out.extend_from_slice(&attested.aaguid);
            out.extend_from_slice(&id_len.to_be_bytes());
            out.extend_from_slice(&attested.credential_id);
            out.extend_from_slice(&attested.credential_public_key);
        }
        out.extend_from_slice(&self.extensions);
        Ok(out)
    }

    pub fn user_present(&self) -> bool {
        self.flags & AuthenticatorFlags::USER_PRESENT != 0
    }

    pub fn user_verified(&self) -> bool {
        self.flags & AuthenticatorFlags::USER_VERIFIED != 0
    }

    pub fn backup_eligible(&self) -> bool {
        self.flags & AuthenticatorFlags::BACKUP_ELIGIBLE != 0
    }

    pub fn backed_up(&self) -> bool {
        self.flags & AuthenticatorFlags::BACKED_UP != 0
    }
}

/// Length of the single CBOR item at the start of `data`.
fn cbor_item_len(data: &[u8]) -> Result<usize, WebAuthnError> {
    let mut cursor = Cursor::new(data);
    ciborium::de::from_reader::<CborValue, _>(&mut cursor)
        .map_err(|e| WebAuthnError::TruncatedInput(format!("credential public key: {e}")))?;
    Ok(cursor.position() as usize)
}
