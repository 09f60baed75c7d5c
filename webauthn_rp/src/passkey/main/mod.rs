mod attestation;
mod auth;
mod auth_data;
mod ceremony;
mod challenge;
mod client_data;
mod cose;
mod keys;
mod register;
mod signature;
#[cfg(test)]
mod test_utils;

pub use attestation::{AttestationObject, verify_attestation};
pub use auth_data::{AttestedCredentialData, AuthenticatorData, AuthenticatorFlags};
pub use ceremony::WebAuthn;
pub use challenge::{
    CHALLENGE_SIZE, Challenge, ChallengeFn, ChallengeLedger, IssuedChallenge, StoreLedger,
    TokenLedger,
};
pub use client_data::ClientData;
pub use cose::decode_cose_key;
pub use keys::{Curve, HashAlg, KeyParams, KeyType, PublicKey, SignatureScheme};
pub use signature::verify_signature;
