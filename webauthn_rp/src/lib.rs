//! webauthn-rp - Relying-party engine for WebAuthn/FIDO2 ceremonies
//!
//! Issues challenges and verifies registration (attestation) and
//! authentication (assertion) responses. Storage of users, credentials and
//! challenges is delegated to the traits in [`storage`]; HTTP transport is
//! left to the caller.

pub mod config;
mod passkey;
pub mod storage;
mod utils;

pub use config::{
    AttestationConveyance, AuthenticatorAttachment, RelyingParty, UserVerification, WebAuthnConfig,
};

pub use passkey::{
    AllowedCredential, AttestationObject, AttestedCredentialData, AuthenticationChallenge,
    AuthenticationResponse, AuthenticationResult, AuthenticatorAssertionResponse,
    AuthenticatorAttestationResponse, AuthenticatorData, AuthenticatorFlags,
    AuthenticatorSelection, CHALLENGE_SIZE, Challenge, ChallengeFn, ChallengeLedger, ClientData,
    Credential, Curve, HashAlg, IssuedChallenge, KeyParams, KeyType, PubKeyCredParam, PublicKey,
    PublicKeyCredentialUserEntity, RegistrationChallenge, RegistrationResponse,
    RegistrationResult, SignatureScheme, StoreLedger, TokenLedger, User, WebAuthn,
    WebAuthnError, decode_cose_key, verify_attestation, verify_signature,
};

pub use utils::{Base64UrlCodec, Codec, UtilError, base64url_decode, base64url_encode};
