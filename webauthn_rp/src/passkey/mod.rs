mod errors;
mod main;
mod types;

pub use errors::WebAuthnError;

pub use main::{
    AttestationObject, AttestedCredentialData, AuthenticatorData, AuthenticatorFlags,
    CHALLENGE_SIZE, Challenge, ChallengeFn, ChallengeLedger, ClientData, Curve, HashAlg,
    IssuedChallenge, KeyParams, KeyType, PublicKey, SignatureScheme, StoreLedger, TokenLedger,
    WebAuthn, decode_cose_key, verify_attestation, verify_signature,
};

pub use types::{
    AllowedCredential, AuthenticationChallenge, AuthenticationResponse, AuthenticationResult,
    AuthenticatorAssertionResponse, AuthenticatorAttestationResponse, AuthenticatorSelection,
    Credential, PubKeyCredParam, PublicKeyCredentialUserEntity, RegistrationChallenge,
    RegistrationResponse, RegistrationResult, User,
};
