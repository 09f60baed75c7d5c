use thiserror::Error;

use crate::storage::StorageError;
use crate::utils::UtilError;

/// Errors that can occur while running a WebAuthn ceremony.
///
/// Every variant is terminal for the ceremony attempt. Steps inside the
/// ceremonies wrap the error they hit in [`WebAuthnError::Context`], so the
/// rendered message reads like `verifying signature: signature does not match`.
/// Use [`WebAuthnError::root`] to get at the underlying kind.
#[derive(Debug, Error)]
pub enum WebAuthnError {
    /// Binary input ended before a fixed-size or length-prefixed field
    #[error("truncated input: {0}")]
    TruncatedInput(String),

    /// COSE key is missing a required label or a label has the wrong CBOR type
    #[error("malformed COSE key: {0}")]
    MalformedKey(String),

    /// COSE `kty` other than EC2 or RSA
    #[error("unsupported COSE key type: {0}")]
    UnsupportedKeyType(i64),

    /// COSE `crv` other than P-256, P-384 or P-521
    #[error("unsupported curve: {0}")]
    UnsupportedCurve(i64),

    #[error("malformed attestation object: {0}")]
    MalformedAttestationObject(String),

    #[error("malformed client data: {0}")]
    MalformedClientData(String),

    #[error("invalid challenge encoding")]
    InvalidChallengeEncoding,

    #[error("invalid challenge size: {0} bytes")]
    InvalidChallengeSize(usize),

    /// Credential id does not fit the 16-bit length prefix
    #[error("credential id too long: {0} bytes")]
    CredentialIdTooLong(usize),

    /// A transport string could not be decoded by the codec
    #[error("encoding error: {0}")]
    Encoding(#[from] UtilError),

    /// Challenge is absent, already consumed, expired, or its token is invalid
    #[error("unrecognized challenge")]
    UnrecognizedChallenge,

    #[error("client data type mismatch: expected {expected}, got {actual}")]
    ClientDataTypeMismatch { expected: String, actual: String },

    #[error("challenge mismatch")]
    ChallengeMismatch,

    #[error("rp id hash mismatch")]
    RpIdHashMismatch,

    #[error("origin not allowed: {0}")]
    OriginMismatch(String),

    #[error("cross-origin request not allowed")]
    CrossOriginNotAllowed,

    #[error("user presence flag not set")]
    UserNotPresent,

    #[error("user verification flag not set")]
    UserNotVerified,

    #[error("attested credential data missing")]
    MissingAttestedCredential,

    #[error("credential id does not match attested credential")]
    CredentialIdMismatch,

    #[error("user handle does not match user")]
    UserHandleMismatch,

    /// Algorithm is not in the relying party's advertised list
    #[error("unsupported public key type: {0}")]
    UnsupportedPublicKeyType(i64),

    /// Key/algorithm pair the verifier has no implementation for
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("unsupported attestation format: {0}")]
    UnsupportedAttestationFormat(String),

    #[error("attestation invalid: {0}")]
    AttestationInvalid(String),

    #[error("signature does not match")]
    SignatureMismatch,

    /// Key shape does not match the algorithm it claims
    #[error("invalid key for algorithm {0}")]
    InvalidKeyForAlgorithm(i64),

    #[error("user not found")]
    UserNotFound,

    #[error("credential not found")]
    CredentialNotFound,

    #[error("user has no credential")]
    NoCredentialsRegistered,

    #[error("store error: {0}")]
    Store(#[from] StorageError),

    #[error("crypto error: {0}")]
    Crypto(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// An error annotated with the ceremony step that produced it
    #[error("{step}: {source}")]
    Context {
        step: &'static str,
        #[source]
        source: Box<WebAuthnError>,
    },
}

impl WebAuthnError {
    /// Returns the innermost error, skipping every context layer.
    pub fn root(&self) -> &WebAuthnError {
        let mut current = self;
        while let WebAuthnError::Context { source, .. } = current {
            current = source;
        }
        current
    }

    pub(crate) fn with_context(self, step: &'static str) -> Self {
        WebAuthnError::Context {
            step,
            source: Box::new(self),
        }
    }
}

/// Adds a step label to the error side of a result.
pub(crate) trait ResultExt<T> {
    fn context(self, step: &'static str) -> Result<T, WebAuthnError>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<WebAuthnError>,
{
    fn context(self, step: &'static str) -> Result<T, WebAuthnError> {
        self.map_err(|e| e.into().with_context(step))
    }
}
