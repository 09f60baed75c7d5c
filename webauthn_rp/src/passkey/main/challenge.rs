use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::passkey::errors::WebAuthnError;
use crate::storage::Challenges;
use crate::utils::{base64url_encode, gen_random_bytes};

use super::keys::HashAlg;

pub const CHALLENGE_SIZE: usize = 32;

const DEFAULT_TOKEN_LIFETIME_MINUTES: i64 = 15;

/// A 32-byte nonce bound to one ceremony attempt.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Challenge([u8; CHALLENGE_SIZE]);

impl Challenge {
    pub fn from_bytes(bytes: [u8; CHALLENGE_SIZE]) -> Self {
        Challenge(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; CHALLENGE_SIZE] {
        &self.0
    }

    pub fn generate() -> Result<Self, WebAuthnError> {
        let bytes = gen_random_bytes::<CHALLENGE_SIZE>()
            .map_err(|e| WebAuthnError::Crypto(e.to_string()))?;
        Ok(Challenge(bytes))
    }

    pub(crate) fn ct_eq(&self, other: &Challenge) -> bool {
        self.0[..].ct_eq(&other.0[..]).into()
    }
}

impl TryFrom<&[u8]> for Challenge {
    type Error = WebAuthnError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; CHALLENGE_SIZE] = bytes
            .try_into()
            .map_err(|_| WebAuthnError::InvalidChallengeSize(bytes.len()))?;
        Ok(Challenge(bytes))
    }
}

impl fmt::Debug for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Challenge({})", base64url_encode(&self.0))
    }
}

/// Produces fresh challenges. Swappable so tests can pin the value.
pub type ChallengeFn = Arc<dyn Fn() -> Result<Challenge, WebAuthnError> + Send + Sync>;

fn default_generator() -> ChallengeFn {
    Arc::new(Challenge::generate)
}

#[derive(Debug, Clone)]
pub struct IssuedChallenge {
    pub challenge: Challenge,
    /// Set by ledgers that hand the proof of issuance to the client
    pub token: Option<String>,
}

/// Issues challenges and accepts each one back at most once.
#[async_trait]
pub trait ChallengeLedger: Send + Sync {
    async fn issue(&self, user_id: &str) -> Result<IssuedChallenge, WebAuthnError>;

    /// Fails with [`WebAuthnError::UnrecognizedChallenge`] when `challenge`
    /// was not issued to `user_id` or has already been used.
    async fn consume(
        &self,
        user_id: &str,
        challenge: &Challenge,
        token: Option<&str>,
    ) -> Result<(), WebAuthnError>;
}

/// Ledger that records every issued challenge in a [`Challenges`] store.
pub struct StoreLedger {
    store: Arc<dyn Challenges>,
    generate: ChallengeFn,
}

impl StoreLedger {
    pub fn new(store: Arc<dyn Challenges>) -> Self {
        Self {
            store,
            generate: default_generator(),
        }
    }

    pub fn with_generator(mut self, generate: ChallengeFn) -> Self {
        self.generate = generate;
        self
    }
}

#[async_trait]
impl ChallengeLedger for StoreLedger {
    async fn issue(&self, user_id: &str) -> Result<IssuedChallenge, WebAuthnError> {
        let challenge = (self.generate)()?;
        self.store.store_challenge(user_id, &challenge).await?;
        tracing::debug!("Issued challenge for user {}", user_id);
        Ok(IssuedChallenge {
            challenge,
            token: None,
        })
    }

    async fn consume(
        &self,
        user_id: &str,
        challenge: &Challenge,
        _token: Option<&str>,
    ) -> Result<(), WebAuthnError> {
        if !self.store.take_challenge(user_id, challenge).await? {
            return Err(WebAuthnError::UnrecognizedChallenge);
        }
        tracing::debug!("Consumed challenge for user {}", user_id);
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    uid: String,
    chash: String,
    exp: i64,
}

/// Stateless ledger: the proof of issuance is an HS256 JWT held by the client.
///
/// Nothing is stored server-side, so a token stays usable until it expires.
/// Deployments that need strict single use should prefer [`StoreLedger`].
pub struct TokenLedger {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Duration,
    generate: ChallengeFn,
}

impl TokenLedger {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            lifetime: Duration::minutes(DEFAULT_TOKEN_LIFETIME_MINUTES),
            generate: default_generator(),
        }
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn with_generator(mut self, generate: ChallengeFn) -> Self {
        self.generate = generate;
        self
    }

    fn challenge_hash(challenge: &Challenge) -> String {
        base64url_encode(&HashAlg::Sha256.digest(challenge.as_bytes()))
    }

    fn create_token(&self, user_id: &str, challenge: &Challenge) -> Result<String, WebAuthnError> {
        let claims = TokenClaims {
            uid: user_id.to_string(),
            chash: Self::challenge_hash(challenge),
            exp: (Utc::now() + self.lifetime).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| WebAuthnError::Crypto(format!("Failed to sign challenge token: {e}")))
    }
}

#[async_trait]
impl ChallengeLedger for TokenLedger {
    async fn issue(&self, user_id: &str) -> Result<IssuedChallenge, WebAuthnError> {
        let challenge = (self.generate)()?;
        let token = self.create_token(user_id, &challenge)?;
        tracing::debug!("Issued challenge token for user {}", user_id);
        Ok(IssuedChallenge {
            challenge,
            token: Some(token),
        })
    }

    async fn consume(
        &self,
        user_id: &str,
        challenge: &Challenge,
        token: Option<&str>,
    ) -> Result<(), WebAuthnError> {
        let token = token.ok_or(WebAuthnError::UnrecognizedChallenge)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_aud = false;

        let claims = decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                tracing::debug!("Rejected challenge token: {}", e);
                WebAuthnError::UnrecognizedChallenge
            })?
            .claims;

        let expected = Self::challenge_hash(challenge);
        let hash_matches: bool = claims.chash.as_bytes().ct_eq(expected.as_bytes()).into();
        if !hash_matches || claims.uid != user_id {
            return Err(WebAuthnError::UnrecognizedChallenge);
        }
        Ok(())
    }
}
