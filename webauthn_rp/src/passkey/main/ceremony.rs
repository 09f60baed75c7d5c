use ring::digest;
use std::sync::Arc;

use crate::config::{UserVerification, WebAuthnConfig};
use crate::passkey::errors::WebAuthnError;
use crate::passkey::types::{PUBLIC_KEY_CREDENTIAL_TYPE, PubKeyCredParam, User};
use crate::storage::{Credentials, Users};
use crate::utils::{Base64UrlCodec, Codec};

use super::auth_data::AuthenticatorData;
use super::challenge::{Challenge, ChallengeLedger};

/// Relying-party engine running the registration and authentication ceremonies.
///
/// All collaborators are handed in at construction. The engine keeps no state
/// of its own between calls; challenge state lives in the ledger and
/// credentials live in the credential store.
pub struct WebAuthn {
    pub(super) config: WebAuthnConfig,
    pub(super) credentials: Arc<dyn Credentials>,
    pub(super) users: Option<Arc<dyn Users>>,
    pub(super) ledger: Arc<dyn ChallengeLedger>,
    pub(super) codec: Arc<dyn Codec>,
}

impl WebAuthn {
    pub fn new(
        config: WebAuthnConfig,
        credentials: Arc<dyn Credentials>,
        ledger: Arc<dyn ChallengeLedger>,
    ) -> Self {
        Self {
            config,
            credentials,
            users: None,
            ledger,
            codec: Arc::new(Base64UrlCodec),
        }
    }

    /// Enables the `*_for(user_id)` entry points.
    pub fn with_users(mut self, users: Arc<dyn Users>) -> Self {
        self.users = Some(users);
        self
    }

    pub fn with_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn config(&self) -> &WebAuthnConfig {
        &self.config
    }

    pub(super) fn encode(&self, bytes: &[u8]) -> String {
        self.codec.encode_to_string(bytes)
    }

    pub(super) fn decode(&self, value: &str) -> Result<Vec<u8>, WebAuthnError> {
        Ok(self.codec.decode_string(value)?)
    }

    pub(super) fn pub_key_cred_params(&self) -> Vec<PubKeyCredParam> {
        self.config
            .algorithms
            .iter()
            .map(|alg| PubKeyCredParam {
                type_: PUBLIC_KEY_CREDENTIAL_TYPE.to_string(),
                alg: alg.0,
            })
            .collect()
    }

    /// Checks the rpIdHash and the presence/verification flags.
    pub(super) fn check_auth_data(
        &self,
        auth_data: &AuthenticatorData,
    ) -> Result<(), WebAuthnError> {
        let expected = digest::digest(&digest::SHA256, self.config.rp.id.as_bytes());
        if auth_data.rp_id_hash[..] != *expected.as_ref() {
            return Err(WebAuthnError::RpIdHashMismatch);
        }
        if !auth_data.user_present() {
            return Err(WebAuthnError::UserNotPresent);
        }
        if self.config.user_verification == UserVerification::Required && !auth_data.user_verified()
        {
            return Err(WebAuthnError::UserNotVerified);
        }
        Ok(())
    }

    /// Decodes the optional top-level `challenge` field of a response.
    pub(super) fn presented_challenge(
        &self,
        challenge: Option<&str>,
    ) -> Result<Option<Challenge>, WebAuthnError> {
        challenge
            .map(|c| Challenge::try_from(self.decode(c)?.as_slice()))
            .transpose()
    }

    pub(super) async fn lookup_user(&self, user_id: &str) -> Result<User, WebAuthnError> {
        let users = self.users.as_ref().ok_or(WebAuthnError::UserNotFound)?;
        users
            .get_user(user_id)
            .await?
            .ok_or(WebAuthnError::UserNotFound)
    }
}
