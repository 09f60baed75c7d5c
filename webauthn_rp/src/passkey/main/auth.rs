use crate::passkey::errors::{ResultExt, WebAuthnError};
use crate::passkey::types::{
    AllowedCredential, AuthenticationChallenge, AuthenticationResponse, AuthenticationResult, User,
};

use super::auth_data::AuthenticatorData;
use super::ceremony::WebAuthn;
use super::client_data::{CLIENT_DATA_TYPE_GET, ClientData};
use super::keys::{KeyType, PublicKey};
use super::signature::verify_signature;

impl WebAuthn {
    /// Starts an authentication ceremony, listing every credential `user` owns.
    pub async fn create_authentication(
        &self,
        user: &User,
    ) -> Result<AuthenticationChallenge, WebAuthnError> {
        let credentials = self
            .credentials
            .get_credentials(user)
            .await
            .context("loading credentials")?;
        if credentials.is_empty() {
            return Err(WebAuthnError::NoCredentialsRegistered);
        }

        let issued = self
            .ledger
            .issue(&user.id)
            .await
            .context("issuing authentication challenge")?;

        let allow_credentials = credentials
            .iter()
            .map(|credential| AllowedCredential {
                type_: credential.credential_type.clone(),
                id: self.encode(&credential.id),
            })
            .collect();

        Ok(AuthenticationChallenge {
            challenge: self.encode(issued.challenge.as_bytes()),
            rp_id: self.config.rp.id.clone(),
            allow_credentials,
            timeout: self.config.timeout_ms,
            user_verification: self.config.user_verification,
            token: issued.token,
        })
    }

    pub async fn create_authentication_for(
        &self,
        user_id: &str,
    ) -> Result<AuthenticationChallenge, WebAuthnError> {
        let user = self.lookup_user(user_id).await?;
        self.create_authentication(&user).await
    }

    /// Verifies an assertion against the credential it names.
    ///
    /// The challenge is consumed before anything else is checked, so a
    /// failed attempt cannot be retried with the same challenge.
    pub async fn verify_authentication(
        &self,
        user: &User,
        response: &AuthenticationResponse,
    ) -> Result<AuthenticationResult, WebAuthnError> {
        let credential_id = self
            .decode(&response.credential_id)
            .context("decoding credentialId")?;
        let auth_data_bytes = self
            .decode(&response.response.authenticator_data)
            .context("decoding authenticatorData")?;
        let client_data_json = self
            .decode(&response.response.client_data_json)
            .context("decoding clientDataJSON")?;
        let signature = self
            .decode(&response.response.signature)
            .context("decoding signature")?;

        let client_data = ClientData::decode(&client_data_json).context("parsing client data")?;
        let challenge = match self
            .presented_challenge(response.challenge.as_deref())
            .context("decoding challenge")?
        {
            Some(challenge) => challenge,
            None => client_data
                .decode_challenge()
                .context("reading client data challenge")?,
        };

        self.ledger
            .consume(&user.id, &challenge, response.token.as_deref())
            .await
            .context("consuming challenge")?;

        let credential = self
            .credentials
            .get_credential(user, &credential_id)
            .await
            .context("loading credential")?
            .ok_or(WebAuthnError::CredentialNotFound)
            .context("loading credential")?;
        let public_key =
            PublicKey::from_spki_der(&credential.public_key).context("decoding stored public key")?;

        client_data
            .check_type(CLIENT_DATA_TYPE_GET)
            .context("checking client data type")?;
        let client_challenge = client_data
            .decode_challenge()
            .context("reading client data challenge")?;
        if !client_challenge.ct_eq(&challenge) {
            return Err(WebAuthnError::ChallengeMismatch.with_context("matching challenge"));
        }
        client_data
            .check_origin(&self.config)
            .context("checking origin")?;

        let auth_data =
            AuthenticatorData::decode(&auth_data_bytes).context("decoding authenticator data")?;
        self.check_auth_data(&auth_data)
            .context("checking authenticator data")?;

        // Some platforms send an empty string instead of null
        if let Some(handle) = response
            .response
            .user_handle
            .as_deref()
            .filter(|h| !h.is_empty())
        {
            let handle = self.decode(handle).context("decoding userHandle")?;
            if handle != user.id.as_bytes() {
                return Err(WebAuthnError::UserHandleMismatch.with_context("checking userHandle"));
            }
        }

        let alg = KeyType(credential.public_key_alg);
        if !self.config.supports_algorithm(alg) {
            return Err(WebAuthnError::UnsupportedPublicKeyType(alg.0)
                .with_context("checking credential algorithm"));
        }

        let verified = verify_signature(
            &public_key,
            alg,
            &signature,
            &client_data_json,
            &auth_data_bytes,
        )
        .context("verifying signature")?;
        if !verified {
            return Err(WebAuthnError::SignatureMismatch.with_context("verifying signature"));
        }

        tracing::debug!(
            "Authenticated user {} with credential {}",
            user.id,
            self.encode(&credential.id)
        );

        Ok(AuthenticationResult {
            credential,
            sign_count: auth_data.sign_count,
            user_verified: auth_data.user_verified(),
        })
    }
}
