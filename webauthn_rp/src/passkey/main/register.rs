use crate::passkey::errors::{ResultExt, WebAuthnError};
use crate::passkey::types::{
    AuthenticatorSelection, Credential, PUBLIC_KEY_CREDENTIAL_TYPE, PublicKeyCredentialUserEntity,
    RegistrationChallenge, RegistrationResponse, RegistrationResult, User,
};

use super::attestation::{AttestationObject, verify_attestation};
use super::ceremony::WebAuthn;
use super::client_data::{CLIENT_DATA_TYPE_CREATE, ClientData};

impl WebAuthn {
    /// Starts a registration ceremony for `user`.
    pub async fn create_registration(
        &self,
        user: &User,
    ) -> Result<RegistrationChallenge, WebAuthnError> {
        let issued = self
            .ledger
            .issue(&user.id)
            .await
            .context("issuing registration challenge")?;

        let authenticator_selection = AuthenticatorSelection {
            authenticator_attachment: self.config.authenticator_attachment,
            user_verification: self.config.user_verification,
        };

        Ok(RegistrationChallenge {
            challenge: self.encode(issued.challenge.as_bytes()),
            rp: self.config.rp.clone(),
            user: PublicKeyCredentialUserEntity {
                id: self.encode(user.id.as_bytes()),
                name: user.name.clone(),
                display_name: user.display_name.clone(),
            },
            pub_key_cred_params: self.pub_key_cred_params(),
            timeout: self.config.timeout_ms,
            attestation: self.config.attestation,
            authenticator_selection,
            token: issued.token,
        })
    }

    /// [`create_registration`](Self::create_registration) for a user resolved
    /// through the configured [`Users`](crate::storage::Users) store.
    pub async fn create_registration_for(
        &self,
        user_id: &str,
    ) -> Result<RegistrationChallenge, WebAuthnError> {
        let user = self.lookup_user(user_id).await?;
        self.create_registration(&user).await
    }

    /// Verifies the client's attestation response and stores the new credential.
    ///
    /// The client-data challenge is matched before the ledger entry is
    /// consumed, so a response carrying the wrong challenge leaves the issued
    /// one usable.
    pub async fn verify_registration(
        &self,
        user: &User,
        response: &RegistrationResponse,
    ) -> Result<RegistrationResult, WebAuthnError> {
        let credential_id = self
            .decode(&response.credential_id)
            .context("decoding credentialId")?;
        let client_data_json = self
            .decode(&response.response.client_data_json)
            .context("decoding clientDataJSON")?;
        let attestation_bytes = self
            .decode(&response.response.attestation_object)
            .context("decoding attestationObject")?;

        let client_data = ClientData::decode(&client_data_json).context("parsing client data")?;
        client_data
            .check_type(CLIENT_DATA_TYPE_CREATE)
            .context("checking client data type")?;
        let challenge = client_data
            .decode_challenge()
            .context("reading client data challenge")?;
        if let Some(presented) = self
            .presented_challenge(response.challenge.as_deref())
            .context("decoding challenge")?
        {
            if !presented.ct_eq(&challenge) {
                return Err(WebAuthnError::ChallengeMismatch.with_context("matching challenge"));
            }
        }
        client_data
            .check_origin(&self.config)
            .context("checking origin")?;

        let attestation =
            AttestationObject::decode(&attestation_bytes).context("decoding attestation object")?;

        self.ledger
            .consume(&user.id, &challenge, response.token.as_deref())
            .await
            .context("consuming challenge")?;

        let auth_data = &attestation.auth_data;
        self.check_auth_data(auth_data)
            .context("checking authenticator data")?;
        let attested = auth_data
            .attested_credential
            .as_ref()
            .ok_or(WebAuthnError::MissingAttestedCredential)
            .context("reading attested credential")?;
        if attested.credential_id != credential_id {
            return Err(
                WebAuthnError::CredentialIdMismatch.with_context("reading attested credential")
            );
        }

        let (public_key, alg) = attested
            .public_key()
            .context("decoding credential public key")?;
        if !self.config.supports_algorithm(alg) {
            return Err(WebAuthnError::UnsupportedPublicKeyType(alg.0)
                .with_context("checking credential algorithm"));
        }
        if !alg.check_key(&public_key) {
            return Err(WebAuthnError::InvalidKeyForAlgorithm(alg.0)
                .with_context("checking credential algorithm"));
        }

        verify_attestation(&attestation, &client_data_json).context("verifying attestation")?;

        let credential = Credential {
            id: credential_id,
            credential_type: PUBLIC_KEY_CREDENTIAL_TYPE.to_string(),
            public_key: public_key
                .to_spki_der()
                .context("encoding credential public key")?,
            public_key_alg: alg.0,
        };
        self.credentials
            .store_credential(user, credential.clone())
            .await
            .context("storing credential")?;

        tracing::debug!(
            "Registered {} credential for user {} with {} attestation",
            alg.name().unwrap_or("unknown"),
            user.id,
            attestation.fmt
        );

        Ok(RegistrationResult {
            credential,
            attestation_format: attestation.fmt.clone(),
            aaguid: attested.aaguid_string(),
            sign_count: auth_data.sign_count,
            backup_eligible: auth_data.backup_eligible(),
            backed_up: auth_data.backed_up(),
        })
    }
}
