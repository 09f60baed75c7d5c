use serde::{Deserialize, Serialize};

use crate::config::{AttestationConveyance, AuthenticatorAttachment, RelyingParty, UserVerification};

/// Account being registered or authenticated.
///
/// Owned by the application. The engine only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub display_name: String,
}

/// A registered credential as handed to the credential store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    /// Raw credential id chosen by the authenticator
    pub id: Vec<u8>,
    /// Always `"public-key"`
    #[serde(rename = "type")]
    pub credential_type: String,
    /// DER SubjectPublicKeyInfo of the credential public key
    pub public_key: Vec<u8>,
    /// COSE algorithm identifier the credential signs with
    pub public_key_alg: i64,
}

pub(crate) const PUBLIC_KEY_CREDENTIAL_TYPE: &str = "public-key";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyCredentialUserEntity {
    pub id: String,
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubKeyCredParam {
    #[serde(rename = "type")]
    pub type_: String,
    pub alg: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorSelection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authenticator_attachment: Option<AuthenticatorAttachment>,
    pub user_verification: UserVerification,
}

/// Options sent to the client to start a registration ceremony.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationChallenge {
    pub challenge: String,
    pub rp: RelyingParty,
    pub user: PublicKeyCredentialUserEntity,
    pub pub_key_cred_params: Vec<PubKeyCredParam>,
    pub timeout: u32,
    pub attestation: AttestationConveyance,
    pub authenticator_selection: AuthenticatorSelection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorAttestationResponse {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    pub attestation_object: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub credential_id: String,
    pub response: AuthenticatorAttestationResponse,
}

/// Outcome of a successful registration.
#[derive(Debug, Clone)]
pub struct RegistrationResult {
    pub credential: Credential,
    pub attestation_format: String,
    /// Hyphenated authenticator model id
    pub aaguid: String,
    pub sign_count: u32,
    pub backup_eligible: bool,
    pub backed_up: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedCredential {
    #[serde(rename = "type")]
    pub type_: String,
    pub id: String,
}

/// Options sent to the client to start an authentication ceremony.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationChallenge {
    pub challenge: String,
    pub rp_id: String,
    pub allow_credentials: Vec<AllowedCredential>,
    pub timeout: u32,
    pub user_verification: UserVerification,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorAssertionResponse {
    pub authenticator_data: String,
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    pub signature: String,
    #[serde(default)]
    pub user_handle: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub credential_id: String,
    pub response: AuthenticatorAssertionResponse,
}

/// Outcome of a successful authentication.
#[derive(Debug, Clone)]
pub struct AuthenticationResult {
    pub credential: Credential,
    pub sign_count: u32,
    pub user_verified: bool,
}
