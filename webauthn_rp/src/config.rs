use serde::{Deserialize, Serialize};
use std::env;
use url::{Origin, Url};

use crate::passkey::{KeyType, WebAuthnError};

/// Identity of the verifying service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelyingParty {
    /// Effective domain the credentials are scoped to
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserVerification {
    Required,
    Preferred,
    Discouraged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttestationConveyance {
    None,
    Indirect,
    Direct,
    Enterprise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthenticatorAttachment {
    Platform,
    CrossPlatform,
}

const DEFAULT_TIMEOUT_MS: u32 = 60_000;

/// Relying-party settings shared by both ceremonies.
#[derive(Debug, Clone)]
pub struct WebAuthnConfig {
    pub rp: RelyingParty,
    /// Advertised algorithms, most preferred first
    pub algorithms: Vec<KeyType>,
    /// Origins accepted in client data
    pub origins: Vec<String>,
    pub allow_cross_origin: bool,
    pub user_verification: UserVerification,
    pub attestation: AttestationConveyance,
    pub authenticator_attachment: Option<AuthenticatorAttachment>,
    pub timeout_ms: u32,
}

impl WebAuthnConfig {
    pub fn new(rp: RelyingParty) -> Self {
        let origins = vec![format!("https://{}", rp.id)];
        Self {
            rp,
            algorithms: KeyType::ALL.to_vec(),
            origins,
            allow_cross_origin: false,
            user_verification: UserVerification::Preferred,
            attestation: AttestationConveyance::Direct,
            authenticator_attachment: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// Builds the configuration from `ORIGIN` and the `PASSKEY_*` variables.
    ///
    /// `ORIGIN` is mandatory; the relying-party id defaults to its host and the
    /// name defaults to the origin itself. Every other variable falls back to
    /// its default with a warning when it holds an unrecognized value.
    pub fn from_env() -> Result<Self, WebAuthnError> {
        let origin = env::var("ORIGIN")
            .map_err(|_| WebAuthnError::Config("ORIGIN must be set".to_string()))?;
        let url = Url::parse(&origin)
            .map_err(|e| WebAuthnError::Config(format!("Invalid ORIGIN {origin}: {e}")))?;
        let host = url
            .host_str()
            .ok_or_else(|| WebAuthnError::Config(format!("ORIGIN has no host: {origin}")))?;

        let rp = RelyingParty {
            id: env::var("PASSKEY_RP_ID").unwrap_or_else(|_| host.to_string()),
            name: env::var("PASSKEY_RP_NAME").unwrap_or_else(|_| origin.clone()),
        };

        let mut config = Self::new(rp);
        config.origins = vec![origin];
        config.algorithms = algorithms_from_env();
        config.user_verification = user_verification_from_env();
        config.attestation = attestation_from_env();
        config.authenticator_attachment = attachment_from_env();
        config.timeout_ms = timeout_from_env();
        config.allow_cross_origin = allow_cross_origin_from_env();

        Ok(config)
    }

    pub fn supports_algorithm(&self, alg: KeyType) -> bool {
        self.algorithms.contains(&alg)
    }

    /// Compares after normalizing scheme, host and port.
    pub fn is_allowed_origin(&self, origin: &str) -> bool {
        let origin = normalize_origin(origin);
        self.origins.iter().any(|o| normalize_origin(o) == origin)
    }
}

fn normalize_origin(origin: &str) -> String {
    match Url::parse(origin) {
        Ok(url) => match url.origin() {
            tuple @ Origin::Tuple(..) => tuple.ascii_serialization(),
            Origin::Opaque(_) => origin.to_string(),
        },
        Err(_) => origin.to_string(),
    }
}

fn algorithms_from_env() -> Vec<KeyType> {
    let Ok(value) = env::var("PASSKEY_ALGORITHMS") else {
        return KeyType::ALL.to_vec();
    };

    let mut algorithms = Vec::new();
    for name in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let parsed = KeyType::from_name(name).or_else(|| {
            name.parse::<i64>()
                .ok()
                .map(KeyType)
                .filter(|k| k.params().is_some())
        });
        match parsed {
            Some(alg) if !algorithms.contains(&alg) => algorithms.push(alg),
            Some(_) => {}
            None => tracing::warn!("Invalid algorithm in PASSKEY_ALGORITHMS: {}", name),
        }
    }

    if algorithms.is_empty() {
        tracing::warn!("PASSKEY_ALGORITHMS has no valid entry. Using all supported algorithms");
        return KeyType::ALL.to_vec();
    }
    algorithms
}

fn user_verification_from_env() -> UserVerification {
    match env::var("PASSKEY_USER_VERIFICATION").ok() {
        None => UserVerification::Preferred,
        Some(v) => match v.to_lowercase().as_str() {
            "required" => UserVerification::Required,
            "preferred" => UserVerification::Preferred,
            "discouraged" => UserVerification::Discouraged,
            invalid => {
                tracing::warn!(
                    "Invalid user verification: {}. Using default 'preferred'",
                    invalid
                );
                UserVerification::Preferred
            }
        },
    }
}

fn attestation_from_env() -> AttestationConveyance {
    match env::var("PASSKEY_ATTESTATION").ok() {
        None => AttestationConveyance::Direct,
        Some(v) => match v.to_lowercase().as_str() {
            "none" => AttestationConveyance::None,
            "indirect" => AttestationConveyance::Indirect,
            "direct" => AttestationConveyance::Direct,
            "enterprise" => AttestationConveyance::Enterprise,
            invalid => {
                tracing::warn!("Invalid attestation: {}. Using default 'direct'", invalid);
                AttestationConveyance::Direct
            }
        },
    }
}

fn attachment_from_env() -> Option<AuthenticatorAttachment> {
    let v = env::var("PASSKEY_AUTHENTICATOR_ATTACHMENT").ok()?;
    match v.to_lowercase().as_str() {
        "platform" => Some(AuthenticatorAttachment::Platform),
        "cross-platform" => Some(AuthenticatorAttachment::CrossPlatform),
        "none" => None,
        invalid => {
            tracing::warn!(
                "Invalid authenticator attachment: {}. Using no preference",
                invalid
            );
            None
        }
    }
}

fn timeout_from_env() -> u32 {
    let Ok(v) = env::var("PASSKEY_TIMEOUT") else {
        return DEFAULT_TIMEOUT_MS;
    };
    match v.trim().parse::<u32>() {
        Ok(secs) => secs.saturating_mul(1000),
        Err(e) => {
            tracing::warn!(
                "Invalid PASSKEY_TIMEOUT: {} ({}). Using default {} ms",
                v,
                e,
                DEFAULT_TIMEOUT_MS
            );
            DEFAULT_TIMEOUT_MS
        }
    }
}

fn allow_cross_origin_from_env() -> bool {
    match env::var("PASSKEY_ALLOW_CROSS_ORIGIN").ok() {
        None => false,
        Some(v) => match v.to_lowercase().as_str() {
            "true" => true,
            "false" => false,
            invalid => {
                tracing::warn!(
                    "Invalid PASSKEY_ALLOW_CROSS_ORIGIN: {}. Using default 'false'",
                    invalid
                );
                false
            }
        },
    }
}
