use crate::common::{Attestation, SoftAuthenticator, config, token_engine, user};

use webauthn_rp::{KeyType, WebAuthnError};

const SECRET: &[u8] = b"integration-test-secret-0123456789";

#[tokio::test]
async fn test_full_ceremony_with_tokens() -> Result<(), Box<dyn std::error::Error>> {
    let (webauthn, _) = token_engine(config(), SECRET);
    let alice = user("alice");
    let mut authenticator = SoftAuthenticator::new(KeyType::ES256, b"token-cred");

    println!("Step: Registration with a challenge token");
    let options = webauthn.create_registration(&alice).await?;
    assert!(options.token.is_some());
    let response = authenticator.register(&options, Attestation::PackedSelf);
    webauthn.verify_registration(&alice, &response).await?;

    println!("Step: Authentication with a challenge token");
    let options = webauthn.create_authentication(&alice).await?;
    assert!(options.token.is_some());
    let response = authenticator.authenticate(&options, Some(b"alice"));
    let result = webauthn.verify_authentication(&alice, &response).await?;
    assert_eq!(result.credential.id, b"token-cred");
    Ok(())
}

#[tokio::test]
async fn test_missing_token_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let (webauthn, _) = token_engine(config(), SECRET);
    let alice = user("alice");
    let mut authenticator = SoftAuthenticator::new(KeyType::ES256, b"cred");

    let options = webauthn.create_registration(&alice).await?;
    let mut response = authenticator.register(&options, Attestation::None);
    response.token = None;

    let err = webauthn
        .verify_registration(&alice, &response)
        .await
        .expect_err("token is required");
    assert!(matches!(err.root(), WebAuthnError::UnrecognizedChallenge));
    Ok(())
}

#[tokio::test]
async fn test_token_bound_to_user() -> Result<(), Box<dyn std::error::Error>> {
    let (webauthn, _) = token_engine(config(), SECRET);
    let mut authenticator = SoftAuthenticator::new(KeyType::ES256, b"cred");

    let options = webauthn.create_registration(&user("alice")).await?;
    let response = authenticator.register(&options, Attestation::None);

    let err = webauthn
        .verify_registration(&user("bob"), &response)
        .await
        .expect_err("token was issued for alice");
    assert!(matches!(err.root(), WebAuthnError::UnrecognizedChallenge));
    Ok(())
}

#[tokio::test]
async fn test_token_from_other_deployment_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let (issuer, _) = token_engine(config(), b"some-other-secret-value-abcdefgh");
    let (verifier, _) = token_engine(config(), SECRET);
    let alice = user("alice");
    let mut authenticator = SoftAuthenticator::new(KeyType::ES256, b"cred");

    let options = issuer.create_registration(&alice).await?;
    let response = authenticator.register(&options, Attestation::None);

    let err = verifier
        .verify_registration(&alice, &response)
        .await
        .expect_err("token signed with another secret");
    assert!(matches!(err.root(), WebAuthnError::UnrecognizedChallenge));
    Ok(())
}
