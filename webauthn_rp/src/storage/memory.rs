use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::passkey::{Challenge, Credential, User};

use super::errors::StorageError;
use super::types::{Challenges, Credentials, Users};

/// In-process implementation of every store collaborator.
///
/// Each map sits behind its own mutex, so challenge traffic never waits on
/// credential lookups. Challenges can be given a time-to-live; an expired
/// entry behaves exactly like a missing one.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    users: Mutex<HashMap<String, User>>,
    credentials: Mutex<HashMap<String, Vec<Credential>>>,
    challenges: Mutex<HashMap<(String, Challenge), DateTime<Utc>>>,
    challenge_ttl: Option<Duration>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        tracing::info!("Creating new in-memory webauthn store");
        Self::default()
    }

    pub fn with_challenge_ttl(mut self, ttl: Duration) -> Self {
        self.challenge_ttl = Some(ttl);
        self
    }

    pub async fn insert_user(&self, user: User) {
        self.users.lock().await.insert(user.id.clone(), user);
    }

    fn make_key(user_id: &str, challenge: &Challenge) -> (String, Challenge) {
        (user_id.to_string(), *challenge)
    }

    fn is_expired(&self, issued_at: &DateTime<Utc>) -> bool {
        match self.challenge_ttl {
            Some(ttl) => *issued_at + ttl <= Utc::now(),
            None => false,
        }
    }
}

#[async_trait]
impl Credentials for InMemoryStore {
    async fn get_credentials(&self, user: &User) -> Result<Vec<Credential>, StorageError> {
        let credentials = self.credentials.lock().await;
        Ok(credentials.get(&user.id).cloned().unwrap_or_default())
    }

    async fn get_credential(
        &self,
        user: &User,
        credential_id: &[u8],
    ) -> Result<Option<Credential>, StorageError> {
        let credentials = self.credentials.lock().await;
        Ok(credentials
            .get(&user.id)
            .and_then(|creds| creds.iter().find(|c| c.id == credential_id))
            .cloned())
    }

    async fn store_credential(
        &self,
        user: &User,
        credential: Credential,
    ) -> Result<(), StorageError> {
        let mut credentials = self.credentials.lock().await;
        let entry = credentials.entry(user.id.clone()).or_default();
        if entry.iter().any(|c| c.id == credential.id) {
            return Err(StorageError::DuplicateCredential(user.id.clone()));
        }
        entry.push(credential);
        Ok(())
    }
}

#[async_trait]
impl Challenges for InMemoryStore {
    async fn store_challenge(
        &self,
        user_id: &str,
        challenge: &Challenge,
    ) -> Result<(), StorageError> {
        let key = Self::make_key(user_id, challenge);
        let mut challenges = self.challenges.lock().await;
        // Abandoned ceremonies never call take, so sweep on insert.
        if self.challenge_ttl.is_some() {
            challenges.retain(|_, issued_at| !self.is_expired(issued_at));
        }
        challenges.insert(key, Utc::now());
        Ok(())
    }

    async fn has_challenge(
        &self,
        user_id: &str,
        challenge: &Challenge,
    ) -> Result<bool, StorageError> {
        let key = Self::make_key(user_id, challenge);
        let challenges = self.challenges.lock().await;
        Ok(challenges
            .get(&key)
            .is_some_and(|issued_at| !self.is_expired(issued_at)))
    }

    async fn remove_challenge(
        &self,
        user_id: &str,
        challenge: &Challenge,
    ) -> Result<(), StorageError> {
        let key = Self::make_key(user_id, challenge);
        self.challenges.lock().await.remove(&key);
        Ok(())
    }

    async fn take_challenge(
        &self,
        user_id: &str,
        challenge: &Challenge,
    ) -> Result<bool, StorageError> {
        let key = Self::make_key(user_id, challenge);
        // Check and delete under one lock so racing consumers see exactly one hit.
        let mut challenges = self.challenges.lock().await;
        match challenges.remove(&key) {
            Some(issued_at) => Ok(!self.is_expired(&issued_at)),
            None => Ok(false),
        }
    }
}

#[async_trait]
impl Users for InMemoryStore {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, StorageError> {
        Ok(self.users.lock().await.get(user_id).cloned())
    }
}
