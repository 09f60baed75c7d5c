use async_trait::async_trait;

use crate::passkey::{Challenge, Credential, User};

use super::errors::StorageError;

/// Persistent record of registered credentials, owned by the application.
#[async_trait]
pub trait Credentials: Send + Sync + 'static {
    async fn get_credentials(&self, user: &User) -> Result<Vec<Credential>, StorageError>;

    async fn get_credential(
        &self,
        user: &User,
        credential_id: &[u8],
    ) -> Result<Option<Credential>, StorageError>;

    async fn store_credential(&self, user: &User, credential: Credential)
    -> Result<(), StorageError>;
}

/// Backing map for issued challenges, keyed by `(user_id, challenge)`.
#[async_trait]
pub trait Challenges: Send + Sync + 'static {
    async fn store_challenge(&self, user_id: &str, challenge: &Challenge)
    -> Result<(), StorageError>;

    async fn has_challenge(&self, user_id: &str, challenge: &Challenge)
    -> Result<bool, StorageError>;

    async fn remove_challenge(
        &self,
        user_id: &str,
        challenge: &Challenge,
    ) -> Result<(), StorageError>;

    /// Removes the challenge if present and reports whether it was.
    ///
    /// The default runs `has_challenge` then `remove_challenge`, which is only
    /// linearizable if the store serializes callers itself. Stores that can do
    /// a conditional delete should override this.
    async fn take_challenge(&self, user_id: &str, challenge: &Challenge)
    -> Result<bool, StorageError> {
        if !self.has_challenge(user_id, challenge).await? {
            return Ok(false);
        }
        self.remove_challenge(user_id, challenge).await?;
        Ok(true)
    }
}

#[async_trait]
pub trait Users: Send + Sync + 'static {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, StorageError>;
}
