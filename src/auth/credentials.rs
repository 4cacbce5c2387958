use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::debug;

use super::password::{PasswordError, PasswordHasher};
use crate::database::models::User;
use crate::database::{Store, StoreError, UserStore};

#[derive(Debug, Error)]
pub enum CredentialError {
    /// Unknown user or wrong password; callers must not tell them apart
    #[error("bad credentials")]
    BadCredentials,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Password(#[from] PasswordError),
}

/// Password hashed once per process and checked against on unknown
/// usernames, so both failure paths pay for one bcrypt verification
const UNKNOWN_USER_PASSWORD: &str = "unknown-user-placeholder-password";

/// Checks a username/password pair against the stored bcrypt hash
#[derive(Clone)]
pub struct CredentialVerifier {
    store: Arc<dyn Store>,
    passwords: PasswordHasher,
    unknown_user_hash: Arc<OnceCell<String>>,
}

impl CredentialVerifier {
    pub fn new(store: Arc<dyn Store>, passwords: PasswordHasher) -> Self {
        Self {
            store,
            passwords,
            unknown_user_hash: Arc::new(OnceCell::new()),
        }
    }

    pub async fn verify(&self, username: &str, password: &str) -> Result<User, CredentialError> {
        let Some(user) = self.store.find_user_by_username(username).await? else {
            debug!("Login attempt for unknown user '{}'", username);
            let hash = self
                .unknown_user_hash
                .get_or_try_init(|| self.passwords.hash(UNKNOWN_USER_PASSWORD))
                .await?;
            self.passwords.verify(password, hash).await?;
            return Err(CredentialError::BadCredentials);
        };

        if !self.passwords.verify(password, &user.password_hash).await? {
            debug!("Wrong password for user '{}'", username);
            return Err(CredentialError::BadCredentials);
        }

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::NewUser;
    use crate::database::MemoryStore;
    use crate::types::Role;

    async fn verifier_with(username: &str, password: &str) -> CredentialVerifier {
        let store = Arc::new(MemoryStore::new());
        let passwords = PasswordHasher::new(4);
        store
            .insert_user(NewUser {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                password_hash: passwords.hash(password).await.unwrap(),
                role: Role::User,
            })
            .await
            .unwrap();
        CredentialVerifier::new(store, passwords)
    }

    #[tokio::test]
    async fn accepts_matching_password() {
        let verifier = verifier_with("carol", "password123").await;
        let user = verifier.verify("carol", "password123").await.unwrap();
        assert_eq!(user.username, "carol");
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_the_same() {
        let verifier = verifier_with("carol", "password123").await;
        assert!(matches!(verifier.verify("carol", "nope").await, Err(CredentialError::BadCredentials)));
        assert!(matches!(verifier.verify("mallory", "password123").await, Err(CredentialError::BadCredentials)));
    }

    #[tokio::test]
    async fn unknown_user_still_runs_a_bcrypt_check() {
        let verifier = verifier_with("carol", "password123").await;
        assert!(verifier.unknown_user_hash.get().is_none());

        let result = verifier.verify("mallory", UNKNOWN_USER_PASSWORD).await;
        assert!(matches!(result, Err(CredentialError::BadCredentials)));

        // hashed at the configured cost, and shared by clones
        let hash = verifier.clone().unknown_user_hash.get().cloned().unwrap();
        assert!(hash.starts_with("$2b$04$"), "unexpected hash {}", hash);
        assert!(verifier.passwords.verify(UNKNOWN_USER_PASSWORD, &hash).await.unwrap());
    }
}
