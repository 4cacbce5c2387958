use std::sync::Arc;

use crate::auth::{CredentialVerifier, PasswordHasher, TokenService};
use crate::config::AppConfig;
use crate::database::Store;

/// Shared, read-only application state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub tokens: Arc<TokenService>,
    pub passwords: PasswordHasher,
    pub store: Arc<dyn Store>,
    credentials: CredentialVerifier,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn Store>) -> Self {
        let tokens = TokenService::new(&config.security);
        let passwords = PasswordHasher::new(config.security.bcrypt_cost);

        let credentials = CredentialVerifier::new(store.clone(), passwords);

        Self {
            config: Arc::new(config),
            tokens: Arc::new(tokens),
            passwords,
            store,
            credentials,
        }
    }

    pub fn credentials(&self) -> &CredentialVerifier {
        &self.credentials
    }
}
