use std::sync::Arc;
use tracing::info;

use super::ServiceResult;
use crate::api::users::{CreateUserRequest, UpdateUserRequest};
use crate::auth::PasswordHasher;
use crate::config::BootstrapAdmin;
use crate::database::models::{NewUser, User};
use crate::database::{Store, UserStore};
use crate::error::ApiError;
use crate::state::AppState;
use crate::types::Role;

pub struct UserService {
    store: Arc<dyn Store>,
    passwords: PasswordHasher,
}

impl UserService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            passwords: state.passwords,
        }
    }

    /// Self-service sign-up. New accounts always get the USER role.
    pub async fn register(&self, request: CreateUserRequest) -> ServiceResult<User> {
        self.create(request.username, request.email, &request.password, Role::User).await
    }

    pub async fn list(&self) -> ServiceResult<Vec<User>> {
        Ok(self.store.list_users().await?)
    }

    pub async fn get(&self, id: i64) -> ServiceResult<User> {
        self.store
            .find_user(id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("User not found with id: {}", id)))
    }

    pub async fn get_by_username(&self, username: &str) -> ServiceResult<User> {
        self.store
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("User not found with username: {}", username)))
    }

    /// Apply a partial update. `caller_is_admin` gates role changes.
    pub async fn update(&self, id: i64, request: UpdateUserRequest, caller_is_admin: bool) -> ServiceResult<User> {
        let mut user = self.get(id).await?;

        if let Some(role) = request.role {
            if role != user.role && !caller_is_admin {
                return Err(ApiError::forbidden("Access denied: only administrators can change roles"));
            }
            user.role = role;
        }
        if let Some(username) = request.username {
            if username != user.username {
                self.ensure_username_free(&username).await?;
                user.username = username;
            }
        }
        if let Some(email) = request.email {
            if !email.eq_ignore_ascii_case(&user.email) {
                self.ensure_email_free(&email).await?;
            }
            user.email = email;
        }
        if let Some(password) = request.password {
            user.password_hash = self.passwords.hash(&password).await?;
        }

        Ok(self.store.save_user(&user).await?)
    }

    /// Removes the user and, with them, their expenses and incomes
    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        if !self.store.delete_user(id).await? {
            return Err(ApiError::not_found(format!("User not found with id: {}", id)));
        }
        info!("Deleted user {}", id);
        Ok(())
    }

    /// Create the configured administrator unless the username is taken.
    /// Returns the new account, or `None` when nothing was created.
    pub async fn bootstrap_admin(&self, admin: &BootstrapAdmin) -> ServiceResult<Option<User>> {
        if self.store.find_user_by_username(&admin.username).await?.is_some() {
            return Ok(None);
        }
        let user = self
            .create(admin.username.clone(), admin.email.clone(), &admin.password, Role::Admin)
            .await?;
        info!("Created bootstrap administrator '{}'", user.username);
        Ok(Some(user))
    }

    async fn create(&self, username: String, email: String, password: &str, role: Role) -> ServiceResult<User> {
        self.ensure_username_free(&username).await?;
        self.ensure_email_free(&email).await?;

        let password_hash = self.passwords.hash(password).await?;
        let user = self
            .store
            .insert_user(NewUser { username, email, password_hash, role })
            .await?;
        Ok(user)
    }

    async fn ensure_username_free(&self, username: &str) -> ServiceResult<()> {
        if self.store.find_user_by_username(username).await?.is_some() {
            return Err(ApiError::conflict(format!("Username '{}' is already taken", username)));
        }
        Ok(())
    }

    async fn ensure_email_free(&self, email: &str) -> ServiceResult<()> {
        if self.store.find_user_by_email(email).await?.is_some() {
            return Err(ApiError::conflict(format!("Email '{}' is already registered", email)));
        }
        Ok(())
    }
}
