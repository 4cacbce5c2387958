// auth/policy.rs - Per-endpoint authorization rules
//
// Handlers state the rule they need and evaluate it against the request's
// authentication context. A missing context is an authentication failure
// (401); a context that fails the rule is an authorization failure (403).

use thiserror::Error;

use crate::middleware::auth::AuthContext;
use crate::types::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// No check at all
    Public,
    /// Any authenticated principal
    Authenticated,
    /// Principal holding the role
    RequireRole(Role),
    /// Principal owning the resource, or holding the role
    RequireOwnerOrRole { owner_id: i64, role: Role },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),
}

impl Policy {
    /// Owner-or-administrator, the rule for user-owned records
    pub fn owner_or_admin(owner_id: i64) -> Self {
        Policy::RequireOwnerOrRole { owner_id, role: Role::Admin }
    }

    pub fn admin() -> Self {
        Policy::RequireRole(Role::Admin)
    }

    pub fn evaluate(&self, context: Option<&AuthContext>) -> Result<(), PolicyError> {
        if *self == Policy::Public {
            return Ok(());
        }
        let context = context.ok_or(PolicyError::Unauthenticated)?;

        match *self {
            Policy::Public | Policy::Authenticated => Ok(()),
            Policy::RequireRole(role) => {
                if context.has_role(role) {
                    Ok(())
                } else {
                    Err(PolicyError::Forbidden(format!("Access denied: {} role required", role)))
                }
            }
            Policy::RequireOwnerOrRole { owner_id, role } => {
                if context.user_id() == owner_id || context.has_role(role) {
                    Ok(())
                } else {
                    Err(PolicyError::Forbidden(
                        "Access denied: you can only access your own resources".to_string(),
                    ))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::User;
    use chrono::Utc;

    fn context(id: i64, role: Role) -> AuthContext {
        let now = Utc::now();
        AuthContext::new(User {
            id,
            username: format!("user{}", id),
            email: format!("user{}@example.com", id),
            password_hash: String::new(),
            role,
            created_at: now,
            updated_at: now,
        })
    }

    #[test]
    fn public_needs_no_context() {
        assert_eq!(Policy::Public.evaluate(None), Ok(()));
    }

    #[test]
    fn missing_context_is_unauthenticated() {
        assert_eq!(Policy::Authenticated.evaluate(None), Err(PolicyError::Unauthenticated));
        assert_eq!(Policy::admin().evaluate(None), Err(PolicyError::Unauthenticated));
        assert_eq!(Policy::owner_or_admin(1).evaluate(None), Err(PolicyError::Unauthenticated));
    }

    #[test]
    fn role_requirement() {
        let user = context(1, Role::User);
        let admin = context(2, Role::Admin);

        assert!(matches!(Policy::admin().evaluate(Some(&user)), Err(PolicyError::Forbidden(_))));
        assert_eq!(Policy::admin().evaluate(Some(&admin)), Ok(()));
        assert_eq!(Policy::RequireRole(Role::User).evaluate(Some(&user)), Ok(()));
    }

    #[test]
    fn owner_or_role() {
        let owner = context(1, Role::User);
        let stranger = context(3, Role::User);
        let admin = context(2, Role::Admin);

        assert_eq!(Policy::owner_or_admin(1).evaluate(Some(&owner)), Ok(()));
        assert_eq!(Policy::owner_or_admin(1).evaluate(Some(&admin)), Ok(()));
        assert!(matches!(
            Policy::owner_or_admin(1).evaluate(Some(&stranger)),
            Err(PolicyError::Forbidden(_))
        ));
    }
}
