// middleware/auth.rs - Request authenticator
//
// Runs once per request, resolves the bearer token into an authenticated
// principal and stores it in the request extensions. It never rejects: a
// missing or bad token leaves the request unauthenticated, and handlers
// that need a principal fail later through the `AuthContext` extractor.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, warn};

use super::unauthorized::UnauthorizedResponse;
use crate::auth::policy::{Policy, PolicyError};
use crate::auth::token::TokenKind;
use crate::database::models::User;
use crate::database::UserStore;
use crate::state::AppState;
use crate::types::Role;

/// Paths the authenticator never inspects
pub const PUBLIC_PATHS: &[&str] = &[
    "/v1/auth/login",
    "/v1/auth/refresh",
    "/v3/api-docs",
    "/swagger-ui",
    "/actuator/health",
    "/actuator/info",
];

const BEARER_PREFIX: &str = "Bearer ";

/// Authenticated principal and its granted authorities for one request
#[derive(Debug, Clone, PartialEq)]
pub struct AuthContext {
    pub principal: User,
    pub authorities: Vec<String>,
}

impl AuthContext {
    pub fn new(principal: User) -> Self {
        let authorities = vec![principal.role.authority().to_string()];
        Self { principal, authorities }
    }

    pub fn user_id(&self) -> i64 {
        self.principal.id
    }

    pub fn username(&self) -> &str {
        &self.principal.username
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.authorities.iter().any(|a| a == role.authority())
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    pub fn authorize(&self, policy: Policy) -> Result<(), PolicyError> {
        policy.evaluate(Some(self))
    }
}

/// Why the bearer token on this request was rejected
#[derive(Debug, Clone, PartialEq)]
pub struct AuthFailure(pub String);

/// Token from `Authorization: Bearer <token>`. The prefix is case-sensitive.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix(BEARER_PREFIX)
        .filter(|token| !token.trim().is_empty())
}

pub fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS.iter().any(|public| {
        path.strip_prefix(public)
            .map_or(false, |rest| rest.is_empty() || rest.starts_with('/'))
    })
}

pub async fn authenticate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let already_authenticated = request.extensions().get::<AuthContext>().is_some();

    if !already_authenticated && !is_public_path(request.uri().path()) {
        match resolve(&state, request.headers()).await {
            Ok(Some(context)) => {
                debug!("Authenticated user '{}'", context.username());
                request.extensions_mut().insert(context);
            }
            Ok(None) => {}
            Err(failure) => {
                request.extensions_mut().insert(failure);
            }
        }
    }

    next.run(request).await
}

async fn resolve(state: &AppState, headers: &HeaderMap) -> Result<Option<AuthContext>, AuthFailure> {
    let Some(token) = bearer_token(headers) else {
        return Ok(None);
    };

    let claims = state.tokens.verify_kind(token, TokenKind::Access).map_err(|e| {
        debug!("JWT token rejected: {}", e);
        AuthFailure(e.to_string())
    })?;

    let user = match state.store.find_user_by_username(&claims.sub).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            warn!("Token subject '{}' no longer exists", claims.sub);
            return Ok(None);
        }
        Err(e) => {
            error!("Could not set user authentication: {}", e);
            return Ok(None);
        }
    };

    if !state.tokens.validate_for_subject(token, &user.username) {
        return Ok(None);
    }

    Ok(Some(AuthContext::new(user)))
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthContext {
    type Rejection = UnauthorizedResponse;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or_else(|| UnauthorizedResponse::from_parts(parts, &state.config.security.cors_origins))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::http::HeaderValue;
    use std::sync::Arc;

    use crate::config::AppConfig;
    use crate::database::models::{Category, Expense, Income, NewCategory, NewExpense, NewIncome, NewUser};
    use crate::database::{
        CategoryStore, ExpenseStore, IncomeStore, MemoryStore, RecordFilter, Store, StoreError,
    };

    /// Memory store whose username lookup hands back a differently named user
    struct RenamingStore(MemoryStore);

    #[async_trait]
    impl UserStore for RenamingStore {
        async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError> {
            self.0.find_user(id).await
        }
        async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
            Ok(self.0.find_user_by_username(username).await?.map(|mut user| {
                user.username = format!("{}-renamed", user.username);
                user
            }))
        }
        async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
            self.0.find_user_by_email(email).await
        }
        async fn list_users(&self) -> Result<Vec<User>, StoreError> {
            self.0.list_users().await
        }
        async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
            self.0.insert_user(user).await
        }
        async fn save_user(&self, user: &User) -> Result<User, StoreError> {
            self.0.save_user(user).await
        }
        async fn delete_user(&self, id: i64) -> Result<bool, StoreError> {
            self.0.delete_user(id).await
        }
    }

    #[async_trait]
    impl CategoryStore for RenamingStore {
        async fn find_category(&self, id: i64) -> Result<Option<Category>, StoreError> {
            self.0.find_category(id).await
        }
        async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
            self.0.list_categories().await
        }
        async fn list_subcategories(&self, parent_id: i64) -> Result<Vec<Category>, StoreError> {
            self.0.list_subcategories(parent_id).await
        }
        async fn insert_category(&self, category: NewCategory) -> Result<Category, StoreError> {
            self.0.insert_category(category).await
        }
        async fn save_category(&self, category: &Category) -> Result<Category, StoreError> {
            self.0.save_category(category).await
        }
        async fn delete_category(&self, id: i64) -> Result<bool, StoreError> {
            self.0.delete_category(id).await
        }
        async fn count_category_expenses(&self, id: i64) -> Result<i64, StoreError> {
            self.0.count_category_expenses(id).await
        }
    }

    #[async_trait]
    impl ExpenseStore for RenamingStore {
        async fn find_expense(&self, id: i64) -> Result<Option<Expense>, StoreError> {
            self.0.find_expense(id).await
        }
        async fn list_expenses(&self, filter: &RecordFilter) -> Result<Vec<Expense>, StoreError> {
            self.0.list_expenses(filter).await
        }
        async fn insert_expense(&self, expense: NewExpense) -> Result<Expense, StoreError> {
            self.0.insert_expense(expense).await
        }
        async fn save_expense(&self, expense: &Expense) -> Result<Expense, StoreError> {
            self.0.save_expense(expense).await
        }
        async fn delete_expense(&self, id: i64) -> Result<bool, StoreError> {
            self.0.delete_expense(id).await
        }
    }

    #[async_trait]
    impl IncomeStore for RenamingStore {
        async fn find_income(&self, id: i64) -> Result<Option<Income>, StoreError> {
            self.0.find_income(id).await
        }
        async fn list_incomes(&self, filter: &RecordFilter) -> Result<Vec<Income>, StoreError> {
            self.0.list_incomes(filter).await
        }
        async fn insert_income(&self, income: NewIncome) -> Result<Income, StoreError> {
            self.0.insert_income(income).await
        }
        async fn save_income(&self, income: &Income) -> Result<Income, StoreError> {
            self.0.save_income(income).await
        }
        async fn delete_income(&self, id: i64) -> Result<bool, StoreError> {
            self.0.delete_income(id).await
        }
    }

    #[async_trait]
    impl Store for RenamingStore {
        fn backend(&self) -> &'static str {
            "renaming"
        }
        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn state_with(store: Arc<dyn Store>) -> AppState {
        let secret = "t".repeat(64);
        let config = AppConfig::from_lookup(|key| match key {
            "JWT_SECRET" => Some(secret.clone()),
            "SECURITY_BCRYPT_COST" => Some("4".to_string()),
            _ => None,
        })
        .unwrap();
        AppState::new(config, store)
    }

    async fn bearer_for(state: &AppState, username: &str) -> HeaderMap {
        let user = state
            .store
            .insert_user(NewUser {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                password_hash: String::new(),
                role: Role::User,
            })
            .await
            .unwrap();
        let token = state.tokens.issue(&user, TokenKind::Access).unwrap();
        headers(&format!("Bearer {}", token))
    }

    #[tokio::test]
    async fn resolves_principal_for_matching_subject() {
        let state = state_with(Arc::new(MemoryStore::new()));
        let headers = bearer_for(&state, "alice").await;

        let context = resolve(&state, &headers).await.unwrap().unwrap();
        assert_eq!(context.username(), "alice");
        assert_eq!(context.authorities, vec!["ROLE_USER".to_string()]);
    }

    #[tokio::test]
    async fn subject_mismatch_leaves_request_unauthenticated() {
        let state = state_with(Arc::new(RenamingStore(MemoryStore::new())));
        let headers = bearer_for(&state, "alice").await;

        assert_eq!(resolve(&state, &headers).await, Ok(None));
    }

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(bearer_token(&headers("bearer abc")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn public_paths_match_whole_segments() {
        assert!(is_public_path("/v1/auth/login"));
        assert!(is_public_path("/swagger-ui/index.html"));
        assert!(is_public_path("/actuator/health"));
        assert!(!is_public_path("/v1/auth/logout"));
        assert!(!is_public_path("/v1/auth/login-as-admin"));
        assert!(!is_public_path("/v1/expenses"));
    }
}
