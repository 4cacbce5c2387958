// handlers/auth.rs - POST /v1/auth/{login,refresh,logout}

use axum::extract::State;
use tracing::{debug, error, info, warn};

use crate::api::auth::{AuthResponse, LoginRequest, MessageResponse, RefreshRequest};
use crate::auth::{CredentialError, TokenError, TokenKind};
use crate::database::models::User;
use crate::database::UserStore;
use crate::error::{ApiError, ErrorBody};
use crate::middleware::{ApiResponse, ApiResult, AuthContext, ValidatedJson};
use crate::state::AppState;

const BAD_CREDENTIALS: &str = "Invalid username or password";
const LOGIN_FAILED: &str = "Authentication failed. Please try again.";
const INVALID_REFRESH: &str = "Invalid refresh token";

/// Access and refresh token for `user`
fn issue_pair(state: &AppState, user: &User) -> Result<AuthResponse, TokenError> {
    let token = state.tokens.issue(user, TokenKind::Access)?;
    let refresh_token = state.tokens.issue(user, TokenKind::Refresh)?;
    let expires_in = state.tokens.access_ttl().num_seconds();
    Ok(AuthResponse::new(user, token, refresh_token, expires_in))
}

/// Exchange username and password for a token pair
#[utoipa::path(
    post,
    path = "/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = AuthResponse),
        (status = 400, description = "Missing username or password", body = ErrorBody),
        (status = 401, description = "Invalid username or password", body = ErrorBody),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> ApiResult<AuthResponse> {
    let user = match state.credentials().verify(&request.username, &request.password).await {
        Ok(user) => user,
        Err(CredentialError::BadCredentials) => {
            warn!("Failed login attempt for user '{}'", request.username);
            return Err(ApiError::unauthorized(BAD_CREDENTIALS));
        }
        Err(e) => {
            error!("Authentication error for user '{}': {}", request.username, e);
            return Err(ApiError::unauthorized(LOGIN_FAILED));
        }
    };

    let response = issue_pair(&state, &user).map_err(|e| {
        error!("Could not issue tokens for user '{}': {}", user.username, e);
        ApiError::unauthorized(LOGIN_FAILED)
    })?;

    info!("User '{}' logged in", user.username);
    Ok(ApiResponse::ok(response))
}

/// Trade a refresh token for a new access token and a new refresh token.
/// The presented refresh token stays valid until it expires.
#[utoipa::path(
    post,
    path = "/v1/auth/refresh",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair", body = AuthResponse),
        (status = 401, description = "Invalid refresh token", body = ErrorBody),
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RefreshRequest>,
) -> ApiResult<AuthResponse> {
    let claims = state
        .tokens
        .verify_kind(&request.refresh_token, TokenKind::Refresh)
        .map_err(|e| {
            debug!("Refresh token rejected: {}", e);
            ApiError::unauthorized(INVALID_REFRESH)
        })?;

    let user = state.store.find_user_by_username(&claims.sub).await?.ok_or_else(|| {
        warn!("Refresh token for unknown user '{}'", claims.sub);
        ApiError::unauthorized(INVALID_REFRESH)
    })?;

    let response = issue_pair(&state, &user)?;
    debug!("Rotated tokens for user '{}'", user.username);
    Ok(ApiResponse::ok(response))
}

/// Advisory logout; tokens stay valid until they expire
#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = ErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub async fn logout(context: AuthContext) -> ApiResult<MessageResponse> {
    info!("User '{}' logged out", context.username());
    Ok(ApiResponse::ok(MessageResponse::new("Logged out successfully")))
}
