// handlers/users.rs - /v1/users

use axum::extract::State;

use crate::api::users::{CreateUserRequest, UpdateUserRequest, UserResponse};
use crate::auth::Policy;
use crate::error::ErrorBody;
use crate::middleware::{ApiResponse, ApiResult, AuthContext, ValidPath, ValidatedJson};
use crate::services::UserService;
use crate::state::AppState;

/// Sign up. New accounts always get the USER role.
#[utoipa::path(
    post,
    path = "/v1/users",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 409, description = "Username or email already in use", body = ErrorBody),
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateUserRequest>,
) -> ApiResult<UserResponse> {
    let user = UserService::new(&state).register(request).await?;
    Ok(ApiResponse::created(user.into()))
}

#[utoipa::path(
    get,
    path = "/v1/users",
    tag = "users",
    responses(
        (status = 200, description = "All users", body = [UserResponse]),
        (status = 401, description = "Not authenticated", body = ErrorBody),
        (status = 403, description = "Administrators only", body = ErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_users(State(state): State<AppState>, context: AuthContext) -> ApiResult<Vec<UserResponse>> {
    context.authorize(Policy::admin())?;
    let users = UserService::new(&state).list().await?;
    Ok(ApiResponse::ok(users.into_iter().map(UserResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/v1/users/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "The user", body = UserResponse),
        (status = 403, description = "Neither the user nor an administrator", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_user(
    State(state): State<AppState>,
    context: AuthContext,
    ValidPath(id): ValidPath<i64>,
) -> ApiResult<UserResponse> {
    context.authorize(Policy::owner_or_admin(id))?;
    let user = UserService::new(&state).get(id).await?;
    Ok(ApiResponse::ok(user.into()))
}

/// Partial update. Only administrators may change a role.
#[utoipa::path(
    put,
    path = "/v1/users/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 403, description = "Not allowed", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody),
        (status = 409, description = "Username or email already in use", body = ErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_user(
    State(state): State<AppState>,
    context: AuthContext,
    ValidPath(id): ValidPath<i64>,
    ValidatedJson(request): ValidatedJson<UpdateUserRequest>,
) -> ApiResult<UserResponse> {
    context.authorize(Policy::owner_or_admin(id))?;
    let user = UserService::new(&state).update(id, request, context.is_admin()).await?;
    Ok(ApiResponse::ok(user.into()))
}

/// Delete the account together with its expenses and incomes
#[utoipa::path(
    delete,
    path = "/v1/users/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Neither the user nor an administrator", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_user(
    State(state): State<AppState>,
    context: AuthContext,
    ValidPath(id): ValidPath<i64>,
) -> ApiResult<()> {
    context.authorize(Policy::owner_or_admin(id))?;
    UserService::new(&state).delete(id).await?;
    Ok(ApiResponse::no_content())
}
