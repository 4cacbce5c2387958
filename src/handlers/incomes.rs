// handlers/incomes.rs - /v1/incomes and /v1/users/{id}/incomes (salary and other income)

use axum::extract::State;

use crate::api::incomes::{IncomeQuery, IncomeRequest, IncomeResponse};
use crate::auth::Policy;
use crate::error::ErrorBody;
use crate::middleware::{ApiResponse, ApiResult, AuthContext, ValidPath, ValidQuery, ValidatedJson};
use crate::services::IncomeService;
use crate::state::AppState;

fn into_responses(incomes: Vec<crate::database::models::Income>) -> Vec<IncomeResponse> {
    incomes.into_iter().map(IncomeResponse::from).collect()
}

/// Record an income for the caller, or for `userId` when the caller is an
/// administrator
#[utoipa::path(
    post,
    path = "/v1/incomes",
    tag = "incomes",
    request_body = IncomeRequest,
    responses(
        (status = 201, description = "Income recorded", body = IncomeResponse),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 403, description = "Recording for another user", body = ErrorBody),
        (status = 404, description = "Unknown user", body = ErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_income(
    State(state): State<AppState>,
    context: AuthContext,
    ValidatedJson(request): ValidatedJson<IncomeRequest>,
) -> ApiResult<IncomeResponse> {
    let owner_id = request.user_id.unwrap_or_else(|| context.user_id());
    context.authorize(Policy::owner_or_admin(owner_id))?;

    let income = IncomeService::new(&state).create(owner_id, request).await?;
    Ok(ApiResponse::created(income.into()))
}

/// Every user's incomes
#[utoipa::path(
    get,
    path = "/v1/incomes",
    tag = "incomes",
    params(IncomeQuery),
    responses(
        (status = 200, description = "Matching incomes, newest first", body = [IncomeResponse]),
        (status = 403, description = "Administrators only", body = ErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_incomes(
    State(state): State<AppState>,
    context: AuthContext,
    ValidQuery(query): ValidQuery<IncomeQuery>,
) -> ApiResult<Vec<IncomeResponse>> {
    context.authorize(Policy::admin())?;
    let incomes = IncomeService::new(&state).list(query).await?;
    Ok(ApiResponse::ok(into_responses(incomes)))
}

#[utoipa::path(
    get,
    path = "/v1/users/{id}/incomes",
    tag = "incomes",
    params(("id" = i64, Path, description = "Owning user id"), IncomeQuery),
    responses(
        (status = 200, description = "The user's incomes, newest first", body = [IncomeResponse]),
        (status = 403, description = "Neither the user nor an administrator", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_user_incomes(
    State(state): State<AppState>,
    context: AuthContext,
    ValidPath(user_id): ValidPath<i64>,
    ValidQuery(query): ValidQuery<IncomeQuery>,
) -> ApiResult<Vec<IncomeResponse>> {
    context.authorize(Policy::owner_or_admin(user_id))?;
    let incomes = IncomeService::new(&state).list_for_user(user_id, query).await?;
    Ok(ApiResponse::ok(into_responses(incomes)))
}

#[utoipa::path(
    get,
    path = "/v1/incomes/{id}",
    tag = "incomes",
    params(("id" = i64, Path, description = "Income id")),
    responses(
        (status = 200, description = "The income", body = IncomeResponse),
                (status = 404, description = "No such income, or not the caller's", body = ErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_income(
    State(state): State<AppState>,
    context: AuthContext,
    ValidPath(id): ValidPath<i64>,
) -> ApiResult<IncomeResponse> {
    let income = IncomeService::new(&state).get_owned(id, &context).await?;
    Ok(ApiResponse::ok(income.into()))
}

/// Replace amount, source, description and date
#[utoipa::path(
    put,
    path = "/v1/incomes/{id}",
    tag = "incomes",
    params(("id" = i64, Path, description = "Income id")),
    request_body = IncomeRequest,
    responses(
        (status = 200, description = "Updated income", body = IncomeResponse),
                (status = 404, description = "No such income, or not the caller's", body = ErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_income(
    State(state): State<AppState>,
    context: AuthContext,
    ValidPath(id): ValidPath<i64>,
    ValidatedJson(request): ValidatedJson<IncomeRequest>,
) -> ApiResult<IncomeResponse> {
    let service = IncomeService::new(&state);
    let income = service.get_owned(id, &context).await?;

    let income = service.update(income, request).await?;
    Ok(ApiResponse::ok(income.into()))
}

#[utoipa::path(
    delete,
    path = "/v1/incomes/{id}",
    tag = "incomes",
    params(("id" = i64, Path, description = "Income id")),
    responses(
        (status = 204, description = "Deleted"),
                (status = 404, description = "No such income, or not the caller's", body = ErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_income(
    State(state): State<AppState>,
    context: AuthContext,
    ValidPath(id): ValidPath<i64>,
) -> ApiResult<()> {
    let service = IncomeService::new(&state);
    let income = service.get_owned(id, &context).await?;

    service.delete(&income).await?;
    Ok(ApiResponse::no_content())
}
