// handlers/expenses.rs - /v1/expenses and /v1/users/{id}/expenses

use axum::extract::State;

use crate::api::expenses::{ExpenseQuery, ExpenseRequest, ExpenseResponse};
use crate::auth::Policy;
use crate::error::ErrorBody;
use crate::middleware::{ApiResponse, ApiResult, AuthContext, ValidPath, ValidQuery, ValidatedJson};
use crate::services::ExpenseService;
use crate::state::AppState;

fn into_responses(expenses: Vec<crate::database::models::Expense>) -> Vec<ExpenseResponse> {
    expenses.into_iter().map(ExpenseResponse::from).collect()
}

/// Record an expense for the caller, or for `userId` when the caller is an
/// administrator
#[utoipa::path(
    post,
    path = "/v1/expenses",
    tag = "expenses",
    request_body = ExpenseRequest,
    responses(
        (status = 201, description = "Expense recorded", body = ExpenseResponse),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 403, description = "Recording for another user", body = ErrorBody),
        (status = 404, description = "Unknown category or user", body = ErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_expense(
    State(state): State<AppState>,
    context: AuthContext,
    ValidatedJson(request): ValidatedJson<ExpenseRequest>,
) -> ApiResult<ExpenseResponse> {
    let owner_id = request.user_id.unwrap_or_else(|| context.user_id());
    context.authorize(Policy::owner_or_admin(owner_id))?;

    let expense = ExpenseService::new(&state).create(owner_id, request).await?;
    Ok(ApiResponse::created(expense.into()))
}

/// Every user's expenses
#[utoipa::path(
    get,
    path = "/v1/expenses",
    tag = "expenses",
    params(ExpenseQuery),
    responses(
        (status = 200, description = "Matching expenses, newest first", body = [ExpenseResponse]),
        (status = 403, description = "Administrators only", body = ErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_expenses(
    State(state): State<AppState>,
    context: AuthContext,
    ValidQuery(query): ValidQuery<ExpenseQuery>,
) -> ApiResult<Vec<ExpenseResponse>> {
    context.authorize(Policy::admin())?;
    let expenses = ExpenseService::new(&state).list(query).await?;
    Ok(ApiResponse::ok(into_responses(expenses)))
}

#[utoipa::path(
    get,
    path = "/v1/users/{id}/expenses",
    tag = "expenses",
    params(("id" = i64, Path, description = "Owning user id"), ExpenseQuery),
    responses(
        (status = 200, description = "The user's expenses, newest first", body = [ExpenseResponse]),
        (status = 403, description = "Neither the user nor an administrator", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_user_expenses(
    State(state): State<AppState>,
    context: AuthContext,
    ValidPath(user_id): ValidPath<i64>,
    ValidQuery(query): ValidQuery<ExpenseQuery>,
) -> ApiResult<Vec<ExpenseResponse>> {
    context.authorize(Policy::owner_or_admin(user_id))?;
    let expenses = ExpenseService::new(&state).list_for_user(user_id, query).await?;
    Ok(ApiResponse::ok(into_responses(expenses)))
}

#[utoipa::path(
    get,
    path = "/v1/expenses/{id}",
    tag = "expenses",
    params(("id" = i64, Path, description = "Expense id")),
    responses(
        (status = 200, description = "The expense", body = ExpenseResponse),
                (status = 404, description = "No such expense, or not the caller's", body = ErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_expense(
    State(state): State<AppState>,
    context: AuthContext,
    ValidPath(id): ValidPath<i64>,
) -> ApiResult<ExpenseResponse> {
    let expense = ExpenseService::new(&state).get_owned(id, &context).await?;
    Ok(ApiResponse::ok(expense.into()))
}

/// Replace amount, description, date and category
#[utoipa::path(
    put,
    path = "/v1/expenses/{id}",
    tag = "expenses",
    params(("id" = i64, Path, description = "Expense id")),
    request_body = ExpenseRequest,
    responses(
        (status = 200, description = "Updated expense", body = ExpenseResponse),
                (status = 404, description = "No such expense or category", body = ErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_expense(
    State(state): State<AppState>,
    context: AuthContext,
    ValidPath(id): ValidPath<i64>,
    ValidatedJson(request): ValidatedJson<ExpenseRequest>,
) -> ApiResult<ExpenseResponse> {
    let service = ExpenseService::new(&state);
    let expense = service.get_owned(id, &context).await?;

    let expense = service.update(expense, request).await?;
    Ok(ApiResponse::ok(expense.into()))
}

#[utoipa::path(
    delete,
    path = "/v1/expenses/{id}",
    tag = "expenses",
    params(("id" = i64, Path, description = "Expense id")),
    responses(
        (status = 204, description = "Deleted"),
                (status = 404, description = "No such expense, or not the caller's", body = ErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_expense(
    State(state): State<AppState>,
    context: AuthContext,
    ValidPath(id): ValidPath<i64>,
) -> ApiResult<()> {
    let service = ExpenseService::new(&state);
    let expense = service.get_owned(id, &context).await?;

    service.delete(&expense).await?;
    Ok(ApiResponse::no_content())
}
