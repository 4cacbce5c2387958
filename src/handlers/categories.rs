// handlers/categories.rs - /v1/categories
//
// Reads are public; changes need the ADMIN role.

use axum::extract::State;

use crate::api::categories::{CategoryRequest, CategoryResponse};
use crate::auth::Policy;
use crate::error::ErrorBody;
use crate::middleware::{ApiResponse, ApiResult, AuthContext, ValidPath, ValidatedJson};
use crate::services::CategoryService;
use crate::state::AppState;

/// Category forest with nested children
#[utoipa::path(
    get,
    path = "/v1/categories",
    tag = "categories",
    responses((status = 200, description = "Top-level categories with nested children", body = [CategoryResponse]))
)]
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Vec<CategoryResponse>> {
    Ok(ApiResponse::ok(CategoryService::new(&state).tree().await?))
}

#[utoipa::path(
    get,
    path = "/v1/categories/{id}",
    tag = "categories",
    params(("id" = i64, Path, description = "Category id")),
    responses(
        (status = 200, description = "Category with direct children", body = CategoryResponse),
        (status = 404, description = "No such category", body = ErrorBody),
    )
)]
pub async fn get_category(State(state): State<AppState>, ValidPath(id): ValidPath<i64>) -> ApiResult<CategoryResponse> {
    Ok(ApiResponse::ok(CategoryService::new(&state).get(id).await?))
}

#[utoipa::path(
    get,
    path = "/v1/categories/{id}/subcategories",
    tag = "categories",
    params(("id" = i64, Path, description = "Parent category id")),
    responses(
        (status = 200, description = "Direct children", body = [CategoryResponse]),
        (status = 404, description = "No such category", body = ErrorBody),
    )
)]
pub async fn list_subcategories(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i64>,
) -> ApiResult<Vec<CategoryResponse>> {
    let children = CategoryService::new(&state).subcategories(id).await?;
    Ok(ApiResponse::ok(children.into_iter().map(CategoryResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/v1/categories",
    tag = "categories",
    request_body = CategoryRequest,
    responses(
        (status = 201, description = "Category created", body = CategoryResponse),
        (status = 403, description = "Administrators only", body = ErrorBody),
        (status = 404, description = "Unknown parent", body = ErrorBody),
        (status = 409, description = "Name already used by a sibling", body = ErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_category(
    State(state): State<AppState>,
    context: AuthContext,
    ValidatedJson(request): ValidatedJson<CategoryRequest>,
) -> ApiResult<CategoryResponse> {
    context.authorize(Policy::admin())?;
    let category = CategoryService::new(&state).create(request).await?;
    Ok(ApiResponse::created(category.into()))
}

#[utoipa::path(
    put,
    path = "/v1/categories/{id}",
    tag = "categories",
    params(("id" = i64, Path, description = "Category id")),
    request_body = CategoryRequest,
    responses(
        (status = 200, description = "Updated category", body = CategoryResponse),
        (status = 400, description = "Parent would create a cycle", body = ErrorBody),
        (status = 403, description = "Administrators only", body = ErrorBody),
        (status = 404, description = "No such category or parent", body = ErrorBody),
        (status = 409, description = "Name already used by a sibling", body = ErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_category(
    State(state): State<AppState>,
    context: AuthContext,
    ValidPath(id): ValidPath<i64>,
    ValidatedJson(request): ValidatedJson<CategoryRequest>,
) -> ApiResult<CategoryResponse> {
    context.authorize(Policy::admin())?;
    let category = CategoryService::new(&state).update(id, request).await?;
    Ok(ApiResponse::ok(category.into()))
}

#[utoipa::path(
    delete,
    path = "/v1/categories/{id}",
    tag = "categories",
    params(("id" = i64, Path, description = "Category id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 400, description = "Category has children or expenses", body = ErrorBody),
        (status = 403, description = "Administrators only", body = ErrorBody),
        (status = 404, description = "No such category", body = ErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_category(
    State(state): State<AppState>,
    context: AuthContext,
    ValidPath(id): ValidPath<i64>,
) -> ApiResult<()> {
    context.authorize(Policy::admin())?;
    CategoryService::new(&state).delete(id).await?;
    Ok(ApiResponse::no_content())
}
