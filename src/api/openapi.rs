use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use super::auth::{AuthResponse, LoginRequest, MessageResponse, RefreshRequest};
use super::categories::{CategoryRequest, CategoryResponse};
use super::expenses::{ExpenseRequest, ExpenseResponse};
use super::incomes::{IncomeRequest, IncomeResponse};
use super::users::{CreateUserRequest, UpdateUserRequest, UserResponse};
use crate::error::{ErrorBody, FieldError};
use crate::handlers;
use crate::types::Role;

/// Registers the JWT bearer scheme referenced by protected operations
struct BearerSecurityAddon;

impl Modify for BearerSecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "bearerAuth".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Access token from `POST /v1/auth/login`, sent as `Authorization: Bearer <token>`",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "Finance Tracker API", description = "Expenses, income and categories behind JWT authentication"),
    modifiers(&BearerSecurityAddon),
    paths(
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::auth::logout,
        handlers::users::create_user,
        handlers::users::list_users,
        handlers::users::get_user,
        handlers::users::update_user,
        handlers::users::delete_user,
        handlers::categories::list_categories,
        handlers::categories::get_category,
        handlers::categories::list_subcategories,
        handlers::categories::create_category,
        handlers::categories::update_category,
        handlers::categories::delete_category,
        handlers::expenses::create_expense,
        handlers::expenses::list_expenses,
        handlers::expenses::list_user_expenses,
        handlers::expenses::get_expense,
        handlers::expenses::update_expense,
        handlers::expenses::delete_expense,
        handlers::incomes::create_income,
        handlers::incomes::list_incomes,
        handlers::incomes::list_user_incomes,
        handlers::incomes::get_income,
        handlers::incomes::update_income,
        handlers::incomes::delete_income,
        handlers::actuator::health,
        handlers::actuator::info,
    ),
    components(schemas(
        Role,
        ErrorBody,
        FieldError,
        LoginRequest,
        RefreshRequest,
        AuthResponse,
        MessageResponse,
        CreateUserRequest,
        UpdateUserRequest,
        UserResponse,
        CategoryRequest,
        CategoryResponse,
        ExpenseRequest,
        ExpenseResponse,
        IncomeRequest,
        IncomeResponse,
    )),
    tags(
        (name = "auth", description = "Login, token refresh and logout"),
        (name = "users", description = "Accounts"),
        (name = "categories", description = "Expense category catalog"),
        (name = "expenses", description = "Expense records"),
        (name = "incomes", description = "Salary and other income records"),
        (name = "actuator", description = "Health and build information"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_routes_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_value(&doc).unwrap();

        assert!(json["paths"]["/v1/auth/login"]["post"].is_object());
        assert!(json["paths"]["/v1/users/{id}/expenses"]["get"].is_object());
        assert!(json["paths"]["/v1/categories/{id}/subcategories"]["get"].is_object());
        assert_eq!(json["components"]["securitySchemes"]["bearerAuth"]["scheme"], "bearer");
    }
}
