// handlers/mod.rs - HTTP handlers grouped by resource
//
// Access tiers are decided per handler: public handlers take no
// `AuthContext`, protected handlers take one (401 when absent) and evaluate
// a `Policy` against it (403 when it fails).

pub mod actuator;
pub mod auth;
pub mod categories;
pub mod docs;
pub mod expenses;
pub mod incomes;
pub mod root;
pub mod users;

use axum::http::Uri;

use crate::error::ApiError;

/// Fallback for unmatched routes
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("No endpoint {}", uri.path()))
}
