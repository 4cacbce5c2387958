// handlers/root.rs - GET / service banner

use axum::response::Json;
use serde_json::{json, Value};

pub async fn index() -> Json<Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "endpoints": {
            "auth": ["POST /v1/auth/login", "POST /v1/auth/refresh", "POST /v1/auth/logout"],
            "users": ["POST /v1/users", "GET /v1/users", "GET|PUT|DELETE /v1/users/{id}"],
            "categories": [
                "GET|POST /v1/categories",
                "GET|PUT|DELETE /v1/categories/{id}",
                "GET /v1/categories/{id}/subcategories"
            ],
            "expenses": [
                "GET|POST /v1/expenses",
                "GET|PUT|DELETE /v1/expenses/{id}",
                "GET /v1/users/{id}/expenses"
            ],
            "incomes": [
                "GET|POST /v1/incomes",
                "GET|PUT|DELETE /v1/incomes/{id}",
                "GET /v1/users/{id}/incomes"
            ],
            "operations": ["GET /actuator/health", "GET /actuator/info", "GET /v3/api-docs"]
        }
    }))
}
