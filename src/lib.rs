pub mod api;
pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod state;
pub mod types;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

pub use state::AppState;

/// Full HTTP application: routes, authentication and the global layers.
/// The caller serves it (with connect info when client IPs should be logged).
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.security.cors_origins);

    Router::new()
        .route("/", get(handlers::root::index))
        .merge(operational_routes())
        .merge(auth_routes())
        .merge(user_routes())
        .merge(category_routes())
        .merge(expense_routes())
        .merge(income_routes())
        .fallback(handlers::not_found)
        // Layers run outermost-last: trace, CORS, error path, authenticator
        .layer(axum::middleware::from_fn_with_state(state.clone(), middleware::authenticate))
        .layer(axum::middleware::from_fn(middleware::attach_error_path))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn operational_routes() -> Router<AppState> {
    use handlers::{actuator, docs};

    Router::new()
        .route("/actuator/health", get(actuator::health))
        .route("/actuator/info", get(actuator::info))
        .route("/v3/api-docs", get(docs::api_docs))
}

fn auth_routes() -> Router<AppState> {
    use handlers::auth;

    Router::new()
        .route("/v1/auth/login", post(auth::login))
        .route("/v1/auth/refresh", post(auth::refresh))
        .route("/v1/auth/logout", post(auth::logout))
}

fn user_routes() -> Router<AppState> {
    use handlers::users;

    Router::new()
        .route("/v1/users", get(users::list_users).post(users::create_user))
        .route(
            "/v1/users/:id",
            get(users::get_user).put(users::update_user).delete(users::delete_user),
        )
}

fn category_routes() -> Router<AppState> {
    use handlers::categories;

    Router::new()
        .route(
            "/v1/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/v1/categories/:id",
            get(categories::get_category)
                .put(categories::update_category)
                .delete(categories::delete_category),
        )
        .route("/v1/categories/:id/subcategories", get(categories::list_subcategories))
}

fn expense_routes() -> Router<AppState> {
    use handlers::expenses;

    Router::new()
        .route(
            "/v1/expenses",
            get(expenses::list_expenses).post(expenses::create_expense),
        )
        .route(
            "/v1/expenses/:id",
            get(expenses::get_expense)
                .put(expenses::update_expense)
                .delete(expenses::delete_expense),
        )
        .route("/v1/users/:id/expenses", get(expenses::list_user_expenses))
}

fn income_routes() -> Router<AppState> {
    use handlers::incomes;

    Router::new()
        .route("/v1/incomes", get(incomes::list_incomes).post(incomes::create_income))
        .route(
            "/v1/incomes/:id",
            get(incomes::get_income)
                .put(incomes::update_income)
                .delete(incomes::delete_income),
        )
        .route("/v1/users/:id/incomes", get(incomes::list_user_incomes))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}
