// middleware/unauthorized.rs - 401 body for unauthenticated access
//
// Sent when a caller without a valid principal reaches a protected resource.

use axum::{
    extract::ConnectInfo,
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use tracing::warn;

use super::auth::AuthFailure;
use crate::error::ErrorBody;

pub const DEFAULT_MESSAGE: &str = "Authentication required to access this resource";

const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOWED_HEADERS: &str = "Authorization, Content-Type";

/// Proxy headers consulted for the caller's address, most trusted first
const CLIENT_IP_HEADERS: &[&str] = &[
    "X-Forwarded-For",
    "X-Real-IP",
    "Proxy-Client-IP",
    "WL-Proxy-Client-IP",
    "HTTP_X_FORWARDED_FOR",
    "HTTP_CLIENT_IP",
];

#[derive(Debug)]
pub struct UnauthorizedResponse {
    body: ErrorBody,
    allow_origin: Option<HeaderValue>,
}

impl UnauthorizedResponse {
    pub fn from_parts(parts: &Parts, cors_origins: &[String]) -> Self {
        let failure = parts.extensions.get::<AuthFailure>().map(|f| f.0.as_str());
        let remote = parts.extensions.get::<ConnectInfo<SocketAddr>>().map(|c| c.0);
        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown");

        warn!(
            "Unauthorized access attempt from IP: {}, User-Agent: {}, URL: {}",
            client_ip(&parts.headers, remote),
            user_agent,
            parts.uri
        );
        if let Some(failure) = failure {
            warn!("Authentication failure: {}", failure);
        }

        let request_origin = parts.headers.get(header::ORIGIN).and_then(|v| v.to_str().ok());

        Self {
            body: ErrorBody::new(StatusCode::UNAUTHORIZED, refine_message(failure)).with_path(parts.uri.path()),
            allow_origin: allowed_origin(cors_origins, request_origin),
        }
    }
}

impl IntoResponse for UnauthorizedResponse {
    fn into_response(self) -> Response {
        let mut response = self.body.into_json_response();
        let headers = response.headers_mut();

        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
        headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
        if let Some(origin) = self.allow_origin {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
            headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOWED_METHODS));
            headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOWED_HEADERS));
        }
        response
    }
}

/// Client-facing hint derived from the recorded token failure
pub fn refine_message(failure: Option<&str>) -> &'static str {
    let Some(failure) = failure else {
        return DEFAULT_MESSAGE;
    };
    let failure = failure.to_ascii_lowercase();

    if failure.contains("expired") {
        "Your session has expired. Please log in again."
    } else if failure.contains("malformed") {
        "Malformed authentication token. Please log in again."
    } else if failure.contains("signature") {
        "Invalid token signature. Please log in again."
    } else if failure.contains("jwt") {
        "Invalid authentication token. Please log in again."
    } else {
        DEFAULT_MESSAGE
    }
}

/// First address from the proxy headers, else the socket peer
pub fn client_ip(headers: &HeaderMap, remote: Option<SocketAddr>) -> String {
    CLIENT_IP_HEADERS
        .iter()
        .filter_map(|name| headers.get(*name)?.to_str().ok())
        .filter_map(|value| value.split(',').next().map(str::trim))
        .find(|ip| !ip.is_empty() && !ip.eq_ignore_ascii_case("unknown"))
        .map(str::to_string)
        .or_else(|| remote.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

fn allowed_origin(cors_origins: &[String], request_origin: Option<&str>) -> Option<HeaderValue> {
    if cors_origins.iter().any(|o| o == "*") {
        return Some(HeaderValue::from_static("*"));
    }
    let origin = request_origin
        .filter(|origin| cors_origins.iter().any(|o| o == origin))
        .or_else(|| cors_origins.first().map(String::as_str))?;
    HeaderValue::from_str(origin).ok()
}
