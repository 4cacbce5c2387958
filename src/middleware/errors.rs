use axum::{
    extract::Request,
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::error::ErrorBody;

/// Stamp the request path onto error bodies, and give bare 405s the standard
/// error shape.
pub async fn attach_error_path(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let response = next.run(request).await;

    let pending = match response.extensions().get::<ErrorBody>() {
        Some(body) if body.path.is_some() => None,
        Some(body) => Some(body.clone()),
        None if response.status() == StatusCode::METHOD_NOT_ALLOWED => {
            Some(ErrorBody::new(StatusCode::METHOD_NOT_ALLOWED, "Request method not supported"))
        }
        None => None,
    };
    let Some(body) = pending else {
        return response;
    };

    // keep headers set upstream (Allow, CORS), swap only the body
    let (mut parts, _) = response.into_parts();
    let (rendered_parts, rendered_body) = body.with_path(path).into_json_response().into_parts();

    parts.headers.remove(header::CONTENT_LENGTH);
    parts
        .headers
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    parts.extensions.extend(rendered_parts.extensions);
    Response::from_parts(parts, rendered_body)
}
