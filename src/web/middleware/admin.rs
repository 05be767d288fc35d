use axum::{extract::Request, http::header, middleware::Next, response::Response};
use tracing::warn;

/// Static bearer token for the management endpoints. With no
/// CLUBCREOLE_ADMIN_TOKEN configured the admin surface stays locked.
pub async fn require_admin_token(request: Request, next: Next) -> Response {
    let expected = match std::env::var("CLUBCREOLE_ADMIN_TOKEN") {
        Ok(v) if !v.is_empty() => v,
        _ => {
            warn!("Admin request refused: CLUBCREOLE_ADMIN_TOKEN is not set");
            return unauthorized();
        }
    };

    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|hv| hv.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if presented == Some(expected.as_str()) {
        return next.run(request).await;
    }

    unauthorized()
}

fn unauthorized() -> Response {
    Response::builder()
        .status(401)
        .body(axum::body::Body::from("Unauthorized"))
        .unwrap()
}
