//! Shared ingress middleware

use crate::types::{RequestId, RequestMetadata};
use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::Response,
};

/// Header carrying the request ID in both directions
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Middleware to attach request metadata to every request
///
/// Reuses an inbound `x-request-id` when a proxy already assigned one and
/// echoes the ID on the response.
pub async fn request_context_middleware(mut req: Request, next: Next) -> Response {
    let metadata = extract_metadata(req.headers());
    let request_id = metadata.request_id.clone();

    tracing::debug!(
        request_id = %request_id,
        method = %req.method(),
        uri = %req.uri(),
        client_ip = metadata.client_ip.as_deref().unwrap_or("-"),
        "Request received"
    );

    req.extensions_mut().insert(metadata);

    let mut response = next.run(req).await;

    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

/// Middleware to add security headers
pub async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;

    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        header::STRICT_TRANSPORT_SECURITY,
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );

    response
}

/// Build request metadata from headers
pub fn extract_metadata(headers: &HeaderMap) -> RequestMetadata {
    let mut metadata = RequestMetadata::new();

    if let Some(id) = header_str(headers, REQUEST_ID_HEADER)
        && !id.is_empty()
        && id.len() <= 128
    {
        metadata = metadata.with_request_id(RequestId::from_string(id.to_string()));
    }

    // Take the first IP in X-Forwarded-For, else X-Real-IP
    if let Some(forwarded_for) = header_str(headers, "x-forwarded-for") {
        let client_ip = forwarded_for
            .split(',')
            .next()
            .unwrap_or(forwarded_for)
            .trim();
        metadata = metadata.with_client_ip(client_ip.to_string());
    } else if let Some(real_ip) = header_str(headers, "x-real-ip") {
        metadata = metadata.with_client_ip(real_ip.to_string());
    }

    if let Some(ua) = header_str(headers, header::USER_AGENT.as_str()) {
        metadata = metadata.with_user_agent(ua.to_string());
    }

    metadata
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Extension, Router,
        body::Body,
        http::{Request, StatusCode},
        middleware,
        routing::get,
    };
    use tower::ServiceExt;

    async fn test_handler() -> &'static str {
        "OK"
    }

    async fn client_ip_handler(Extension(meta): Extension<RequestMetadata>) -> String {
        meta.client_ip.unwrap_or_default()
    }

    #[tokio::test]
    async fn test_request_context_middleware() {
        let app = Router::new()
            .route("/test", get(test_handler))
            .layer(middleware::from_fn(request_context_middleware));

        let response = app
            .oneshot(Request::builder().uri("/test").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let id = response.headers().get(REQUEST_ID_HEADER).unwrap();
        assert!(id.to_str().unwrap().starts_with("req_"));
    }

    #[tokio::test]
    async fn test_request_context_reuses_inbound_id() {
        let app = Router::new()
            .route("/test", get(test_handler))
            .layer(middleware::from_fn(request_context_middleware));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/test")
                    .header(REQUEST_ID_HEADER, "edge-abc123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get(REQUEST_ID_HEADER).unwrap(),
            "edge-abc123"
        );
    }

    #[tokio::test]
    async fn test_request_context_multiple_forwarded_ips() {
        let app = Router::new()
            .route("/ip", get(client_ip_handler))
            .layer(middleware::from_fn(request_context_middleware));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/ip")
                    .header("x-forwarded-for", "203.0.113.1, 198.51.100.1, 192.0.2.1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"203.0.113.1");
    }

    #[tokio::test]
    async fn test_security_headers_middleware() {
        let app = Router::new()
            .route("/test", get(test_handler))
            .layer(middleware::from_fn(security_headers_middleware));

        let response = app
            .oneshot(Request::builder().uri("/test").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(
            response.headers().get(header::X_CONTENT_TYPE_OPTIONS).unwrap(),
            "nosniff"
        );
        assert!(response.headers().get(header::X_FRAME_OPTIONS).is_some());
        assert!(response.headers().get(header::STRICT_TRANSPORT_SECURITY).is_some());
    }

    #[test]
    fn test_extract_metadata_empty_headers() {
        let meta = extract_metadata(&HeaderMap::new());
        assert_eq!(meta.user_agent, None);
        assert_eq!(meta.client_ip, None);
    }

    #[test]
    fn test_extract_metadata_real_ip_and_agent() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.7"));
        headers.insert(header::USER_AGENT, HeaderValue::from_static("test-agent/1.0"));

        let meta = extract_metadata(&headers);
        assert_eq!(meta.client_ip.as_deref(), Some("198.51.100.7"));
        assert_eq!(meta.user_agent.as_deref(), Some("test-agent/1.0"));
    }
}
