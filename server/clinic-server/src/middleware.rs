use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, HeaderName, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use std::time::{Duration, Instant};
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use crate::error::ApiError;

/// Header carrying the caller's verified clinic
pub const CLINIC_HEADER: &str = "x-clinic-id";

/// Clinic the request acts for. Every clinic endpoint takes one; a missing
/// or malformed header is rejected with `NO_CLINIC`.
#[derive(Debug, Clone, Copy)]
pub struct ClinicContext {
    pub clinic_id: Uuid,
}

#[async_trait]
impl<S> FromRequestParts<S> for ClinicContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let clinic_id = parts
            .headers
            .get(CLINIC_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
            .filter(|id| !id.is_nil())
            .ok_or(ApiError::NoClinic)?;
        Ok(ClinicContext { clinic_id })
    }
}

/// Request timing middleware
pub async fn request_timing_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().path().to_string();

    let response = next.run(request).await;

    tracing::info!(
        method = %method,
        path = %uri,
        duration_ms = start.elapsed().as_millis(),
        status = response.status().as_u16(),
        "Request processed"
    );

    response
}

pub fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
            HeaderValue::from_static("http://localhost:8080"),
        ])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(CLINIC_HEADER),
        ])
        .max_age(Duration::from_secs(3600))
}
