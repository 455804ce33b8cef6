//! HTTP API handlers for hamlog-server

pub mod auth;
pub mod callsign;
pub mod export;
pub mod health;
pub mod parse;
pub mod qso;
pub mod rate_limit;

use axum::http::{header, HeaderValue, Method};
use tower_http::cors::CorsLayer;
use tracing::warn;

/// CORS for the browser front end
///
/// Credentials are allowed, so origins, methods and headers are explicit.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}
