use crate::auth::principal::{strip_principal_headers, Principal};
use crate::errors::ApiError;
use crate::state::AppState;
use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{Request, Response},
    response::IntoResponse,
};
use http::header::{self, HeaderName};
use http::HeaderMap;
use std::error::Error as StdError;

/// Headers that describe a single connection and are never relayed
fn is_hop_by_hop(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection"
            | "content-length"
            | "host"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "proxy-connection"
            | "te"
            | "trailer"
            | "transfer-encoding"
            | "upgrade"
    )
}

/// Copies relayable headers from `source`
fn relayed_headers(source: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(source.len());
    for (name, value) in source {
        if !is_hop_by_hop(name) {
            headers.append(name.clone(), value.clone());
        }
    }
    headers
}

/// Forward a request to the organization backend, carrying the principal
/// attached by the authentication middleware as headers
pub(super) async fn forward_to_upstream(
    State(state): State<AppState>,
    req: Request<Body>,
) -> impl IntoResponse {
    let path = req
        .uri()
        .path_and_query()
        .map(|path| path.to_string())
        .unwrap_or_default();
    let url = state.config.upstream.get_url(&path);
    let method = req.method().clone();

    let max_body_bytes = state.config.upstream.max_body_bytes;
    let declared_length = req
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<usize>().ok());
    if declared_length.is_some_and(|length| length > max_body_bytes) {
        return ApiError::payload_too_large("Request body too large").into_response();
    }

    let mut headers = relayed_headers(req.headers());
    match req.extensions().get::<Principal>() {
        Some(principal) => principal.apply_headers(&mut headers),
        None => strip_principal_headers(&mut headers),
    }

    // Forward body if present
    let body_bytes = match to_bytes(req.into_body(), max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            log::warn!("Failed to read request body: {}", e);
            return ApiError::payload_too_large("Request body too large or unreadable")
                .into_response();
        }
    };

    log::debug!("Forwarding request to upstream: {} {}", method, url);
    let mut req_builder = state
        .upstream_client
        .request(method, &url)
        .headers(headers);
    if !body_bytes.is_empty() {
        req_builder = req_builder.body(body_bytes);
    }

    match req_builder.send().await {
        Ok(response) => {
            let status = response.status();
            let headers = relayed_headers(response.headers());
            let bytes = match response.bytes().await {
                Ok(bytes) => bytes,
                Err(e) => {
                    log::error!("Failed to read upstream response body: {}", e);
                    return ApiError::bad_gateway("Failed to read upstream response")
                        .into_response();
                }
            };

            let mut resp = Response::new(Body::from(bytes));
            *resp.status_mut() = status;
            *resp.headers_mut() = headers;
            resp.into_response()
        }
        Err(e) => {
            log::error!(
                "Failed to forward request to {}: {} (source: {:?})",
                url,
                e,
                e.source()
            );

            if e.is_timeout() {
                ApiError::gateway_timeout("Request timed out while waiting for upstream server")
                    .into_response()
            } else if e.is_connect() {
                ApiError::bad_gateway(
                    "Connection error occurred while connecting to upstream server",
                )
                .into_response()
            } else {
                ApiError::bad_gateway("Failed to forward request to upstream server")
                    .into_response()
            }
        }
    }
}
