use crate::config::CorsConfig;
use http::{header, HeaderValue, Method};
use log::warn;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// How long browsers may cache a preflight answer
const PREFLIGHT_MAX_AGE: Duration = Duration::from_secs(600);

/// CORS policy for browser clients, `None` when disabled.
///
/// Preflight requests are answered here, before authentication, since
/// browsers never attach credentials to them. Credentials are not allowed
/// so a wildcard origin stays valid.
pub(crate) fn cors_layer(config: &CorsConfig) -> Option<CorsLayer> {
    if !config.enabled {
        return None;
    }

    let allow_origin = match config.origins() {
        Some(origins) if !origins.contains(&"*") => {
            let allowed: Vec<HeaderValue> = origins
                .into_iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!("Ignoring invalid CORS origin {:?}", origin);
                        None
                    }
                })
                .collect();
            AllowOrigin::list(allowed)
        }
        _ => AllowOrigin::from(Any),
    };

    Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
            .max_age(PREFLIGHT_MAX_AGE),
    )
}
