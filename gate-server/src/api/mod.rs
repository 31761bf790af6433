mod authn_middleware;
pub(crate) mod cors;
mod forward;
pub(crate) mod health;

use crate::api::authn_middleware::{
    service_authentication_middleware, user_authentication_middleware,
};
use crate::api::forward::forward_to_upstream;
use crate::errors::not_found;
use crate::state::AppState;
use axum::{
    middleware,
    routing::{any, get, post},
    Router,
};

/// Combines all gateway routes into a single router
pub(super) fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(public_routes())
        .merge(service_routes(state))
        .merge(user_routes(state))
        .fallback(not_found)
}

/// Routes forwarded without any authentication
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/organization/time-zone-list", get(forward_to_upstream))
        .route(
            "/organizationStatus/{organization_id}",
            get(forward_to_upstream),
        )
}

/// Routes for internal services, the EMR integration and automation callers
fn service_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/organization/itself", get(forward_to_upstream))
        .route(
            "/organization/createOrganizationFromEmr",
            post(forward_to_upstream),
        )
        .route(
            "/organization/updateOrganizationAccessFromEmr",
            post(forward_to_upstream),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            service_authentication_middleware,
        ))
}

/// Routes guarded by introspection and the scope of their prefix
fn user_routes(state: &AppState) -> Router<AppState> {
    let mut router = Router::new();
    for prefix in state.scopes.prefixes() {
        router = router
            .route(prefix, any(forward_to_upstream))
            .route(&format!("{prefix}/{{*rest}}"), any(forward_to_upstream));
    }

    // route_layer keeps unmatched paths answering 404 instead of 401
    router.route_layer(middleware::from_fn_with_state(
        state.clone(),
        user_authentication_middleware,
    ))
}
