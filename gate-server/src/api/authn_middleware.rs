use crate::auth::bearer::extract_bearer;
use crate::auth::principal::{Principal, UserPrincipal};
use crate::auth::{AuthError, RejectReason};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http::HeaderMap;
use log::{debug, error, warn};

/// Authenticates users by token introspection, looks up their permissions
/// and checks the scope required by the route prefix. On success the
/// `Principal` is attached to the request.
pub(super) async fn user_authentication_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let result = authenticate_user(&state, request.uri().path(), request.headers()).await;

    match result {
        Ok(principal) => {
            debug!(
                "Authorized user '{}' for {}",
                principal.username,
                request.uri().path()
            );
            request.extensions_mut().insert(Principal::User(principal));
            next.run(request).await
        }
        Err(err) => {
            log_rejection(&err, request.uri().path());
            err.into_rejection(state.disclosure()).into_response()
        }
    }
}

async fn authenticate_user(
    state: &AppState,
    path: &str,
    headers: &HeaderMap,
) -> Result<UserPrincipal, AuthError> {
    let bearer = extract_bearer(headers)?;

    let introspection = state
        .introspection
        .introspect(bearer.token())
        .await
        .map_err(AuthError::AuthBackendUnavailable)?;
    if !introspection.active {
        return Err(AuthError::TokenInactive);
    }
    let subject = introspection
        .subject()
        .map_err(AuthError::AuthBackendUnavailable)?;
    debug!("Token checked, subject: {}", subject);

    let permission = state
        .directory
        .fetch_permission(subject, bearer.authorization())
        .await
        .map_err(AuthError::PermissionLookupFailed)?;
    debug!("Permissions fetched for: {}", permission.username);

    state.scopes.authorize(path, permission)
}

/// Authenticates internal callers by a locally verified service token.
/// No scope check is made.
pub(super) async fn service_authentication_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let result = extract_bearer(request.headers())
        .and_then(|bearer| state.service_tokens.verify(bearer.token()));

    match result {
        Ok(principal) => {
            debug!(
                "Authenticated service caller for organization {:?} ({:?})",
                principal.organization_id(),
                principal.organization_name()
            );
            request
                .extensions_mut()
                .insert(Principal::Service(principal));
            next.run(request).await
        }
        Err(err) => {
            log_rejection(&err, request.uri().path());
            err.into_service_rejection().into_response()
        }
    }
}

fn log_rejection(err: &AuthError, path: &str) {
    match err.reason() {
        RejectReason::BackendUnavailable => {
            error!("Rejected request to {} ({}): {}", path, err.reason(), err)
        }
        reason => warn!("Rejected request to {} ({}): {}", path, reason, err),
    }
}
