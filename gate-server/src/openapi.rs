use utoipa::OpenApi;

pub(crate) const HEALTH_TAG: &str = "Health API";

#[derive(OpenApi)]
#[openapi(
    paths(crate::api::health::health_check),
    tags(
        (name = HEALTH_TAG, description = "Health check endpoints"),
    ),
    info(
        title = "Organization Authorization Gateway",
        description = "Authenticates and authorizes requests before they reach the organization services",
        version = "0.1.0"
    )
)]
pub(crate) struct ApiDoc;
