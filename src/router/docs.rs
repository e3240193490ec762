//! OpenAPI documentation, served at `/v3/api-docs`.

use axum::Json;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::account::Account;
use crate::middleware::API_KEY_HEADER;
use crate::router::accounts;

/// Shared secret header security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(
                    ApiKeyValue::with_description(
                        API_KEY_HEADER,
                        "Shared secret configured on the server.",
                    ),
                )),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Account services API",
        description = "Open bank accounts and read their details and balance.",
    ),
    paths(
        accounts::register::handler,
        accounts::get::handler,
        accounts::balance::handler,
    ),
    components(schemas(Account, accounts::register::Body)),
    modifiers(&SecurityAddon),
    tags((name = "Accounts", description = "Account registration and lookup"))
)]
pub struct ApiDoc;

/// OpenAPI document.
pub async fn handler() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
