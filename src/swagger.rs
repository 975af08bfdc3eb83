use utoipa::openapi::{
    OpenApi,
    security::{ApiKey, ApiKeyValue, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::middleware::{USER_EMAIL_HEADER, USER_ROLES_HEADER};

/// Serves the document at `/api-docs/openapi.json` and the UI at `/swagger-ui`.
pub fn create_swagger_ui(mut openapi: OpenApi) -> SwaggerUi {
    let components = openapi.components.get_or_insert_with(Default::default);
    components.add_security_scheme(
        "userEmail",
        SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(USER_EMAIL_HEADER))),
    );
    components.add_security_scheme(
        "userRoles",
        SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(USER_ROLES_HEADER))),
    );

    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi)
}
