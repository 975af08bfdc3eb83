//! HTTP surface. Handlers stay thin and delegate to `services`.

pub mod admin;
pub mod customers;
pub mod public;

use utoipa_axum::router::OpenApiRouter;

use crate::app_state::AppState;

/// Every API route with its OpenAPI description.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/api/public", public::routes_with_openapi())
        .nest("/api/customers", customers::routes_with_openapi())
        .nest("/api/admin", admin::routes_with_openapi())
}
