//! Routes for the signed-in customer identified by `X-User-Email`.

pub mod addresses;
pub mod carts;
pub mod orders;

use utoipa_axum::router::OpenApiRouter;

use crate::{app_state::AppState, middleware};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .merge(carts::routes_with_openapi())
        .merge(addresses::routes_with_openapi())
        .merge(orders::routes_with_openapi())
        .route_layer(axum::middleware::from_fn(
            middleware::customers_authorization,
        ))
}
