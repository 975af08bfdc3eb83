//! Back-office routes, restricted to `ROLE_ADMIN`.

pub mod categories;
pub mod dashboard;
pub mod jobs;
pub mod orders;
pub mod products;

use utoipa_axum::router::OpenApiRouter;

use crate::{app_state::AppState, middleware};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .merge(products::routes_with_openapi())
        .merge(categories::routes_with_openapi())
        .merge(orders::routes_with_openapi())
        .merge(dashboard::routes_with_openapi())
        .merge(jobs::routes_with_openapi())
        .route_layer(axum::middleware::from_fn(middleware::admins_authorization))
}
