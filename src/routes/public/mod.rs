//! Routes open to anonymous visitors.

pub mod categories;
pub mod products;
pub mod stock;

use utoipa_axum::router::OpenApiRouter;

use crate::app_state::AppState;

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .merge(products::routes_with_openapi())
        .merge(categories::routes_with_openapi())
        .merge(stock::routes_with_openapi())
}
