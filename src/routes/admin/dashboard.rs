use axum::{extract::State, response::IntoResponse};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    services::orders::{self, DashboardStats},
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(utoipa_axum::routes!(get_dashboard))
}

/// Product count, order count and revenue across all orders.
#[utoipa::path(
    get,
    path = "/dashboard",
    tags = ["Admin dashboard"],
    security(("userRoles" = [])),
    responses(
        (status = 200, description = "Shop totals", body = StdResponse<DashboardStats, String>)
    )
)]
async fn get_dashboard(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let stats = orders::dashboard(state.store.as_ref()).await?;

    Ok(StdResponse {
        data: Some(stats),
        message: Some("Get dashboard successfully"),
    })
}
