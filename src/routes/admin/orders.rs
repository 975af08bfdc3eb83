use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    paging::{DEFAULT_PAGE_SIZE, OrderSort, Page, PageParams, SortDirection},
    services::orders::{self, AdminOrderDetails, AdminOrderSummary},
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(utoipa_axum::routes!(get_orders))
        .routes(utoipa_axum::routes!(get_order))
        .routes(utoipa_axum::routes!(update_order_status))
}

/// Every order in the shop, newest first by default.
#[utoipa::path(
    get,
    path = "/orders",
    tags = ["Admin orders"],
    security(("userRoles" = [])),
    params(PageParams),
    responses(
        (status = 200, description = "List all orders", body = StdResponse<Page<AdminOrderSummary>, String>)
    )
)]
async fn get_orders(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = params.into_request::<OrderSort>(DEFAULT_PAGE_SIZE, SortDirection::Desc)?;
    let orders = orders::list_orders(state.store.as_ref(), &page).await?;

    Ok(StdResponse {
        data: Some(orders),
        message: Some("Get orders successfully"),
    })
}

#[utoipa::path(
    get,
    path = "/orders/{orderId}",
    tags = ["Admin orders"],
    security(("userRoles" = [])),
    params(("orderId" = i32, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Get order successfully", body = StdResponse<AdminOrderDetails, String>),
        (status = 404, description = "Unknown order")
    )
)]
async fn get_order(
    Path(order_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let order = orders::order_details(state.store.as_ref(), order_id).await?;

    Ok(StdResponse {
        data: Some(order),
        message: Some("Get order successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct UpdateStatusReq {
    pub status: String,
}

#[utoipa::path(
    put,
    path = "/orders/{orderId}/status",
    tags = ["Admin orders"],
    security(("userRoles" = [])),
    params(("orderId" = i32, Path, description = "Order ID")),
    request_body = UpdateStatusReq,
    responses(
        (status = 200, description = "Status updated", body = StdResponse<AdminOrderSummary, String>),
        (status = 404, description = "Unknown order"),
        (status = 422, description = "Blank status")
    )
)]
async fn update_order_status(
    Path(order_id): Path<i32>,
    State(state): State<AppState>,
    Json(body): Json<UpdateStatusReq>,
) -> Result<impl IntoResponse, AppError> {
    let order = orders::update_status(state.store.as_ref(), order_id, &body.status).await?;

    tracing::info!(order_id, status = %order.order_status, "Order status updated");
    Ok(StdResponse {
        data: Some(order),
        message: Some("Order status updated"),
    })
}
