use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    middleware::CustomerEmail,
    paging::{DEFAULT_PAGE_SIZE, OrderSort, Page, PageParams, SortDirection},
    services::orders::{self, OrderView, PlaceOrder},
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/orders",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(place_order))
            .routes(utoipa_axum::routes!(get_my_orders)),
    )
}

/// Turn the customer's cart into an order paid with `paymentMethod`.
#[utoipa::path(
    post,
    path = "/payments/{paymentMethod}",
    tags = ["Orders"],
    security(("userEmail" = [])),
    params(("paymentMethod" = String, Path, description = "Payment method, e.g. card")),
    request_body = PlaceOrder,
    responses(
        (status = 201, description = "Order placed", body = StdResponse<OrderView, String>),
        (status = 400, description = "Empty cart or insufficient stock"),
        (status = 404, description = "No cart or unknown address")
    )
)]
async fn place_order(
    Path(payment_method): Path<String>,
    State(state): State<AppState>,
    Extension(CustomerEmail(email)): Extension<CustomerEmail>,
    Json(mut body): Json<PlaceOrder>,
) -> Result<impl IntoResponse, AppError> {
    body.payment_method = payment_method;
    let order =
        orders::place_order(state.store.as_ref(), &state.config.orders, &email, body).await?;

    Ok((
        StatusCode::CREATED,
        StdResponse {
            data: Some(order),
            message: Some("Order placed successfully"),
        },
    ))
}

/// Orders of the authenticated customer, newest first by default.
#[utoipa::path(
    get,
    path = "/my-orders",
    tags = ["Orders"],
    security(("userEmail" = [])),
    params(PageParams),
    responses(
        (status = 200, description = "List my orders", body = StdResponse<Page<OrderView>, String>)
    )
)]
async fn get_my_orders(
    State(state): State<AppState>,
    Extension(CustomerEmail(email)): Extension<CustomerEmail>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = params.into_request::<OrderSort>(DEFAULT_PAGE_SIZE, SortDirection::Desc)?;
    let orders = orders::my_orders(state.store.as_ref(), &email, &page).await?;

    Ok(StdResponse {
        data: Some(orders),
        message: Some("Get my orders successfully"),
    })
}
