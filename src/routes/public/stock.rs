use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    models::StockSubscriptionEntity,
    services::stock_notifications::{self, SubscribeReq},
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(utoipa_axum::routes!(subscribe))
}

/// Ask to be mailed once the product is back in stock.
#[utoipa::path(
    post,
    path = "/stock/subscribe",
    tags = ["Stock"],
    request_body = SubscribeReq,
    responses(
        (status = 201, description = "Subscription registered", body = StdResponse<StockSubscriptionEntity, String>),
        (status = 404, description = "Unknown product"),
        (status = 422, description = "Invalid email")
    )
)]
async fn subscribe(
    State(state): State<AppState>,
    Json(body): Json<SubscribeReq>,
) -> Result<impl IntoResponse, AppError> {
    let subscription =
        stock_notifications::subscribe(state.store.as_ref(), body.product_id, &body.email).await?;

    Ok((
        StatusCode::CREATED,
        StdResponse {
            data: Some(subscription),
            message: Some("You will be notified when the product is back in stock"),
        },
    ))
}
