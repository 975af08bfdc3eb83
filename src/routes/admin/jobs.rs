//! Manual triggers for the alert jobs. A trigger that lands while the
//! scheduled run is still going reports it instead of running twice.

use axum::{extract::State, response::IntoResponse};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    jobs::{RunOutcome, expiry::ExpiryRun, low_stock::LowStockRun},
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/jobs",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(run_low_stock))
            .routes(utoipa_axum::routes!(run_expiry)),
    )
}

fn outcome_response<T>(outcome: RunOutcome<T>) -> StdResponse<T, &'static str> {
    match outcome {
        RunOutcome::Completed(run) => StdResponse {
            data: Some(run),
            message: Some("Job finished"),
        },
        RunOutcome::AlreadyRunning => StdResponse {
            data: None,
            message: Some("Job already running"),
        },
    }
}

#[utoipa::path(
    post,
    path = "/low-stock",
    tags = ["Admin jobs"],
    security(("userRoles" = [])),
    responses(
        (status = 200, description = "Run summary, empty when a run was in progress", body = StdResponse<LowStockRun, String>)
    )
)]
async fn run_low_stock(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let outcome = state.low_stock_job.run().await?;
    Ok(outcome_response(outcome))
}

#[utoipa::path(
    post,
    path = "/expiry",
    tags = ["Admin jobs"],
    security(("userRoles" = [])),
    responses(
        (status = 200, description = "Run summary, empty when a run was in progress", body = StdResponse<ExpiryRun, String>)
    )
)]
async fn run_expiry(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let outcome = state.expiry_job.run().await?;
    Ok(outcome_response(outcome))
}
