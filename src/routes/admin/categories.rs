use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    models::CategoryEntity,
    services::catalog,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(utoipa_axum::routes!(create_category))
        .routes(utoipa_axum::routes!(rename_category, delete_category))
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct CategoryReq {
    pub category_name: String,
}

#[utoipa::path(
    post,
    path = "/categories",
    tags = ["Admin categories"],
    security(("userRoles" = [])),
    request_body = CategoryReq,
    responses(
        (status = 201, description = "Category created", body = StdResponse<CategoryEntity, String>),
        (status = 400, description = "Name already taken")
    )
)]
async fn create_category(
    State(state): State<AppState>,
    Json(body): Json<CategoryReq>,
) -> Result<impl IntoResponse, AppError> {
    let category = catalog::create_category(state.store.as_ref(), &body.category_name).await?;

    Ok((
        StatusCode::CREATED,
        StdResponse {
            data: Some(category),
            message: Some("Category created"),
        },
    ))
}

#[utoipa::path(
    put,
    path = "/categories/{categoryId}",
    tags = ["Admin categories"],
    security(("userRoles" = [])),
    params(("categoryId" = i32, Path, description = "Category ID")),
    request_body = CategoryReq,
    responses(
        (status = 200, description = "Category renamed", body = StdResponse<CategoryEntity, String>),
        (status = 400, description = "Name already taken"),
        (status = 404, description = "Unknown category")
    )
)]
async fn rename_category(
    Path(category_id): Path<i32>,
    State(state): State<AppState>,
    Json(body): Json<CategoryReq>,
) -> Result<impl IntoResponse, AppError> {
    let category =
        catalog::rename_category(state.store.as_ref(), category_id, &body.category_name).await?;

    Ok(StdResponse {
        data: Some(category),
        message: Some("Category updated"),
    })
}

/// Delete a category that no product uses any more.
#[utoipa::path(
    delete,
    path = "/categories/{categoryId}",
    tags = ["Admin categories"],
    security(("userRoles" = [])),
    params(("categoryId" = i32, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category deleted", body = StdResponse<CategoryEntity, String>),
        (status = 400, description = "Category still has products"),
        (status = 404, description = "Unknown category")
    )
)]
async fn delete_category(
    Path(category_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let category = catalog::delete_category(state.store.as_ref(), category_id).await?;

    Ok(StdResponse {
        data: Some(category),
        message: Some("Category deleted"),
    })
}
