use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use utoipa::IntoParams;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    models::ProductEntity,
    services::catalog::{self, ProductDetailsInput, ProductDetailsView, ProductInput},
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(utoipa_axum::routes!(get_products, create_product))
        .routes(utoipa_axum::routes!(update_product, delete_product))
        .routes(utoipa_axum::routes!(upsert_details))
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
struct ProductsQuery {
    /// Only products of this category.
    pub category_id: Option<i32>,
}

#[utoipa::path(
    get,
    path = "/products",
    tags = ["Admin products"],
    security(("userRoles" = [])),
    params(ProductsQuery),
    responses(
        (status = 200, description = "List products", body = StdResponse<Vec<ProductEntity>, String>)
    )
)]
async fn get_products(
    State(state): State<AppState>,
    Query(query): Query<ProductsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let products = catalog::admin_products(state.store.as_ref(), query.category_id).await?;

    Ok(StdResponse {
        data: Some(products),
        message: Some("Get products successfully"),
    })
}

#[utoipa::path(
    post,
    path = "/products",
    tags = ["Admin products"],
    security(("userRoles" = [])),
    request_body = ProductInput,
    responses(
        (status = 201, description = "Product created", body = StdResponse<ProductEntity, String>),
        (status = 404, description = "Unknown category"),
        (status = 422, description = "Invalid product")
    )
)]
async fn create_product(
    State(state): State<AppState>,
    Json(body): Json<ProductInput>,
) -> Result<impl IntoResponse, AppError> {
    let product = catalog::create_product(state.store.as_ref(), body).await?;

    Ok((
        StatusCode::CREATED,
        StdResponse {
            data: Some(product),
            message: Some("Product created"),
        },
    ))
}

/// Replace a product. Bringing stock back above zero mails its subscribers.
#[utoipa::path(
    put,
    path = "/products/{productId}",
    tags = ["Admin products"],
    security(("userRoles" = [])),
    params(("productId" = i32, Path, description = "Product ID")),
    request_body = ProductInput,
    responses(
        (status = 200, description = "Product updated", body = StdResponse<ProductEntity, String>),
        (status = 404, description = "Unknown product or category")
    )
)]
async fn update_product(
    Path(product_id): Path<i32>,
    State(state): State<AppState>,
    Json(body): Json<ProductInput>,
) -> Result<impl IntoResponse, AppError> {
    let product = catalog::update_product(
        state.store.as_ref(),
        state.mailer.as_ref(),
        product_id,
        body,
    )
    .await?;

    Ok(StdResponse {
        data: Some(product),
        message: Some("Product updated"),
    })
}

#[utoipa::path(
    delete,
    path = "/products/{productId}",
    tags = ["Admin products"],
    security(("userRoles" = [])),
    params(("productId" = i32, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product deleted", body = StdResponse<ProductEntity, String>),
        (status = 404, description = "Unknown product")
    )
)]
async fn delete_product(
    Path(product_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let product = catalog::delete_product(state.store.as_ref(), product_id).await?;

    Ok(StdResponse {
        data: Some(product),
        message: Some("Product deleted"),
    })
}

#[utoipa::path(
    put,
    path = "/products/{productId}/details",
    tags = ["Admin products"],
    security(("userRoles" = [])),
    params(("productId" = i32, Path, description = "Product ID")),
    request_body = ProductDetailsInput,
    responses(
        (status = 200, description = "Details saved", body = StdResponse<ProductDetailsView, String>),
        (status = 404, description = "Unknown product")
    )
)]
async fn upsert_details(
    Path(product_id): Path<i32>,
    State(state): State<AppState>,
    Json(body): Json<ProductDetailsInput>,
) -> Result<impl IntoResponse, AppError> {
    let details = catalog::upsert_details(state.store.as_ref(), product_id, body).await?;

    Ok(StdResponse {
        data: Some(details),
        message: Some("Product details saved"),
    })
}
