use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    middleware::CustomerEmail,
    services::carts::{self, CartView},
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/carts",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_my_cart))
            .routes(utoipa_axum::routes!(add_product))
            .routes(utoipa_axum::routes!(update_quantity, remove_product)),
    )
}

/// Fetch the cart of the authenticated customer.
#[utoipa::path(
    get,
    path = "/my-cart",
    tags = ["Carts"],
    security(("userEmail" = [])),
    responses(
        (status = 200, description = "Get cart successfully", body = StdResponse<CartView, String>),
        (status = 404, description = "No cart yet")
    )
)]
async fn get_my_cart(
    State(state): State<AppState>,
    Extension(CustomerEmail(email)): Extension<CustomerEmail>,
) -> Result<impl IntoResponse, AppError> {
    let cart = carts::get_cart(state.store.as_ref(), &email).await?;

    Ok(StdResponse {
        data: Some(cart),
        message: Some("Get cart successfully"),
    })
}

/// Add a product to the cart, creating the cart on first use.
#[utoipa::path(
    post,
    path = "/products/{productId}/quantity/{quantity}",
    tags = ["Carts"],
    security(("userEmail" = [])),
    params(
        ("productId" = i32, Path, description = "Product to add"),
        ("quantity" = i32, Path, description = "Units to add")
    ),
    responses(
        (status = 200, description = "Product added", body = StdResponse<CartView, String>),
        (status = 404, description = "Unknown product"),
        (status = 422, description = "Non-positive quantity")
    )
)]
async fn add_product(
    Path((product_id, quantity)): Path<(i32, i32)>,
    State(state): State<AppState>,
    Extension(CustomerEmail(email)): Extension<CustomerEmail>,
) -> Result<impl IntoResponse, AppError> {
    let cart = carts::add_product(state.store.as_ref(), &email, product_id, quantity).await?;

    Ok(StdResponse {
        data: Some(cart),
        message: Some("Product added to cart"),
    })
}

#[derive(Deserialize, ToSchema)]
struct UpdateQuantityReq {
    pub quantity: i32,
}

/// Set the quantity of a cart line. Zero or less removes the line.
#[utoipa::path(
    put,
    path = "/products/{productId}",
    tags = ["Carts"],
    security(("userEmail" = [])),
    params(("productId" = i32, Path, description = "Product in the cart")),
    request_body = UpdateQuantityReq,
    responses(
        (status = 200, description = "Cart updated", body = StdResponse<CartView, String>),
        (status = 404, description = "No cart or no such line")
    )
)]
async fn update_quantity(
    Path(product_id): Path<i32>,
    State(state): State<AppState>,
    Extension(CustomerEmail(email)): Extension<CustomerEmail>,
    Json(body): Json<UpdateQuantityReq>,
) -> Result<impl IntoResponse, AppError> {
    let cart =
        carts::update_quantity(state.store.as_ref(), &email, product_id, body.quantity).await?;

    Ok(StdResponse {
        data: Some(cart),
        message: Some("Cart updated"),
    })
}

#[utoipa::path(
    delete,
    path = "/products/{productId}",
    tags = ["Carts"],
    security(("userEmail" = [])),
    params(("productId" = i32, Path, description = "Product to remove")),
    responses(
        (status = 200, description = "Product removed", body = StdResponse<CartView, String>),
        (status = 404, description = "No cart or no such line")
    )
)]
async fn remove_product(
    Path(product_id): Path<i32>,
    State(state): State<AppState>,
    Extension(CustomerEmail(email)): Extension<CustomerEmail>,
) -> Result<impl IntoResponse, AppError> {
    let cart = carts::remove_product(state.store.as_ref(), &email, product_id).await?;

    Ok(StdResponse {
        data: Some(cart),
        message: Some("Product removed from cart"),
    })
}
