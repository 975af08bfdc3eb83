use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    middleware::CustomerEmail,
    models::AddressEntity,
    services::addresses::{self, AddressInput},
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(utoipa_axum::routes!(create_address, get_my_addresses))
        .routes(utoipa_axum::routes!(get_address, delete_address))
}

#[utoipa::path(
    post,
    path = "/addresses",
    tags = ["Addresses"],
    security(("userEmail" = [])),
    request_body = AddressInput,
    responses(
        (status = 201, description = "Address created", body = StdResponse<AddressEntity, String>),
        (status = 422, description = "Missing required field")
    )
)]
async fn create_address(
    State(state): State<AppState>,
    Extension(CustomerEmail(email)): Extension<CustomerEmail>,
    Json(body): Json<AddressInput>,
) -> Result<impl IntoResponse, AppError> {
    let address = addresses::create_address(state.store.as_ref(), &email, body).await?;

    Ok((
        StatusCode::CREATED,
        StdResponse {
            data: Some(address),
            message: Some("Address created"),
        },
    ))
}

#[utoipa::path(
    get,
    path = "/addresses",
    tags = ["Addresses"],
    security(("userEmail" = [])),
    responses(
        (status = 200, description = "List my addresses", body = StdResponse<Vec<AddressEntity>, String>)
    )
)]
async fn get_my_addresses(
    State(state): State<AppState>,
    Extension(CustomerEmail(email)): Extension<CustomerEmail>,
) -> Result<impl IntoResponse, AppError> {
    let addresses = addresses::my_addresses(state.store.as_ref(), &email).await?;

    Ok(StdResponse {
        data: Some(addresses),
        message: Some("Get addresses successfully"),
    })
}

#[utoipa::path(
    get,
    path = "/addresses/{addressId}",
    tags = ["Addresses"],
    security(("userEmail" = [])),
    params(("addressId" = i32, Path, description = "Address ID")),
    responses(
        (status = 200, description = "Get address successfully", body = StdResponse<AddressEntity, String>),
        (status = 404, description = "No such address for this customer")
    )
)]
async fn get_address(
    Path(address_id): Path<i32>,
    State(state): State<AppState>,
    Extension(CustomerEmail(email)): Extension<CustomerEmail>,
) -> Result<impl IntoResponse, AppError> {
    let address = addresses::get_address(state.store.as_ref(), &email, address_id).await?;

    Ok(StdResponse {
        data: Some(address),
        message: Some("Get address successfully"),
    })
}

/// Delete an address. Addresses used by an order are kept.
#[utoipa::path(
    delete,
    path = "/addresses/{addressId}",
    tags = ["Addresses"],
    security(("userEmail" = [])),
    params(("addressId" = i32, Path, description = "Address ID")),
    responses(
        (status = 200, description = "Address deleted", body = StdResponse<AddressEntity, String>),
        (status = 400, description = "Address is referenced by an order"),
        (status = 404, description = "No such address for this customer")
    )
)]
async fn delete_address(
    Path(address_id): Path<i32>,
    State(state): State<AppState>,
    Extension(CustomerEmail(email)): Extension<CustomerEmail>,
) -> Result<impl IntoResponse, AppError> {
    let address = addresses::delete_address(state.store.as_ref(), &email, address_id).await?;

    Ok(StdResponse {
        data: Some(address),
        message: Some("Address deleted"),
    })
}
