use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    models::ProductEntity,
    paging::{DEFAULT_CATALOG_PAGE_SIZE, Page, PageParams, ProductSort, SortDirection},
    services::catalog::{self, ProductDetailsView, ProductFull},
    store::ProductFilter,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(utoipa_axum::routes!(get_products))
        .routes(utoipa_axum::routes!(search_products))
        .routes(utoipa_axum::routes!(get_products_by_category))
        .routes(utoipa_axum::routes!(get_product_details))
        .routes(utoipa_axum::routes!(get_product_full))
}

async fn page_of_products(
    state: &AppState,
    filter: ProductFilter,
    params: PageParams,
) -> Result<Page<ProductEntity>, AppError> {
    let page = params.into_request::<ProductSort>(DEFAULT_CATALOG_PAGE_SIZE, SortDirection::Asc)?;
    catalog::list_products(state.store.as_ref(), &filter, &page).await
}

/// Browse the whole catalog.
#[utoipa::path(
    get,
    path = "/products",
    tags = ["Catalog"],
    params(PageParams),
    responses(
        (status = 200, description = "Page of products", body = StdResponse<Page<ProductEntity>, String>)
    )
)]
async fn get_products(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let products = page_of_products(&state, ProductFilter::default(), params).await?;

    Ok(StdResponse {
        data: Some(products),
        message: Some("Get products successfully"),
    })
}

/// Case-insensitive search on the product name.
#[utoipa::path(
    get,
    path = "/products/keyword/{keyword}",
    tags = ["Catalog"],
    params(
        ("keyword" = String, Path, description = "Part of the product name"),
        PageParams
    ),
    responses(
        (status = 200, description = "Page of matching products", body = StdResponse<Page<ProductEntity>, String>)
    )
)]
async fn search_products(
    Path(keyword): Path<String>,
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let filter = ProductFilter {
        keyword: Some(keyword),
        ..Default::default()
    };
    let products = page_of_products(&state, filter, params).await?;

    Ok(StdResponse {
        data: Some(products),
        message: Some("Search products successfully"),
    })
}

#[utoipa::path(
    get,
    path = "/categories/{categoryId}/products",
    tags = ["Catalog"],
    params(
        ("categoryId" = i32, Path, description = "Category to list"),
        PageParams
    ),
    responses(
        (status = 200, description = "Page of products in the category", body = StdResponse<Page<ProductEntity>, String>),
        (status = 404, description = "Unknown category")
    )
)]
async fn get_products_by_category(
    Path(category_id): Path<i32>,
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let filter = ProductFilter {
        category_id: Some(category_id),
        ..Default::default()
    };
    let products = page_of_products(&state, filter, params).await?;

    Ok(StdResponse {
        data: Some(products),
        message: Some("Get category products successfully"),
    })
}

/// Details of a product; every field is empty when none were recorded.
#[utoipa::path(
    get,
    path = "/products/{productId}/details",
    tags = ["Catalog"],
    params(("productId" = i32, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product details", body = StdResponse<ProductDetailsView, String>),
        (status = 404, description = "Unknown product")
    )
)]
async fn get_product_details(
    Path(product_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let details = catalog::product_details(state.store.as_ref(), product_id).await?;

    Ok(StdResponse {
        data: Some(details),
        message: Some("Get product details successfully"),
    })
}

#[utoipa::path(
    get,
    path = "/products/{productId}/full",
    tags = ["Catalog"],
    params(("productId" = i32, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product with its details", body = StdResponse<ProductFull, String>),
        (status = 404, description = "Unknown product")
    )
)]
async fn get_product_full(
    Path(product_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let full = catalog::product_full(state.store.as_ref(), product_id).await?;

    Ok(StdResponse {
        data: Some(full),
        message: Some("Get product successfully"),
    })
}
