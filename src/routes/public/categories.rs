use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    models::CategoryEntity,
    paging::{CategorySort, DEFAULT_CATALOG_PAGE_SIZE, Page, PageParams, SortDirection},
    services::catalog,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(utoipa_axum::routes!(get_categories))
}

#[utoipa::path(
    get,
    path = "/categories",
    tags = ["Categories"],
    params(PageParams),
    responses(
        (status = 200, description = "Page of categories", body = StdResponse<Page<CategoryEntity>, String>)
    )
)]
async fn get_categories(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = params.into_request::<CategorySort>(DEFAULT_CATALOG_PAGE_SIZE, SortDirection::Asc)?;
    let categories = catalog::list_categories(state.store.as_ref(), &page).await?;

    Ok(StdResponse {
        data: Some(categories),
        message: Some("Get categories successfully"),
    })
}
