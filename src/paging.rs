//! Page requests and page envelopes shared by catalog and order listings.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::app_error::AppError;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const DEFAULT_CATALOG_PAGE_SIZE: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(AppError::Validation(format!("unknown sort order `{other}`"))),
        }
    }
}

/// Columns a product listing can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSort {
    #[default]
    Id,
    Name,
    Price,
    SpecialPrice,
    Quantity,
}

impl FromStr for ProductSort {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "productId" | "id" => Ok(Self::Id),
            "productName" | "name" => Ok(Self::Name),
            "price" => Ok(Self::Price),
            "specialPrice" | "special_price" => Ok(Self::SpecialPrice),
            "quantity" => Ok(Self::Quantity),
            other => Err(AppError::Validation(format!("cannot sort products by `{other}`"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategorySort {
    #[default]
    Id,
    Name,
}

impl FromStr for CategorySort {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "categoryId" | "id" => Ok(Self::Id),
            "categoryName" | "name" => Ok(Self::Name),
            other => Err(AppError::Validation(format!("cannot sort categories by `{other}`"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderSort {
    #[default]
    Id,
    Date,
    TotalAmount,
    Email,
    Status,
}

impl FromStr for OrderSort {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "orderId" | "id" => Ok(Self::Id),
            "orderDate" | "order_date" => Ok(Self::Date),
            "totalAmount" | "total_amount" => Ok(Self::TotalAmount),
            "email" => Ok(Self::Email),
            "orderStatus" | "status" => Ok(Self::Status),
            other => Err(AppError::Validation(format!("cannot sort orders by `{other}`"))),
        }
    }
}

/// A normalised page request: never a negative page, never an empty page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest<S> {
    pub page_number: i64,
    pub page_size: i64,
    pub sort_by: S,
    pub direction: SortDirection,
}

impl<S> PageRequest<S> {
    pub fn new(page_number: i64, page_size: i64, sort_by: S, direction: SortDirection) -> Self {
        Self {
            page_number: page_number.max(0),
            page_size: if page_size <= 0 {
                DEFAULT_PAGE_SIZE
            } else {
                page_size
            },
            sort_by,
            direction,
        }
    }

    pub fn offset(&self) -> i64 {
        self.page_number.saturating_mul(self.page_size)
    }
}

/// Raw paging query string as sent by clients.
#[derive(Deserialize, Debug, Default, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    pub page_number: Option<i64>,
    pub page_size: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl PageParams {
    /// Parses the sort column and order, falling back to the given defaults.
    pub fn into_request<S>(
        self,
        default_size: i64,
        default_direction: SortDirection,
    ) -> Result<PageRequest<S>, AppError>
    where
        S: FromStr<Err = AppError>,
    {
        let sort_by = self.sort_by.as_deref().unwrap_or_default().parse()?;
        let direction = match self.sort_order.as_deref() {
            Some(order) if !order.trim().is_empty() => order.parse()?,
            _ => default_direction,
        };
        Ok(PageRequest::new(
            self.page_number.unwrap_or(0),
            self.page_size.unwrap_or(default_size),
            sort_by,
            direction,
        ))
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page_number: i64,
    pub page_size: i64,
    pub total_elements: i64,
    pub total_pages: i64,
    pub last_page: bool,
}

impl<T> Page<T> {
    pub fn new<S>(content: Vec<T>, request: &PageRequest<S>, total_elements: i64) -> Self {
        let total_pages = if total_elements == 0 {
            0
        } else {
            (total_elements + request.page_size - 1) / request.page_size
        };
        Self {
            content,
            page_number: request.page_number,
            page_size: request.page_size,
            total_elements,
            total_pages,
            last_page: request.page_number + 1 >= total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page_number: self.page_number,
            page_size: self.page_size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
            last_page: self.last_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_normalises_bounds() {
        let req = PageRequest::new(-3, 0, ProductSort::Id, SortDirection::Asc);
        assert_eq!(req.page_number, 0);
        assert_eq!(req.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn page_counts_partial_last_page() {
        let req = PageRequest::new(2, 10, OrderSort::Id, SortDirection::Desc);
        let page = Page::new(vec![1, 2, 3], &req, 23);
        assert_eq!(page.total_pages, 3);
        assert!(page.last_page);

        let first = Page::new(vec![0; 10], &PageRequest::new(0, 10, OrderSort::Id, SortDirection::Desc), 23);
        assert!(!first.last_page);
    }

    #[test]
    fn empty_page_is_last() {
        let page: Page<i32> = Page::new(vec![], &PageRequest::new(0, 10, CategorySort::Id, SortDirection::Asc), 0);
        assert_eq!(page.total_pages, 0);
        assert!(page.last_page);
    }

    #[test]
    fn params_reject_unknown_sort_column() {
        let params = PageParams {
            sort_by: Some("password".into()),
            ..Default::default()
        };
        let result: Result<PageRequest<ProductSort>, _> =
            params.into_request(DEFAULT_CATALOG_PAGE_SIZE, SortDirection::Asc);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn params_use_defaults() {
        let req: PageRequest<OrderSort> = PageParams::default()
            .into_request(DEFAULT_PAGE_SIZE, SortDirection::Desc)
            .unwrap();
        assert_eq!(req.sort_by, OrderSort::Id);
        assert_eq!(req.direction, SortDirection::Desc);
        assert_eq!(req.page_size, DEFAULT_PAGE_SIZE);
    }
}
