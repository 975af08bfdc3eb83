//! Persistence boundary.
//!
//! Every read and write goes through a [`StoreTx`] obtained from
//! [`Store::begin`]. A transaction is committed with [`StoreTx::commit`];
//! [`StoreTx::rollback`] (or dropping the transaction) discards every change
//! made through it. Relations are plain ids; callers resolve them with the
//! batch lookups (`find_products`, `order_items_for`, ...).

pub mod memory;
pub mod pg;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::{
    app_error::AppError,
    models::{
        AddressEntity, CartEntity, CartItemEntity, CategoryEntity, CreateAddressEntity,
        CreateCartItemEntity, CreateOrderEntity, CreateOrderItemEntity, CreatePaymentEntity,
        CreateProductEntity, CreateStockSubscriptionEntity, OrderEntity, OrderItemEntity,
        PaymentEntity, ProductDetailsEntity, ProductEntity, StockAlertLogEntity,
        StockSubscriptionEntity, UpdateProductEntity, UpsertProductDetailsEntity,
    },
    paging::{CategorySort, OrderSort, Page, PageRequest, ProductSort},
};

pub use memory::MemoryStore;
pub use pg::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(String),

    #[error("constraint violation: {0}")]
    Conflict(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Narrows a product listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub category_id: Option<i32>,
    /// Case-insensitive substring of the product name.
    pub keyword: Option<String>,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>>;
}

#[async_trait]
pub trait StoreTx: Send {
    // Categories
    async fn find_category(&mut self, id: i32) -> StoreResult<Option<CategoryEntity>>;
    async fn find_category_by_name(&mut self, name: &str) -> StoreResult<Option<CategoryEntity>>;
    async fn find_categories(&mut self, ids: &[i32]) -> StoreResult<Vec<CategoryEntity>>;
    async fn list_categories(
        &mut self,
        page: &PageRequest<CategorySort>,
    ) -> StoreResult<Page<CategoryEntity>>;
    async fn insert_category(&mut self, name: &str) -> StoreResult<CategoryEntity>;
    async fn rename_category(&mut self, id: i32, name: &str)
    -> StoreResult<Option<CategoryEntity>>;
    async fn delete_category(&mut self, id: i32) -> StoreResult<Option<CategoryEntity>>;

    // Products
    async fn find_product(&mut self, id: i32) -> StoreResult<Option<ProductEntity>>;
    async fn find_products(&mut self, ids: &[i32]) -> StoreResult<Vec<ProductEntity>>;
    /// Same rows as `find_products`, locked until the transaction ends.
    async fn lock_products(&mut self, ids: &[i32]) -> StoreResult<Vec<ProductEntity>>;
    async fn list_products(
        &mut self,
        filter: &ProductFilter,
        page: &PageRequest<ProductSort>,
    ) -> StoreResult<Page<ProductEntity>>;
    async fn products_in_category(&mut self, category_id: Option<i32>)
    -> StoreResult<Vec<ProductEntity>>;
    /// Products whose quantity is at or below `threshold`, ordered by id.
    async fn products_at_or_below(&mut self, threshold: i32) -> StoreResult<Vec<ProductEntity>>;
    async fn count_products(&mut self) -> StoreResult<i64>;
    async fn insert_product(&mut self, product: CreateProductEntity) -> StoreResult<ProductEntity>;
    async fn update_product(
        &mut self,
        id: i32,
        changes: UpdateProductEntity,
    ) -> StoreResult<Option<ProductEntity>>;
    /// Subtracts `by` from the stock count. No floor is applied here.
    async fn decrement_stock(&mut self, id: i32, by: i32) -> StoreResult<Option<ProductEntity>>;
    async fn delete_product(&mut self, id: i32) -> StoreResult<Option<ProductEntity>>;

    // Product details
    async fn find_product_details(
        &mut self,
        product_id: i32,
    ) -> StoreResult<Option<ProductDetailsEntity>>;
    async fn upsert_product_details(
        &mut self,
        details: UpsertProductDetailsEntity,
    ) -> StoreResult<ProductDetailsEntity>;
    /// Details with `start <= expiry_date <= end` whose expiry alert was not
    /// sent on `today`, ordered by expiry date then id.
    async fn expiring_not_alerted(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
        today: NaiveDate,
    ) -> StoreResult<Vec<ProductDetailsEntity>>;
    async fn mark_expiry_alerted(&mut self, ids: &[i32], on: NaiveDate) -> StoreResult<usize>;

    // Carts
    async fn find_cart_by_email(&mut self, email: &str) -> StoreResult<Option<CartEntity>>;
    async fn insert_cart(&mut self, email: &str) -> StoreResult<CartEntity>;
    /// Lines of a cart in the order they were added.
    async fn cart_items(&mut self, cart_id: i32) -> StoreResult<Vec<CartItemEntity>>;
    /// Ids of the carts with a line for the product.
    async fn carts_holding(&mut self, product_id: i32) -> StoreResult<Vec<i32>>;
    async fn upsert_cart_item(&mut self, item: CreateCartItemEntity)
    -> StoreResult<CartItemEntity>;
    async fn delete_cart_item(
        &mut self,
        cart_id: i32,
        product_id: i32,
    ) -> StoreResult<Option<CartItemEntity>>;
    async fn set_cart_total(&mut self, cart_id: i32, total_price: f64) -> StoreResult<CartEntity>;

    // Addresses
    async fn find_address(&mut self, id: i32) -> StoreResult<Option<AddressEntity>>;
    async fn addresses_by_email(&mut self, email: &str) -> StoreResult<Vec<AddressEntity>>;
    async fn insert_address(&mut self, address: CreateAddressEntity) -> StoreResult<AddressEntity>;
    async fn delete_address(&mut self, id: i32) -> StoreResult<Option<AddressEntity>>;

    // Orders
    async fn insert_order(&mut self, order: CreateOrderEntity) -> StoreResult<OrderEntity>;
    async fn insert_payment(&mut self, payment: CreatePaymentEntity) -> StoreResult<PaymentEntity>;
    async fn insert_order_items(
        &mut self,
        items: Vec<CreateOrderItemEntity>,
    ) -> StoreResult<Vec<OrderItemEntity>>;
    async fn find_order(&mut self, id: i32) -> StoreResult<Option<OrderEntity>>;
    /// All orders, or only those of `email` when given.
    async fn list_orders(
        &mut self,
        email: Option<&str>,
        page: &PageRequest<OrderSort>,
    ) -> StoreResult<Page<OrderEntity>>;
    async fn order_items_for(&mut self, order_ids: &[i32]) -> StoreResult<Vec<OrderItemEntity>>;
    async fn payments_for(&mut self, order_ids: &[i32]) -> StoreResult<Vec<PaymentEntity>>;
    async fn set_order_status(&mut self, id: i32, status: &str)
    -> StoreResult<Option<OrderEntity>>;
    async fn count_orders(&mut self) -> StoreResult<i64>;
    async fn total_revenue(&mut self) -> StoreResult<f64>;

    // Stock subscriptions
    async fn find_subscription(
        &mut self,
        product_id: i32,
        email: &str,
    ) -> StoreResult<Option<StockSubscriptionEntity>>;
    async fn insert_subscription(
        &mut self,
        subscription: CreateStockSubscriptionEntity,
    ) -> StoreResult<StockSubscriptionEntity>;
    async fn set_subscriptions_notified(&mut self, ids: &[i32], notified: bool)
    -> StoreResult<usize>;
    /// Subscriptions of a product that have not been notified yet, oldest first.
    async fn pending_subscriptions(
        &mut self,
        product_id: i32,
    ) -> StoreResult<Vec<StockSubscriptionEntity>>;

    // Low-stock alert log
    async fn find_alert_log(&mut self, product_id: i32) -> StoreResult<Option<StockAlertLogEntity>>;
    async fn save_alert_log(&mut self, log: StockAlertLogEntity)
    -> StoreResult<StockAlertLogEntity>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}

/// Ends a transaction according to the outcome of the work done in it:
/// commits on `Ok`, rolls back on `Err` and hands the original error back.
pub async fn finish<T>(tx: Box<dyn StoreTx>, result: Result<T, AppError>) -> Result<T, AppError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}
