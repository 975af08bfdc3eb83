//! Postgres store on `diesel-async` with a bb8 pool.
//!
//! Each [`PgTx`] owns one pooled connection with an open transaction. A
//! connection dropped mid-transaction is reported broken to the pool and
//! discarded, so the server rolls the transaction back.

use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::{
    BoolExpressionMethods, ExpressionMethods, OptionalExtension, PgTextExpressionMethods,
    QueryDsl, SelectableHelper,
    result::{DatabaseErrorKind, Error as DieselError},
};
use diesel_async::{
    AnsiTransactionManager, AsyncPgConnection, RunQueryDsl, TransactionManager,
    pooled_connection::{
        AsyncDieselConnectionManager,
        bb8::{Pool, PooledConnection},
    },
};

use super::{ProductFilter, Store, StoreError, StoreResult, StoreTx};
use crate::{
    models::{
        AddressEntity, CartEntity, CartItemEntity, CategoryEntity, CreateAddressEntity,
        CreateCartItemEntity, CreateOrderEntity, CreateOrderItemEntity, CreatePaymentEntity,
        CreateProductEntity, CreateStockSubscriptionEntity, OrderEntity, OrderItemEntity,
        PaymentEntity, ProductDetailsEntity, ProductEntity, StockAlertLogEntity,
        StockSubscriptionEntity, UpdateProductEntity, UpsertProductDetailsEntity,
    },
    paging::{CategorySort, OrderSort, Page, PageRequest, ProductSort, SortDirection},
    schema::{
        addresses, cart_items, carts, categories, order_items, orders, payments,
        product_details, products, stock_alert_logs, stock_subscriptions,
    },
};

/// Orders a boxed query by `$column` in `$direction`, breaking ties on `$tie`.
macro_rules! sorted {
    ($query:expr, $direction:expr, $column:expr, $tie:expr) => {
        match $direction {
            SortDirection::Asc => $query.order_by(($column.asc(), $tie.asc())),
            SortDirection::Desc => $query.order_by(($column.desc(), $tie.desc())),
        }
    };
}

#[derive(Clone)]
pub struct PgStore {
    pool: Pool<AsyncPgConnection>,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
        let pool = Pool::builder()
            .max_size(max_connections)
            .build(manager)
            .await
            .context("Failed to build the DB connection pool")?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let mut conn = self
            .pool
            .get_owned()
            .await
            .map_err(|e| StoreError::Pool(e.to_string()))?;
        AnsiTransactionManager::begin_transaction(&mut *conn).await?;
        Ok(Box::new(PgTx { conn }))
    }
}

pub struct PgTx {
    conn: PooledConnection<'static, AsyncPgConnection>,
}

impl PgTx {
    fn conn(&mut self) -> &mut AsyncPgConnection {
        &mut self.conn
    }
}

/// Constraint violations become `Conflict`; everything else stays a database error.
fn constraint(err: DieselError) -> StoreError {
    match err {
        DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation | DatabaseErrorKind::ForeignKeyViolation,
            info,
        ) => StoreError::Conflict(info.message().to_string()),
        other => StoreError::Database(other),
    }
}

fn like_pattern(keyword: &str) -> String {
    let escaped = keyword
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait]
impl StoreTx for PgTx {
    async fn find_category(&mut self, id: i32) -> StoreResult<Option<CategoryEntity>> {
        Ok(categories::table
            .find(id)
            .select(CategoryEntity::as_select())
            .first(self.conn())
            .await
            .optional()?)
    }

    async fn find_category_by_name(&mut self, name: &str) -> StoreResult<Option<CategoryEntity>> {
        Ok(categories::table
            .filter(categories::name.eq(name))
            .select(CategoryEntity::as_select())
            .first(self.conn())
            .await
            .optional()?)
    }

    async fn find_categories(&mut self, ids: &[i32]) -> StoreResult<Vec<CategoryEntity>> {
        Ok(categories::table
            .filter(categories::id.eq_any(ids))
            .select(CategoryEntity::as_select())
            .load(self.conn())
            .await?)
    }

    async fn list_categories(
        &mut self,
        page: &PageRequest<CategorySort>,
    ) -> StoreResult<Page<CategoryEntity>> {
        let total: i64 = categories::table.count().get_result(self.conn()).await?;

        let query = categories::table
            .select(CategoryEntity::as_select())
            .into_boxed();
        let query = match page.sort_by {
            CategorySort::Id => sorted!(query, page.direction, categories::id, categories::id),
            CategorySort::Name => sorted!(query, page.direction, categories::name, categories::id),
        };
        let content = query
            .offset(page.offset())
            .limit(page.page_size)
            .load(self.conn())
            .await?;

        Ok(Page::new(content, page, total))
    }

    async fn insert_category(&mut self, name: &str) -> StoreResult<CategoryEntity> {
        diesel::insert_into(categories::table)
            .values(categories::name.eq(name))
            .returning(CategoryEntity::as_returning())
            .get_result(self.conn())
            .await
            .map_err(constraint)
    }

    async fn rename_category(
        &mut self,
        id: i32,
        name: &str,
    ) -> StoreResult<Option<CategoryEntity>> {
        diesel::update(categories::table.find(id))
            .set(categories::name.eq(name))
            .returning(CategoryEntity::as_returning())
            .get_result(self.conn())
            .await
            .optional()
            .map_err(constraint)
    }

    async fn delete_category(&mut self, id: i32) -> StoreResult<Option<CategoryEntity>> {
        diesel::delete(categories::table.find(id))
            .returning(CategoryEntity::as_returning())
            .get_result(self.conn())
            .await
            .optional()
            .map_err(constraint)
    }

    async fn find_product(&mut self, id: i32) -> StoreResult<Option<ProductEntity>> {
        Ok(products::table
            .find(id)
            .select(ProductEntity::as_select())
            .first(self.conn())
            .await
            .optional()?)
    }

    async fn find_products(&mut self, ids: &[i32]) -> StoreResult<Vec<ProductEntity>> {
        Ok(products::table
            .filter(products::id.eq_any(ids))
            .order_by(products::id.asc())
            .select(ProductEntity::as_select())
            .load(self.conn())
            .await?)
    }

    async fn lock_products(&mut self, ids: &[i32]) -> StoreResult<Vec<ProductEntity>> {
        Ok(products::table
            .filter(products::id.eq_any(ids))
            .order_by(products::id.asc())
            .select(ProductEntity::as_select())
            .for_update()
            .load(self.conn())
            .await?)
    }

    async fn list_products(
        &mut self,
        filter: &ProductFilter,
        page: &PageRequest<ProductSort>,
    ) -> StoreResult<Page<ProductEntity>> {
        let mut count = products::table.count().into_boxed();
        let mut query = products::table
            .select(ProductEntity::as_select())
            .into_boxed();

        if let Some(category_id) = filter.category_id {
            count = count.filter(products::category_id.eq(category_id));
            query = query.filter(products::category_id.eq(category_id));
        }
        if let Some(keyword) = &filter.keyword {
            let pattern = like_pattern(keyword);
            count = count.filter(products::name.ilike(pattern.clone()));
            query = query.filter(products::name.ilike(pattern));
        }

        let total: i64 = count.get_result(self.conn()).await?;
        let query = match page.sort_by {
            ProductSort::Id => sorted!(query, page.direction, products::id, products::id),
            ProductSort::Name => sorted!(query, page.direction, products::name, products::id),
            ProductSort::Price => sorted!(query, page.direction, products::price, products::id),
            ProductSort::SpecialPrice => {
                sorted!(query, page.direction, products::special_price, products::id)
            }
            ProductSort::Quantity => {
                sorted!(query, page.direction, products::quantity, products::id)
            }
        };
        let content = query
            .offset(page.offset())
            .limit(page.page_size)
            .load(self.conn())
            .await?;

        Ok(Page::new(content, page, total))
    }

    async fn products_in_category(
        &mut self,
        category_id: Option<i32>,
    ) -> StoreResult<Vec<ProductEntity>> {
        let mut query = products::table
            .select(ProductEntity::as_select())
            .order_by(products::id.asc())
            .into_boxed();
        if let Some(category_id) = category_id {
            query = query.filter(products::category_id.eq(category_id));
        }
        Ok(query.load(self.conn()).await?)
    }

    async fn products_at_or_below(&mut self, threshold: i32) -> StoreResult<Vec<ProductEntity>> {
        Ok(products::table
            .filter(products::quantity.le(threshold))
            .order_by(products::id.asc())
            .select(ProductEntity::as_select())
            .load(self.conn())
            .await?)
    }

    async fn count_products(&mut self) -> StoreResult<i64> {
        Ok(products::table.count().get_result(self.conn()).await?)
    }

    async fn insert_product(&mut self, product: CreateProductEntity) -> StoreResult<ProductEntity> {
        diesel::insert_into(products::table)
            .values(product)
            .returning(ProductEntity::as_returning())
            .get_result(self.conn())
            .await
            .map_err(constraint)
    }

    async fn update_product(
        &mut self,
        id: i32,
        changes: UpdateProductEntity,
    ) -> StoreResult<Option<ProductEntity>> {
        diesel::update(products::table.find(id))
            .set((changes, products::updated_at.eq(diesel::dsl::now)))
            .returning(ProductEntity::as_returning())
            .get_result(self.conn())
            .await
            .optional()
            .map_err(constraint)
    }

    async fn decrement_stock(&mut self, id: i32, by: i32) -> StoreResult<Option<ProductEntity>> {
        Ok(diesel::update(products::table.find(id))
            .set((
                products::quantity.eq(products::quantity - by),
                products::updated_at.eq(diesel::dsl::now),
            ))
            .returning(ProductEntity::as_returning())
            .get_result(self.conn())
            .await
            .optional()?)
    }

    async fn delete_product(&mut self, id: i32) -> StoreResult<Option<ProductEntity>> {
        diesel::delete(products::table.find(id))
            .returning(ProductEntity::as_returning())
            .get_result(self.conn())
            .await
            .optional()
            .map_err(constraint)
    }

    async fn find_product_details(
        &mut self,
        product_id: i32,
    ) -> StoreResult<Option<ProductDetailsEntity>> {
        Ok(product_details::table
            .filter(product_details::product_id.eq(product_id))
            .select(ProductDetailsEntity::as_select())
            .first(self.conn())
            .await
            .optional()?)
    }

    async fn upsert_product_details(
        &mut self,
        details: UpsertProductDetailsEntity,
    ) -> StoreResult<ProductDetailsEntity> {
        diesel::insert_into(product_details::table)
            .values(&details)
            .on_conflict(product_details::product_id)
            .do_update()
            .set(&details)
            .returning(ProductDetailsEntity::as_returning())
            .get_result(self.conn())
            .await
            .map_err(constraint)
    }

    async fn expiring_not_alerted(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
        today: NaiveDate,
    ) -> StoreResult<Vec<ProductDetailsEntity>> {
        Ok(product_details::table
            .filter(product_details::expiry_date.between(start, end))
            .filter(
                product_details::expiry_alert_sent_on
                    .is_null()
                    .or(product_details::expiry_alert_sent_on.ne(today)),
            )
            .order_by((
                product_details::expiry_date.asc(),
                product_details::id.asc(),
            ))
            .select(ProductDetailsEntity::as_select())
            .load(self.conn())
            .await?)
    }

    async fn mark_expiry_alerted(&mut self, ids: &[i32], on: NaiveDate) -> StoreResult<usize> {
        Ok(
            diesel::update(product_details::table.filter(product_details::id.eq_any(ids)))
                .set(product_details::expiry_alert_sent_on.eq(on))
                .execute(self.conn())
                .await?,
        )
    }

    async fn find_cart_by_email(&mut self, email: &str) -> StoreResult<Option<CartEntity>> {
        Ok(carts::table
            .filter(carts::email.eq(email))
            .select(CartEntity::as_select())
            .first(self.conn())
            .await
            .optional()?)
    }

    async fn insert_cart(&mut self, email: &str) -> StoreResult<CartEntity> {
        diesel::insert_into(carts::table)
            .values(carts::email.eq(email))
            .returning(CartEntity::as_returning())
            .get_result(self.conn())
            .await
            .map_err(constraint)
    }

    async fn cart_items(&mut self, cart_id: i32) -> StoreResult<Vec<CartItemEntity>> {
        Ok(cart_items::table
            .filter(cart_items::cart_id.eq(cart_id))
            .order_by((cart_items::created_at.asc(), cart_items::product_id.asc()))
            .select(CartItemEntity::as_select())
            .load(self.conn())
            .await?)
    }

    async fn carts_holding(&mut self, product_id: i32) -> StoreResult<Vec<i32>> {
        Ok(cart_items::table
            .filter(cart_items::product_id.eq(product_id))
            .select(cart_items::cart_id)
            .order_by(cart_items::cart_id.asc())
            .load(self.conn())
            .await?)
    }

    async fn upsert_cart_item(
        &mut self,
        item: CreateCartItemEntity,
    ) -> StoreResult<CartItemEntity> {
        diesel::insert_into(cart_items::table)
            .values(&item)
            .on_conflict((cart_items::cart_id, cart_items::product_id))
            .do_update()
            .set((
                cart_items::quantity.eq(item.quantity),
                cart_items::product_price.eq(item.product_price),
                cart_items::discount.eq(item.discount),
            ))
            .returning(CartItemEntity::as_returning())
            .get_result(self.conn())
            .await
            .map_err(constraint)
    }

    async fn delete_cart_item(
        &mut self,
        cart_id: i32,
        product_id: i32,
    ) -> StoreResult<Option<CartItemEntity>> {
        Ok(diesel::delete(cart_items::table.find((cart_id, product_id)))
            .returning(CartItemEntity::as_returning())
            .get_result(self.conn())
            .await
            .optional()?)
    }

    async fn set_cart_total(&mut self, cart_id: i32, total_price: f64) -> StoreResult<CartEntity> {
        Ok(diesel::update(carts::table.find(cart_id))
            .set((
                carts::total_price.eq(total_price),
                carts::updated_at.eq(diesel::dsl::now),
            ))
            .returning(CartEntity::as_returning())
            .get_result(self.conn())
            .await?)
    }

    async fn find_address(&mut self, id: i32) -> StoreResult<Option<AddressEntity>> {
        Ok(addresses::table
            .find(id)
            .select(AddressEntity::as_select())
            .first(self.conn())
            .await
            .optional()?)
    }

    async fn addresses_by_email(&mut self, email: &str) -> StoreResult<Vec<AddressEntity>> {
        Ok(addresses::table
            .filter(addresses::email.eq(email))
            .order_by(addresses::id.asc())
            .select(AddressEntity::as_select())
            .load(self.conn())
            .await?)
    }

    async fn insert_address(&mut self, address: CreateAddressEntity) -> StoreResult<AddressEntity> {
        Ok(diesel::insert_into(addresses::table)
            .values(address)
            .returning(AddressEntity::as_returning())
            .get_result(self.conn())
            .await?)
    }

    async fn delete_address(&mut self, id: i32) -> StoreResult<Option<AddressEntity>> {
        diesel::delete(addresses::table.find(id))
            .returning(AddressEntity::as_returning())
            .get_result(self.conn())
            .await
            .optional()
            .map_err(constraint)
    }

    async fn insert_order(&mut self, order: CreateOrderEntity) -> StoreResult<OrderEntity> {
        diesel::insert_into(orders::table)
            .values(order)
            .returning(OrderEntity::as_returning())
            .get_result(self.conn())
            .await
            .map_err(constraint)
    }

    async fn insert_payment(&mut self, payment: CreatePaymentEntity) -> StoreResult<PaymentEntity> {
        diesel::insert_into(payments::table)
            .values(payment)
            .returning(PaymentEntity::as_returning())
            .get_result(self.conn())
            .await
            .map_err(constraint)
    }

    async fn insert_order_items(
        &mut self,
        items: Vec<CreateOrderItemEntity>,
    ) -> StoreResult<Vec<OrderItemEntity>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        diesel::insert_into(order_items::table)
            .values(&items)
            .returning(OrderItemEntity::as_returning())
            .get_results(self.conn())
            .await
            .map_err(constraint)
    }

    async fn find_order(&mut self, id: i32) -> StoreResult<Option<OrderEntity>> {
        Ok(orders::table
            .find(id)
            .select(OrderEntity::as_select())
            .first(self.conn())
            .await
            .optional()?)
    }

    async fn list_orders(
        &mut self,
        email: Option<&str>,
        page: &PageRequest<OrderSort>,
    ) -> StoreResult<Page<OrderEntity>> {
        let mut count = orders::table.count().into_boxed();
        let mut query = orders::table.select(OrderEntity::as_select()).into_boxed();
        if let Some(email) = email {
            count = count.filter(orders::email.eq(email));
            query = query.filter(orders::email.eq(email));
        }

        let total: i64 = count.get_result(self.conn()).await?;
        let query = match page.sort_by {
            OrderSort::Id => sorted!(query, page.direction, orders::id, orders::id),
            OrderSort::Date => sorted!(query, page.direction, orders::order_date, orders::id),
            OrderSort::TotalAmount => {
                sorted!(query, page.direction, orders::total_amount, orders::id)
            }
            OrderSort::Email => sorted!(query, page.direction, orders::email, orders::id),
            OrderSort::Status => sorted!(query, page.direction, orders::status, orders::id),
        };
        let content = query
            .offset(page.offset())
            .limit(page.page_size)
            .load(self.conn())
            .await?;

        Ok(Page::new(content, page, total))
    }

    async fn order_items_for(&mut self, order_ids: &[i32]) -> StoreResult<Vec<OrderItemEntity>> {
        Ok(order_items::table
            .filter(order_items::order_id.eq_any(order_ids))
            .order_by(order_items::id.asc())
            .select(OrderItemEntity::as_select())
            .load(self.conn())
            .await?)
    }

    async fn payments_for(&mut self, order_ids: &[i32]) -> StoreResult<Vec<PaymentEntity>> {
        Ok(payments::table
            .filter(payments::order_id.eq_any(order_ids))
            .select(PaymentEntity::as_select())
            .load(self.conn())
            .await?)
    }

    async fn set_order_status(
        &mut self,
        id: i32,
        status: &str,
    ) -> StoreResult<Option<OrderEntity>> {
        Ok(diesel::update(orders::table.find(id))
            .set((
                orders::status.eq(status),
                orders::updated_at.eq(diesel::dsl::now),
            ))
            .returning(OrderEntity::as_returning())
            .get_result(self.conn())
            .await
            .optional()?)
    }

    async fn count_orders(&mut self) -> StoreResult<i64> {
        Ok(orders::table.count().get_result(self.conn()).await?)
    }

    async fn total_revenue(&mut self) -> StoreResult<f64> {
        let total: Option<f64> = orders::table
            .select(diesel::dsl::sum(orders::total_amount))
            .get_result(self.conn())
            .await?;
        Ok(total.unwrap_or(0.0))
    }

    async fn find_subscription(
        &mut self,
        product_id: i32,
        email: &str,
    ) -> StoreResult<Option<StockSubscriptionEntity>> {
        Ok(stock_subscriptions::table
            .filter(stock_subscriptions::product_id.eq(product_id))
            .filter(stock_subscriptions::email.eq(email))
            .select(StockSubscriptionEntity::as_select())
            .first(self.conn())
            .await
            .optional()?)
    }

    async fn insert_subscription(
        &mut self,
        subscription: CreateStockSubscriptionEntity,
    ) -> StoreResult<StockSubscriptionEntity> {
        diesel::insert_into(stock_subscriptions::table)
            .values(subscription)
            .returning(StockSubscriptionEntity::as_returning())
            .get_result(self.conn())
            .await
            .map_err(constraint)
    }

    async fn set_subscriptions_notified(
        &mut self,
        ids: &[i32],
        notified: bool,
    ) -> StoreResult<usize> {
        Ok(diesel::update(
            stock_subscriptions::table.filter(stock_subscriptions::id.eq_any(ids)),
        )
        .set(stock_subscriptions::notified.eq(notified))
        .execute(self.conn())
        .await?)
    }

    async fn pending_subscriptions(
        &mut self,
        product_id: i32,
    ) -> StoreResult<Vec<StockSubscriptionEntity>> {
        Ok(stock_subscriptions::table
            .filter(stock_subscriptions::product_id.eq(product_id))
            .filter(stock_subscriptions::notified.eq(false))
            .order_by((
                stock_subscriptions::created_at.asc(),
                stock_subscriptions::id.asc(),
            ))
            .select(StockSubscriptionEntity::as_select())
            .load(self.conn())
            .await?)
    }

    async fn find_alert_log(&mut self, product_id: i32) -> StoreResult<Option<StockAlertLogEntity>> {
        Ok(stock_alert_logs::table
            .find(product_id)
            .select(StockAlertLogEntity::as_select())
            .first(self.conn())
            .await
            .optional()?)
    }

    async fn save_alert_log(
        &mut self,
        log: StockAlertLogEntity,
    ) -> StoreResult<StockAlertLogEntity> {
        diesel::insert_into(stock_alert_logs::table)
            .values(&log)
            .on_conflict(stock_alert_logs::product_id)
            .do_update()
            .set((
                stock_alert_logs::last_alert_at.eq(log.last_alert_at),
                stock_alert_logs::last_quantity.eq(log.last_quantity),
            ))
            .returning(StockAlertLogEntity::as_returning())
            .get_result(self.conn())
            .await
            .map_err(constraint)
    }

    async fn commit(mut self: Box<Self>) -> StoreResult<()> {
        AnsiTransactionManager::commit_transaction(self.conn()).await?;
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> StoreResult<()> {
        AnsiTransactionManager::rollback_transaction(self.conn()).await?;
        Ok(())
    }
}
