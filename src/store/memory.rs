//! In-memory store: id-keyed tables behind a single lock.
//!
//! A transaction takes the lock for its whole lifetime and works on a copy
//! of the tables; commit swaps the copy in, rollback or drop throws it away.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering as AtomicOrdering},
    },
};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

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
};

#[derive(Default, Clone)]
struct Tables {
    sequences: HashMap<&'static str, i32>,
    categories: BTreeMap<i32, CategoryEntity>,
    products: BTreeMap<i32, ProductEntity>,
    product_details: BTreeMap<i32, ProductDetailsEntity>,
    carts: BTreeMap<i32, CartEntity>,
    cart_items: Vec<CartItemEntity>,
    addresses: BTreeMap<i32, AddressEntity>,
    orders: BTreeMap<i32, OrderEntity>,
    order_items: BTreeMap<i32, OrderItemEntity>,
    payments: Vec<PaymentEntity>,
    subscriptions: BTreeMap<i32, StockSubscriptionEntity>,
    alert_logs: BTreeMap<i32, StockAlertLogEntity>,
}

impl Tables {
    fn next_id(&mut self, table: &'static str) -> i32 {
        let seq = self.sequences.entry(table).or_insert(0);
        *seq += 1;
        *seq
    }
}

#[derive(Default, Clone)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    fail_on_stock_update: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `decrement_stock` fail, for exercising rollbacks.
    pub fn set_fail_on_stock_update(&self, fail: bool) {
        self.fail_on_stock_update.store(fail, AtomicOrdering::SeqCst);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let guard = self.tables.clone().lock_owned().await;
        let working = Tables::clone(&guard);
        Ok(Box::new(MemoryTx {
            guard,
            working,
            fail_on_stock_update: self.fail_on_stock_update.load(AtomicOrdering::SeqCst),
        }))
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
    fail_on_stock_update: bool,
}

fn directed(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

fn paginate<T: Clone, S>(rows: Vec<T>, page: &PageRequest<S>) -> Page<T> {
    let total = rows.len() as i64;
    let content = rows
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.page_size as usize)
        .collect();
    Page::new(content, page, total)
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn find_category(&mut self, id: i32) -> StoreResult<Option<CategoryEntity>> {
        Ok(self.working.categories.get(&id).cloned())
    }

    async fn find_category_by_name(&mut self, name: &str) -> StoreResult<Option<CategoryEntity>> {
        Ok(self
            .working
            .categories
            .values()
            .find(|c| c.name == name)
            .cloned())
    }

    async fn find_categories(&mut self, ids: &[i32]) -> StoreResult<Vec<CategoryEntity>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.working.categories.get(id).cloned())
            .collect())
    }

    async fn list_categories(
        &mut self,
        page: &PageRequest<CategorySort>,
    ) -> StoreResult<Page<CategoryEntity>> {
        let mut rows: Vec<CategoryEntity> = self.working.categories.values().cloned().collect();
        rows.sort_by(|a, b| {
            let ordering = match page.sort_by {
                CategorySort::Id => a.id.cmp(&b.id),
                CategorySort::Name => a.name.cmp(&b.name).then(a.id.cmp(&b.id)),
            };
            directed(ordering, page.direction)
        });
        Ok(paginate(rows, page))
    }

    async fn insert_category(&mut self, name: &str) -> StoreResult<CategoryEntity> {
        if self.working.categories.values().any(|c| c.name == name) {
            return Err(StoreError::Conflict(format!("category `{name}` already exists")));
        }
        let id = self.working.next_id("categories");
        let category = CategoryEntity {
            id,
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.working.categories.insert(id, category.clone());
        Ok(category)
    }

    async fn rename_category(
        &mut self,
        id: i32,
        name: &str,
    ) -> StoreResult<Option<CategoryEntity>> {
        if self
            .working
            .categories
            .values()
            .any(|c| c.name == name && c.id != id)
        {
            return Err(StoreError::Conflict(format!("category `{name}` already exists")));
        }
        Ok(self.working.categories.get_mut(&id).map(|category| {
            category.name = name.to_string();
            category.clone()
        }))
    }

    async fn delete_category(&mut self, id: i32) -> StoreResult<Option<CategoryEntity>> {
        if self.working.products.values().any(|p| p.category_id == id) {
            return Err(StoreError::Conflict(format!(
                "category {id} is still referenced by products"
            )));
        }
        Ok(self.working.categories.remove(&id))
    }

    async fn find_product(&mut self, id: i32) -> StoreResult<Option<ProductEntity>> {
        Ok(self.working.products.get(&id).cloned())
    }

    async fn find_products(&mut self, ids: &[i32]) -> StoreResult<Vec<ProductEntity>> {
        Ok(self
            .working
            .products
            .values()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn lock_products(&mut self, ids: &[i32]) -> StoreResult<Vec<ProductEntity>> {
        // The transaction already holds the whole store.
        self.find_products(ids).await
    }

    async fn list_products(
        &mut self,
        filter: &ProductFilter,
        page: &PageRequest<ProductSort>,
    ) -> StoreResult<Page<ProductEntity>> {
        let keyword = filter.keyword.as_ref().map(|k| k.to_lowercase());
        let mut rows: Vec<ProductEntity> = self
            .working
            .products
            .values()
            .filter(|p| filter.category_id.is_none_or(|c| p.category_id == c))
            .filter(|p| {
                keyword
                    .as_ref()
                    .is_none_or(|k| p.name.to_lowercase().contains(k.as_str()))
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            let ordering = match page.sort_by {
                ProductSort::Id => a.id.cmp(&b.id),
                ProductSort::Name => a.name.cmp(&b.name),
                ProductSort::Price => a.price.total_cmp(&b.price),
                ProductSort::SpecialPrice => a.special_price.total_cmp(&b.special_price),
                ProductSort::Quantity => a.quantity.cmp(&b.quantity),
            };
            directed(ordering.then(a.id.cmp(&b.id)), page.direction)
        });
        Ok(paginate(rows, page))
    }

    async fn products_in_category(
        &mut self,
        category_id: Option<i32>,
    ) -> StoreResult<Vec<ProductEntity>> {
        Ok(self
            .working
            .products
            .values()
            .filter(|p| category_id.is_none_or(|c| p.category_id == c))
            .cloned()
            .collect())
    }

    async fn products_at_or_below(&mut self, threshold: i32) -> StoreResult<Vec<ProductEntity>> {
        Ok(self
            .working
            .products
            .values()
            .filter(|p| p.quantity <= threshold)
            .cloned()
            .collect())
    }

    async fn count_products(&mut self) -> StoreResult<i64> {
        Ok(self.working.products.len() as i64)
    }

    async fn insert_product(&mut self, product: CreateProductEntity) -> StoreResult<ProductEntity> {
        if !self.working.categories.contains_key(&product.category_id) {
            return Err(StoreError::Conflict(format!(
                "category {} does not exist",
                product.category_id
            )));
        }
        let id = self.working.next_id("products");
        let now = Utc::now();
        let product = ProductEntity {
            id,
            name: product.name,
            image: product.image,
            description: product.description,
            quantity: product.quantity,
            price: product.price,
            discount: product.discount,
            special_price: product.special_price,
            category_id: product.category_id,
            created_at: now,
            updated_at: now,
        };
        self.working.products.insert(id, product.clone());
        Ok(product)
    }

    async fn update_product(
        &mut self,
        id: i32,
        changes: UpdateProductEntity,
    ) -> StoreResult<Option<ProductEntity>> {
        Ok(self.working.products.get_mut(&id).map(|product| {
            product.name = changes.name;
            if let Some(image) = changes.image {
                product.image = image;
            }
            product.description = changes.description;
            product.quantity = changes.quantity;
            product.price = changes.price;
            product.discount = changes.discount;
            product.special_price = changes.special_price;
            product.category_id = changes.category_id;
            product.updated_at = Utc::now();
            product.clone()
        }))
    }

    async fn decrement_stock(&mut self, id: i32, by: i32) -> StoreResult<Option<ProductEntity>> {
        if self.fail_on_stock_update {
            return Err(StoreError::Database(diesel::result::Error::RollbackTransaction));
        }
        Ok(self.working.products.get_mut(&id).map(|product| {
            product.quantity -= by;
            product.updated_at = Utc::now();
            product.clone()
        }))
    }

    async fn delete_product(&mut self, id: i32) -> StoreResult<Option<ProductEntity>> {
        let removed = self.working.products.remove(&id);
        if removed.is_some() {
            let tables = &mut self.working;
            tables.cart_items.retain(|item| item.product_id != id);
            tables.product_details.retain(|_, d| d.product_id != id);
            tables.subscriptions.retain(|_, s| s.product_id != id);
            tables.alert_logs.remove(&id);
        }
        Ok(removed)
    }

    async fn find_product_details(
        &mut self,
        product_id: i32,
    ) -> StoreResult<Option<ProductDetailsEntity>> {
        Ok(self
            .working
            .product_details
            .values()
            .find(|d| d.product_id == product_id)
            .cloned())
    }

    async fn upsert_product_details(
        &mut self,
        details: UpsertProductDetailsEntity,
    ) -> StoreResult<ProductDetailsEntity> {
        if !self.working.products.contains_key(&details.product_id) {
            return Err(StoreError::Conflict(format!(
                "product {} does not exist",
                details.product_id
            )));
        }
        let existing = self
            .working
            .product_details
            .values()
            .find(|d| d.product_id == details.product_id)
            .map(|d| (d.id, d.expiry_alert_sent_on));
        let (id, expiry_alert_sent_on) = match existing {
            Some(found) => found,
            None => (self.working.next_id("product_details"), None),
        };
        let row = ProductDetailsEntity {
            id,
            product_id: details.product_id,
            ingredients: details.ingredients,
            usage_dosage: details.usage_dosage,
            storage_info: details.storage_info,
            side_effects: details.side_effects,
            expiry_date: details.expiry_date,
            expiry_alert_sent_on,
        };
        self.working.product_details.insert(id, row.clone());
        Ok(row)
    }

    async fn expiring_not_alerted(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
        today: NaiveDate,
    ) -> StoreResult<Vec<ProductDetailsEntity>> {
        let mut rows: Vec<ProductDetailsEntity> = self
            .working
            .product_details
            .values()
            .filter(|d| d.expiry_date.is_some_and(|e| e >= start && e <= end))
            .filter(|d| d.expiry_alert_sent_on != Some(today))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.expiry_date.cmp(&b.expiry_date).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn mark_expiry_alerted(&mut self, ids: &[i32], on: NaiveDate) -> StoreResult<usize> {
        let mut updated = 0;
        for id in ids {
            if let Some(details) = self.working.product_details.get_mut(id) {
                details.expiry_alert_sent_on = Some(on);
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn find_cart_by_email(&mut self, email: &str) -> StoreResult<Option<CartEntity>> {
        Ok(self
            .working
            .carts
            .values()
            .find(|c| c.email == email)
            .cloned())
    }

    async fn insert_cart(&mut self, email: &str) -> StoreResult<CartEntity> {
        if self.working.carts.values().any(|c| c.email == email) {
            return Err(StoreError::Conflict(format!("cart for {email} already exists")));
        }
        let id = self.working.next_id("carts");
        let now = Utc::now();
        let cart = CartEntity {
            id,
            email: email.to_string(),
            total_price: 0.0,
            created_at: now,
            updated_at: now,
        };
        self.working.carts.insert(id, cart.clone());
        Ok(cart)
    }

    async fn cart_items(&mut self, cart_id: i32) -> StoreResult<Vec<CartItemEntity>> {
        Ok(self
            .working
            .cart_items
            .iter()
            .filter(|item| item.cart_id == cart_id)
            .cloned()
            .collect())
    }

    async fn carts_holding(&mut self, product_id: i32) -> StoreResult<Vec<i32>> {
        let mut ids: Vec<i32> = self
            .working
            .cart_items
            .iter()
            .filter(|item| item.product_id == product_id)
            .map(|item| item.cart_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    async fn upsert_cart_item(
        &mut self,
        item: CreateCartItemEntity,
    ) -> StoreResult<CartItemEntity> {
        if !self.working.products.contains_key(&item.product_id) {
            return Err(StoreError::Conflict(format!(
                "product {} does not exist",
                item.product_id
            )));
        }
        if let Some(existing) = self
            .working
            .cart_items
            .iter_mut()
            .find(|i| i.cart_id == item.cart_id && i.product_id == item.product_id)
        {
            existing.quantity = item.quantity;
            existing.product_price = item.product_price;
            existing.discount = item.discount;
            return Ok(existing.clone());
        }
        let row = CartItemEntity {
            cart_id: item.cart_id,
            product_id: item.product_id,
            quantity: item.quantity,
            product_price: item.product_price,
            discount: item.discount,
            created_at: Utc::now(),
        };
        self.working.cart_items.push(row.clone());
        Ok(row)
    }

    async fn delete_cart_item(
        &mut self,
        cart_id: i32,
        product_id: i32,
    ) -> StoreResult<Option<CartItemEntity>> {
        let position = self
            .working
            .cart_items
            .iter()
            .position(|i| i.cart_id == cart_id && i.product_id == product_id);
        Ok(position.map(|index| self.working.cart_items.remove(index)))
    }

    async fn set_cart_total(&mut self, cart_id: i32, total_price: f64) -> StoreResult<CartEntity> {
        let cart = self
            .working
            .carts
            .get_mut(&cart_id)
            .ok_or(StoreError::Database(diesel::result::Error::NotFound))?;
        cart.total_price = total_price;
        cart.updated_at = Utc::now();
        Ok(cart.clone())
    }

    async fn find_address(&mut self, id: i32) -> StoreResult<Option<AddressEntity>> {
        Ok(self.working.addresses.get(&id).cloned())
    }

    async fn addresses_by_email(&mut self, email: &str) -> StoreResult<Vec<AddressEntity>> {
        Ok(self
            .working
            .addresses
            .values()
            .filter(|a| a.email == email)
            .cloned()
            .collect())
    }

    async fn insert_address(&mut self, address: CreateAddressEntity) -> StoreResult<AddressEntity> {
        let id = self.working.next_id("addresses");
        let row = AddressEntity {
            id,
            email: address.email,
            street: address.street,
            building_name: address.building_name,
            city: address.city,
            state: address.state,
            country: address.country,
            postal_code: address.postal_code,
            created_at: Utc::now(),
        };
        self.working.addresses.insert(id, row.clone());
        Ok(row)
    }

    async fn delete_address(&mut self, id: i32) -> StoreResult<Option<AddressEntity>> {
        if self.working.orders.values().any(|o| o.address_id == id) {
            return Err(StoreError::Conflict(format!(
                "address {id} is referenced by orders"
            )));
        }
        Ok(self.working.addresses.remove(&id))
    }

    async fn insert_order(&mut self, order: CreateOrderEntity) -> StoreResult<OrderEntity> {
        if !self.working.addresses.contains_key(&order.address_id) {
            return Err(StoreError::Conflict(format!(
                "address {} does not exist",
                order.address_id
            )));
        }
        let id = self.working.next_id("orders");
        let now = Utc::now();
        let row = OrderEntity {
            id,
            email: order.email,
            order_date: order.order_date,
            total_amount: order.total_amount,
            status: order.status,
            address_id: order.address_id,
            created_at: now,
            updated_at: now,
        };
        self.working.orders.insert(id, row.clone());
        Ok(row)
    }

    async fn insert_payment(&mut self, payment: CreatePaymentEntity) -> StoreResult<PaymentEntity> {
        if self.working.payments.iter().any(|p| p.order_id == payment.order_id) {
            return Err(StoreError::Conflict(format!(
                "order {} already has a payment",
                payment.order_id
            )));
        }
        let row = PaymentEntity {
            id: Uuid::new_v4(),
            order_id: payment.order_id,
            method: payment.method,
            pg_name: payment.pg_name,
            pg_payment_id: payment.pg_payment_id,
            pg_status: payment.pg_status,
            pg_response_message: payment.pg_response_message,
            created_at: Utc::now(),
        };
        self.working.payments.push(row.clone());
        Ok(row)
    }

    async fn insert_order_items(
        &mut self,
        items: Vec<CreateOrderItemEntity>,
    ) -> StoreResult<Vec<OrderItemEntity>> {
        let mut rows = Vec::with_capacity(items.len());
        for item in items {
            let id = self.working.next_id("order_items");
            let row = OrderItemEntity {
                id,
                order_id: item.order_id,
                product_id: item.product_id,
                quantity: item.quantity,
                discount: item.discount,
                ordered_product_price: item.ordered_product_price,
            };
            self.working.order_items.insert(id, row.clone());
            rows.push(row);
        }
        Ok(rows)
    }

    async fn find_order(&mut self, id: i32) -> StoreResult<Option<OrderEntity>> {
        Ok(self.working.orders.get(&id).cloned())
    }

    async fn list_orders(
        &mut self,
        email: Option<&str>,
        page: &PageRequest<OrderSort>,
    ) -> StoreResult<Page<OrderEntity>> {
        let mut rows: Vec<OrderEntity> = self
            .working
            .orders
            .values()
            .filter(|o| email.is_none_or(|e| o.email == e))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            let ordering = match page.sort_by {
                OrderSort::Id => a.id.cmp(&b.id),
                OrderSort::Date => a.order_date.cmp(&b.order_date),
                OrderSort::TotalAmount => a.total_amount.total_cmp(&b.total_amount),
                OrderSort::Email => a.email.cmp(&b.email),
                OrderSort::Status => a.status.cmp(&b.status),
            };
            directed(ordering.then(a.id.cmp(&b.id)), page.direction)
        });
        Ok(paginate(rows, page))
    }

    async fn order_items_for(&mut self, order_ids: &[i32]) -> StoreResult<Vec<OrderItemEntity>> {
        Ok(self
            .working
            .order_items
            .values()
            .filter(|item| order_ids.contains(&item.order_id))
            .cloned()
            .collect())
    }

    async fn payments_for(&mut self, order_ids: &[i32]) -> StoreResult<Vec<PaymentEntity>> {
        Ok(self
            .working
            .payments
            .iter()
            .filter(|p| order_ids.contains(&p.order_id))
            .cloned()
            .collect())
    }

    async fn set_order_status(
        &mut self,
        id: i32,
        status: &str,
    ) -> StoreResult<Option<OrderEntity>> {
        Ok(self.working.orders.get_mut(&id).map(|order| {
            order.status = status.to_string();
            order.updated_at = Utc::now();
            order.clone()
        }))
    }

    async fn count_orders(&mut self) -> StoreResult<i64> {
        Ok(self.working.orders.len() as i64)
    }

    async fn total_revenue(&mut self) -> StoreResult<f64> {
        Ok(self.working.orders.values().map(|o| o.total_amount).sum())
    }

    async fn find_subscription(
        &mut self,
        product_id: i32,
        email: &str,
    ) -> StoreResult<Option<StockSubscriptionEntity>> {
        Ok(self
            .working
            .subscriptions
            .values()
            .find(|s| s.product_id == product_id && s.email == email)
            .cloned())
    }

    async fn insert_subscription(
        &mut self,
        subscription: CreateStockSubscriptionEntity,
    ) -> StoreResult<StockSubscriptionEntity> {
        if self
            .working
            .subscriptions
            .values()
            .any(|s| s.product_id == subscription.product_id && s.email == subscription.email)
        {
            return Err(StoreError::Conflict(format!(
                "{} is already subscribed to product {}",
                subscription.email, subscription.product_id
            )));
        }
        let id = self.working.next_id("stock_subscriptions");
        let row = StockSubscriptionEntity {
            id,
            product_id: subscription.product_id,
            email: subscription.email,
            notified: subscription.notified,
            created_at: Utc::now(),
        };
        self.working.subscriptions.insert(id, row.clone());
        Ok(row)
    }

    async fn set_subscriptions_notified(
        &mut self,
        ids: &[i32],
        notified: bool,
    ) -> StoreResult<usize> {
        let mut updated = 0;
        for id in ids {
            if let Some(subscription) = self.working.subscriptions.get_mut(id) {
                subscription.notified = notified;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn pending_subscriptions(
        &mut self,
        product_id: i32,
    ) -> StoreResult<Vec<StockSubscriptionEntity>> {
        Ok(self
            .working
            .subscriptions
            .values()
            .filter(|s| s.product_id == product_id && !s.notified)
            .cloned()
            .collect())
    }

    async fn find_alert_log(&mut self, product_id: i32) -> StoreResult<Option<StockAlertLogEntity>> {
        Ok(self.working.alert_logs.get(&product_id).cloned())
    }

    async fn save_alert_log(
        &mut self,
        log: StockAlertLogEntity,
    ) -> StoreResult<StockAlertLogEntity> {
        self.working.alert_logs.insert(log.product_id, log.clone());
        Ok(log)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTx {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn category(store: &MemoryStore, name: &str) -> CategoryEntity {
        let mut tx = store.begin().await.unwrap();
        let category = tx.insert_category(name).await.unwrap();
        tx.commit().await.unwrap();
        category
    }

    #[tokio::test]
    async fn rollback_discards_writes() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_category("Dermatology").await.unwrap();
        tx.rollback().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert!(tx.find_category_by_name("Dermatology").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn dropped_transaction_releases_the_lock() {
        let store = MemoryStore::new();
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_category("Eye care").await.unwrap();
        }
        let mut tx = store.begin().await.unwrap();
        assert!(tx.find_category_by_name("Eye care").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unique_names_and_references_conflict() {
        let store = MemoryStore::new();
        let cold = category(&store, "Cold & flu").await;

        let mut tx = store.begin().await.unwrap();
        assert!(matches!(
            tx.insert_category("Cold & flu").await,
            Err(StoreError::Conflict(_))
        ));
        tx.insert_product(CreateProductEntity {
            name: "Lozenges".to_string(),
            image: "default.png".to_string(),
            description: String::new(),
            quantity: 4,
            price: 2.0,
            discount: 0.0,
            special_price: 2.0,
            category_id: cold.id,
        })
        .await
        .unwrap();
        assert!(matches!(
            tx.delete_category(cold.id).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn keyword_filter_ignores_case() {
        let store = MemoryStore::new();
        let cat = category(&store, "Pain relief").await;
        let mut tx = store.begin().await.unwrap();
        for name in ["Aspirin", "Paracetamol", "aspirin junior"] {
            tx.insert_product(CreateProductEntity {
                name: name.to_string(),
                image: "default.png".to_string(),
                description: String::new(),
                quantity: 1,
                price: 1.0,
                discount: 0.0,
                special_price: 1.0,
                category_id: cat.id,
            })
            .await
            .unwrap();
        }

        let filter = ProductFilter {
            keyword: Some("ASPIRIN".to_string()),
            ..Default::default()
        };
        let page = PageRequest::new(0, 10, ProductSort::Name, SortDirection::Asc);
        let found = tx.list_products(&filter, &page).await.unwrap();
        assert_eq!(found.total_elements, 2);
        assert_eq!(found.content[0].name, "Aspirin");
    }
}
