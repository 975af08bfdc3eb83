//! Order placement plus the customer and admin order views.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    app_error::AppError,
    config::OrderConfig,
    models::{
        CreateOrderEntity, CreateOrderItemEntity, CreatePaymentEntity, OrderEntity,
        OrderItemEntity, PaymentEntity,
    },
    paging::{OrderSort, Page, PageRequest},
    store::{Store, StoreTx, finish},
};

pub const INITIAL_ORDER_STATUS: &str = "Order Accepted !";

/// Payment gateway outcome reported by the client at checkout.
#[derive(Deserialize, Debug, Clone, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrder {
    pub address_id: i32,
    #[serde(default)]
    pub payment_method: String,
    pub pg_name: Option<String>,
    pub pg_payment_id: Option<String>,
    pub pg_status: Option<String>,
    pub pg_response_message: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub order: OrderEntity,
    pub items: Vec<OrderItemEntity>,
    pub payment: Option<PaymentEntity>,
    pub address_id: i32,
}

#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrderSummary {
    pub order_id: i32,
    pub email: String,
    pub order_date: NaiveDate,
    pub order_status: String,
    pub total_amount: f64,
}

impl From<OrderEntity> for AdminOrderSummary {
    fn from(order: OrderEntity) -> Self {
        Self {
            order_id: order.id,
            email: order.email,
            order_date: order.order_date,
            order_status: order.status,
            total_amount: order.total_amount,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrderDetails {
    pub order_id: i32,
    pub email: String,
    pub order_date: NaiveDate,
    pub order_status: String,
    pub total_amount: f64,
    pub address_id: i32,
    pub items: Vec<AdminOrderItem>,
}

#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrderItem {
    pub order_item_id: i32,
    pub product_id: i32,
    /// `Unknown` once the product has been deleted.
    pub product_name: String,
    pub product_image: Option<String>,
    pub quantity: i32,
    pub discount: f64,
    pub ordered_product_price: f64,
    pub special_price: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub product_count: i64,
    pub total_orders: i64,
    pub total_revenue: f64,
}

/// Turns the customer's cart into an order in a single transaction.
pub async fn place_order(
    store: &dyn Store,
    policy: &OrderConfig,
    email: &str,
    request: PlaceOrder,
) -> Result<OrderView, AppError> {
    let mut tx = store.begin().await?;
    let result = place_order_in(&mut *tx, policy, email, request).await;
    let order = finish(tx, result).await?;

    tracing::info!(
        order_id = order.order.id,
        email,
        items = order.items.len(),
        total = order.order.total_amount,
        "Order placed"
    );
    Ok(order)
}

async fn place_order_in(
    tx: &mut dyn StoreTx,
    policy: &OrderConfig,
    email: &str,
    request: PlaceOrder,
) -> Result<OrderView, AppError> {
    let cart = tx
        .find_cart_by_email(email)
        .await?
        .ok_or_else(|| AppError::not_found("Cart", "email", email))?;

    let lines = tx.cart_items(cart.id).await?;
    if lines.is_empty() {
        return Err(AppError::BusinessRule("Cart is empty".to_string()));
    }

    let address = tx
        .find_address(request.address_id)
        .await?
        .filter(|address| address.email == email)
        .ok_or_else(|| AppError::not_found("Address", "addressId", request.address_id))?;

    if !policy.allow_oversell {
        let product_ids: Vec<i32> = lines.iter().map(|line| line.product_id).collect();
        let stock: HashMap<i32, i32> = tx
            .lock_products(&product_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p.quantity))
            .collect();
        for line in &lines {
            let available = stock
                .get(&line.product_id)
                .copied()
                .ok_or_else(|| AppError::not_found("Product", "productId", line.product_id))?;
            if available < line.quantity {
                return Err(AppError::BusinessRule(format!(
                    "insufficient stock for product {}",
                    line.product_id
                )));
            }
        }
    }

    let order = tx
        .insert_order(CreateOrderEntity {
            email: email.to_string(),
            order_date: Utc::now().date_naive(),
            total_amount: cart.total_price,
            status: INITIAL_ORDER_STATUS.to_string(),
            address_id: address.id,
        })
        .await?;

    let payment = tx
        .insert_payment(CreatePaymentEntity {
            order_id: order.id,
            method: request.payment_method,
            pg_name: request.pg_name,
            pg_payment_id: request.pg_payment_id,
            pg_status: request.pg_status,
            pg_response_message: request.pg_response_message,
        })
        .await?;

    let items = tx
        .insert_order_items(
            lines
                .iter()
                .map(|line| CreateOrderItemEntity {
                    order_id: order.id,
                    product_id: line.product_id,
                    quantity: line.quantity,
                    discount: line.discount,
                    ordered_product_price: line.product_price,
                })
                .collect(),
        )
        .await?;

    for line in &lines {
        tx.decrement_stock(line.product_id, line.quantity)
            .await?
            .ok_or_else(|| AppError::not_found("Product", "productId", line.product_id))?;
        tx.delete_cart_item(cart.id, line.product_id).await?;
    }
    tx.set_cart_total(cart.id, 0.0).await?;

    Ok(OrderView {
        address_id: order.address_id,
        order,
        items,
        payment: Some(payment),
    })
}

/// Orders of one customer with their lines and payment.
pub async fn my_orders(
    store: &dyn Store,
    email: &str,
    page: &PageRequest<OrderSort>,
) -> Result<Page<OrderView>, AppError> {
    let mut tx = store.begin().await?;
    let result = async {
        let orders = tx.list_orders(Some(email), page).await?;
        attach_details(&mut *tx, orders).await
    }
    .await;
    finish(tx, result).await
}

pub async fn list_orders(
    store: &dyn Store,
    page: &PageRequest<OrderSort>,
) -> Result<Page<AdminOrderSummary>, AppError> {
    let mut tx = store.begin().await?;
    let result = tx.list_orders(None, page).await.map_err(AppError::from);
    Ok(finish(tx, result).await?.map(AdminOrderSummary::from))
}

pub async fn order_details(store: &dyn Store, order_id: i32) -> Result<AdminOrderDetails, AppError> {
    let mut tx = store.begin().await?;
    let result = async {
        let order = tx
            .find_order(order_id)
            .await?
            .ok_or_else(|| AppError::not_found("Order", "orderId", order_id))?;
        let items = tx.order_items_for(&[order.id]).await?;
        let product_ids: Vec<i32> = items.iter().map(|item| item.product_id).collect();
        let products: HashMap<i32, _> = tx
            .find_products(&product_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let items = items
            .into_iter()
            .map(|item| match products.get(&item.product_id) {
                Some(product) => AdminOrderItem {
                    order_item_id: item.id,
                    product_id: item.product_id,
                    product_name: product.name.clone(),
                    product_image: Some(product.image.clone()),
                    quantity: item.quantity,
                    discount: item.discount,
                    ordered_product_price: item.ordered_product_price,
                    special_price: product.special_price,
                },
                None => AdminOrderItem {
                    order_item_id: item.id,
                    product_id: item.product_id,
                    product_name: "Unknown".to_string(),
                    product_image: None,
                    quantity: item.quantity,
                    discount: item.discount,
                    ordered_product_price: item.ordered_product_price,
                    special_price: 0.0,
                },
            })
            .collect();

        Ok::<AdminOrderDetails, AppError>(AdminOrderDetails {
            order_id: order.id,
            email: order.email,
            order_date: order.order_date,
            order_status: order.status,
            total_amount: order.total_amount,
            address_id: order.address_id,
            items,
        })
    }
    .await;
    finish(tx, result).await
}

pub async fn update_status(
    store: &dyn Store,
    order_id: i32,
    status: &str,
) -> Result<AdminOrderSummary, AppError> {
    let status = status.trim();
    if status.is_empty() {
        return Err(AppError::Validation("order status must not be blank".to_string()));
    }

    let mut tx = store.begin().await?;
    let result = async {
        tx.set_order_status(order_id, status)
            .await?
            .map(AdminOrderSummary::from)
            .ok_or_else(|| AppError::not_found("Order", "orderId", order_id))
    }
    .await;
    finish(tx, result).await
}

pub async fn dashboard(store: &dyn Store) -> Result<DashboardStats, AppError> {
    let mut tx = store.begin().await?;
    let result = async {
        Ok::<DashboardStats, AppError>(DashboardStats {
            product_count: tx.count_products().await?,
            total_orders: tx.count_orders().await?,
            total_revenue: tx.total_revenue().await?,
        })
    }
    .await;
    finish(tx, result).await
}

async fn attach_details(
    tx: &mut dyn StoreTx,
    orders: Page<OrderEntity>,
) -> Result<Page<OrderView>, AppError> {
    let order_ids: Vec<i32> = orders.content.iter().map(|o| o.id).collect();

    let mut items_by_order: HashMap<i32, Vec<OrderItemEntity>> = HashMap::new();
    for item in tx.order_items_for(&order_ids).await? {
        items_by_order.entry(item.order_id).or_default().push(item);
    }
    let mut payment_by_order: HashMap<i32, PaymentEntity> = tx
        .payments_for(&order_ids)
        .await?
        .into_iter()
        .map(|p| (p.order_id, p))
        .collect();

    Ok(orders.map(|order| OrderView {
        items: items_by_order.remove(&order.id).unwrap_or_default(),
        payment: payment_by_order.remove(&order.id),
        address_id: order.address_id,
        order,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        paging::SortDirection,
        services::{
            carts,
            catalog::{self, ProductInput},
        },
        store::MemoryStore,
        test_utils::{RecordingMailer, seed_address, seed_cart, seed_category, seed_product},
    };

    const EMAIL: &str = "jane@pharma.test";

    fn checkout(address_id: i32) -> PlaceOrder {
        PlaceOrder {
            address_id,
            payment_method: "card".to_string(),
            pg_name: Some("stripe".to_string()),
            pg_payment_id: Some("pi_123".to_string()),
            pg_status: Some("succeeded".to_string()),
            pg_response_message: Some("Payment successful".to_string()),
        }
    }

    async fn product_quantity(store: &MemoryStore, id: i32) -> i32 {
        let mut tx = store.begin().await.unwrap();
        let qty = tx.find_product(id).await.unwrap().unwrap().quantity;
        tx.rollback().await.unwrap();
        qty
    }

    #[tokio::test]
    async fn places_order_from_cart() {
        let store = MemoryStore::new();
        let category = seed_category(&store, "Pain relief").await.unwrap();
        let a = seed_product(&store, category.id, "Paracetamol", 20, 2.5).await.unwrap();
        let b = seed_product(&store, category.id, "Ibuprofen", 10, 4.0).await.unwrap();
        let address = seed_address(&store, EMAIL).await.unwrap();
        seed_cart(&store, EMAIL, &[(a.id, 3), (b.id, 2)]).await.unwrap();

        let view = place_order(&store, &OrderConfig::default(), EMAIL, checkout(address.id))
            .await
            .unwrap();

        assert_eq!(view.order.status, INITIAL_ORDER_STATUS);
        assert_eq!(view.order.total_amount, 15.5);
        assert_eq!(view.order.order_date, Utc::now().date_naive());
        assert_eq!(view.address_id, address.id);
        assert_eq!(view.items.len(), 2);
        let line_a = view.items.iter().find(|i| i.product_id == a.id).unwrap();
        assert_eq!((line_a.quantity, line_a.ordered_product_price), (3, 2.5));
        let payment = view.payment.unwrap();
        assert_eq!(payment.method, "card");
        assert_eq!(payment.pg_payment_id.as_deref(), Some("pi_123"));

        assert_eq!(product_quantity(&store, a.id).await, 17);
        assert_eq!(product_quantity(&store, b.id).await, 8);

        let cart = carts::get_cart(&store, EMAIL).await.unwrap();
        assert!(cart.items.is_empty());
        assert_eq!(cart.total_price, 0.0);
    }

    #[tokio::test]
    async fn empty_cart_is_rejected_without_side_effects() {
        let store = MemoryStore::new();
        let address = seed_address(&store, EMAIL).await.unwrap();
        seed_cart(&store, EMAIL, &[]).await.unwrap();

        let err = place_order(&store, &OrderConfig::default(), EMAIL, checkout(address.id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(msg) if msg == "Cart is empty"));

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.count_orders().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn missing_cart_and_address_are_not_found() {
        let store = MemoryStore::new();
        let err = place_order(&store, &OrderConfig::default(), EMAIL, checkout(1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let category = seed_category(&store, "Allergy").await.unwrap();
        let p = seed_product(&store, category.id, "Cetirizine", 5, 1.0).await.unwrap();
        seed_cart(&store, EMAIL, &[(p.id, 1)]).await.unwrap();
        let foreign = seed_address(&store, "someone@else.test").await.unwrap();

        for address_id in [404, foreign.id] {
            let err = place_order(&store, &OrderConfig::default(), EMAIL, checkout(address_id))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::NotFound(_)));
        }
        assert_eq!(product_quantity(&store, p.id).await, 5);
    }

    #[tokio::test]
    async fn oversell_is_rejected_unless_allowed() {
        let store = MemoryStore::new();
        let category = seed_category(&store, "Antibiotics").await.unwrap();
        let p = seed_product(&store, category.id, "Amoxicillin", 2, 9.0).await.unwrap();
        let address = seed_address(&store, EMAIL).await.unwrap();
        seed_cart(&store, EMAIL, &[(p.id, 5)]).await.unwrap();

        let err = place_order(&store, &OrderConfig::default(), EMAIL, checkout(address.id))
            .await
            .unwrap_err();
        assert!(
            matches!(err, AppError::BusinessRule(msg) if msg == format!("insufficient stock for product {}", p.id))
        );
        assert_eq!(product_quantity(&store, p.id).await, 2);

        let lenient = OrderConfig {
            allow_oversell: true,
        };
        place_order(&store, &lenient, EMAIL, checkout(address.id))
            .await
            .unwrap();
        assert_eq!(product_quantity(&store, p.id).await, -3);
    }

    #[tokio::test]
    async fn failure_mid_workflow_rolls_everything_back() {
        let store = MemoryStore::new();
        let category = seed_category(&store, "Diabetes").await.unwrap();
        let p = seed_product(&store, category.id, "Metformin", 30, 3.0).await.unwrap();
        let address = seed_address(&store, EMAIL).await.unwrap();
        seed_cart(&store, EMAIL, &[(p.id, 2)]).await.unwrap();

        store.set_fail_on_stock_update(true);
        assert!(
            place_order(&store, &OrderConfig::default(), EMAIL, checkout(address.id))
                .await
                .is_err()
        );
        store.set_fail_on_stock_update(false);

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.count_orders().await.unwrap(), 0);
        tx.rollback().await.unwrap();
        assert_eq!(product_quantity(&store, p.id).await, 30);
        assert_eq!(carts::get_cart(&store, EMAIL).await.unwrap().items.len(), 1);
    }

    #[tokio::test]
    async fn order_views_resolve_products() {
        let store = MemoryStore::new();
        let category = seed_category(&store, "Skin").await.unwrap();
        let cream = seed_product(&store, category.id, "Cream", 10, 5.0).await.unwrap();
        let gel = seed_product(&store, category.id, "Gel", 10, 7.0).await.unwrap();
        let address = seed_address(&store, EMAIL).await.unwrap();
        seed_cart(&store, EMAIL, &[(cream.id, 1), (gel.id, 1)]).await.unwrap();
        let placed = place_order(&store, &OrderConfig::default(), EMAIL, checkout(address.id))
            .await
            .unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.delete_product(gel.id).await.unwrap();
        tx.commit().await.unwrap();

        let details = order_details(&store, placed.order.id).await.unwrap();
        assert_eq!(details.items.len(), 2);
        let gone = details.items.iter().find(|i| i.product_id == gel.id).unwrap();
        assert_eq!(gone.product_name, "Unknown");
        assert_eq!(gone.product_image, None);

        let page = PageRequest::new(0, 10, OrderSort::Id, SortDirection::Desc);
        let mine = my_orders(&store, EMAIL, &page).await.unwrap();
        assert_eq!(mine.total_elements, 1);
        assert_eq!(mine.content[0].items.len(), 2);
        assert!(mine.content[0].payment.is_some());

        let updated = update_status(&store, placed.order.id, "Shipped").await.unwrap();
        assert_eq!(updated.order_status, "Shipped");
        assert!(matches!(
            update_status(&store, 999, "Shipped").await,
            Err(AppError::NotFound(_))
        ));

        let stats = dashboard(&store).await.unwrap();
        assert_eq!(stats.product_count, 1);
        assert_eq!(stats.total_orders, 1);
        assert_eq!(stats.total_revenue, 12.0);
    }

    #[tokio::test]
    async fn order_lines_keep_the_cart_price_after_repricing() {
        let store = MemoryStore::new();
        let mailer = RecordingMailer::new();
        let category = seed_category(&store, "Cold and flu").await.unwrap();
        let p = seed_product(&store, category.id, "Pseudoephedrine", 10, 10.0).await.unwrap();
        let address = seed_address(&store, EMAIL).await.unwrap();
        seed_cart(&store, EMAIL, &[(p.id, 2)]).await.unwrap();

        let repriced = catalog::update_product(
            &store,
            mailer.as_ref(),
            p.id,
            ProductInput {
                product_name: "Pseudoephedrine".to_string(),
                quantity: 10,
                price: 16.0,
                discount: 25.0,
                category_id: category.id,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(repriced.special_price, 12.0);

        let view = place_order(&store, &OrderConfig::default(), EMAIL, checkout(address.id))
            .await
            .unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].ordered_product_price, 10.0);
        assert_eq!(view.items[0].discount, 0.0);
        assert_eq!(view.order.total_amount, 20.0);
    }

    #[tokio::test]
    async fn deleted_product_is_not_billed() {
        let store = MemoryStore::new();
        let category = seed_category(&store, "Pain relief").await.unwrap();
        let a = seed_product(&store, category.id, "Paracetamol", 10, 2.5).await.unwrap();
        let b = seed_product(&store, category.id, "Ibuprofen", 10, 4.0).await.unwrap();
        let address = seed_address(&store, EMAIL).await.unwrap();
        seed_cart(&store, EMAIL, &[(a.id, 1), (b.id, 1)]).await.unwrap();

        catalog::delete_product(&store, b.id).await.unwrap();

        let cart = carts::get_cart(&store, EMAIL).await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.total_price, 2.5);

        let view = place_order(&store, &OrderConfig::default(), EMAIL, checkout(address.id))
            .await
            .unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.order.total_amount, 2.5);
    }

    #[tokio::test]
    async fn competing_checkouts_cannot_oversell_the_last_unit() {
        let store = MemoryStore::new();
        let category = seed_category(&store, "Inhalers").await.unwrap();
        let p = seed_product(&store, category.id, "Salbutamol", 1, 8.0).await.unwrap();
        let first = seed_address(&store, EMAIL).await.unwrap();
        let second = seed_address(&store, "sam@pharma.test").await.unwrap();
        seed_cart(&store, EMAIL, &[(p.id, 1)]).await.unwrap();
        seed_cart(&store, "sam@pharma.test", &[(p.id, 1)]).await.unwrap();

        let policy = OrderConfig::default();
        let (a, b) = tokio::join!(
            place_order(&store, &policy, EMAIL, checkout(first.id)),
            place_order(&store, &policy, "sam@pharma.test", checkout(second.id)),
        );

        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
        let rejected = a.err().or(b.err()).unwrap();
        assert!(matches!(rejected, AppError::BusinessRule(_)));
        assert_eq!(product_quantity(&store, p.id).await, 0);
    }
}
