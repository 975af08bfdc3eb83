//! Customer carts. Every mutation recomputes the cart total from the line
//! snapshots.

use std::collections::HashMap;

use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    app_error::AppError,
    models::{CartEntity, CartItemEntity, CreateCartItemEntity},
    store::{Store, StoreTx, finish},
};

#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub cart_id: i32,
    pub email: String,
    pub total_price: f64,
    pub items: Vec<CartLineView>,
}

#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartLineView {
    pub product_id: i32,
    pub product_name: String,
    pub image: String,
    pub quantity: i32,
    /// Unit price captured when the product was added.
    pub product_price: f64,
    pub discount: f64,
}

pub async fn get_cart(store: &dyn Store, email: &str) -> Result<CartView, AppError> {
    let mut tx = store.begin().await?;
    let result = async {
        let cart = require_cart(&mut *tx, email).await?;
        cart_view(&mut *tx, cart).await
    }
    .await;
    finish(tx, result).await
}

pub async fn get_or_create_cart(store: &dyn Store, email: &str) -> Result<CartView, AppError> {
    let mut tx = store.begin().await?;
    let result = async {
        let cart = find_or_create(&mut *tx, email).await?;
        cart_view(&mut *tx, cart).await
    }
    .await;
    finish(tx, result).await
}

/// Adds `quantity` units of a product, merging with an existing line. The
/// line price is re-snapshotted from the product.
pub async fn add_product(
    store: &dyn Store,
    email: &str,
    product_id: i32,
    quantity: i32,
) -> Result<CartView, AppError> {
    if quantity <= 0 {
        return Err(AppError::Validation("quantity must be positive".to_string()));
    }

    let mut tx = store.begin().await?;
    let result = async {
        let product = tx
            .find_product(product_id)
            .await?
            .ok_or_else(|| AppError::not_found("Product", "productId", product_id))?;
        let cart = find_or_create(&mut *tx, email).await?;

        let existing = tx
            .cart_items(cart.id)
            .await?
            .into_iter()
            .find(|item| item.product_id == product_id)
            .map(|item| item.quantity)
            .unwrap_or(0);

        tx.upsert_cart_item(CreateCartItemEntity {
            cart_id: cart.id,
            product_id,
            quantity: existing.saturating_add(quantity),
            product_price: product.special_price,
            discount: product.discount,
        })
        .await?;

        let cart = recompute_total(&mut *tx, cart.id).await?;
        cart_view(&mut *tx, cart).await
    }
    .await;
    finish(tx, result).await
}

/// Sets a line's quantity; zero or less removes the line.
pub async fn update_quantity(
    store: &dyn Store,
    email: &str,
    product_id: i32,
    quantity: i32,
) -> Result<CartView, AppError> {
    let mut tx = store.begin().await?;
    let result = async {
        let cart = require_cart(&mut *tx, email).await?;
        let line = tx
            .cart_items(cart.id)
            .await?
            .into_iter()
            .find(|item| item.product_id == product_id)
            .ok_or_else(|| AppError::not_found("CartItem", "productId", product_id))?;

        if quantity <= 0 {
            tx.delete_cart_item(cart.id, product_id).await?;
        } else {
            tx.upsert_cart_item(CreateCartItemEntity {
                cart_id: cart.id,
                product_id,
                quantity,
                product_price: line.product_price,
                discount: line.discount,
            })
            .await?;
        }

        let cart = recompute_total(&mut *tx, cart.id).await?;
        cart_view(&mut *tx, cart).await
    }
    .await;
    finish(tx, result).await
}

pub async fn remove_product(
    store: &dyn Store,
    email: &str,
    product_id: i32,
) -> Result<CartView, AppError> {
    let mut tx = store.begin().await?;
    let result = async {
        let cart = require_cart(&mut *tx, email).await?;
        tx.delete_cart_item(cart.id, product_id)
            .await?
            .ok_or_else(|| AppError::not_found("CartItem", "productId", product_id))?;

        let cart = recompute_total(&mut *tx, cart.id).await?;
        cart_view(&mut *tx, cart).await
    }
    .await;
    finish(tx, result).await
}

pub(crate) fn cart_total(items: &[CartItemEntity]) -> f64 {
    items
        .iter()
        .map(|item| item.product_price * f64::from(item.quantity))
        .sum()
}

async fn require_cart(tx: &mut dyn StoreTx, email: &str) -> Result<CartEntity, AppError> {
    tx.find_cart_by_email(email)
        .await?
        .ok_or_else(|| AppError::not_found("Cart", "email", email))
}

async fn find_or_create(tx: &mut dyn StoreTx, email: &str) -> Result<CartEntity, AppError> {
    match tx.find_cart_by_email(email).await? {
        Some(cart) => Ok(cart),
        None => Ok(tx.insert_cart(email).await?),
    }
}

pub(crate) async fn recompute_total(tx: &mut dyn StoreTx, cart_id: i32) -> Result<CartEntity, AppError> {
    let items = tx.cart_items(cart_id).await?;
    Ok(tx.set_cart_total(cart_id, cart_total(&items)).await?)
}

async fn cart_view(tx: &mut dyn StoreTx, cart: CartEntity) -> Result<CartView, AppError> {
    let items = tx.cart_items(cart.id).await?;
    let product_ids: Vec<i32> = items.iter().map(|item| item.product_id).collect();
    let products: HashMap<i32, _> = tx
        .find_products(&product_ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let items = items
        .into_iter()
        .map(|item| {
            let product = products.get(&item.product_id);
            CartLineView {
                product_id: item.product_id,
                product_name: product.map(|p| p.name.clone()).unwrap_or_default(),
                image: product.map(|p| p.image.clone()).unwrap_or_default(),
                quantity: item.quantity,
                product_price: item.product_price,
                discount: item.discount,
            }
        })
        .collect();

    Ok(CartView {
        cart_id: cart.id,
        email: cart.email,
        total_price: cart.total_price,
        items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        store::MemoryStore,
        test_utils::{seed_category, seed_product},
    };

    const EMAIL: &str = "jane@pharma.test";

    #[tokio::test]
    async fn add_creates_cart_and_merges_lines() {
        let store = MemoryStore::new();
        let category = seed_category(&store, "Pain relief").await.unwrap();
        let paracetamol = seed_product(&store, category.id, "Paracetamol", 40, 2.5)
            .await
            .unwrap();

        let cart = add_product(&store, EMAIL, paracetamol.id, 2).await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.total_price, 5.0);

        let cart = add_product(&store, EMAIL, paracetamol.id, 3).await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 5);
        assert_eq!(cart.items[0].product_name, "Paracetamol");
        assert_eq!(cart.total_price, 12.5);
    }

    #[tokio::test]
    async fn add_rejects_unknown_product_and_bad_quantity() {
        let store = MemoryStore::new();
        assert!(matches!(
            add_product(&store, EMAIL, 99, 1).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            add_product(&store, EMAIL, 99, 0).await,
            Err(AppError::Validation(_))
        ));
        // Nothing was created on the failed attempt.
        assert!(matches!(
            get_cart(&store, EMAIL).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn zero_quantity_update_removes_line() {
        let store = MemoryStore::new();
        let category = seed_category(&store, "Vitamins").await.unwrap();
        let a = seed_product(&store, category.id, "Vitamin C", 10, 4.0).await.unwrap();
        let b = seed_product(&store, category.id, "Vitamin D", 10, 6.0).await.unwrap();
        add_product(&store, EMAIL, a.id, 1).await.unwrap();
        add_product(&store, EMAIL, b.id, 2).await.unwrap();

        let cart = update_quantity(&store, EMAIL, a.id, 0).await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.total_price, 12.0);

        let cart = update_quantity(&store, EMAIL, b.id, 1).await.unwrap();
        assert_eq!(cart.total_price, 6.0);

        let cart = remove_product(&store, EMAIL, b.id).await.unwrap();
        assert!(cart.items.is_empty());
        assert_eq!(cart.total_price, 0.0);
    }

    #[tokio::test]
    async fn snapshot_price_survives_product_repricing() {
        let store = MemoryStore::new();
        let category = seed_category(&store, "Cold").await.unwrap();
        let syrup = seed_product(&store, category.id, "Syrup", 10, 8.0).await.unwrap();
        add_product(&store, EMAIL, syrup.id, 1).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.update_product(
            syrup.id,
            crate::models::UpdateProductEntity {
                name: syrup.name.clone(),
                image: None,
                description: syrup.description.clone(),
                quantity: syrup.quantity,
                price: 20.0,
                discount: 0.0,
                special_price: 20.0,
                category_id: category.id,
            },
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let cart = update_quantity(&store, EMAIL, syrup.id, 2).await.unwrap();
        assert_eq!(cart.items[0].product_price, 8.0);
        assert_eq!(cart.total_price, 16.0);
    }
}
