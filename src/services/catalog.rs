//! Products, categories and product details.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    app_error::AppError,
    models::{
        CategoryEntity, CreateProductEntity, ProductDetailsEntity, ProductEntity,
        UpdateProductEntity, UpsertProductDetailsEntity,
    },
    notify::Mailer,
    paging::{CategorySort, Page, PageRequest, ProductSort},
    services::{carts, stock_notifications},
    store::{ProductFilter, Store, StoreError, StoreTx, finish},
};

pub const DEFAULT_IMAGE: &str = "default.png";

#[derive(Deserialize, Debug, Clone, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub product_name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub description: String,
    pub quantity: i32,
    pub price: f64,
    #[serde(default)]
    pub discount: f64,
    /// Derived from price and discount when omitted.
    #[serde(default)]
    pub special_price: Option<f64>,
    pub category_id: i32,
}

#[derive(Deserialize, Debug, Clone, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetailsInput {
    #[serde(default)]
    pub ingredients: String,
    #[serde(default)]
    pub usage_dosage: String,
    #[serde(default)]
    pub storage_info: String,
    #[serde(default)]
    pub side_effects: String,
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetailsView {
    pub product_id: i32,
    pub ingredients: String,
    pub usage_dosage: String,
    pub storage_info: String,
    pub side_effects: String,
    pub expiry_date: Option<NaiveDate>,
}

impl ProductDetailsView {
    fn empty(product_id: i32) -> Self {
        Self {
            product_id,
            ingredients: String::new(),
            usage_dosage: String::new(),
            storage_info: String::new(),
            side_effects: String::new(),
            expiry_date: None,
        }
    }
}

impl From<ProductDetailsEntity> for ProductDetailsView {
    fn from(details: ProductDetailsEntity) -> Self {
        Self {
            product_id: details.product_id,
            ingredients: details.ingredients,
            usage_dosage: details.usage_dosage,
            storage_info: details.storage_info,
            side_effects: details.side_effects,
            expiry_date: details.expiry_date,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductFull {
    pub product: ProductEntity,
    pub details: ProductDetailsView,
}

/// `price - price * discount / 100`.
pub fn special_price(price: f64, discount: f64) -> f64 {
    price - price * discount / 100.0
}

fn validate(input: &ProductInput) -> Result<(), AppError> {
    if input.product_name.trim().is_empty() {
        return Err(AppError::Validation("productName must not be blank".to_string()));
    }
    if !input.price.is_finite() || input.price < 0.0 {
        return Err(AppError::Validation("price must be zero or more".to_string()));
    }
    if !(0.0..=100.0).contains(&input.discount) {
        return Err(AppError::Validation("discount must be between 0 and 100".to_string()));
    }
    if input.special_price.is_some_and(|p| !p.is_finite() || p < 0.0) {
        return Err(AppError::Validation("specialPrice must be zero or more".to_string()));
    }
    Ok(())
}

async fn require_product(tx: &mut dyn StoreTx, product_id: i32) -> Result<ProductEntity, AppError> {
    tx.find_product(product_id)
        .await?
        .ok_or_else(|| AppError::not_found("Product", "productId", product_id))
}

async fn require_category(tx: &mut dyn StoreTx, category_id: i32) -> Result<CategoryEntity, AppError> {
    tx.find_category(category_id)
        .await?
        .ok_or_else(|| AppError::not_found("Category", "categoryId", category_id))
}

// Browsing

pub async fn list_products(
    store: &dyn Store,
    filter: &ProductFilter,
    page: &PageRequest<ProductSort>,
) -> Result<Page<ProductEntity>, AppError> {
    let mut tx = store.begin().await?;
    let result = async {
        if let Some(category_id) = filter.category_id {
            require_category(&mut *tx, category_id).await?;
        }
        Ok::<_, AppError>(tx.list_products(filter, page).await?)
    }
    .await;
    finish(tx, result).await
}

pub async fn product_details(
    store: &dyn Store,
    product_id: i32,
) -> Result<ProductDetailsView, AppError> {
    Ok(product_full(store, product_id).await?.details)
}

pub async fn product_full(store: &dyn Store, product_id: i32) -> Result<ProductFull, AppError> {
    let mut tx = store.begin().await?;
    let result = async {
        let product = require_product(&mut *tx, product_id).await?;
        let details = tx
            .find_product_details(product_id)
            .await?
            .map(ProductDetailsView::from)
            .unwrap_or_else(|| ProductDetailsView::empty(product_id));
        Ok::<_, AppError>(ProductFull { product, details })
    }
    .await;
    finish(tx, result).await
}

// Admin products

pub async fn admin_products(
    store: &dyn Store,
    category_id: Option<i32>,
) -> Result<Vec<ProductEntity>, AppError> {
    let mut tx = store.begin().await?;
    let result = tx.products_in_category(category_id).await.map_err(AppError::from);
    finish(tx, result).await
}

pub async fn create_product(store: &dyn Store, input: ProductInput) -> Result<ProductEntity, AppError> {
    validate(&input)?;

    let mut tx = store.begin().await?;
    let result = async {
        require_category(&mut *tx, input.category_id).await?;
        let image = input
            .image
            .filter(|image| !image.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_IMAGE.to_string());

        Ok::<_, AppError>(
            tx.insert_product(CreateProductEntity {
                special_price: input
                    .special_price
                    .unwrap_or_else(|| special_price(input.price, input.discount)),
                name: input.product_name.trim().to_string(),
                image,
                description: input.description,
                quantity: input.quantity,
                price: input.price,
                discount: input.discount,
                category_id: input.category_id,
            })
            .await?,
        )
    }
    .await;
    let product = finish(tx, result).await?;
    tracing::info!(product_id = product.id, name = %product.name, "Product created");
    Ok(product)
}

/// Saves an admin edit, then runs the back-in-stock check against the old
/// quantity. Notification problems are logged and never fail the update.
pub async fn update_product(
    store: &dyn Store,
    mailer: &dyn Mailer,
    product_id: i32,
    input: ProductInput,
) -> Result<ProductEntity, AppError> {
    validate(&input)?;

    let mut tx = store.begin().await?;
    let result = async {
        let existing = require_product(&mut *tx, product_id).await?;
        require_category(&mut *tx, input.category_id).await?;

        let updated = tx
            .update_product(
                product_id,
                UpdateProductEntity {
                    special_price: input
                        .special_price
                        .unwrap_or_else(|| special_price(input.price, input.discount)),
                    name: input.product_name.trim().to_string(),
                    image: input.image.filter(|image| !image.trim().is_empty()),
                    description: input.description,
                    quantity: input.quantity,
                    price: input.price,
                    discount: input.discount,
                    category_id: input.category_id,
                },
            )
            .await?
            .ok_or_else(|| AppError::not_found("Product", "productId", product_id))?;
        Ok::<_, AppError>((existing.quantity, updated))
    }
    .await;
    let (old_quantity, product) = finish(tx, result).await?;

    if let Err(err) =
        stock_notifications::on_quantity_changed(store, mailer, &product, old_quantity).await
    {
        tracing::warn!(product_id, error = %err, "Back-in-stock check failed");
    }
    Ok(product)
}

pub async fn delete_product(store: &dyn Store, product_id: i32) -> Result<ProductEntity, AppError> {
    let mut tx = store.begin().await?;
    let result = async {
        let cart_ids = tx.carts_holding(product_id).await?;
        let product = tx
            .delete_product(product_id)
            .await?
            .ok_or_else(|| AppError::not_found("Product", "productId", product_id))?;

        for cart_id in cart_ids {
            carts::recompute_total(&mut *tx, cart_id).await?;
        }
        Ok::<_, AppError>(product)
    }
    .await;
    finish(tx, result).await
}

pub async fn upsert_details(
    store: &dyn Store,
    product_id: i32,
    input: ProductDetailsInput,
) -> Result<ProductDetailsView, AppError> {
    let mut tx = store.begin().await?;
    let result = async {
        require_product(&mut *tx, product_id).await?;
        let saved = tx
            .upsert_product_details(UpsertProductDetailsEntity {
                product_id,
                ingredients: input.ingredients,
                usage_dosage: input.usage_dosage,
                storage_info: input.storage_info,
                side_effects: input.side_effects,
                expiry_date: input.expiry_date,
            })
            .await?;
        Ok::<_, AppError>(ProductDetailsView::from(saved))
    }
    .await;
    finish(tx, result).await
}

// Categories

pub async fn list_categories(
    store: &dyn Store,
    page: &PageRequest<CategorySort>,
) -> Result<Page<CategoryEntity>, AppError> {
    let mut tx = store.begin().await?;
    let result = tx.list_categories(page).await.map_err(AppError::from);
    finish(tx, result).await
}

fn category_name(name: &str) -> Result<&str, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("categoryName must not be blank".to_string()));
    }
    Ok(name)
}

pub async fn create_category(store: &dyn Store, name: &str) -> Result<CategoryEntity, AppError> {
    let name = category_name(name)?;

    let mut tx = store.begin().await?;
    let result = async {
        if tx.find_category_by_name(name).await?.is_some() {
            return Err(AppError::BusinessRule(format!(
                "Category with the name {name} already exists"
            )));
        }
        Ok(tx.insert_category(name).await?)
    }
    .await;
    finish(tx, result).await
}

pub async fn rename_category(
    store: &dyn Store,
    category_id: i32,
    name: &str,
) -> Result<CategoryEntity, AppError> {
    let name = category_name(name)?;

    let mut tx = store.begin().await?;
    let result = async {
        require_category(&mut *tx, category_id).await?;
        if let Some(other) = tx.find_category_by_name(name).await? {
            if other.id != category_id {
                return Err(AppError::BusinessRule(format!(
                    "Category with the name {name} already exists"
                )));
            }
        }
        tx.rename_category(category_id, name)
            .await?
            .ok_or_else(|| AppError::not_found("Category", "categoryId", category_id))
    }
    .await;
    finish(tx, result).await
}

pub async fn delete_category(store: &dyn Store, category_id: i32) -> Result<CategoryEntity, AppError> {
    let mut tx = store.begin().await?;
    let result = async {
        require_category(&mut *tx, category_id).await?;
        match tx.delete_category(category_id).await {
            Ok(Some(category)) => Ok(category),
            Ok(None) => Err(AppError::not_found("Category", "categoryId", category_id)),
            Err(StoreError::Conflict(_)) => Err(AppError::BusinessRule(format!(
                "Category {category_id} still has products"
            ))),
            Err(err) => Err(err.into()),
        }
    }
    .await;
    finish(tx, result).await
}
