//! Fixtures shared by unit and integration tests.

use std::{
    collections::HashSet,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{
    app_error::AppError,
    app_state::AppState,
    config::Config,
    models::{
        AddressEntity, CategoryEntity, CreateAddressEntity, CreateProductEntity,
        ProductDetailsEntity, ProductEntity, UpsertProductDetailsEntity,
    },
    notify::{MailError, Mailer},
    services::carts,
    store::{MemoryStore, Store},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// Keeps every accepted mail in memory. Failures can be switched on for
/// all mail or for single recipients.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
    fail_all: AtomicBool,
    failing_recipients: Mutex<HashSet<String>>,
}

impl RecordingMailer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    pub fn fail_for(&self, recipient: &str) {
        if let Ok(mut failing) = self.failing_recipients.lock() {
            failing.insert(recipient.to_string());
        }
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<(), MailError> {
        if recipients.is_empty() {
            return Err(MailError::NoRecipients);
        }
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(MailError::Rejected("relay unavailable".to_string()));
        }
        if let Ok(failing) = self.failing_recipients.lock() {
            if let Some(bad) = recipients.iter().find(|r| failing.contains(*r)) {
                return Err(MailError::Rejected(format!("mailbox {bad} unavailable")));
            }
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(SentMail {
                recipients: recipients.to_vec(),
                subject: subject.to_string(),
                body: body.to_string(),
            });
        }
        Ok(())
    }
}

pub fn test_state(store: MemoryStore, mailer: Arc<RecordingMailer>, config: Config) -> AppState {
    AppState::new(Arc::new(store), mailer, config)
}

pub async fn seed_category(store: &dyn Store, name: &str) -> Result<CategoryEntity, AppError> {
    let mut tx = store.begin().await?;
    let category = tx.insert_category(name).await?;
    tx.commit().await?;
    Ok(category)
}

pub async fn seed_product(
    store: &dyn Store,
    category_id: i32,
    name: &str,
    quantity: i32,
    price: f64,
) -> Result<ProductEntity, AppError> {
    let mut tx = store.begin().await?;
    let product = tx
        .insert_product(CreateProductEntity {
            name: name.to_string(),
            image: "default.png".to_string(),
            description: format!("{name} tablets"),
            quantity,
            price,
            discount: 0.0,
            special_price: price,
            category_id,
        })
        .await?;
    tx.commit().await?;
    Ok(product)
}

pub async fn seed_details(
    store: &dyn Store,
    product_id: i32,
    expiry_date: Option<NaiveDate>,
) -> Result<ProductDetailsEntity, AppError> {
    let mut tx = store.begin().await?;
    let details = tx
        .upsert_product_details(UpsertProductDetailsEntity {
            product_id,
            ingredients: String::new(),
            usage_dosage: String::new(),
            storage_info: String::new(),
            side_effects: String::new(),
            expiry_date,
        })
        .await?;
    tx.commit().await?;
    Ok(details)
}

pub async fn seed_address(store: &dyn Store, email: &str) -> Result<AddressEntity, AppError> {
    let mut tx = store.begin().await?;
    let address = tx
        .insert_address(CreateAddressEntity {
            email: email.to_string(),
            street: "12 Harbour Road".to_string(),
            building_name: "Block A".to_string(),
            city: "Colombo".to_string(),
            state: "Western".to_string(),
            country: "Sri Lanka".to_string(),
            postal_code: "00300".to_string(),
        })
        .await?;
    tx.commit().await?;
    Ok(address)
}

/// Fills the cart of `email` with `(product_id, quantity)` lines.
pub async fn seed_cart(
    store: &dyn Store,
    email: &str,
    lines: &[(i32, i32)],
) -> Result<carts::CartView, AppError> {
    let mut cart = carts::get_or_create_cart(store, email).await?;
    for &(product_id, quantity) in lines {
        cart = carts::add_product(store, email, product_id, quantity).await?;
    }
    Ok(cart)
}
