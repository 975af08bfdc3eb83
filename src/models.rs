use chrono::{DateTime, NaiveDate, Utc};
use diesel::{
    Selectable,
    prelude::{AsChangeset, Identifiable, Insertable, Queryable},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// Catalog

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, PartialEq, ToSchema)]
#[diesel(table_name = crate::schema::categories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct CategoryEntity {
    pub id: i32,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, PartialEq, ToSchema)]
#[diesel(table_name = crate::schema::products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct ProductEntity {
    pub id: i32,
    pub name: String,
    pub image: String,
    pub description: String,
    pub quantity: i32,
    pub price: f64,
    pub discount: f64,
    pub special_price: f64,
    pub category_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::products)]
pub struct CreateProductEntity {
    pub name: String,
    pub image: String,
    pub description: String,
    pub quantity: i32,
    pub price: f64,
    pub discount: f64,
    pub special_price: f64,
    pub category_id: i32,
}

/// Admin edit of a product. `image` is left untouched when `None`.
#[derive(AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::products)]
pub struct UpdateProductEntity {
    pub name: String,
    pub image: Option<String>,
    pub description: String,
    pub quantity: i32,
    pub price: f64,
    pub discount: f64,
    pub special_price: f64,
    pub category_id: i32,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, PartialEq, ToSchema)]
#[diesel(table_name = crate::schema::product_details)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct ProductDetailsEntity {
    pub id: i32,
    pub product_id: i32,
    pub ingredients: String,
    pub usage_dosage: String,
    pub storage_info: String,
    pub side_effects: String,
    pub expiry_date: Option<NaiveDate>,
    pub expiry_alert_sent_on: Option<NaiveDate>,
}

#[derive(Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::product_details)]
#[diesel(treat_none_as_null = true)]
pub struct UpsertProductDetailsEntity {
    pub product_id: i32,
    pub ingredients: String,
    pub usage_dosage: String,
    pub storage_info: String,
    pub side_effects: String,
    pub expiry_date: Option<NaiveDate>,
}

// Carts

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, PartialEq, ToSchema)]
#[diesel(table_name = crate::schema::carts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct CartEntity {
    pub id: i32,
    pub email: String,
    pub total_price: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Serialize, Debug, Clone, PartialEq, ToSchema)]
#[diesel(table_name = crate::schema::cart_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct CartItemEntity {
    pub cart_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub product_price: f64,
    pub discount: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::cart_items)]
pub struct CreateCartItemEntity {
    pub cart_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub product_price: f64,
    pub discount: f64,
}

// Addresses

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, PartialEq, ToSchema)]
#[diesel(table_name = crate::schema::addresses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct AddressEntity {
    pub id: i32,
    pub email: String,
    pub street: String,
    pub building_name: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub postal_code: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::addresses)]
pub struct CreateAddressEntity {
    pub email: String,
    pub street: String,
    pub building_name: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub postal_code: String,
}

// Orders

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, PartialEq, ToSchema)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct OrderEntity {
    pub id: i32,
    pub email: String,
    pub order_date: NaiveDate,
    pub total_amount: f64,
    pub status: String,
    pub address_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreateOrderEntity {
    pub email: String,
    pub order_date: NaiveDate,
    pub total_amount: f64,
    pub status: String,
    pub address_id: i32,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, PartialEq, ToSchema)]
#[diesel(table_name = crate::schema::order_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct OrderItemEntity {
    pub id: i32,
    pub order_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub discount: f64,
    pub ordered_product_price: f64,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::order_items)]
pub struct CreateOrderItemEntity {
    pub order_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub discount: f64,
    pub ordered_product_price: f64,
}

#[derive(Queryable, Serialize, Selectable, Debug, Clone, PartialEq, ToSchema)]
#[diesel(table_name = crate::schema::payments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct PaymentEntity {
    pub id: Uuid,
    pub order_id: i32,
    pub method: String,
    pub pg_name: Option<String>,
    pub pg_payment_id: Option<String>,
    pub pg_status: Option<String>,
    pub pg_response_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::payments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreatePaymentEntity {
    pub order_id: i32,
    pub method: String,
    pub pg_name: Option<String>,
    pub pg_payment_id: Option<String>,
    pub pg_status: Option<String>,
    pub pg_response_message: Option<String>,
}

// Stock alerts

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, PartialEq, ToSchema)]
#[diesel(table_name = crate::schema::stock_subscriptions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct StockSubscriptionEntity {
    pub id: i32,
    pub product_id: i32,
    pub email: String,
    pub notified: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::stock_subscriptions)]
pub struct CreateStockSubscriptionEntity {
    pub product_id: i32,
    pub email: String,
    pub notified: bool,
}

#[derive(Queryable, Selectable, Insertable, Serialize, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::stock_alert_logs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct StockAlertLogEntity {
    pub product_id: i32,
    pub last_alert_at: DateTime<Utc>,
    pub last_quantity: i32,
}
