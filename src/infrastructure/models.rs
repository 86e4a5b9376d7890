use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{
    Order, OrderHistoryEntry, OrderItem, OrderStatus, Product, ProductVariant,
};
use crate::schema::{
    cart_items, notifications, order_history, order_items, order_outbox, orders,
    product_variants, products, shops, wallet_transactions,
};

fn parse_status(raw: &str) -> Result<OrderStatus, DomainError> {
    raw.parse()
        .map_err(|e: String| DomainError::Internal(format!("corrupt order row: {}", e)))
}

// ── Catalog ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = shops)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ShopRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = shops)]
pub struct NewShopRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductRow {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub discount: BigDecimal,
    pub stock: i32,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            shop_id: row.shop_id,
            name: row.name,
            price: row.price,
            discount: row.discount,
            stock: row.stock,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = products)]
pub struct NewProductRow {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub discount: BigDecimal,
    pub stock: i32,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = product_variants)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductVariantRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub stock: i32,
}

impl From<ProductVariantRow> for ProductVariant {
    fn from(row: ProductVariantRow) -> Self {
        ProductVariant {
            id: row.id,
            product_id: row.product_id,
            name: row.name,
            price: row.price,
            stock: row.stock,
        }
    }
}

// ── Orders ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub shop_id: Uuid,
    pub status: String,
    pub total_amount: BigDecimal,
    pub shipping_fee: BigDecimal,
    pub discount_amount: BigDecimal,
    pub is_pay: bool,
    pub wallet_transferred: bool,
    pub address_id: Uuid,
    pub payment_method: String,
    pub notes: Option<String>,
    pub voucher_id: Option<Uuid>,
    pub cancellation_reason: Option<String>,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = DomainError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            status: parse_status(&row.status)?,
            id: row.id,
            user_id: row.user_id,
            shop_id: row.shop_id,
            total_amount: row.total_amount,
            shipping_fee: row.shipping_fee,
            discount_amount: row.discount_amount,
            is_pay: row.is_pay,
            wallet_transferred: row.wallet_transferred,
            address_id: row.address_id,
            payment_method: row.payment_method,
            notes: row.notes,
            voucher_id: row.voucher_id,
            cancellation_reason: row.cancellation_reason,
            tracking_number: row.tracking_number,
            carrier: row.carrier,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub shop_id: Uuid,
    pub status: String,
    pub total_amount: BigDecimal,
    pub shipping_fee: BigDecimal,
    pub discount_amount: BigDecimal,
    pub address_id: Uuid,
    pub payment_method: String,
    pub notes: Option<String>,
    pub voucher_id: Option<Uuid>,
}

/// `None` fields are left untouched.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = orders)]
pub struct OrderChangeset {
    pub address_id: Option<Uuid>,
    pub shipping_fee: Option<BigDecimal>,
    pub total_amount: Option<BigDecimal>,
    pub notes: Option<String>,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub is_pay: Option<bool>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = orders)]
pub struct StatusChangeset<'a> {
    pub status: &'a str,
    pub cancellation_reason: Option<&'a str>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = order_items)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
    pub price: BigDecimal,
    pub discounted_price: BigDecimal,
    pub total_price: BigDecimal,
    pub discount: BigDecimal,
    pub tax: BigDecimal,
    pub is_reviewed: bool,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        OrderItem {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            variant_id: row.variant_id,
            quantity: row.quantity,
            price: row.price,
            discounted_price: row.discounted_price,
            total_price: row.total_price,
            discount: row.discount,
            tax: row.tax,
            is_reviewed: row.is_reviewed,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_items)]
pub struct NewOrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
    pub price: BigDecimal,
    pub discounted_price: BigDecimal,
    pub total_price: BigDecimal,
    pub discount: BigDecimal,
    pub tax: BigDecimal,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = order_history)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderHistoryRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub status: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<OrderHistoryRow> for OrderHistoryEntry {
    type Error = DomainError;

    fn try_from(row: OrderHistoryRow) -> Result<Self, Self::Error> {
        Ok(OrderHistoryEntry {
            status: parse_status(&row.status)?,
            id: row.id,
            order_id: row.order_id,
            description: row.description,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_history)]
pub struct NewOrderHistoryRow<'a> {
    pub id: Uuid,
    pub order_id: Uuid,
    pub status: &'a str,
    pub description: &'a str,
}

// ── Outbox ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = order_outbox)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OutboxEventRow {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_outbox)]
pub struct NewOutboxEventRow {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub payload: Value,
}

// ── Side-effect stores ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = cart_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartItemRow {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = cart_items)]
pub struct NewCartItemRow {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = wallet_transactions)]
pub struct NewWalletTransactionRow<'a> {
    pub id: Uuid,
    pub order_id: Uuid,
    pub owner_id: Uuid,
    pub kind: &'a str,
    pub amount: BigDecimal,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = notifications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NotificationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_id: Option<Uuid>,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = notifications)]
pub struct NewNotificationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_id: Option<Uuid>,
    pub kind: String,
    pub title: String,
    pub message: String,
}
