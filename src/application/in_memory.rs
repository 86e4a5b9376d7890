//! In-memory `OrderRepository` used by the service tests. Each transaction
//! works on a copy of the store and only publishes it on success, which
//! gives the same all-or-nothing behaviour as the Postgres adapter.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use bigdecimal::BigDecimal;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::events::OrderEvent;
use crate::domain::order::{
    ListResult, NewOrder, NewOrderItem, Order, OrderDetails, OrderFilter, OrderHistoryEntry,
    OrderItem, OrderPatch, OrderStatus, Product, ProductVariant, SortField, SortOrder,
};
use crate::domain::ports::{OrderRepository, UnitOfWork};

#[derive(Debug, Clone, Default)]
struct Store {
    products: HashMap<Uuid, Product>,
    variants: HashMap<Uuid, ProductVariant>,
    orders: Vec<Order>,
    items: Vec<OrderItem>,
    history: Vec<OrderHistoryEntry>,
    events: Vec<OrderEvent>,
}

#[derive(Clone, Default)]
pub struct InMemoryRepository {
    store: Arc<Mutex<Store>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().expect("store mutex poisoned")
    }

    pub fn add_product(&self, shop_id: Uuid, price: &str, discount: &str, stock: i32) -> Uuid {
        let id = Uuid::new_v4();
        self.lock().products.insert(
            id,
            Product {
                id,
                shop_id,
                name: format!("product-{}", id),
                price: BigDecimal::from_str(price).expect("valid price"),
                discount: BigDecimal::from_str(discount).expect("valid discount"),
                stock,
            },
        );
        id
    }

    pub fn add_variant(&self, product_id: Uuid, price: &str, stock: i32) -> Uuid {
        let id = Uuid::new_v4();
        self.lock().variants.insert(
            id,
            ProductVariant {
                id,
                product_id,
                name: format!("variant-{}", id),
                price: BigDecimal::from_str(price).expect("valid price"),
                stock,
            },
        );
        id
    }

    pub fn product_stock(&self, id: Uuid) -> i32 {
        self.lock().products[&id].stock
    }

    pub fn variant_stock(&self, id: Uuid) -> i32 {
        self.lock().variants[&id].stock
    }

    pub fn order_count(&self) -> usize {
        self.lock().orders.len()
    }

    pub fn item_count(&self) -> usize {
        self.lock().items.len()
    }

    pub fn history_count(&self) -> usize {
        self.lock().history.len()
    }

    pub fn events(&self) -> Vec<OrderEvent> {
        self.lock().events.clone()
    }
}

impl OrderRepository for InMemoryRepository {
    fn transaction<T, F>(&self, f: F) -> Result<T, DomainError>
    where
        F: FnOnce(&mut dyn UnitOfWork) -> Result<T, DomainError>,
    {
        let mut guard = self.lock();
        let mut working = guard.clone();
        let value = f(&mut working)?;
        *guard = working;
        Ok(value)
    }

    fn find_details(&self, id: Uuid) -> Result<Option<OrderDetails>, DomainError> {
        let store = self.lock();
        let Some(order) = store.orders.iter().find(|o| o.id == id).cloned() else {
            return Ok(None);
        };
        Ok(Some(OrderDetails {
            items: store
                .items
                .iter()
                .filter(|i| i.order_id == id)
                .cloned()
                .collect(),
            history: store
                .history
                .iter()
                .filter(|h| h.order_id == id)
                .cloned()
                .collect(),
            order,
        }))
    }

    fn list(&self, filter: &OrderFilter) -> Result<ListResult, DomainError> {
        let store = self.lock();
        let mut matching: Vec<Order> = store
            .orders
            .iter()
            .filter(|o| filter.user_id.map_or(true, |u| o.user_id == u))
            .filter(|o| filter.shop_id.map_or(true, |s| o.shop_id == s))
            .filter(|o| filter.status.map_or(true, |s| o.status == s))
            .cloned()
            .collect();

        matching.sort_by(|a, b| {
            let ord = match filter.sort_by {
                SortField::CreatedAt => a.created_at.cmp(&b.created_at),
                SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
                SortField::TotalAmount => a.total_amount.cmp(&b.total_amount),
                SortField::Status => a.status.as_str().cmp(b.status.as_str()),
            };
            match filter.sort_order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });

        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(usize::try_from(filter.offset()).unwrap_or(usize::MAX))
            .take(filter.limit as usize)
            .collect();
        Ok(ListResult { items, total })
    }

    fn update(&self, id: Uuid, patch: &OrderPatch) -> Result<Option<Order>, DomainError> {
        let mut store = self.lock();
        let Some(order) = store.orders.iter_mut().find(|o| o.id == id) else {
            return Ok(None);
        };
        if let Some(address_id) = patch.address_id {
            order.address_id = address_id;
        }
        if let Some(fee) = &patch.shipping_fee {
            order.total_amount = &order.total_amount - &order.shipping_fee + fee;
            order.shipping_fee = fee.clone();
        }
        if let Some(notes) = &patch.notes {
            order.notes = Some(notes.clone());
        }
        if let Some(tracking) = &patch.tracking_number {
            order.tracking_number = Some(tracking.clone());
        }
        if let Some(carrier) = &patch.carrier {
            order.carrier = Some(carrier.clone());
        }
        if let Some(is_pay) = patch.is_pay {
            order.is_pay = is_pay;
        }
        order.updated_at = Utc::now();
        Ok(Some(order.clone()))
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut store = self.lock();
        let before = store.orders.len();
        store.orders.retain(|o| o.id != id);
        store.items.retain(|i| i.order_id != id);
        store.history.retain(|h| h.order_id != id);
        Ok(store.orders.len() != before)
    }
}

impl UnitOfWork for Store {
    fn find_product(&mut self, id: Uuid) -> Result<Option<Product>, DomainError> {
        Ok(self.products.get(&id).cloned())
    }

    fn find_variant(
        &mut self,
        product_id: Uuid,
        variant_id: Uuid,
    ) -> Result<Option<ProductVariant>, DomainError> {
        Ok(self
            .variants
            .get(&variant_id)
            .filter(|v| v.product_id == product_id)
            .cloned())
    }

    fn reserve_product_stock(
        &mut self,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<bool, DomainError> {
        match self.products.get_mut(&product_id) {
            Some(p) if p.stock >= quantity => {
                p.stock -= quantity;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn reserve_variant_stock(
        &mut self,
        variant_id: Uuid,
        quantity: i32,
    ) -> Result<bool, DomainError> {
        match self.variants.get_mut(&variant_id) {
            Some(v) if v.stock >= quantity => {
                v.stock -= quantity;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn restock_product(&mut self, product_id: Uuid, quantity: i32) -> Result<(), DomainError> {
        if let Some(p) = self.products.get_mut(&product_id) {
            p.stock += quantity;
        }
        Ok(())
    }

    fn restock_variant(&mut self, variant_id: Uuid, quantity: i32) -> Result<(), DomainError> {
        if let Some(v) = self.variants.get_mut(&variant_id) {
            v.stock += quantity;
        }
        Ok(())
    }

    fn insert_order(&mut self, order: NewOrder) -> Result<Order, DomainError> {
        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            user_id: order.user_id,
            shop_id: order.shop_id,
            status: OrderStatus::Pending,
            total_amount: order.total_amount,
            shipping_fee: order.shipping_fee,
            discount_amount: order.discount_amount,
            is_pay: false,
            wallet_transferred: false,
            address_id: order.address_id,
            payment_method: order.payment_method,
            notes: order.notes,
            voucher_id: order.voucher_id,
            cancellation_reason: None,
            tracking_number: None,
            carrier: None,
            created_at: now,
            updated_at: now,
        };
        self.orders.push(order.clone());
        Ok(order)
    }

    fn insert_items(&mut self, items: Vec<NewOrderItem>) -> Result<Vec<OrderItem>, DomainError> {
        let inserted: Vec<OrderItem> = items
            .into_iter()
            .map(|i| OrderItem {
                id: Uuid::new_v4(),
                order_id: i.order_id,
                product_id: i.product_id,
                variant_id: i.variant_id,
                quantity: i.quantity,
                price: i.price,
                discounted_price: i.discounted_price,
                total_price: i.total_price,
                discount: i.discount,
                tax: i.tax,
                is_reviewed: false,
            })
            .collect();
        self.items.extend(inserted.iter().cloned());
        Ok(inserted)
    }

    fn lock_order(&mut self, id: Uuid) -> Result<Option<Order>, DomainError> {
        Ok(self.orders.iter().find(|o| o.id == id).cloned())
    }

    fn order_items(&mut self, order_id: Uuid) -> Result<Vec<OrderItem>, DomainError> {
        Ok(self
            .items
            .iter()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect())
    }

    fn set_status(
        &mut self,
        id: Uuid,
        status: OrderStatus,
        cancellation_reason: Option<&str>,
    ) -> Result<Option<Order>, DomainError> {
        let Some(order) = self.orders.iter_mut().find(|o| o.id == id) else {
            return Ok(None);
        };
        order.status = status;
        if let Some(reason) = cancellation_reason {
            order.cancellation_reason = Some(reason.to_string());
        }
        order.updated_at = Utc::now();
        Ok(Some(order.clone()))
    }

    fn append_history(
        &mut self,
        order_id: Uuid,
        status: OrderStatus,
        description: &str,
    ) -> Result<OrderHistoryEntry, DomainError> {
        let entry = OrderHistoryEntry {
            id: Uuid::new_v4(),
            order_id,
            status,
            description: description.to_string(),
            created_at: Utc::now(),
        };
        self.history.push(entry.clone());
        Ok(entry)
    }

    fn record_event(&mut self, event: &OrderEvent) -> Result<(), DomainError> {
        self.events.push(event.clone());
        Ok(())
    }
}
