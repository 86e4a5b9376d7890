use uuid::Uuid;

use super::errors::DomainError;
use super::events::OrderEvent;
use super::order::{
    ListResult, NewOrder, NewOrderItem, Order, OrderDetails, OrderFilter, OrderHistoryEntry,
    OrderItem, OrderPatch, OrderStatus, Product, ProductVariant,
};

/// Transaction-scoped access to the store. Everything done through one
/// `UnitOfWork` commits or rolls back together.
pub trait UnitOfWork {
    fn find_product(&mut self, id: Uuid) -> Result<Option<Product>, DomainError>;
    fn find_variant(
        &mut self,
        product_id: Uuid,
        variant_id: Uuid,
    ) -> Result<Option<ProductVariant>, DomainError>;

    /// Decrements stock only if at least `quantity` is available. Returns
    /// whether the reservation happened.
    fn reserve_product_stock(&mut self, product_id: Uuid, quantity: i32)
        -> Result<bool, DomainError>;
    fn reserve_variant_stock(&mut self, variant_id: Uuid, quantity: i32)
        -> Result<bool, DomainError>;
    fn restock_product(&mut self, product_id: Uuid, quantity: i32) -> Result<(), DomainError>;
    fn restock_variant(&mut self, variant_id: Uuid, quantity: i32) -> Result<(), DomainError>;

    fn insert_order(&mut self, order: NewOrder) -> Result<Order, DomainError>;
    fn insert_items(&mut self, items: Vec<NewOrderItem>) -> Result<Vec<OrderItem>, DomainError>;

    /// Loads an order and holds it against concurrent writers until commit.
    fn lock_order(&mut self, id: Uuid) -> Result<Option<Order>, DomainError>;
    fn order_items(&mut self, order_id: Uuid) -> Result<Vec<OrderItem>, DomainError>;
    fn set_status(
        &mut self,
        id: Uuid,
        status: OrderStatus,
        cancellation_reason: Option<&str>,
    ) -> Result<Option<Order>, DomainError>;
    fn append_history(
        &mut self,
        order_id: Uuid,
        status: OrderStatus,
        description: &str,
    ) -> Result<OrderHistoryEntry, DomainError>;

    /// Queues an event in the outbox for delivery after commit.
    fn record_event(&mut self, event: &OrderEvent) -> Result<(), DomainError>;
}

pub trait OrderRepository: Send + Sync + 'static {
    fn transaction<T, F>(&self, f: F) -> Result<T, DomainError>
    where
        F: FnOnce(&mut dyn UnitOfWork) -> Result<T, DomainError>;

    fn find_details(&self, id: Uuid) -> Result<Option<OrderDetails>, DomainError>;
    fn list(&self, filter: &OrderFilter) -> Result<ListResult, DomainError>;
    fn update(&self, id: Uuid, patch: &OrderPatch) -> Result<Option<Order>, DomainError>;
    fn delete(&self, id: Uuid) -> Result<bool, DomainError>;
}

/// Subscriber for events relayed from the outbox. Failures are reported to
/// the relay, which logs them and moves on.
pub trait OrderEventHandler: Send + Sync + 'static {
    fn name(&self) -> &'static str;
    fn handle(&self, event: &OrderEvent) -> Result<(), DomainError>;
}
