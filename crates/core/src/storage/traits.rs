use async_trait::async_trait;
use uuid::Uuid;

use crate::order::{Invoice, Order, OrderItem, OrderStatus, Shipment};

use super::{Page, PageRequest, Result};

/// Repository for orders and the records attached to them.
///
/// Orders are always returned with their associations unresolved; callers
/// resolve them in batch through the collection stitcher.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Gets an order by its ID.
    async fn get_order(&self, id: Uuid) -> Result<Option<Order>>;

    /// Lists orders, newest first, one page at a time.
    async fn list_orders(&self, request: PageRequest) -> Result<Page<Order>>;

    /// Creates a new order.
    async fn create_order(&self, order: &Order) -> Result<()>;

    /// Moves an order to a new status.
    async fn update_order_status(&self, id: Uuid, status: OrderStatus) -> Result<()>;

    /// Adds a line to an existing order.
    async fn add_item(&self, item: &OrderItem) -> Result<()>;

    /// Records a shipment for an existing order.
    async fn add_shipment(&self, shipment: &Shipment) -> Result<()>;

    /// Records an invoice for an existing order.
    async fn add_invoice(&self, invoice: &Invoice) -> Result<()>;
}
