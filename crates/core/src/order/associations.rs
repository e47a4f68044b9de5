//! Plural associations of [`Order`] and the cache regions backing them.

use uuid::Uuid;

use crate::stitch::{Entity, PluralAssociation};

use super::{Invoice, Order, OrderItem, Shipment};

/// Region caching orders by id, without their associations.
pub const ORDERS_REGION: &str = "orders";
/// Region caching each order's items, keyed by order id.
pub const ORDER_ITEMS_REGION: &str = "orders.items";
/// Region caching each order's shipments, keyed by order id.
pub const ORDER_SHIPMENTS_REGION: &str = "orders.shipments";
/// Region caching each order's invoices, keyed by order id.
pub const ORDER_INVOICES_REGION: &str = "orders.invoices";

/// Every cache region provisioned at startup: one per cacheable entity and
/// one per entity/association pair.
pub const CACHE_REGIONS: &[&str] = &[
    ORDERS_REGION,
    ORDER_ITEMS_REGION,
    ORDER_SHIPMENTS_REGION,
    ORDER_INVOICES_REGION,
];

impl Entity for Order {
    type Id = Uuid;

    fn id(&self) -> Uuid {
        self.id
    }
}

/// `Order.items`
pub struct OrderItems;

impl PluralAssociation for OrderItems {
    type Parent = Order;
    type Child = OrderItem;

    const NAME: &'static str = "items";

    fn attach(parent: &mut Order, children: Vec<OrderItem>) {
        parent.items = Some(children);
    }
}

/// `Order.shipments`
pub struct OrderShipments;

impl PluralAssociation for OrderShipments {
    type Parent = Order;
    type Child = Shipment;

    const NAME: &'static str = "shipments";

    fn attach(parent: &mut Order, children: Vec<Shipment>) {
        parent.shipments = Some(children);
    }
}

/// `Order.invoices`
pub struct OrderInvoices;

impl PluralAssociation for OrderInvoices {
    type Parent = Order;
    type Child = Invoice;

    const NAME: &'static str = "invoices";

    fn attach(parent: &mut Order, children: Vec<Invoice>) {
        parent.invoices = Some(children);
    }
}

/// Names accepted by [`association_by_name`].
pub const ASSOCIATION_NAMES: &[&str] = &[
    OrderItems::NAME,
    OrderShipments::NAME,
    OrderInvoices::NAME,
];

/// An order association selected at runtime (e.g. from a CLI flag).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderAssociation {
    Items,
    Shipments,
    Invoices,
}

/// Looks up an order association by its name.
pub fn association_by_name(name: &str) -> Option<OrderAssociation> {
    match name {
        OrderItems::NAME => Some(OrderAssociation::Items),
        OrderShipments::NAME => Some(OrderAssociation::Shipments),
        OrderInvoices::NAME => Some(OrderAssociation::Invoices),
        _ => None,
    }
}
