mod associations;
mod types;

pub use associations::{
    association_by_name, OrderAssociation, OrderInvoices, OrderItems, OrderShipments,
    ASSOCIATION_NAMES, CACHE_REGIONS, ORDERS_REGION, ORDER_INVOICES_REGION, ORDER_ITEMS_REGION,
    ORDER_SHIPMENTS_REGION,
};
pub use types::{
    Invoice, InvoiceStatus, Order, OrderItem, OrderStatus, Shipment, TIMESTAMP_PRECISION,
};
