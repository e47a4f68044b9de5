use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(OrderStatus::Pending),
            "confirmed" => Some(OrderStatus::Confirmed),
            "shipped" => Some(OrderStatus::Shipped),
            "delivered" => Some(OrderStatus::Delivered),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

/// Lifecycle of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Issued,
    Paid,
    Void,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Issued => "issued",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Void => "void",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(InvoiceStatus::Draft),
            "issued" => Some(InvoiceStatus::Issued),
            "paid" => Some(InvoiceStatus::Paid),
            "void" => Some(InvoiceStatus::Void),
            _ => None,
        }
    }
}

/// Sub-second digits kept on every timestamp, matching what storage round-trips.
pub const TIMESTAMP_PRECISION: u16 = 6;

fn stored_precision(at: DateTime<Utc>) -> DateTime<Utc> {
    at.trunc_subsecs(TIMESTAMP_PRECISION)
}

/// A customer order.
///
/// The plural associations are `None` until resolved. A resolved association
/// with no related rows is `Some(vec![])`, so "not loaded" and "has none"
/// stay distinguishable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    /// Human-facing order number (e.g. `SO-1042`).
    pub reference: String,
    pub customer_email: String,
    pub status: OrderStatus,
    pub placed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<OrderItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipments: Option<Vec<Shipment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoices: Option<Vec<Invoice>>,
}

impl Order {
    /// Creates a pending order placed now, with no associations resolved.
    pub fn new(reference: impl Into<String>, customer_email: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            reference: reference.into(),
            customer_email: customer_email.into(),
            status: OrderStatus::Pending,
            placed_at: stored_precision(Utc::now()),
            items: None,
            shipments: None,
            invoices: None,
        }
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_placed_at(mut self, placed_at: DateTime<Utc>) -> Self {
        self.placed_at = stored_precision(placed_at);
        self
    }

    /// Returns the order with every association reset to unresolved.
    ///
    /// Cached orders are stored in this form; associations live in their own
    /// regions.
    pub fn without_associations(mut self) -> Self {
        self.items = None;
        self.shipments = None;
        self.invoices = None;
        self
    }
}

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub sku: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

impl OrderItem {
    pub fn new(order_id: Uuid, sku: impl Into<String>, quantity: u32, unit_price_cents: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            sku: sku.into(),
            quantity,
            unit_price_cents,
        }
    }

    pub fn line_total_cents(&self) -> i64 {
        i64::from(self.quantity) * self.unit_price_cents
    }
}

/// A parcel sent for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub carrier: String,
    pub tracking_code: String,
    /// `None` while the parcel has not left the warehouse.
    pub shipped_at: Option<DateTime<Utc>>,
}

impl Shipment {
    pub fn new(order_id: Uuid, carrier: impl Into<String>, tracking_code: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            carrier: carrier.into(),
            tracking_code: tracking_code.into(),
            shipped_at: None,
        }
    }

    pub fn shipped(mut self, at: DateTime<Utc>) -> Self {
        self.shipped_at = Some(stored_precision(at));
        self
    }
}

/// An invoice billed against an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub order_id: Uuid,
    /// Unique invoice number (e.g. `INV-2024-0007`).
    pub number: String,
    pub amount_cents: i64,
    pub status: InvoiceStatus,
    pub issued_at: DateTime<Utc>,
}

impl Invoice {
    pub fn new(order_id: Uuid, number: impl Into<String>, amount_cents: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            number: number.into(),
            amount_cents,
            status: InvoiceStatus::Issued,
            issued_at: stored_precision(Utc::now()),
        }
    }

    pub fn with_status(mut self, status: InvoiceStatus) -> Self {
        self.status = status;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_round_trip_strings() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("lost"), None);
    }

    #[test]
    fn test_invoice_status_parse() {
        assert_eq!(InvoiceStatus::parse("paid"), Some(InvoiceStatus::Paid));
        assert_eq!(InvoiceStatus::parse("PAID"), None);
    }

    #[test]
    fn test_new_order_has_unresolved_associations() {
        let order = Order::new("SO-1", "buyer@example.com");
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.items.is_none());
        assert!(order.shipments.is_none());
        assert!(order.invoices.is_none());
    }

    #[test]
    fn test_unresolved_associations_are_omitted_from_json() {
        let order = Order::new("SO-1", "buyer@example.com");
        let json = serde_json::to_value(&order).unwrap();
        assert!(json.get("items").is_none());
        assert_eq!(json["status"], "pending");
    }

    #[test]
    fn test_resolved_empty_association_is_kept_in_json() {
        let mut order = Order::new("SO-1", "buyer@example.com");
        order.items = Some(vec![]);
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["items"], serde_json::json!([]));
    }

    #[test]
    fn test_without_associations() {
        let mut order = Order::new("SO-1", "buyer@example.com");
        order.items = Some(vec![OrderItem::new(order.id, "SKU-1", 1, 100)]);
        order.invoices = Some(vec![]);

        let bare = order.without_associations();

        assert!(bare.items.is_none());
        assert!(bare.invoices.is_none());
    }

    #[test]
    fn test_timestamps_are_truncated_to_micros() {
        let at = DateTime::parse_from_rfc3339("2024-06-15T10:30:00.123456789Z")
            .unwrap()
            .with_timezone(&Utc);

        let order = Order::new("SO-1", "buyer@example.com").with_placed_at(at);
        let shipment = Shipment::new(order.id, "UPS", "1Z").shipped(at);

        assert_eq!(order.placed_at.timestamp_subsec_nanos(), 123_456_000);
        assert_eq!(shipment.shipped_at, Some(order.placed_at));

        let now = Order::new("SO-2", "b@example.com").placed_at;
        let issued = Invoice::new(order.id, "INV-1", 1).issued_at;
        assert_eq!(now.timestamp_subsec_nanos() % 1_000, 0);
        assert_eq!(issued.timestamp_subsec_nanos() % 1_000, 0);
    }

    #[test]
    fn test_line_total() {
        let item = OrderItem::new(Uuid::nil(), "SKU-9", 3, 1250);
        assert_eq!(item.line_total_cents(), 3750);
    }
}
