//! SQLite row conversion functions.
//!
//! Pure functions for converting between SQLite rows and domain types.
//! Child rows are returned tagged with their order id so the stitcher can
//! route them.

use chrono::{DateTime, Utc};
use rusqlite::Row;
use uuid::Uuid;

use shipledger_core::order::{Invoice, InvoiceStatus, Order, OrderItem, OrderStatus, Shipment};
use shipledger_core::stitch::ChildRow;

/// Convert a SQLite row to an Order with no associations resolved.
///
/// Expected columns: id, reference, customer_email, status, placed_at
pub fn row_to_order(row: &Row) -> rusqlite::Result<Order> {
    let id: String = row.get(0)?;
    let reference: String = row.get(1)?;
    let customer_email: String = row.get(2)?;
    let status: String = row.get(3)?;
    let placed_at: String = row.get(4)?;

    Ok(Order {
        id: parse_uuid(&id)?,
        reference,
        customer_email,
        status: parse_order_status(&status)?,
        placed_at: parse_datetime(&placed_at)?,
        items: None,
        shipments: None,
        invoices: None,
    })
}

/// Expected columns: id, order_id, sku, quantity, unit_price_cents
pub fn row_to_item(row: &Row) -> rusqlite::Result<ChildRow<Uuid, OrderItem>> {
    let id: String = row.get(0)?;
    let order_id: String = row.get(1)?;
    let sku: String = row.get(2)?;
    let quantity: u32 = row.get(3)?;
    let unit_price_cents: i64 = row.get(4)?;

    let order_id = parse_uuid(&order_id)?;
    Ok(ChildRow::new(
        order_id,
        OrderItem {
            id: parse_uuid(&id)?,
            order_id,
            sku,
            quantity,
            unit_price_cents,
        },
    ))
}

/// Expected columns: id, order_id, carrier, tracking_code, shipped_at
pub fn row_to_shipment(row: &Row) -> rusqlite::Result<ChildRow<Uuid, Shipment>> {
    let id: String = row.get(0)?;
    let order_id: String = row.get(1)?;
    let carrier: String = row.get(2)?;
    let tracking_code: String = row.get(3)?;
    let shipped_at: Option<String> = row.get(4)?;

    let order_id = parse_uuid(&order_id)?;
    Ok(ChildRow::new(
        order_id,
        Shipment {
            id: parse_uuid(&id)?,
            order_id,
            carrier,
            tracking_code,
            shipped_at: shipped_at.as_deref().map(parse_datetime).transpose()?,
        },
    ))
}

/// Expected columns: id, order_id, number, amount_cents, status, issued_at
pub fn row_to_invoice(row: &Row) -> rusqlite::Result<ChildRow<Uuid, Invoice>> {
    let id: String = row.get(0)?;
    let order_id: String = row.get(1)?;
    let number: String = row.get(2)?;
    let amount_cents: i64 = row.get(3)?;
    let status: String = row.get(4)?;
    let issued_at: String = row.get(5)?;

    let order_id = parse_uuid(&order_id)?;
    Ok(ChildRow::new(
        order_id,
        Invoice {
            id: parse_uuid(&id)?,
            order_id,
            number,
            amount_cents,
            status: parse_invoice_status(&status)?,
            issued_at: parse_datetime(&issued_at)?,
        },
    ))
}

// ============================================================================
// Helper functions
// ============================================================================

fn conversion_error(err: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(err))
}

/// Parse a UUID from string.
fn parse_uuid(s: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(s).map_err(conversion_error)
}

/// Parse a datetime from RFC 3339 string.
fn parse_datetime(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(conversion_error)
}

fn parse_order_status(s: &str) -> rusqlite::Result<OrderStatus> {
    OrderStatus::parse(s).ok_or_else(|| unknown_value("order status", s))
}

fn parse_invoice_status(s: &str) -> rusqlite::Result<InvoiceStatus> {
    InvoiceStatus::parse(s).ok_or_else(|| unknown_value("invoice status", s))
}

fn unknown_value(what: &str, value: &str) -> rusqlite::Error {
    conversion_error(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("Unknown {what}: {value}"),
    ))
}

/// Format a DateTime<Utc> for SQLite storage (RFC 3339).
///
/// Fixed-width UTC with microseconds so that lexical order matches
/// chronological order in `ORDER BY placed_at`.
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}
