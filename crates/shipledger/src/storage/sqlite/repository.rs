//! SQLite repository implementation.
//!
//! Implements `OrderRepository` and the order association loaders from
//! `shipledger_core` using SQLite.

use async_trait::async_trait;
use rusqlite::Row;
use tokio_rusqlite::Connection;
use uuid::Uuid;

use shipledger_core::order::{
    Invoice, Order, OrderInvoices, OrderItem, OrderItems, OrderShipments, OrderStatus, Shipment,
};
use shipledger_core::stitch::{AssociationLoader, ChildRow};
use shipledger_core::storage::{OrderRepository, Page, PageRequest, RepositoryError, Result};

use super::conversions::{
    format_datetime, row_to_invoice, row_to_item, row_to_order, row_to_shipment,
};
use super::error::{map_tokio_rusqlite_error, map_tokio_rusqlite_error_with_id};
use super::schema;

/// Helper to wrap rusqlite errors for tokio_rusqlite closures.
fn wrap_err(e: rusqlite::Error) -> tokio_rusqlite::Error {
    tokio_rusqlite::Error::Rusqlite(e)
}

type RowMapper<C> = fn(&Row<'_>) -> rusqlite::Result<ChildRow<Uuid, C>>;

/// SQLite-based repository implementation.
pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    /// Creates a new repository with a file-based database.
    ///
    /// The database file will be created if it doesn't exist.
    /// Schema tables are created automatically.
    pub async fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

        Self::init_schema(&conn).await?;

        Ok(Self { conn })
    }

    /// Creates a new repository with an in-memory database.
    ///
    /// Useful for testing - data is lost when the connection is dropped.
    pub async fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

        Self::init_schema(&conn).await?;

        Ok(Self { conn })
    }

    /// Initialize the database schema.
    async fn init_schema(conn: &Connection) -> Result<()> {
        conn.call(|conn| {
            conn.execute_batch(schema::ENABLE_FOREIGN_KEYS)
                .map_err(wrap_err)?;
            conn.execute_batch(schema::CREATE_TABLES)
                .map_err(wrap_err)?;
            Ok(())
        })
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))
    }

    /// Loads the rows of `table` belonging to any of `order_ids` with one
    /// `IN (...)` query.
    ///
    /// Batches larger than SQLite's bound-parameter limit are split into
    /// several statements inside the same connection call. Every id lands in
    /// exactly one statement, so each order's rows keep their relative order.
    async fn load_by_order_ids<C: Send + 'static>(
        &self,
        table: &'static str,
        columns: &'static str,
        entity_type: &'static str,
        order_ids: &[Uuid],
        convert: RowMapper<C>,
    ) -> Result<Vec<ChildRow<Uuid, C>>> {
        if order_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = order_ids.iter().map(Uuid::to_string).collect();

        self.conn
            .call(move |conn| {
                let mut children = Vec::new();
                for chunk in ids.chunks(schema::MAX_BOUND_PARAMETERS) {
                    let sql = schema::select_by_order_ids(table, columns, chunk.len());
                    let mut stmt = conn.prepare(&sql).map_err(wrap_err)?;
                    let rows = stmt
                        .query_map(rusqlite::params_from_iter(chunk.iter()), convert)
                        .map_err(wrap_err)?;

                    for row_result in rows {
                        children.push(row_result.map_err(wrap_err)?);
                    }
                }
                Ok(children)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, entity_type))
    }
}

// ============================================================================
// OrderRepository implementation
// ============================================================================

#[async_trait]
impl OrderRepository for SqliteRepository {
    async fn get_order(&self, id: Uuid) -> Result<Option<Order>> {
        let id_str = id.to_string();

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(schema::SELECT_ORDER_BY_ID).map_err(wrap_err)?;
                match stmt.query_row([&id_str], row_to_order) {
                    Ok(order) => Ok(Some(order)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(wrap_err(e)),
                }
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "Order", id.to_string()))
    }

    async fn list_orders(&self, request: PageRequest) -> Result<Page<Order>> {
        let limit = i64::from(request.size);
        let offset = i64::try_from(request.offset()).map_err(|_| {
            RepositoryError::InvalidData(format!("page {} is out of range", request.page))
        })?;

        let (orders, total) = self
            .conn
            .call(move |conn| {
                let total: i64 = conn
                    .query_row(schema::COUNT_ORDERS, [], |row| row.get(0))
                    .map_err(wrap_err)?;

                let mut stmt = conn.prepare(schema::SELECT_ORDERS_PAGE).map_err(wrap_err)?;
                let rows = stmt
                    .query_map(rusqlite::params![limit, offset], row_to_order)
                    .map_err(wrap_err)?;

                let mut orders = Vec::new();
                for row_result in rows {
                    orders.push(row_result.map_err(wrap_err)?);
                }
                Ok((orders, total))
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, "Order"))?;

        Ok(Page::new(orders, request, total.max(0) as u64))
    }

    async fn create_order(&self, order: &Order) -> Result<()> {
        let id = order.id.to_string();
        let reference = order.reference.clone();
        let customer_email = order.customer_email.clone();
        let status = order.status.as_str();
        let placed_at = format_datetime(&order.placed_at);

        self.conn
            .call(move |conn| {
                conn.execute(
                    schema::INSERT_ORDER,
                    rusqlite::params![id, reference, customer_email, status, placed_at],
                )
                .map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "Order", order.reference.clone()))
    }

    async fn update_order_status(&self, id: Uuid, status: OrderStatus) -> Result<()> {
        let id_str = id.to_string();
        let status = status.as_str();

        self.conn
            .call(move |conn| {
                let rows = conn
                    .execute(schema::UPDATE_ORDER_STATUS, rusqlite::params![id_str, status])
                    .map_err(wrap_err)?;
                if rows == 0 {
                    Err(wrap_err(rusqlite::Error::QueryReturnedNoRows))
                } else {
                    Ok(())
                }
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "Order", id.to_string()))
    }

    async fn add_item(&self, item: &OrderItem) -> Result<()> {
        let id = item.id.to_string();
        let order_id = item.order_id.to_string();
        let sku = item.sku.clone();
        let quantity = item.quantity;
        let unit_price_cents = item.unit_price_cents;

        self.conn
            .call(move |conn| {
                conn.execute(
                    schema::INSERT_ITEM,
                    rusqlite::params![id, order_id, sku, quantity, unit_price_cents],
                )
                .map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "OrderItem", item.id.to_string()))
    }

    async fn add_shipment(&self, shipment: &Shipment) -> Result<()> {
        let id = shipment.id.to_string();
        let order_id = shipment.order_id.to_string();
        let carrier = shipment.carrier.clone();
        let tracking_code = shipment.tracking_code.clone();
        let shipped_at = shipment.shipped_at.as_ref().map(format_datetime);

        self.conn
            .call(move |conn| {
                conn.execute(
                    schema::INSERT_SHIPMENT,
                    rusqlite::params![id, order_id, carrier, tracking_code, shipped_at],
                )
                .map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "Shipment", shipment.id.to_string()))
    }

    async fn add_invoice(&self, invoice: &Invoice) -> Result<()> {
        let id = invoice.id.to_string();
        let order_id = invoice.order_id.to_string();
        let number = invoice.number.clone();
        let amount_cents = invoice.amount_cents;
        let status = invoice.status.as_str();
        let issued_at = format_datetime(&invoice.issued_at);

        self.conn
            .call(move |conn| {
                conn.execute(
                    schema::INSERT_INVOICE,
                    rusqlite::params![id, order_id, number, amount_cents, status, issued_at],
                )
                .map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error_with_id(e, "Invoice", invoice.number.clone()))
    }
}

// ============================================================================
// Association loaders
// ============================================================================

#[async_trait]
impl AssociationLoader<OrderItems> for SqliteRepository {
    async fn load_children(&self, order_ids: &[Uuid]) -> Result<Vec<ChildRow<Uuid, OrderItem>>> {
        self.load_by_order_ids(
            "order_items",
            schema::ITEM_COLUMNS,
            "OrderItem",
            order_ids,
            row_to_item,
        )
        .await
    }
}

#[async_trait]
impl AssociationLoader<OrderShipments> for SqliteRepository {
    async fn load_children(&self, order_ids: &[Uuid]) -> Result<Vec<ChildRow<Uuid, Shipment>>> {
        self.load_by_order_ids(
            "shipments",
            schema::SHIPMENT_COLUMNS,
            "Shipment",
            order_ids,
            row_to_shipment,
        )
        .await
    }
}

#[async_trait]
impl AssociationLoader<OrderInvoices> for SqliteRepository {
    async fn load_children(&self, order_ids: &[Uuid]) -> Result<Vec<ChildRow<Uuid, Invoice>>> {
        self.load_by_order_ids(
            "invoices",
            schema::INVOICE_COLUMNS,
            "Invoice",
            order_ids,
            row_to_invoice,
        )
        .await
    }
}
