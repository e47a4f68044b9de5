//! SQLite schema definitions and SQL query constants.
//!
//! Pure data, no I/O. Batched association queries are built at runtime with
//! [`select_by_order_ids`] because their placeholder count depends on the
//! batch size.

/// Enables foreign key enforcement for the connection.
pub const ENABLE_FOREIGN_KEYS: &str = "PRAGMA foreign_keys = ON;";

/// SQL statement to create all tables.
pub const CREATE_TABLES: &str = r#"
-- Orders table
CREATE TABLE IF NOT EXISTS orders (
    id TEXT PRIMARY KEY,
    reference TEXT NOT NULL UNIQUE,
    customer_email TEXT NOT NULL,
    status TEXT NOT NULL,
    placed_at TEXT NOT NULL
);

-- Order line items table
CREATE TABLE IF NOT EXISTS order_items (
    id TEXT PRIMARY KEY,
    order_id TEXT NOT NULL,
    sku TEXT NOT NULL,
    quantity INTEGER NOT NULL,
    unit_price_cents INTEGER NOT NULL,
    FOREIGN KEY (order_id) REFERENCES orders(id) ON DELETE CASCADE
);

-- Shipments table
CREATE TABLE IF NOT EXISTS shipments (
    id TEXT PRIMARY KEY,
    order_id TEXT NOT NULL,
    carrier TEXT NOT NULL,
    tracking_code TEXT NOT NULL,
    shipped_at TEXT,
    FOREIGN KEY (order_id) REFERENCES orders(id) ON DELETE CASCADE
);

-- Invoices table
CREATE TABLE IF NOT EXISTS invoices (
    id TEXT PRIMARY KEY,
    order_id TEXT NOT NULL,
    number TEXT NOT NULL UNIQUE,
    amount_cents INTEGER NOT NULL,
    status TEXT NOT NULL,
    issued_at TEXT NOT NULL,
    FOREIGN KEY (order_id) REFERENCES orders(id) ON DELETE CASCADE
);

-- Indexes for efficient queries
CREATE INDEX IF NOT EXISTS idx_orders_placed_at ON orders(placed_at);
CREATE INDEX IF NOT EXISTS idx_order_items_order_id ON order_items(order_id);
CREATE INDEX IF NOT EXISTS idx_shipments_order_id ON shipments(order_id);
CREATE INDEX IF NOT EXISTS idx_invoices_order_id ON invoices(order_id);
"#;

// Order queries
pub const INSERT_ORDER: &str = r#"
INSERT INTO orders (id, reference, customer_email, status, placed_at)
VALUES (?1, ?2, ?3, ?4, ?5)
"#;

pub const SELECT_ORDER_BY_ID: &str = r#"
SELECT id, reference, customer_email, status, placed_at
FROM orders
WHERE id = ?1
"#;

/// Newest first; `id` breaks ties so pages are stable.
pub const SELECT_ORDERS_PAGE: &str = r#"
SELECT id, reference, customer_email, status, placed_at
FROM orders
ORDER BY placed_at DESC, id ASC
LIMIT ?1 OFFSET ?2
"#;

pub const COUNT_ORDERS: &str = "SELECT COUNT(*) FROM orders";

pub const UPDATE_ORDER_STATUS: &str = r#"
UPDATE orders
SET status = ?2
WHERE id = ?1
"#;

// Item queries
pub const INSERT_ITEM: &str = r#"
INSERT INTO order_items (id, order_id, sku, quantity, unit_price_cents)
VALUES (?1, ?2, ?3, ?4, ?5)
"#;

pub const ITEM_COLUMNS: &str = "id, order_id, sku, quantity, unit_price_cents";

// Shipment queries
pub const INSERT_SHIPMENT: &str = r#"
INSERT INTO shipments (id, order_id, carrier, tracking_code, shipped_at)
VALUES (?1, ?2, ?3, ?4, ?5)
"#;

pub const SHIPMENT_COLUMNS: &str = "id, order_id, carrier, tracking_code, shipped_at";

// Invoice queries
pub const INSERT_INVOICE: &str = r#"
INSERT INTO invoices (id, order_id, number, amount_cents, status, issued_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)
"#;

pub const INVOICE_COLUMNS: &str = "id, order_id, number, amount_cents, status, issued_at";

/// Highest number of bound parameters one statement may carry
/// (`SQLITE_MAX_VARIABLE_NUMBER` in the bundled SQLite).
pub const MAX_BOUND_PARAMETERS: usize = 32_766;

/// Comma-separated numbered placeholders: `?1, ?2, ..., ?n`.
pub fn in_placeholders(count: usize) -> String {
    (1..=count)
        .map(|n| format!("?{n}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Selects every child row of a batch of orders in a single statement.
///
/// Rows are ordered by `rowid` within the table, i.e. insertion order, so
/// children of one order come back in the order they were added. `count`
/// must not exceed [`MAX_BOUND_PARAMETERS`].
pub fn select_by_order_ids(table: &str, columns: &str, count: usize) -> String {
    format!(
        "SELECT {columns} FROM {table} WHERE order_id IN ({}) ORDER BY rowid",
        in_placeholders(count)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_tables_is_valid_sql() {
        assert!(CREATE_TABLES.contains("CREATE TABLE IF NOT EXISTS orders"));
        assert!(CREATE_TABLES.contains("CREATE TABLE IF NOT EXISTS order_items"));
        assert!(CREATE_TABLES.contains("CREATE TABLE IF NOT EXISTS shipments"));
        assert!(CREATE_TABLES.contains("CREATE TABLE IF NOT EXISTS invoices"));
    }

    #[test]
    fn test_queries_contain_expected_keywords() {
        assert!(INSERT_ORDER.contains("INSERT"));
        assert!(SELECT_ORDER_BY_ID.contains("WHERE id = ?1"));
        assert!(SELECT_ORDERS_PAGE.contains("ORDER BY placed_at DESC"));
        assert!(UPDATE_ORDER_STATUS.contains("UPDATE"));
        assert!(INSERT_ITEM.contains("order_items"));
        assert!(INSERT_SHIPMENT.contains("shipments"));
        assert!(INSERT_INVOICE.contains("invoices"));
    }

    #[test]
    fn test_in_placeholders() {
        assert_eq!(in_placeholders(1), "?1");
        assert_eq!(in_placeholders(3), "?1, ?2, ?3");
        assert_eq!(in_placeholders(0), "");
    }

    #[test]
    fn test_select_by_order_ids() {
        assert_eq!(
            select_by_order_ids("shipments", SHIPMENT_COLUMNS, 2),
            "SELECT id, order_id, carrier, tracking_code, shipped_at FROM shipments \
             WHERE order_id IN (?1, ?2) ORDER BY rowid"
        );
    }
}
