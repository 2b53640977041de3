// SQLite-backed order store

use std::path::Path;

use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};

use hermes_core::store::{compare_recency, prepare_for_write};
use hermes_core::{Executor, Order, OrderField, OrderStatus, OrderStore, SortDirection, StoreError};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS orders (
    id TEXT PRIMARY KEY,
    order_number TEXT NOT NULL UNIQUE,
    bottom_number TEXT NOT NULL DEFAULT '',
    date TEXT NOT NULL DEFAULT '',
    diameter TEXT NOT NULL DEFAULT '',
    thickness TEXT NOT NULL DEFAULT '',
    type_size TEXT NOT NULL DEFAULT '',
    cutting TEXT NOT NULL DEFAULT '',
    material TEXT NOT NULL DEFAULT '',
    heat_treatment TEXT NOT NULL DEFAULT '',
    treatment_date TEXT NOT NULL DEFAULT '',
    executors TEXT NOT NULL DEFAULT '[]',   -- JSON array of 6 {name, date}
    status TEXT NOT NULL DEFAULT 'active',  -- active | deleted
    created_at TEXT NOT NULL DEFAULT '',
    updated_at TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_orders_bottom_number ON orders(bottom_number);
CREATE INDEX IF NOT EXISTS idx_orders_date ON orders(date);
CREATE INDEX IF NOT EXISTS idx_orders_material ON orders(material);
CREATE INDEX IF NOT EXISTS idx_orders_created_at ON orders(created_at);

CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Bump when the table layout changes in a way old files can't be read.
pub const SCHEMA_VERSION: u32 = 1;

const SELECT_COLUMNS: &str = "id, order_number, bottom_number, date, diameter, thickness, \
     type_size, cutting, material, heat_treatment, treatment_date, executors, status, \
     created_at, updated_at";

const INSERT: &str = "INSERT INTO orders (id, order_number, bottom_number, date, diameter, \
     thickness, type_size, cutting, material, heat_treatment, treatment_date, executors, \
     status, created_at, updated_at) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)";

const UPSERT_TAIL: &str = " ON CONFLICT(id) DO UPDATE SET \
     order_number = excluded.order_number, bottom_number = excluded.bottom_number, \
     date = excluded.date, diameter = excluded.diameter, thickness = excluded.thickness, \
     type_size = excluded.type_size, cutting = excluded.cutting, material = excluded.material, \
     heat_treatment = excluded.heat_treatment, treatment_date = excluded.treatment_date, \
     executors = excluded.executors, status = excluded.status, \
     created_at = excluded.created_at, updated_at = excluded.updated_at";

fn column(field: OrderField) -> &'static str {
    match field {
        OrderField::Id => "id",
        OrderField::Date => "date",
        OrderField::OrderNumber => "order_number",
        OrderField::Diameter => "diameter",
        OrderField::Thickness => "thickness",
        OrderField::TypeSize => "type_size",
        OrderField::Cutting => "cutting",
        OrderField::BottomNumber => "bottom_number",
        OrderField::Material => "material",
        OrderField::HeatTreatment => "heat_treatment",
        OrderField::TreatmentDate => "treatment_date",
        OrderField::Status => "status",
        OrderField::CreatedAt => "created_at",
        OrderField::UpdatedAt => "updated_at",
    }
}

fn db_err(e: rusqlite::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(e, rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation)
}

fn row_to_order(row: &Row<'_>) -> rusqlite::Result<Order> {
    let executors_json: String = row.get(11)?;
    let executors: Vec<Executor> = serde_json::from_str(&executors_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(11, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let status: String = row.get(12)?;

    Ok(Order {
        id: row.get(0)?,
        order_number: row.get(1)?,
        bottom_number: row.get(2)?,
        date: row.get(3)?,
        diameter: row.get(4)?,
        thickness: row.get(5)?,
        type_size: row.get(6)?,
        cutting: row.get(7)?,
        material: row.get(8)?,
        heat_treatment: row.get(9)?,
        treatment_date: row.get(10)?,
        executors: hermes_core::normalize_executors(executors),
        status: OrderStatus::parse(&status).unwrap_or_default(),
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

fn write_order(conn: &Connection, sql: &str, order: &Order) -> Result<(), StoreError> {
    let executors = serde_json::to_string(&order.executors)
        .map_err(|e| StoreError::InvalidRecord(e.to_string()))?;

    let result = conn.execute(
        sql,
        params![
            order.id,
            order.order_number,
            order.bottom_number,
            order.date,
            order.diameter,
            order.thickness,
            order.type_size,
            order.cutting,
            order.material,
            order.heat_treatment,
            order.treatment_date,
            executors,
            order.status.as_str(),
            order.created_at,
            order.updated_at,
        ],
    );

    match result {
        Ok(_) => Ok(()),
        Err(e) if is_constraint_violation(&e) => Err(conflict(conn, order)?.unwrap_or_else(|| db_err(e))),
        Err(e) => Err(db_err(e)),
    }
}

/// Which record already owns this order number, if any other does.
fn conflict(conn: &Connection, order: &Order) -> Result<Option<StoreError>, StoreError> {
    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM orders WHERE order_number = ?1 AND id != ?2",
            params![order.order_number, order.id],
            |row| row.get(0),
        )
        .optional()
        .map_err(db_err)?;

    Ok(existing.map(|existing_id| StoreError::Conflict {
        order_number: order.order_number.clone(),
        existing_id,
    }))
}

/// Order store in a single SQLite file.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(db_err)?;
        log::debug!("opened order database {}", path.display());
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory().map_err(db_err)?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA).map_err(db_err)?;

        let version: Option<String> = conn
            .query_row("SELECT value FROM meta WHERE key = 'schema_version'", [], |row| row.get(0))
            .optional()
            .map_err(db_err)?;

        match version.as_deref().map(str::parse::<u32>) {
            None => {
                conn.execute(
                    "INSERT INTO meta (key, value) VALUES ('schema_version', ?1)",
                    params![SCHEMA_VERSION.to_string()],
                )
                .map_err(db_err)?;
            }
            Some(Ok(v)) if v <= SCHEMA_VERSION => {}
            Some(Ok(v)) => {
                return Err(StoreError::Backend(format!(
                    "database schema version {v} is newer than supported version {SCHEMA_VERSION}"
                )));
            }
            Some(Err(_)) => {
                return Err(StoreError::Backend("unreadable schema version".into()));
            }
        }

        Ok(Self { conn })
    }

    fn query_orders(&self, sql: &str, value: Option<&str>) -> Result<Vec<Order>, StoreError> {
        let mut stmt = self.conn.prepare(sql).map_err(db_err)?;
        let rows = match value {
            Some(v) => stmt.query_map(params![v], row_to_order),
            None => stmt.query_map([], row_to_order),
        }
        .map_err(db_err)?;

        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }
}

impl OrderStore for SqliteStore {
    fn get(&self, id: &str) -> Result<Option<Order>, StoreError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM orders WHERE id = ?1");
        self.conn
            .query_row(&sql, params![id], row_to_order)
            .optional()
            .map_err(db_err)
    }

    fn put(&mut self, order: &Order) -> Result<String, StoreError> {
        let record = prepare_for_write(order)?;
        if let Some(err) = conflict(&self.conn, &record)? {
            return Err(err);
        }
        write_order(&self.conn, &format!("{INSERT}{UPSERT_TAIL}"), &record)?;
        Ok(record.id)
    }

    fn delete(&mut self, id: &str) -> Result<bool, StoreError> {
        let n = self
            .conn
            .execute("DELETE FROM orders WHERE id = ?1", params![id])
            .map_err(db_err)?;
        Ok(n > 0)
    }

    fn list(&self, sort: OrderField, dir: SortDirection) -> Result<Vec<Order>, StoreError> {
        let dir = match dir {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM orders ORDER BY {} {dir}, id ASC",
            column(sort)
        );
        self.query_orders(&sql, None)
    }

    fn find_by_field(&self, field: OrderField, value: &str) -> Result<Vec<Order>, StoreError> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM orders WHERE {} = ?1 ORDER BY updated_at DESC, id ASC",
            column(field)
        );
        let mut found = self.query_orders(&sql, Some(value))?;
        // Same ordering as the in-memory store, independent of collation.
        found.sort_by(compare_recency);
        Ok(found)
    }

    fn clear_all(&mut self) -> Result<usize, StoreError> {
        let n = self.conn.execute("DELETE FROM orders", []).map_err(db_err)?;
        log::info!("cleared {n} orders");
        Ok(n)
    }

    fn replace_all(&mut self, orders: &[Order]) -> Result<(), StoreError> {
        let tx = self.conn.transaction().map_err(db_err)?;
        tx.execute("DELETE FROM orders", []).map_err(db_err)?;

        for order in orders {
            let record = prepare_for_write(order)?;
            // Dropping `tx` on this early return rolls everything back.
            write_order(&tx, INSERT, &record)?;
        }

        tx.commit().map_err(db_err)?;
        log::info!("replaced store contents with {} orders", orders.len());
        Ok(())
    }

    fn count(&self) -> Result<usize, StoreError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))
            .map_err(db_err)?;
        Ok(n as usize)
    }
}
