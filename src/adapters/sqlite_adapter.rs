//! SQLite bar table adapter.
//!
//! A bar table has the fixed columns `id, date, open, high, low, close,
//! volume`; `id` is an alias of SQLite's `rowid` and serves as the row
//! identity. Indicator columns are added as nullable `REAL`.

use chrono::NaiveDate;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

use crate::domain::error::{BartableError, StorageError};
use crate::domain::expression::is_identifier;
use crate::domain::ohlcv::{OhlcvBar, RowId};
use crate::ports::config_port::ConfigPort;
use crate::ports::table_port::BarTablePort;

/// Bar columns plus the names SQLite resolves to the rowid.
const SQLITE_BASE_COLUMNS: [&str; 10] = [
    "id", "date", "open", "high", "low", "close", "volume", "rowid", "_rowid_", "oid",
];

/// Double-quote a validated identifier.
fn quote(name: &str) -> Result<String, StorageError> {
    if !is_identifier(name) {
        return Err(StorageError::InvalidIdentifier {
            name: name.to_string(),
        });
    }
    Ok(format!("\"{name}\""))
}

fn query_error(e: rusqlite::Error) -> StorageError {
    StorageError::DatabaseQuery {
        reason: e.to_string(),
    }
}

pub struct SqliteBarTable {
    pool: Pool<SqliteConnectionManager>,
    table: String,
}

impl SqliteBarTable {
    pub fn from_config(config: &dyn ConfigPort, table: &str) -> Result<Self, BartableError> {
        let db_path = config.require_string("sqlite", "path")?;
        let pool_size = config.get_count("sqlite", "pool_size", 4, 1)?;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(u32::try_from(pool_size).unwrap_or(u32::MAX))
            .build(manager)
            .map_err(|e: r2d2::Error| StorageError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self::with_pool(pool, table)?)
    }

    pub fn in_memory(table: &str) -> Result<Self, StorageError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| StorageError::Database {
                reason: e.to_string(),
            })?;

        Self::with_pool(pool, table)
    }

    fn with_pool(pool: Pool<SqliteConnectionManager>, table: &str) -> Result<Self, StorageError> {
        quote(table)?;
        Ok(Self {
            pool,
            table: table.to_string(),
        })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, StorageError> {
        self.pool.get().map_err(|e: r2d2::Error| StorageError::Database {
            reason: e.to_string(),
        })
    }

    fn quoted_table(&self) -> String {
        format!("\"{}\"", self.table)
    }

    pub fn initialize_schema(&self) -> Result<(), StorageError> {
        let conn = self.conn()?;
        let table = self.quoted_table();
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY,
                date TEXT NOT NULL,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                volume REAL NOT NULL
            );
            CREATE INDEX IF NOT EXISTS \"idx_{name}_date\" ON {table}(date);",
            name = self.table,
        ))
        .map_err(query_error)?;

        Ok(())
    }

    /// Append bars in one transaction. Identities are assigned by SQLite.
    pub fn insert_bars(&self, bars: &[OhlcvBar]) -> Result<usize, StorageError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_error)?;
        let sql = format!(
            "INSERT INTO {} (date, open, high, low, close, volume)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            self.quoted_table()
        );

        for bar in bars {
            tx.execute(
                &sql,
                params![
                    bar.date.format("%Y-%m-%d").to_string(),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume
                ],
            )
            .map_err(query_error)?;
        }

        tx.commit().map_err(query_error)?;
        Ok(bars.len())
    }
}

impl BarTablePort for SqliteBarTable {
    fn table_name(&self) -> &str {
        &self.table
    }

    fn base_columns(&self) -> &[&'static str] {
        &SQLITE_BASE_COLUMNS
    }

    fn select_bars(&self) -> Result<Vec<OhlcvBar>, StorageError> {
        let conn = self.conn()?;
        let query = format!(
            "SELECT rowid, date, open, high, low, close, volume
             FROM {}
             ORDER BY date ASC, rowid ASC",
            self.quoted_table()
        );

        let mut stmt = conn.prepare(&query).map_err(query_error)?;
        let rows = stmt
            .query_map([], |row| {
                let date_str: String = row.get(1)?;
                let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        date_str.len(),
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                Ok(OhlcvBar {
                    row_id: Some(RowId(row.get(0)?)),
                    date,
                    open: row.get(2)?,
                    high: row.get(3)?,
                    low: row.get(4)?,
                    close: row.get(5)?,
                    volume: row.get(6)?,
                })
            })
            .map_err(query_error)?;

        let mut bars = Vec::new();
        for row in rows {
            bars.push(row.map_err(query_error)?);
        }
        Ok(bars)
    }

    fn column_names(&self) -> Result<Vec<String>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({})", self.quoted_table()))
            .map_err(query_error)?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .map_err(query_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_error)?;
        Ok(names)
    }

    // SQLite column names are case-insensitive.
    fn has_column(&self, column: &str) -> Result<bool, StorageError> {
        Ok(self
            .column_names()?
            .iter()
            .any(|c| c.eq_ignore_ascii_case(column)))
    }

    fn add_double_column(&self, column: &str) -> Result<(), StorageError> {
        let quoted = quote(column)?;
        if self.has_column(column)? {
            return Ok(());
        }
        let conn = self.conn()?;
        conn.execute(
            &format!("ALTER TABLE {} ADD COLUMN {quoted} REAL", self.quoted_table()),
            [],
        )
        .map_err(query_error)?;
        Ok(())
    }

    fn read_column(&self, column: &str) -> Result<Vec<(RowId, Option<f64>)>, StorageError> {
        let quoted = quote(column)?;
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!("SELECT rowid, {quoted} FROM {}", self.quoted_table()))
            .map_err(query_error)?;
        let values = stmt
            .query_map([], |row| Ok((RowId(row.get(0)?), row.get::<_, Option<f64>>(1)?)))
            .map_err(query_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(query_error)?;
        Ok(values)
    }

    fn update_row(
        &self,
        row_id: RowId,
        column: &str,
        value: Option<f64>,
    ) -> Result<(), StorageError> {
        let quoted = quote(column)?;
        let conn = self.conn()?;
        let changed = conn
            .execute(
                &format!("UPDATE {} SET {quoted} = ?1 WHERE rowid = ?2", self.quoted_table()),
                params![value, row_id.0],
            )
            .map_err(query_error)?;
        if changed == 0 {
            return Err(StorageError::DatabaseQuery {
                reason: format!("no row {row_id} in {}", self.table),
            });
        }
        Ok(())
    }
}
