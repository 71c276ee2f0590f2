//! Bar table storage port.
//!
//! A bar table is an ordered set of OHLCV rows, each with a stable storage
//! identity, plus any number of nullable numeric columns added later.

use crate::domain::error::StorageError;
use crate::domain::ohlcv::{OhlcvBar, RowId};

/// Columns every bar table carries; indicator output never goes here.
pub const BASE_COLUMNS: [&str; 7] = ["id", "date", "open", "high", "low", "close", "volume"];

pub trait BarTablePort: Send + Sync {
    fn table_name(&self) -> &str;

    /// Source columns, including any alias of the row identity.
    fn base_columns(&self) -> &[&'static str] {
        &BASE_COLUMNS
    }

    fn is_base_column(&self, column: &str) -> bool {
        self.base_columns()
            .iter()
            .any(|c| c.eq_ignore_ascii_case(column))
    }

    /// All bars in ascending date order, each carrying its [`RowId`].
    fn select_bars(&self) -> Result<Vec<OhlcvBar>, StorageError>;

    fn column_names(&self) -> Result<Vec<String>, StorageError>;

    fn has_column(&self, column: &str) -> Result<bool, StorageError> {
        Ok(self.column_names()?.iter().any(|c| c == column))
    }

    /// Add a nullable numeric column. A no-op when the column already exists.
    fn add_double_column(&self, column: &str) -> Result<(), StorageError>;

    /// Every `(row identity, value)` pair of `column`.
    fn read_column(&self, column: &str) -> Result<Vec<(RowId, Option<f64>)>, StorageError>;

    /// Set `column` on the single row identified by `row_id`.
    fn update_row(
        &self,
        row_id: RowId,
        column: &str,
        value: Option<f64>,
    ) -> Result<(), StorageError>;
}
