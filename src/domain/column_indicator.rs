//! Indicator over a stored column, joined to the series by row identity.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::domain::error::EvalError;
use crate::domain::indicator::{Evaluated, Indicator};
use crate::domain::ohlcv::RowId;
use crate::domain::series::BarSeries;
use crate::ports::table_port::BarTablePort;

type ColumnValues = HashMap<RowId, Option<f64>>;

/// Reads `column` once, on first use, then answers every position by looking
/// up the [`RowId`] of the bar at that position.
pub struct ColumnIndicator {
    series: BarSeries,
    table: Arc<dyn BarTablePort>,
    column: String,
    cache: OnceLock<Result<ColumnValues, EvalError>>,
}

impl ColumnIndicator {
    pub fn new(series: BarSeries, table: Arc<dyn BarTablePort>, column: impl Into<String>) -> Self {
        Self {
            series,
            table,
            column: column.into(),
            cache: OnceLock::new(),
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    fn values(&self) -> Result<&ColumnValues, EvalError> {
        self.cache
            .get_or_init(|| {
                let rows = self
                    .table
                    .read_column(&self.column)
                    .map_err(|e| EvalError::Storage {
                        reason: e.to_string(),
                    })?;
                debug!(column = %self.column, rows = rows.len(), "column cached");
                Ok(rows.into_iter().collect())
            })
            .as_ref()
            .map_err(|e| e.clone())
    }
}

impl Indicator for ColumnIndicator {
    fn value(&self, position: usize) -> Evaluated {
        let values = self.values()?;
        let row_id = self.series.row_id(position)?;
        Ok(values.get(&row_id).copied().flatten())
    }

    fn series(&self) -> &BarSeries {
        &self.series
    }
}

impl fmt::Debug for ColumnIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnIndicator")
            .field("table", &self.table.table_name())
            .field("column", &self.column)
            .field("cached", &self.cache.get().is_some())
            .finish()
    }
}
