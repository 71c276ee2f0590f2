//! Parse, build, evaluate and write an indicator back into its bar table.
//!
//! A request runs `parse → resolve → build → evaluate → write`. Any failure
//! before writing leaves the table untouched, including its schema: the output
//! column is created only once the indicator has been built. Failures for
//! single rows during evaluation or writing are logged and do not abort the
//! backfill.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::catalog::Catalog;
use crate::domain::column_indicator::ColumnIndicator;
use crate::domain::construction::{ColumnLookup, ConstructionEngine};
use crate::domain::error::{BindError, IndicatorError, StorageError};
use crate::domain::expression::{self, is_identifier};
use crate::domain::indicator::{Evaluated, Indicator, IndicatorRef};
use crate::domain::series::BarSeries;
use crate::ports::table_port::BarTablePort;

pub const DEFAULT_MAX_WARNINGS: usize = 10;

/// Outcome of one backfill.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfillReport {
    pub column: String,
    /// Positions visited, equal to the series length.
    pub processed: usize,
    /// Rows updated, including NULL writes.
    pub written: usize,
    /// Rows without identity or whose update failed.
    pub skipped: usize,
    pub failed_evaluations: usize,
    /// Row-level problems, whether or not they were logged at WARN.
    pub warnings: usize,
}

/// Logs the first `limit` row problems at WARN and the rest at DEBUG.
struct WarningLimiter<'a> {
    table: &'a str,
    column: &'a str,
    limit: usize,
    seen: usize,
}

impl<'a> WarningLimiter<'a> {
    fn new(table: &'a str, column: &'a str, limit: usize) -> Self {
        Self {
            table,
            column,
            limit,
            seen: 0,
        }
    }

    fn row(&mut self, position: usize, message: &str, error: &dyn fmt::Display) {
        self.seen += 1;
        if self.seen <= self.limit {
            warn!(
                table = self.table,
                column = self.column,
                position,
                error = %error,
                "{message}"
            );
        } else {
            debug!(
                table = self.table,
                column = self.column,
                position,
                error = %error,
                "{message}"
            );
        }
    }

    fn finish(self) -> usize {
        if self.seen > self.limit {
            warn!(
                table = self.table,
                column = self.column,
                suppressed = self.seen - self.limit,
                "further row warnings suppressed"
            );
        }
        self.seen
    }
}

/// Adds indicator columns to one bar table.
///
/// Holds the series loaded from the table; call [`reload`](Self::reload) after
/// rows are added or removed.
pub struct PersistenceBridge<'c> {
    catalog: &'c Catalog,
    table: Arc<dyn BarTablePort>,
    series: BarSeries,
    max_warnings: usize,
}

impl<'c> PersistenceBridge<'c> {
    pub fn open(catalog: &'c Catalog, table: Arc<dyn BarTablePort>) -> Result<Self, StorageError> {
        let series = load_series(table.as_ref())?;
        Ok(Self {
            catalog,
            table,
            series,
            max_warnings: DEFAULT_MAX_WARNINGS,
        })
    }

    pub fn with_max_warnings(mut self, max_warnings: usize) -> Self {
        self.max_warnings = max_warnings;
        self
    }

    pub fn reload(&mut self) -> Result<(), StorageError> {
        self.series = load_series(self.table.as_ref())?;
        Ok(())
    }

    pub fn series(&self) -> &BarSeries {
        &self.series
    }

    pub fn catalog(&self) -> &Catalog {
        self.catalog
    }

    /// Compute `expression` over the whole table and store it.
    ///
    /// The output column is `target` if given, else the expression's alias,
    /// else the function name. Returns the number of positions processed.
    pub fn add_indicator(
        &self,
        expression: &str,
        target: Option<&str>,
    ) -> Result<usize, IndicatorError> {
        self.add_indicator_with_report(expression, target)
            .map(|report| report.processed)
    }

    pub fn add_indicator_with_report(
        &self,
        expression: &str,
        target: Option<&str>,
    ) -> Result<BackfillReport, IndicatorError> {
        let parsed = expression::parse(expression)?;
        let raw = parsed.raw_text.as_str();

        let descriptor = self.catalog.resolve(&parsed.function_name).ok_or_else(|| {
            IndicatorError::NoSuchIndicator {
                name: parsed.function_name.clone(),
                expression: raw.to_string(),
            }
        })?;

        let column = target
            .map(str::to_string)
            .or_else(|| parsed.alias.clone())
            .unwrap_or_else(|| parsed.function_name.clone());
        self.check_target(&column)
            .map_err(|source| IndicatorError::Storage {
                expression: raw.to_string(),
                source,
            })?;

        let engine = ConstructionEngine::new(self.series.clone(), self);
        let built = engine
            .build(descriptor, &parsed.args)
            .map_err(|e| e.into_indicator_error(&descriptor.canonical_name, raw))?;
        debug!(
            indicator = %descriptor.canonical_name,
            signature = %built.signature,
            column = %column,
            "indicator built"
        );

        self.table
            .add_double_column(&column)
            .map_err(|source| IndicatorError::Storage {
                expression: raw.to_string(),
                source,
            })?;

        Ok(self.backfill(built.indicator.as_ref(), &column))
    }

    /// Store an indicator constructed in code.
    pub fn add_built_indicator(
        &self,
        indicator: IndicatorRef,
        column: &str,
    ) -> Result<BackfillReport, StorageError> {
        self.check_target(column)?;
        self.table.add_double_column(column)?;
        Ok(self.backfill(indicator.as_ref(), column))
    }

    /// Output columns must be identifiers and must not shadow bar data.
    fn check_target(&self, column: &str) -> Result<(), StorageError> {
        if !is_identifier(column) {
            return Err(StorageError::InvalidIdentifier {
                name: column.to_string(),
            });
        }
        if self.table.is_base_column(column) {
            return Err(StorageError::ReservedColumn {
                name: column.to_string(),
            });
        }
        Ok(())
    }

    /// Evaluate every position, then write each value to the row it came from.
    pub fn backfill(&self, indicator: &dyn Indicator, column: &str) -> BackfillReport {
        let len = self.series.len();
        let values: Vec<Evaluated> = (0..len).map(|i| indicator.value(i)).collect();

        let mut limiter = WarningLimiter::new(self.table.table_name(), column, self.max_warnings);
        let mut report = BackfillReport {
            column: column.to_string(),
            processed: len,
            ..BackfillReport::default()
        };

        for (position, value) in values.into_iter().enumerate() {
            let row_id = match self.series.row_id(position) {
                Ok(id) => id,
                Err(e) => {
                    limiter.row(position, "row has no identity, skipped", &e);
                    report.skipped += 1;
                    continue;
                }
            };
            let value = match value {
                Ok(v) => v,
                Err(e) => {
                    limiter.row(position, "evaluation failed, writing NULL", &e);
                    report.failed_evaluations += 1;
                    None
                }
            };
            match self.table.update_row(row_id, column, value) {
                Ok(()) => report.written += 1,
                Err(e) => {
                    limiter.row(position, "row update failed", &e);
                    report.skipped += 1;
                }
            }
        }

        report.warnings = limiter.finish();
        info!(
            table = self.table.table_name(),
            column,
            processed = report.processed,
            written = report.written,
            skipped = report.skipped,
            "backfill complete"
        );
        report
    }
}

impl ColumnLookup for PersistenceBridge<'_> {
    fn column_indicator(&self, column: &str) -> Result<IndicatorRef, BindError> {
        let unavailable = |reason: String| BindError::ColumnUnavailable {
            column: column.to_string(),
            reason,
        };
        match self.table.has_column(column) {
            Ok(true) => Ok(Arc::new(ColumnIndicator::new(
                self.series.clone(),
                self.table.clone(),
                column,
            ))),
            Ok(false) => Err(unavailable(format!(
                "table '{}' has no such column",
                self.table.table_name()
            ))),
            Err(e) => Err(unavailable(e.to_string())),
        }
    }
}

fn load_series(table: &dyn BarTablePort) -> Result<BarSeries, StorageError> {
    let bars = table.select_bars()?;
    debug!(table = table.table_name(), bars = bars.len(), "bars loaded");
    Ok(BarSeries::new(table.table_name(), bars))
}
