#![allow(dead_code)]

use bartable::domain::error::StorageError;
pub use bartable::domain::ohlcv::{OhlcvBar, RowId};
use bartable::ports::table_port::BarTablePort;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::io;
use std::sync::{Arc, Mutex};

/// In-memory bar table recording reads and writes.
pub struct MockTable {
    pub name: String,
    pub bars: Vec<OhlcvBar>,
    pub columns: Mutex<BTreeMap<String, BTreeMap<RowId, Option<f64>>>>,
    pub column_reads: Mutex<usize>,
    pub updates: Mutex<Vec<(RowId, String, Option<f64>)>>,
    pub failing_rows: Vec<RowId>,
}

impl MockTable {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            bars: Vec::new(),
            columns: Mutex::new(BTreeMap::new()),
            column_reads: Mutex::new(0),
            updates: Mutex::new(Vec::new()),
            failing_rows: Vec::new(),
        }
    }

    pub fn with_bars(mut self, bars: Vec<OhlcvBar>) -> Self {
        self.bars = bars;
        self
    }

    /// Pre-populate a column, keyed by the bars' identities.
    pub fn with_column(self, column: &str, values: &[(i64, Option<f64>)]) -> Self {
        self.columns.lock().unwrap().insert(
            column.to_string(),
            values.iter().map(|(id, v)| (RowId(*id), *v)).collect(),
        );
        self
    }

    pub fn with_failing_row(mut self, id: i64) -> Self {
        self.failing_rows.push(RowId(id));
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn column(&self, column: &str) -> Option<BTreeMap<RowId, Option<f64>>> {
        self.columns.lock().unwrap().get(column).cloned()
    }

    pub fn column_count(&self) -> usize {
        self.columns.lock().unwrap().len()
    }

    pub fn update_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }

    pub fn reads(&self) -> usize {
        *self.column_reads.lock().unwrap()
    }
}

impl BarTablePort for MockTable {
    fn table_name(&self) -> &str {
        &self.name
    }

    fn select_bars(&self) -> Result<Vec<OhlcvBar>, StorageError> {
        let mut bars = self.bars.clone();
        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }

    fn column_names(&self) -> Result<Vec<String>, StorageError> {
        let mut names: Vec<String> = ["id", "date", "open", "high", "low", "close", "volume"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        names.extend(self.columns.lock().unwrap().keys().cloned());
        Ok(names)
    }

    fn add_double_column(&self, column: &str) -> Result<(), StorageError> {
        let ids: Vec<RowId> = self.bars.iter().filter_map(|b| b.row_id).collect();
        self.columns
            .lock()
            .unwrap()
            .entry(column.to_string())
            .or_insert_with(|| ids.into_iter().map(|id| (id, None)).collect());
        Ok(())
    }

    fn read_column(&self, column: &str) -> Result<Vec<(RowId, Option<f64>)>, StorageError> {
        *self.column_reads.lock().unwrap() += 1;
        self.columns
            .lock()
            .unwrap()
            .get(column)
            .map(|values| values.iter().map(|(id, v)| (*id, *v)).collect())
            .ok_or_else(|| StorageError::DatabaseQuery {
                reason: format!("no such column: {column}"),
            })
    }

    fn update_row(
        &self,
        row_id: RowId,
        column: &str,
        value: Option<f64>,
    ) -> Result<(), StorageError> {
        if self.failing_rows.contains(&row_id) {
            return Err(StorageError::DatabaseQuery {
                reason: format!("row {row_id} is locked"),
            });
        }
        let mut columns = self.columns.lock().unwrap();
        let values = columns
            .get_mut(column)
            .ok_or_else(|| StorageError::DatabaseQuery {
                reason: format!("no such column: {column}"),
            })?;
        values.insert(row_id, value);
        self.updates
            .lock()
            .unwrap()
            .push((row_id, column.to_string(), value));
        Ok(())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(id: Option<i64>, date: &str, close: f64) -> OhlcvBar {
    OhlcvBar {
        row_id: id.map(RowId),
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        open: close - 1.0,
        high: close + 1.0,
        low: close - 2.0,
        close,
        volume: 1000.0,
    }
}

/// `count` daily bars with identities `1..=count` and rising closes.
pub fn generate_bars(start_date: &str, count: usize, start_price: f64) -> Vec<OhlcvBar> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    (0..count)
        .map(|i| OhlcvBar {
            row_id: Some(RowId(i as i64 + 1)),
            date: start + chrono::Duration::days(i as i64),
            open: start_price + i as f64,
            high: start_price + i as f64 + 1.0,
            low: start_price + i as f64 - 1.0,
            close: start_price + i as f64,
            volume: 1000.0 + i as f64,
        })
        .collect()
}

/// Log sink for `tracing_subscriber::fmt().with_writer(..)`.
#[derive(Clone, Default)]
pub struct SharedBuf(pub Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    pub fn count(&self, needle: &str) -> usize {
        self.contents().lines().filter(|l| l.contains(needle)).count()
    }
}

impl io::Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SharedBuf {
    type Writer = SharedBuf;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run `f` with a WARN-level subscriber writing into the returned buffer.
pub fn capture_warnings<T>(f: impl FnOnce() -> T) -> (T, SharedBuf) {
    let buf = SharedBuf::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(buf.clone())
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .finish();
    let out = tracing::subscriber::with_default(subscriber, f);
    (out, buf)
}
