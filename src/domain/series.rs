//! Ordered, position-addressed view over a table's bars.

use std::sync::Arc;

use crate::domain::error::EvalError;
use crate::domain::ohlcv::{OhlcvBar, RowId};

/// A 0-based, contiguous sequence of bars.
///
/// Cloning is cheap: indicators built over the same series share the bar
/// storage. A reload of the table produces a new series.
#[derive(Debug, Clone)]
pub struct BarSeries {
    name: Arc<str>,
    bars: Arc<[OhlcvBar]>,
}

impl BarSeries {
    pub fn new(name: impl Into<Arc<str>>, bars: Vec<OhlcvBar>) -> Self {
        Self {
            name: name.into(),
            bars: bars.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bar(&self, position: usize) -> Result<&OhlcvBar, EvalError> {
        self.bars.get(position).ok_or(EvalError::OutOfRange {
            position,
            len: self.bars.len(),
        })
    }

    /// Row identity of the bar at `position`.
    pub fn row_id(&self, position: usize) -> Result<RowId, EvalError> {
        self.bar(position)?
            .row_id
            .ok_or(EvalError::MissingIdentity { position })
    }

    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    pub fn iter(&self) -> impl Iterator<Item = &OhlcvBar> {
        self.bars.iter()
    }
}
