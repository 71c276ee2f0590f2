//! CSV bar file reader used by `bartable import`.

use crate::domain::error::BartableError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;
use std::path::Path;

const COLUMNS: [&str; 6] = ["date", "open", "high", "low", "close", "volume"];

/// Read `date,open,high,low,close,volume` rows, sorted by date.
///
/// Bars come back without a row identity; storage assigns one on insert.
pub fn read_bars(path: &Path) -> Result<Vec<OhlcvBar>, BartableError> {
    let file = path.display().to_string();
    let bar_error = |reason: String| BartableError::BarData {
        file: file.clone(),
        reason,
    };

    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| bar_error(format!("failed to open: {e}")))?;

    let headers = rdr
        .headers()
        .map_err(|e| bar_error(format!("failed to read header: {e}")))?
        .clone();
    let mut index = [0usize; 6];
    for (slot, name) in index.iter_mut().zip(COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| bar_error(format!("missing {name} column")))?;
    }

    let mut bars = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| bar_error(format!("CSV parse error: {e}")))?;
        // header is line 1
        let line = line + 2;

        let field = |col: usize| -> Result<String, BartableError> {
            record
                .get(index[col])
                .map(str::to_string)
                .ok_or_else(|| bar_error(format!("line {line}: missing {} value", COLUMNS[col])))
        };
        let number = |col: usize| -> Result<f64, BartableError> {
            field(col)?.parse::<f64>().map_err(|e| {
                bar_error(format!("line {line}: invalid {} value: {e}", COLUMNS[col]))
            })
        };

        let date = NaiveDate::parse_from_str(&field(0)?, "%Y-%m-%d")
            .map_err(|e| bar_error(format!("line {line}: invalid date format: {e}")))?;

        bars.push(OhlcvBar {
            row_id: None,
            date,
            open: number(1)?,
            high: number(2)?,
            low: number(3)?,
            close: number(4)?,
            volume: number(5)?,
        });
    }

    bars.sort_by_key(|b| b.date);
    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_csv(content: &str) -> (TempDir, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bars.csv");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn reads_and_sorts_by_date() {
        let (_dir, path) = write_csv(
            "date,open,high,low,close,volume\n\
             2024-01-17,110.0,120.0,105.0,115.0,55000\n\
             2024-01-15,100.0,110.0,90.0,105.0,50000\n\
             2024-01-16,105.0,115.0,100.0,110.0,60000.5\n",
        );
        let bars = read_bars(&path).unwrap();

        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(bars[0].open, 100.0);
        assert_eq!(bars[0].high, 110.0);
        assert_eq!(bars[0].low, 90.0);
        assert_eq!(bars[0].close, 105.0);
        assert_eq!(bars[0].volume, 50000.0);
        assert_eq!(bars[1].volume, 60000.5);
        assert!(bars.iter().all(|b| b.row_id.is_none()));
    }

    #[test]
    fn header_order_does_not_matter() {
        let (_dir, path) = write_csv(
            "Close,Date,Volume,Open,High,Low\n\
             105.0,2024-01-15,10,100.0,110.0,90.0\n",
        );
        let bars = read_bars(&path).unwrap();
        assert_eq!(bars[0].close, 105.0);
        assert_eq!(bars[0].open, 100.0);
    }

    #[test]
    fn empty_file_with_header_is_empty() {
        let (_dir, path) = write_csv("date,open,high,low,close,volume\n");
        assert!(read_bars(&path).unwrap().is_empty());
    }

    #[test]
    fn missing_column_is_bar_data_error() {
        let (_dir, path) = write_csv("date,open,high,low,close\n2024-01-15,1,2,0,1\n");
        match read_bars(&path) {
            Err(BartableError::BarData { reason, .. }) => {
                assert!(reason.contains("volume"), "{reason}");
            }
            other => panic!("expected BarData, got {other:?}"),
        }
    }

    #[test]
    fn bad_value_reports_line() {
        let (_dir, path) = write_csv(
            "date,open,high,low,close,volume\n\
             2024-01-15,1,2,0,1,10\n\
             2024-01-16,1,2,0,abc,10\n",
        );
        match read_bars(&path) {
            Err(BartableError::BarData { reason, .. }) => {
                assert!(reason.contains("line 3"), "{reason}");
                assert!(reason.contains("close"), "{reason}");
            }
            other => panic!("expected BarData, got {other:?}"),
        }
    }

    #[test]
    fn nonexistent_file() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            read_bars(&dir.path().join("nope.csv")),
            Err(BartableError::BarData { .. })
        ));
    }
}
