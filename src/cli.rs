//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::catalog::Catalog;
use crate::domain::error::BartableError;
use crate::domain::persistence::DEFAULT_MAX_WARNINGS;
use crate::ports::config_port::ConfigPort;

#[derive(Parser, Debug)]
#[command(name = "bartable", about = "Compute indicator columns over OHLCV bar tables")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate an indicator expression and store it as a column
    Add {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        table: String,
        /// e.g. "sma(20) as sma_20"
        expression: String,
        /// Output column, overriding the expression's alias
        #[arg(long)]
        column: Option<String>,
    },
    /// Create a bar table from a CSV file
    Import {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        table: String,
        #[arg(long)]
        csv: PathBuf,
    },
    /// List indicators usable in expressions
    List {
        /// Include internal and programmatic-only indicators
        #[arg(long)]
        all: bool,
    },
    /// List the columns of a bar table
    Columns {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        table: String,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Add {
            config,
            table,
            expression,
            column,
        } => run_add(&config, &table, &expression, column.as_deref()),
        Command::Import { config, table, csv } => run_import(&config, &table, &csv),
        Command::List { all } => run_list(all),
        Command::Columns { config, table } => run_columns(&config, &table),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e);
            (&e).into()
        }
    }
}

fn report_error(err: &BartableError) {
    match err {
        BartableError::Indicator(crate::domain::error::IndicatorError::Parse(p)) => {
            eprintln!("error: {}", p.display_with_context());
        }
        other => eprintln!("error: {other}"),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, BartableError> {
    FileConfigAdapter::from_file(path)
}

/// `[indicators] max_warnings`, falling back to the library default.
pub fn max_warnings(config: &dyn ConfigPort) -> Result<usize, BartableError> {
    config.get_count("indicators", "max_warnings", DEFAULT_MAX_WARNINGS, 0)
}

fn run_list(all: bool) -> Result<(), BartableError> {
    let catalog = Catalog::discover()?;
    let descriptors = if all {
        catalog.all()
    } else {
        catalog.available()
    };

    for (name, descriptor) in descriptors {
        let signatures: Vec<String> = descriptor
            .signatures
            .iter()
            .map(ToString::to_string)
            .collect();
        let marker = if all && !descriptor.is_available() {
            " (internal)"
        } else {
            ""
        };
        println!("{name}{marker}  {}", signatures.join(" "));
    }
    eprintln!("{} indicators", descriptors.len());
    Ok(())
}

#[cfg(feature = "sqlite")]
fn open_table(
    config: &dyn ConfigPort,
    table: &str,
) -> Result<crate::adapters::sqlite_adapter::SqliteBarTable, BartableError> {
    crate::adapters::sqlite_adapter::SqliteBarTable::from_config(config, table)
}

#[cfg(feature = "sqlite")]
fn run_add(
    config_path: &Path,
    table: &str,
    expression: &str,
    column: Option<&str>,
) -> Result<(), BartableError> {
    use crate::domain::persistence::PersistenceBridge;
    use std::sync::Arc;

    let config = load_config(config_path)?;
    let max_warnings = max_warnings(&config)?;
    let catalog = Catalog::discover()?;
    let storage = Arc::new(open_table(&config, table)?);

    let bridge = PersistenceBridge::open(&catalog, storage)?.with_max_warnings(max_warnings);
    eprintln!("Loaded {} bars from {}", bridge.series().len(), table);

    let report = bridge.add_indicator_with_report(expression, column)?;
    eprintln!(
        "Wrote {} of {} rows to column '{}'",
        report.written, report.processed, report.column
    );
    if report.warnings > 0 {
        eprintln!(
            "{} rows degraded ({} skipped, {} evaluation failures)",
            report.warnings, report.skipped, report.failed_evaluations
        );
    }
    Ok(())
}

#[cfg(feature = "sqlite")]
fn run_import(config_path: &Path, table: &str, csv_path: &Path) -> Result<(), BartableError> {
    use crate::adapters::csv_adapter;

    let config = load_config(config_path)?;
    let storage = open_table(&config, table)?;

    eprintln!("Reading bars from {}", csv_path.display());
    let bars = csv_adapter::read_bars(csv_path)?;

    storage.initialize_schema()?;
    let inserted = storage.insert_bars(&bars)?;
    eprintln!("Imported {inserted} bars into {table}");
    Ok(())
}

#[cfg(feature = "sqlite")]
fn run_columns(config_path: &Path, table: &str) -> Result<(), BartableError> {
    use crate::ports::table_port::BarTablePort;

    let config = load_config(config_path)?;
    let storage = open_table(&config, table)?;
    let columns = storage.column_names()?;
    if columns.is_empty() {
        eprintln!("No table named {table}");
    }
    for column in &columns {
        println!("{column}");
    }
    Ok(())
}

#[cfg(not(feature = "sqlite"))]
fn sqlite_required(command: &str) -> Result<(), BartableError> {
    Err(BartableError::ConfigInvalid {
        section: "sqlite".into(),
        key: "path".into(),
        reason: format!("sqlite feature is required for {command}"),
    })
}

#[cfg(not(feature = "sqlite"))]
fn run_add(_: &Path, _: &str, _: &str, _: Option<&str>) -> Result<(), BartableError> {
    sqlite_required("add")
}

#[cfg(not(feature = "sqlite"))]
fn run_import(_: &Path, _: &str, _: &Path) -> Result<(), BartableError> {
    sqlite_required("import")
}

#[cfg(not(feature = "sqlite"))]
fn run_columns(_: &Path, _: &str) -> Result<(), BartableError> {
    sqlite_required("columns")
}
