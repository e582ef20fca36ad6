mod accumulator;
pub mod classify;
pub mod cli;
pub mod data;
pub mod dates;
pub mod error;
pub mod format;
pub mod io_utils;
pub mod json_schema;
pub mod keys;
pub mod markers;
pub mod normalize;
pub mod schema;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::cli::{Cli, Commands, InputArgs, OutputFormat};

pub use crate::{
    classify::{Classification, classify_value},
    data::Row,
    dates::{guess_column_date_format, guess_date_format},
    error::{InferError, InferResult},
    format::{FormatOptions, FormatReport, IgnoredValue, data_format, data_format_with_report},
    json_schema::{JsonSchemaOptions, to_json_schema, to_json_schema_from_rows},
    keys::KeySanitizer,
    markers::NullMarkers,
    normalize::{normalize_boolean, normalize_number},
    schema::{ColumnDescriptor, ColumnType, SchemaOptions, get_schema, get_schema_from_json},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("column_infer", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Probe(args) => handle_probe(&args),
        Commands::Format(args) => handle_format(&args),
        Commands::JsonSchema(args) => handle_json_schema(&args),
    }
}

fn load_rows(input: &InputArgs) -> Result<Vec<serde_json::Value>> {
    let encoding = io_utils::resolve_encoding(input.input_encoding.as_deref())?;
    let format = input.row_format();
    debug!(
        "Reading {:?} as {:?} ({})",
        input.input,
        format,
        encoding.name()
    );
    io_utils::read_rows(&input.input, format, input.delimiter, encoding)
        .with_context(|| format!("Loading rows from {:?}", input.input))
}

fn handle_probe(args: &cli::ProbeArgs) -> Result<()> {
    info!("Probing '{}'", args.input.input.display());
    let rows = load_rows(&args.input)?;
    let columns = get_schema(&rows, &args.inference.to_options());
    let output = args.output.as_deref();
    match args.output_format {
        OutputFormat::Table => {
            io_utils::write_text(output, &table::render_schema_table(&columns), encoding_rs::UTF_8)
        }
        OutputFormat::Json => io_utils::write_json(output, &columns),
        OutputFormat::Yaml => io_utils::write_yaml(output, &columns),
    }
    .context("Writing column descriptors")?;
    info!(
        "Inferred {} column(s) from {} row(s)",
        columns.len(),
        rows.len()
    );
    Ok(())
}

fn handle_format(args: &cli::FormatArgs) -> Result<()> {
    info!("Formatting '{}'", args.input.input.display());
    let rows = load_rows(&args.input)?;
    let output_encoding = io_utils::resolve_encoding(args.output_encoding.as_deref())?;
    let report = data_format_with_report(&rows, &args.to_options());
    io_utils::write_rows(
        args.output.as_deref(),
        &report.rows,
        args.input.delimiter,
        output_encoding,
    )
    .context("Writing formatted rows")?;
    if args.report_ignored {
        info!("{} value(s) left unconverted", report.ignored.len());
    }
    info!("Formatted {} row(s)", report.rows.len());
    Ok(())
}

fn handle_json_schema(args: &cli::JsonSchemaArgs) -> Result<()> {
    info!("Deriving JSON Schema for '{}'", args.input.input.display());
    let rows = load_rows(&args.input)?;
    let schema = to_json_schema_from_rows(&rows, &args.inference.to_options(), &args.to_options());
    io_utils::write_json(args.output.as_deref(), &schema).context("Writing JSON Schema")?;
    Ok(())
}
