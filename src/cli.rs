use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::{
    format::FormatOptions, io_utils::RowFormat, json_schema::JsonSchemaOptions,
    markers::NullMarkers, schema::SchemaOptions,
};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Infer column types, formats and statistics from untyped tabular data",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Infer a descriptor for every column and print or save it
    Probe(ProbeArgs),
    /// Rewrite rows with values coerced to their inferred types
    Format(FormatArgs),
    /// Emit a JSON Schema describing one row of the input
    JsonSchema(JsonSchemaArgs),
}

#[derive(Debug, Args)]
pub struct InputArgs {
    /// Input CSV or JSON file (`-` reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Input layout; defaults to JSON for `.json` files and CSV otherwise
    #[arg(long = "input-format", value_enum)]
    pub input_format: Option<InputFormat>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

impl InputArgs {
    pub fn row_format(&self) -> RowFormat {
        match self.input_format {
            Some(InputFormat::Csv) => RowFormat::Csv,
            Some(InputFormat::Json) => RowFormat::Json,
            None => RowFormat::from_path(&self.input),
        }
    }
}

#[derive(Debug, Args)]
pub struct InferenceArgs {
    /// Skip numeric detection: every numeral, native ones included, stays a string
    #[arg(long = "prefer-string-numbers")]
    pub prefer_string_numbers: bool,
    /// Clean column names (NFC, invisible characters, whitespace) and dedupe them
    #[arg(long = "sanitize-keys")]
    pub sanitize_keys: bool,
    /// Treat sentinel values such as N/A or -- as empty
    #[arg(long = "null-markers")]
    pub null_markers: bool,
    /// Replace the default sentinel list (comma separated)
    #[arg(long = "null-marker-list", value_delimiter = ',', requires = "null_markers")]
    pub null_marker_list: Vec<String>,
    /// Omit columns with no non-empty values
    #[arg(long = "drop-empty-columns")]
    pub drop_empty_columns: bool,
}

impl InferenceArgs {
    pub fn to_options(&self) -> SchemaOptions {
        let null_markers = if self.null_marker_list.is_empty() {
            NullMarkers::default()
        } else {
            NullMarkers::new(&self.null_marker_list)
        };
        SchemaOptions {
            prefer_string_numbers: self.prefer_string_numbers,
            sanitize_keys: self.sanitize_keys,
            use_null_markers_for_inference: self.null_markers,
            drop_empty_columns: self.drop_empty_columns,
            null_markers,
        }
    }
}

#[derive(Debug, Args)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub inference: InferenceArgs,
    /// Destination for the descriptors (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Rendering of the descriptors
    #[arg(long = "output-format", value_enum, default_value_t = OutputFormat::Table)]
    pub output_format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct FormatArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub inference: InferenceArgs,
    /// Output file; `.csv`/`.tsv` write CSV, anything else a JSON array
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Character encoding of the output (defaults to utf-8)
    #[arg(long = "output-encoding")]
    pub output_encoding: Option<String>,
    /// Leave empty strings in Number columns instead of writing null
    #[arg(long = "keep-empty-strings")]
    pub keep_empty_strings: bool,
    /// Coerce mixed columns whose best guess is numeric or boolean
    #[arg(long = "best-guess")]
    pub best_guess: bool,
    /// Rewrite date columns as ISO 8601
    #[arg(long = "convert-dates")]
    pub convert_dates: bool,
    /// Log the resolved type of every column
    #[arg(long)]
    pub report: bool,
    /// Log every value a coercion left unconverted
    #[arg(long = "report-ignored")]
    pub report_ignored: bool,
}

impl FormatArgs {
    pub fn to_options(&self) -> FormatOptions {
        FormatOptions {
            schema: self.inference.to_options(),
            number_empty_as_null: !self.keep_empty_strings,
            best_guess: self.best_guess,
            report_ignored: self.report_ignored,
            report: self.report,
            convert_dates: self.convert_dates,
        }
    }
}

#[derive(Debug, Args)]
pub struct JsonSchemaArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub inference: InferenceArgs,
    /// Destination file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Title recorded in the schema document
    #[arg(long)]
    pub title: Option<String>,
}

impl JsonSchemaArgs {
    pub fn to_options(&self) -> JsonSchemaOptions {
        JsonSchemaOptions {
            title: self.title.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum InputFormat {
    Csv,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "pipe" | "|" => Ok(b'|'),
        "semicolon" | ";" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() || !first.is_ascii() {
                return Err(format!(
                    "Delimiter must be a single ASCII character, got '{other}'"
                ));
            }
            Ok(first as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_names_and_characters() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter("semicolon"), Ok(b';'));
        assert_eq!(parse_delimiter("#"), Ok(b'#'));
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("é").is_err());
    }

    #[test]
    fn format_flags_map_to_options() {
        let cli = Cli::parse_from([
            "column-infer",
            "format",
            "-i",
            "rows.csv",
            "--keep-empty-strings",
            "--null-markers",
            "--null-marker-list",
            "?,tbd",
            "--best-guess",
        ]);
        let Commands::Format(args) = cli.command else {
            panic!("expected format command");
        };
        let options = args.to_options();
        assert!(!options.number_empty_as_null);
        assert!(options.best_guess);
        assert!(options.schema.use_null_markers_for_inference);
        assert!(options.schema.null_markers.matches("TBD"));
        assert!(!options.schema.null_markers.matches("n/a"));
    }
}
