//! # Configuration File Parser
//!
//! Reads and parses `seedrows.toml`, which declares the tables to generate.
//! Tables are generated in file order, so a table may draw foreign keys from
//! an output written by a table declared above it.
//!
//! - `[generate]` — run-wide seed, output delimiter, attempt ceiling
//! - `[tables.<name>]` — output path, row count, primary key
//! - `[[tables.<name>.columns]]` — ordered column generators, one `kind` each
//!
//! Example `seedrows.toml`:
//!
//! ```toml
//! [generate]
//! seed = 42
//!
//! [tables.CUSTOMER]
//! output = "data_export/CUSTOMER.csv"
//! rows = 200
//! primary_key = ["ID"]
//!
//! [[tables.CUSTOMER.columns]]
//! name = "ID"
//! kind = "counter"
//!
//! [[tables.CUSTOMER.columns]]
//! name = "Name"
//! kind = "text"
//! path = "data_source/names.txt"
//!
//! [[tables.CUSTOMER.columns]]
//! name = "Email"
//! kind = "email"
//! from = "Name"
//!
//! [tables.TICKET]
//! output = "data_export/TICKET.csv"
//! rows = 5000
//! primary_key = ["MatchID", "Ticket#"]
//!
//! [[tables.TICKET.columns]]
//! name = "MatchID"
//! kind = "delimited"
//! path = "data_export/MATCH.csv"
//! column = "ID"
//!
//! [[tables.TICKET.columns]]
//! name = "Ticket#"
//! kind = "counter"
//! per = "MatchID"
//! ```
//!
//! Relative paths resolve against the directory holding the config file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::{Result, SeedRowsError};
use crate::generate::pool::RecordRange;
use crate::generate::providers::template_columns;

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = "seedrows.toml";

/// Top-level seedrows.toml structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SeedRowsConfig {
    /// Run-wide generation settings.
    pub generate: GenerateConfig,
    /// Tables in generation order, keyed by table name.
    pub tables: IndexMap<String, TableConfig>,

    /// Absolute path to the directory containing seedrows.toml.
    ///
    /// Populated by `read_config()` so that relative source and output paths
    /// resolve against the config file's location, not the CWD.
    #[serde(skip)]
    pub config_dir: Option<PathBuf>,
}

/// Run-wide generation settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    /// Fixed random seed for deterministic generation.
    pub seed: Option<u64>,
    /// Output field delimiter (default `,`).
    pub delimiter: Option<char>,
    /// Consecutive duplicate-key candidates tolerated before a table fails.
    /// Absent means retry forever.
    pub max_attempts: Option<usize>,
}

/// One table to generate.
#[derive(Debug, Clone, Deserialize)]
pub struct TableConfig {
    /// Output file; defaults to `<table name>.csv` beside the config.
    #[serde(default)]
    pub output: Option<PathBuf>,
    /// Number of unique rows to emit.
    pub rows: usize,
    /// Columns whose combined values must be unique.
    #[serde(default)]
    pub primary_key: Vec<String>,
    /// Column generators in output order.
    #[serde(default)]
    pub columns: Vec<ColumnConfig>,
}

/// One column and the generator that fills it.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnConfig {
    pub name: String,
    #[serde(flatten)]
    pub generator: GeneratorSpec,
}

/// The built-in generator kinds, selected by `kind = "..."`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeneratorSpec {
    /// Next value of a counter. `key` names a shared counter; `per` keeps one
    /// counter per distinct value of an earlier column. With neither, the
    /// counter is private to this column.
    Counter {
        #[serde(default)]
        key: Option<String>,
        #[serde(default)]
        per: Option<String>,
    },
    /// One line of a text file, without replacement until exhausted.
    Text { path: PathBuf },
    /// One value of a column of a delimited file.
    Delimited {
        path: PathBuf,
        column: String,
        #[serde(default)]
        delimiter: Option<char>,
        #[serde(default)]
        records: Option<RecordRange>,
    },
    /// Email built from an earlier column's value.
    Email {
        from: String,
        #[serde(default = "default_email_domain")]
        domain: String,
    },
    /// Price string `"<units>.<cents>"`.
    Price {
        #[serde(default = "default_price_min")]
        min: u32,
        #[serde(default = "default_price_max")]
        max: u32,
    },
    /// Uniform integer in `min..=max`.
    Integer { min: i64, max: i64 },
    /// Pick from a fixed list, optionally weighted.
    Values {
        values: Vec<String>,
        #[serde(default)]
        weights: Option<Vec<f64>>,
    },
    /// Fake-data provider.
    Fake { faker: FakerKind },
    /// Random v4 UUID.
    Uuid,
    /// Uniform date in `start..=end`.
    Date {
        start: NaiveDate,
        end: NaiveDate,
        #[serde(default)]
        format: Option<String>,
    },
    /// String with `{Column}` placeholders replaced by earlier columns.
    Template { template: String },
    /// Repeat an earlier column's value.
    Copy { from: String },
}

/// Fake-data providers available to `kind = "fake"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FakerKind {
    FirstName,
    LastName,
    Name,
    City,
    Country,
    Company,
    Word,
    Phone,
}

fn default_email_domain() -> String {
    "example.com".to_string()
}

fn default_price_min() -> u32 {
    50
}

fn default_price_max() -> u32 {
    200
}

impl GeneratorSpec {
    /// Earlier columns this generator reads from the partial row.
    pub fn referenced_columns(&self) -> Vec<String> {
        match self {
            GeneratorSpec::Counter { per: Some(col), .. } => vec![col.clone()],
            GeneratorSpec::Email { from, .. } | GeneratorSpec::Copy { from } => vec![from.clone()],
            GeneratorSpec::Template { template } => template_columns(template),
            _ => Vec::new(),
        }
    }

    /// Short label for terminal output.
    pub fn kind_name(&self) -> &'static str {
        match self {
            GeneratorSpec::Counter { .. } => "counter",
            GeneratorSpec::Text { .. } => "text",
            GeneratorSpec::Delimited { .. } => "delimited",
            GeneratorSpec::Email { .. } => "email",
            GeneratorSpec::Price { .. } => "price",
            GeneratorSpec::Integer { .. } => "integer",
            GeneratorSpec::Values { .. } => "values",
            GeneratorSpec::Fake { .. } => "fake",
            GeneratorSpec::Uuid => "uuid",
            GeneratorSpec::Date { .. } => "date",
            GeneratorSpec::Template { .. } => "template",
            GeneratorSpec::Copy { .. } => "copy",
        }
    }
}

/// Read and parse a config file.
///
/// Unlike source files, the config is required: a missing file is an error.
pub fn read_config(path: &Path) -> Result<SeedRowsConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SeedRowsError::Config {
        message: format!("Failed to read {}: {}", path.display(), e),
    })?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    // Capture the absolute config directory so relative paths resolve
    // against the config's location, not CWD.
    let dir = std::fs::canonicalize(&dir).unwrap_or(dir);

    parse_config(&content, &dir).map_err(|e| match e {
        SeedRowsError::Config { message } => SeedRowsError::Config {
            message: format!("{}: {}", path.display(), message),
        },
        other => other,
    })
}

/// Parse config text, resolving relative paths against `config_dir`.
pub fn parse_config(content: &str, config_dir: &Path) -> Result<SeedRowsConfig> {
    let mut config: SeedRowsConfig = toml::from_str(content).map_err(|e| SeedRowsError::Config {
        message: format!("Failed to parse config: {}", e),
    })?;
    config.config_dir = Some(config_dir.to_path_buf());

    // Validate semantic constraints that serde can't enforce.
    config.validate()?;

    Ok(config)
}

impl SeedRowsConfig {
    /// Resolve a path from the config against the config directory.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.config_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Resolved output path of a table.
    pub fn output_path(&self, table_name: &str, table: &TableConfig) -> PathBuf {
        match &table.output {
            Some(path) => self.resolve_path(path),
            None => self.resolve_path(Path::new(&format!("{}.csv", table_name))),
        }
    }

    pub fn delimiter(&self) -> char {
        self.generate
            .delimiter
            .unwrap_or(crate::generate::pool::DEFAULT_DELIMITER)
    }

    /// Validate semantic constraints that serde cannot enforce.
    ///
    /// Catches configuration mistakes before any source file is read.
    /// Source-file problems (missing files, unknown header columns) are
    /// reported by `check::check_config` or at draw time.
    pub fn validate(&self) -> Result<()> {
        if self.tables.is_empty() {
            return Err(config_error("No tables declared. Add a [tables.<name>] section."));
        }
        if let Some(d) = self.generate.delimiter {
            if d == '\n' || d == '\r' {
                return Err(config_error("generate.delimiter cannot be a line break"));
            }
        }

        for (table_name, table) in &self.tables {
            validate_table(table_name, table)?;
        }
        Ok(())
    }
}

fn validate_table(table_name: &str, table: &TableConfig) -> Result<()> {
    if table.columns.is_empty() {
        return Err(config_error(format!("Table '{}' declares no columns", table_name)));
    }

    let mut earlier: HashSet<&str> = HashSet::new();
    for col in &table.columns {
        let at = format!("{}.{}", table_name, col.name);

        for referenced in col.generator.referenced_columns() {
            if !earlier.contains(referenced.as_str()) {
                return Err(config_error(format!(
                    "Column '{}' reads '{}', which must be declared above it in table '{}'",
                    at, referenced, table_name
                )));
            }
        }
        validate_generator(&at, &col.generator)?;

        if !earlier.insert(col.name.as_str()) {
            return Err(config_error(format!(
                "Column '{}' is declared more than once",
                at
            )));
        }
    }

    for pk in &table.primary_key {
        if !earlier.contains(pk.as_str()) {
            return Err(config_error(format!(
                "Table '{}': primary key column '{}' is not a declared column",
                table_name, pk
            )));
        }
    }
    Ok(())
}

fn validate_generator(at: &str, spec: &GeneratorSpec) -> Result<()> {
    match spec {
        GeneratorSpec::Counter {
            key: Some(_),
            per: Some(_),
        } => Err(config_error(format!(
            "Column '{}': counter takes either `key` or `per`, not both",
            at
        ))),
        GeneratorSpec::Price { min, max } if min > max => Err(config_error(format!(
            "Column '{}': price min {} is greater than max {}",
            at, min, max
        ))),
        GeneratorSpec::Integer { min, max } if min > max => Err(config_error(format!(
            "Column '{}': integer min {} is greater than max {}",
            at, min, max
        ))),
        GeneratorSpec::Date { start, end, .. } if start > end => Err(config_error(format!(
            "Column '{}': date start {} is after end {}",
            at, start, end
        ))),
        GeneratorSpec::Values { values, weights } => {
            if values.is_empty() {
                return Err(config_error(format!(
                    "Column '{}': values list is empty",
                    at
                )));
            }
            match weights {
                Some(w) if w.len() != values.len() => Err(config_error(format!(
                    "Column '{}': weights has {} entries but values has {} entries. \
                     They must be the same length.",
                    at,
                    w.len(),
                    values.len()
                ))),
                _ => Ok(()),
            }
        }
        GeneratorSpec::Delimited {
            delimiter: Some(d), ..
        } if *d == '\n' || *d == '\r' || !d.is_ascii() => Err(config_error(format!(
            "Column '{}': source delimiter {:?} must be an ASCII character other than a line break",
            at, d
        ))),
        _ => Ok(()),
    }
}

fn config_error(message: impl Into<String>) -> SeedRowsError {
    SeedRowsError::Config {
        message: message.into(),
    }
}
