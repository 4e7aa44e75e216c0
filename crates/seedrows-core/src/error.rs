//! # Error Types
//!
//! Defines `SeedRowsError`, the unified error enum for every failure mode in
//! the seedrows pipeline. Variants carry the source path, column or table
//! involved so a failed run can be debugged from the message alone.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can occur in seedrows operations.
#[derive(Error, Debug)]
pub enum SeedRowsError {
    #[error("Source file not found: {path}\n  Check the `path` of the column generator that references it")]
    SourceNotFound { path: PathBuf },

    #[error("Failed to read source file {path}: {source}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse delimited source {path}: {source}")]
    SourceParse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Source file {path} has no data rows{detail}")]
    EmptySource { path: PathBuf, detail: String },

    #[error("Column '{column}' not found in header of {path}\n  Available columns: {available}")]
    UnknownSourceColumn {
        path: PathBuf,
        column: String,
        available: String,
    },

    #[error("Malformed record at {path}:{line}: expected {expected} fields, found {found}")]
    MalformedRecord {
        path: PathBuf,
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Generator for column '{column}' failed: {message}")]
    Generator { column: String, message: String },

    #[error("Column '{column}' is declared more than once")]
    DuplicateColumn { column: String },

    #[error("Failed to generate {target} unique rows for {table}: {max_attempts} consecutive candidates repeated an emitted key on ({columns}) after {rows_emitted} rows\n  The primary key space is smaller than the requested row count. Reduce `rows` or widen the key columns' generators")]
    SearchSpaceExhausted {
        table: String,
        columns: String,
        rows_emitted: usize,
        target: usize,
        max_attempts: usize,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Output error: {message}: {source}")]
    Output {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

impl SeedRowsError {
    /// Shorthand for a generator failure on `column`.
    pub fn generator(column: &str, message: impl Into<String>) -> Self {
        SeedRowsError::Generator {
            column: column.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SeedRowsError>;
