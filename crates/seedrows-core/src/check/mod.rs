//! # Config Check
//!
//! Static validation of a parsed config against the files it reads. Catches
//! missing sources, empty sources and header typos before a long generation
//! run hits them mid-table. A delimited source that is the output of a table
//! declared earlier in the same config is checked against that table's
//! columns and output delimiter instead of the file, since the file is only
//! written during the run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::{GeneratorSpec, SeedRowsConfig};
use crate::error::SeedRowsError;
use crate::generate::pool::{read_delimited, DEFAULT_DELIMITER};

/// Result of checking a config.
#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    pub sources: Vec<SourceStatus>,
    pub issues: Vec<CheckIssue>,
}

/// One source-backed column and what the check found.
#[derive(Debug, Clone)]
pub struct SourceStatus {
    pub table: String,
    pub column: String,
    pub kind: &'static str,
    pub path: PathBuf,
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct CheckIssue {
    pub table: String,
    pub column: String,
    pub message: String,
}

impl CheckReport {
    pub fn is_ok(&self) -> bool {
        self.issues.is_empty()
    }

    /// Human-readable summary for terminal output.
    pub fn summary(&self) -> String {
        if self.is_ok() {
            return format!("Config OK ({} source columns checked).", self.sources.len());
        }

        let mut lines = vec![format!("{} problem(s) found:", self.issues.len())];
        for issue in &self.issues {
            lines.push(format!("  ✗ {}.{}: {}", issue.table, issue.column, issue.message));
        }
        lines.join("\n")
    }
}

/// Check every source-backed column of `config`.
pub fn check_config(config: &SeedRowsConfig) -> CheckReport {
    let mut report = CheckReport::default();

    // Output path -> producing table for tables declared so far.
    let mut produced: HashMap<PathBuf, Produced> = HashMap::new();

    for (table_name, table) in &config.tables {
        for col in &table.columns {
            let (path, outcome) = match &col.generator {
                GeneratorSpec::Text { path } => {
                    let path = config.resolve_path(path);
                    let outcome = check_text(&path);
                    (path, outcome)
                }
                GeneratorSpec::Delimited {
                    path,
                    column,
                    delimiter,
                    ..
                } => {
                    let path = config.resolve_path(path);
                    let delimiter = delimiter.unwrap_or(DEFAULT_DELIMITER);
                    let outcome = match produced.get(&path) {
                        Some(producer) => producer.check(column, delimiter),
                        None => check_delimited(&path, column, delimiter),
                    };
                    (path, outcome)
                }
                _ => continue,
            };

            let status = match outcome {
                Ok(status) => status,
                Err(message) => {
                    report.issues.push(CheckIssue {
                        table: table_name.clone(),
                        column: col.name.clone(),
                        message: message.clone(),
                    });
                    message
                }
            };
            report.sources.push(SourceStatus {
                table: table_name.clone(),
                column: col.name.clone(),
                kind: col.generator.kind_name(),
                path,
                status,
            });
        }

        produced.insert(
            config.output_path(table_name, table),
            Produced {
                table: table_name.clone(),
                columns: table.columns.iter().map(|c| c.name.clone()).collect(),
                delimiter: config.delimiter(),
            },
        );
    }

    report
}

/// An output file written by a table declared earlier in the config.
struct Produced {
    table: String,
    columns: Vec<String>,
    delimiter: char,
}

impl Produced {
    fn check(&self, column: &str, delimiter: char) -> std::result::Result<String, String> {
        if !self.columns.iter().any(|c| c == column) {
            return Err(format!(
                "column '{}' is not produced by table {} ({})",
                column,
                self.table,
                self.columns.join(", ")
            ));
        }
        if delimiter != self.delimiter {
            return Err(format!(
                "table {} writes with delimiter {:?} but this column reads with {:?}; set `delimiter = {:?}`",
                self.table, self.delimiter, delimiter, self.delimiter.to_string()
            ));
        }
        Ok(format!("written earlier by {}", self.table))
    }
}

fn check_text(path: &Path) -> std::result::Result<String, String> {
    let content = read(path)?;
    match content.lines().count() {
        0 => Err(format!("{} is empty", path.display())),
        n => Ok(format!("{} values", n)),
    }
}

fn check_delimited(
    path: &Path,
    column: &str,
    delimiter: char,
) -> std::result::Result<String, String> {
    let file = read_delimited(path, delimiter).map_err(|e| e.to_string())?;
    if !file.header.iter().any(|h| h == column) {
        return Err(format!(
            "column '{}' not in header of {} ({})",
            column,
            path.display(),
            file.header.join(", ")
        ));
    }
    if file.records.is_empty() {
        return Err(format!("{} has no data rows", path.display()));
    }
    Ok(format!("{} records", file.records.len()))
}

fn read(path: &Path) -> std::result::Result<String, String> {
    std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SeedRowsError::SourceNotFound {
                path: path.to_path_buf(),
            }
            .to_string()
        } else {
            format!("cannot read {}: {}", path.display(), e)
        }
    })
}
