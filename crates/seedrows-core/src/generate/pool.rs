//! # Source Pools
//!
//! Exhaustible, shuffled pools of values read from source files. Each pool
//! hands out its values without replacement; once empty it re-reads the file,
//! reshuffles, and starts a new cycle. Values may repeat across cycles but
//! never within one.
//!
//! Text sources hold one value per line. Delimited sources have a header line
//! naming the columns; on reload their data records are shuffled as whole
//! records and then split into one queue per column. From that point each
//! column is drawn independently, so two columns drawn in the same row are not
//! guaranteed to come from the same original record. Callers needing
//! correlated columns draw once and derive the rest from that value.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Result, SeedRowsError};

/// Default field delimiter for delimited sources.
pub const DEFAULT_DELIMITER: char = ',';

/// Restricts which data records of a delimited source are eligible.
///
/// Positions are 0-based and exclude the header. The range is half-open and
/// either end may be omitted; both ends are clamped to the record count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecordRange {
    pub start: Option<usize>,
    pub end: Option<usize>,
}

impl RecordRange {
    pub fn new(start: Option<usize>, end: Option<usize>) -> Self {
        Self { start, end }
    }

    /// Only the first `n` records.
    pub fn first(n: usize) -> Self {
        Self::new(None, Some(n))
    }

    fn apply<T>(&self, mut records: Vec<T>) -> Vec<T> {
        let len = records.len();
        let end = self.end.unwrap_or(len).min(len);
        let start = self.start.unwrap_or(0).min(end);
        records.truncate(end);
        records.drain(..start);
        records
    }
}

impl fmt::Display for RecordRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start, self.end) {
            (Some(s), Some(e)) => write!(f, "{}..{}", s, e),
            (Some(s), None) => write!(f, "{}..", s),
            (None, Some(e)) => write!(f, "..{}", e),
            (None, None) => write!(f, ".."),
        }
    }
}

/// Identifies one delimited source pool: the file, its delimiter, and the
/// eligible record range. Different ranges over the same file are separate
/// pools.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DelimitedSource {
    pub path: PathBuf,
    pub delimiter: char,
    pub records: Option<RecordRange>,
}

impl DelimitedSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: DEFAULT_DELIMITER,
            records: None,
        }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_records(mut self, records: RecordRange) -> Self {
        self.records = Some(records);
        self
    }
}

/// All source pools of one generation run.
#[derive(Debug, Default)]
pub struct PoolSampler {
    /// Remaining lines per text source.
    text: HashMap<PathBuf, Vec<String>>,
    /// Remaining values per delimited source, per column.
    delimited: HashMap<DelimitedSource, HashMap<String, Vec<String>>>,
}

impl PoolSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw one line from a text source, reloading the pool when empty.
    pub fn draw_text(&mut self, path: &Path, rng: &mut impl Rng) -> Result<String> {
        let pool = self.text.entry(path.to_path_buf()).or_default();
        if pool.is_empty() {
            *pool = load_text(path, rng)?;
        }

        pool.pop().ok_or_else(|| SeedRowsError::EmptySource {
            path: path.to_path_buf(),
            detail: String::new(),
        })
    }

    /// Draw one value of `column` from a delimited source.
    ///
    /// When that column's queue is empty the whole source is reloaded, which
    /// replaces the queues of every column of this source.
    pub fn draw_delimited(
        &mut self,
        source: &DelimitedSource,
        column: &str,
        rng: &mut impl Rng,
    ) -> Result<String> {
        let needs_reload = self
            .delimited
            .get(source)
            .and_then(|columns| columns.get(column))
            .is_none_or(Vec::is_empty);

        if needs_reload {
            let (header, queues) = load_delimited(source, rng)?;
            if !queues.contains_key(column) {
                return Err(SeedRowsError::UnknownSourceColumn {
                    path: source.path.clone(),
                    column: column.to_string(),
                    available: header.join(", "),
                });
            }
            self.delimited.insert(source.clone(), queues);
        }

        self.delimited
            .get_mut(source)
            .and_then(|columns| columns.get_mut(column))
            .and_then(Vec::pop)
            .ok_or_else(|| SeedRowsError::EmptySource {
                path: source.path.clone(),
                detail: String::new(),
            })
    }

    /// Number of values left in a text pool before its next reload.
    pub fn text_remaining(&self, path: &Path) -> usize {
        self.text.get(path).map(|p| p.len()).unwrap_or(0)
    }

    /// Number of values left for one column of a delimited source.
    pub fn delimited_remaining(&self, source: &DelimitedSource, column: &str) -> usize {
        self.delimited
            .get(source)
            .and_then(|columns| columns.get(column))
            .map(|p| p.len())
            .unwrap_or(0)
    }
}

fn source_io_error(path: &Path, e: std::io::Error) -> SeedRowsError {
    if e.kind() == std::io::ErrorKind::NotFound {
        SeedRowsError::SourceNotFound {
            path: path.to_path_buf(),
        }
    } else {
        SeedRowsError::SourceRead {
            path: path.to_path_buf(),
            source: e,
        }
    }
}

/// Read a source file whole, mapping a missing file to `SourceNotFound`.
fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| source_io_error(path, e))
}

fn load_text(path: &Path, rng: &mut impl Rng) -> Result<Vec<String>> {
    let content = read_source(path)?;
    let mut values: Vec<String> = content.lines().map(|l| l.trim_end().to_string()).collect();
    if values.is_empty() {
        return Err(SeedRowsError::EmptySource {
            path: path.to_path_buf(),
            detail: String::new(),
        });
    }

    values.shuffle(rng);
    debug!("Reloaded text pool {} ({} values)", path.display(), values.len());
    Ok(values)
}

/// A delimited source read whole: the header and every data record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelimitedFile {
    pub header: Vec<String>,
    pub records: Vec<Vec<String>>,
}

/// Read a delimited source file.
///
/// Fields are split on `delimiter` alone: quote characters are ordinary
/// text and there is no escaping. Empty lines are skipped. Every record must
/// have as many fields as the header.
pub fn read_delimited(path: &Path, delimiter: char) -> Result<DelimitedFile> {
    let delimiter = u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| SeedRowsError::Config {
            message: format!(
                "delimiter {:?} for {} must be a single ASCII character",
                delimiter,
                path.display()
            ),
        })?;
    let file = File::open(path).map_err(|e| source_io_error(path, e))?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .quoting(false)
        .flexible(true)
        .from_reader(file);

    let header: Vec<String> = reader
        .headers()
        .map_err(|e| parse_error(path, e))?
        .iter()
        .map(str::to_string)
        .collect();
    if header.is_empty() {
        return Err(SeedRowsError::EmptySource {
            path: path.to_path_buf(),
            detail: " (missing header line)".to_string(),
        });
    }

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| parse_error(path, e))?;
        if record.len() != header.len() {
            return Err(SeedRowsError::MalformedRecord {
                path: path.to_path_buf(),
                line: record.position().map(|p| p.line() as usize).unwrap_or_default(),
                expected: header.len(),
                found: record.len(),
            });
        }
        records.push(record.iter().map(str::to_string).collect());
    }

    Ok(DelimitedFile { header, records })
}

fn parse_error(path: &Path, source: csv::Error) -> SeedRowsError {
    SeedRowsError::SourceParse {
        path: path.to_path_buf(),
        source,
    }
}

type ColumnQueues = HashMap<String, Vec<String>>;

fn load_delimited(source: &DelimitedSource, rng: &mut impl Rng) -> Result<(Vec<String>, ColumnQueues)> {
    let path = &source.path;
    let DelimitedFile { header, mut records } = read_delimited(path, source.delimiter)?;

    if let Some(range) = &source.records {
        records = range.apply(records);
    }
    if records.is_empty() {
        return Err(SeedRowsError::EmptySource {
            path: path.clone(),
            detail: source
                .records
                .map(|r| format!(" in record range {}", r))
                .unwrap_or_default(),
        });
    }

    // Whole records are shuffled once; the per-column queues below each keep
    // that one permutation and are never reshuffled individually.
    records.shuffle(rng);

    let mut queues: ColumnQueues = header
        .iter()
        .map(|name| (name.clone(), Vec::with_capacity(records.len())))
        .collect();
    for record in records {
        for (name, field) in header.iter().zip(record) {
            if let Some(queue) = queues.get_mut(name) {
                queue.push(field);
            }
        }
    }

    debug!(
        "Reloaded delimited pool {} ({} columns)",
        path.display(),
        header.len()
    );
    Ok((header, queues))
}
