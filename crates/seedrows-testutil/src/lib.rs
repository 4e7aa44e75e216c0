//! Fixture source files and configs for seedrows tests.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// First names used by the `names.txt` fixture.
pub const NAMES: &[&str] = &[
    "Alice", "Bob", "Carmen", "Dmitri", "Esther", "Farouk", "Grace", "Hiro", "Ines", "Jon",
];

/// A three-table ticketing config: CUSTOMER and MATCH are generated first,
/// then TICKET draws foreign keys from their output files.
pub const TICKET_CONFIG: &str = r#"
[generate]
seed = 42
max_attempts = 10000

[tables.CUSTOMER]
output = "data_export/CUSTOMER.csv"
rows = 25
primary_key = ["ID"]

[[tables.CUSTOMER.columns]]
name = "ID"
kind = "counter"

[[tables.CUSTOMER.columns]]
name = "Name"
kind = "text"
path = "data_source/names.txt"

[[tables.CUSTOMER.columns]]
name = "Email"
kind = "email"
from = "Name"

[tables.MATCH]
output = "data_export/MATCH.csv"
rows = 8
primary_key = ["ID"]

[[tables.MATCH.columns]]
name = "ID"
kind = "counter"

[[tables.MATCH.columns]]
name = "Venue"
kind = "values"
values = ["North Stand", "Riverside", "Old Ground"]

[[tables.MATCH.columns]]
name = "Date"
kind = "date"
start = "2025-03-01"
end = "2025-09-30"

[tables.TICKET]
output = "data_export/TICKET.csv"
rows = 60
primary_key = ["MatchID", "Ticket#"]

[[tables.TICKET.columns]]
name = "MatchID"
kind = "delimited"
path = "data_export/MATCH.csv"
column = "ID"

[[tables.TICKET.columns]]
name = "Ticket#"
kind = "counter"
per = "MatchID"

[[tables.TICKET.columns]]
name = "CustomerID"
kind = "delimited"
path = "data_export/CUSTOMER.csv"
column = "ID"

[[tables.TICKET.columns]]
name = "Price"
kind = "price"
"#;

/// A temporary working directory holding source files and configs.
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Write `content` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create fixture dir");
        }
        fs::write(&path, content).expect("write fixture file");
        path
    }

    /// Write one value per line.
    pub fn write_lines(&self, rel: &str, lines: &[&str]) -> PathBuf {
        let mut content = lines.join("\n");
        content.push('\n');
        self.write(rel, &content)
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.join(rel)).expect("read fixture output")
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture with `data_source/names.txt` and `seedrows.toml` set to
/// `TICKET_CONFIG`. Returns the fixture and the config path.
pub fn ticket_fixture() -> (Fixture, PathBuf) {
    let fixture = Fixture::new();
    fixture.write_lines("data_source/names.txt", NAMES);
    let config = fixture.write("seedrows.toml", TICKET_CONFIG);
    (fixture, config)
}

/// Parse a delimited file into its header and records.
pub fn parse_delimited(content: &str, delimiter: char) -> (Vec<String>, Vec<Vec<String>>) {
    let mut lines = content.lines();
    let header = lines
        .next()
        .map(|l| l.split(delimiter).map(str::to_string).collect())
        .unwrap_or_default();
    let records = lines
        .map(|l| l.split(delimiter).map(str::to_string).collect())
        .collect();
    (header, records)
}
