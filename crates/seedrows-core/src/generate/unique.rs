use std::collections::HashSet;

use crate::error::{Result, SeedRowsError};
use crate::generate::registry::{ColumnRegistry, Row};

/// Tracks emitted primary-key tuples for one table.
pub struct PrimaryKeyTracker {
    columns: Vec<String>,
    seen: HashSet<Vec<String>>,
}

impl PrimaryKeyTracker {
    /// Create a tracker over `columns`, which must all be registered.
    pub fn new(columns: &[String], registry: &ColumnRegistry) -> Result<Self> {
        for col in columns {
            if !registry.contains(col) {
                return Err(SeedRowsError::Config {
                    message: format!(
                        "Primary key column '{}' is not one of the generated columns ({})",
                        col,
                        registry.column_names().collect::<Vec<_>>().join(", ")
                    ),
                });
            }
        }

        Ok(Self {
            columns: columns.to_vec(),
            seen: HashSet::new(),
        })
    }

    /// Project `row` onto the key columns. If the tuple is new, record it and
    /// return true. If it was already emitted, return false.
    ///
    /// With no key columns every row is accepted.
    pub fn try_insert(&mut self, row: &Row) -> bool {
        if self.columns.is_empty() {
            return true;
        }

        let key: Vec<String> = self
            .columns
            .iter()
            .map(|c| row.get(c).cloned().unwrap_or_default())
            .collect();
        self.seen.insert(key)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of distinct keys recorded.
    pub fn count(&self) -> usize {
        self.seen.len()
    }
}
