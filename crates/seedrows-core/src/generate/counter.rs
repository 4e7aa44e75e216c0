use std::collections::HashMap;

/// Identifies one counter sequence.
///
/// Names chosen in the config and the keys derived for a column live in
/// separate variants, so a user-chosen name can never alias a column's
/// private counter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CounterKey {
    /// Shared by every column that names it.
    Named(String),
    /// Private to one column of one table.
    Column { table: String, column: String },
    /// One sequence per distinct value of a parent column, private to the
    /// counting column.
    PerValue {
        table: String,
        column: String,
        parent: String,
    },
}

impl From<&str> for CounterKey {
    fn from(name: &str) -> Self {
        CounterKey::Named(name.to_string())
    }
}

impl From<&String> for CounterKey {
    fn from(name: &String) -> Self {
        CounterKey::Named(name.clone())
    }
}

impl From<String> for CounterKey {
    fn from(name: String) -> Self {
        CounterKey::Named(name)
    }
}

/// Keyed, monotonically increasing integer sequences.
///
/// Each key starts at 1 on first use. Keys are independent: a global
/// primary-key counter and per-parent ticket counters can share one
/// `Counters` without interfering.
#[derive(Debug, Default)]
pub struct Counters {
    counts: HashMap<CounterKey, u64>,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the counter for `key` and return its new value.
    pub fn increment(&mut self, key: impl Into<CounterKey>) -> u64 {
        let count = self.counts.entry(key.into()).or_insert(0);
        *count += 1;
        *count
    }

    /// Current value for `key` without advancing it (0 if never used).
    pub fn current(&self, key: impl Into<CounterKey>) -> u64 {
        self.counts.get(&key.into()).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_independent_keys() {
        let mut counters = Counters::new();
        assert_eq!(counters.increment("A"), 1);
        assert_eq!(counters.increment("A"), 2);
        assert_eq!(counters.increment("A"), 3);
        assert_eq!(counters.increment("B"), 1);
        assert_eq!(counters.current("A"), 3);
        assert_eq!(counters.current("missing"), 0);
    }

    #[test]
    fn test_named_keys_never_alias_column_keys() {
        let mut counters = Counters::new();
        let column = CounterKey::Column {
            table: "T".to_string(),
            column: "ID".to_string(),
        };
        assert_eq!(counters.increment("T.ID"), 1);
        assert_eq!(counters.increment(column.clone()), 1);
        assert_eq!(counters.increment(column.clone()), 2);
        assert_eq!(counters.current("T.ID"), 1);
        assert_eq!(counters.current(column), 2);
    }
}
