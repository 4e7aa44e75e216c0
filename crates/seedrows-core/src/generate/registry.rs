//! # Column Generator Registry
//!
//! An ordered list of `(column name, generator)` pairs. The registry only
//! stores configuration; `engine::generate_row` walks it in declaration order
//! and hands each generator the partial row built so far.

use indexmap::IndexMap;

use crate::error::{Result, SeedRowsError};
use crate::generate::context::GenerationContext;
use crate::generate::value::Value;

/// A row under construction: column name to string value, in declaration order.
pub type Row = IndexMap<String, String>;

/// Produces one value per invocation for a single column.
///
/// `row` holds the columns generated earlier in the same row, so a generator
/// may derive its value from them (an email from a name, a per-parent
/// counter from a foreign key).
pub trait ColumnGenerator {
    fn generate(&self, row: &Row, ctx: &mut GenerationContext) -> Result<Value>;
}

impl<F> ColumnGenerator for F
where
    F: Fn(&Row, &mut GenerationContext) -> Result<Value>,
{
    fn generate(&self, row: &Row, ctx: &mut GenerationContext) -> Result<Value> {
        self(row, ctx)
    }
}

/// Pin a closure to the generator signature so its argument and return types
/// are inferred without annotations.
pub fn generator_fn<F>(f: F) -> F
where
    F: Fn(&Row, &mut GenerationContext) -> Result<Value>,
{
    f
}

/// Ordered column-name to generator mapping for one table.
#[derive(Default)]
pub struct ColumnRegistry {
    columns: Vec<(String, Box<dyn ColumnGenerator>)>,
}

impl ColumnRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column. Column names must be unique within a registry.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        generator: impl ColumnGenerator + 'static,
    ) -> Result<()> {
        let name = name.into();
        if self.contains(&name) {
            return Err(SeedRowsError::DuplicateColumn { column: name });
        }
        self.columns.push((name, Box::new(generator)));
        Ok(())
    }

    /// Builder-style `register`.
    pub fn with_column(
        mut self,
        name: impl Into<String>,
        generator: impl ColumnGenerator + 'static,
    ) -> Result<Self> {
        self.register(name, generator)?;
        Ok(self)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|(n, _)| n == name)
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &dyn ColumnGenerator)> {
        self.columns.iter().map(|(n, g)| (n.as_str(), g.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl std::fmt::Debug for ColumnRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.column_names()).finish()
    }
}
