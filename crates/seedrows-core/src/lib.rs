pub mod check;
pub mod config;
pub mod error;
pub mod generate;
pub mod output;

// Re-export key types for convenience
pub use error::{Result, SeedRowsError};
pub use generate::context::GenerationContext;
pub use generate::engine::{EmitOptions, GeneratedTable, TableDefinition};
pub use generate::registry::{generator_fn, ColumnGenerator, ColumnRegistry, Row};
pub use generate::value::Value;
