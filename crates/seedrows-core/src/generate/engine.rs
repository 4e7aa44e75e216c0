use std::io::Write;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::error::{Result, SeedRowsError};
use crate::generate::context::GenerationContext;
use crate::generate::pool::DEFAULT_DELIMITER;
use crate::generate::registry::{ColumnRegistry, Row};
use crate::generate::unique::PrimaryKeyTracker;
use crate::output::delimited::DelimitedWriter;

/// Everything needed to generate one table.
#[derive(Debug)]
pub struct TableDefinition {
    pub name: String,
    /// Where `write_table_file` puts the table.
    pub output: PathBuf,
    pub registry: ColumnRegistry,
    /// Columns whose combined values must be unique across emitted rows.
    pub primary_key: Vec<String>,
    /// Target row count.
    pub rows: usize,
}

/// Knobs for the unique-key emitter loop.
#[derive(Debug, Clone, Copy)]
pub struct EmitOptions {
    /// Field delimiter for the header and every record.
    pub delimiter: char,
    /// Maximum consecutive rejected candidates before giving up.
    /// `None` retries forever.
    pub max_attempts: Option<usize>,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            max_attempts: None,
        }
    }
}

/// Counters from one emitter run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitStats {
    /// Rows accepted and emitted.
    pub rows: usize,
    /// Candidates discarded because their key was already emitted.
    pub rejected: usize,
}

/// A table generated in memory.
#[derive(Debug, Clone)]
pub struct GeneratedTable {
    pub name: String,
    pub columns: Vec<String>,
    /// Rows in emission order. Each row's keys follow `columns`.
    pub rows: Vec<Row>,
}

/// Progress reporting batch size; avoids terminal I/O overhead on every row.
const PROGRESS_BATCH_SIZE: usize = 100;

/// Rejection streak length between "still searching" warnings.
const REJECTION_WARN_INTERVAL: usize = 10_000;

/// Build one row by running each generator in declaration order.
///
/// Every generator sees the columns produced before it in the same row.
/// Failures propagate unchanged; there are no retries at this level.
pub fn generate_row(registry: &ColumnRegistry, ctx: &mut GenerationContext) -> Result<Row> {
    let mut row = Row::with_capacity(registry.len());
    for (name, generator) in registry.iter() {
        let value = generator.generate(&row, ctx)?;
        row.insert(name.to_string(), value.to_string());
    }
    Ok(row)
}

/// Write `table.rows` unique rows to `writer`, header first.
///
/// Candidates whose primary-key tuple was already emitted are discarded. Their
/// pool draws and counter increments are not rolled back.
pub fn emit_table<W: Write>(
    table: &TableDefinition,
    ctx: &mut GenerationContext,
    writer: &mut W,
    options: &EmitOptions,
    progress_callback: Option<&dyn Fn(usize, usize)>,
) -> Result<EmitStats> {
    let columns: Vec<&str> = table.registry.column_names().collect();
    let mut out = DelimitedWriter::new(writer, options.delimiter);
    out.write_header(&columns)
        .map_err(|e| output_error(format!("writing header for {}", table.name), e))?;

    let stats = run_unique_rows(table, ctx, options, progress_callback, |row| {
        out.write_row(&columns, &row)
            .map_err(|e| output_error(format!("writing row for {}", table.name), e))
    })?;

    out.flush()
        .map_err(|e| output_error(format!("flushing {}", table.name), e))?;
    Ok(stats)
}

/// Run the same loop as `emit_table`, keeping the rows in memory.
pub fn generate_table(
    table: &TableDefinition,
    ctx: &mut GenerationContext,
    options: &EmitOptions,
) -> Result<GeneratedTable> {
    let mut rows = Vec::with_capacity(table.rows);
    run_unique_rows(table, ctx, options, None, |row| {
        rows.push(row);
        Ok(())
    })?;

    Ok(GeneratedTable {
        name: table.name.clone(),
        columns: table.registry.column_names().map(str::to_string).collect(),
        rows,
    })
}

fn run_unique_rows(
    table: &TableDefinition,
    ctx: &mut GenerationContext,
    options: &EmitOptions,
    progress_callback: Option<&dyn Fn(usize, usize)>,
    mut accept: impl FnMut(Row) -> Result<()>,
) -> Result<EmitStats> {
    let mut tracker = PrimaryKeyTracker::new(&table.primary_key, &table.registry)?;
    let mut stats = EmitStats::default();
    let mut streak = 0usize;

    while stats.rows < table.rows {
        let row = generate_row(&table.registry, ctx)?;

        if !tracker.try_insert(&row) {
            stats.rejected += 1;
            streak += 1;

            if let Some(max) = options.max_attempts {
                if streak > max {
                    return Err(SeedRowsError::SearchSpaceExhausted {
                        table: table.name.clone(),
                        columns: tracker.columns().join(", "),
                        rows_emitted: stats.rows,
                        target: table.rows,
                        max_attempts: max,
                    });
                }
            }
            if streak % REJECTION_WARN_INTERVAL == 0 {
                warn!(
                    "{}: {} consecutive duplicate keys on ({}) after {}/{} rows",
                    table.name,
                    streak,
                    tracker.columns().join(", "),
                    stats.rows,
                    table.rows
                );
            }
            continue;
        }

        streak = 0;
        accept(row)?;
        stats.rows += 1;

        if let Some(cb) = progress_callback {
            if stats.rows % PROGRESS_BATCH_SIZE == 0 || stats.rows == table.rows {
                cb(stats.rows, table.rows);
            }
        }
    }

    debug!(
        "Generated {} rows for {} ({} duplicate candidates discarded)",
        stats.rows, table.name, stats.rejected
    );
    Ok(stats)
}

fn output_error(message: String, source: std::io::Error) -> SeedRowsError {
    SeedRowsError::Output { message, source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::registry::generator_fn;
    use crate::generate::value::Value;
    use rand::Rng;
    use std::collections::HashSet;

    fn table(registry: ColumnRegistry, primary_key: &[&str], rows: usize) -> TableDefinition {
        TableDefinition {
            name: "TICKET".to_string(),
            output: PathBuf::from("TICKET.csv"),
            registry,
            primary_key: primary_key.iter().map(|s| s.to_string()).collect(),
            rows,
        }
    }

    #[test]
    fn test_generate_row_sees_earlier_columns() {
        let registry = ColumnRegistry::new()
            .with_column("ID", generator_fn(|_, ctx| Ok(Value::from(ctx.increment("pk")))))
            .unwrap()
            .with_column(
                "Label",
                generator_fn(|row, _| {
                    let id = row.get("ID").cloned().unwrap_or_default();
                    Ok(Value::from(format!("row-{}", id)))
                }),
            )
            .unwrap();
        let mut ctx = GenerationContext::new(0);

        let first = generate_row(&registry, &mut ctx).unwrap();
        let second = generate_row(&registry, &mut ctx).unwrap();
        assert_eq!(first.get("Label").map(String::as_str), Some("row-1"));
        assert_eq!(second.get("Label").map(String::as_str), Some("row-2"));
        assert_eq!(first.keys().collect::<Vec<_>>(), vec!["ID", "Label"]);
    }

    #[test]
    fn test_generator_error_propagates() {
        let registry = ColumnRegistry::new()
            .with_column(
                "Broken",
                generator_fn(|_, _| Err(SeedRowsError::generator("Broken", "boom"))),
            )
            .unwrap();
        let mut ctx = GenerationContext::new(0);
        assert!(matches!(
            generate_row(&registry, &mut ctx),
            Err(SeedRowsError::Generator { .. })
        ));
    }

    #[test]
    fn test_emit_writes_header_and_unique_rows() {
        let registry = ColumnRegistry::new()
            .with_column(
                "MatchID",
                generator_fn(|_, ctx| Ok(Value::Int(ctx.rng.random_range(1..=5)))),
            )
            .unwrap()
            .with_column(
                "Seat",
                generator_fn(|_, ctx| Ok(Value::Int(ctx.rng.random_range(1..=4)))),
            )
            .unwrap();
        let def = table(registry, &["MatchID", "Seat"], 15);
        let mut ctx = GenerationContext::new(42);
        let mut buf = Vec::new();

        let stats = emit_table(&def, &mut ctx, &mut buf, &EmitOptions::default(), None).unwrap();
        assert_eq!(stats.rows, 15);

        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("MatchID,Seat"));
        let records: Vec<&str> = lines.collect();
        assert_eq!(records.len(), 15);
        let unique: HashSet<&&str> = records.iter().collect();
        assert_eq!(unique.len(), 15);
    }

    #[test]
    fn test_rejected_candidates_keep_side_effects() {
        // The key is false, false, true, ... so the second candidate is a
        // duplicate, but its counter increment still sticks.
        let registry = ColumnRegistry::new()
            .with_column(
                "Flag",
                generator_fn(|_, ctx| Ok(Value::from(ctx.increment("calls") >= 3))),
            )
            .unwrap();
        let def = table(registry, &["Flag"], 2);
        let mut ctx = GenerationContext::new(0);

        let stats =
            emit_table(&def, &mut ctx, &mut std::io::sink(), &EmitOptions::default(), None)
                .unwrap();
        assert_eq!(stats, EmitStats { rows: 2, rejected: 1 });
        assert_eq!(ctx.counters.current("calls"), 3);

        let next = table(
            ColumnRegistry::new()
                .with_column(
                    "Calls",
                    generator_fn(|_, ctx| Ok(Value::from(ctx.increment("calls")))),
                )
                .unwrap(),
            &["Calls"],
            1,
        );
        let generated = generate_table(&next, &mut ctx, &EmitOptions::default()).unwrap();
        assert_eq!(generated.rows[0].get("Calls").map(String::as_str), Some("4"));
        assert_eq!(generated.columns, vec!["Calls"]);
    }

    #[test]
    fn test_attempt_ceiling_reports_exhaustion() {
        let registry = ColumnRegistry::new()
            .with_column(
                "Coin",
                generator_fn(|_, ctx| Ok(Value::from(ctx.rng.random_bool(0.5)))),
            )
            .unwrap();
        let def = table(registry, &["Coin"], 3);
        let mut ctx = GenerationContext::new(7);
        let options = EmitOptions {
            max_attempts: Some(50),
            ..EmitOptions::default()
        };

        match generate_table(&def, &mut ctx, &options) {
            Err(SeedRowsError::SearchSpaceExhausted {
                rows_emitted,
                target,
                max_attempts,
                ..
            }) => {
                assert_eq!(rows_emitted, 2);
                assert_eq!(target, 3);
                assert_eq!(max_attempts, 50);
            }
            other => panic!("expected SearchSpaceExhausted, got {:?}", other),
        }
    }

    #[test]
    fn test_progress_callback_batches() {
        let registry = ColumnRegistry::new()
            .with_column("ID", generator_fn(|_, ctx| Ok(Value::from(ctx.increment("pk")))))
            .unwrap();
        let def = table(registry, &["ID"], 250);
        let mut ctx = GenerationContext::new(0);
        let calls = std::cell::RefCell::new(Vec::new());

        emit_table(
            &def,
            &mut ctx,
            &mut std::io::sink(),
            &EmitOptions::default(),
            Some(&|current, total| calls.borrow_mut().push((current, total))),
        )
        .unwrap();

        assert_eq!(calls.into_inner(), vec![(100, 250), (200, 250), (250, 250)]);
    }

    #[test]
    fn test_custom_delimiter() {
        let registry = ColumnRegistry::new()
            .with_column("ID", generator_fn(|_, ctx| Ok(Value::from(ctx.increment("pk")))))
            .unwrap()
            .with_column("Name", generator_fn(|_, _| Ok(Value::from("Ann"))))
            .unwrap();
        let def = table(registry, &["ID"], 2);
        let mut ctx = GenerationContext::new(0);
        let mut buf = Vec::new();
        let options = EmitOptions {
            delimiter: '\t',
            ..EmitOptions::default()
        };

        emit_table(&def, &mut ctx, &mut buf, &options, None).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "ID\tName\n1\tAnn\n2\tAnn\n");
    }
}
