use anyhow::{Context, Result};
use comfy_table::Table as ComfyTable;
use tracing::debug;

use seedrows_core::generate::engine::{generate_table, EmitOptions};
use seedrows_core::generate::providers::build_table;
use seedrows_core::GenerationContext;

use crate::args::PreviewArgs;
use crate::commands::{load_config, select_tables};

const MAX_CELL_WIDTH: usize = 40;

pub fn run(args: &PreviewArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let tables = select_tables(&config, &args.tables)?;

    let seed = args.seed.or(config.generate.seed).unwrap_or(42);
    let options = EmitOptions {
        delimiter: config.delimiter(),
        max_attempts: config.generate.max_attempts,
    };
    let mut ctx = GenerationContext::new(seed);
    debug!("Previewing {} rows per table with seed {}", args.rows, seed);

    for (name, table) in tables {
        let mut def = build_table(&config, name, table)
            .with_context(|| format!("Failed to set up table {}", name))?;
        def.rows = args.rows;

        // Nothing is written; delimited sources must already exist on disk.
        let generated = generate_table(&def, &mut ctx, &options)
            .with_context(|| format!("Failed to preview table {}", name))?;

        println!("━━━ {} ({} rows) ━━━", generated.name, generated.rows.len());

        let mut t = ComfyTable::new();
        t.set_header(generated.columns.clone());
        for row in &generated.rows {
            let values: Vec<String> = generated
                .columns
                .iter()
                .map(|col| row.get(col).map(|v| truncate(v)).unwrap_or_default())
                .collect();
            t.add_row(values);
        }

        println!("{}\n", t);
    }

    Ok(())
}

fn truncate(value: &str) -> String {
    if value.chars().count() > MAX_CELL_WIDTH {
        let head: String = value.chars().take(MAX_CELL_WIDTH - 3).collect();
        format!("{}...", head)
    } else {
        value.to_string()
    }
}
