use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use seedrows_core::generate::engine::EmitOptions;
use seedrows_core::generate::providers::build_table;
use seedrows_core::output::delimited::write_table_file;
use seedrows_core::GenerationContext;

use crate::args::GenerateArgs;
use crate::commands::{load_config, select_tables};

pub fn run(args: &GenerateArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let tables = select_tables(&config, &args.tables)?;

    // Seed: CLI --seed, then seedrows.toml, then wall clock
    let seed = args.seed.or(config.generate.seed).unwrap_or_else(|| {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    });
    let options = EmitOptions {
        delimiter: config.delimiter(),
        max_attempts: args.max_attempts.or(config.generate.max_attempts),
    };

    // One context for the whole run: counters and pools carry over between tables.
    let mut ctx = GenerationContext::new(seed);
    let total = tables.len();
    info!("Generating {} table(s) with seed {}", total, seed);
    let mut total_rows = 0usize;

    for (step, (name, table)) in tables.into_iter().enumerate() {
        let mut def = build_table(&config, name, table)
            .with_context(|| format!("Failed to set up table {}", name))?;
        if let Some(rows) = args.rows {
            def.rows = rows;
        }
        debug!(
            "{}: {} rows → {} (primary key: [{}], max_attempts: {:?})",
            name,
            def.rows,
            def.output.display(),
            def.primary_key.join(", "),
            options.max_attempts
        );

        let pb = ProgressBar::new(def.rows as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(&format!(
                    "{{spinner:.cyan}} [{}/{}] {} {{bar:40.cyan/dim}} {{pos}}/{{len}} ({{eta}})",
                    step + 1,
                    total,
                    name
                ))
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );

        let stats = write_table_file(
            &def,
            &mut ctx,
            &options,
            Some(&|current, _total| {
                pb.set_position(current as u64);
            }),
        )
        .with_context(|| format!("Failed to generate table {}", name))?;

        pb.finish_with_message(format!("{} ✓", name));
        eprintln!(
            "✓ {}: {} rows → {} ({} duplicate keys discarded)",
            name,
            stats.rows,
            def.output.display(),
            stats.rejected
        );
        total_rows += stats.rows;
    }

    eprintln!(
        "\n✓ Generated {} rows across {} tables (seed {})",
        total_rows,
        total,
        ctx.seed()
    );
    Ok(())
}
