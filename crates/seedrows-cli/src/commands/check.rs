use std::process;

use anyhow::Result;
use comfy_table::Table as ComfyTable;
use tracing::debug;

use seedrows_core::check;

use crate::args::CheckArgs;
use crate::commands::load_config;

/// Validate the config and every source file it reads.
///
/// Exit codes:
///   0 — config and sources are usable
///   1 — problems found (or error)
pub fn run(args: &CheckArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let report = check::check_config(&config);
    debug!(
        "Checked {} source column(s) in {}: {} issue(s)",
        report.sources.len(),
        args.config.display(),
        report.issues.len()
    );

    if !report.sources.is_empty() {
        let mut t = ComfyTable::new();
        t.set_header(vec!["Table", "Column", "Kind", "Source", "Status"]);
        for source in &report.sources {
            t.add_row(vec![
                source.table.clone(),
                source.column.clone(),
                source.kind.to_string(),
                source.path.display().to_string(),
                source.status.clone(),
            ]);
        }
        println!("{}", t);
    }

    println!("{}", report.summary());

    if !report.is_ok() {
        process::exit(1);
    }

    Ok(())
}
