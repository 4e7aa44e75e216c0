pub mod check;
pub mod generate;
pub mod preview;

use std::path::Path;

use anyhow::{bail, Context, Result};

use seedrows_core::config::{read_config, SeedRowsConfig, TableConfig};

/// Load and validate the config file.
pub fn load_config(path: &Path) -> Result<SeedRowsConfig> {
    read_config(path).with_context(|| format!("Failed to load config {}", path.display()))
}

/// Tables to run, in config order. An empty selection means every table.
pub fn select_tables<'a>(
    config: &'a SeedRowsConfig,
    selected: &[String],
) -> Result<Vec<(&'a String, &'a TableConfig)>> {
    for name in selected {
        if !config.tables.contains_key(name) {
            bail!(
                "Unknown table '{}'. Tables in config: {}",
                name,
                config
                    .tables
                    .keys()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }

    Ok(config
        .tables
        .iter()
        .filter(|(name, _)| selected.is_empty() || selected.contains(name))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedrows_testutil::ticket_fixture;

    #[test]
    fn test_select_tables_keeps_config_order() {
        let (_fixture, config_path) = ticket_fixture();
        let config = load_config(&config_path).unwrap();

        let all: Vec<&str> = select_tables(&config, &[])
            .unwrap()
            .into_iter()
            .map(|(n, _)| n.as_str())
            .collect();
        assert_eq!(all, vec!["CUSTOMER", "MATCH", "TICKET"]);

        let picked: Vec<&str> =
            select_tables(&config, &["TICKET".to_string(), "CUSTOMER".to_string()])
                .unwrap()
                .into_iter()
                .map(|(n, _)| n.as_str())
                .collect();
        assert_eq!(picked, vec!["CUSTOMER", "TICKET"]);

        assert!(select_tables(&config, &["NOPE".to_string()]).is_err());
    }
}
