//! # Built-in Column Generators
//!
//! Turns `seedrows.toml` column specs into registry entries. Each spec is
//! resolved once (paths made absolute, templates parsed) into a `Provider`,
//! and `ProviderGenerator` dispatches on it per row.

use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::LazyLock;

use chrono::{Duration as ChronoDuration, NaiveDate};
use fake::faker::address::en::{CityName, CountryName};
use fake::faker::company::en::CompanyName;
use fake::faker::lorem::en::Word;
use fake::faker::name::en::{FirstName, LastName, Name};
use fake::faker::phone_number::en::PhoneNumber;
use fake::Fake;
use rand::Rng;
use regex::Regex;

use crate::config::{FakerKind, GeneratorSpec, SeedRowsConfig, TableConfig};
use crate::error::{Result, SeedRowsError};
use crate::generate::context::GenerationContext;
use crate::generate::counter::CounterKey;
use crate::generate::engine::TableDefinition;
use crate::generate::pool::{DelimitedSource, DEFAULT_DELIMITER};
use crate::generate::registry::{ColumnGenerator, ColumnRegistry, Row};
use crate::generate::value::Value;

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9]").expect("static regex"));

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}]+)\}").expect("static regex"));

const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// A resolved generator kind.
#[derive(Debug, Clone)]
pub enum Provider {
    /// Counter under a fixed key.
    Counter { key: CounterKey },
    /// One counter per distinct value of an earlier column.
    CounterPer { table: String, parent: String },
    Text { path: PathBuf },
    Delimited { source: DelimitedSource, column: String },
    Email { from: String, domain: String },
    Price { min: u32, max: u32 },
    Integer { min: i64, max: i64 },
    Values { values: Vec<String>, weights: Option<Vec<f64>> },
    /// `delimiter` is stripped from faker output.
    Fake { faker: FakerKind, delimiter: char },
    Uuid,
    Date { start: NaiveDate, end: NaiveDate, format: String },
    Template { segments: Vec<Segment> },
    Copy { from: String },
}

/// A piece of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Column(String),
}

/// A registry entry backed by a built-in provider.
#[derive(Debug, Clone)]
pub struct ProviderGenerator {
    pub column: String,
    pub provider: Provider,
}

impl ColumnGenerator for ProviderGenerator {
    fn generate(&self, row: &Row, ctx: &mut GenerationContext) -> Result<Value> {
        match &self.provider {
            Provider::Counter { key } => Ok(Value::from(ctx.increment(key.clone()))),
            Provider::CounterPer { table, parent } => {
                let key = CounterKey::PerValue {
                    table: table.clone(),
                    column: self.column.clone(),
                    parent: earlier_value(row, &self.column, parent)?.to_string(),
                };
                Ok(Value::from(ctx.increment(key)))
            }
            Provider::Text { path } => ctx.draw_text(path).map(Value::from),
            Provider::Delimited { source, column } => {
                ctx.draw_delimited(source, column).map(Value::from)
            }
            Provider::Email { from, domain } => {
                let name = earlier_value(row, &self.column, from)?;
                Ok(Value::from(make_email(name, domain, &mut ctx.rng)))
            }
            Provider::Price { min, max } => Ok(Value::from(make_price(*min, *max, &mut ctx.rng))),
            Provider::Integer { min, max } => Ok(Value::Int(ctx.rng.random_range(*min..=*max))),
            Provider::Values { values, weights } => {
                pick_value(&self.column, values, weights.as_deref(), &mut ctx.rng)
            }
            Provider::Fake { faker, delimiter } => {
                Ok(Value::from(fake_value(*faker, *delimiter, &mut ctx.rng)))
            }
            Provider::Uuid => {
                let bytes: [u8; 16] = ctx.rng.random();
                let id = uuid::Builder::from_random_bytes(bytes).into_uuid();
                Ok(Value::from(id.to_string()))
            }
            Provider::Date { start, end, format } => {
                let span = (*end - *start).num_days();
                let date = *start + ChronoDuration::days(ctx.rng.random_range(0..=span));
                Ok(Value::from(date.format(format).to_string()))
            }
            Provider::Template { segments } => {
                let mut out = String::new();
                for segment in segments {
                    match segment {
                        Segment::Literal(text) => out.push_str(text),
                        Segment::Column(col) => out.push_str(earlier_value(row, &self.column, col)?),
                    }
                }
                Ok(Value::from(out))
            }
            Provider::Copy { from } => {
                earlier_value(row, &self.column, from).map(|v| Value::from(v.to_string()))
            }
        }
    }
}

/// Look up a column generated earlier in the same row.
fn earlier_value<'r>(row: &'r Row, column: &str, wanted: &str) -> Result<&'r str> {
    row.get(wanted).map(String::as_str).ok_or_else(|| {
        SeedRowsError::generator(
            column,
            format!("column '{}' has not been generated yet in this row", wanted),
        )
    })
}

/// Strip non-alphanumerics from `name` and append a random number and domain.
pub fn make_email(name: &str, domain: &str, rng: &mut impl Rng) -> String {
    let local = NON_ALPHANUMERIC.replace_all(name, "");
    format!("{}{}@{}", local, rng.random_range(10..=10_000), domain)
}

/// Price as `"<min..=max>.<00..=99>"`.
pub fn make_price(min: u32, max: u32, rng: &mut impl Rng) -> String {
    format!(
        "{}.{:02}",
        rng.random_range(min..=max),
        rng.random_range(0..=99u32)
    )
}

fn pick_value(
    column: &str,
    values: &[String],
    weights: Option<&[f64]>,
    rng: &mut impl Rng,
) -> Result<Value> {
    if values.is_empty() {
        return Err(SeedRowsError::generator(column, "values list is empty"));
    }
    let idx = match weights {
        Some(w) if w.len() == values.len() => weighted_index(w, rng),
        _ => rng.random_range(0..values.len()),
    };
    Ok(Value::String(Cow::Owned(values[idx].clone())))
}

fn weighted_index(weights: &[f64], rng: &mut impl Rng) -> usize {
    // Clamp negative weights to zero
    let clamped: Vec<f64> = weights.iter().map(|w| w.max(0.0)).collect();
    let total: f64 = clamped.iter().sum();

    if total <= 0.0 {
        // All weights are zero — uniform fallback
        return rng.random_range(0..weights.len());
    }

    let roll: f64 = rng.random::<f64>() * total;
    let mut cumulative = 0.0;
    for (i, w) in clamped.iter().enumerate() {
        cumulative += w;
        if roll < cumulative {
            return i;
        }
    }

    // Floating-point edge case — return last index
    weights.len() - 1
}

fn fake_value(faker: FakerKind, delimiter: char, rng: &mut impl Rng) -> String {
    let value: String = match faker {
        FakerKind::FirstName => FirstName().fake_with_rng(rng),
        FakerKind::LastName => LastName().fake_with_rng(rng),
        FakerKind::Name => Name().fake_with_rng(rng),
        FakerKind::City => CityName().fake_with_rng(rng),
        FakerKind::Country => CountryName().fake_with_rng(rng),
        FakerKind::Company => CompanyName().fake_with_rng(rng),
        FakerKind::Word => Word().fake_with_rng(rng),
        FakerKind::Phone => PhoneNumber().fake_with_rng(rng),
    };
    // Output is unquoted, so a delimiter inside a value would shift columns.
    if value.contains(delimiter) {
        value.replace(delimiter, "")
    } else {
        value
    }
}

/// Split a template into literal text and `{Column}` placeholders.
pub fn parse_template(template: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(template) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last {
            segments.push(Segment::Literal(template[last..whole.start()].to_string()));
        }
        segments.push(Segment::Column(name.as_str().to_string()));
        last = whole.end();
    }
    if last < template.len() {
        segments.push(Segment::Literal(template[last..].to_string()));
    }
    segments
}

/// Column names referenced by a template's placeholders.
pub fn template_columns(template: &str) -> Vec<String> {
    parse_template(template)
        .into_iter()
        .filter_map(|s| match s {
            Segment::Column(c) => Some(c),
            Segment::Literal(_) => None,
        })
        .collect()
}

/// Resolve one column spec into a provider.
pub fn resolve_provider(
    config: &SeedRowsConfig,
    table_name: &str,
    column: &str,
    spec: &GeneratorSpec,
) -> Provider {
    match spec {
        GeneratorSpec::Counter { per: Some(per), .. } => Provider::CounterPer {
            table: table_name.to_string(),
            parent: per.clone(),
        },
        GeneratorSpec::Counter { key, .. } => Provider::Counter {
            key: match key {
                Some(name) => CounterKey::Named(name.clone()),
                None => CounterKey::Column {
                    table: table_name.to_string(),
                    column: column.to_string(),
                },
            },
        },
        GeneratorSpec::Text { path } => Provider::Text {
            path: config.resolve_path(path),
        },
        GeneratorSpec::Delimited {
            path,
            column: source_column,
            delimiter,
            records,
        } => {
            let mut source = DelimitedSource::new(config.resolve_path(path))
                .with_delimiter(delimiter.unwrap_or(DEFAULT_DELIMITER));
            if let Some(range) = records {
                source = source.with_records(*range);
            }
            Provider::Delimited {
                source,
                column: source_column.clone(),
            }
        }
        GeneratorSpec::Email { from, domain } => Provider::Email {
            from: from.clone(),
            domain: domain.clone(),
        },
        GeneratorSpec::Price { min, max } => Provider::Price {
            min: *min,
            max: *max,
        },
        GeneratorSpec::Integer { min, max } => Provider::Integer {
            min: *min,
            max: *max,
        },
        GeneratorSpec::Values { values, weights } => Provider::Values {
            values: values.clone(),
            weights: weights.clone(),
        },
        GeneratorSpec::Fake { faker } => Provider::Fake {
            faker: *faker,
            delimiter: config.delimiter(),
        },
        GeneratorSpec::Uuid => Provider::Uuid,
        GeneratorSpec::Date { start, end, format } => Provider::Date {
            start: *start,
            end: *end,
            format: format
                .clone()
                .unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_string()),
        },
        GeneratorSpec::Template { template } => Provider::Template {
            segments: parse_template(template),
        },
        GeneratorSpec::Copy { from } => Provider::Copy { from: from.clone() },
    }
}

/// Build the definition of one configured table.
pub fn build_table(
    config: &SeedRowsConfig,
    table_name: &str,
    table: &TableConfig,
) -> Result<TableDefinition> {
    let mut registry = ColumnRegistry::new();
    for col in &table.columns {
        let provider = resolve_provider(config, table_name, &col.name, &col.generator);
        registry.register(
            col.name.clone(),
            ProviderGenerator {
                column: col.name.clone(),
                provider,
            },
        )?;
    }

    Ok(TableDefinition {
        name: table_name.to_string(),
        output: config.output_path(table_name, table),
        registry,
        primary_key: table.primary_key.clone(),
        rows: table.rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::generate::engine::generate_row;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::path::Path;

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn run(provider: Provider, row: &Row, ctx: &mut GenerationContext) -> Result<String> {
        ProviderGenerator {
            column: "Out".to_string(),
            provider,
        }
        .generate(row, ctx)
        .map(|v| v.to_string())
    }

    #[test]
    fn test_make_email() {
        let mut rng = StdRng::seed_from_u64(1);
        let email = make_email("Mary-Jane O'Neil", "example.com", &mut rng);
        let (local, domain) = email.split_once('@').unwrap();
        assert_eq!(domain, "example.com");
        assert!(local.starts_with("MaryJaneONeil"));
        let suffix: u32 = local["MaryJaneONeil".len()..].parse().unwrap();
        assert!((10..=10_000).contains(&suffix));
    }

    #[test]
    fn test_make_price_format() {
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..100 {
            let price = make_price(50, 200, &mut rng);
            let (units, cents) = price.split_once('.').unwrap();
            let units: u32 = units.parse().unwrap();
            assert!((50..=200).contains(&units));
            assert_eq!(cents.len(), 2);
        }
    }

    #[test]
    fn test_counter_per_parent_value() {
        let mut ctx = GenerationContext::new(0);
        let per = || Provider::CounterPer {
            table: "TICKET".to_string(),
            parent: "MatchID".to_string(),
        };

        let a = row(&[("MatchID", "A")]);
        let b = row(&[("MatchID", "B")]);
        assert_eq!(run(per(), &a, &mut ctx).unwrap(), "1");
        assert_eq!(run(per(), &a, &mut ctx).unwrap(), "2");
        assert_eq!(run(per(), &b, &mut ctx).unwrap(), "1");
        assert_eq!(run(per(), &a, &mut ctx).unwrap(), "3");
    }

    #[test]
    fn test_per_counters_on_one_parent_are_independent() {
        let content = r#"
[tables.T]
rows = 3
[[tables.T.columns]]
name = "M"
kind = "values"
values = ["1"]
[[tables.T.columns]]
name = "Ticket"
kind = "counter"
per = "M"
[[tables.T.columns]]
name = "Seat"
kind = "counter"
per = "M"

[tables.U]
rows = 1
[[tables.U.columns]]
name = "M"
kind = "values"
values = ["1"]
[[tables.U.columns]]
name = "Ticket"
kind = "counter"
per = "M"
[[tables.U.columns]]
name = "Shared"
kind = "counter"
key = "M:1"
"#;
        let config = parse_config(content, Path::new("/tmp")).unwrap();
        let t = build_table(&config, "T", &config.tables["T"]).unwrap();
        let u = build_table(&config, "U", &config.tables["U"]).unwrap();
        let mut ctx = GenerationContext::new(0);

        for expected in ["1", "2", "3"] {
            let r = generate_row(&t.registry, &mut ctx).unwrap();
            assert_eq!(r["Ticket"], expected);
            assert_eq!(r["Seat"], expected);
        }

        let r = generate_row(&u.registry, &mut ctx).unwrap();
        assert_eq!(r["Ticket"], "1");
        assert_eq!(r["Shared"], "1");
    }

    #[test]
    fn test_missing_earlier_column_is_generator_error() {
        let mut ctx = GenerationContext::new(0);
        let err = run(
            Provider::Copy {
                from: "Name".to_string(),
            },
            &Row::new(),
            &mut ctx,
        )
        .unwrap_err();
        assert!(matches!(err, SeedRowsError::Generator { .. }));
    }

    #[test]
    fn test_template() {
        assert_eq!(
            parse_template("{First} <{Email}>"),
            vec![
                Segment::Column("First".to_string()),
                Segment::Literal(" <".to_string()),
                Segment::Column("Email".to_string()),
                Segment::Literal(">".to_string()),
            ]
        );
        assert_eq!(template_columns("no placeholders"), Vec::<String>::new());

        let mut ctx = GenerationContext::new(0);
        let r = row(&[("First", "Ann"), ("Email", "ann@example.com")]);
        let out = run(
            Provider::Template {
                segments: parse_template("{First} <{Email}>"),
            },
            &r,
            &mut ctx,
        )
        .unwrap();
        assert_eq!(out, "Ann <ann@example.com>");
    }

    #[test]
    fn test_weighted_values() {
        let mut rng = StdRng::seed_from_u64(3);
        let values = vec!["never".to_string(), "always".to_string()];
        for _ in 0..50 {
            let v = pick_value("c", &values, Some(&[0.0, 1.0][..]), &mut rng).unwrap();
            assert_eq!(v.as_string(), Some("always"));
        }
    }

    #[test]
    fn test_date_within_range() {
        let mut ctx = GenerationContext::new(4);
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        for _ in 0..30 {
            let out = run(
                Provider::Date {
                    start,
                    end,
                    format: DEFAULT_DATE_FORMAT.to_string(),
                },
                &Row::new(),
                &mut ctx,
            )
            .unwrap();
            let date = NaiveDate::parse_from_str(&out, DEFAULT_DATE_FORMAT).unwrap();
            assert!(date >= start && date <= end);
        }
    }

    #[test]
    fn test_fake_values_never_contain_delimiter() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..200 {
            assert!(!fake_value(FakerKind::Company, ',', &mut rng).contains(','));
        }
    }

    #[test]
    fn test_uuid_deterministic_per_seed() {
        let mut a = GenerationContext::new(9);
        let mut b = GenerationContext::new(9);
        let ua = run(Provider::Uuid, &Row::new(), &mut a).unwrap();
        let ub = run(Provider::Uuid, &Row::new(), &mut b).unwrap();
        assert_eq!(ua, ub);
        assert_eq!(ua.len(), 36);
    }

    #[test]
    fn test_build_table_from_config() {
        let content = r#"
[tables.CUSTOMER]
rows = 3
primary_key = ["ID"]
[[tables.CUSTOMER.columns]]
name = "ID"
kind = "counter"
[[tables.CUSTOMER.columns]]
name = "Name"
kind = "values"
values = ["Ann Lee"]
[[tables.CUSTOMER.columns]]
name = "Email"
kind = "email"
from = "Name"
domain = "test.org"
"#;
        let config = parse_config(content, Path::new("/tmp")).unwrap();
        let def = build_table(&config, "CUSTOMER", &config.tables["CUSTOMER"]).unwrap();
        assert_eq!(def.output, PathBuf::from("/tmp/CUSTOMER.csv"));
        assert_eq!(
            def.registry.column_names().collect::<Vec<_>>(),
            vec!["ID", "Name", "Email"]
        );

        let mut ctx = GenerationContext::new(0);
        let r = generate_row(&def.registry, &mut ctx).unwrap();
        assert_eq!(r["ID"], "1");
        assert!(r["Email"].starts_with("AnnLee"));
        assert!(r["Email"].ends_with("@test.org"));
        let id_key = CounterKey::Column {
            table: "CUSTOMER".to_string(),
            column: "ID".to_string(),
        };
        assert_eq!(ctx.counters.current(id_key), 1);
        assert_eq!(ctx.counters.current("CUSTOMER.ID"), 0);
    }
}
