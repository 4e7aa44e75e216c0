use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, SeedRowsError};
use crate::generate::context::GenerationContext;
use crate::generate::engine::{emit_table, EmitOptions, EmitStats, GeneratedTable, TableDefinition};
use crate::generate::registry::Row;

/// Writes header and records joined by a single delimiter.
///
/// Values are written as-is. There is no quoting, so generators must never
/// produce a value containing the delimiter or a newline.
pub struct DelimitedWriter<W: Write> {
    writer: W,
    delimiter: char,
}

impl<W: Write> DelimitedWriter<W> {
    pub fn new(writer: W, delimiter: char) -> Self {
        Self { writer, delimiter }
    }

    pub fn write_header(&mut self, columns: &[&str]) -> io::Result<()> {
        self.write_fields(columns.iter().copied())
    }

    /// Write the values of `row` in `columns` order. A column missing from
    /// the row is written as an empty field.
    pub fn write_row(&mut self, columns: &[&str], row: &Row) -> io::Result<()> {
        self.write_fields(
            columns
                .iter()
                .map(|c| row.get(*c).map(String::as_str).unwrap_or_default()),
        )
    }

    fn write_fields<'a>(&mut self, fields: impl Iterator<Item = &'a str>) -> io::Result<()> {
        let mut delim = [0u8; 4];
        let delim = self.delimiter.encode_utf8(&mut delim).as_bytes();
        for (i, field) in fields.enumerate() {
            if i > 0 {
                self.writer.write_all(delim)?;
            }
            self.writer.write_all(field.as_bytes())?;
        }
        self.writer.write_all(b"\n")
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Write an in-memory table to a writer.
pub fn write_table<W: Write>(writer: &mut W, table: &GeneratedTable, delimiter: char) -> Result<()> {
    let columns: Vec<&str> = table.columns.iter().map(String::as_str).collect();
    let mut out = DelimitedWriter::new(writer, delimiter);

    out.write_header(&columns).map_err(|e| SeedRowsError::Output {
        message: format!("writing header for {}", table.name),
        source: e,
    })?;
    for row in &table.rows {
        out.write_row(&columns, row).map_err(|e| SeedRowsError::Output {
            message: format!("writing row for {}", table.name),
            source: e,
        })?;
    }
    out.flush().map_err(|e| SeedRowsError::Output {
        message: format!("flushing {}", table.name),
        source: e,
    })
}

/// Generate `table` straight into its output file.
///
/// Rows are written to a temporary file in the same directory, which is
/// renamed into place only after the last row. `rename` is atomic on POSIX
/// and Windows, so a failed or interrupted run never leaves a partial table
/// at `table.output`. Missing parent directories are created.
pub fn write_table_file(
    table: &TableDefinition,
    ctx: &mut GenerationContext,
    options: &EmitOptions,
    progress_callback: Option<&dyn Fn(usize, usize)>,
) -> Result<EmitStats> {
    let path = table.output.as_path();
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|e| SeedRowsError::Output {
        message: format!("creating output directory {}", dir.display()),
        source: e,
    })?;

    let tmp_path = temp_path_for(path, &dir);
    let result = write_then_rename(table, ctx, options, progress_callback, &tmp_path, path);
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

fn write_then_rename(
    table: &TableDefinition,
    ctx: &mut GenerationContext,
    options: &EmitOptions,
    progress_callback: Option<&dyn Fn(usize, usize)>,
    tmp_path: &Path,
    path: &Path,
) -> Result<EmitStats> {
    let file = File::create(tmp_path).map_err(|e| SeedRowsError::Output {
        message: format!("creating temp file {}", tmp_path.display()),
        source: e,
    })?;
    let mut writer = BufWriter::new(file);

    let stats = emit_table(table, ctx, &mut writer, options, progress_callback)?;

    let file = writer.into_inner().map_err(|e| SeedRowsError::Output {
        message: format!("flushing {}", tmp_path.display()),
        source: e.into_error(),
    })?;
    file.sync_all().map_err(|e| SeedRowsError::Output {
        message: format!("syncing {}", tmp_path.display()),
        source: e,
    })?;

    fs::rename(tmp_path, path).map_err(|e| SeedRowsError::Output {
        message: format!("renaming {} → {}", tmp_path.display(), path.display()),
        source: e,
    })?;

    Ok(stats)
}

fn temp_path_for(path: &Path, dir: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "table".to_string());
    dir.join(format!(".{}.tmp", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::registry::{generator_fn, ColumnRegistry};
    use crate::generate::value::Value;
    use tempfile::tempdir;

    #[test]
    fn test_writer_joins_without_quoting() {
        let mut buf = Vec::new();
        let mut out = DelimitedWriter::new(&mut buf, ',');
        out.write_header(&["ID", "Name"]).unwrap();

        let mut row = Row::new();
        row.insert("Name".to_string(), "Ann \"A\"".to_string());
        row.insert("ID".to_string(), "1".to_string());
        out.write_row(&["ID", "Name", "Missing"], &row).unwrap();

        assert_eq!(String::from_utf8(buf).unwrap(), "ID,Name\n1,Ann \"A\",\n");
    }

    #[test]
    fn test_multibyte_delimiter() {
        let mut out = DelimitedWriter::new(Vec::new(), '¦');
        out.write_header(&["a", "b"]).unwrap();
        assert_eq!(String::from_utf8(out.into_inner()).unwrap(), "a¦b\n");
    }

    #[test]
    fn test_write_table() {
        let mut row = Row::new();
        row.insert("ID".to_string(), "7".to_string());
        let table = GeneratedTable {
            name: "T".to_string(),
            columns: vec!["ID".to_string()],
            rows: vec![row],
        };
        let mut buf = Vec::new();
        write_table(&mut buf, &table, ';').unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "ID\n7\n");
    }

    #[test]
    fn test_table_file_written_atomically() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("export").join("T.csv");
        let def = TableDefinition {
            name: "T".to_string(),
            output: output.clone(),
            registry: ColumnRegistry::new()
                .with_column("ID", generator_fn(|_, ctx| Ok(Value::from(ctx.increment("pk")))))
                .unwrap(),
            primary_key: vec!["ID".to_string()],
            rows: 3,
        };
        let mut ctx = GenerationContext::new(0);

        let stats = write_table_file(&def, &mut ctx, &EmitOptions::default(), None).unwrap();
        assert_eq!(stats.rows, 3);
        assert_eq!(fs::read_to_string(&output).unwrap(), "ID\n1\n2\n3\n");
        assert!(!dir.path().join("export").join(".T.csv.tmp").exists());
    }

    #[test]
    fn test_failed_generation_leaves_no_file() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("T.csv");
        let def = TableDefinition {
            name: "T".to_string(),
            output: output.clone(),
            registry: ColumnRegistry::new()
                .with_column(
                    "ID",
                    generator_fn(|_, ctx| {
                        if ctx.increment("pk") > 2 {
                            Err(SeedRowsError::generator("ID", "out of ids"))
                        } else {
                            Ok(Value::Int(1))
                        }
                    }),
                )
                .unwrap(),
            primary_key: vec![],
            rows: 5,
        };
        let mut ctx = GenerationContext::new(0);

        assert!(write_table_file(&def, &mut ctx, &EmitOptions::default(), None).is_err());
        assert!(!output.exists());
        assert!(!dir.path().join(".T.csv.tmp").exists());
    }
}
