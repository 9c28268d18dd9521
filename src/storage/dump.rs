//! Line-oriented table dumps for diagnostics
//!
//! One line per row in id order, columns in schema order separated by TAB.
//! Text escapes `\`, TAB and newline; NULL is written as `\N`.

use super::sqlite::Session;
use super::table::TableName;
use crate::Result;
use chrono::Utc;
use rusqlite::types::ValueRef;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Write `table` to a fresh file under `dir` and return its path.
///
/// An existing file is never overwritten: a name already taken gets a `-N`
/// suffix.
pub fn dump_table(session: &Session<'_>, table: TableName, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ").to_string();
    let (file, path) = create_dump_file(dir, &format!("{}-{}", table, stamp))?;

    let columns = table.columns();
    let sql = format!("SELECT {} FROM {} ORDER BY id", columns.join(", "), table);

    let mut writer = BufWriter::new(file);
    let mut stmt = session.prepare(&sql)?;
    let mut lines = 0usize;
    {
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let fields = (0..columns.len())
                .map(|i| row.get_ref(i).map(render))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            writeln!(writer, "{}", fields.join("\t"))?;
            lines += 1;
        }
    }
    stmt.release()?;
    writer.flush()?;

    tracing::info!("Dumped {} rows of {} to {}", lines, table, path.display());
    Ok(path)
}

fn create_dump_file(dir: &Path, stem: &str) -> Result<(File, PathBuf)> {
    let mut attempt = 0usize;
    loop {
        let name = match attempt {
            0 => format!("{}.dump", stem),
            n => format!("{}-{}.dump", stem, n),
        };
        let path = dir.join(name);
        match File::create_new(&path) {
            Ok(file) => return Ok((file, path)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(err) => return Err(err.into()),
        }
    }
}

fn render(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "\\N".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(bytes) => escape(&String::from_utf8_lossy(bytes)),
        ValueRef::Blob(bytes) => {
            let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
            format!("\\x{}", hex)
        }
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out
}
