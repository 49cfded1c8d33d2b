//! JSON-lines time series output

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write one JSON object per line
pub fn write_jsonl<W, T>(mut writer: W, records: &[T]) -> Result<()>
where
    W: Write,
    T: Serialize,
{
    for record in records {
        serde_json::to_writer(&mut writer, record).context("Failed to serialize record")?;
        writer.write_all(b"\n").context("Failed to write record")?;
    }
    writer.flush().context("Failed to flush output")
}

/// Write records to `path`, creating parent directories as needed
pub fn write_jsonl_file<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {:?}", parent))?;
    }
    let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    write_jsonl(BufWriter::new(file), records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::price_path::PricePoint;
    use tempfile::tempdir;

    #[test]
    fn test_one_object_per_line() {
        let points = vec![
            PricePoint {
                timestamp: 0,
                price: 10.0,
            },
            PricePoint {
                timestamp: 60,
                price: 10.5,
            },
        ];

        let mut buffer = Vec::new();
        write_jsonl(&mut buffer, &points).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: PricePoint = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed, points[1]);
    }

    #[test]
    fn test_file_output_creates_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("series.jsonl");

        write_jsonl_file(&path, &[PricePoint { timestamp: 1, price: 2.0 }]).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "{\"timestamp\":1,\"price\":2.0}\n"
        );
    }
}
