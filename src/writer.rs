//! Incremental CSV writer for scraped papers.
//!
//! The file is created with a BOM and the header line up front. Each record is
//! appended by reopening the file, so everything written before an interruption
//! stays on disk.

use crate::error::Result;
use crate::record::{PaperRecord, FIELD_NAMES};
use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// UTF-8 byte-order mark, so spreadsheet tools detect the encoding
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Timestamped default output name, e.g. `cnki_papers_20250623_213611.csv`
pub fn default_file_name() -> String {
    format!("cnki_papers_{}.csv", Local::now().format("%Y%m%d_%H%M%S"))
}

/// Appends one [`PaperRecord`] per call to a CSV file and counts them.
#[derive(Debug)]
pub struct RecordWriter {
    path: PathBuf,
    count: usize,
}

impl RecordWriter {
    /// Create the output file and write the header.
    ///
    /// Without an explicit path a timestamped name in the working directory is
    /// used. An existing file at the path is truncated.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be created or written.
    pub fn create(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(default_file_name()));

        let mut file = File::create(&path)?;
        file.write_all(UTF8_BOM)?;

        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        wtr.write_record(FIELD_NAMES)?;
        wtr.flush()?;

        info!(path = %path.display(), "CSV file created");
        Ok(Self { path, count: 0 })
    }

    /// Append one record and return the running count.
    ///
    /// The line is flushed and the file closed before returning.
    pub fn write(&mut self, record: &PaperRecord) -> Result<usize> {
        let file = OpenOptions::new().append(true).open(&self.path)?;
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        wtr.write_record(record.values())?;
        wtr.flush()?;

        self.count += 1;
        debug!(
            count = self.count,
            title = %record.title.chars().take(50).collect::<String>(),
            "Record saved"
        );
        Ok(self.count)
    }

    /// Path of the output file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records written so far
    pub fn count(&self) -> usize {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn read_lines(path: &Path) -> Vec<String> {
        let content = std::fs::read_to_string(path).expect("read output");
        content.lines().map(str::to_string).collect()
    }

    #[test]
    fn test_create_writes_bom_and_header() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("out.csv");
        let writer = RecordWriter::create(Some(&path))?;

        assert_eq!(writer.count(), 0);
        let bytes = std::fs::read(&path)?;
        assert!(bytes.starts_with(UTF8_BOM));

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].trim_start_matches('\u{feff}'), FIELD_NAMES.join(","));
        Ok(())
    }

    #[test]
    fn test_write_counts_and_appends() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("out.csv");
        let mut writer = RecordWriter::create(Some(&path))?;

        for i in 1..=3 {
            let record = PaperRecord {
                title: format!("Paper {}", i),
                ..Default::default()
            };
            assert_eq!(writer.write(&record)?, i);
        }

        assert_eq!(writer.count(), 3);
        assert_eq!(read_lines(&path).len(), 4);
        Ok(())
    }

    #[test]
    fn test_write_quotes_delimiters() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("out.csv");
        let mut writer = RecordWriter::create(Some(&path))?;

        let record = PaperRecord {
            title: "Slope, \"stability\" study".into(),
            ..Default::default()
        };
        writer.write(&record)?;

        let mut rdr = csv::Reader::from_path(&path)?;
        let row = rdr.records().next().expect("one row")?;
        assert_eq!(&row[0], "Slope, \"stability\" study");
        assert_eq!(&row[5], "0");
        assert_eq!(row.len(), FIELD_NAMES.len());
        Ok(())
    }

    #[test]
    fn test_create_fails_in_missing_directory() {
        let path = PathBuf::from("/nonexistent/dir/out.csv");
        assert!(RecordWriter::create(Some(&path)).is_err());
    }

    #[test]
    fn test_default_file_name_shape() {
        let name = default_file_name();
        assert!(name.starts_with("cnki_papers_"));
        assert!(name.ends_with(".csv"));
        assert_eq!(name.len(), "cnki_papers_20250623_213611.csv".len());
    }
}
