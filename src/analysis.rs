//! Aggregate statistics over an exported paper CSV.
//!
//! Reads the file written by [`RecordWriter`](crate::writer::RecordWriter)
//! back into [`PaperRecord`]s and computes the distributions fed to the report
//! prompt.

use crate::error::{CnkiError, Result};
use crate::record::PaperRecord;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Citation histogram bucket labels
pub const CITATION_BUCKETS: [&str; 6] = ["0", "1-5", "6-10", "11-20", "21-50", "50+"];

/// Load every record of an exported CSV.
///
/// # Errors
///
/// Returns error if the file is missing or not a valid paper CSV.
pub fn load_records(path: &Path) -> Result<Vec<PaperRecord>> {
    if !path.exists() {
        return Err(CnkiError::Validation(format!(
            "CSV file not found: {}",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path)?;
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);

    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let records = rdr
        .deserialize()
        .collect::<std::result::Result<Vec<PaperRecord>, _>>()?;

    info!(count = records.len(), path = %path.display(), "Loaded records");
    Ok(records)
}

/// Distributions over a set of records
#[derive(Debug, Clone, Default, Serialize)]
pub struct Statistics {
    pub total: usize,
    pub year_counts: BTreeMap<u32, usize>,
    pub venue_counts: BTreeMap<String, usize>,
    pub keyword_counts: BTreeMap<String, usize>,
    /// Counts per [`CITATION_BUCKETS`] entry
    pub citation_histogram: [usize; 6],
}

impl Statistics {
    pub fn compute(records: &[PaperRecord]) -> Result<Self> {
        let keyword_split = Regex::new(r"[;；,，]").map_err(|e| CnkiError::Parse(e.to_string()))?;
        let mut stats = Self {
            total: records.len(),
            ..Default::default()
        };

        for record in records {
            if let Some(year) = publication_year(&record.date) {
                *stats.year_counts.entry(year).or_default() += 1;
            }

            let venue = record.source.trim();
            if !venue.is_empty() {
                *stats.venue_counts.entry(venue.to_string()).or_default() += 1;
            }

            for keyword in keyword_split.split(&record.keywords) {
                let keyword = keyword.trim();
                if !keyword.is_empty() {
                    *stats.keyword_counts.entry(keyword.to_string()).or_default() += 1;
                }
            }

            stats.citation_histogram[citation_bucket(&record.citations)] += 1;
        }

        Ok(stats)
    }

    /// Earliest and latest publication year
    pub fn year_span(&self) -> Option<(u32, u32)> {
        let first = self.year_counts.keys().next()?;
        let last = self.year_counts.keys().next_back()?;
        Some((*first, *last))
    }

    /// Venues by descending count, ties by name
    pub fn top_venues(&self, n: usize) -> Vec<(&str, usize)> {
        top_n(&self.venue_counts, n)
    }

    /// Keywords by descending count, ties by name
    pub fn top_keywords(&self, n: usize) -> Vec<(&str, usize)> {
        top_n(&self.keyword_counts, n)
    }

    /// `(label, count)` pairs of the citation histogram
    pub fn citation_buckets(&self) -> Vec<(&'static str, usize)> {
        CITATION_BUCKETS
            .iter()
            .copied()
            .zip(self.citation_histogram.iter().copied())
            .collect()
    }
}

fn top_n(counts: &BTreeMap<String, usize>, n: usize) -> Vec<(&str, usize)> {
    let mut sorted: Vec<(&str, usize)> = counts.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    sorted.truncate(n);
    sorted
}

/// Year from the leading four digits of a date
fn publication_year(date: &str) -> Option<u32> {
    let year = date.trim().get(..4)?;
    if year.chars().all(|c| c.is_ascii_digit()) {
        year.parse().ok()
    } else {
        None
    }
}

/// Histogram slot for a citation count; unparseable counts as 0
fn citation_bucket(citations: &str) -> usize {
    match citations.trim().parse::<u64>().unwrap_or(0) {
        0 => 0,
        1..=5 => 1,
        6..=10 => 2,
        11..=20 => 3,
        21..=50 => 4,
        _ => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::RecordWriter;
    use tempfile::TempDir;

    fn record(date: &str, source: &str, keywords: &str, citations: &str) -> PaperRecord {
        PaperRecord {
            title: format!("{} {}", source, date),
            date: date.to_string(),
            source: source.to_string(),
            keywords: keywords.to_string(),
            citations: citations.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_citation_buckets() {
        assert_eq!(citation_bucket("0"), 0);
        assert_eq!(citation_bucket(""), 0);
        assert_eq!(citation_bucket("n/a"), 0);
        assert_eq!(citation_bucket("5"), 1);
        assert_eq!(citation_bucket("6"), 2);
        assert_eq!(citation_bucket("20"), 3);
        assert_eq!(citation_bucket("50"), 4);
        assert_eq!(citation_bucket("51"), 5);
    }

    #[test]
    fn test_publication_year() {
        assert_eq!(publication_year("2023-05-01"), Some(2023));
        assert_eq!(publication_year("2021"), Some(2021));
        assert_eq!(publication_year("20"), None);
        assert_eq!(publication_year("网络首发"), None);
    }

    #[test]
    fn test_compute() -> Result<()> {
        let records = vec![
            record("2021-03-01", "岩土力学", "边坡;降雨入渗;", "3"),
            record("2023-01-09", "岩土力学", "边坡；数值模拟", "0"),
            record("2023-07-12", "工程地质学报", "", "77"),
            record("", "", "", ""),
        ];
        let stats = Statistics::compute(&records)?;

        assert_eq!(stats.total, 4);
        assert_eq!(stats.year_counts.get(&2023), Some(&2));
        assert_eq!(stats.year_span(), Some((2021, 2023)));
        assert_eq!(stats.top_venues(1), vec![("岩土力学", 2)]);
        assert_eq!(stats.keyword_counts.get("边坡"), Some(&2));
        assert_eq!(stats.keyword_counts.len(), 3);
        assert_eq!(stats.citation_histogram, [2, 1, 0, 0, 0, 1]);
        assert_eq!(stats.citation_buckets()[5], ("50+", 1));
        Ok(())
    }

    #[test]
    fn test_load_written_file() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("papers.csv");
        let mut writer = RecordWriter::create(Some(&path))?;
        writer.write(&record("2022-02-02", "岩土力学", "边坡", "4"))?;
        writer.write(&record("2020", "中国公路学报", "", "0"))?;

        let records = load_records(&path)?;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].source, "岩土力学");
        assert_eq!(records[0].title, "岩土力学 2022-02-02");
        assert_eq!(records[1].date, "2020");
        Ok(())
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_records(Path::new("/nonexistent/papers.csv"));
        assert!(matches!(result, Err(CnkiError::Validation(_))));
    }
}
