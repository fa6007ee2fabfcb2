//! Paper record types shared by the extractors, the CSV writer and the report stage.
//!
//! The CSV column set is fixed: every written row carries all fourteen fields
//! in [`FIELD_NAMES`] order, whatever the page actually exposed.

use serde::{Deserialize, Serialize};

/// CSV header, in column order
pub const FIELD_NAMES: [&str; 14] = [
    "题名", "作者", "来源", "发表时间", "数据库", "被引", "下载",
    "摘要", "关键词", "基金资助", "专辑", "专题", "分类号", "DOI",
];

/// One search result as persisted to CSV.
///
/// Serde renames map each field onto its CSV column; field declaration order is
/// the column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperRecord {
    #[serde(rename = "题名", default)]
    pub title: String,
    /// Author list as shown on the result row (`;`-delimited)
    #[serde(rename = "作者", default)]
    pub authors: String,
    #[serde(rename = "来源", default)]
    pub source: String,
    /// Publication date, day granularity
    #[serde(rename = "发表时间", default)]
    pub date: String,
    #[serde(rename = "数据库", default)]
    pub database: String,
    /// Citation count, kept as text
    #[serde(rename = "被引", default = "zero")]
    pub citations: String,
    /// Download count, kept as text
    #[serde(rename = "下载", default = "zero")]
    pub downloads: String,
    #[serde(rename = "摘要", default)]
    pub abstract_text: String,
    #[serde(rename = "关键词", default)]
    pub keywords: String,
    #[serde(rename = "基金资助", default)]
    pub funding: String,
    #[serde(rename = "专辑", default)]
    pub collection: String,
    #[serde(rename = "专题", default)]
    pub topic: String,
    #[serde(rename = "分类号", default)]
    pub classification: String,
    #[serde(rename = "DOI", default)]
    pub doi: String,
}

fn zero() -> String {
    "0".to_string()
}

impl Default for PaperRecord {
    fn default() -> Self {
        Self::from_parts(ListEntry::default(), PaperDetails::default())
    }
}

impl PaperRecord {
    /// Combine the row fields from the result list with the detail-page fields.
    pub fn from_parts(entry: ListEntry, details: PaperDetails) -> Self {
        Self {
            title: entry.title,
            authors: entry.authors,
            source: entry.source,
            date: entry.date,
            database: entry.database,
            citations: entry.citations,
            downloads: entry.downloads,
            abstract_text: details.abstract_text,
            keywords: details.keywords,
            funding: details.funding,
            collection: details.collection,
            topic: details.topic,
            classification: details.classification,
            doi: details.doi,
        }
    }

    /// Field values in [`FIELD_NAMES`] order
    pub fn values(&self) -> [&str; 14] {
        [
            &self.title,
            &self.authors,
            &self.source,
            &self.date,
            &self.database,
            &self.citations,
            &self.downloads,
            &self.abstract_text,
            &self.keywords,
            &self.funding,
            &self.collection,
            &self.topic,
            &self.classification,
            &self.doi,
        ]
    }
}

/// Primary fields read from one row of the result table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub title: String,
    /// Link to the detail page, as found in the row (may be relative)
    pub detail_link: Option<String>,
    pub authors: String,
    pub source: String,
    pub date: String,
    pub database: String,
    pub citations: String,
    pub downloads: String,
}

impl Default for ListEntry {
    fn default() -> Self {
        Self {
            title: String::new(),
            detail_link: None,
            authors: String::new(),
            source: String::new(),
            date: String::new(),
            database: String::new(),
            citations: zero(),
            downloads: zero(),
        }
    }
}

/// Secondary fields read from a paper's detail page.
///
/// `Default` is the all-empty value used when detail extraction fails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaperDetails {
    pub abstract_text: String,
    pub keywords: String,
    pub funding: String,
    pub collection: String,
    pub topic: String,
    pub classification: String,
    pub doi: String,
}

/// Drop the time-of-day from a listing date.
///
/// Keeps everything before the first space; text without a space is kept as is.
pub fn normalize_date(raw: &str) -> String {
    match raw.split_once(' ') {
        Some((day, _)) => day.to_string(),
        None => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_date() {
        assert_eq!(normalize_date("2023-05-01 14:20"), "2023-05-01");
        assert_eq!(normalize_date("2023-05"), "2023-05");
        assert_eq!(normalize_date(""), "");
        assert_eq!(normalize_date("2021-01-09  "), "2021-01-09");
    }

    #[test]
    fn test_default_record_counts_are_zero() {
        let record = PaperRecord::default();
        assert_eq!(record.citations, "0");
        assert_eq!(record.downloads, "0");
        assert!(record.title.is_empty());
        assert!(record.doi.is_empty());
    }

    #[test]
    fn test_values_follow_header_order() {
        let record = PaperRecord {
            title: "T".into(),
            doi: "10.1/x".into(),
            ..Default::default()
        };
        let values = record.values();
        assert_eq!(values.len(), FIELD_NAMES.len());
        assert_eq!(values[0], "T");
        assert_eq!(values[5], "0");
        assert_eq!(values[13], "10.1/x");
    }

    #[test]
    fn test_from_parts_keeps_primary_fields() {
        let entry = ListEntry {
            title: "Paper".into(),
            detail_link: Some("/kcms/detail".into()),
            authors: "张三;李四".into(),
            citations: "12".into(),
            ..Default::default()
        };
        let record = PaperRecord::from_parts(entry, PaperDetails::default());
        assert_eq!(record.title, "Paper");
        assert_eq!(record.authors, "张三;李四");
        assert_eq!(record.citations, "12");
        assert!(record.abstract_text.is_empty());
    }
}
