//! Bulk-index line pair: index action + flattened citation document

use serde::Serialize;

/// Default target index name
pub const DEFAULT_INDEX: &str = "pubmed";

/// Flattened citation, serialized with the exact key names and order
/// expected by the search index mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentRecord {
    #[serde(rename = "PMID")]
    pub pmid: String,
    /// `year-month-day`, or null when `DateCompleted` is absent or malformed
    #[serde(rename = "PublishedDate")]
    pub published_date: Option<String>,
    /// Descriptor UIs, document order, not deduplicated
    #[serde(rename = "MeSH")]
    pub mesh: Vec<String>,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Authors")]
    pub authors: Vec<String>,
    #[serde(rename = "Abstract")]
    pub abstract_text: String,
    #[serde(rename = "Keywords")]
    pub keywords: Vec<String>,
    #[serde(rename = "Journal")]
    pub journal: String,
}

/// `{"index": {"_index": ..., "_id": ...}}`
#[derive(Debug, Serialize)]
pub struct IndexAction<'a> {
    index: IndexTarget<'a>,
}

#[derive(Debug, Serialize)]
struct IndexTarget<'a> {
    #[serde(rename = "_index")]
    index: &'a str,
    #[serde(rename = "_id")]
    id: &'a str,
}

impl<'a> IndexAction<'a> {
    pub fn new(index: &'a str, record: &'a DocumentRecord) -> Self {
        Self {
            index: IndexTarget {
                index,
                id: &record.pmid,
            },
        }
    }
}
