//! Field extraction: `MedlineCitation` element → [`DocumentRecord`]
//!
//! Pure functions, no I/O. Required fields (PMID, journal title) fail the
//! record; everything else falls back to a fixed default.

use crate::reader::Element;
use crate::record::DocumentRecord;

/// Title used when a citation has no `ArticleTitle` text
pub const NO_TITLE: &str = "No Title";

/// Author name used when an author entry is malformed
pub const UNNAMED_AUTHOR: &str = "unnamed";

/// Record-level failure: the citation is skipped, the file continues
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractError {
    MissingField {
        field: &'static str,
        /// Known when the PMID itself was present
        pmid: Option<String>,
    },
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField {
                field,
                pmid: Some(pmid),
            } => write!(f, "PMID {pmid}: missing {field}"),
            Self::MissingField { field, pmid: None } => write!(f, "missing {field}"),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Author child element that is present but carries no text
#[derive(Debug, Clone, PartialEq)]
pub enum AuthorError {
    EmptyName { part: &'static str },
}

impl std::fmt::Display for AuthorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName { part } => write!(f, "empty <{part}>"),
        }
    }
}

impl std::error::Error for AuthorError {}

/// Extract one document record from a citation element
pub fn extract(cit: &Element) -> Result<DocumentRecord, ExtractError> {
    let pmid = cit
        .first_text(&["PMID"])
        .ok_or(ExtractError::MissingField {
            field: "PMID",
            pmid: None,
        })?;

    let journal =
        cit.first_text(&["Article", "Journal", "Title"])
            .ok_or_else(|| ExtractError::MissingField {
                field: "Journal/Title",
                pmid: Some(pmid.clone()),
            })?;

    let title = cit
        .first_text(&["Article", "ArticleTitle"])
        .unwrap_or_else(|| NO_TITLE.to_string());

    let mesh = cit
        .select(&["MeshHeadingList", "MeshHeading", "DescriptorName"])
        .into_iter()
        .filter_map(|d| d.attr("UI"))
        .map(str::to_string)
        .collect();

    let authors = cit
        .select(&["Article", "AuthorList", "Author"])
        .into_iter()
        .map(|author| match author_name(author) {
            Ok(name) => name,
            Err(e) => {
                log::debug!("PMID {pmid}: {e}, using \"{UNNAMED_AUTHOR}\"");
                UNNAMED_AUTHOR.to_string()
            }
        })
        .collect();

    let abstract_text = texts(cit, &["Article", "Abstract", "AbstractText"]).join(" ");

    // KeywordList sits under MedlineCitation in current DTDs; older
    // exports nest it in Article
    let keywords = texts(cit, &["Article", "KeywordList", "Keyword"])
        .into_iter()
        .chain(texts(cit, &["KeywordList", "Keyword"]))
        .map(|k| normalize_whitespace(&k))
        .filter(|k| !k.is_empty())
        .collect();

    Ok(DocumentRecord {
        pmid,
        published_date: published_date(cit),
        mesh,
        title,
        authors,
        abstract_text,
        keywords,
        journal,
    })
}

/// Non-empty text values along `path`, in document order
fn texts(cit: &Element, path: &[&str]) -> Vec<String> {
    cit.select(path)
        .into_iter()
        .map(Element::text)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Display name for one `Author` element.
///
/// `CollectiveName` wins outright. Otherwise `LastName` (or empty),
/// prefixed by `ForeName` and a space when present.
pub fn author_name(author: &Element) -> Result<String, AuthorError> {
    if let Some(collective) = author.child("CollectiveName") {
        return required_text(collective, "CollectiveName");
    }

    let mut name = match author.child("LastName") {
        Some(last) => required_text(last, "LastName")?,
        None => String::new(),
    };
    if let Some(fore) = author.child("ForeName") {
        name = format!("{} {}", required_text(fore, "ForeName")?, name);
    }
    Ok(name)
}

fn required_text(el: &Element, part: &'static str) -> Result<String, AuthorError> {
    let text = el.text();
    if text.is_empty() {
        Err(AuthorError::EmptyName { part })
    } else {
        Ok(text)
    }
}

/// `Y-M-D` from `DateCompleted`, or `None`.
///
/// Needs exactly three child elements, each with text; any other shape
/// yields `None` rather than a malformed date.
pub fn published_date(cit: &Element) -> Option<String> {
    let completed = cit.child("DateCompleted")?;
    let parts: Vec<String> = completed.child_elements().map(Element::text).collect();
    match parts.as_slice() {
        [y, m, d] if !y.is_empty() && !m.is_empty() && !d.is_empty() => {
            Some(format!("{y}-{m}-{d}"))
        }
        _ => {
            log::debug!("DateCompleted with {} usable parts, ignoring", parts.len());
            None
        }
    }
}

/// Collapse whitespace runs to one space and trim both ends
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
