//! Paper records exchanged between data sources, the ranker, and the API

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Provenance tag of a paper record
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// arXiv Atom API
    Arxiv,
    /// Semantic Scholar Graph API
    Semantic,
    /// Anything else (caller-supplied records)
    #[default]
    #[serde(other)]
    Other,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Arxiv => "arxiv",
            Source::Semantic => "semantic",
            Source::Other => "other",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A paper as returned by a data source.
///
/// Optional fields carry explicit defaults through the accessor methods
/// below; the ranker reads them only through those accessors. Fields the
/// model does not know about are kept in `extra` and written back out
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    #[serde(default)]
    pub title: String,

    /// Abstract text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Publication year
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<u64>,

    /// Category code, e.g. `cs.CL`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    #[serde(default)]
    pub source: Source,

    /// PDF or landing page link
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Paper {
    /// Create a paper with only a title and provenance set
    pub fn new(title: impl Into<String>, source: Source) -> Self {
        Self {
            title: title.into(),
            source,
            ..Default::default()
        }
    }

    /// Abstract used for embedding; empty when missing
    pub fn abstract_text(&self) -> &str {
        self.summary.as_deref().unwrap_or("")
    }

    /// Citation count; zero when unknown
    pub fn citation_count(&self) -> u64 {
        self.citations.unwrap_or(0)
    }

    /// Publication year, or `reference_year` for undated papers so they
    /// are scored as maximally recent
    pub fn year_or(&self, reference_year: i32) -> i32 {
        self.year.unwrap_or(reference_year)
    }

    /// Subject code; empty when missing
    pub fn subject_code(&self) -> &str {
        self.subject.as_deref().unwrap_or("")
    }
}

/// A paper annotated by the hybrid ranker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPaper {
    #[serde(flatten)]
    pub paper: Paper,

    /// Cosine similarity to the query, rounded to 3 decimals
    pub similarity: f64,

    /// Weighted blend of similarity, citations, and recency, rounded to 3 decimals
    pub final_score: f64,
}
