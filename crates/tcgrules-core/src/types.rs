//! Domain types shared by the chunker, the index store and the query facade.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable handle of an index entry, assigned at insertion time.
pub type EntryId = u32;

/// Which half of the corpus a document comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Rule,
    JudgeCall,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Rule, Category::JudgeCall];

    /// Directory under the corpus root holding this category's files.
    pub fn dir_name(self) -> &'static str {
        match self {
            Category::Rule => "rules",
            Category::JudgeCall => "judge-calls",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Rule => "rule",
            Category::JudgeCall => "judge-call",
        }
    }

    /// One-byte tag used in the persisted index.
    pub fn tag(self) -> u8 {
        match self {
            Category::Rule => 0,
            Category::JudgeCall => 1,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Category::Rule),
            1 => Some(Category::JudgeCall),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named unit of source text read from the corpus.
///
/// - `source_id`: `"<category dir>/<file name>"`, e.g. `rules/basic.txt`
/// - `category`: rule or judge call
/// - `text`: the raw file content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub source_id: String,
    pub category: Category,
    pub text: String,
}

impl Document {
    pub fn new(source_id: impl Into<String>, category: Category, text: impl Into<String>) -> Self {
        Self { source_id: source_id.into(), category, text: text.into() }
    }
}

/// A bounded chunk of a document, the unit that gets embedded and retrieved.
///
/// `offset` counts chars (not bytes) from the start of the parent document,
/// so `offset + text.chars().count()` never exceeds the document length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    pub source_id: String,
    pub category: Category,
    pub offset: usize,
}

/// Raw search output: an entry handle and its cosine similarity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: EntryId,
    pub score: f32,
}

/// A ranked passage with provenance, as handed to the orchestration layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub passage_text: String,
    pub source_id: String,
    pub category: Category,
    pub score: f32,
}
