//! In-memory vector index: ordered entries, exact cosine search.
//!
//! Entries are only ever appended. Each entry caches its vector norm at insert
//! time, so a query costs one dot product per entry plus a bounded heap of
//! size `k` for the ranking.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use tcgrules_core::error::{Error, Result};
use tcgrules_core::types::{EntryId, Passage, SearchHit, Segment};

#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub id: EntryId,
    pub segment: Segment,
    pub vector: Vec<f32>,
    norm: f32,
}

impl IndexEntry {
    pub fn passage(&self, score: f32) -> Passage {
        Passage {
            passage_text: self.segment.text.clone(),
            source_id: self.segment.source_id.clone(),
            category: self.segment.category,
            score,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexStore {
    model_id: String,
    dimension: Option<usize>,
    entries: Vec<IndexEntry>,
}

impl IndexStore {
    /// Empty store tagged with the embedding model that will fill it.
    pub fn with_model(model_id: impl Into<String>) -> Self {
        Self { model_id: model_id.into(), dimension: None, entries: Vec::new() }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Fixed by the first insert; `None` while the store is empty.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, id: EntryId) -> Option<&IndexEntry> {
        self.entries.get(id as usize)
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn insert(&mut self, segment: Segment, vector: Vec<f32>) -> Result<EntryId> {
        if vector.is_empty() {
            return Err(Error::InvalidArgument("cannot insert an empty vector".into()));
        }
        if let Some(expected) = self.dimension {
            if vector.len() != expected {
                return Err(Error::DimensionMismatch { expected, actual: vector.len() });
            }
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(Error::InvalidArgument(format!(
                "vector for {} contains non-finite values",
                segment.source_id
            )));
        }
        let id = EntryId::try_from(self.entries.len())
            .map_err(|_| Error::InvalidArgument("index is full".into()))?;
        let norm = l2_norm(&vector);
        self.dimension = Some(vector.len());
        self.entries.push(IndexEntry { id, segment, vector, norm });
        Ok(id)
    }

    /// Top `k` entries by cosine similarity, best first. Equal scores keep
    /// insertion order (lower id first).
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if k == 0 {
            return Err(Error::InvalidArgument("k must be positive".into()));
        }
        let Some(dimension) = self.dimension else {
            return Ok(Vec::new());
        };
        if query.len() != dimension {
            return Err(Error::DimensionMismatch { expected: dimension, actual: query.len() });
        }
        let query_norm = l2_norm(query);

        let mut heap: BinaryHeap<Reverse<Ranked>> = BinaryHeap::with_capacity(k.min(self.entries.len()) + 1);
        for entry in &self.entries {
            let candidate = Ranked { score: cosine(query, query_norm, &entry.vector, entry.norm), id: entry.id };
            if heap.len() < k {
                heap.push(Reverse(candidate));
            } else if heap.peek().is_some_and(|Reverse(worst)| candidate > *worst) {
                heap.pop();
                heap.push(Reverse(candidate));
            }
        }
        Ok(heap
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse(r)| SearchHit { id: r.id, score: r.score })
            .collect())
    }

    /// `search` resolved to passages with provenance.
    pub fn search_passages(&self, query: &[f32], k: usize) -> Result<Vec<Passage>> {
        let hits = self.search(query, k)?;
        Ok(hits
            .into_iter()
            .filter_map(|hit| self.entry(hit.id).map(|e| e.passage(hit.score)))
            .collect())
    }
}

/// Ranking key: higher score is better, then lower id.
#[derive(Debug, Clone, Copy)]
struct Ranked {
    score: f32,
    id: EntryId,
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score.total_cmp(&other.score).then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn cosine(a: &[f32], a_norm: f32, b: &[f32], b_norm: f32) -> f32 {
    if a_norm == 0.0 || b_norm == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    dot / (a_norm * b_norm)
}
