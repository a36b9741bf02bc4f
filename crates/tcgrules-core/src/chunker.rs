//! Overlapping, boundary-aware text chunking.
//!
//! Windows of at most `max_len` chars are cut from the text. Inside a short
//! lookback before the hard cutoff the chunker prefers to end a window on a
//! paragraph break, then a sentence end, then any whitespace; failing that it
//! cuts at `max_len`. The next window starts exactly `overlap` chars before
//! the previous one ended, so no char is ever skipped.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Document, Segment};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub max_len: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { max_len: 1500, overlap: 200 }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_len == 0 {
            return Err(Error::InvalidArgument("max_len must be positive".into()));
        }
        if self.overlap >= self.max_len {
            return Err(Error::InvalidArgument(format!(
                "overlap ({}) must be smaller than max_len ({})",
                self.overlap, self.max_len
            )));
        }
        Ok(())
    }
}

/// A borrowed slice of the source text plus its char offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span<'a> {
    pub text: &'a str,
    pub offset: usize,
}

/// Lazy sequence of spans. Cloning it restarts from the clone's position,
/// and the same input always yields the same spans.
#[derive(Debug, Clone)]
pub struct Splits<'a> {
    text: &'a str,
    max_len: usize,
    overlap: usize,
    lookback: usize,
    byte_pos: usize,
    char_pos: usize,
    done: bool,
}

/// Splits `text` into overlapping spans of at most `max_len` chars.
///
/// Fails with `InvalidArgument` unless `0 <= overlap < max_len`.
pub fn split(text: &str, max_len: usize, overlap: usize) -> Result<Splits<'_>> {
    ChunkingConfig { max_len, overlap }.validate()?;
    Ok(Splits {
        text,
        max_len,
        overlap,
        lookback: (max_len / 4).max(1),
        byte_pos: 0,
        char_pos: 0,
        done: text.is_empty(),
    })
}

impl<'a> Iterator for Splits<'a> {
    type Item = Span<'a>;

    fn next(&mut self) -> Option<Span<'a>> {
        if self.done {
            return None;
        }
        let rest = &self.text[self.byte_pos..];
        let window: Vec<(usize, char)> = rest.char_indices().take(self.max_len + 1).collect();
        if window.len() <= self.max_len {
            self.done = true;
            return Some(Span { text: rest, offset: self.char_pos });
        }

        let end = self.break_point(&window);
        let span = Span { text: &rest[..window[end].0], offset: self.char_pos };

        let advance = end - self.overlap;
        self.byte_pos += window[advance].0;
        self.char_pos += advance;
        Some(span)
    }
}

impl Splits<'_> {
    /// Chooses the window end (in chars, exclusive). `window` holds
    /// `max_len + 1` chars so that index `max_len` is the hard cutoff.
    ///
    /// The end never drops to `overlap` or below, which keeps every step
    /// moving forward.
    fn break_point(&self, window: &[(usize, char)]) -> usize {
        let hard = self.max_len;
        let min = hard.saturating_sub(self.lookback).max(self.overlap + 1);
        let ch = |i: usize| window[i].1;

        let paragraph = |e: usize| e >= 2 && ch(e - 1) == '\n' && ch(e - 2) == '\n';
        let sentence =
            |e: usize| e >= 2 && ch(e - 1).is_whitespace() && matches!(ch(e - 2), '.' | '!' | '?');
        let word = |e: usize| ch(e - 1).is_whitespace();

        let preferences: [&dyn Fn(usize) -> bool; 3] = [&paragraph, &sentence, &word];
        for is_boundary in preferences {
            if let Some(end) = (min..=hard).rev().find(|&e| is_boundary(e)) {
                return end;
            }
        }
        hard
    }
}

/// Chunker bound to one configuration; turns documents into segments.
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> ChunkingConfig {
        self.config
    }

    pub fn split<'a>(&self, text: &'a str) -> Splits<'a> {
        Splits {
            text,
            max_len: self.config.max_len,
            overlap: self.config.overlap,
            lookback: (self.config.max_len / 4).max(1),
            byte_pos: 0,
            char_pos: 0,
            done: text.is_empty(),
        }
    }

    pub fn segments(&self, doc: &Document) -> Vec<Segment> {
        self.split(&doc.text)
            .map(|span| Segment {
                text: span.text.to_string(),
                source_id: doc.source_id.clone(),
                category: doc.category,
                offset: span.offset,
            })
            .collect()
    }
}
