//! C5 — splits raw document text into word-bounded overlapping chunks.
//!
//! Ported from the teacher's `parser::chunker::TextChunker` recursive
//! separator-descent algorithm, reworked to measure length in
//! whitespace-separated words rather than characters, and to consult
//! the chunk store for already-completed documents before splitting.

use crate::error::{FactCheckError, Result};
use crate::model::{document_hash, Chunk, ChunkStatus};
use crate::store::chunk_store::ChunkStore;
use chrono::Utc;

const SEPARATORS: [&str; 3] = ["\n\n", "\n", ". "];

pub struct Chunker {
    pub chunk_size_words: usize,
    pub chunk_overlap_words: usize,
}

pub struct ChunkerResult {
    pub chunks: Vec<Chunk>,
    pub already_complete: bool,
}

impl Chunker {
    pub fn new(chunk_size_words: usize, chunk_overlap_words: usize) -> Self {
        Self {
            chunk_size_words,
            chunk_overlap_words,
        }
    }

    /// Split `raw_text`, consulting `store` for dedup/idempotence, and
    /// upsert the still-pending chunks. Returns the chunks that still
    /// require extraction/verification.
    pub fn chunk_document(
        &self,
        document_name: &str,
        raw_text: &str,
        store: &ChunkStore,
    ) -> Result<ChunkerResult> {
        let trimmed = raw_text.trim();
        if trimmed.is_empty() {
            return Err(FactCheckError::EmptyInput);
        }

        let hash = document_hash(raw_text);
        let existing = store.list_by_hash(&hash)?;
        if !existing.is_empty() && existing.iter().all(|c| c.all_facts_extracted) {
            return Ok(ChunkerResult {
                chunks: vec![],
                already_complete: true,
            });
        }

        let leading_trim = raw_text.len() - raw_text.trim_start().len();
        let pieces = self.split_with_offsets(trimmed);
        let mut pending = Vec::new();

        for (index, (content, offset_in_trimmed)) in pieces.into_iter().enumerate() {
            let start_offset = leading_trim + offset_in_trimmed;

            let already_done = existing
                .iter()
                .any(|c| c.chunk_index == index && c.all_facts_extracted);
            if already_done {
                continue;
            }

            let now = Utc::now();
            let chunk = Chunk {
                document_name: document_name.to_string(),
                document_hash: hash.clone(),
                chunk_index: index,
                content,
                start_offset,
                status: ChunkStatus::Pending,
                contains_facts: false,
                all_facts_extracted: false,
                error_message: None,
                created_at: now,
                updated_at: now,
            };
            store.upsert(chunk.clone())?;
            pending.push(chunk);
        }

        Ok(ChunkerResult {
            chunks: pending,
            already_complete: false,
        })
    }

    /// Split text into word-bounded chunks with trailing word overlap.
    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_with_offsets(text).into_iter().map(|(content, _)| content).collect()
    }

    /// As `split`, but pairs each chunk with the byte offset in `text`
    /// where it begins, tracked through the splitting itself rather
    /// than recovered afterwards by searching for the (possibly
    /// overlap-prefixed) chunk text back in `text` — a search that
    /// fails outright once a chunk's overlap prefix duplicates text
    /// appearing elsewhere. For an overlapping chunk, the offset names
    /// where its *new*, non-overlap content starts.
    pub fn split_with_offsets(&self, text: &str) -> Vec<(String, usize)> {
        let leading = text.len() - text.trim_start().len();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return vec![];
        }

        if word_count(trimmed) <= self.chunk_size_words {
            return vec![(trimmed.to_string(), leading)];
        }

        self.recursive_split(trimmed, 0, leading)
    }

    fn recursive_split(&self, text: &str, separator_idx: usize, base_offset: usize) -> Vec<(String, usize)> {
        if separator_idx >= SEPARATORS.len() {
            return self.split_by_words(text, base_offset);
        }

        let separator = SEPARATORS[separator_idx];
        let splits: Vec<&str> = text.split(separator).collect();

        let mut chunks: Vec<(String, usize)> = Vec::new();
        let mut current_chunk = String::new();
        let mut current_start = base_offset;
        let mut cursor = base_offset;

        for (i, split) in splits.iter().enumerate() {
            let split_with_sep = if i < splits.len() - 1 {
                format!("{split}{separator}")
            } else {
                split.to_string()
            };
            let split_start = cursor;
            cursor += split_with_sep.len();

            if word_count(&current_chunk) + word_count(&split_with_sep) > self.chunk_size_words {
                if !current_chunk.is_empty() {
                    if word_count(&current_chunk) > self.chunk_size_words {
                        chunks.extend(self.recursive_split(&current_chunk, separator_idx + 1, current_start));
                    } else {
                        let (trimmed, offset) = trim_with_offset(&current_chunk, current_start);
                        chunks.push((trimmed, offset));
                    }
                }

                current_chunk = if !chunks.is_empty() && self.chunk_overlap_words > 0 {
                    let overlap = last_words(&chunks.last().unwrap().0, self.chunk_overlap_words);
                    format!("{overlap} {split_with_sep}")
                } else {
                    split_with_sep
                };
                current_start = split_start;
            } else {
                current_chunk.push_str(&split_with_sep);
            }
        }

        if !current_chunk.trim().is_empty() {
            let (trimmed, offset) = trim_with_offset(&current_chunk, current_start);
            if word_count(&trimmed) > self.chunk_size_words {
                chunks.extend(self.recursive_split(&trimmed, separator_idx + 1, offset));
            } else {
                chunks.push((trimmed, offset));
            }
        }

        chunks.into_iter().filter(|(c, _)| !c.trim().is_empty()).collect()
    }

    fn split_by_words(&self, text: &str, base_offset: usize) -> Vec<(String, usize)> {
        let spans = word_spans(text);
        if spans.is_empty() {
            return vec![];
        }

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < spans.len() {
            let end = (start + self.chunk_size_words).min(spans.len());
            let byte_start = spans[start].0;
            let byte_end = spans[end - 1].1;
            chunks.push((text[byte_start..byte_end].to_string(), base_offset + byte_start));

            start = if self.chunk_overlap_words > 0 {
                end.saturating_sub(self.chunk_overlap_words)
            } else {
                end
            };

            if start >= end {
                break;
            }
        }

        chunks
    }
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Byte `(start, end)` spans of each whitespace-separated word in `text`.
fn word_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = None;
    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            if let Some(s) = start.take() {
                spans.push((s, i));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        spans.push((s, text.len()));
    }
    spans
}

/// Trim whitespace from `s`, shifting `start` forward by however much
/// leading whitespace was removed.
fn trim_with_offset(s: &str, start: usize) -> (String, usize) {
    let leading = s.len() - s.trim_start().len();
    (s.trim().to_string(), start + leading)
}

fn last_words(text: &str, n: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let start = words.len().saturating_sub(n);
    words[start..].join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_yields_no_chunks() {
        let chunker = Chunker::new(750, 50);
        assert!(chunker.split("").is_empty());
        assert!(chunker.split("   \n\n  ").is_empty());
    }

    #[test]
    fn single_word_fits_one_chunk() {
        let chunker = Chunker::new(750, 50);
        let chunks = chunker.split("hello");
        assert_eq!(chunks, vec!["hello".to_string()]);
    }

    #[test]
    fn small_text_fits_one_chunk() {
        let chunker = Chunker::new(750, 50);
        let text = "This is a small text that fits in one chunk easily.";
        let chunks = chunker.split(text);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], text);
    }

    #[test]
    fn long_text_splits_into_multiple_word_bounded_chunks() {
        let chunker = Chunker::new(10, 2);
        let text = (0..50).map(|i| format!("word{i}")).collect::<Vec<_>>().join(" ");
        let chunks = chunker.split(&text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(word_count(chunk) <= 12); // target + overlap slack
        }
    }

    #[test]
    fn no_word_lost_across_chunks() {
        let chunker = Chunker::new(20, 5);
        let text = "Artificial intelligence is changing the world. \
                    Machine learning enables computers to learn from data. \
                    Deep learning uses neural networks with many layers. \
                    Natural language processing handles human language.";
        let chunks = chunker.split(text);
        for word in text.split_whitespace() {
            assert!(
                chunks.iter().any(|c| c.contains(word)),
                "word '{word}' missing from chunks"
            );
        }
    }

    #[test]
    fn prefers_paragraph_breaks_over_sentence_breaks() {
        let chunker = Chunker::new(6, 0);
        let text = "one two three\n\nfour five six seven eight nine";
        let chunks = chunker.split(text);
        assert!(chunks.iter().any(|c| c.trim() == "one two three"));
    }

    #[test]
    fn overlap_words_present_in_next_chunk() {
        let chunker = Chunker::new(5, 2);
        let text = (0..20).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        let chunks = chunker.split(&text);
        assert!(chunks.len() >= 2);
    }

    #[test]
    fn start_offset_points_into_the_original_text() {
        let chunker = Chunker::new(6, 0);
        let text = "  one two three\n\nfour five six seven eight nine";
        for (content, offset) in chunker.split_with_offsets(text) {
            assert_eq!(
                &text[offset..offset + content.len()],
                content,
                "offset {offset} does not locate chunk content in the source text"
            );
        }
    }

    #[test]
    fn start_offset_is_exact_for_every_chunk_after_the_first() {
        let chunker = Chunker::new(5, 2);
        let text = (0..20).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        let chunks = chunker.split_with_offsets(&text);
        assert!(chunks.len() >= 2);
        for (content, offset) in &chunks {
            assert_eq!(&text[*offset..*offset + content.len()], content.as_str());
        }
    }
}
