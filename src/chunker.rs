//! Text chunking for page content.
//!
//! Splits cleaned page text into overlapping character windows so each
//! window can be embedded and indexed independently.

use serde::{Deserialize, Serialize};

/// A contiguous span of cleaned page text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextChunk {
    /// The text content
    pub text: String,
    /// Source URL the chunk was extracted from
    pub source: String,
    /// Chunk index within the source
    pub chunk_index: usize,
}

impl TextChunk {
    /// Stable identifier: `{url}_{index}`.
    ///
    /// Deterministic across re-analysis, so re-indexing the same page
    /// overwrites chunks positionally instead of duplicating them.
    pub fn chunk_id(&self) -> String {
        format!("{}_{}", self.source, self.chunk_index)
    }
}

/// Split text into overlapping chunks of at most `chunk_size` characters,
/// stepping by `chunk_size - overlap` each time.
pub fn split_into_chunks(
    text: &str,
    source: &str,
    chunk_size: usize,
    overlap: usize,
) -> Vec<TextChunk> {
    let mut chunks = Vec::new();
    let chars: Vec<char> = text.chars().collect();
    let total_chars = chars.len();

    if total_chars == 0 || chunk_size == 0 {
        return chunks;
    }

    let step = chunk_size.saturating_sub(overlap).max(1);
    let mut start = 0;
    let mut chunk_index = 0;

    while start < total_chars {
        let end = (start + chunk_size).min(total_chars);
        let chunk_text: String = chars[start..end].iter().collect();

        // Prefer ending mid-chunk at a sentence boundary, except for the tail.
        let final_text = if end < total_chars {
            trim_to_sentence_boundary(&chunk_text)
        } else {
            chunk_text
        };

        let trimmed = final_text.trim();
        if !trimmed.is_empty() {
            chunks.push(TextChunk {
                text: trimmed.to_string(),
                source: source.to_string(),
                chunk_index,
            });
            chunk_index += 1;
        }

        start += step;
    }

    chunks
}

/// Cut the chunk at the last sentence ending in its final 20%, if any.
fn trim_to_sentence_boundary(text: &str) -> String {
    let sentence_endings = [". ", "! ", "? ", ".\n", "!\n", "?\n"];

    let mut search_start = (text.len() * 80) / 100;
    while search_start > 0 && !text.is_char_boundary(search_start) {
        search_start -= 1;
    }
    let search_text = &text[search_start..];

    for ending in sentence_endings.iter() {
        if let Some(pos) = search_text.rfind(ending) {
            let cut_pos = search_start + pos + ending.len();
            return text[..cut_pos].to_string();
        }
    }

    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_with_overlap() {
        let text = "This is a test. ".repeat(20);
        let chunks = split_into_chunks(&text, "https://example.com/page", 100, 20);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 100);
            assert_eq!(chunk.source, "https://example.com/page");
        }
    }

    #[test]
    fn chunk_ids_are_deterministic() {
        let text = "word ".repeat(600);
        let first = split_into_chunks(&text, "https://example.com", 1000, 200);
        let second = split_into_chunks(&text, "https://example.com", 1000, 200);

        let first_ids: Vec<String> = first.iter().map(TextChunk::chunk_id).collect();
        let second_ids: Vec<String> = second.iter().map(TextChunk::chunk_id).collect();
        assert_eq!(first_ids, second_ids);
        assert_eq!(first_ids[0], "https://example.com_0");
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(split_into_chunks("", "https://example.com", 1000, 200).is_empty());
        assert!(split_into_chunks("   ", "https://example.com", 1000, 200).is_empty());
    }

    #[test]
    fn short_text_is_single_chunk() {
        let chunks = split_into_chunks("A short page.", "u", 1000, 200);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].text, "A short page.");
    }

    #[test]
    fn multibyte_text_does_not_panic() {
        let text = "日本語のテキストです。".repeat(50);
        let chunks = split_into_chunks(&text, "u", 100, 20);
        assert!(!chunks.is_empty());
    }
}
