//! Boundary-preferring text splitting.
//!
//! Windows of at most `chunk_size` characters are cut from the input, each
//! window preferring to end on a paragraph break, then a line break, then a
//! word break, falling back to a hard character cut. Consecutive windows
//! from the same document overlap by `chunk_overlap` characters, so the
//! concatenation of chunks minus overlaps reconstructs the original text.

use serde_json::Value;

use super::{Chunk, Document};

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Separator ladder, strongest boundary first. The empty string means a
/// plain character cut.
const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

impl TextSplitter {
    /// `chunk_overlap` must leave room for forward progress; it is clamped
    /// below `chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split raw text into (start_offset, span) pairs. Offsets are in
    /// characters from the start of the input.
    pub fn split_text(&self, text: &str) -> Vec<(usize, String)> {
        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();
        let mut spans = Vec::new();

        if total == 0 {
            return spans;
        }

        let mut start = 0;
        loop {
            let hard_end = (start + self.chunk_size).min(total);
            let end = if hard_end < total {
                find_break(&chars, start, hard_end)
            } else {
                hard_end
            };

            spans.push((start, chars[start..end].iter().collect()));

            if end >= total {
                break;
            }

            // Step back by the overlap, but always move forward.
            start = end.saturating_sub(self.chunk_overlap).max(start + 1);
        }

        spans
    }

    /// Split documents into chunks, each carrying the parent metadata plus
    /// `start_offset` and `chunk_index`.
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for document in documents {
            for (index, (offset, span)) in self.split_text(&document.content).into_iter().enumerate()
            {
                let mut metadata = document.metadata.clone();
                metadata.insert("start_offset".to_string(), Value::from(offset));
                metadata.insert("chunk_index".to_string(), Value::from(index));
                chunks.push(Chunk {
                    content: span,
                    metadata,
                });
            }
        }
        chunks
    }
}

/// Pick the best break position in `(start, hard_end]`, searching backward
/// through the separator ladder. The break lands after the separator so no
/// characters are lost. Only the tail of the window is searched; a break
/// too close to `start` would make chunks degenerate.
fn find_break(chars: &[char], start: usize, hard_end: usize) -> usize {
    let window_len = hard_end - start;
    let earliest = start + window_len / 2;

    for separator in SEPARATORS {
        let sep: Vec<char> = separator.chars().collect();
        let mut pos = hard_end;
        while pos > earliest + sep.len() {
            let candidate = pos - sep.len();
            if chars[candidate..pos] == sep[..] {
                return pos;
            }
            pos -= 1;
        }
    }

    hard_end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconstruct(spans: &[(usize, String)]) -> String {
        let mut out = String::new();
        let mut covered = 0usize;
        for (start, span) in spans {
            let span_chars: Vec<char> = span.chars().collect();
            let skip = covered.saturating_sub(*start);
            out.extend(span_chars[skip..].iter());
            covered = start + span_chars.len();
        }
        out
    }

    #[test]
    fn splitting_is_covering_and_bounded() {
        let splitter = TextSplitter::new(100, 20);
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(30);

        let spans = splitter.split_text(&text);
        assert!(spans.len() > 1);
        for (_, span) in &spans {
            assert!(span.chars().count() <= 100);
        }
        assert_eq!(reconstruct(&spans), text);
    }

    #[test]
    fn consecutive_chunks_overlap() {
        let splitter = TextSplitter::new(100, 20);
        let text = "word ".repeat(100);

        let spans = splitter.split_text(&text);
        for pair in spans.windows(2) {
            let (prev_start, prev_span) = (&pair[0].0, &pair[0].1);
            let next_start = pair[1].0;
            let prev_end = prev_start + prev_span.chars().count();
            let overlap = prev_end.saturating_sub(next_start);
            assert!(overlap <= 20);
            assert!(overlap > 0);
        }
    }

    #[test]
    fn prefers_paragraph_boundaries() {
        let splitter = TextSplitter::new(80, 10);
        let first = "A".repeat(60);
        let text = format!("{}\n\nSecond paragraph follows here with more text.", first);

        let spans = splitter.split_text(&text);
        // The first window could hold 80 chars, but the paragraph break at
        // 62 wins over a mid-word cut.
        assert!(spans[0].1.ends_with("\n\n"));
        assert_eq!(spans[0].1.chars().count(), 62);
    }

    #[test]
    fn splitting_is_deterministic() {
        let splitter = TextSplitter::default();
        let text = "Some content.\n\nMore content here.\n".repeat(120);
        assert_eq!(splitter.split_text(&text), splitter.split_text(&text));
    }

    #[test]
    fn empty_and_short_inputs() {
        let splitter = TextSplitter::default();
        assert!(splitter.split_text("").is_empty());

        let spans = splitter.split_text("short");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0], (0, "short".to_string()));
    }

    #[test]
    fn document_chunks_carry_offsets_and_parent_metadata() {
        let mut metadata = serde_json::Map::new();
        metadata.insert("source".to_string(), serde_json::Value::from("a.txt"));
        let doc = Document::with_metadata("line one\nline two\nline three\n".repeat(20), metadata);

        let chunks = TextSplitter::new(120, 30).split_documents(&[doc]);
        assert!(chunks.len() > 1);
        for (index, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.source(), "a.txt");
            assert_eq!(
                chunk.metadata.get("chunk_index").and_then(|v| v.as_u64()),
                Some(index as u64)
            );
            assert!(chunk.metadata.get("start_offset").is_some());
        }
    }
}
