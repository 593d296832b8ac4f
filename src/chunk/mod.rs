//! Text chunking
//!
//! Splits page text into bounded, overlapping fragments:
//! - Hyphenated line wraps are rejoined and whitespace is collapsed first
//! - Window ends snap back to a space in the trailing 30% of the window
//! - Fragments of 50 characters or fewer are discarded
//!
//! All positions are measured in characters, never bytes.

use crate::config::ChunkConfig;
use crate::models::{Fragment, PageText};

/// Fragments must be strictly longer than this many characters.
pub const MIN_FRAGMENT_CHARS: usize = 50;

/// Rejoin hyphenated line wraps, turn newlines into spaces, and collapse
/// whitespace runs to a single space.
pub fn normalize_text(text: &str) -> String {
    let joined = text.replace("-\r\n", "").replace("-\n", "");
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splitter configured with a window length and overlap.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    /// `chunk_size` of zero is treated as one.
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            overlap,
        }
    }

    pub fn from_config(config: &ChunkConfig) -> Self {
        Self::new(config.chunk_size, config.overlap)
    }

    /// Lazily split `text` into fragments.
    pub fn chunks(&self, text: &str) -> Chunks {
        let text = normalize_text(text);
        let mut offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        offsets.push(text.len());
        Chunks {
            text,
            offsets,
            chunk_size: self.chunk_size,
            overlap: self.overlap,
            start: 0,
            finished: false,
        }
    }

    /// Chunk every page and assign store positions as ids, in page order.
    pub fn fragments(&self, pages: &[PageText]) -> Vec<Fragment> {
        let mut fragments = Vec::new();
        for page in pages {
            for text in self.chunks(&page.text) {
                fragments.push(Fragment {
                    id: fragments.len(),
                    text,
                    source: page.source.clone(),
                    page: page.page,
                });
            }
        }
        fragments
    }
}

/// Split `text` with the given window length and overlap.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Chunks {
    Chunker::new(chunk_size, overlap).chunks(text)
}

/// Lazy fragment sequence over one normalized text.
///
/// Cloning yields an independent cursor; [`Chunks::restart`] rewinds in place.
#[derive(Debug, Clone)]
pub struct Chunks {
    text: String,
    /// Byte offset of every char, followed by `text.len()`
    offsets: Vec<usize>,
    chunk_size: usize,
    overlap: usize,
    /// Window start, in chars
    start: usize,
    finished: bool,
}

impl Chunks {
    /// Rewind to the first fragment.
    pub fn restart(&mut self) {
        self.start = 0;
        self.finished = false;
    }

    fn char_len(&self) -> usize {
        self.offsets.len() - 1
    }

    fn slice(&self, start: usize, end: usize) -> &str {
        &self.text[self.offsets[start]..self.offsets[end]]
    }

    /// Window end after snapping back to a late space, if any.
    fn snapped_end(&self, start: usize, hard_end: usize) -> usize {
        if hard_end >= self.char_len() {
            return hard_end;
        }
        let last_space = self
            .slice(start, hard_end)
            .chars()
            .enumerate()
            .filter(|(_, c)| *c == ' ')
            .map(|(i, _)| i)
            .last();
        match last_space {
            Some(pos) if pos * 10 > self.chunk_size * 7 => start + pos,
            _ => hard_end,
        }
    }
}

impl Iterator for Chunks {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let len = self.char_len();
        while !self.finished && self.start < len {
            let start = self.start;
            let hard_end = (start + self.chunk_size).min(len);
            let end = self.snapped_end(start, hard_end);

            if hard_end >= len {
                self.finished = true;
            } else {
                let next = end.saturating_sub(self.overlap);
                self.start = if next <= start { hard_end } else { next };
            }

            let piece = self.slice(start, end).trim();
            if piece.chars().count() > MIN_FRAGMENT_CHARS {
                return Some(piece.to_string());
            }
        }
        None
    }
}
