//! Fixed-size overlapping chunking
//!
//! Sizes and offsets are counted in characters, never bytes, so windows
//! always fall on UTF-8 boundaries.

use crate::{ParserError, Result};
use std::ops::Range;

/// Configuration for document chunking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    /// Window size in characters
    pub chunk_size: usize,

    /// Characters shared by consecutive windows
    pub overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            overlap: 200,
        }
    }
}

impl ChunkConfig {
    /// Create a validated configuration
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        let config = Self {
            chunk_size,
            overlap,
        };
        config.validate()?;
        Ok(config)
    }

    /// Windows must advance by at least one character
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ParserError::InvalidConfig(
                "chunk size must be positive".to_string(),
            ));
        }
        if self.overlap >= self.chunk_size {
            return Err(ParserError::InvalidConfig(format!(
                "overlap {} must be smaller than chunk size {}",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Character ranges of the raw windows over a text of `char_len` characters
pub fn window_ranges(char_len: usize, config: &ChunkConfig) -> Result<Vec<Range<usize>>> {
    config.validate()?;

    let mut ranges = Vec::new();
    let mut start = 0;

    while start < char_len {
        let end = (start + config.chunk_size).min(char_len);
        ranges.push(start..end);

        if end == char_len {
            break;
        }

        // overlap < chunk_size, so this always moves forward
        start = end - config.overlap;
    }

    Ok(ranges)
}

/// Split `text` into trimmed, non-empty overlapping chunks
pub fn chunk_text(text: &str, config: &ChunkConfig) -> Result<Vec<String>> {
    // Byte offset of every character, plus the end of the text
    let offsets: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_len = offsets.len() - 1;

    let chunks = window_ranges(char_len, config)?
        .into_iter()
        .filter_map(|range| {
            let piece = text[offsets[range.start]..offsets[range.end]].trim();
            (!piece.is_empty()).then(|| piece.to_string())
        })
        .collect();

    Ok(chunks)
}
