//! Chunk-size heuristics and recursive text splitting.
//!
//! This module decides where a document is cut before each piece is sent to the model.
//! Highlights:
//!
//! - Separator hierarchy: split on paragraph breaks first, then line breaks, sentence endings,
//!   spaces, and finally single characters. A piece that is still too large after one separator
//!   is split again with the next finer one, so boundaries stay as natural as the text allows.
//! - Overlap: adjacent chunks share a trailing window (`TEXT_SPLITTER_CHUNK_OVERLAP`, 200 by
//!   default) so that context around a boundary is visible to both summaries.
//! - Length units: sizes are measured in characters by default; `TEXT_SPLITTER_LENGTH_UNIT=tokens`
//!   switches to `tiktoken-rs` token counts for the configured model, falling back to a
//!   whitespace counter when the model's tokenizer is unavailable.

use crate::config::LengthUnit;
use anyhow::Error as TokenizerError;
use std::collections::VecDeque;
use std::sync::Arc;
use tiktoken_rs::{
    CoreBPE, cl100k_base, get_bpe_from_model, model::get_context_size, o200k_base, p50k_base,
    p50k_edit, r50k_base,
};

use super::types::ChunkingError;

/// Measures the length of a piece of text in the configured unit.
pub type LengthFn = Arc<dyn Fn(&str) -> usize + Send + Sync>;

/// Separators tried in order, coarsest first. The empty separator splits between characters.
pub const DEFAULT_SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];
/// Chunk size used with the character unit when no override is configured.
pub const DEFAULT_CHARACTER_CHUNK_SIZE: usize = 4000;

const MIN_AUTOMATIC_TOKEN_CHUNK_SIZE: usize = 256;
const MAX_AUTOMATIC_TOKEN_CHUNK_SIZE: usize = 2048;

/// Determine the chunk size for a request, respecting overrides.
///
/// Precedence:
/// 1) Explicit override wins and is clamped at `>= 1`.
/// 2) Character unit: [`DEFAULT_CHARACTER_CHUNK_SIZE`].
/// 3) Token unit: a quarter of the model's context window, clamped into `[256, 2048]`, leaving
///    room for the prompt template and the generated summary.
pub(crate) fn determine_chunk_size(
    override_size: Option<usize>,
    unit: LengthUnit,
    model: &str,
) -> usize {
    if let Some(explicit) = override_size {
        return explicit.max(1);
    }

    match unit {
        LengthUnit::Characters => DEFAULT_CHARACTER_CHUNK_SIZE,
        LengthUnit::Tokens => {
            let window = get_context_size(model);
            let base = (window / 4).max(1);
            base.clamp(MIN_AUTOMATIC_TOKEN_CHUNK_SIZE, MAX_AUTOMATIC_TOKEN_CHUNK_SIZE)
        }
    }
}

/// Split `text` into chunks of at most `max_chunk_size` characters with the default overlap.
///
/// Never fails: empty or whitespace-only input yields an empty vector, and a zero size is
/// treated as one.
pub fn chunk(text: &str, max_chunk_size: usize) -> Vec<String> {
    let size = max_chunk_size.max(1);
    TextSplitter::new(size, crate::config::DEFAULT_CHUNK_OVERLAP, character_counter())
        .map(|splitter| splitter.split(text))
        .unwrap_or_default()
}

/// Split `text` into chunks with an explicit overlap and length function.
///
/// Returns an empty vector when the input text is all whitespace.
pub fn chunk_text(
    text: &str,
    chunk_size: usize,
    overlap: usize,
    length: LengthFn,
) -> Result<Vec<String>, ChunkingError> {
    let splitter = TextSplitter::new(chunk_size, overlap, length)?;
    Ok(splitter.split(text))
}

/// Build the length function for `unit`.
pub fn build_length_fn(unit: LengthUnit, model: &str) -> LengthFn {
    match unit {
        LengthUnit::Characters => character_counter(),
        LengthUnit::Tokens => match build_tiktoken_counter(model) {
            Ok(counter) => counter,
            Err(error) => {
                tracing::warn!(
                    model,
                    error = %error,
                    "Tokenizer unavailable for model; falling back to whitespace counter"
                );
                whitespace_counter()
            }
        },
    }
}

/// Length in Unicode scalar values.
pub fn character_counter() -> LengthFn {
    Arc::new(|segment: &str| segment.chars().count())
}

fn build_tiktoken_counter(model: &str) -> Result<LengthFn, ChunkingError> {
    let normalized = model.trim();
    let target = if normalized.is_empty() {
        "cl100k_base"
    } else {
        normalized
    };
    let encoding = resolve_encoding(target).map_err(|source| ChunkingError::Tokenizer {
        model: target.to_string(),
        source,
    })?;
    let encoding = Arc::new(encoding);

    Ok(Arc::new(move |segment: &str| {
        encoding.encode_ordinary(segment).len()
    }))
}

fn resolve_encoding(model: &str) -> Result<CoreBPE, TokenizerError> {
    match get_bpe_from_model(model) {
        Ok(encoding) => Ok(encoding),
        Err(model_err) => {
            tracing::debug!(
                model,
                error = %model_err,
                "Tokenizer model lookup failed; trying encoding name"
            );
            if let Some(candidate) = encoding_from_name(model) {
                candidate
            } else {
                tracing::warn!(
                    model,
                    "Falling back to 'cl100k_base' encoding for token counting"
                );
                cl100k_base()
            }
        }
    }
}

fn encoding_from_name(name: &str) -> Option<Result<CoreBPE, TokenizerError>> {
    match name {
        "cl100k_base" => Some(cl100k_base()),
        "o200k_base" => Some(o200k_base()),
        "p50k_base" => Some(p50k_base()),
        "p50k_edit" => Some(p50k_edit()),
        "r50k_base" | "gpt2" => Some(r50k_base()),
        _ => None,
    }
}

fn whitespace_counter() -> LengthFn {
    Arc::new(|segment: &str| {
        let tokens = segment.split_whitespace().count();
        if tokens == 0 && !segment.is_empty() {
            1
        } else {
            tokens
        }
    })
}

/// Recursive separator-based splitter.
///
/// Separators stay attached to the end of the piece they terminate, so joining the pieces of a
/// chunk reproduces the source text exactly; only leading and trailing whitespace of each chunk
/// is trimmed.
pub struct TextSplitter {
    chunk_size: usize,
    overlap: usize,
    separators: Vec<String>,
    length: LengthFn,
}

impl TextSplitter {
    /// Create a splitter using [`DEFAULT_SEPARATORS`].
    ///
    /// The overlap is clamped below `chunk_size`; a zero `chunk_size` is rejected.
    pub fn new(chunk_size: usize, overlap: usize, length: LengthFn) -> Result<Self, ChunkingError> {
        if chunk_size == 0 {
            return Err(ChunkingError::InvalidChunkSize);
        }
        Ok(Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
            length,
        })
    }

    /// Replace the separator hierarchy.
    ///
    /// Without a trailing empty separator, a unit that contains none of the separators and still
    /// exceeds the chunk size is emitted whole as an oversized chunk.
    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.separators = separators.into_iter().map(Into::into).collect();
        self
    }

    /// Split `text` into ordered chunks.
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let (separator, finer) = select_separator(text, separators);
        let pieces = split_keeping_separator(text, separator);

        let mut chunks = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();

        for piece in pieces {
            if (self.length)(piece) <= self.chunk_size {
                fitting.push(piece);
                continue;
            }

            if !fitting.is_empty() {
                chunks.extend(self.merge(&fitting));
                fitting.clear();
            }

            if finer.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    tracing::debug!(
                        length = (self.length)(trimmed),
                        chunk_size = self.chunk_size,
                        "Emitting oversized unit without a finer separator"
                    );
                    chunks.push(trimmed.to_string());
                }
            } else {
                chunks.extend(self.split_recursive(piece, finer));
            }
        }

        if !fitting.is_empty() {
            chunks.extend(self.merge(&fitting));
        }

        chunks
    }

    /// Greedily pack pieces into chunks, carrying up to `overlap` units of trailing pieces into
    /// the next chunk.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = (self.length)(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                push_window(&mut chunks, &window);
                while total > self.overlap || (total + len > self.chunk_size && total > 0) {
                    match window.pop_front() {
                        Some((_, dropped)) => total -= dropped,
                        None => break,
                    }
                }
            }
            window.push_back((piece, len));
            total += len;
        }

        push_window(&mut chunks, &window);
        chunks
    }
}

fn select_separator<'a>(text: &str, separators: &'a [String]) -> (&'a str, &'a [String]) {
    for (index, separator) in separators.iter().enumerate() {
        if separator.is_empty() || text.contains(separator.as_str()) {
            return (separator.as_str(), &separators[index + 1..]);
        }
    }
    match separators.last() {
        Some(last) => (last.as_str(), &[]),
        None => ("", &[]),
    }
}

fn split_keeping_separator<'t>(text: &'t str, separator: &str) -> Vec<&'t str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(start, ch)| &text[start..start + ch.len_utf8()])
            .collect();
    }
    text.split_inclusive(separator)
        .filter(|piece| !piece.is_empty())
        .collect()
}

fn push_window(chunks: &mut Vec<String>, window: &VecDeque<(&str, usize)>) {
    let joined: String = window.iter().map(|(piece, _)| *piece).collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}
