//! Transcript chunking for indexing.
//!
//! Splits transcript text into bounded, overlapping chunks for embedding.
//! Split points are chosen preferentially at structural boundaries:
//! paragraph, then line, then sentence, then word, with a hard character
//! cut as the last resort. Lengths are counted in characters.

use crate::config::ChunkingConfig;

/// Boundary preference order, coarsest first.
const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", " "];

/// Split text into overlapping chunks per the configuration.
///
/// Every chunk is at most `chunk_size` characters. Each chunk after the
/// first starts with the final `chunk_overlap` characters of its
/// predecessor so retrieval doesn't lose context at chunk seams.
pub fn split_text(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let budget = config
        .chunk_size
        .saturating_sub(config.chunk_overlap)
        .max(1);

    let base = split_recursive(text, budget, SEPARATORS);

    let mut chunks = Vec::with_capacity(base.len());
    for (i, chunk) in base.iter().enumerate() {
        if i == 0 || config.chunk_overlap == 0 {
            chunks.push(chunk.clone());
        } else {
            let carry = char_tail(&base[i - 1], config.chunk_overlap);
            chunks.push(format!("{}{}", carry, chunk));
        }
    }
    chunks
}

/// Split into pieces of at most `budget` characters, trying separators in
/// preference order.
fn split_recursive(text: &str, budget: usize, separators: &[&str]) -> Vec<String> {
    if char_len(text) <= budget {
        return if text.trim().is_empty() {
            Vec::new()
        } else {
            vec![text.to_string()]
        };
    }

    let Some((separator, rest)) = separators.split_first() else {
        return hard_cut(text, budget);
    };

    if !text.contains(separator) {
        return split_recursive(text, budget, rest);
    }

    let pieces = split_keeping(text, separator);
    merge_pieces(pieces, budget, rest)
}

/// Greedily pack pieces into chunks of at most `budget` characters,
/// recursing with finer separators on pieces that are too large alone.
fn merge_pieces(pieces: Vec<String>, budget: usize, finer: &[&str]) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for piece in pieces {
        let piece_len = char_len(&piece);

        if piece_len > budget {
            if !current.trim().is_empty() {
                chunks.push(std::mem::take(&mut current));
            } else {
                current.clear();
            }
            chunks.extend(split_recursive(&piece, budget, finer));
        } else if char_len(&current) + piece_len <= budget {
            current.push_str(&piece);
        } else {
            if !current.trim().is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            current = piece;
        }
    }

    if !current.trim().is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Split on a separator, keeping the separator attached to the piece that
/// precedes it.
fn split_keeping(text: &str, separator: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, matched) in text.match_indices(separator) {
        let end = idx + matched.len();
        pieces.push(text[start..end].to_string());
        start = end;
    }
    if start < text.len() {
        pieces.push(text[start..].to_string());
    }
    pieces
}

/// Last-resort cut into consecutive character windows.
fn hard_cut(text: &str, budget: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(budget)
        .map(|window| window.iter().collect())
        .collect()
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// The final `n` characters of a string, on a character boundary.
fn char_tail(s: &str, n: usize) -> &str {
    let len = char_len(s);
    if len <= n {
        return s;
    }
    let byte_idx = s
        .char_indices()
        .nth(len - n)
        .map(|(i, _)| i)
        .unwrap_or(0);
    &s[byte_idx..]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(chunk_size: usize, chunk_overlap: usize) -> ChunkingConfig {
        ChunkingConfig {
            chunk_size,
            chunk_overlap,
        }
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = split_text("a short transcript", &config(512, 32));
        assert_eq!(chunks, vec!["a short transcript".to_string()]);
    }

    #[test]
    fn test_blank_text_no_chunks() {
        assert!(split_text("", &config(512, 32)).is_empty());
        assert!(split_text("   \n\n  ", &config(512, 32)).is_empty());
    }

    #[test]
    fn test_prefers_paragraph_boundary() {
        let text = format!("{}\n\n{}", "a".repeat(40), "b".repeat(40));
        let chunks = split_text(&text, &config(60, 0));
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].starts_with(&"a".repeat(40)));
        assert_eq!(chunks[1], "b".repeat(40));
    }

    #[test]
    fn test_falls_back_to_sentence_boundary() {
        let text = format!("{}. {}", "a".repeat(40), "b".repeat(40));
        let chunks = split_text(&text, &config(60, 0));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], format!("{}. ", "a".repeat(40)));
    }

    #[test]
    fn test_falls_back_to_word_boundary() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        let chunks = split_text(text, &config(20, 0));
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 20, "oversized chunk: {chunk:?}");
            // word-boundary splits never cut inside a word
            assert!(text.contains(chunk.trim_end()));
        }
    }

    #[test]
    fn test_hard_cut_without_boundaries() {
        let text = "x".repeat(1200);
        let chunks = split_text(&text, &config(512, 32));
        // budget is 480; 1200 chars need three windows
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 512));
    }

    #[test]
    fn test_chunk_size_bound_holds() {
        let sentence = "the quick brown fox jumps over the lazy dog. ";
        let text = sentence.repeat(60);
        let chunks = split_text(&text, &config(512, 32));
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 512);
        }
    }

    #[test]
    fn test_overlap_carries_previous_tail() {
        let sentence = "the quick brown fox jumps over the lazy dog. ";
        let text = sentence.repeat(60);
        let overlap = 32;
        let chunks = split_text(&text, &config(512, overlap));
        for pair in chunks.windows(2) {
            let carry = char_tail(&pair[0], overlap);
            assert!(
                pair[1].starts_with(carry),
                "chunk does not start with predecessor tail"
            );
        }
    }

    #[test]
    fn test_deterministic() {
        let text = "one two three. four five six.\n\nseven eight nine. ".repeat(30);
        let first = split_text(&text, &config(512, 32));
        let second = split_text(&text, &config(512, 32));
        assert_eq!(first, second);
    }
}
