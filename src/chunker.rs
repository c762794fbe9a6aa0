//! Recursive boundary-seeking text splitter.
//!
//! Splits document content into spans no longer than a configured character
//! budget, preferring to cut at paragraph, line, sentence, and word
//! boundaries (in that order) before falling back to a hard character cut.
//! Consecutive spans from the same document share an overlap region of at
//! most the configured size so no semantic boundary is lost to a hard cut.

/// Boundary preference, strongest first. A hard character cut is the
/// fallback once all of these are exhausted.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

/// Split `text` into spans of at most `chunk_size` characters with up to
/// `overlap` characters shared between consecutive spans.
///
/// Lengths are measured in characters, not bytes. Empty and
/// whitespace-only input produces no spans. `overlap` must be smaller than
/// `chunk_size` (enforced by config validation).
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let mut units = Vec::new();
    atomize(trimmed, chunk_size, &SEPARATORS, &mut units);
    merge_units(units, chunk_size, overlap)
}

/// Break text into units no longer than `chunk_size`, trying each separator
/// in preference order and hard-cutting only when none remains.
fn atomize(text: &str, chunk_size: usize, seps: &[&str], out: &mut Vec<String>) {
    if char_len(text) <= chunk_size {
        if !text.is_empty() {
            out.push(text.to_string());
        }
        return;
    }

    match seps.first() {
        Some(sep) if text.contains(sep) => {
            for piece in split_keeping_separator(text, sep) {
                atomize(&piece, chunk_size, &seps[1..], out);
            }
        }
        Some(_) => atomize(text, chunk_size, &seps[1..], out),
        None => {
            // No boundary left to respect; cut at the character budget.
            let chars: Vec<char> = text.chars().collect();
            for window in chars.chunks(chunk_size) {
                out.push(window.iter().collect());
            }
        }
    }
}

/// Split on `sep`, keeping the separator attached to the preceding piece so
/// concatenating the pieces reconstructs the input.
fn split_keeping_separator(text: &str, sep: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut rest = text;
    while let Some(pos) = rest.find(sep) {
        let end = pos + sep.len();
        pieces.push(rest[..end].to_string());
        rest = &rest[end..];
    }
    if !rest.is_empty() {
        pieces.push(rest.to_string());
    }
    pieces
}

/// Greedily pack units into spans up to `chunk_size`, seeding each new span
/// with the overlap tail of the one just flushed.
fn merge_units(units: Vec<String>, chunk_size: usize, overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for unit in units {
        let unit_len = char_len(&unit);
        if !current.is_empty() && char_len(&current) + unit_len > chunk_size {
            let tail = overlap_tail(&current, overlap);
            flush(&mut chunks, &mut current);
            if char_len(&tail) + unit_len <= chunk_size {
                current = tail;
            }
        }
        current.push_str(&unit);
    }
    flush(&mut chunks, &mut current);

    chunks
}

fn flush(chunks: &mut Vec<String>, current: &mut String) {
    let span = std::mem::take(current);
    let span = span.trim();
    if !span.is_empty() {
        chunks.push(span.to_string());
    }
}

/// The last `overlap` characters of a span, advanced to the next word
/// boundary so the seed never starts mid-word. May return fewer than
/// `overlap` characters; never more.
fn overlap_tail(span: &str, overlap: usize) -> String {
    if overlap == 0 {
        return String::new();
    }
    let chars: Vec<char> = span.chars().collect();
    let start = chars.len().saturating_sub(overlap);
    let tail: String = chars[start..].iter().collect();

    if start > 0 && !chars[start - 1].is_whitespace() {
        match tail.find(char::is_whitespace) {
            Some(pos) => tail[pos..].trim_start().to_string(),
            None => String::new(),
        }
    } else {
        tail.trim_start().to_string()
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_single_chunk() {
        let chunks = split_text("Employees get 20 days leave.", 500, 50);
        assert_eq!(chunks, vec!["Employees get 20 days leave.".to_string()]);
    }

    #[test]
    fn empty_text_produces_no_chunks() {
        assert!(split_text("", 500, 50).is_empty());
        assert!(split_text("   \n\n  ", 500, 50).is_empty());
    }

    #[test]
    fn chunks_respect_size_budget() {
        let text = (0..40)
            .map(|i| format!("Paragraph number {} talks about leave policy details.", i))
            .collect::<Vec<_>>()
            .join("\n\n");
        let chunks = split_text(&text, 500, 50);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(
                chunk.chars().count() <= 500,
                "chunk exceeds budget: {} chars",
                chunk.chars().count()
            );
        }
    }

    #[test]
    fn prefers_paragraph_boundaries() {
        let para_a = "a".repeat(300);
        let para_b = "b".repeat(300);
        let text = format!("{}\n\n{}", para_a, para_b);
        let chunks = split_text(&text, 500, 50);
        // Neither paragraph fits alongside the other, so the paragraph
        // boundary becomes the cut point.
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].starts_with('a'));
        assert!(chunks[1].starts_with('b'));
    }

    #[test]
    fn consecutive_chunks_share_bounded_overlap() {
        let text = (0..60)
            .map(|i| format!("Sentence number {} in a long running document.", i))
            .collect::<Vec<_>>()
            .join(" ");
        let overlap = 50;
        let chunks = split_text(&text, 200, overlap);
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let prev: Vec<char> = pair[0].chars().collect();
            let tail_start = prev.len().saturating_sub(overlap);
            let tail: String = prev[tail_start..].iter().collect();
            // Some suffix of the previous chunk (at most `overlap` chars,
            // trimmed to a word boundary) opens the next chunk.
            let shares = (0..tail.len())
                .filter(|i| tail.is_char_boundary(*i))
                .any(|i| pair[1].starts_with(tail[i..].trim_start()) && !tail[i..].trim().is_empty());
            assert!(shares, "no overlap between {:?} and {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn unbroken_run_is_hard_cut() {
        let text = "x".repeat(1200);
        let chunks = split_text(&text, 500, 50);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 500));
        let total: usize = chunks.iter().map(|c| c.chars().count()).sum();
        assert_eq!(total, 1200);
    }

    #[test]
    fn all_content_is_covered_in_order() {
        let text = (0..30)
            .map(|i| format!("Item {} covers one distinct topic.", i))
            .collect::<Vec<_>>()
            .join("\n");
        let chunks = split_text(&text, 120, 20);
        for i in 0..30 {
            let needle = format!("Item {} ", i);
            assert!(
                chunks.iter().any(|c| c.contains(&needle)),
                "missing {:?}",
                needle
            );
        }
        // First occurrences appear in input order.
        let positions: Vec<usize> = (0..30)
            .map(|i| {
                chunks
                    .iter()
                    .position(|c| c.contains(&format!("Item {} ", i)))
                    .unwrap()
            })
            .collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn deterministic() {
        let text = "Alpha.\n\nBeta gamma delta. Epsilon zeta.\n\nEta theta.";
        assert_eq!(split_text(text, 30, 10), split_text(text, 30, 10));
    }
}
