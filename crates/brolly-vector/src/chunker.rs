//! Document chunking.
//!
//! Splits a document body into overlapping character windows and assigns each
//! window a coarse clause category by keyword heuristics. Chunk offsets are
//! character offsets, so the same arithmetic holds for non-ASCII text.

use brolly_core::{Chunk, ClauseCategory};

/// Cues checked in priority order; exclusion wins over coverage so that
/// "not cover" is never misread as a coverage clause.
const EXCLUSION_CUES: [&str; 3] = ["exclude", "not cover", "exception"];
const COVERAGE_CUES: [&str; 3] = ["cover", "coverage", "includes"];
const LIMIT_CUES: [&str; 3] = ["limit", "maximum", "up to"];

/// Classify a chunk's clause category from its text.
pub fn classify_clause(text: &str) -> ClauseCategory {
    let lower = text.to_lowercase();
    if EXCLUSION_CUES.iter().any(|cue| lower.contains(cue)) {
        ClauseCategory::Exclusion
    } else if COVERAGE_CUES.iter().any(|cue| lower.contains(cue)) {
        ClauseCategory::Coverage
    } else if LIMIT_CUES.iter().any(|cue| lower.contains(cue)) {
        ClauseCategory::Limit
    } else {
        ClauseCategory::General
    }
}

/// Split `text` into overlapping windows of `chunk_size` characters.
///
/// A body no longer than one window yields a single chunk spanning all of it;
/// an empty body yields no chunks. Otherwise each window starts `chunk_size -
/// overlap` characters after the previous one and the final window is clipped
/// to the end of the text. With a nonzero overlap this emits a short tail
/// chunk covering the last `overlap` characters after the clipped window; the
/// chunk count stays within `ceil(len / (chunk_size - overlap)) + 1`.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    if text.is_empty() {
        return Vec::new();
    }
    // A zero-size window would never advance.
    let chunk_size = chunk_size.max(1);

    // Byte offset of every character boundary, plus the end of the string,
    // so window arithmetic runs on character counts.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let len = bounds.len() - 1;

    let make_chunk = |start: usize, end: usize| {
        let body = text[bounds[start]..bounds[end]].to_string();
        let clause_category = classify_clause(&body);
        Chunk {
            text: body,
            start_offset: start,
            end_offset: end,
            clause_category,
        }
    };

    if len <= chunk_size {
        return vec![make_chunk(0, len)];
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;
    while start < len {
        let end = usize::min(start + chunk_size, len);
        chunks.push(make_chunk(start, end));
        // Step back by the overlap; if that fails to advance past this
        // window's start (overlap >= chunk_size), jump to its end instead.
        let mut next = end.saturating_sub(overlap);
        if next <= start {
            next = end;
        }
        start = next;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(chunks: &[Chunk]) -> Vec<(usize, usize)> {
        chunks
            .iter()
            .map(|c| (c.start_offset, c.end_offset))
            .collect()
    }

    // ---- window structure ----

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk_text("short body", 500, 50);
        assert_eq!(spans(&chunks), vec![(0, 10)]);
        assert_eq!(chunks[0].text, "short body");
    }

    #[test]
    fn test_exact_window_single_chunk() {
        let text = "a".repeat(500);
        let chunks = chunk_text(&text, 500, 50);
        assert_eq!(spans(&chunks), vec![(0, 500)]);
    }

    #[test]
    fn test_empty_text_no_chunks() {
        assert!(chunk_text("", 500, 50).is_empty());
    }

    #[test]
    fn test_overlapping_windows() {
        let text = "x".repeat(1200);
        let chunks = chunk_text(&text, 500, 50);
        assert_eq!(
            spans(&chunks),
            vec![(0, 500), (450, 950), (900, 1200), (1150, 1200)]
        );
    }

    #[test]
    fn test_zero_overlap_partitions_exactly() {
        let text = "x".repeat(1200);
        let chunks = chunk_text(&text, 500, 0);
        assert_eq!(spans(&chunks), vec![(0, 500), (500, 1000), (1000, 1200)]);
    }

    #[test]
    fn test_overlap_larger_than_window_still_advances() {
        let text = "x".repeat(20);
        let chunks = chunk_text(&text, 5, 10);
        assert_eq!(spans(&chunks), vec![(0, 5), (5, 10), (10, 15), (15, 20)]);
    }

    #[test]
    fn test_coverage_and_overlap_amount() {
        let text = "y".repeat(2350);
        let chunk_size = 500;
        let overlap = 50;
        let chunks = chunk_text(&text, chunk_size, overlap);

        // Spans cover every character position.
        let mut covered = vec![false; 2350];
        for c in &chunks {
            assert!(c.start_offset < c.end_offset);
            assert!(c.end_offset <= 2350);
            for flag in &mut covered[c.start_offset..c.end_offset] {
                *flag = true;
            }
        }
        assert!(covered.iter().all(|&f| f));

        // Consecutive full windows share exactly `overlap` characters.
        for pair in chunks.windows(2) {
            if pair[1].end_offset - pair[1].start_offset == chunk_size {
                assert_eq!(pair[0].end_offset - pair[1].start_offset, overlap);
            }
        }
    }

    #[test]
    fn test_termination_bound() {
        let text = "z".repeat(10_000);
        let chunks = chunk_text(&text, 500, 50);
        let bound = 10_000usize.div_ceil(500 - 50) + 1;
        assert!(chunks.len() <= bound, "{} chunks", chunks.len());
    }

    #[test]
    fn test_char_offsets_for_multibyte_text() {
        // 30 characters, several of them multi-byte.
        let text = "héllo wörld émoji 😀 ends hére!";
        assert_eq!(text.chars().count(), 30);
        let chunks = chunk_text(text, 12, 3);
        for c in &chunks {
            assert_eq!(c.text.chars().count(), c.end_offset - c.start_offset);
        }
        // First window starts at the beginning and is full-size.
        assert_eq!(chunks[0].start_offset, 0);
        assert_eq!(chunks[0].text.chars().count(), 12);
    }

    // ---- clause classification ----

    #[test]
    fn test_classify_exclusion() {
        assert_eq!(
            classify_clause("This policy excludes flood damage."),
            ClauseCategory::Exclusion
        );
        assert_eq!(
            classify_clause("We do NOT cover pre-existing conditions."),
            ClauseCategory::Exclusion
        );
        assert_eq!(
            classify_clause("An exception applies to racing events."),
            ClauseCategory::Exclusion
        );
    }

    #[test]
    fn test_classify_coverage() {
        assert_eq!(
            classify_clause("This plan covers hospitalization costs."),
            ClauseCategory::Coverage
        );
        assert_eq!(
            classify_clause("Coverage includes ambulance transport."),
            ClauseCategory::Coverage
        );
    }

    #[test]
    fn test_classify_limit() {
        assert_eq!(
            classify_clause("The annual benefit is limited in scope."),
            ClauseCategory::Limit
        );
        assert_eq!(
            classify_clause("We pay a maximum of $5,000 per claim."),
            ClauseCategory::Limit
        );
        assert_eq!(
            classify_clause("Reimbursement of up to $200 per day."),
            ClauseCategory::Limit
        );
    }

    #[test]
    fn test_classify_general() {
        assert_eq!(
            classify_clause("Please read this document carefully."),
            ClauseCategory::General
        );
    }

    #[test]
    fn test_exclusion_wins_over_coverage() {
        // Contains both "not cover" and "cover"; exclusion is checked first.
        assert_eq!(
            classify_clause("This section lists what we do not cover."),
            ClauseCategory::Exclusion
        );
    }

    #[test]
    fn test_chunks_carry_their_own_classification() {
        let text = format!(
            "{} The policy covers theft. {} Claims are excluded after 90 days.",
            "a".repeat(490),
            "b".repeat(480),
        );
        for c in chunk_text(&text, 500, 50) {
            assert_eq!(c.clause_category, classify_clause(&c.text));
        }
    }
}
