//! Token-window chunking for inputs longer than the encoder accepts, and the
//! per-chunk summary length budget.

/// Upper bound on encoder input regardless of what the model config claims.
pub const MAX_ENCODER_TOKENS: usize = 1024;

/// Tokens held back from each window for the special tokens the model adds.
pub const WINDOW_MARGIN: usize = 10;

/// Smallest `max_length` handed to generation.
pub const MIN_GENERATION_BUDGET: usize = 8;

/// Encoder input length for a model advertising `max_position_embeddings`.
#[must_use]
pub fn max_input_len(max_position_embeddings: Option<usize>) -> usize {
    max_position_embeddings
        .unwrap_or(MAX_ENCODER_TOKENS)
        .min(MAX_ENCODER_TOKENS)
}

/// Split `ids` into windows of `max_input_len - 10` tokens.
///
/// Consecutive windows share `min(chunk_overlap, window / 5)` tokens so a
/// sentence cut at a boundary is seen whole by at least one chunk. Input that
/// already fits comes back as a single chunk; empty input yields one empty
/// chunk.
#[must_use]
pub fn chunk_ids(ids: &[u32], max_input_len: usize, chunk_overlap: usize) -> Vec<Vec<u32>> {
    let window = max_input_len.saturating_sub(WINDOW_MARGIN).max(1);
    if ids.len() <= window {
        return vec![ids.to_vec()];
    }

    let overlap = chunk_overlap.min(window / 5);
    let mut chunks = Vec::with_capacity(ids.len() / (window - overlap) + 1);
    let mut start = 0;
    while start < ids.len() {
        let end = (start + window).min(ids.len());
        chunks.push(ids[start..end].to_vec());
        if end == ids.len() {
            break;
        }
        start = end - overlap;
    }
    chunks
}

/// `(max_length, min_length)` for summarizing `token_count` input tokens.
///
/// The summary may not be longer than the input minus two tokens (but never
/// shorter than eight), and `min_length` always stays below `max_length`.
#[must_use]
pub fn dynamic_lengths(
    token_count: usize,
    max_summary_tokens: usize,
    min_summary_tokens: usize,
) -> (usize, usize) {
    let max_len = max_summary_tokens.min(MIN_GENERATION_BUDGET.max(token_count.saturating_sub(2)));
    let min_len = if max_len > 1 {
        min_summary_tokens.min(max_len - 1)
    } else {
        1
    };
    (max_len, min_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: u32) -> Vec<u32> {
        (0..n).collect()
    }

    #[test]
    fn max_input_len_caps_at_1024() {
        assert_eq!(max_input_len(None), 1024);
        assert_eq!(max_input_len(Some(4096)), 1024);
        assert_eq!(max_input_len(Some(512)), 512);
    }

    #[test]
    fn short_input_is_a_single_chunk() {
        let input = ids(1014);
        let chunks = chunk_ids(&input, 1024, 50);
        assert_eq!(chunks, vec![input]);
    }

    #[test]
    fn long_input_overlaps_by_configured_amount() {
        let input = ids(2500);
        let chunks = chunk_ids(&input, 1024, 50);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], (0..1014).collect::<Vec<_>>());
        assert_eq!(chunks[1], (964..1978).collect::<Vec<_>>());
        assert_eq!(chunks[2], (1928..2500).collect::<Vec<_>>());
    }

    #[test]
    fn overlap_is_capped_at_a_fifth_of_the_window() {
        // window = 20, overlap = min(50, 4) = 4
        let input = ids(45);
        let chunks = chunk_ids(&input, 30, 50);

        assert_eq!(chunks[0], (0..20).collect::<Vec<_>>());
        assert_eq!(chunks[1], (16..36).collect::<Vec<_>>());
        assert_eq!(chunks[2], (32..45).collect::<Vec<_>>());
        for pair in chunks.windows(2) {
            let tail = &pair[0][pair[0].len() - 4..];
            assert_eq!(tail, &pair[1][..4]);
        }
    }

    #[test]
    fn chunks_cover_every_token() {
        let input = ids(777);
        let chunks = chunk_ids(&input, 64, 50);
        let mut covered: Vec<u32> = chunks.iter().flatten().copied().collect();
        covered.sort_unstable();
        covered.dedup();
        assert_eq!(covered, input);
        assert_eq!(chunks.last().and_then(|c| c.last()), Some(&776));
    }

    #[test]
    fn empty_input_yields_one_empty_chunk() {
        assert_eq!(chunk_ids(&[], 1024, 50), vec![Vec::<u32>::new()]);
    }

    #[test]
    fn dynamic_lengths_follow_input_size() {
        assert_eq!(dynamic_lengths(1014, 160, 40), (160, 40));
        assert_eq!(dynamic_lengths(100, 160, 40), (98, 40));
        assert_eq!(dynamic_lengths(30, 160, 40), (28, 27));
        assert_eq!(dynamic_lengths(3, 160, 40), (8, 7));
        assert_eq!(dynamic_lengths(0, 160, 40), (8, 7));
    }

    #[test]
    fn dynamic_lengths_respect_tiny_budgets() {
        assert_eq!(dynamic_lengths(500, 1, 40), (1, 1));
        assert_eq!(dynamic_lengths(500, 60, 140), (60, 59));
    }
}
