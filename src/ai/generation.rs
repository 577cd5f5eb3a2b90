//! Deterministic sequence generation: beam search (greedy when one beam)
//! with the logits processors a summarization checkpoint expects.

use std::cmp::Ordering;

use crate::errors::SummarizeError;

/// Produces next-token logits for a batch of decoder prefixes.
///
/// All prefixes in one call have the same length.
pub trait StepDecoder {
    fn next_token_logits(&mut self, prefixes: &[Vec<u32>]) -> Result<Vec<Vec<f32>>, SummarizeError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub num_beams: usize,
    pub length_penalty: f32,
    pub no_repeat_ngram_size: usize,
    pub early_stopping: bool,
    pub decoder_start_token_id: u32,
    pub eos_token_id: u32,
    pub forced_bos_token_id: Option<u32>,
    pub forced_eos_token_id: Option<u32>,
    /// Maximum decoder length, counting the decoder start token.
    pub max_length: usize,
    /// EOS is suppressed until the sequence reaches this length.
    pub min_length: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            num_beams: 1,
            length_penalty: 1.0,
            no_repeat_ngram_size: 0,
            early_stopping: false,
            decoder_start_token_id: 2,
            eos_token_id: 2,
            forced_bos_token_id: None,
            forced_eos_token_id: None,
            max_length: 20,
            min_length: 0,
        }
    }
}

#[derive(Debug, Clone)]
struct Hypothesis {
    tokens: Vec<u32>,
    score: f32,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    beam: usize,
    token: u32,
    score: f32,
}

/// Finished hypotheses, keeping only the `capacity` best by
/// length-normalized score. Lengths count generated tokens only: neither the
/// decoder start token nor the closing EOS.
struct FinishedBeams {
    capacity: usize,
    length_penalty: f32,
    entries: Vec<(f32, Vec<u32>)>,
}

impl FinishedBeams {
    fn new(capacity: usize, length_penalty: f32) -> Self {
        Self {
            capacity,
            length_penalty,
            entries: Vec::with_capacity(capacity + 1),
        }
    }

    fn normalized(&self, score: f32, generated_len: usize) -> f32 {
        score / (generated_len.max(1) as f32).powf(self.length_penalty)
    }

    fn push(&mut self, tokens: Vec<u32>, score: f32, generated_len: usize) {
        let normalized = self.normalized(score, generated_len);
        self.entries.push((normalized, tokens));
        self.entries.sort_by(|a, b| b.0.total_cmp(&a.0));
        self.entries.truncate(self.capacity);
    }

    fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    fn worst_score(&self) -> Option<f32> {
        self.entries.last().map(|(s, _)| *s)
    }

    fn into_best(self) -> Option<Vec<u32>> {
        self.entries.into_iter().next().map(|(_, tokens)| tokens)
    }
}

/// Run beam search from the decoder start token and return the best
/// sequence, decoder start token included.
pub fn beam_search<D>(decoder: &mut D, config: &GenerationConfig) -> Result<Vec<u32>, SummarizeError>
where
    D: StepDecoder + ?Sized,
{
    let num_beams = config.num_beams.max(1);
    let max_length = config.max_length.max(2);
    let eos = config.eos_token_id;

    let mut beams = vec![Hypothesis {
        tokens: vec![config.decoder_start_token_id],
        score: 0.0,
    }];
    let mut finished = FinishedBeams::new(num_beams, config.length_penalty);
    let mut done = false;

    while beams[0].tokens.len() < max_length {
        let cur_len = beams[0].tokens.len();
        let prefixes: Vec<Vec<u32>> = beams.iter().map(|b| b.tokens.clone()).collect();
        let logits = decoder.next_token_logits(&prefixes)?;
        if logits.len() != beams.len() {
            return Err(SummarizeError::ModelError(format!(
                "decoder returned {} rows for {} beams",
                logits.len(),
                beams.len()
            )));
        }

        let mut candidates = Vec::with_capacity(beams.len() * 2 * num_beams);
        for (beam_idx, (beam, row)) in beams.iter().zip(logits).enumerate() {
            let mut scores = log_softmax(&row);
            process_scores(&mut scores, &beam.tokens, cur_len, max_length, config);
            candidates.extend(top_k(&scores, 2 * num_beams).into_iter().map(|(token, lp)| {
                Candidate {
                    beam: beam_idx,
                    token,
                    score: beam.score + lp,
                }
            }));
        }
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.token.cmp(&b.token)));

        let mut next = Vec::with_capacity(num_beams);
        for (rank, candidate) in candidates.into_iter().enumerate() {
            let mut tokens = beams[candidate.beam].tokens.clone();
            tokens.push(candidate.token);
            if candidate.token == eos {
                if rank < num_beams {
                    // start token and EOS excluded
                    let generated_len = tokens.len() - 2;
                    finished.push(tokens, candidate.score, generated_len);
                }
            } else {
                next.push(Hypothesis {
                    tokens,
                    score: candidate.score,
                });
            }
            if next.len() == num_beams {
                break;
            }
        }

        if next.is_empty() {
            done = true;
            break;
        }
        beams = next;

        if finished.is_full() {
            if config.early_stopping {
                done = true;
                break;
            }
            let best_running = finished.normalized(beams[0].score, beams[0].tokens.len() - 1);
            if finished.worst_score().is_some_and(|worst| worst >= best_running) {
                done = true;
                break;
            }
        }
    }

    if !done {
        for beam in beams {
            let generated_len = beam.tokens.len() - 1;
            finished.push(beam.tokens, beam.score, generated_len);
        }
    }

    finished
        .into_best()
        .ok_or_else(|| SummarizeError::ModelError("generation produced no sequence".to_string()))
}

/// Apply, in order: no-repeat n-gram, minimum length, forced BOS, forced EOS.
fn process_scores(
    scores: &mut [f32],
    tokens: &[u32],
    cur_len: usize,
    max_length: usize,
    config: &GenerationConfig,
) {
    for banned in banned_ngram_tokens(tokens, config.no_repeat_ngram_size) {
        if let Some(s) = scores.get_mut(banned as usize) {
            *s = f32::NEG_INFINITY;
        }
    }

    if cur_len < config.min_length
        && let Some(s) = scores.get_mut(config.eos_token_id as usize)
    {
        *s = f32::NEG_INFINITY;
    }

    if cur_len == 1
        && let Some(bos) = config.forced_bos_token_id
    {
        force_token(scores, bos);
    }

    if cur_len == max_length - 1
        && let Some(eos) = config.forced_eos_token_id
    {
        force_token(scores, eos);
    }
}

fn force_token(scores: &mut [f32], token: u32) {
    let token = token as usize;
    if token >= scores.len() {
        return;
    }
    for (idx, s) in scores.iter_mut().enumerate() {
        *s = if idx == token { 0.0 } else { f32::NEG_INFINITY };
    }
}

/// Tokens that would complete an n-gram already present in `tokens`.
#[must_use]
pub fn banned_ngram_tokens(tokens: &[u32], ngram_size: usize) -> Vec<u32> {
    if ngram_size == 0 || tokens.len() + 1 < ngram_size {
        return Vec::new();
    }
    let prefix = &tokens[tokens.len() + 1 - ngram_size..];
    tokens
        .windows(ngram_size)
        .filter(|window| &window[..ngram_size - 1] == prefix)
        .map(|window| window[ngram_size - 1])
        .collect()
}

#[must_use]
pub fn log_softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        return logits.to_vec();
    }
    let sum: f32 = logits.iter().map(|&x| (x - max).exp()).sum();
    let log_norm = sum.ln() + max;
    logits.iter().map(|&x| x - log_norm).collect()
}

/// The `k` best finite scores, best first; ties go to the lower token id.
fn top_k(scores: &[f32], k: usize) -> Vec<(u32, f32)> {
    let by_score = |a: &(u32, f32), b: &(u32, f32)| -> Ordering {
        b.1.total_cmp(&a.1).then(a.0.cmp(&b.0))
    };

    let mut indexed: Vec<(u32, f32)> = scores
        .iter()
        .enumerate()
        .filter(|(_, s)| s.is_finite())
        .map(|(i, &s)| (i as u32, s))
        .collect();
    if k == 0 {
        return Vec::new();
    }
    if indexed.len() > k {
        indexed.select_nth_unstable_by(k - 1, by_score);
        indexed.truncate(k);
    }
    indexed.sort_unstable_by(by_score);
    indexed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const EOS: u32 = 2;
    const VOCAB: usize = 6;

    /// Probabilities keyed by prefix; unknown prefixes strongly prefer EOS.
    struct TableDecoder {
        table: HashMap<Vec<u32>, [f32; VOCAB]>,
        calls: usize,
    }

    impl TableDecoder {
        fn new(entries: Vec<(Vec<u32>, [f32; VOCAB])>) -> Self {
            Self {
                table: entries.into_iter().collect(),
                calls: 0,
            }
        }
    }

    impl StepDecoder for TableDecoder {
        fn next_token_logits(
            &mut self,
            prefixes: &[Vec<u32>],
        ) -> Result<Vec<Vec<f32>>, SummarizeError> {
            self.calls += 1;
            Ok(prefixes
                .iter()
                .map(|p| {
                    let probs = self
                        .table
                        .get(p)
                        .copied()
                        .unwrap_or([0.02, 0.02, 0.9, 0.02, 0.02, 0.02]);
                    probs.iter().map(|p| p.ln()).collect()
                })
                .collect())
        }
    }

    /// Fixed preference order regardless of prefix.
    struct FixedDecoder(Vec<f32>);

    impl StepDecoder for FixedDecoder {
        fn next_token_logits(
            &mut self,
            prefixes: &[Vec<u32>],
        ) -> Result<Vec<Vec<f32>>, SummarizeError> {
            Ok(prefixes.iter().map(|_| self.0.clone()).collect())
        }
    }

    fn branching_table() -> TableDecoder {
        TableDecoder::new(vec![
            (vec![2], [0.02, 0.02, 0.02, 0.5, 0.4, 0.04]),
            (vec![2, 3], [0.1, 0.1, 0.35, 0.15, 0.15, 0.15]),
            (vec![2, 4], [0.02, 0.02, 0.9, 0.02, 0.02, 0.02]),
        ])
    }

    #[test]
    fn greedy_follows_the_locally_best_token() {
        let mut decoder = branching_table();
        let config = GenerationConfig {
            num_beams: 1,
            early_stopping: true,
            max_length: 10,
            ..GenerationConfig::default()
        };
        assert_eq!(beam_search(&mut decoder, &config).unwrap(), vec![2, 3, 2]);
    }

    #[test]
    fn beams_find_the_more_probable_sequence() {
        let mut decoder = branching_table();
        let config = GenerationConfig {
            num_beams: 2,
            early_stopping: true,
            max_length: 10,
            ..GenerationConfig::default()
        };
        assert_eq!(beam_search(&mut decoder, &config).unwrap(), vec![2, 4, 2]);
        assert_eq!(decoder.calls, 2);
    }

    #[test]
    fn min_length_suppresses_early_eos() {
        let mut decoder = FixedDecoder(vec![0.0, 0.0, 5.0, 0.0, 3.0, 0.0]);
        let config = GenerationConfig {
            min_length: 4,
            max_length: 10,
            ..GenerationConfig::default()
        };
        assert_eq!(beam_search(&mut decoder, &config).unwrap(), vec![2, 4, 4, 4, 2]);
    }

    #[test]
    fn forced_bos_and_eos_bracket_the_output() {
        let mut decoder = FixedDecoder(vec![0.0, 0.0, -10.0, 0.0, 3.0, 0.0]);
        let config = GenerationConfig {
            forced_bos_token_id: Some(0),
            forced_eos_token_id: Some(EOS),
            max_length: 5,
            ..GenerationConfig::default()
        };
        assert_eq!(beam_search(&mut decoder, &config).unwrap(), vec![2, 0, 4, 4, 2]);
    }

    #[test]
    fn no_repeat_ngram_blocks_repeated_bigrams() {
        let mut decoder = FixedDecoder(vec![0.0, 0.0, -10.0, 0.0, 5.0, 4.0]);
        let config = GenerationConfig {
            no_repeat_ngram_size: 2,
            forced_eos_token_id: Some(EOS),
            max_length: 6,
            ..GenerationConfig::default()
        };
        assert_eq!(
            beam_search(&mut decoder, &config).unwrap(),
            vec![2, 4, 4, 5, 4, 2]
        );
    }

    #[test]
    fn stops_at_max_length_without_forced_eos() {
        let mut decoder = FixedDecoder(vec![0.0, 0.0, -10.0, 0.0, 3.0, 0.0]);
        let config = GenerationConfig {
            max_length: 4,
            ..GenerationConfig::default()
        };
        assert_eq!(beam_search(&mut decoder, &config).unwrap(), vec![2, 4, 4, 4]);
    }

    #[test]
    fn length_normalization_ignores_start_and_eos_tokens() {
        let mut finished = FinishedBeams::new(2, 1.0);
        // one generated token at -1.0 per token
        finished.push(vec![2, 3, 2], -1.0, 1);
        // two generated tokens at -0.8 per token
        finished.push(vec![2, 3, 4, 2], -1.6, 2);
        assert_eq!(finished.worst_score(), Some(-1.0));
        assert_eq!(finished.into_best(), Some(vec![2, 3, 4, 2]));
    }

    #[test]
    fn longer_beams_win_when_per_token_score_is_higher() {
        // [2, 5, 2] ends at ln(0.6) + ln(0.6); [2, 3, 4, 2] reaches
        // ln(0.3) + ln(0.9) + ln(0.9) but over two generated tokens
        let mut decoder = TableDecoder::new(vec![
            (vec![2], [0.02, 0.02, 0.02, 0.3, 0.04, 0.6]),
            (vec![2, 5], [0.1, 0.1, 0.6, 0.1, 0.05, 0.05]),
            (vec![2, 3], [0.02, 0.02, 0.02, 0.02, 0.9, 0.02]),
            (vec![2, 3, 4], [0.02, 0.02, 0.9, 0.02, 0.02, 0.02]),
        ]);
        let config = GenerationConfig {
            num_beams: 2,
            max_length: 10,
            ..GenerationConfig::default()
        };
        assert_eq!(beam_search(&mut decoder, &config).unwrap(), vec![2, 3, 4, 2]);
    }

    #[test]
    fn banned_ngrams_match_the_trailing_prefix() {
        assert_eq!(banned_ngram_tokens(&[2, 7, 8, 9, 7, 8], 3), vec![9]);
        assert_eq!(banned_ngram_tokens(&[2, 7, 8], 3), Vec::<u32>::new());
        assert_eq!(banned_ngram_tokens(&[2, 7], 3), Vec::<u32>::new());
        assert_eq!(banned_ngram_tokens(&[2, 7, 7], 1), vec![2, 7, 7]);
        assert!(banned_ngram_tokens(&[2, 7, 8, 7], 0).is_empty());
    }

    #[test]
    fn log_softmax_normalizes() {
        let out = log_softmax(&[1.0, 2.0, 3.0]);
        let total: f32 = out.iter().map(|x| x.exp()).sum();
        assert!((total - 1.0).abs() < 1e-5);
        assert!(out[2] > out[1] && out[1] > out[0]);
    }

    #[test]
    fn top_k_breaks_ties_by_token_id() {
        let picked = top_k(&[1.0, 3.0, f32::NEG_INFINITY, 3.0, 0.5], 3);
        assert_eq!(picked, vec![(1, 3.0), (3, 3.0), (0, 1.0)]);
    }
}
