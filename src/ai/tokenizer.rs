use std::path::Path;

use tokenizers::models::bpe::BPE;
use tokenizers::pre_tokenizers::byte_level::ByteLevel;
use tokenizers::processors::roberta::RobertaProcessing;
use tokenizers::{AddedToken, Tokenizer};
use tracing::debug;

use super::hub::TokenizerFiles;
use crate::errors::SummarizeError;

const BOS_TOKEN: &str = "<s>";
const EOS_TOKEN: &str = "</s>";
const SPECIAL_TOKENS: [&str; 5] = ["<s>", "<pad>", "</s>", "<unk>", "<mask>"];

/// Text <-> token id conversion used by the chunking step and the model.
pub trait TokenCodec: Send + Sync {
    /// Ids for `text` without any special tokens; used for measuring and
    /// chunking.
    fn encode(&self, text: &str) -> Result<Vec<u32>, SummarizeError>;

    /// Ids the encoder actually consumes: special tokens added, truncated to
    /// `max_len`.
    fn encode_for_model(&self, text: &str, max_len: usize) -> Result<Vec<u32>, SummarizeError>;

    /// Text for `ids`, special tokens dropped.
    fn decode(&self, ids: &[u32]) -> Result<String, SummarizeError>;
}

/// A model repo's tokenizer, loaded through the `tokenizers` crate.
pub struct HubTokenizer {
    inner: Tokenizer,
}

impl HubTokenizer {
    pub fn load(files: &TokenizerFiles) -> Result<Self, SummarizeError> {
        match files {
            TokenizerFiles::Json(path) => Self::from_file(path),
            TokenizerFiles::VocabMerges { vocab, merges } => Self::from_vocab_merges(vocab, merges),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, SummarizeError> {
        let inner = Tokenizer::from_file(path).map_err(|e| {
            SummarizeError::TokenizerError(format!("loading {}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), vocab = inner.get_vocab_size(true), "Tokenizer loaded");
        Ok(Self { inner })
    }

    /// Byte-level BPE as used by BART: no prefix space, `<s> ... </s>` around
    /// each encoded sequence.
    pub fn from_vocab_merges(vocab: &Path, merges: &Path) -> Result<Self, SummarizeError> {
        let path_str = |path: &Path| {
            path.to_str().map(str::to_string).ok_or_else(|| {
                SummarizeError::TokenizerError(format!("non UTF-8 path {}", path.display()))
            })
        };
        let bpe = BPE::from_file(&path_str(vocab)?, &path_str(merges)?)
            .build()
            .map_err(|e| {
                SummarizeError::TokenizerError(format!("loading {}: {e}", vocab.display()))
            })?;

        let mut inner = Tokenizer::new(bpe);
        inner.with_pre_tokenizer(Some(ByteLevel::default().add_prefix_space(false)));
        inner.with_decoder(Some(ByteLevel::default()));

        let specials: Vec<AddedToken> = SPECIAL_TOKENS
            .iter()
            .filter(|token| inner.token_to_id(token).is_some())
            .map(|token| AddedToken::from(*token, true))
            .collect();
        inner.add_special_tokens(&specials);

        let id_of = |token: &str| {
            inner.token_to_id(token).ok_or_else(|| {
                SummarizeError::TokenizerError(format!("{} has no {token} token", vocab.display()))
            })
        };
        let bos = id_of(BOS_TOKEN)?;
        let eos = id_of(EOS_TOKEN)?;
        inner.with_post_processor(Some(RobertaProcessing::new(
            (EOS_TOKEN.to_string(), eos),
            (BOS_TOKEN.to_string(), bos),
        )));

        debug!(vocab = %vocab.display(), size = inner.get_vocab_size(true), "BPE tokenizer built");
        Ok(Self { inner })
    }

    fn encode_ids(&self, text: &str, add_special_tokens: bool) -> Result<Vec<u32>, SummarizeError> {
        self.inner
            .encode(text, add_special_tokens)
            .map(|encoding| encoding.get_ids().to_vec())
            .map_err(|e| SummarizeError::TokenizerError(e.to_string()))
    }
}

impl TokenCodec for HubTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>, SummarizeError> {
        self.encode_ids(text, false)
    }

    fn encode_for_model(&self, text: &str, max_len: usize) -> Result<Vec<u32>, SummarizeError> {
        let mut ids = self.encode_ids(text, true)?;
        if ids.len() > max_len && max_len > 0 {
            // Keep the closing special token so the encoder still sees an
            // end-of-sequence marker.
            let last = ids[ids.len() - 1];
            ids.truncate(max_len);
            ids[max_len - 1] = last;
        }
        Ok(ids)
    }

    fn decode(&self, ids: &[u32]) -> Result<String, SummarizeError> {
        self.inner
            .decode(ids, true)
            .map_err(|e| SummarizeError::TokenizerError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn vocab_merges_tokenizer() -> (tempfile::TempDir, HubTokenizer) {
        let dir = tempfile::tempdir().unwrap();
        let vocab = dir.path().join("vocab.json");
        let merges = dir.path().join("merges.txt");
        fs::write(
            &vocab,
            r#"{"<s>": 0, "<pad>": 1, "</s>": 2, "a": 3, "b": 4, "ab": 5}"#,
        )
        .unwrap();
        fs::write(&merges, "#version: 0.2\na b\n").unwrap();

        let tokenizer = HubTokenizer::load(&TokenizerFiles::VocabMerges { vocab, merges }).unwrap();
        (dir, tokenizer)
    }

    #[test]
    fn vocab_and_merges_build_a_bart_tokenizer() {
        let (_dir, tokenizer) = vocab_merges_tokenizer();

        assert_eq!(tokenizer.encode("ab").unwrap(), vec![5]);
        assert_eq!(tokenizer.encode("ba").unwrap(), vec![4, 3]);
        assert_eq!(tokenizer.encode_for_model("ab", 1024).unwrap(), vec![0, 5, 2]);
        assert_eq!(tokenizer.decode(&[0, 5, 2]).unwrap(), "ab");
    }

    #[test]
    fn vocab_without_sequence_markers_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let vocab = dir.path().join("vocab.json");
        let merges = dir.path().join("merges.txt");
        fs::write(&vocab, r#"{"a": 0, "b": 1}"#).unwrap();
        fs::write(&merges, "#version: 0.2\n").unwrap();

        let err = HubTokenizer::from_vocab_merges(&vocab, &merges).err().unwrap();
        assert!(matches!(err, SummarizeError::TokenizerError(ref msg) if msg.contains("<s>")));
    }
}
