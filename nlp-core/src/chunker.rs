//! # Chunker
//!
//! Agrupa tokens etiquetados em sintagmas não recursivos (NP, VP, PP, ...)
//! com rótulos BIO. O beam search só aceita sequências BIO válidas, então
//! `I-X` nunca aparece no início da sentença nem depois de um chunk de outro
//! tipo.

use std::sync::Arc;

use tracing::debug;

use crate::bio::BioValidator;
use crate::config::DecoderConfig;
use crate::decoder::{BeamSearch, Sequence};
use crate::error::{NlpError, Result};
use crate::features::ChunkContext;
use crate::model::{Model, ModelKind, CHUNKER_SECTION, MAXENT_SECTION};
use crate::span::{bio_to_spans, Span};

/// Chunker MaxEnt.
#[derive(Debug, Clone)]
pub struct Chunker {
    model: Arc<Model>,
    section: &'static str,
    config: DecoderConfig,
    last_probs: Vec<f64>,
}

impl Chunker {
    pub fn new(model: Arc<Model>, config: DecoderConfig) -> Result<Self> {
        model.expect_kind(ModelKind::Chunker)?;
        model.maxent(MAXENT_SECTION)?;
        Ok(Self {
            model,
            section: MAXENT_SECTION,
            config,
            last_probs: Vec::new(),
        })
    }

    /// Chunker embutido em um modelo de parser (seção `chunker`).
    pub(crate) fn from_parser_model(model: Arc<Model>, config: DecoderConfig) -> Result<Self> {
        model.expect_kind(ModelKind::Parser)?;
        model.maxent(CHUNKER_SECTION)?;
        Ok(Self {
            model,
            section: CHUNKER_SECTION,
            config,
            last_probs: Vec::new(),
        })
    }

    fn check_input<S: AsRef<str>, T: AsRef<str>>(tokens: &[S], tags: &[T]) -> Result<()> {
        if tokens.len() != tags.len() {
            return Err(NlpError::invalid_input(format!(
                "{} tokens para {} tags",
                tokens.len(),
                tags.len()
            )));
        }
        if tokens.is_empty() {
            return Err(NlpError::invalid_input("sequência de tokens vazia"));
        }
        Ok(())
    }

    /// As `k` melhores sequências de rótulos, melhor primeiro.
    pub fn top_k_sequences<S: AsRef<str>, T: AsRef<str>>(
        &self,
        tokens: &[S],
        tags: &[T],
        k: usize,
    ) -> Result<Vec<Sequence>> {
        Self::check_input(tokens, tags)?;
        let maxent = self.model.maxent(self.section)?;
        let contexts = ChunkContext::new(tokens, tags);
        BeamSearch::new(maxent, self.config).best_sequences(k, tokens.len(), &contexts, &BioValidator)
    }

    /// Rótulos BIO e probabilidades, um por token.
    pub fn chunk_with_probs<S: AsRef<str>, T: AsRef<str>>(
        &self,
        tokens: &[S],
        tags: &[T],
    ) -> Result<(Vec<String>, Vec<f64>)> {
        Self::check_input(tokens, tags)?;
        let maxent = self.model.maxent(self.section)?;
        let contexts = ChunkContext::new(tokens, tags);
        let best = BeamSearch::new(maxent, self.config).best_sequence(tokens.len(), &contexts, &BioValidator)?;
        debug!(tokens = tokens.len(), score = best.score(), "sentença segmentada em chunks");
        Ok(best.into_parts())
    }

    pub fn chunk<S: AsRef<str>, T: AsRef<str>>(&mut self, tokens: &[S], tags: &[T]) -> Result<Vec<String>> {
        let (labels, probs) = self.chunk_with_probs(tokens, tags)?;
        self.last_probs = probs;
        Ok(labels)
    }

    /// Chunks como spans de índices de token, rotulados pelo tipo.
    pub fn chunk_as_spans<S: AsRef<str>, T: AsRef<str>>(&self, tokens: &[S], tags: &[T]) -> Result<Vec<Span>> {
        let (labels, probs) = self.chunk_with_probs(tokens, tags)?;
        Ok(bio_to_spans(&labels, Some(probs.as_slice())))
    }

    pub fn probs(&self) -> &[f64] {
        &self.last_probs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bio::is_valid_sequence;
    use crate::builtin;

    const TOKENS: [&str; 28] = [
        "Rockwell", "International", "Corp.", "'s", "Tulsa", "unit", "said", "it", "signed", "a",
        "tentative", "agreement", "extending", "its", "contract", "with", "Boeing", "Co.", "to",
        "provide", "structural", "parts", "for", "Boeing", "'s", "747", "jetliners", ".",
    ];
    const TAGS: [&str; 28] = [
        "NNP", "NNP", "NNP", "POS", "NNP", "NN", "VBD", "PRP", "VBD", "DT", "JJ", "NN", "VBG",
        "PRP$", "NN", "IN", "NNP", "NNP", "TO", "VB", "JJ", "NNS", "IN", "NNP", "POS", "CD", "NNS",
        ".",
    ];

    fn chunker() -> Chunker {
        Chunker::new(Arc::new(builtin::chunker_model()), DecoderConfig::default()).unwrap()
    }

    #[test]
    fn test_rockwell_sentence() {
        let mut chunker = chunker();
        let labels = chunker.chunk(&TOKENS, &TAGS).unwrap();
        assert_eq!(labels.len(), 28);
        assert_eq!(chunker.probs().len(), 28);
        assert!(is_valid_sequence(&labels));
        assert_eq!(labels[0], "B-NP");
        assert_eq!(labels[1], "I-NP");
        assert_eq!(labels[6], "B-VP");
        assert_eq!(labels[15], "B-PP");
        assert_eq!(labels[27], "O");
    }

    #[test]
    fn test_spans_cover_chunks() {
        let spans = chunker()
            .chunk_as_spans(&["the", "dog", "runs"], &["DT", "NN", "VBZ"])
            .unwrap();
        assert_eq!(spans.len(), 2);
        assert_eq!((spans[0].start, spans[0].end), (0, 2));
        assert_eq!(spans[0].label(), Some("NP"));
        assert_eq!(spans[1].label(), Some("VP"));
    }

    #[test]
    fn test_top_k_all_valid() {
        let seqs = chunker().top_k_sequences(&TOKENS[..6], &TAGS[..6], 5).unwrap();
        assert_eq!(seqs.len(), 5);
        for seq in &seqs {
            assert!(is_valid_sequence(seq.outcomes()));
        }
    }

    #[test]
    fn test_length_mismatch_is_error() {
        let err = chunker().chunk(&["a", "b"], &["DT"]).unwrap_err();
        assert!(matches!(err, NlpError::InvalidInput(_)));
    }

    #[test]
    fn test_wrong_model_kind() {
        let err = Chunker::new(Arc::new(builtin::pos_model()), DecoderConfig::default()).unwrap_err();
        assert!(matches!(err, NlpError::UnsupportedModelType(_)));
    }
}
