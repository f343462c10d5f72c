//! # POS Tagger
//!
//! Atribui uma classe gramatical (tagset do Penn Treebank) a cada token com
//! beam search sobre o classificador MaxEnt. Se o modelo traz um dicionário de
//! tags, palavras conhecidas só podem receber as tags listadas; quando nenhuma
//! delas existe no modelo, todas ficam liberadas.

use std::sync::Arc;

use tracing::debug;

use crate::config::DecoderConfig;
use crate::decoder::{BeamSearch, Sequence, SequenceValidator};
use crate::error::{NlpError, Result};
use crate::features::PosContext;
use crate::maxent::MaxentModel;
use crate::model::{Model, ModelKind, TagDictionary, MAXENT_SECTION, POSTAG_SECTION};

/// Restringe as tags de palavras presentes no dicionário.
pub struct TagDictionaryValidator<'a, S: AsRef<str>> {
    dictionary: Option<&'a TagDictionary>,
    tokens: &'a [S],
    model: &'a MaxentModel,
}

impl<'a, S: AsRef<str>> TagDictionaryValidator<'a, S> {
    pub fn new(dictionary: Option<&'a TagDictionary>, tokens: &'a [S], model: &'a MaxentModel) -> Self {
        Self {
            dictionary,
            tokens,
            model,
        }
    }
}

impl<S: AsRef<str>> SequenceValidator for TagDictionaryValidator<'_, S> {
    fn valid(&self, index: usize, _prior: &[String], outcome: &str) -> bool {
        let Some(dict) = self.dictionary else {
            return true;
        };
        let Some(word) = self.tokens.get(index) else {
            return true;
        };
        match dict.tags(word.as_ref()) {
            Some(tags) if tags.iter().any(|t| self.model.index_of(t).is_some()) => {
                tags.iter().any(|t| t == outcome)
            }
            _ => true,
        }
    }
}

/// POS tagger MaxEnt.
#[derive(Debug, Clone)]
pub struct PosTagger {
    model: Arc<Model>,
    section: &'static str,
    config: DecoderConfig,
    last_probs: Vec<f64>,
}

impl PosTagger {
    pub fn new(model: Arc<Model>, config: DecoderConfig) -> Result<Self> {
        model.expect_kind(ModelKind::PosTagger)?;
        model.maxent(MAXENT_SECTION)?;
        Ok(Self {
            model,
            section: MAXENT_SECTION,
            config,
            last_probs: Vec::new(),
        })
    }

    /// Tagger embutido em um modelo de parser (seção `postag`).
    pub(crate) fn from_parser_model(model: Arc<Model>, config: DecoderConfig) -> Result<Self> {
        model.expect_kind(ModelKind::Parser)?;
        model.maxent(POSTAG_SECTION)?;
        Ok(Self {
            model,
            section: POSTAG_SECTION,
            config,
            last_probs: Vec::new(),
        })
    }

    /// As `k` melhores sequências de tags, melhor primeiro.
    pub fn top_k_sequences<S: AsRef<str>>(&self, tokens: &[S], k: usize) -> Result<Vec<Sequence>> {
        if tokens.is_empty() {
            return Err(NlpError::invalid_input("sequência de tokens vazia"));
        }
        let maxent = self.model.maxent(self.section)?;
        let contexts = PosContext::new(tokens);
        let validator = TagDictionaryValidator::new(self.model.tag_dictionary(), tokens, maxent);
        BeamSearch::new(maxent, self.config).best_sequences(k, tokens.len(), &contexts, &validator)
    }

    /// Tags e probabilidades do caminho escolhido, uma por token.
    pub fn tag_with_probs<S: AsRef<str>>(&self, tokens: &[S]) -> Result<(Vec<String>, Vec<f64>)> {
        if tokens.is_empty() {
            return Err(NlpError::invalid_input("sequência de tokens vazia"));
        }
        let maxent = self.model.maxent(self.section)?;
        let contexts = PosContext::new(tokens);
        let validator = TagDictionaryValidator::new(self.model.tag_dictionary(), tokens, maxent);
        let best = BeamSearch::new(maxent, self.config).best_sequence(tokens.len(), &contexts, &validator)?;
        debug!(tokens = tokens.len(), score = best.score(), "sentença etiquetada");
        Ok(best.into_parts())
    }

    pub fn tag<S: AsRef<str>>(&mut self, tokens: &[S]) -> Result<Vec<String>> {
        let (tags, probs) = self.tag_with_probs(tokens)?;
        self.last_probs = probs;
        Ok(tags)
    }

    /// Probabilidades da última chamada a `tag`, alinhadas por índice.
    pub fn probs(&self) -> &[f64] {
        &self.last_probs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin;

    fn tagger() -> PosTagger {
        PosTagger::new(Arc::new(builtin::pos_model()), DecoderConfig::default()).unwrap()
    }

    #[test]
    fn test_tags_aligned_with_tokens() {
        let tokens = [
            "Most", "large", "cities", "in", "the", "US", "had", "morning", "and", "afternoon",
            "newspapers", ".",
        ];
        let mut tagger = tagger();
        let tags = tagger.tag(&tokens).unwrap();
        assert_eq!(tags.len(), 12);
        assert_eq!(tagger.probs().len(), 12);
        assert_eq!(tags[4], "DT");
        assert_eq!(tags[11], ".");
    }

    #[test]
    fn test_fox_sentence() {
        let tokens = ["The", "quick", "brown", "fox", "jumps", "over", "the", "lazy", "dog", "."];
        let (tags, probs) = tagger().tag_with_probs(&tokens).unwrap();
        assert_eq!(tags, vec!["DT", "JJ", "JJ", "NN", "VBZ", "IN", "DT", "JJ", "NN", "."]);
        assert!(probs.iter().all(|p| *p > 0.0 && *p <= 1.0));
    }

    #[test]
    fn test_unknown_words_use_affixes() {
        let (tags, _) = tagger()
            .tag_with_probs(&["the", "blorfing", "zorks", "quickly"])
            .unwrap();
        assert_eq!(tags, vec!["DT", "VBG", "NNS", "RB"]);
    }

    #[test]
    fn test_top_k_sorted() {
        let seqs = tagger().top_k_sequences(&["the", "run"], 3).unwrap();
        assert!(!seqs.is_empty() && seqs.len() <= 3);
        for pair in seqs.windows(2) {
            assert!(pair[0].score() >= pair[1].score());
        }
    }

    #[test]
    fn test_huge_k_returns_at_most_beam() {
        let seqs = tagger().top_k_sequences(&["the"], 1 << 33).unwrap();
        assert!(!seqs.is_empty());
        assert!(seqs.len() <= DecoderConfig::default().beam_size);
    }

    #[test]
    fn test_dictionary_restricts_tags() {
        let maxent = {
            let mut m = MaxentModel::new(["NN", "VB"]);
            m.set_weight("w=run", "VB", 5.0);
            m
        };
        let mut dict = TagDictionary::default();
        dict.insert("run", ["NN"]);
        let model = Arc::new(Model::new(ModelKind::PosTagger, maxent).with_tag_dictionary(dict));
        let (tags, _) = PosTagger::new(model, DecoderConfig::default())
            .unwrap()
            .tag_with_probs(&["run"])
            .unwrap();
        assert_eq!(tags, vec!["NN"]);
    }

    #[test]
    fn test_empty_input_is_error() {
        let empty: [&str; 0] = [];
        assert!(matches!(tagger().tag(&empty), Err(NlpError::InvalidInput(_))));
    }
}
