//! # Detector de Sentenças
//!
//! Percorre o texto procurando caracteres candidatos a fim de sentença
//! (`.`, `!`, `?` por padrão) e pergunta ao classificador se cada um é uma
//! fronteira (`s`) ou não (`n`). Uma sequência de candidatos consecutivos
//! (`?!`, `...`) conta como um único candidato, avaliado no último caractere.
//!
//! Uma sentença aceita termina no primeiro espaço depois do candidato, então
//! aspas e parênteses de fechamento ficam com ela.
//!
//! As sentenças devolvidas têm os espaços das pontas removidos; trechos vazios
//! são descartados. O texto que sobra após a última fronteira vira uma sentença
//! com probabilidade 1.

use std::sync::Arc;

use tracing::debug;

use crate::config::SentenceConfig;
use crate::error::{NlpError, Result};
use crate::features::sentence_context;
use crate::model::{Model, ModelKind, MAXENT_SECTION};
use crate::span::Span;

/// Outcome "é fim de sentença".
pub const SPLIT: &str = "s";
/// Outcome "não é fim de sentença".
pub const NO_SPLIT: &str = "n";

/// Remove espaços das pontas de `[start, end)`; `None` se sobrar vazio.
fn trimmed(text: &str, start: usize, end: usize) -> Option<Span> {
    let slice = &text[start..end];
    let lead = slice.len() - slice.trim_start().len();
    let trail = slice.len() - slice.trim_end().len();
    let (s, e) = (start + lead, end - trail);
    (s < e).then(|| Span::new(s, e))
}

/// Primeiro espaço em branco a partir de `from` (ou o fim do texto). A
/// sentença vai até ali para que aspas e parênteses de fechamento fiquem nela.
fn first_whitespace(text: &str, from: usize) -> usize {
    text[from..]
        .find(char::is_whitespace)
        .map_or(text.len(), |offset| from + offset)
}

/// Detector de sentenças MaxEnt.
#[derive(Debug, Clone)]
pub struct SentenceDetector {
    model: Arc<Model>,
    config: SentenceConfig,
    split: usize,
    no_split: usize,
    last_probs: Vec<f64>,
}

impl SentenceDetector {
    pub fn new(model: Arc<Model>, config: SentenceConfig) -> Result<Self> {
        model.expect_kind(ModelKind::SentenceDetector)?;
        let maxent = model.maxent(MAXENT_SECTION)?;
        let (Some(split), Some(no_split)) = (maxent.index_of(SPLIT), maxent.index_of(NO_SPLIT)) else {
            return Err(NlpError::corrupt_model(format!(
                "modelo de sentenças precisa dos outcomes '{SPLIT}' e '{NO_SPLIT}'"
            )));
        };
        Ok(Self {
            model,
            config,
            split,
            no_split,
            last_probs: Vec::new(),
        })
    }

    /// Spans de byte das sentenças, cada um com a probabilidade da fronteira
    /// que o encerrou.
    pub fn sent_pos_detect_with_probs(&self, text: &str) -> Result<Vec<Span>> {
        let maxent = self.model.maxent(MAXENT_SECTION)?;
        let is_abbreviation = |w: &str| self.model.is_abbreviation(w);
        let eos = &self.config.eos_chars;

        let mut spans = Vec::new();
        let mut start = 0;
        let mut chars = text.char_indices().peekable();

        while let Some((position, c)) = chars.next() {
            if position < start || !eos.contains(&c) {
                continue;
            }
            if chars.peek().map(|(_, next)| eos.contains(next)).unwrap_or(false) {
                continue;
            }
            let ctx = sentence_context(text, position, c, &is_abbreviation);
            let probs = maxent.eval(&ctx);
            if probs[self.split] > probs[self.no_split] {
                let end = first_whitespace(text, position + c.len_utf8());
                if let Some(span) = trimmed(text, start, end) {
                    spans.push(span.with_prob(probs[self.split]));
                }
                start = end;
            }
        }
        if let Some(span) = trimmed(text, start, text.len()) {
            spans.push(span);
        }

        debug!(sentences = spans.len(), bytes = text.len(), "sentenças detectadas");
        Ok(spans)
    }

    pub fn sent_detect_with_probs(&self, text: &str) -> Result<(Vec<String>, Vec<f64>)> {
        let spans = self.sent_pos_detect_with_probs(text)?;
        let sentences = spans
            .iter()
            .filter_map(|s| s.covered_text(text))
            .map(str::to_string)
            .collect();
        let probs = spans.iter().map(|s| s.prob).collect();
        Ok((sentences, probs))
    }

    pub fn sent_pos_detect(&mut self, text: &str) -> Result<Vec<Span>> {
        let spans = self.sent_pos_detect_with_probs(text)?;
        self.last_probs = spans.iter().map(|s| s.prob).collect();
        Ok(spans)
    }

    pub fn sent_detect(&mut self, text: &str) -> Result<Vec<String>> {
        let (sentences, probs) = self.sent_detect_with_probs(text)?;
        self.last_probs = probs;
        Ok(sentences)
    }

    /// Probabilidades das sentenças da última chamada.
    pub fn probs(&self) -> &[f64] {
        &self.last_probs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin;

    fn detector() -> SentenceDetector {
        SentenceDetector::new(Arc::new(builtin::sentence_model()), SentenceConfig::default()).unwrap()
    }

    #[test]
    fn test_two_sentences() {
        let mut detector = detector();
        let sentences = detector.sent_detect("First sentence. Second sentence.").unwrap();
        assert_eq!(sentences, vec!["First sentence.", "Second sentence."]);
        assert_eq!(detector.probs().len(), 2);
    }

    #[test]
    fn test_abbreviation_does_not_split() {
        let (sentences, _) = detector()
            .sent_detect_with_probs("Mr. Vinken is here. He left.")
            .unwrap();
        assert_eq!(sentences, vec!["Mr. Vinken is here.", "He left."]);
    }

    #[test]
    fn test_decimal_does_not_split() {
        let (sentences, _) = detector()
            .sent_detect_with_probs("It costs 61.5 dollars. Okay.")
            .unwrap();
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[0], "It costs 61.5 dollars.");
    }

    #[test]
    fn test_punctuation_run_is_one_candidate() {
        let (sentences, _) = detector().sent_detect_with_probs("Wait!!! Really?").unwrap();
        assert_eq!(sentences, vec!["Wait!!!", "Really?"]);
    }

    #[test]
    fn test_spans_are_trimmed_offsets() {
        let text = "  Hello there.   General Kenobi.  ";
        let spans = detector().sent_pos_detect_with_probs(text).unwrap();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].covered_text(text), Some("Hello there."));
        assert_eq!(spans[1].covered_text(text), Some("General Kenobi."));
        assert!(crate::span::is_ordered_and_disjoint(&spans));
    }

    #[test]
    fn test_closing_quote_stays_with_sentence() {
        let text = "He said \"Stop.\" She left.";
        let (sentences, _) = detector().sent_detect_with_probs(text).unwrap();
        assert_eq!(sentences, vec!["He said \"Stop.\"", "She left."]);

        let (sentences, _) = detector()
            .sent_detect_with_probs("It ended (finally.) Then silence.")
            .unwrap();
        assert_eq!(sentences, vec!["It ended (finally.)", "Then silence."]);
    }

    #[test]
    fn test_remainder_without_eos() {
        let (sentences, probs) = detector().sent_detect_with_probs("No period here").unwrap();
        assert_eq!(sentences, vec!["No period here"]);
        assert_eq!(probs, vec![1.0]);
    }

    #[test]
    fn test_blank_text() {
        let (sentences, _) = detector().sent_detect_with_probs("   \n ").unwrap();
        assert!(sentences.is_empty());
    }
}
