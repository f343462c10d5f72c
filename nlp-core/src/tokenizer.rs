//! # Tokenizador
//!
//! Responsável por dividir uma sentença em tokens (palavras, pontuações).
//! Cada token preserva sua posição original no texto (offset de byte).
//!
//! ## Esquema de Tokenização
//!
//! - **Whitespace**: apenas separa por espaços.
//! - **Simple**: separa nas mudanças de classe de caractere (letras, dígitos,
//!   pontuação), mantendo juntas sequências do mesmo símbolo (`...`).
//! - **Maxent**: faz o pré-corte por espaços e então decide, em cada fronteira
//!   de grafema dentro do token, se deve cortar (`T`) ou não (`F`) com o
//!   classificador. Tokens puramente alfanuméricos nunca são divididos quando a
//!   otimização alfanumérica está ligada.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use nlp_core::tokenizer::SimpleTokenizer;
//!
//! let tokens = SimpleTokenizer.tokenize("An input sample sentence.");
//! assert_eq!(tokens, vec!["An", "input", "sample", "sentence", "."]);
//! ```

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::trace;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::TokenizerConfig;
use crate::error::{NlpError, Result};
use crate::features::token_context;
use crate::maxent::MaxentModel;
use crate::model::{Model, ModelKind, MAXENT_SECTION};
use crate::span::Span;

/// Outcome "cortar aqui".
pub const SPLIT: &str = "T";
/// Outcome "não cortar".
pub const NO_SPLIT: &str = "F";

static ALPHANUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9]+$").expect("valid regex"));

/// Um token extraído do texto original.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Token {
    /// O texto do token (ex: "Pierre", ",", "61").
    pub text: String,
    /// Índice de byte inicial no texto original (inclusive).
    pub start: usize,
    /// Índice de byte final no texto original (exclusivo).
    pub end: usize,
    /// Índice sequencial do token na lista (0, 1, 2...).
    pub index: usize,
    /// Probabilidade das decisões que formaram o token.
    pub prob: f64,
}

/// Estratégias de Tokenização disponíveis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenizerMode {
    /// Separa apenas por espaços.
    Whitespace,
    /// Separa por classe de caractere, sem modelo.
    Simple,
    /// Classificador MaxEnt sobre fronteiras de grafema.
    Maxent,
}

impl Default for TokenizerMode {
    fn default() -> Self {
        TokenizerMode::Maxent
    }
}

/// Converte spans de byte em tokens indexados.
pub fn tokens_from_spans(text: &str, spans: &[Span], offset: usize) -> Vec<Token> {
    spans
        .iter()
        .enumerate()
        .filter_map(|(index, span)| {
            span.covered_text(text).map(|t| Token {
                text: t.to_string(),
                start: span.start + offset,
                end: span.end + offset,
                index,
                prob: span.prob,
            })
        })
        .collect()
}

/// Spans das sequências sem espaço de `text`.
pub fn whitespace_spans(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;
    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            if let Some(s) = start.take() {
                spans.push(Span::new(s, i));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        spans.push(Span::new(s, text.len()));
    }
    spans
}

fn covered(text: &str, spans: &[Span]) -> Vec<String> {
    spans
        .iter()
        .filter_map(|s| s.covered_text(text))
        .map(str::to_string)
        .collect()
}

/// Tokenizador por espaços.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenizer;

impl WhitespaceTokenizer {
    pub fn tokenize_pos(&self, text: &str) -> Vec<Span> {
        whitespace_spans(text)
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        covered(text, &self.tokenize_pos(text))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharKind {
    Space,
    Alpha,
    Digit,
    Other,
}

fn char_kind(c: char) -> CharKind {
    if c.is_whitespace() {
        CharKind::Space
    } else if c.is_alphabetic() {
        CharKind::Alpha
    } else if c.is_numeric() {
        CharKind::Digit
    } else {
        CharKind::Other
    }
}

/// Tokenizador por classe de caractere.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleTokenizer;

impl SimpleTokenizer {
    pub fn tokenize_pos(&self, text: &str) -> Vec<Span> {
        let mut spans = Vec::new();
        let mut start = 0;
        let mut state = CharKind::Space;
        let mut previous = ' ';

        for (i, c) in text.char_indices() {
            let kind = char_kind(c);
            let boundary = kind != state || (kind == CharKind::Other && c != previous);
            if boundary {
                if state != CharKind::Space && i > start {
                    spans.push(Span::new(start, i));
                }
                start = i;
                state = kind;
            }
            previous = c;
        }
        if state != CharKind::Space && text.len() > start {
            spans.push(Span::new(start, text.len()));
        }
        spans
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        covered(text, &self.tokenize_pos(text))
    }
}

/// Tokenizador MaxEnt.
///
/// `tokenize`/`tokenize_pos` guardam as probabilidades da última chamada
/// para `probs()`; as variantes `*_with_probs` são puras.
#[derive(Debug, Clone)]
pub struct MaxentTokenizer {
    model: Arc<Model>,
    config: TokenizerConfig,
    split: usize,
    no_split: usize,
    last_probs: Vec<f64>,
}

impl MaxentTokenizer {
    pub fn new(model: Arc<Model>, config: TokenizerConfig) -> Result<Self> {
        model.expect_kind(ModelKind::Tokenizer)?;
        let maxent = model.maxent(MAXENT_SECTION)?;
        let (Some(split), Some(no_split)) = (maxent.index_of(SPLIT), maxent.index_of(NO_SPLIT)) else {
            return Err(NlpError::corrupt_model(format!(
                "modelo de tokenização precisa dos outcomes '{SPLIT}' e '{NO_SPLIT}'"
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

    fn maxent(&self) -> Result<&MaxentModel> {
        self.model.maxent(MAXENT_SECTION)
    }

    /// Spans dos tokens, cada um com a probabilidade das decisões que o formaram.
    pub fn tokenize_pos_with_probs(&self, text: &str) -> Result<Vec<Span>> {
        let maxent = self.maxent()?;
        let is_abbreviation = |w: &str| self.model.is_abbreviation(w);
        let mut spans = Vec::new();

        for ws in whitespace_spans(text) {
            let token = &text[ws.start..ws.end];
            let single = token.graphemes(true).nth(1).is_none();
            if single || (self.config.alphanumeric_optimization && ALPHANUMERIC.is_match(token)) {
                spans.push(ws);
                continue;
            }

            let mut start = ws.start;
            let mut prob = 1.0;
            for (offset, _) in token.grapheme_indices(true).skip(1) {
                let ctx = token_context(token, offset, &is_abbreviation);
                let probs = maxent.eval(&ctx);
                if probs[self.split] > probs[self.no_split] {
                    prob *= probs[self.split];
                    spans.push(Span::new(start, ws.start + offset).with_prob(prob));
                    start = ws.start + offset;
                    prob = 1.0;
                } else {
                    prob *= probs[self.no_split];
                }
            }
            spans.push(Span::new(start, ws.end).with_prob(prob));
        }
        trace!(tokens = spans.len(), "sentença tokenizada");
        Ok(spans)
    }

    pub fn tokenize_with_probs(&self, text: &str) -> Result<(Vec<String>, Vec<f64>)> {
        let spans = self.tokenize_pos_with_probs(text)?;
        let probs = spans.iter().map(|s| s.prob).collect();
        Ok((covered(text, &spans), probs))
    }

    pub fn tokenize_pos(&mut self, text: &str) -> Result<Vec<Span>> {
        let spans = self.tokenize_pos_with_probs(text)?;
        self.last_probs = spans.iter().map(|s| s.prob).collect();
        Ok(spans)
    }

    pub fn tokenize(&mut self, text: &str) -> Result<Vec<String>> {
        let spans = self.tokenize_pos(text)?;
        Ok(covered(text, &spans))
    }

    /// Probabilidades dos tokens da última chamada a `tokenize`/`tokenize_pos`.
    pub fn probs(&self) -> &[f64] {
        &self.last_probs
    }
}

/// Tokenizador escolhido por [`TokenizerMode`].
#[derive(Debug, Clone)]
pub enum Tokenizer {
    Whitespace(WhitespaceTokenizer),
    Simple(SimpleTokenizer),
    Maxent(MaxentTokenizer),
}

impl Tokenizer {
    /// Monta o tokenizador do modo configurado. O modo `Maxent` exige modelo.
    pub fn from_config(model: Option<Arc<Model>>, config: TokenizerConfig) -> Result<Self> {
        match config.mode {
            TokenizerMode::Whitespace => Ok(Tokenizer::Whitespace(WhitespaceTokenizer)),
            TokenizerMode::Simple => Ok(Tokenizer::Simple(SimpleTokenizer)),
            TokenizerMode::Maxent => {
                let model = model.ok_or_else(|| {
                    NlpError::invalid_input("modo maxent de tokenização exige um modelo")
                })?;
                Ok(Tokenizer::Maxent(MaxentTokenizer::new(model, config)?))
            }
        }
    }

    pub fn mode(&self) -> TokenizerMode {
        match self {
            Tokenizer::Whitespace(_) => TokenizerMode::Whitespace,
            Tokenizer::Simple(_) => TokenizerMode::Simple,
            Tokenizer::Maxent(_) => TokenizerMode::Maxent,
        }
    }

    /// Spans com probabilidade (1.0 para os modos sem modelo).
    pub fn tokenize_pos(&self, text: &str) -> Result<Vec<Span>> {
        match self {
            Tokenizer::Whitespace(t) => Ok(t.tokenize_pos(text)),
            Tokenizer::Simple(t) => Ok(t.tokenize_pos(text)),
            Tokenizer::Maxent(t) => t.tokenize_pos_with_probs(text),
        }
    }

    pub fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        Ok(covered(text, &self.tokenize_pos(text)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin;

    fn maxent_tokenizer() -> MaxentTokenizer {
        MaxentTokenizer::new(Arc::new(builtin::tokenizer_model()), TokenizerConfig::default()).unwrap()
    }

    #[test]
    fn test_whitespace_tokenizer() {
        let spans = WhitespaceTokenizer.tokenize_pos("  Pierre  Vinken\tis ");
        assert_eq!(spans, vec![Span::new(2, 8), Span::new(10, 16), Span::new(17, 19)]);
        assert!(WhitespaceTokenizer.tokenize("   ").is_empty());
    }

    #[test]
    fn test_simple_tokenizer_keeps_symbol_runs() {
        let tokens = SimpleTokenizer.tokenize("Wait... 61.5%!");
        assert_eq!(tokens, vec!["Wait", "...", "61", ".", "5", "%", "!"]);
    }

    #[test]
    fn test_maxent_splits_final_period() {
        let mut tokenizer = maxent_tokenizer();
        let tokens = tokenizer.tokenize("An input sample sentence.").unwrap();
        assert_eq!(tokens, vec!["An", "input", "sample", "sentence", "."]);
        assert_eq!(tokenizer.probs().len(), 5);
        assert!(tokenizer.probs().iter().all(|p| *p > 0.0 && *p <= 1.0));
    }

    #[test]
    fn test_maxent_keeps_numbers_initials_and_hyphens() {
        let tokenizer = maxent_tokenizer();
        let (tokens, _) = tokenizer
            .tokenize_with_probs("The U.S. paid 1,000 dollars for well-known parts.")
            .unwrap();
        assert_eq!(
            tokens,
            vec!["The", "U.S.", "paid", "1,000", "dollars", "for", "well-known", "parts", "."]
        );
    }

    #[test]
    fn test_maxent_splits_punctuation() {
        let tokenizer = maxent_tokenizer();
        let (tokens, _) = tokenizer.tokenize_with_probs("Hello, (world)!").unwrap();
        assert_eq!(tokens, vec!["Hello", ",", "(", "world", ")", "!"]);
    }

    #[test]
    fn test_alphanumeric_optimization_skips_classifier() {
        let tokenizer = maxent_tokenizer();
        let spans = tokenizer.tokenize_pos_with_probs("A380 jets").unwrap();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].prob, 1.0);
    }

    #[test]
    fn test_tokens_from_spans_offsets() {
        let spans = vec![Span::new(0, 6), Span::new(7, 13)];
        let tokens = tokens_from_spans("Pierre Vinken", &spans, 100);
        assert_eq!(tokens[1].text, "Vinken");
        assert_eq!(tokens[1].start, 107);
        assert_eq!(tokens[1].index, 1);
    }

    #[test]
    fn test_from_config_requires_model_for_maxent() {
        let err = Tokenizer::from_config(None, TokenizerConfig::default()).unwrap_err();
        assert!(matches!(err, NlpError::InvalidInput(_)));
        let config = TokenizerConfig {
            mode: TokenizerMode::Simple,
            ..TokenizerConfig::default()
        };
        let tokenizer = Tokenizer::from_config(None, config).unwrap();
        assert_eq!(tokenizer.mode(), TokenizerMode::Simple);
    }

    #[test]
    fn test_wrong_model_kind() {
        let model = Arc::new(builtin::sentence_model());
        let err = MaxentTokenizer::new(model, TokenizerConfig::default()).unwrap_err();
        assert!(matches!(err, NlpError::UnsupportedModelType(_)));
    }
}
