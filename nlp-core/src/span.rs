//! # Spans
//!
//! Intervalo semiaberto `[start, end)` usado por todos os estágios: offsets de
//! byte para sentenças e tokens, índices de token para chunks e entidades.
//! Dentro de uma mesma sequência decodificada os spans nunca se sobrepõem e
//! saem ordenados.

use serde::{Deserialize, Serialize};

/// Representa um span (intervalo) com um rótulo opcional.
///
/// # Exemplo
/// Em `["Pierre", "Vinken", "is", ...]`, a entidade "Pierre Vinken" é
/// `Span { start: 0, end: 2, label: Some("person"), prob: ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    /// Início (inclusivo)
    pub start: usize,
    /// Fim (exclusivo)
    pub end: usize,
    /// Tipo da entidade ou do chunk (`None` para sentenças e tokens)
    pub label: Option<String>,
    /// Probabilidade associada (média das decisões que formaram o span)
    pub prob: f64,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            label: None,
            prob: 1.0,
        }
    }

    pub fn typed(start: usize, end: usize, label: impl Into<String>) -> Self {
        Self {
            start,
            end,
            label: Some(label.into()),
            prob: 1.0,
        }
    }

    pub fn with_prob(mut self, prob: f64) -> Self {
        self.prob = prob;
        self
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// `other` está inteiramente dentro deste span.
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn intersects(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Trecho de texto coberto (para spans em offsets de byte).
    pub fn covered_text<'a>(&self, text: &'a str) -> Option<&'a str> {
        text.get(self.start..self.end)
    }

    /// Junta os tokens cobertos por um span em índices de token.
    pub fn covered_tokens<S: AsRef<str>>(&self, tokens: &[S]) -> Option<String> {
        tokens.get(self.start..self.end).map(|slice| {
            slice
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<_>>()
                .join(" ")
        })
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}..{})", self.start, self.end)?;
        if let Some(label) = &self.label {
            write!(f, " {label}")?;
        }
        Ok(())
    }
}

/// Verifica que os spans estão ordenados e não se sobrepõem.
pub fn is_ordered_and_disjoint(spans: &[Span]) -> bool {
    spans
        .windows(2)
        .all(|w| w[0].end <= w[1].start && w[0].start <= w[0].end)
}

/// Converte tags BIO em spans tipados.
///
/// - `B-X` abre um span novo (fechando o anterior);
/// - `I-X` continua o span aberto do mesmo tipo; sem span compatível aberto,
///   é tratado como `B-X`;
/// - qualquer outra tag fecha o span aberto.
///
/// `probs`, se fornecido, alinha uma probabilidade por tag; o span recebe a média.
pub fn bio_to_spans<S: AsRef<str>>(tags: &[S], probs: Option<&[f64]>) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut open: Option<(usize, String)> = None;

    let close = |open: &mut Option<(usize, String)>, end: usize, spans: &mut Vec<Span>| {
        if let Some((start, label)) = open.take() {
            let prob = probs
                .and_then(|p| p.get(start..end))
                .filter(|p| !p.is_empty())
                .map(|p| p.iter().sum::<f64>() / p.len() as f64)
                .unwrap_or(1.0);
            spans.push(Span::typed(start, end, label).with_prob(prob));
        }
    };

    for (i, tag) in tags.iter().enumerate() {
        let tag = tag.as_ref();
        if let Some(label) = tag.strip_prefix("B-") {
            close(&mut open, i, &mut spans);
            open = Some((i, label.to_string()));
        } else if let Some(label) = tag.strip_prefix("I-") {
            let continues = matches!(&open, Some((_, current)) if current == label);
            if !continues {
                close(&mut open, i, &mut spans);
                open = Some((i, label.to_string()));
            }
        } else {
            close(&mut open, i, &mut spans);
        }
    }
    close(&mut open, tags.len(), &mut spans);

    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bio_to_spans() {
        let tags = vec!["O", "B-PER", "I-PER", "O", "B-LOC"];
        let spans = bio_to_spans(&tags, None);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0], Span::typed(1, 3, "PER"));
        assert_eq!(spans[1], Span::typed(4, 5, "LOC"));
    }

    #[test]
    fn test_bio_inside_without_begin_starts_span() {
        let tags = vec!["I-NP", "I-NP", "B-VP", "I-PP"];
        let spans = bio_to_spans(&tags, None);
        assert_eq!(
            spans,
            vec![Span::typed(0, 2, "NP"), Span::typed(2, 3, "VP"), Span::typed(3, 4, "PP")]
        );
    }

    #[test]
    fn test_bio_span_probability_is_mean() {
        let tags = ["B-person", "I-person", "O"];
        let spans = bio_to_spans(&tags, Some(&[0.8, 0.6, 0.9]));
        assert_eq!(spans.len(), 1);
        assert!((spans[0].prob - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_span_geometry() {
        let a = Span::new(0, 5);
        let b = Span::new(2, 4);
        let c = Span::new(5, 7);
        assert!(a.contains(&b));
        assert!(!a.intersects(&c));
        assert!(is_ordered_and_disjoint(&[a.clone(), c.clone()]));
        assert!(!is_ordered_and_disjoint(&[a, b]));
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn test_covered_text_and_tokens() {
        let text = "Pierre Vinken is 61";
        assert_eq!(Span::new(0, 6).covered_text(text), Some("Pierre"));
        assert_eq!(Span::new(0, 99).covered_text(text), None);
        let tokens = ["Pierre", "Vinken", "is"];
        assert_eq!(Span::new(0, 2).covered_tokens(&tokens).as_deref(), Some("Pierre Vinken"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Span::typed(0, 2, "person").to_string(), "[0..2) person");
        assert_eq!(Span::new(3, 4).to_string(), "[3..4)");
    }
}
