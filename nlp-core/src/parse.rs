//! # Árvore Sintática
//!
//! Nós de constituintes produzidos pelo parser. Cada nó é dono exclusivo dos
//! filhos; a árvore é imutável depois de devolvida.
//!
//! ```text
//! ( (S (NP (DT The) (NN fox)) (VP (VBZ jumps)) (. .)))
//!   │   │   └── pré-terminal: rótulo = tag POS, word = "The"
//!   │   └────── constituinte: rótulo = "NP"
//!   └────────── raiz: rótulo ausente, envolve a sentença inteira
//! ```
//!
//! O `score` de cada nó é uma log-probabilidade: do tag escolhido para
//! pré-terminais, das decisões de chunk para chunks, da decisão de fechamento
//! para constituintes construídos e da derivação inteira para a raiz.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::span::Span;

/// Nó de uma árvore de constituintes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseTree {
    label: Option<String>,
    start: usize,
    end: usize,
    word: Option<String>,
    score: f64,
    children: Vec<ParseTree>,
    #[serde(skip)]
    chunk: bool,
}

/// Direção da busca pelo núcleo entre os filhos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Left,
    Right,
}

/// Tabela de núcleos: para cada rótulo, direção e prioridades.
fn head_rule(label: &str) -> (Direction, &'static [&'static str]) {
    match label {
        "NP" | "NX" => (
            Direction::Right,
            &["NN", "NNS", "NNP", "NNPS", "NX", "NP", "PRP", "CD", "JJ", "JJS", "JJR"],
        ),
        "VP" => (
            Direction::Left,
            &["VBD", "VBZ", "VBP", "VB", "VBG", "VBN", "MD", "TO", "VP"],
        ),
        "PP" => (Direction::Left, &["IN", "TO", "RP", "PP"]),
        "S" | "SINV" | "SQ" => (Direction::Left, &["VP", "S", "SBAR", "SINV"]),
        "SBAR" => (Direction::Left, &["IN", "WDT", "WP", "S", "SBAR"]),
        "ADJP" => (Direction::Right, &["JJ", "JJR", "JJS", "ADJP", "VBN"]),
        "ADVP" => (Direction::Right, &["RB", "RBR", "RBS", "ADVP"]),
        "PRT" => (Direction::Left, &["RP"]),
        _ => (Direction::Left, &[]),
    }
}

/// Escapa parênteses da notação Penn.
fn escape(token: &str) -> &str {
    match token {
        "(" => "-LRB-",
        ")" => "-RRB-",
        "{" => "-LCB-",
        "}" => "-RCB-",
        other => other,
    }
}

impl ParseTree {
    /// Pré-terminal: uma palavra com sua tag POS.
    pub fn leaf(tag: impl Into<String>, word: impl Into<String>, index: usize, prob: f64) -> Self {
        Self {
            label: Some(tag.into()),
            start: index,
            end: index + 1,
            word: Some(word.into()),
            score: prob.ln(),
            children: Vec::new(),
            chunk: false,
        }
    }

    /// Constituinte com os filhos dados (não vazios, contíguos).
    pub fn node(label: impl Into<String>, children: Vec<ParseTree>, score: f64) -> Self {
        let start = children.first().map(|c| c.start).unwrap_or(0);
        let end = children.last().map(|c| c.end).unwrap_or(start);
        Self {
            label: Some(label.into()),
            start,
            end,
            word: None,
            score,
            children,
            chunk: false,
        }
    }

    /// Chunk vindo do chunker; pode ser achatado ao iniciar um constituinte
    /// de mesmo rótulo.
    pub(crate) fn chunk(label: impl Into<String>, children: Vec<ParseTree>, score: f64) -> Self {
        Self {
            chunk: true,
            ..Self::node(label, children, score)
        }
    }

    /// Raiz sem rótulo envolvendo a sentença.
    pub fn root(children: Vec<ParseTree>, score: f64) -> Self {
        Self {
            label: None,
            ..Self::node("", children, score)
        }
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Intervalo `[start, end)` de índices de token coberto pelo nó.
    pub fn span(&self) -> Span {
        match &self.label {
            Some(label) => Span::typed(self.start, self.end, label.clone()),
            None => Span::new(self.start, self.end),
        }
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn children(&self) -> &[ParseTree] {
        &self.children
    }

    /// Palavra do pré-terminal (`None` para constituintes).
    pub fn word(&self) -> Option<&str> {
        self.word.as_deref()
    }

    pub fn is_preterminal(&self) -> bool {
        self.word.is_some()
    }

    pub(crate) fn is_chunk(&self) -> bool {
        self.chunk
    }

    /// Desmonta o nó nos seus filhos.
    pub(crate) fn into_children(self) -> Vec<ParseTree> {
        self.children
    }

    /// Palavras cobertas, em ordem.
    pub fn tokens(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_preterminals(&mut |t| {
            if let Some(w) = t.word() {
                out.push(w);
            }
        });
        out
    }

    /// Tags POS dos pré-terminais, em ordem.
    pub fn tags(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_preterminals(&mut |t| {
            if let Some(l) = t.label() {
                out.push(l);
            }
        });
        out
    }

    fn collect_preterminals<'a>(&'a self, f: &mut impl FnMut(&'a ParseTree)) {
        if self.is_preterminal() {
            f(self);
        } else {
            for child in &self.children {
                child.collect_preterminals(f);
            }
        }
    }

    /// Filho núcleo segundo a tabela de núcleos.
    pub fn head_child(&self) -> Option<&ParseTree> {
        if self.children.is_empty() {
            return None;
        }
        let (direction, priorities) = head_rule(self.label().unwrap_or(""));
        let ordered: Vec<&ParseTree> = match direction {
            Direction::Left => self.children.iter().collect(),
            Direction::Right => self.children.iter().rev().collect(),
        };
        priorities
            .iter()
            .find_map(|p| ordered.iter().find(|c| c.label() == Some(*p)).copied())
            .or_else(|| ordered.first().copied())
    }

    /// Palavra núcleo do nó.
    pub fn head_word(&self) -> Option<&str> {
        match self.word() {
            Some(w) => Some(w),
            None => self.head_child().and_then(ParseTree::head_word),
        }
    }
}

impl fmt::Display for ParseTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.label, &self.word) {
            (Some(tag), Some(word)) => write!(f, "({} {})", escape(tag), escape(word)),
            (label, _) => {
                write!(f, "({}", label.as_deref().map(escape).unwrap_or(""))?;
                for child in &self.children {
                    write!(f, " {child}")?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fox_tree() -> ParseTree {
        let np = ParseTree::node(
            "NP",
            vec![
                ParseTree::leaf("DT", "The", 0, 0.9),
                ParseTree::leaf("NN", "fox", 1, 0.8),
            ],
            -0.1,
        );
        let vp = ParseTree::node("VP", vec![ParseTree::leaf("VBZ", "jumps", 2, 0.7)], -0.2);
        let s = ParseTree::node("S", vec![np, vp, ParseTree::leaf(".", ".", 3, 1.0)], -0.3);
        ParseTree::root(vec![s], -2.0)
    }

    #[test]
    fn test_penn_brackets() {
        assert_eq!(
            fox_tree().to_string(),
            "( (S (NP (DT The) (NN fox)) (VP (VBZ jumps)) (. .)))"
        );
    }

    #[test]
    fn test_spans_tokens_and_tags() {
        let tree = fox_tree();
        assert_eq!(tree.label(), None);
        assert_eq!((tree.span().start, tree.span().end), (0, 4));
        let s = &tree.children()[0];
        assert_eq!(s.span().label(), Some("S"));
        assert_eq!(tree.tokens(), vec!["The", "fox", "jumps", "."]);
        assert_eq!(tree.tags(), vec!["DT", "NN", "VBZ", "."]);
        assert_eq!(s.children()[0].span().end, 2);
    }

    #[test]
    fn test_head_words() {
        let tree = fox_tree();
        let s = &tree.children()[0];
        assert_eq!(s.children()[0].head_word(), Some("fox"));
        assert_eq!(s.head_word(), Some("jumps"));
        assert_eq!(tree.head_word(), Some("jumps"));
    }

    #[test]
    fn test_parentheses_are_escaped() {
        let leaf = ParseTree::leaf("-LRB-", "(", 0, 1.0);
        assert_eq!(leaf.to_string(), "(-LRB- -LRB-)");
        assert_eq!(leaf.score(), 0.0);
    }
}
