//! # Parser por Chunks
//!
//! Parser de constituintes shift-reduce guiado por dois classificadores
//! MaxEnt, sobre a saída do POS tagger e do chunker embutidos no modelo.
//!
//! ## Algoritmo
//!
//! ```text
//! 1. tags:   k melhores sequências POS
//! 2. chunks: k melhores sequências BIO por sequência POS
//!    floresta inicial = chunks + tokens fora de chunks
//! 3. build/check, repetido até restar um nó na fila e a pilha vazia:
//!      build: S-X abre um constituinte X com o nó da frente da fila
//!             C-X anexa o nó da frente ao constituinte aberto X (topo)
//!      check (após C-X): c fecha o constituinte do topo e o devolve
//!             à frente da fila; i mantém aberto
//! ```
//!
//! Cada derivação acumula a soma das log-probabilidades das suas decisões. Em
//! cada passo só se expandem as ações mais prováveis até cobrir
//! `advance_percentage` da massa válida (no máximo `beam_size`). A busca
//! termina quando nenhuma derivação viva pode superar a k-ésima completa.
//!
//! ## Restrições
//!
//! - `S-X` não se aplica ao último nó da fila (evita constituintes unários);
//! - `C-X` exige que o constituinte aberto no topo seja `X`;
//! - com a fila vazia depois de `C-X`, o check é forçado a `c`.
//!
//! Essas regras garantem que toda derivação termina.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::chunker::Chunker;
use crate::config::ParserConfig;
use crate::decoder::{by_score_desc, ranked_outcomes, Sequence};
use crate::error::{NlpError, Result};
use crate::features::{SENTENCE_BEGIN, SENTENCE_END};
use crate::maxent::MaxentModel;
use crate::model::{
    Model, ModelKind, BUILD_SECTION, CHECK_SECTION, PARSER_TYPE_CHUNKING, PARSER_TYPE_KEY,
};
use crate::parse::ParseTree;
use crate::postag::PosTagger;
use crate::span::bio_to_spans;

/// Outcome do check que fecha o constituinte.
pub const COMPLETE: &str = "c";
/// Outcome do check que mantém o constituinte aberto.
pub const INCOMPLETE: &str = "i";

/// Ação de construção decodificada de um outcome `S-X` / `C-X`.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    Start(String),
    Attach(String),
}

impl Action {
    fn parse(outcome: &str) -> Option<Self> {
        if let Some(label) = outcome.strip_prefix("S-") {
            Some(Action::Start(label.to_string()))
        } else {
            outcome
                .strip_prefix("C-")
                .map(|label| Action::Attach(label.to_string()))
        }
    }
}

/// Constituinte aberto na pilha.
#[derive(Debug, Clone)]
struct Open {
    label: String,
    children: Vec<ParseTree>,
}

/// Derivação parcial.
#[derive(Debug, Clone)]
struct Derivation {
    queue: VecDeque<ParseTree>,
    stack: Vec<Open>,
    score: f64,
}

fn node_label(node: &ParseTree) -> &str {
    node.label().unwrap_or("")
}

impl Derivation {
    fn is_complete(&self) -> bool {
        self.stack.is_empty() && self.queue.len() == 1
    }

    fn into_tree(mut self) -> Option<ParseTree> {
        let top = self.queue.pop_front()?;
        Some(ParseTree::root(vec![top], self.score))
    }

    /// Fecha o constituinte do topo e o devolve à frente da fila. Um chunk
    /// de mesmo rótulo na primeira posição é achatado:
    /// `(VP [VP jumps] PP)` vira `(VP jumps PP)`.
    fn complete(&mut self, score: f64) {
        let Some(open) = self.stack.pop() else {
            return;
        };
        let mut children = Vec::with_capacity(open.children.len() + 2);
        for (i, child) in open.children.into_iter().enumerate() {
            if i == 0 && child.is_chunk() && child.label() == Some(open.label.as_str()) {
                children.extend(child.into_children());
            } else {
                children.push(child);
            }
        }
        self.queue.push_front(ParseTree::node(open.label, children, score));
    }

    /// Predicados da decisão de construção.
    fn build_context(&self) -> Vec<String> {
        let b0 = self.queue.front();
        let b0_label = b0.map(node_label).unwrap_or(SENTENCE_END);
        let b0_word = b0.and_then(ParseTree::head_word).unwrap_or(SENTENCE_END);
        let b1 = self.queue.get(1).map(node_label).unwrap_or(SENTENCE_END);
        let open = self.stack.last();
        let o = open.map(|o| o.label.as_str()).unwrap_or(SENTENCE_BEGIN);
        let last = open
            .and_then(|o| o.children.last())
            .map(node_label)
            .unwrap_or(SENTENCE_BEGIN);

        let mut ctx = vec![
            "bias".to_string(),
            format!("b0={b0_label}"),
            format!("b0w={b0_word}"),
            format!("b1={b1}"),
            format!("o={o}"),
            format!("b-1={last}"),
            format!("b0,b1={b0_label},{b1}"),
            format!("o,b0={o},{b0_label}"),
            format!("o,b0,b1={o},{b0_label},{b1}"),
            format!("b-1,b0={last},{b0_label}"),
        ];
        if self.stack.is_empty() {
            ctx.push("bos".to_string());
        }
        ctx
    }

    /// Predicados da decisão de fechamento do constituinte do topo.
    fn check_context(&self) -> Vec<String> {
        let Some(open) = self.stack.last() else {
            return vec!["bias".to_string()];
        };
        let c = open.label.as_str();
        let first = open.children.first().map(node_label).unwrap_or(SENTENCE_BEGIN);
        let last = open.children.last().map(node_label).unwrap_or(SENTENCE_BEGIN);
        let next = self.queue.front().map(node_label).unwrap_or(SENTENCE_END);

        let mut ctx = vec![
            "bias".to_string(),
            format!("c={c}"),
            format!("c,fst={c},{first}"),
            format!("c,lst={c},{last}"),
            format!("c,nxt={c},{next}"),
            format!("len={}", open.children.len().min(5)),
        ];
        if self.stack.len() == 1 {
            ctx.push("top".to_string());
        }
        ctx
    }
}

/// Índices escolhidos entre `candidates` (já ordenados): os mais prováveis
/// até cobrir `percentage` da massa, no máximo `limit`, no mínimo um.
fn select_by_mass(candidates: &[usize], probs: &[f64], percentage: f64, limit: usize) -> Vec<usize> {
    let total: f64 = candidates.iter().map(|&i| probs[i]).sum();
    let mut chosen = Vec::new();
    let mut mass = 0.0;
    for &i in candidates {
        if chosen.len() >= limit.max(1) {
            break;
        }
        chosen.push(i);
        mass += probs[i];
        if mass >= percentage * total {
            break;
        }
    }
    chosen
}

/// Filtra sequências (melhor primeiro) pela massa relativa `exp(score)`.
fn select_sequences(sequences: Vec<Sequence>, percentage: f64, limit: usize) -> Vec<Sequence> {
    let Some(best) = sequences.first().map(Sequence::score) else {
        return sequences;
    };
    let weights: Vec<f64> = sequences.iter().map(|s| (s.score() - best).exp()).collect();
    let order: Vec<usize> = (0..sequences.len()).collect();
    let keep = select_by_mass(&order, &weights, percentage, limit);
    sequences.into_iter().take(keep.len()).collect()
}

/// Parser por chunks sobre um modelo do tipo `parser`.
#[derive(Debug, Clone)]
pub struct Parser {
    model: Arc<Model>,
    config: ParserConfig,
    tagger: PosTagger,
    chunker: Chunker,
    actions: Vec<Action>,
    complete: usize,
    incomplete: usize,
}

impl Parser {
    /// Monta o parser, validando o tipo de gramática e a coerência dos
    /// modelos de construção.
    pub fn create(model: Arc<Model>, config: ParserConfig) -> Result<Self> {
        model.expect_kind(ModelKind::Parser)?;
        match model.manifest_value(PARSER_TYPE_KEY) {
            Some(PARSER_TYPE_CHUNKING) => {}
            Some(other) => {
                return Err(NlpError::unsupported_grammar(format!(
                    "tipo de parser '{other}' não implementado"
                )))
            }
            None => {
                return Err(NlpError::unsupported_grammar(format!(
                    "manifesto sem '{PARSER_TYPE_KEY}'"
                )))
            }
        }

        let build = model.maxent(BUILD_SECTION)?;
        let actions = build
            .outcomes()
            .iter()
            .map(|o| {
                Action::parse(o).ok_or_else(|| {
                    NlpError::corrupt_model(format!("outcome de construção inválido: '{o}'"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        for action in &actions {
            if let Action::Start(label) = action {
                if !actions.contains(&Action::Attach(label.clone())) {
                    return Err(NlpError::corrupt_model(format!(
                        "S-{label} sem o C-{label} correspondente"
                    )));
                }
            }
        }

        let check = model.maxent(CHECK_SECTION)?;
        let (Some(complete), Some(incomplete)) = (check.index_of(COMPLETE), check.index_of(INCOMPLETE))
        else {
            return Err(NlpError::corrupt_model(format!(
                "modelo de check precisa dos outcomes '{COMPLETE}' e '{INCOMPLETE}'"
            )));
        };

        let tagger = PosTagger::from_parser_model(model.clone(), config.decoder)?;
        let chunker = Chunker::from_parser_model(model.clone(), config.decoder)?;
        debug!(
            actions = actions.len(),
            beam = config.beam_size,
            "parser por chunks criado"
        );

        Ok(Self {
            model,
            config,
            tagger,
            chunker,
            actions,
            complete,
            incomplete,
        })
    }

    fn build_model(&self) -> Result<&MaxentModel> {
        self.model.maxent(BUILD_SECTION)
    }

    fn check_model(&self) -> Result<&MaxentModel> {
        self.model.maxent(CHECK_SECTION)
    }

    /// Divide a sentença em tokens por espaço e devolve até `k` árvores.
    pub fn parse_line(&self, sentence: &str, k: usize) -> Result<Vec<ParseTree>> {
        let tokens: Vec<&str> = sentence.split_whitespace().collect();
        self.parse(&tokens, k)
    }

    /// Até `k` árvores completas para a sentença tokenizada, melhor primeiro.
    ///
    /// A largura da busca é `beam_size`; um `k` maior só deixa a busca correr
    /// até esgotar as derivações vivas.
    pub fn parse<S: AsRef<str>>(&self, tokens: &[S], k: usize) -> Result<Vec<ParseTree>> {
        if tokens.is_empty() {
            return Err(NlpError::invalid_input("sentença vazia"));
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut live = self.initial_derivations(tokens)?;
        let mut completed: Vec<Derivation> = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();
        let beam_size = self.config.beam_size.max(1);
        let mut round = 0;

        while !live.is_empty() {
            live.sort_by(|a, b| by_score_desc(a.score, b.score));
            live.truncate(beam_size);
            if completed.len() >= k {
                let mut scores: Vec<f64> = completed.iter().map(|d| d.score).collect();
                scores.sort_by(|a, b| by_score_desc(*a, *b));
                if live[0].score <= scores[k - 1] {
                    break;
                }
            }

            let mut next = Vec::new();
            for derivation in live {
                if derivation.is_complete() {
                    Self::record(&mut completed, &mut seen, derivation);
                } else {
                    next.extend(self.advance(&derivation)?);
                }
            }
            next.retain(|d| !d.score.is_nan() && d.score >= self.config.decoder.min_log_score);
            round += 1;
            trace!(round, live = next.len(), completed = completed.len(), "rodada do parser");
            live = next;
        }

        if completed.is_empty() {
            warn!(tokens = tokens.len(), "nenhuma derivação completa");
            return Err(NlpError::decode_underflow(
                "nenhuma derivação completa acima do piso",
            ));
        }
        completed.sort_by(|a, b| by_score_desc(a.score, b.score));
        completed.truncate(k);
        debug!(
            tokens = tokens.len(),
            trees = completed.len(),
            best = completed[0].score,
            "sentença analisada"
        );
        Ok(completed.into_iter().filter_map(Derivation::into_tree).collect())
    }

    /// Guarda uma derivação completa; bracketings repetidos ficam com o
    /// maior score.
    fn record(completed: &mut Vec<Derivation>, seen: &mut HashMap<String, usize>, derivation: Derivation) {
        let key = derivation
            .queue
            .front()
            .map(ToString::to_string)
            .unwrap_or_default();
        match seen.get(&key) {
            Some(&i) => {
                if derivation.score > completed[i].score {
                    completed[i] = derivation;
                }
            }
            None => {
                seen.insert(key, completed.len());
                completed.push(derivation);
            }
        }
    }

    /// Florestas iniciais: combinações das melhores sequências POS e BIO.
    fn initial_derivations<S: AsRef<str>>(&self, tokens: &[S]) -> Result<Vec<Derivation>> {
        let limit = self.config.beam_size.max(1);
        let percentage = self.config.advance_percentage;
        let tag_sequences = select_sequences(self.tagger.top_k_sequences(tokens, limit)?, percentage, limit);

        let mut derivations = Vec::new();
        for tags in &tag_sequences {
            let chunk_sequences = select_sequences(
                self.chunker.top_k_sequences(tokens, tags.outcomes(), limit)?,
                percentage,
                limit,
            );
            for chunks in &chunk_sequences {
                derivations.push(Derivation {
                    queue: Self::forest(tokens, tags, chunks),
                    stack: Vec::new(),
                    score: tags.score() + chunks.score(),
                });
            }
        }
        debug!(
            tag_sequences = tag_sequences.len(),
            derivations = derivations.len(),
            "florestas iniciais"
        );
        Ok(derivations)
    }

    fn forest<S: AsRef<str>>(tokens: &[S], tags: &Sequence, chunks: &Sequence) -> VecDeque<ParseTree> {
        let leaves: Vec<ParseTree> = tokens
            .iter()
            .zip(tags.outcomes().iter().zip(tags.probs()))
            .enumerate()
            .map(|(i, (token, (tag, &prob)))| ParseTree::leaf(tag.as_str(), token.as_ref(), i, prob))
            .collect();

        let mut queue = VecDeque::with_capacity(leaves.len());
        let mut leaves = leaves.into_iter().enumerate().peekable();
        for span in bio_to_spans(chunks.outcomes(), None) {
            while let Some((_, leaf)) = leaves.next_if(|(i, _)| *i < span.start) {
                queue.push_back(leaf);
            }
            let mut children = Vec::with_capacity(span.len());
            while let Some((_, leaf)) = leaves.next_if(|(i, _)| *i < span.end) {
                children.push(leaf);
            }
            let score = chunks.probs()[span.start..span.end].iter().map(|p| p.ln()).sum();
            queue.push_back(ParseTree::chunk(span.label().unwrap_or(""), children, score));
        }
        queue.extend(leaves.map(|(_, leaf)| leaf));
        queue
    }

    fn is_valid(&self, derivation: &Derivation, action: &Action) -> bool {
        match action {
            Action::Start(_) => derivation.queue.len() > 1,
            Action::Attach(label) => derivation
                .stack
                .last()
                .map(|open| &open.label == label)
                .unwrap_or(false),
        }
    }

    /// Expande uma derivação por uma decisão de construção (e o check que a
    /// segue, se houver).
    fn advance(&self, derivation: &Derivation) -> Result<Vec<Derivation>> {
        let build = self.build_model()?;
        let probs = build.eval(&derivation.build_context());
        let valid: Vec<usize> = ranked_outcomes(&probs)
            .into_iter()
            .filter(|&o| self.is_valid(derivation, &self.actions[o]))
            .collect();
        let chosen = select_by_mass(
            &valid,
            &probs,
            self.config.advance_percentage,
            self.config.beam_size,
        );

        let mut out = Vec::with_capacity(chosen.len() + 1);
        for o in chosen {
            let mut next = derivation.clone();
            next.score += probs[o].ln();
            let Some(b0) = next.queue.pop_front() else {
                continue;
            };
            match &self.actions[o] {
                Action::Start(label) => {
                    next.stack.push(Open {
                        label: label.clone(),
                        children: vec![b0],
                    });
                    out.push(next);
                }
                Action::Attach(_) => {
                    if let Some(open) = next.stack.last_mut() {
                        open.children.push(b0);
                    }
                    out.extend(self.check(next)?);
                }
            }
        }
        Ok(out)
    }

    /// Decide se o constituinte do topo fecha depois de um `C-X`.
    fn check(&self, derivation: Derivation) -> Result<Vec<Derivation>> {
        let check = self.check_model()?;
        let probs = check.eval(&derivation.check_context());

        if derivation.queue.is_empty() {
            let mut closed = derivation;
            let log_prob = probs[self.complete].ln();
            closed.score += log_prob;
            closed.complete(log_prob);
            return Ok(vec![closed]);
        }

        let ranked: Vec<usize> = ranked_outcomes(&probs)
            .into_iter()
            .filter(|&o| o == self.complete || o == self.incomplete)
            .collect();
        let chosen = select_by_mass(&ranked, &probs, self.config.advance_percentage, 2);

        let mut out = Vec::with_capacity(chosen.len());
        for o in chosen {
            let mut next = derivation.clone();
            next.score += probs[o].ln();
            if o == self.complete {
                next.complete(probs[o].ln());
            }
            out.push(next);
        }
        Ok(out)
    }
}

/// Atalho: analisa uma sentença já tokenizada por espaços.
pub fn parse_line(sentence: &str, parser: &Parser, k: usize) -> Result<Vec<ParseTree>> {
    parser.parse_line(sentence, k)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin;

    fn parser() -> Parser {
        Parser::create(Arc::new(builtin::parser_model()), ParserConfig::default()).unwrap()
    }

    const FOX: &str = "The quick brown fox jumps over the lazy dog .";

    #[test]
    fn test_single_best_parse() {
        let trees = parse_line(FOX, &parser(), 1).unwrap();
        assert_eq!(trees.len(), 1);
        let tree = &trees[0];
        assert_eq!(tree.label(), None);
        assert_eq!(tree.tokens(), FOX.split_whitespace().collect::<Vec<_>>());
        assert_eq!((tree.span().start, tree.span().end), (0, 10));
        assert_eq!(tree.children()[0].label(), Some("S"));
        assert!(tree.score() < 0.0);
    }

    #[test]
    fn test_best_parse_structure() {
        let trees = parser().parse_line(FOX, 1).unwrap();
        assert_eq!(
            trees[0].to_string(),
            "( (S (NP (DT The) (JJ quick) (JJ brown) (NN fox)) (VP (VBZ jumps) \
             (PP (IN over) (NP (DT the) (JJ lazy) (NN dog)))) (. .)))"
        );
        assert_eq!(trees[0].head_word(), Some("jumps"));
    }

    #[test]
    fn test_k_best_are_distinct_and_sorted() {
        let trees = parser().parse_line(FOX, 3).unwrap();
        assert!(!trees.is_empty() && trees.len() <= 3);
        for pair in trees.windows(2) {
            assert!(pair[0].score() >= pair[1].score());
            assert_ne!(pair[0].to_string(), pair[1].to_string());
        }
        for tree in &trees {
            assert_eq!(tree.tokens().len(), 10);
        }
    }

    #[test]
    fn test_huge_k_is_bounded_by_beam() {
        let parser = parser();
        let trees = parser.parse_line(FOX, 100_000).unwrap();
        assert!(!trees.is_empty());
        assert!(trees.len() <= 100_000);
        assert_eq!(trees[0].to_string(), parser.parse_line(FOX, 1).unwrap()[0].to_string());
        for pair in trees.windows(2) {
            assert!(pair[0].score() >= pair[1].score());
        }
    }

    #[test]
    fn test_single_token_sentence() {
        let trees = parser().parse_line("Hello", 2).unwrap();
        assert!(!trees.is_empty() && trees.len() <= 2);
        for tree in &trees {
            assert_eq!(tree.tokens(), vec!["Hello"]);
            assert_eq!(tree.label(), None);
        }
    }

    #[test]
    fn test_empty_sentence_is_invalid() {
        let err = parser().parse_line("   ", 1).unwrap_err();
        assert!(matches!(err, NlpError::InvalidInput(_)));
    }

    #[test]
    fn test_unsupported_grammar() {
        let model = builtin::parser_model().with_manifest_entry(PARSER_TYPE_KEY, "treeinsert");
        let err = Parser::create(Arc::new(model), ParserConfig::default()).unwrap_err();
        assert!(matches!(err, NlpError::UnsupportedGrammar(_)));
    }

    #[test]
    fn test_wrong_model_kind() {
        let err = Parser::create(Arc::new(builtin::pos_model()), ParserConfig::default()).unwrap_err();
        assert!(matches!(err, NlpError::UnsupportedModelType(_)));
    }

    #[test]
    fn test_unpaired_start_is_corrupt() {
        let mut build = MaxentModel::new(["S-NP", "C-VP"]);
        build.set_weight("bias", "S-NP", 1.0);
        let model = builtin::parser_model().with_section(BUILD_SECTION, build);
        let err = Parser::create(Arc::new(model), ParserConfig::default()).unwrap_err();
        assert!(matches!(err, NlpError::CorruptModel(_)));
    }
}
