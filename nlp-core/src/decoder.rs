//! # Decodificação de Sequências
//!
//! Aplica o classificador MaxEnt posição a posição, realimentando os outcomes
//! já escolhidos como contexto da próxima decisão.
//!
//! ## Estratégias
//!
//! - **Gulosa**: em cada posição escolhe o outcome válido de maior
//!   probabilidade. `O(n)`.
//! - **Beam search**: mantém as K melhores sequências parciais por
//!   log-probabilidade acumulada:
//!
//! ```text
//! beam_0 = [ε]
//! para i em 0..n:
//!     para cada s em beam_i (melhor primeiro):
//!         p = classify(contexto(i, s))
//!         expande s com os K outcomes mais prováveis que o validador aceita
//!         (se nenhum deles for válido, com todos os válidos)
//!     descarta sequências com score < piso (ou NaN)
//!     beam_{i+1} = K melhores (empates: ordem de aparição)
//! ```
//!
//! Se todas as sequências forem descartadas o erro
//! [`NlpError::DecodeUnderflow`] sobe para quem chamou: "nenhuma entidade" e
//! "decodificador falhou" são resultados distintos.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::config::DecoderConfig;
use crate::error::{NlpError, Result};
use crate::maxent::MaxentModel;

/// Gera os predicados da posição `index`, dados os outcomes já decididos
/// para as posições anteriores.
pub trait ContextGenerator {
    fn context(&self, index: usize, prior: &[String]) -> Vec<String>;
}

impl<F> ContextGenerator for F
where
    F: Fn(usize, &[String]) -> Vec<String>,
{
    fn context(&self, index: usize, prior: &[String]) -> Vec<String> {
        self(index, prior)
    }
}

/// Restrição rígida sobre quais outcomes podem estender uma sequência.
pub trait SequenceValidator {
    fn valid(&self, index: usize, prior: &[String], outcome: &str) -> bool;
}

/// Aceita qualquer outcome.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoValidation;

impl SequenceValidator for NoValidation {
    fn valid(&self, _index: usize, _prior: &[String], _outcome: &str) -> bool {
        true
    }
}

/// Sequência decodificada: um outcome e a probabilidade escolhida por
/// posição, mais o score (soma das log-probabilidades).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    outcomes: Vec<String>,
    probs: Vec<f64>,
    score: f64,
}

impl Sequence {
    pub fn empty() -> Self {
        Self {
            outcomes: Vec::new(),
            probs: Vec::new(),
            score: 0.0,
        }
    }

    fn extended(&self, outcome: &str, prob: f64) -> Self {
        let mut outcomes = Vec::with_capacity(self.outcomes.len() + 1);
        outcomes.extend_from_slice(&self.outcomes);
        outcomes.push(outcome.to_string());
        let mut probs = Vec::with_capacity(self.probs.len() + 1);
        probs.extend_from_slice(&self.probs);
        probs.push(prob);
        Self {
            outcomes,
            probs,
            score: self.score + prob.ln(),
        }
    }

    pub fn outcomes(&self) -> &[String] {
        &self.outcomes
    }

    pub fn probs(&self) -> &[f64] {
        &self.probs
    }

    /// Soma das log-probabilidades do caminho.
    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<f64>) {
        (self.outcomes, self.probs)
    }
}

/// Ordena por score decrescente; `sort_by` é estável, então empates mantêm a
/// ordem de aparição.
pub(crate) fn by_score_desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Índices dos outcomes em ordem decrescente de probabilidade (empates pela
/// ordem do modelo).
pub(crate) fn ranked_outcomes(probs: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..probs.len()).collect();
    order.sort_by(|&a, &b| by_score_desc(probs[a], probs[b]));
    order
}

fn is_alive(score: f64, floor: f64) -> bool {
    !score.is_nan() && score >= floor
}

/// Decodificação gulosa: arg-max válido em cada posição.
pub fn greedy_decode<C, V>(
    model: &MaxentModel,
    len: usize,
    contexts: &C,
    validator: &V,
    config: &DecoderConfig,
) -> Result<Sequence>
where
    C: ContextGenerator + ?Sized,
    V: SequenceValidator + ?Sized,
{
    let mut sequence = Sequence::empty();
    for i in 0..len {
        let context = contexts.context(i, &sequence.outcomes);
        let probs = model.eval(&context);
        let choice = ranked_outcomes(&probs)
            .into_iter()
            .find(|&o| validator.valid(i, &sequence.outcomes, &model.outcomes()[o]));
        let Some(o) = choice else {
            warn!(position = i, "nenhum outcome válido na decodificação gulosa");
            return Err(NlpError::decode_underflow(format!(
                "nenhum outcome válido na posição {i}"
            )));
        };
        sequence = sequence.extended(&model.outcomes()[o], probs[o]);
        if !is_alive(sequence.score, config.min_log_score) {
            warn!(position = i, score = sequence.score, "sequência abaixo do piso");
            return Err(NlpError::decode_underflow(format!(
                "score {} abaixo do piso {} na posição {i}",
                sequence.score, config.min_log_score
            )));
        }
    }
    Ok(sequence)
}

/// Beam search sobre um [`MaxentModel`].
#[derive(Debug, Clone, Copy)]
pub struct BeamSearch<'m> {
    model: &'m MaxentModel,
    config: DecoderConfig,
}

impl<'m> BeamSearch<'m> {
    pub fn new(model: &'m MaxentModel, config: DecoderConfig) -> Self {
        Self { model, config }
    }

    pub fn beam_size(&self) -> usize {
        self.config.beam_size.max(1)
    }

    /// Melhor sequência de tamanho `len`.
    pub fn best_sequence<C, V>(&self, len: usize, contexts: &C, validator: &V) -> Result<Sequence>
    where
        C: ContextGenerator + ?Sized,
        V: SequenceValidator + ?Sized,
    {
        if self.beam_size() == 1 {
            return greedy_decode(self.model, len, contexts, validator, &self.config);
        }
        let mut best = self.best_sequences(1, len, contexts, validator)?;
        best.pop()
            .ok_or_else(|| NlpError::decode_underflow("beam vazio"))
    }

    /// Até `k` melhores sequências completas, melhor primeiro.
    ///
    /// A largura do beam vem só da configuração; `k` apenas limita quantas
    /// sequências finais são devolvidas, então nunca passam de `beam_size`.
    pub fn best_sequences<C, V>(
        &self,
        k: usize,
        len: usize,
        contexts: &C,
        validator: &V,
    ) -> Result<Vec<Sequence>>
    where
        C: ContextGenerator + ?Sized,
        V: SequenceValidator + ?Sized,
    {
        let beam_size = self.beam_size();
        let outcomes = self.model.outcomes();
        let mut beam = vec![Sequence::empty()];

        for i in 0..len {
            let mut next: Vec<Sequence> =
                Vec::with_capacity(beam.len().saturating_mul(beam_size.min(outcomes.len())));

            for seq in &beam {
                let context = contexts.context(i, &seq.outcomes);
                let probs = self.model.eval(&context);
                let ranked = ranked_outcomes(&probs);

                let before = next.len();
                for &o in ranked.iter().take(beam_size) {
                    if validator.valid(i, &seq.outcomes, &outcomes[o]) {
                        next.push(seq.extended(&outcomes[o], probs[o]));
                    }
                }
                if next.len() == before {
                    // nenhum dos K melhores é válido: tenta todos os outcomes
                    for &o in ranked.iter().skip(beam_size) {
                        if validator.valid(i, &seq.outcomes, &outcomes[o]) {
                            next.push(seq.extended(&outcomes[o], probs[o]));
                        }
                    }
                }
            }

            next.retain(|s| is_alive(s.score, self.config.min_log_score));
            if next.is_empty() {
                warn!(
                    position = i,
                    floor = self.config.min_log_score,
                    "todas as sequências do beam foram descartadas"
                );
                return Err(NlpError::decode_underflow(format!(
                    "beam vazio na posição {i} de {len}"
                )));
            }
            next.sort_by(|a, b| by_score_desc(a.score, b.score));
            next.truncate(beam_size);
            trace!(position = i, live = next.len(), best = next[0].score, "passo do beam");
            beam = next;
        }

        beam.truncate(k.clamp(1, beam_size));
        Ok(beam)
    }
}
