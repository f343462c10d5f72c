//! # Treinamento de Modelos MaxEnt
//!
//! Treinador em memória para [`MaxentModel`] a partir de eventos
//! `(outcome, contexto)`. Não define formato de arquivo de treino: quem chama
//! produz os eventos com os mesmos geradores de contexto usados na predição.
//!
//! ## Algoritmo
//! - **Stochastic Gradient Descent (SGD)** sobre a log-verossimilhança.
//! - Regularização L2 (Ridge) aplicada apenas aos pesos das features ativas.
//! - *Cutoff*: predicados vistos menos de `cutoff` vezes são ignorados.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::{NlpError, Result};
use crate::maxent::{best_index, MaxentModel};

/// Um exemplo de treino: outcome correto e os predicados observados.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub outcome: String,
    pub context: Vec<String>,
}

impl Event {
    pub fn new<S: Into<String>>(outcome: impl Into<String>, context: impl IntoIterator<Item = S>) -> Self {
        Self {
            outcome: outcome.into(),
            context: context.into_iter().map(Into::into).collect(),
        }
    }
}

/// Hiperparâmetros do SGD.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainParams {
    /// Número de épocas (passadas completas pelos eventos).
    pub iterations: usize,
    /// Taxa de aprendizado ($\eta$).
    pub learning_rate: f64,
    /// Fator de regularização L2 ($\lambda$).
    pub lambda: f64,
    /// Frequência mínima de um predicado para entrar no modelo.
    pub cutoff: usize,
}

impl Default for TrainParams {
    fn default() -> Self {
        Self {
            iterations: 20,
            learning_rate: 0.1,
            lambda: 0.001,
            cutoff: 1,
        }
    }
}

/// Treina um modelo MaxEnt por SGD.
///
/// Para cada evento, calcula a distribuição atual e atualiza os pesos das
/// features ativas:
///
/// `w_new = w_old + rate * ((indicador - prob) - lambda * w_old)`
///
/// A ordem dos outcomes no modelo final é a ordem de primeira aparição nos
/// eventos, o que torna o resultado determinístico.
pub fn train(events: &[Event], params: TrainParams) -> Result<MaxentModel> {
    if events.is_empty() {
        return Err(NlpError::invalid_input("nenhum evento de treino"));
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for event in events {
        let unique: HashSet<&str> = event.context.iter().map(String::as_str).collect();
        for pred in unique {
            *counts.entry(pred).or_insert(0) += 1;
        }
    }

    let mut outcomes: Vec<&str> = Vec::new();
    for event in events {
        if !outcomes.contains(&event.outcome.as_str()) {
            outcomes.push(&event.outcome);
        }
    }

    let mut model = MaxentModel::new(outcomes.iter().copied());
    // (predicado, outcome) -> peso, mantido fora do modelo durante o treino
    let mut weights: HashMap<(String, usize), f64> = HashMap::new();

    for epoch in 0..params.iterations {
        let mut correct = 0usize;

        for event in events {
            let active: Vec<&str> = event
                .context
                .iter()
                .map(String::as_str)
                .filter(|p| counts.get(p).copied().unwrap_or(0) >= params.cutoff)
                .collect();

            // Forward: scores e softmax com os pesos atuais
            let mut scores = vec![0.0f64; outcomes.len()];
            for pred in &active {
                for (oid, score) in scores.iter_mut().enumerate() {
                    if let Some(w) = weights.get(&(pred.to_string(), oid)) {
                        *score += w;
                    }
                }
            }
            let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
            let sum: f64 = exps.iter().sum();
            let probs: Vec<f64> = exps.iter().map(|e| e / sum).collect();

            let true_oid = outcomes
                .iter()
                .position(|o| *o == event.outcome)
                .unwrap_or_default();
            if best_index(&probs) == true_oid {
                correct += 1;
            }

            // Backward: SGD com L2
            for (oid, prob) in probs.iter().enumerate() {
                let indicator = if oid == true_oid { 1.0 } else { 0.0 };
                let error = indicator - prob;
                if error.abs() <= 1e-6 {
                    continue;
                }
                for pred in &active {
                    let key = (pred.to_string(), oid);
                    let current = weights.get(&key).copied().unwrap_or(0.0);
                    let updated = current + params.learning_rate * (error - params.lambda * current);
                    if updated.abs() > 1e-9 {
                        weights.insert(key, updated);
                    } else {
                        weights.remove(&key);
                    }
                }
            }
        }

        debug!(
            epoch,
            accuracy = correct as f64 / events.len() as f64,
            "época de treino concluída"
        );
    }

    let mut entries: Vec<((String, usize), f64)> = weights.into_iter().collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    for ((pred, oid), w) in entries {
        model.set_weight(&pred, outcomes[oid], w);
    }
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events() -> Vec<Event> {
        vec![
            Event::new("NNP", ["w=pierre", "cap"]),
            Event::new("NNP", ["w=vinken", "cap"]),
            Event::new("VBZ", ["w=is", "suf=s"]),
            Event::new("NNS", ["w=years", "suf=s"]),
            Event::new("NNS", ["w=cities", "suf=s"]),
            Event::new("JJ", ["w=old"]),
        ]
    }

    #[test]
    fn test_train_learns_training_data() {
        let model = train(&events(), TrainParams { iterations: 50, ..TrainParams::default() }).unwrap();
        let probs = model.eval(&["w=pierre", "cap"]);
        assert_eq!(model.best_outcome(&probs), "NNP");
        let probs = model.eval(&["w=old"]);
        assert_eq!(model.best_outcome(&probs), "JJ");
    }

    #[test]
    fn test_outcome_order_is_first_appearance() {
        let model = train(&events(), TrainParams::default()).unwrap();
        assert_eq!(model.outcomes(), &["NNP", "VBZ", "NNS", "JJ"]);
    }

    #[test]
    fn test_cutoff_drops_rare_predicates() {
        let params = TrainParams { cutoff: 2, ..TrainParams::default() };
        let model = train(&events(), params).unwrap();
        assert_eq!(model.weight("w=old", "JJ"), 0.0);
        assert!(model.weight("cap", "NNP") > 0.0);
    }

    #[test]
    fn test_train_is_deterministic() {
        let a = train(&events(), TrainParams::default()).unwrap();
        let b = train(&events(), TrainParams::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_events() {
        assert!(matches!(
            train(&[], TrainParams::default()),
            Err(NlpError::InvalidInput(_))
        ));
    }
}
