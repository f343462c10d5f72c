//! # Classificador de Máxima Entropia (MaxEnt)
//!
//! Classificador discriminativo log-linear compartilhado por todos os estágios.
//! Cada estágio converte seu contexto em um conjunto de *predicados* (strings
//! como `"w=the"` ou `"suf=ing"`) e o modelo devolve uma distribuição sobre os
//! outcomes (tags, decisões de fronteira, ações do parser).
//!
//! ## Algoritmo
//!
//! ```text
//! score(o) = Σ_{p ∈ contexto} w(p, o) / C
//! P(o | contexto) = exp(score(o) - max) / Σ_o' exp(score(o') - max)
//! ```
//!
//! Predicados ausentes da tabela contribuem com zero. `C` é a constante de
//! correção do formato GIS (1 quando o modelo não declara outra). A subtração do
//! máximo antes da exponenciação evita overflow.
//!
//! O layout dos pesos segue o do formato GIS: cada predicado guarda apenas os
//! outcomes para os quais tem peso (`Context`), o que mantém a tabela esparsa.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{NlpError, Result};

/// Parâmetros de um predicado: outcomes ativos e o peso de cada um.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Context {
    pub outcomes: Vec<usize>,
    pub parameters: Vec<f64>,
}

impl Context {
    fn set(&mut self, outcome: usize, weight: f64) {
        match self.outcomes.iter().position(|&o| o == outcome) {
            Some(pos) => self.parameters[pos] = weight,
            None => {
                self.outcomes.push(outcome);
                self.parameters.push(weight);
            }
        }
    }
}

/// Distribuição de probabilidade ordenada pelos outcomes do modelo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub outcomes: Vec<(String, f64)>,
}

impl Distribution {
    /// Outcome de maior probabilidade (empates: primeiro na ordem do modelo).
    pub fn best(&self) -> Option<(&str, f64)> {
        let mut best: Option<(&str, f64)> = None;
        for (outcome, prob) in &self.outcomes {
            if best.map(|(_, p)| *prob > p).unwrap_or(true) {
                best = Some((outcome.as_str(), *prob));
            }
        }
        best
    }

    pub fn prob(&self, outcome: &str) -> Option<f64> {
        self.outcomes
            .iter()
            .find(|(o, _)| o == outcome)
            .map(|(_, p)| *p)
    }

    pub fn total(&self) -> f64 {
        self.outcomes.iter().map(|(_, p)| p).sum()
    }
}

/// Modelo de Máxima Entropia imutável após a construção.
///
/// $$ P(y|x) = \frac{\exp(\sum_i w_i \cdot f_i(x,y))}{Z(x)} $$
#[derive(Debug, Clone, PartialEq)]
pub struct MaxentModel {
    outcomes: Vec<String>,
    outcome_index: HashMap<String, usize>,
    predicates: Vec<String>,
    pmap: HashMap<String, usize>,
    params: Vec<Context>,
    correction_constant: f64,
    correction_param: f64,
}

impl MaxentModel {
    /// Cria um modelo sem pesos com os outcomes dados (ordem preservada).
    pub fn new<S: Into<String>>(outcomes: impl IntoIterator<Item = S>) -> Self {
        let mut model = Self {
            outcomes: Vec::new(),
            outcome_index: HashMap::new(),
            predicates: Vec::new(),
            pmap: HashMap::new(),
            params: Vec::new(),
            correction_constant: 1.0,
            correction_param: 0.0,
        };
        for outcome in outcomes {
            model.ensure_outcome(&outcome.into());
        }
        model
    }

    /// Monta um modelo a partir das tabelas lidas de um stream, validando
    /// que todas as dimensões batem com o número de outcomes declarado.
    pub fn from_parts(
        outcomes: Vec<String>,
        predicates: Vec<String>,
        params: Vec<Context>,
        correction_constant: f64,
        correction_param: f64,
    ) -> Result<Self> {
        if outcomes.is_empty() {
            return Err(NlpError::corrupt_model("modelo sem outcomes"));
        }
        if predicates.len() != params.len() {
            return Err(NlpError::corrupt_model(format!(
                "{} predicados para {} contextos de parâmetros",
                predicates.len(),
                params.len()
            )));
        }
        if !(correction_constant > 0.0) || !correction_constant.is_finite() {
            return Err(NlpError::corrupt_model(format!(
                "constante de correção inválida: {correction_constant}"
            )));
        }
        for (pred, ctx) in predicates.iter().zip(&params) {
            if ctx.outcomes.len() != ctx.parameters.len() {
                return Err(NlpError::corrupt_model(format!(
                    "predicado '{pred}': {} outcomes e {} pesos",
                    ctx.outcomes.len(),
                    ctx.parameters.len()
                )));
            }
            if let Some(bad) = ctx.parameters.iter().find(|w| !w.is_finite()) {
                return Err(NlpError::corrupt_model(format!(
                    "predicado '{pred}' com peso não finito: {bad}"
                )));
            }
            if let Some(&bad) = ctx.outcomes.iter().find(|&&o| o >= outcomes.len()) {
                return Err(NlpError::corrupt_model(format!(
                    "predicado '{pred}' referencia outcome {bad} de {}",
                    outcomes.len()
                )));
            }
        }

        let outcome_index = outcomes
            .iter()
            .enumerate()
            .map(|(i, o)| (o.clone(), i))
            .collect::<HashMap<_, _>>();
        if outcome_index.len() != outcomes.len() {
            return Err(NlpError::corrupt_model("outcomes duplicados"));
        }
        let pmap = predicates
            .iter()
            .enumerate()
            .map(|(i, p)| (p.clone(), i))
            .collect::<HashMap<_, _>>();
        if pmap.len() != predicates.len() {
            return Err(NlpError::corrupt_model("predicados duplicados"));
        }

        Ok(Self {
            outcomes,
            outcome_index,
            predicates,
            pmap,
            params,
            correction_constant,
            correction_param,
        })
    }

    fn ensure_outcome(&mut self, outcome: &str) -> usize {
        if let Some(&idx) = self.outcome_index.get(outcome) {
            return idx;
        }
        let idx = self.outcomes.len();
        self.outcomes.push(outcome.to_string());
        self.outcome_index.insert(outcome.to_string(), idx);
        idx
    }

    /// Define o peso `w(predicate, outcome)`. Outcomes desconhecidos são
    /// acrescentados ao final da lista.
    pub fn set_weight(&mut self, predicate: &str, outcome: &str, weight: f64) {
        let oid = self.ensure_outcome(outcome);
        let pid = match self.pmap.get(predicate) {
            Some(&pid) => pid,
            None => {
                let pid = self.predicates.len();
                self.predicates.push(predicate.to_string());
                self.pmap.insert(predicate.to_string(), pid);
                self.params.push(Context::default());
                pid
            }
        };
        self.params[pid].set(oid, weight);
    }

    /// Peso atual de `(predicate, outcome)` (zero se ausente).
    pub fn weight(&self, predicate: &str, outcome: &str) -> f64 {
        let (Some(&pid), Some(&oid)) = (self.pmap.get(predicate), self.outcome_index.get(outcome))
        else {
            return 0.0;
        };
        let ctx = &self.params[pid];
        ctx.outcomes
            .iter()
            .position(|&o| o == oid)
            .map(|pos| ctx.parameters[pos])
            .unwrap_or(0.0)
    }

    /// Calcula a distribuição sobre os outcomes para um contexto.
    ///
    /// O vetor devolvido está alinhado com [`MaxentModel::outcomes`].
    pub fn eval<S: AsRef<str>>(&self, context: &[S]) -> Vec<f64> {
        let mut scores = vec![0.0f64; self.outcomes.len()];
        for predicate in context {
            if let Some(&pid) = self.pmap.get(predicate.as_ref()) {
                let ctx = &self.params[pid];
                for (&oid, &w) in ctx.outcomes.iter().zip(&ctx.parameters) {
                    scores[oid] += w;
                }
            }
        }
        softmax(&mut scores, self.correction_constant);
        scores
    }

    /// Igual a [`MaxentModel::eval`], mas com os nomes dos outcomes.
    pub fn distribution<S: AsRef<str>>(&self, context: &[S]) -> Distribution {
        let probs = self.eval(context);
        Distribution {
            outcomes: self.outcomes.iter().cloned().zip(probs).collect(),
        }
    }

    /// Outcome de maior probabilidade; empates resolvidos pela ordem do modelo.
    pub fn best_outcome(&self, probs: &[f64]) -> &str {
        &self.outcomes[best_index(probs)]
    }

    /// Representação legível `outcome[prob] ...` para depuração.
    pub fn all_outcomes(&self, probs: &[f64]) -> String {
        self.outcomes
            .iter()
            .zip(probs)
            .map(|(o, p)| format!("{o}[{p:.4}]"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn outcome(&self, index: usize) -> Option<&str> {
        self.outcomes.get(index).map(String::as_str)
    }

    pub fn index_of(&self, outcome: &str) -> Option<usize> {
        self.outcome_index.get(outcome).copied()
    }

    pub fn outcomes(&self) -> &[String] {
        &self.outcomes
    }

    pub fn num_outcomes(&self) -> usize {
        self.outcomes.len()
    }

    pub fn predicates(&self) -> &[String] {
        &self.predicates
    }

    pub fn num_predicates(&self) -> usize {
        self.predicates.len()
    }

    /// Parâmetros do i-ésimo predicado (na ordem de [`MaxentModel::predicates`]).
    pub fn params(&self, predicate_index: usize) -> Option<&Context> {
        self.params.get(predicate_index)
    }

    /// Pares `(predicado, parâmetros)` na ordem interna.
    pub fn contexts(&self) -> impl Iterator<Item = (&str, &Context)> {
        self.predicates.iter().map(String::as_str).zip(&self.params)
    }

    pub fn correction_constant(&self) -> f64 {
        self.correction_constant
    }

    pub fn correction_param(&self) -> f64 {
        self.correction_param
    }
}

/// Índice do maior valor; em empate vence o primeiro.
pub fn best_index(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Softmax in-place com subtração do máximo.
///
/// Scores infinitos não produzem NaN: se algum outcome chega a `+inf`, a massa
/// é dividida igualmente entre esses outcomes; se todos são `-inf` (ou NaN), a
/// distribuição é uniforme.
fn softmax(scores: &mut [f64], correction_constant: f64) {
    if scores.is_empty() {
        return;
    }
    let inverse = 1.0 / correction_constant;
    for s in scores.iter_mut() {
        *s = if s.is_nan() { f64::NEG_INFINITY } else { *s * inverse };
    }
    let max_score = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if max_score.is_infinite() {
        let winners = scores.iter().filter(|&&s| s == max_score).count();
        let (target, share) = if max_score > 0.0 {
            (Some(max_score), 1.0 / winners as f64)
        } else {
            (None, 1.0 / scores.len() as f64)
        };
        for s in scores.iter_mut() {
            *s = match target {
                Some(t) if *s != t => 0.0,
                _ => share,
            };
        }
        return;
    }

    let mut sum = 0.0;
    for s in scores.iter_mut() {
        *s = (*s - max_score).exp();
        sum += *s;
    }
    for s in scores.iter_mut() {
        *s /= sum;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_model() -> MaxentModel {
        let mut model = MaxentModel::new(["s", "n"]);
        model.set_weight("eos=.", "s", 1.0);
        model.set_weight("ncap", "s", 2.0);
        model.set_weight("xabbrev", "n", 4.0);
        model.set_weight("bias", "n", 0.5);
        model
    }

    #[test]
    fn test_eval_is_normalized() {
        let model = toy_model();
        for ctx in [
            vec!["eos=.", "ncap", "bias"],
            vec!["xabbrev", "bias"],
            vec![],
            vec!["unknown"],
        ] {
            let probs = model.eval(&ctx);
            let sum: f64 = probs.iter().sum();
            assert!((sum - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_eval_matches_softmax() {
        let model = toy_model();
        let probs = model.eval(&["eos=.", "ncap", "bias"]);
        let expected_s = 3.0f64.exp() / (3.0f64.exp() + 0.5f64.exp());
        assert!((probs[0] - expected_s).abs() < 1e-12);
        assert_eq!(model.best_outcome(&probs), "s");
    }

    #[test]
    fn test_absent_predicates_give_uniform() {
        let model = toy_model();
        let probs = model.eval(&["nothing"]);
        assert!((probs[0] - 0.5).abs() < 1e-12);
        // empate: vence o primeiro outcome
        assert_eq!(model.best_outcome(&probs), "s");
    }

    #[test]
    fn test_eval_is_deterministic() {
        let model = toy_model();
        let ctx = ["eos=.", "xabbrev", "bias"];
        let a = model.eval(&ctx);
        let b = model.eval(&ctx);
        assert_eq!(
            a.iter().map(|p| p.to_bits()).collect::<Vec<_>>(),
            b.iter().map(|p| p.to_bits()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_large_weights_do_not_overflow() {
        let mut model = MaxentModel::new(["a", "b"]);
        model.set_weight("huge", "a", 5000.0);
        let probs = model.eval(&["huge"]);
        assert!(probs.iter().all(|p| p.is_finite()));
        assert!((probs[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_correction_constant_scales_scores() {
        let mut model = toy_model();
        model.correction_constant = 2.0;
        let probs = model.eval(&["ncap"]);
        let expected = 1.0f64.exp() / (1.0f64.exp() + 1.0);
        assert!((probs[0] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_set_weight_overwrites_and_extends() {
        let mut model = toy_model();
        model.set_weight("ncap", "s", 7.0);
        assert_eq!(model.weight("ncap", "s"), 7.0);
        model.set_weight("new", "x", 1.0);
        assert_eq!(model.num_outcomes(), 3);
        assert_eq!(model.index_of("x"), Some(2));
    }

    #[test]
    fn test_from_parts_rejects_bad_outcome_index() {
        let err = MaxentModel::from_parts(
            vec!["a".into()],
            vec!["p".into()],
            vec![Context {
                outcomes: vec![3],
                parameters: vec![1.0],
            }],
            1.0,
            0.0,
        )
        .unwrap_err();
        assert!(matches!(err, NlpError::CorruptModel(_)));
    }

    #[test]
    fn test_from_parts_rejects_non_finite_weights() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = MaxentModel::from_parts(
                vec!["a".into(), "b".into()],
                vec!["p".into()],
                vec![Context {
                    outcomes: vec![0],
                    parameters: vec![bad],
                }],
                1.0,
                0.0,
            )
            .unwrap_err();
            assert!(matches!(err, NlpError::CorruptModel(_)), "peso {bad}");
        }
    }

    #[test]
    fn test_overflowing_scores_stay_normalized() {
        let mut model = MaxentModel::new(["a", "b", "c"]);
        model.set_weight("x", "a", 1e308);
        model.set_weight("y", "a", 1e308);
        model.set_weight("x", "b", 1e308);
        model.set_weight("y", "b", 1e308);
        let probs = model.eval(&["x", "y"]);
        assert!(probs.iter().all(|p| p.is_finite()));
        assert_eq!(probs, vec![0.5, 0.5, 0.0]);

        let mut model = MaxentModel::new(["a", "b"]);
        model.set_weight("x", "a", -1e308);
        model.set_weight("y", "a", -1e308);
        model.set_weight("x", "b", -1e308);
        model.set_weight("y", "b", -1e308);
        assert_eq!(model.eval(&["x", "y"]), vec![0.5, 0.5]);
    }

    #[test]
    fn test_distribution_best() {
        let model = toy_model();
        let dist = model.distribution(&["xabbrev"]);
        assert_eq!(dist.best().map(|(o, _)| o), Some("n"));
        assert!((dist.total() - 1.0).abs() < 1e-9);
        assert!(dist.prob("s").is_some());
    }
}
