//! # Localizador de Nomes
//!
//! Marca entidades nomeadas com rótulos BIO (`B-person`, `I-person`, `O`,
//! ...) via beam search e converte o resultado em spans de índices de token.
//!
//! ## Modo adaptativo
//!
//! Com `adaptive` ligado, o localizador lembra a última decisão tomada para
//! cada palavra do documento e a oferece como feature (`pd=`) nas próximas
//! sentenças. Assim "Vinken" reconhecido como pessoa no início do texto
//! ajuda a reconhecê-lo sozinho mais adiante. `clear_adaptive_data()` deve
//! ser chamado entre documentos.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::bio::BioValidator;
use crate::config::NameFinderConfig;
use crate::decoder::BeamSearch;
use crate::error::Result;
use crate::features::NameContext;
use crate::model::{Model, ModelKind, MAXENT_SECTION};
use crate::span::{bio_to_spans, Span};

/// Localizador de nomes MaxEnt.
#[derive(Debug, Clone)]
pub struct NameFinder {
    model: Arc<Model>,
    config: NameFinderConfig,
    adaptive_data: HashMap<String, String>,
    last_probs: Vec<f64>,
}

impl NameFinder {
    pub fn new(model: Arc<Model>, config: NameFinderConfig) -> Result<Self> {
        model.expect_kind(ModelKind::NameFinder)?;
        model.maxent(MAXENT_SECTION)?;
        Ok(Self {
            model,
            config,
            adaptive_data: HashMap::new(),
            last_probs: Vec::new(),
        })
    }

    /// Decodifica sem alterar o estado: spans de entidades e a probabilidade
    /// de cada rótulo escolhido.
    pub fn find_with_probs<S: AsRef<str>>(&self, tokens: &[S]) -> Result<(Vec<Span>, Vec<f64>)> {
        let (spans, _, probs) = self.decode(tokens)?;
        Ok((spans, probs))
    }

    fn decode<S: AsRef<str>>(&self, tokens: &[S]) -> Result<(Vec<Span>, Vec<String>, Vec<f64>)> {
        if tokens.is_empty() {
            return Ok((Vec::new(), Vec::new(), Vec::new()));
        }
        let maxent = self.model.maxent(MAXENT_SECTION)?;
        let previous = self.config.adaptive.then_some(&self.adaptive_data);
        let contexts = NameContext::new(tokens, self.model.dictionary(), previous);
        let best = BeamSearch::new(maxent, self.config.decoder).best_sequence(
            tokens.len(),
            &contexts,
            &BioValidator,
        )?;
        let (labels, probs) = best.into_parts();
        let spans = bio_to_spans(&labels, Some(probs.as_slice()));
        debug!(tokens = tokens.len(), names = spans.len(), "nomes localizados");
        Ok((spans, labels, probs))
    }

    /// Localiza os nomes da sentença. No modo adaptativo, as decisões
    /// alimentam as sentenças seguintes.
    pub fn find<S: AsRef<str>>(&mut self, tokens: &[S]) -> Result<Vec<Span>> {
        let (spans, labels, probs) = self.decode(tokens)?;
        if self.config.adaptive {
            for (token, label) in tokens.iter().zip(labels) {
                self.adaptive_data.insert(token.as_ref().to_string(), label);
            }
        }
        self.last_probs = probs;
        Ok(spans)
    }

    /// Probabilidades por token da última chamada a `find`.
    pub fn probs(&self) -> &[f64] {
        &self.last_probs
    }

    /// Probabilidade média de cada span, na ordem dos spans.
    pub fn span_probs(&self, spans: &[Span]) -> Vec<f64> {
        spans.iter().map(|s| s.prob).collect()
    }

    /// Esquece o histórico do documento atual.
    pub fn clear_adaptive_data(&mut self) {
        self.adaptive_data.clear();
    }

    pub fn is_adaptive(&self) -> bool {
        self.config.adaptive
    }
}
