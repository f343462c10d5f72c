//! # Configuração do Pipeline
//!
//! Todas as opções ajustáveis dos estágios ficam em structs simples,
//! serializáveis com `serde`. Campos ausentes no JSON assumem o valor padrão,
//! seguindo os valores usuais de MaxEnt para NLP (beam de 10 para
//! decodificadores de sequência, beam de 20 e massa 0.95 para o parser).
//!
//! ```rust
//! use nlp_core::config::PipelineConfig;
//!
//! let config = PipelineConfig::from_json(r#"{ "pos": { "beam_size": 3 } }"#).unwrap();
//! assert_eq!(config.pos.beam_size, 3);
//! assert_eq!(config.chunker.beam_size, 10);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::tokenizer::TokenizerMode;

/// Beam padrão dos decodificadores de sequência.
pub const DEFAULT_BEAM_SIZE: usize = 10;

/// Log-probabilidade abaixo da qual uma sequência parcial é descartada.
pub const DEFAULT_MIN_LOG_SCORE: f64 = -100_000.0;

/// Parâmetros do decodificador de sequências (greedy ou beam search).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Largura K do beam. `1` equivale a decodificação gulosa.
    pub beam_size: usize,
    /// Piso da log-probabilidade acumulada de uma sequência parcial.
    pub min_log_score: f64,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            beam_size: DEFAULT_BEAM_SIZE,
            min_log_score: DEFAULT_MIN_LOG_SCORE,
        }
    }
}

/// Configuração do detector de sentenças.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentenceConfig {
    /// Caracteres candidatos a fim de sentença.
    pub eos_chars: Vec<char>,
}

impl Default for SentenceConfig {
    fn default() -> Self {
        Self {
            eos_chars: vec!['.', '!', '?'],
        }
    }
}

/// Configuração do tokenizador.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    pub mode: TokenizerMode,
    /// Tokens puramente alfanuméricos nunca são divididos pelo classificador.
    pub alphanumeric_optimization: bool,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            mode: TokenizerMode::Maxent,
            alphanumeric_optimization: true,
        }
    }
}

/// Configuração do localizador de nomes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NameFinderConfig {
    #[serde(flatten)]
    pub decoder: DecoderConfig,
    /// Se ligado, resultados de chamadas anteriores alimentam a feature `pd=`
    /// até `clear_adaptive_data()`.
    pub adaptive: bool,
}

impl Default for NameFinderConfig {
    fn default() -> Self {
        Self {
            decoder: DecoderConfig::default(),
            adaptive: false,
        }
    }
}

/// Configuração do parser por chunks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Número de derivações mantidas a cada avanço.
    pub beam_size: usize,
    /// Massa de probabilidade coberta pelas ações expandidas em cada passo.
    pub advance_percentage: f64,
    /// Decodificador usado nas etapas de POS e chunking internas.
    pub decoder: DecoderConfig,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            beam_size: 20,
            advance_percentage: 0.95,
            decoder: DecoderConfig::default(),
        }
    }
}

/// Configuração completa de um [`crate::pipeline::NlpPipeline`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub sentence: SentenceConfig,
    pub tokenizer: TokenizerConfig,
    pub pos: DecoderConfig,
    pub chunker: DecoderConfig,
    pub name_finder: NameFinderConfig,
    pub parser: ParserConfig,
}

impl PipelineConfig {
    /// Lê a configuração de um documento JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NlpError;

    #[test]
    fn test_defaults_match_library() {
        let config = PipelineConfig::default();
        assert_eq!(config.pos.beam_size, 10);
        assert_eq!(config.parser.beam_size, 20);
        assert!((config.parser.advance_percentage - 0.95).abs() < 1e-12);
        assert!(!config.name_finder.adaptive);
        assert_eq!(config.sentence.eos_chars, vec!['.', '!', '?']);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = PipelineConfig::from_json(
            r#"{ "name_finder": { "adaptive": true, "beam_size": 4 }, "tokenizer": { "mode": "simple" } }"#,
        )
        .unwrap();
        assert!(config.name_finder.adaptive);
        assert_eq!(config.name_finder.decoder.beam_size, 4);
        assert_eq!(config.tokenizer.mode, TokenizerMode::Simple);
        assert!(config.tokenizer.alphanumeric_optimization);
    }

    #[test]
    fn test_unknown_mode_is_error() {
        let err = PipelineConfig::from_json(r#"{ "tokenizer": { "mode": "bpe" } }"#).unwrap_err();
        assert!(matches!(err, NlpError::Json(_)));
    }

    #[test]
    fn test_json_roundtrip() {
        let mut config = PipelineConfig::default();
        config.chunker.beam_size = 3;
        let json = config.to_json().unwrap();
        assert_eq!(PipelineConfig::from_json(&json).unwrap(), config);
    }
}
