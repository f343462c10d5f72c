//! # nlp-core — Pipeline Estatístico de PLN baseado em Máxima Entropia
//!
//! Este crate implementa os estágios clássicos de um toolkit de PLN, todos
//! dirigidos por modelos de Máxima Entropia (MaxEnt) carregados de um
//! contêiner binário:
//!
//! ## Arquitetura do Sistema
//!
//! 1.  **Modelos** ([`loader`], [`model`], [`maxent`]): contêiner `MXNT` com
//!     seções de pesos GIS e dados auxiliares (dicionário de tags,
//!     abreviações, dicionário de entidades).
//! 2.  **Decodificação** ([`decoder`]): busca gulosa e beam search em
//!     log-espaço, com validadores de sequência ([`bio`]).
//! 3.  **Estágios**:
//!     *   **Sentenças** ([`sentence`]): decide em cada `.`, `!`, `?` se há fronteira.
//!     *   **Tokens** ([`tokenizer`]): decide em cada fronteira de grafema se há corte.
//!     *   **POS** ([`postag`]): tags Penn Treebank restritas pelo dicionário de tags.
//!     *   **Chunks** ([`chunker`]): sintagmas não recursivos em BIO.
//!     *   **Nomes** ([`namefind`]): entidades como spans de tokens.
//!     *   **Parsing** ([`parser`]): árvores completas por shift-reduce sobre chunks.
//! 4.  **Saída**: [`pipeline::AnalyzedDocument`] ou eventos [`PipelineEvent`].
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use nlp_core::NlpPipeline;
//!
//! let mut pipeline = NlpPipeline::builtin().unwrap();
//! let doc = pipeline.analyze("Pierre Vinken is 61 years old.").unwrap();
//!
//! for sentence in &doc.sentences {
//!     println!("{:?} {:?}", sentence.token_texts(), sentence.tags);
//! }
//! for (text, kind) in doc.names() {
//!     println!("Entidade: {text} ({kind})");
//! }
//! ```
//!
//! ## Módulos Principais
//!
//! - [`pipeline`]: Orquestrador que conecta todos os estágios.
//! - [`builtin`]: Modelos pequenos em inglês, prontos para uso e testes.
//! - [`trainer`]: Treino GIS para produzir novos modelos.

pub mod bio;
pub mod builtin;
pub mod chunker;
pub mod config;
pub mod decoder;
pub mod error;
pub mod features;
pub mod loader;
pub mod maxent;
pub mod model;
pub mod namefind;
pub mod parse;
pub mod parser;
pub mod pipeline;
pub mod postag;
pub mod sentence;
pub mod span;
pub mod tokenizer;
pub mod trainer;

pub use chunker::Chunker;
pub use config::{DecoderConfig, NameFinderConfig, ParserConfig, PipelineConfig, SentenceConfig, TokenizerConfig};
pub use error::{NlpError, Result};
pub use loader::{load_model, model_to_bytes, read_model, write_model};
pub use maxent::MaxentModel;
pub use model::{Model, ModelKind};
pub use namefind::NameFinder;
pub use parse::ParseTree;
pub use parser::{parse_line, Parser};
pub use pipeline::{AnalyzedDocument, AnalyzedSentence, NlpPipeline, PipelineEvent, PipelineModels};
pub use postag::PosTagger;
pub use sentence::SentenceDetector;
pub use span::Span;
pub use tokenizer::{Token, Tokenizer, TokenizerMode};
