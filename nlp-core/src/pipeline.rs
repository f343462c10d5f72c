//! # Pipeline de Documento — Orquestrador com Eventos Observáveis
//!
//! Encadeia os estágios sobre um texto bruto:
//!
//! ```text
//! texto → sentenças → tokens → tags POS → chunks → nomes
//! ```
//!
//! Cada etapa emite um [`PipelineEvent`] por um canal `mpsc`, para que quem
//! chama acompanhe o progresso sentença a sentença. [`NlpPipeline::analyze`]
//! é a versão síncrona que apenas devolve o [`AnalyzedDocument`].
//!
//! Os modelos são compartilhados via `Arc`; o pipeline em si guarda estado
//! por chamada (probabilidades, histórico adaptativo) e por isso cada thread
//! usa o seu clone. [`NlpPipeline::analyze_batch`] faz isso com `rayon`.

use std::sync::mpsc;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::builtin;
use crate::chunker::Chunker;
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::model::Model;
use crate::namefind::NameFinder;
use crate::postag::PosTagger;
use crate::sentence::SentenceDetector;
use crate::span::{bio_to_spans, Span};
use crate::tokenizer::{tokens_from_spans, Token, Tokenizer};

/// Modelos usados por um [`NlpPipeline`].
#[derive(Debug, Clone)]
pub struct PipelineModels {
    pub sentence: Arc<Model>,
    /// Obrigatório apenas no modo de tokenização `maxent`.
    pub tokenizer: Option<Arc<Model>>,
    pub pos: Arc<Model>,
    pub chunker: Arc<Model>,
    pub name_finder: Arc<Model>,
}

impl PipelineModels {
    /// Modelos embutidos em inglês.
    pub fn builtin() -> Self {
        Self {
            sentence: Arc::new(builtin::sentence_model()),
            tokenizer: Some(Arc::new(builtin::tokenizer_model())),
            pos: Arc::new(builtin::pos_model()),
            chunker: Arc::new(builtin::chunker_model()),
            name_finder: Arc::new(builtin::name_finder_model()),
        }
    }
}

/// Eventos emitidos durante o processamento de um documento.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PipelineEvent {
    /// Sentenças encontradas (spans de byte no documento).
    SentencesDetected { sentences: Vec<Span>, total: usize },
    /// Tokens de uma sentença, com offsets no documento.
    Tokenized { sentence: usize, tokens: Vec<Token> },
    /// Tags POS de uma sentença.
    Tagged {
        sentence: usize,
        tags: Vec<String>,
        probs: Vec<f64>,
    },
    /// Chunks de uma sentença (spans de índices de token).
    Chunked { sentence: usize, chunks: Vec<Span> },
    /// Nomes de uma sentença (spans de índices de token).
    NamesFound { sentence: usize, names: Vec<Span> },
    /// Documento concluído.
    Done {
        sentences: usize,
        tokens: usize,
        processing_ms: u64,
    },
    /// Um estágio falhou; nenhum evento segue.
    Error { message: String },
}

/// Resultado de todos os estágios para uma sentença.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedSentence {
    /// Span de byte da sentença no documento.
    pub span: Span,
    pub tokens: Vec<Token>,
    pub tags: Vec<String>,
    pub tag_probs: Vec<f64>,
    pub chunks: Vec<String>,
    pub chunk_probs: Vec<f64>,
    pub names: Vec<Span>,
}

impl AnalyzedSentence {
    /// Chunks agrupados em spans de índices de token.
    pub fn chunk_spans(&self) -> Vec<Span> {
        bio_to_spans(&self.chunks, Some(self.chunk_probs.as_slice()))
    }

    pub fn token_texts(&self) -> Vec<&str> {
        self.tokens.iter().map(|t| t.text.as_str()).collect()
    }
}

/// Documento analisado.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalyzedDocument {
    pub sentences: Vec<AnalyzedSentence>,
}

impl AnalyzedDocument {
    pub fn num_tokens(&self) -> usize {
        self.sentences.iter().map(|s| s.tokens.len()).sum()
    }

    /// Texto de cada nome encontrado, com o tipo.
    pub fn names(&self) -> Vec<(String, String)> {
        self.sentences
            .iter()
            .flat_map(|s| {
                s.names.iter().filter_map(move |n| {
                    let text = n.covered_tokens(&s.token_texts())?;
                    Some((text, n.label().unwrap_or("").to_string()))
                })
            })
            .collect()
    }
}

/// Pipeline completo de análise de documentos.
#[derive(Debug, Clone)]
pub struct NlpPipeline {
    sentence: SentenceDetector,
    tokenizer: Tokenizer,
    tagger: PosTagger,
    chunker: Chunker,
    name_finder: NameFinder,
}

impl NlpPipeline {
    pub fn new(models: PipelineModels, config: &PipelineConfig) -> Result<Self> {
        Ok(Self {
            sentence: SentenceDetector::new(models.sentence, config.sentence.clone())?,
            tokenizer: Tokenizer::from_config(models.tokenizer, config.tokenizer)?,
            tagger: PosTagger::new(models.pos, config.pos)?,
            chunker: Chunker::new(models.chunker, config.chunker)?,
            name_finder: NameFinder::new(models.name_finder, config.name_finder)?,
        })
    }

    /// Pipeline com os modelos embutidos e configuração padrão.
    pub fn builtin() -> Result<Self> {
        Self::new(PipelineModels::builtin(), &PipelineConfig::default())
    }

    /// Processa o documento e devolve o resultado final.
    pub fn analyze(&mut self, text: &str) -> Result<AnalyzedDocument> {
        self.run(text, None)
    }

    /// Processa o documento emitindo eventos de progresso em `tx`.
    ///
    /// # Fluxo de Eventos
    /// 1. `SentencesDetected`
    /// 2. por sentença: `Tokenized`, `Tagged`, `Chunked`, `NamesFound`
    /// 3. `Done` (ou `Error`, se algum estágio falhar)
    pub fn analyze_streaming(
        &mut self,
        text: &str,
        tx: &mpsc::Sender<PipelineEvent>,
    ) -> Result<AnalyzedDocument> {
        let result = self.run(text, Some(tx));
        if let Err(e) = &result {
            let _ = tx.send(PipelineEvent::Error {
                message: e.to_string(),
            });
        }
        result
    }

    /// Processa documentos independentes em paralelo, um clone do pipeline
    /// por worker. A ordem dos resultados segue a da entrada.
    pub fn analyze_batch<S: AsRef<str> + Sync>(&self, texts: &[S]) -> Vec<Result<AnalyzedDocument>> {
        texts
            .par_iter()
            .map_init(|| self.clone(), |pipeline, text| pipeline.analyze(text.as_ref()))
            .collect()
    }

    fn run(&mut self, text: &str, tx: Option<&mpsc::Sender<PipelineEvent>>) -> Result<AnalyzedDocument> {
        let start = Instant::now();
        let emit = |event: PipelineEvent| {
            if let Some(tx) = tx {
                let _ = tx.send(event);
            }
        };

        // Cada documento começa sem histórico adaptativo.
        self.name_finder.clear_adaptive_data();

        // === Passo 1: Sentenças ===
        let sentence_spans = self.sentence.sent_pos_detect(text)?;
        emit(PipelineEvent::SentencesDetected {
            sentences: sentence_spans.clone(),
            total: sentence_spans.len(),
        });

        let mut document = AnalyzedDocument::default();
        for (index, span) in sentence_spans.into_iter().enumerate() {
            let Some(sentence_text) = span.covered_text(text) else {
                continue;
            };

            // === Passo 2: Tokens ===
            let token_spans = self.tokenizer.tokenize_pos(sentence_text)?;
            let tokens = tokens_from_spans(sentence_text, &token_spans, span.start);
            if tokens.is_empty() {
                continue;
            }
            emit(PipelineEvent::Tokenized {
                sentence: index,
                tokens: tokens.clone(),
            });
            let words: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();

            // === Passo 3: POS ===
            let (tags, tag_probs) = self.tagger.tag_with_probs(&words)?;
            emit(PipelineEvent::Tagged {
                sentence: index,
                tags: tags.clone(),
                probs: tag_probs.clone(),
            });

            // === Passo 4: Chunks ===
            let (chunks, chunk_probs) = self.chunker.chunk_with_probs(&words, &tags)?;
            emit(PipelineEvent::Chunked {
                sentence: index,
                chunks: bio_to_spans(&chunks, Some(chunk_probs.as_slice())),
            });

            // === Passo 5: Nomes ===
            let names = self.name_finder.find(&words)?;
            emit(PipelineEvent::NamesFound {
                sentence: index,
                names: names.clone(),
            });

            debug!(sentence = index, tokens = tokens.len(), names = names.len(), "sentença processada");
            document.sentences.push(AnalyzedSentence {
                span,
                tokens,
                tags,
                tag_probs,
                chunks,
                chunk_probs,
                names,
            });
        }

        emit(PipelineEvent::Done {
            sentences: document.sentences.len(),
            tokens: document.num_tokens(),
            processing_ms: start.elapsed().as_millis() as u64,
        });
        Ok(document)
    }
}
