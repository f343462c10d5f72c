//! # Pacote de Modelo
//!
//! Um [`Model`] agrega tudo o que um estágio precisa para rodar:
//! - um ou mais classificadores [`MaxentModel`] (seções nomeadas);
//! - dados auxiliares do estágio: dicionário de tags (POS), lista de
//!   abreviações (sentenças) e dicionário de entidades (nomes);
//! - um manifesto `chave -> valor` (idioma, tipo de parser, ...).
//!
//! O modelo é imutável depois de carregado e é compartilhado entre pipelines
//! via `Arc<Model>`, sem locks.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{NlpError, Result};
use crate::maxent::MaxentModel;

/// Seção principal dos estágios que usam um único classificador.
pub const MAXENT_SECTION: &str = "maxent";
/// Seções do parser por chunks.
pub const BUILD_SECTION: &str = "build";
pub const CHECK_SECTION: &str = "check";
pub const POSTAG_SECTION: &str = "postag";
pub const CHUNKER_SECTION: &str = "chunker";

/// Chave do manifesto com o tipo de parser.
pub const PARSER_TYPE_KEY: &str = "parser.type";
/// Único tipo de parser implementado.
pub const PARSER_TYPE_CHUNKING: &str = "chunking";

/// Tipo de estágio ao qual um modelo se destina.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    SentenceDetector,
    Tokenizer,
    PosTagger,
    Chunker,
    NameFinder,
    Parser,
}

impl ModelKind {
    /// Nome usado no cabeçalho binário.
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::SentenceDetector => "sentdetect",
            ModelKind::Tokenizer => "tokenizer",
            ModelKind::PosTagger => "postag",
            ModelKind::Chunker => "chunker",
            ModelKind::NameFinder => "namefind",
            ModelKind::Parser => "parser",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sentdetect" => Some(ModelKind::SentenceDetector),
            "tokenizer" => Some(ModelKind::Tokenizer),
            "postag" => Some(ModelKind::PosTagger),
            "chunker" => Some(ModelKind::Chunker),
            "namefind" => Some(ModelKind::NameFinder),
            "parser" => Some(ModelKind::Parser),
            _ => None,
        }
    }

    /// Seções maxent obrigatórias para este tipo.
    pub fn required_sections(&self) -> &'static [&'static str] {
        match self {
            ModelKind::Parser => &[POSTAG_SECTION, CHUNKER_SECTION, BUILD_SECTION, CHECK_SECTION],
            _ => &[MAXENT_SECTION],
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Dicionário de tags: palavra -> tags permitidas.
///
/// A consulta tenta a forma exata e depois a forma minúscula.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TagDictionary {
    pub entries: BTreeMap<String, Vec<String>>,
}

impl TagDictionary {
    pub fn insert<S: Into<String>>(&mut self, word: &str, tags: impl IntoIterator<Item = S>) {
        self.entries
            .insert(word.to_string(), tags.into_iter().map(Into::into).collect());
    }

    pub fn tags(&self, word: &str) -> Option<&[String]> {
        self.entries
            .get(word)
            .or_else(|| self.entries.get(&word.to_lowercase()))
            .map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Dicionário de entidades: tipo -> frases (sequências de tokens em minúsculas).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityDictionary {
    pub entries: BTreeMap<String, Vec<Vec<String>>>,
}

impl EntityDictionary {
    /// Adiciona uma frase separada por espaços (ex: "pierre vinken").
    pub fn insert(&mut self, kind: &str, phrase: &str) {
        let tokens: Vec<String> = phrase.split_whitespace().map(str::to_lowercase).collect();
        if !tokens.is_empty() {
            self.entries.entry(kind.to_string()).or_default().push(tokens);
        }
    }

    /// Para cada token, os tipos de entidade cujas frases o cobrem e se o
    /// token é o primeiro da frase encontrada.
    pub fn matches(&self, tokens: &[String]) -> Vec<Vec<(String, bool)>> {
        let lower: Vec<String> = tokens.iter().map(|t| t.to_lowercase()).collect();
        let mut result = vec![Vec::new(); tokens.len()];
        for (kind, phrases) in &self.entries {
            for phrase in phrases {
                if phrase.len() > lower.len() {
                    continue;
                }
                for start in 0..=(lower.len() - phrase.len()) {
                    if lower[start..start + phrase.len()] == phrase[..] {
                        for (offset, slot) in result[start..start + phrase.len()].iter_mut().enumerate() {
                            let entry = (kind.clone(), offset == 0);
                            if !slot.contains(&entry) {
                                slot.push(entry);
                            }
                        }
                    }
                }
            }
        }
        result
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Modelo completo de um estágio.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    kind: ModelKind,
    manifest: BTreeMap<String, String>,
    maxent: BTreeMap<String, MaxentModel>,
    tag_dictionary: Option<TagDictionary>,
    abbreviations: Option<BTreeSet<String>>,
    dictionary: Option<EntityDictionary>,
}

impl Model {
    /// Cria um modelo com uma única seção maxent principal.
    pub fn new(kind: ModelKind, maxent: MaxentModel) -> Self {
        let mut model = Self::empty(kind);
        model.maxent.insert(MAXENT_SECTION.to_string(), maxent);
        model
    }

    /// Cria um modelo sem seções (usado pelo loader e pelo parser).
    pub fn empty(kind: ModelKind) -> Self {
        Self {
            kind,
            manifest: BTreeMap::new(),
            maxent: BTreeMap::new(),
            tag_dictionary: None,
            abbreviations: None,
            dictionary: None,
        }
    }

    pub fn with_section(mut self, name: &str, maxent: MaxentModel) -> Self {
        self.maxent.insert(name.to_string(), maxent);
        self
    }

    pub fn with_manifest_entry(mut self, key: &str, value: &str) -> Self {
        self.manifest.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_tag_dictionary(mut self, dict: TagDictionary) -> Self {
        self.tag_dictionary = Some(dict);
        self
    }

    pub fn with_abbreviations<S: Into<String>>(mut self, abbreviations: impl IntoIterator<Item = S>) -> Self {
        self.abbreviations = Some(abbreviations.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_dictionary(mut self, dict: EntityDictionary) -> Self {
        self.dictionary = Some(dict);
        self
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    /// Falha com `UnsupportedModelType` se o modelo não for do tipo esperado.
    pub fn expect_kind(&self, expected: ModelKind) -> Result<()> {
        if self.kind != expected {
            return Err(NlpError::unsupported_model_type(format!(
                "esperado modelo '{expected}', recebido '{}'",
                self.kind
            )));
        }
        Ok(())
    }

    /// Seção maxent pelo nome.
    pub fn maxent(&self, section: &str) -> Result<&MaxentModel> {
        self.maxent.get(section).ok_or_else(|| {
            NlpError::corrupt_model(format!(
                "modelo '{}' sem a seção '{section}'",
                self.kind
            ))
        })
    }

    pub fn sections(&self) -> impl Iterator<Item = (&str, &MaxentModel)> {
        self.maxent.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn manifest(&self) -> &BTreeMap<String, String> {
        &self.manifest
    }

    pub fn manifest_value(&self, key: &str) -> Option<&str> {
        self.manifest.get(key).map(String::as_str)
    }

    pub fn tag_dictionary(&self) -> Option<&TagDictionary> {
        self.tag_dictionary.as_ref()
    }

    pub fn abbreviations(&self) -> Option<&BTreeSet<String>> {
        self.abbreviations.as_ref()
    }

    pub fn is_abbreviation(&self, word: &str) -> bool {
        self.abbreviations
            .as_ref()
            .map(|a| a.contains(word) || a.contains(&word.to_lowercase()))
            .unwrap_or(false)
    }

    pub fn dictionary(&self) -> Option<&EntityDictionary> {
        self.dictionary.as_ref()
    }

    /// Verifica que todas as seções obrigatórias para o tipo estão presentes.
    pub fn validate(&self) -> Result<()> {
        for section in self.kind.required_sections() {
            self.maxent(section)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_roundtrip() {
        for kind in [
            ModelKind::SentenceDetector,
            ModelKind::Tokenizer,
            ModelKind::PosTagger,
            ModelKind::Chunker,
            ModelKind::NameFinder,
            ModelKind::Parser,
        ] {
            assert_eq!(ModelKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ModelKind::from_name("coref"), None);
    }

    #[test]
    fn test_expect_kind() {
        let model = Model::new(ModelKind::Chunker, MaxentModel::new(["O"]));
        assert!(model.expect_kind(ModelKind::Chunker).is_ok());
        assert!(matches!(
            model.expect_kind(ModelKind::PosTagger),
            Err(NlpError::UnsupportedModelType(_))
        ));
    }

    #[test]
    fn test_validate_parser_sections() {
        let model = Model::empty(ModelKind::Parser).with_section(BUILD_SECTION, MaxentModel::new(["S-NP"]));
        assert!(matches!(model.validate(), Err(NlpError::CorruptModel(_))));
    }

    #[test]
    fn test_tag_dictionary_lowercase_fallback() {
        let mut dict = TagDictionary::default();
        dict.insert("the", ["DT"]);
        assert_eq!(dict.tags("The"), Some(&["DT".to_string()][..]));
        assert!(dict.tags("fox").is_none());
    }

    #[test]
    fn test_entity_dictionary_matches_phrases() {
        let mut dict = EntityDictionary::default();
        dict.insert("person", "Pierre Vinken");
        let tokens: Vec<String> = ["Mr.", "Pierre", "Vinken", "spoke"].iter().map(|s| s.to_string()).collect();
        let matches = dict.matches(&tokens);
        assert!(matches[0].is_empty());
        assert_eq!(matches[1], vec![("person".to_string(), true)]);
        assert_eq!(matches[2], vec![("person".to_string(), false)]);
        assert!(matches[3].is_empty());
    }

    #[test]
    fn test_abbreviations_case_insensitive() {
        let model = Model::new(ModelKind::SentenceDetector, MaxentModel::new(["s", "n"]))
            .with_abbreviations(["mr.", "dr."]);
        assert!(model.is_abbreviation("Mr."));
        assert!(!model.is_abbreviation("end."));
    }
}
