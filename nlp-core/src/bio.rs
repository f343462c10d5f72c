//! # Esquema de Tags BIO
//!
//! Chunks e entidades são rotulados token a token no esquema **BIO**:
//!
//! - `B-X`: Begin, primeiro token de um trecho do tipo `X`
//! - `I-X`: Inside, continuação de um trecho do tipo `X`
//! - `O`: Outside, fora de qualquer trecho
//!
//! O tipo `X` é livre (`NP`, `VP`, `person`, ...), vindo dos outcomes do
//! modelo carregado.

use crate::decoder::SequenceValidator;

/// Tag BIO aplicada a um token, emprestando o tipo do rótulo original.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag<'a> {
    /// **Begin**: início de um trecho. Ex: **Pierre** (B-person) Vinken.
    Begin(&'a str),
    /// **Inside**: continuação. Ex: Pierre **Vinken** (I-person).
    Inside(&'a str),
    /// **Outside**: fora de qualquer trecho.
    Outside,
}

impl<'a> Tag<'a> {
    /// Interpreta um rótulo. Rótulos sem prefixo `B-`/`I-` contam como `O`.
    pub fn parse(label: &'a str) -> Self {
        if let Some(kind) = label.strip_prefix("B-") {
            Tag::Begin(kind)
        } else if let Some(kind) = label.strip_prefix("I-") {
            Tag::Inside(kind)
        } else {
            Tag::Outside
        }
    }

    /// Tipo do trecho (se for B- ou I-)
    pub fn kind(&self) -> Option<&'a str> {
        match self {
            Tag::Begin(k) | Tag::Inside(k) => Some(*k),
            Tag::Outside => None,
        }
    }

    pub fn is_continuation(&self) -> bool {
        matches!(self, Tag::Inside(_))
    }

    /// Verifica se a transição `prev → next` é válida no esquema BIO.
    ///
    /// Regras:
    /// - `I-X` só pode seguir `B-X` ou `I-X` (mesmo tipo)
    /// - `I-X` nunca abre a sequência (`prev == None`)
    /// - `B-X` e `O` podem seguir qualquer tag
    pub fn is_valid_transition(prev: Option<&Tag<'_>>, next: &Tag<'_>) -> bool {
        match next {
            Tag::Inside(kind) => match prev {
                Some(Tag::Begin(prev_kind)) | Some(Tag::Inside(prev_kind)) => prev_kind == kind,
                _ => false,
            },
            _ => true,
        }
    }
}

impl std::fmt::Display for Tag<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tag::Begin(k) => write!(f, "B-{k}"),
            Tag::Inside(k) => write!(f, "I-{k}"),
            Tag::Outside => write!(f, "O"),
        }
    }
}

/// Verifica que nenhuma tag de continuação aparece sem predecessora compatível.
pub fn is_valid_sequence<S: AsRef<str>>(tags: &[S]) -> bool {
    let mut prev: Option<Tag<'_>> = None;
    for label in tags {
        let tag = Tag::parse(label.as_ref());
        if !Tag::is_valid_transition(prev.as_ref(), &tag) {
            return false;
        }
        prev = Some(tag);
    }
    true
}

/// Restrição rígida do esquema BIO durante a decodificação: transições
/// inválidas são removidas do conjunto de candidatos, não penalizadas.
#[derive(Debug, Clone, Copy, Default)]
pub struct BioValidator;

impl SequenceValidator for BioValidator {
    fn valid(&self, _index: usize, prior: &[String], outcome: &str) -> bool {
        let prev = prior.last().map(|p| Tag::parse(p));
        Tag::is_valid_transition(prev.as_ref(), &Tag::parse(outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        assert_eq!(Tag::parse("B-NP"), Tag::Begin("NP"));
        assert_eq!(Tag::parse("I-person"), Tag::Inside("person"));
        assert_eq!(Tag::parse("O"), Tag::Outside);
        assert_eq!(Tag::parse("I-PP").to_string(), "I-PP");
        assert_eq!(Tag::parse("B-VP").kind(), Some("VP"));
    }

    #[test]
    fn test_valid_transitions() {
        assert!(Tag::is_valid_transition(Some(&Tag::Begin("person")), &Tag::Inside("person")));
        assert!(Tag::is_valid_transition(Some(&Tag::Inside("NP")), &Tag::Inside("NP")));
        assert!(!Tag::is_valid_transition(Some(&Tag::Outside), &Tag::Inside("person")));
        assert!(!Tag::is_valid_transition(Some(&Tag::Begin("ORG")), &Tag::Inside("PER")));
        assert!(!Tag::is_valid_transition(None, &Tag::Inside("NP")));
        assert!(Tag::is_valid_transition(None, &Tag::Begin("NP")));
    }

    #[test]
    fn test_is_valid_sequence() {
        assert!(is_valid_sequence(&["B-NP", "I-NP", "O", "B-VP"]));
        assert!(!is_valid_sequence(&["O", "I-NP"]));
        assert!(!is_valid_sequence(&["I-NP"]));
        assert!(!is_valid_sequence(&["B-NP", "I-VP"]));
    }

    #[test]
    fn test_validator_uses_last_prior_outcome() {
        let v = BioValidator;
        assert!(!v.valid(0, &[], "I-NP"));
        assert!(v.valid(1, &["B-NP".to_string()], "I-NP"));
        assert!(!v.valid(1, &["B-VP".to_string()], "I-NP"));
    }
}
