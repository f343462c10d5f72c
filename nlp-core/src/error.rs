//! # Erros do Pipeline
//!
//! Taxonomia única de erros para todo o crate. Erros de carregamento de modelo
//! são fatais apenas para aquela chamada de `load_model`; erros de chamada em um
//! pipeline nunca corrompem o modelo e deixam a instância reutilizável.

use thiserror::Error;

/// Tipo `Result` usado em todo o crate.
pub type Result<T> = std::result::Result<T, NlpError>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum NlpError {
    /// Stream truncado, magic/versão incorretos ou tabelas inconsistentes.
    #[error("modelo corrompido: {0}")]
    CorruptModel(String),

    /// O tipo de modelo declarado não é reconhecido para o estágio pedido.
    #[error("tipo de modelo não suportado: {0}")]
    UnsupportedModelType(String),

    /// O tipo de parser declarado no modelo não está implementado.
    #[error("gramática não suportada: {0}")]
    UnsupportedGrammar(String),

    /// Entrada inválida (ex: sequência de tokens vazia).
    #[error("entrada inválida: {0}")]
    InvalidInput(String),

    /// Todos os candidatos do beam caíram abaixo do piso de probabilidade.
    #[error("underflow na decodificação: {0}")]
    DecodeUnderflow(String),

    #[error("erro de IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("erro de JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl NlpError {
    pub fn corrupt_model(msg: impl Into<String>) -> Self {
        NlpError::CorruptModel(msg.into())
    }

    pub fn unsupported_model_type(msg: impl Into<String>) -> Self {
        NlpError::UnsupportedModelType(msg.into())
    }

    pub fn unsupported_grammar(msg: impl Into<String>) -> Self {
        NlpError::UnsupportedGrammar(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        NlpError::InvalidInput(msg.into())
    }

    pub fn decode_underflow(msg: impl Into<String>) -> Self {
        NlpError::DecodeUnderflow(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = NlpError::corrupt_model("magic inválido");
        assert_eq!(err.to_string(), "modelo corrompido: magic inválido");

        let err = NlpError::decode_underflow("beam vazio");
        assert!(matches!(err, NlpError::DecodeUnderflow(_)));
    }

    #[test]
    fn test_io_error_conversion() {
        fn read() -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof"))?
        }
        assert!(matches!(read(), Err(NlpError::Io(_))));
    }
}
