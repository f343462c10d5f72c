//! # Geração de Contexto (Predicados)
//!
//! Cada estágio converte sua janela de contexto em um conjunto de predicados
//! textuais que o classificador MaxEnt consome. Todas as funções aqui são puras:
//! a mesma janela sempre gera os mesmos predicados, na mesma ordem.
//!
//! ## Janelas por estágio
//!
//! | Estágio   | Janela                                                         |
//! |-----------|----------------------------------------------------------------|
//! | Sentenças | token antes/depois do candidato, caixa, abreviação, tamanho    |
//! | Tokens    | prefixo/sufixo do ponto de corte e classes dos caracteres      |
//! | POS       | palavras `[-2,+2]`, afixos até 4, duas tags anteriores         |
//! | Chunks    | palavras e tags `[-2,+2]`, chunk anterior                      |
//! | Nomes     | palavras `[-2,+2]`, padrão de caixa, outcome anterior, dicionário |
//!
//! As features do parser dependem da árvore parcial e ficam em `parser.rs`.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::decoder::ContextGenerator;
use crate::model::EntityDictionary;

/// Marcador de fronteira antes do início da sentença.
pub const SENTENCE_BEGIN: &str = "*SB*";
/// Marcador de fronteira depois do fim da sentença.
pub const SENTENCE_END: &str = "*SE*";

static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?\d+(?:[.,:/]\d+)*%?$").expect("valid regex"));
static INITIALS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[A-Za-z]\.){2,}$").expect("valid regex"));

fn starts_upper(word: &str) -> bool {
    word.chars().next().map(char::is_uppercase).unwrap_or(false)
}

/// Classe de um caractere: `a` minúscula, `A` maiúscula, `d` dígito,
/// `p` pontuação/símbolo, `s` espaço ou outro.
pub fn char_class(c: char) -> char {
    if c.is_alphabetic() {
        if c.is_uppercase() {
            'A'
        } else {
            'a'
        }
    } else if c.is_numeric() {
        'd'
    } else if c.is_ascii_punctuation() || (!c.is_whitespace() && !c.is_control()) {
        'p'
    } else {
        's'
    }
}

/// Classe de caixa de uma palavra, usada pelo localizador de nomes.
pub fn word_class(word: &str) -> &'static str {
    if word.is_empty() {
        return "other";
    }
    if NUMBER.is_match(word) {
        return "num";
    }
    if word.chars().all(|c| !c.is_alphanumeric()) {
        return "punct";
    }
    let letters: Vec<char> = word.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.is_empty() {
        return "alnum";
    }
    if letters.iter().all(|c| c.is_uppercase()) {
        if letters.len() == 1 {
            "ic"
        } else {
            "ac"
        }
    } else if letters.iter().all(|c| c.is_lowercase()) {
        "lc"
    } else if starts_upper(word) {
        "ic"
    } else {
        "mc"
    }
}

// ---------------------------------------------------------------------------
// Detector de sentenças
// ---------------------------------------------------------------------------

/// Aspas e parênteses que fecham uma sentença (`."`, `.)`).
fn is_closing_punctuation(c: char) -> bool {
    matches!(c, '"' | '\'' | ')' | ']' | '}' | '»' | '”' | '’')
}

/// Predicados para um candidato a fim de sentença em `text[position]`.
///
/// `is_abbreviation` consulta a lista de abreviações do modelo.
pub fn sentence_context(
    text: &str,
    position: usize,
    eos: char,
    is_abbreviation: &dyn Fn(&str) -> bool,
) -> Vec<String> {
    let after = position + eos.len_utf8();
    let token_start = text[..position]
        .rfind(char::is_whitespace)
        .map(|i| i + text[i..].chars().next().map(char::len_utf8).unwrap_or(1))
        .unwrap_or(0);
    let prefix = &text[token_start..position];
    let suffix_end = text[after..]
        .find(char::is_whitespace)
        .map(|i| after + i)
        .unwrap_or(text.len());
    let suffix = &text[after..suffix_end];

    let previous = text[..token_start].split_whitespace().next_back().unwrap_or("");
    let next = text[suffix_end..].split_whitespace().next().unwrap_or("");

    let mut ctx = Vec::with_capacity(16);
    ctx.push(format!("eos={eos}"));
    ctx.push(format!("x={prefix}"));
    ctx.push(format!("xlen={}", prefix.chars().count()));
    if starts_upper(prefix) {
        ctx.push("xcap".to_string());
    }
    if is_abbreviation(&text[token_start..after]) {
        ctx.push("xabbrev".to_string());
    }

    if !previous.is_empty() {
        ctx.push(format!("v={previous}"));
        if starts_upper(previous) {
            ctx.push("vcap".to_string());
        }
        if is_abbreviation(previous) {
            ctx.push("vabbrev".to_string());
        }
    }

    ctx.push(format!("s={suffix}"));
    if !suffix.is_empty() && suffix.chars().all(is_closing_punctuation) {
        ctx.push("sclose".to_string());
    } else if !suffix.is_empty() {
        ctx.push("sfx".to_string());
        if starts_upper(suffix) {
            ctx.push("scap".to_string());
        }
        if suffix.chars().next().map(|c| c.is_numeric()).unwrap_or(false) {
            ctx.push("sdigit".to_string());
        }
    }

    if next.is_empty() {
        ctx.push("eot".to_string());
    } else {
        ctx.push(format!("n={next}"));
        if starts_upper(next) {
            ctx.push("ncap".to_string());
        }
        if is_abbreviation(next) {
            ctx.push("nabbrev".to_string());
        }
    }
    ctx.push("bias".to_string());
    ctx
}

// ---------------------------------------------------------------------------
// Tokenizador
// ---------------------------------------------------------------------------

/// Predicados para a decisão de corte do token `token` na posição de byte
/// `split` (fronteira de grafema, `0 < split < token.len()`).
pub fn token_context(token: &str, split: usize, is_abbreviation: &dyn Fn(&str) -> bool) -> Vec<String> {
    let prefix = &token[..split];
    let suffix = &token[split..];
    let p1 = prefix.chars().next_back().unwrap_or(' ');
    let f1 = suffix.chars().next().unwrap_or(' ');
    let p1c = char_class(p1);
    let f1c = char_class(f1);

    let mut ctx = vec![
        format!("p={prefix}"),
        format!("s={suffix}"),
        format!("p1={p1}"),
        format!("f1={f1}"),
        format!("p1c={p1c}"),
        format!("f1c={f1c}"),
        format!("p1cf1c={p1c}{f1c}"),
    ];
    if NUMBER.is_match(token) {
        ctx.push("num".to_string());
    }
    if INITIALS.is_match(token) {
        ctx.push("initials".to_string());
    }
    if is_abbreviation(token) {
        ctx.push("abb".to_string());
    }
    if p1 == f1 {
        ctx.push("same".to_string());
    }
    if is_word_internal(prefix, suffix) {
        ctx.push("inner".to_string());
    }
    ctx.push("bias".to_string());
    ctx
}

/// Pontuação de ligação (`-`, `'`, `&`, `/`) com letras dos dois lados.
fn is_word_internal(prefix: &str, suffix: &str) -> bool {
    const JOINERS: [char; 5] = ['-', '\'', '\u{2019}', '&', '/'];
    let mut before = prefix.chars().rev();
    let mut after = suffix.chars();
    let (p1, p2) = (before.next(), before.next());
    let (f1, f2) = (after.next(), after.next());
    let alpha = |c: Option<char>| c.map(char::is_alphabetic).unwrap_or(false);
    match (p1, f1) {
        (Some(p), Some(_)) if JOINERS.contains(&p) => alpha(p2) && alpha(f1),
        (Some(_), Some(f)) if JOINERS.contains(&f) => alpha(p1) && alpha(f2),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// POS tagger
// ---------------------------------------------------------------------------

/// Gerador de contexto do POS tagger sobre uma sentença tokenizada.
pub struct PosContext<'a, S: AsRef<str>> {
    tokens: &'a [S],
}

impl<'a, S: AsRef<str>> PosContext<'a, S> {
    pub fn new(tokens: &'a [S]) -> Self {
        Self { tokens }
    }

    fn word(&self, i: isize) -> &str {
        if i < 0 {
            SENTENCE_BEGIN
        } else {
            self.tokens
                .get(i as usize)
                .map(AsRef::as_ref)
                .unwrap_or(SENTENCE_END)
        }
    }
}

impl<S: AsRef<str>> ContextGenerator for PosContext<'_, S> {
    fn context(&self, index: usize, prior: &[String]) -> Vec<String> {
        let i = index as isize;
        let word = self.word(i);
        let chars: Vec<char> = word.chars().collect();

        let mut ctx = vec!["def".to_string(), format!("w={word}")];
        for n in 1..=4usize.min(chars.len()) {
            let suf: String = chars[chars.len() - n..].iter().collect();
            let pre: String = chars[..n].iter().collect();
            ctx.push(format!("suf={suf}"));
            ctx.push(format!("pre={pre}"));
        }
        if word.contains('-') {
            ctx.push("h".to_string());
        }
        if chars.iter().any(|c| c.is_uppercase()) {
            ctx.push("c".to_string());
        }
        if chars.iter().any(|c| c.is_numeric()) {
            ctx.push("d".to_string());
        }

        ctx.push(format!("p={}", self.word(i - 1)));
        ctx.push(format!("pp={}", self.word(i - 2)));
        ctx.push(format!("n={}", self.word(i + 1)));
        ctx.push(format!("nn={}", self.word(i + 2)));

        let t1 = prior.last().map(String::as_str).unwrap_or(SENTENCE_BEGIN);
        let t2 = if prior.len() >= 2 {
            prior[prior.len() - 2].as_str()
        } else {
            SENTENCE_BEGIN
        };
        ctx.push(format!("t={t1}"));
        ctx.push(format!("t2={t2},{t1}"));
        ctx
    }
}

// ---------------------------------------------------------------------------
// Chunker
// ---------------------------------------------------------------------------

/// Tipo do chunk de um rótulo BIO (`B-NP` → `NP`, `O` → `O`).
pub fn chunk_kind(label: &str) -> &str {
    label
        .strip_prefix("B-")
        .or_else(|| label.strip_prefix("I-"))
        .unwrap_or(label)
}

/// Gerador de contexto do chunker sobre pares (token, tag POS).
pub struct ChunkContext<'a, S: AsRef<str>, T: AsRef<str>> {
    tokens: &'a [S],
    tags: &'a [T],
}

impl<'a, S: AsRef<str>, T: AsRef<str>> ChunkContext<'a, S, T> {
    pub fn new(tokens: &'a [S], tags: &'a [T]) -> Self {
        Self { tokens, tags }
    }

    fn at<'b, X: AsRef<str>>(items: &'b [X], i: isize) -> &'b str {
        if i < 0 {
            SENTENCE_BEGIN
        } else {
            items.get(i as usize).map(AsRef::as_ref).unwrap_or(SENTENCE_END)
        }
    }
}

impl<S: AsRef<str>, T: AsRef<str>> ContextGenerator for ChunkContext<'_, S, T> {
    fn context(&self, index: usize, prior: &[String]) -> Vec<String> {
        let i = index as isize;
        let w0 = Self::at(self.tokens, i);
        let t0 = Self::at(self.tags, i);
        let t_1 = Self::at(self.tags, i - 1);
        let t1 = Self::at(self.tags, i + 1);
        let p1 = prior.last().map(String::as_str).unwrap_or(SENTENCE_BEGIN);
        let p2 = if prior.len() >= 2 {
            prior[prior.len() - 2].as_str()
        } else {
            SENTENCE_BEGIN
        };

        let mut ctx = vec!["def".to_string()];
        for offset in -2..=2isize {
            ctx.push(format!("w{offset}={}", Self::at(self.tokens, i + offset)));
            ctx.push(format!("t{offset}={}", Self::at(self.tags, i + offset)));
        }
        ctx.push(format!("p-2={p2}"));
        ctx.push(format!("p-1={p1}"));
        ctx.push(format!("p-1,t0={p1},{t0}"));
        ctx.push(format!("pk,t0={},{t0}", chunk_kind(p1)));
        ctx.push(format!("t-1,t0={t_1},{t0}"));
        ctx.push(format!("t0,t1={t0},{t1}"));
        ctx.push(format!("w0,t0={w0},{t0}"));
        ctx
    }
}

// ---------------------------------------------------------------------------
// Localizador de nomes
// ---------------------------------------------------------------------------

/// Gerador de contexto do localizador de nomes.
pub struct NameContext<'a, S: AsRef<str>> {
    tokens: &'a [S],
    /// Tipos de dicionário por token: (tipo, é o primeiro token da frase)
    dictionary: Vec<Vec<(String, bool)>>,
    /// Última decisão tomada para cada palavra no documento (modo adaptativo)
    previous: Option<&'a HashMap<String, String>>,
}

impl<'a, S: AsRef<str>> NameContext<'a, S> {
    pub fn new(
        tokens: &'a [S],
        dictionary: Option<&EntityDictionary>,
        previous: Option<&'a HashMap<String, String>>,
    ) -> Self {
        let dictionary = match dictionary {
            Some(dict) if !dict.is_empty() => {
                let owned: Vec<String> = tokens.iter().map(|t| t.as_ref().to_string()).collect();
                dict.matches(&owned)
            }
            _ => vec![Vec::new(); tokens.len()],
        };
        Self {
            tokens,
            dictionary,
            previous,
        }
    }

    fn word(&self, i: isize) -> Option<&str> {
        if i < 0 {
            None
        } else {
            self.tokens.get(i as usize).map(AsRef::as_ref)
        }
    }
}

impl<S: AsRef<str>> ContextGenerator for NameContext<'_, S> {
    fn context(&self, index: usize, prior: &[String]) -> Vec<String> {
        let i = index as isize;
        let word = self.word(i).unwrap_or("");
        let wc = word_class(word);
        let po = prior.last().map(String::as_str).unwrap_or(SENTENCE_BEGIN);

        let mut ctx = vec![
            "bias".to_string(),
            format!("w={}", word.to_lowercase()),
            format!("wc={wc}"),
            format!("po={po}"),
            format!("po,wc={po},{wc}"),
        ];
        for offset in [-2isize, -1, 1, 2] {
            match self.word(i + offset) {
                Some(w) => {
                    ctx.push(format!("w{offset}={}", w.to_lowercase()));
                    ctx.push(format!("wc{offset}={}", word_class(w)));
                }
                None if offset < 0 => ctx.push(format!("w{offset}={SENTENCE_BEGIN}")),
                None => ctx.push(format!("w{offset}={SENTENCE_END}")),
            }
        }
        if index == 0 {
            ctx.push("bos".to_string());
        }
        if let Some(matches) = self.dictionary.get(index) {
            for (kind, first) in matches {
                ctx.push(format!("dict={kind}"));
                if *first {
                    ctx.push(format!("dictb={kind}"));
                }
            }
        }
        if let Some(outcome) = self.previous.and_then(|p| p.get(word)) {
            ctx.push(format!("pd={outcome}"));
        }
        ctx
    }
}
