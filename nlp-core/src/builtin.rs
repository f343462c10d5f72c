//! # Modelos Embutidos (Inglês)
//!
//! Modelos MaxEnt com pesos atribuídos à mão para todos os estágios, para que
//! o pipeline funcione sem arquivos externos. Os pesos codificam os padrões
//! mais fortes do inglês escrito (abreviações, pontuação colada, afixos,
//! gramática de chunks do Penn Treebank). Modelos treinados de verdade são
//! carregados com [`crate::loader::load_model`]; estes também podem ser
//! gravados com [`crate::loader::write_model`].
//!
//! ## Convenção
//!
//! Um peso `w(predicado, outcome)` soma ao score linear do outcome quando o
//! predicado está presente; o classificador aplica softmax sobre os scores.
//! Pesos em torno de 2 a 4 expressam preferência clara; 6 ou mais, quase
//! certeza.

use crate::maxent::MaxentModel;
use crate::model::{
    EntityDictionary, Model, ModelKind, TagDictionary, BUILD_SECTION, CHECK_SECTION,
    CHUNKER_SECTION, PARSER_TYPE_CHUNKING, PARSER_TYPE_KEY, POSTAG_SECTION,
};

/// Abreviações comuns do inglês (minúsculas, com o ponto).
const ABBREVIATIONS: &[&str] = &[
    "mr.", "mrs.", "ms.", "dr.", "prof.", "sr.", "jr.", "st.", "mt.", "gen.", "gov.", "sen.",
    "rep.", "col.", "lt.", "sgt.", "inc.", "corp.", "co.", "ltd.", "bros.", "dept.", "univ.",
    "e.g.", "i.e.", "etc.", "vs.", "cf.", "al.", "approx.", "no.", "u.s.", "u.k.", "jan.", "feb.",
    "mar.", "apr.", "jun.", "jul.", "aug.", "sep.", "sept.", "oct.", "nov.", "dec.",
];

fn capitalized(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// =====================================================================
// DETECTOR DE SENTENÇAS
// =====================================================================

/// Detector de sentenças: outcomes `s` (fronteira) e `n`.
pub fn sentence_model() -> Model {
    let mut m = MaxentModel::new(["s", "n"]);

    // Todo candidato começa levemente inclinado a não ser fronteira.
    m.set_weight("bias", "n", 0.5);
    for eos in [".", "!", "?"] {
        m.set_weight(&format!("eos={eos}"), "s", 1.0);
    }

    // Próxima palavra maiúscula ou fim do texto: fronteira.
    m.set_weight("ncap", "s", 2.0);
    m.set_weight("eot", "s", 3.0);

    // Abreviação conhecida antes do ponto: quase nunca é fronteira.
    m.set_weight("xabbrev", "n", 4.0);

    // Texto colado depois do candidato ("61.5", "e.g", "Yahoo!Inc").
    m.set_weight("sfx", "n", 3.0);
    m.set_weight("sdigit", "n", 2.0);

    // Só aspas ou parênteses de fechamento colados ("Stop.\"", "(finally.)").
    m.set_weight("sclose", "s", 0.5);

    // Inicial isolada ("J. Smith").
    m.set_weight("xlen=1", "n", 1.0);

    Model::new(ModelKind::SentenceDetector, m).with_abbreviations(ABBREVIATIONS.iter().copied())
}

// =====================================================================
// TOKENIZADOR
// =====================================================================

/// Tokenizador: outcomes `T` (corta aqui) e `F`.
pub fn tokenizer_model() -> Model {
    let mut m = MaxentModel::new(["T", "F"]);

    m.set_weight("bias", "F", 1.0);

    // --- Fronteiras entre letra/dígito e pontuação ---
    for pair in ["ap", "pa", "dp", "pd", "Ap", "pA"] {
        m.set_weight(&format!("p1cf1c={pair}"), "T", 3.0);
    }
    // Pontuações diferentes coladas: ")!", "\"."
    m.set_weight("p1cf1c=pp", "T", 2.0);

    // --- Dentro de palavras e números ---
    for pair in ["aa", "AA", "Aa", "aA", "dd", "ad", "da", "Ad", "dA"] {
        m.set_weight(&format!("p1cf1c={pair}"), "F", 3.0);
    }

    // Números com separadores, iniciais e abreviações ficam inteiros.
    m.set_weight("num", "F", 8.0);
    m.set_weight("initials", "F", 8.0);
    m.set_weight("abb", "F", 10.0);

    // Sequências do mesmo símbolo ("...", "--") e hífens entre letras.
    m.set_weight("same", "F", 3.0);
    m.set_weight("inner", "F", 5.0);

    Model::new(ModelKind::Tokenizer, m).with_abbreviations(ABBREVIATIONS.iter().copied())
}

// =====================================================================
// POS TAGGER
// =====================================================================

/// Tagset do Penn Treebank, na ordem dos outcomes.
const PENN_TAGS: &[&str] = &[
    "NN", "NNS", "NNP", "NNPS", "JJ", "JJR", "JJS", "VB", "VBD", "VBG", "VBN", "VBP", "VBZ",
    "RB", "RBR", "RBS", "DT", "PDT", "IN", "CC", "CD", "PRP", "PRP$", "MD", "TO", "POS", "RP",
    "WDT", "WP", "WP$", "WRB", "EX", "UH", "FW", "SYM", "LS", ".", ",", ":", "``", "''",
    "-LRB-", "-RRB-", "$", "#",
];

/// Léxico: palavra -> tag mais frequente.
const LEXICON: &[(&str, &str)] = &[
    // determinantes e pronomes
    ("the", "DT"), ("a", "DT"), ("an", "DT"), ("this", "DT"), ("that", "DT"),
    ("these", "DT"), ("those", "DT"), ("each", "DT"), ("every", "DT"), ("some", "DT"),
    ("any", "DT"), ("no", "DT"), ("all", "DT"), ("both", "DT"),
    ("it", "PRP"), ("he", "PRP"), ("she", "PRP"), ("they", "PRP"), ("we", "PRP"),
    ("i", "PRP"), ("you", "PRP"), ("him", "PRP"), ("them", "PRP"), ("us", "PRP"),
    ("its", "PRP$"), ("his", "PRP$"), ("her", "PRP$"), ("their", "PRP$"), ("our", "PRP$"),
    ("my", "PRP$"), ("your", "PRP$"),
    ("which", "WDT"), ("who", "WP"), ("whom", "WP"), ("whose", "WP$"), ("where", "WRB"),
    ("when", "WRB"), ("how", "WRB"), ("why", "WRB"), ("there", "EX"),
    // preposições e conjunções
    ("in", "IN"), ("of", "IN"), ("on", "IN"), ("at", "IN"), ("over", "IN"), ("for", "IN"),
    ("with", "IN"), ("by", "IN"), ("from", "IN"), ("into", "IN"), ("about", "IN"),
    ("under", "IN"), ("after", "IN"), ("before", "IN"), ("than", "IN"), ("as", "IN"),
    ("if", "IN"), ("because", "IN"), ("through", "IN"), ("during", "IN"), ("without", "IN"),
    ("against", "IN"), ("between", "IN"), ("since", "IN"), ("until", "IN"), ("near", "IN"),
    ("and", "CC"), ("or", "CC"), ("but", "CC"), ("nor", "CC"), ("to", "TO"),
    // verbos
    ("will", "MD"), ("would", "MD"), ("can", "MD"), ("could", "MD"), ("may", "MD"),
    ("might", "MD"), ("must", "MD"), ("shall", "MD"), ("should", "MD"),
    ("is", "VBZ"), ("has", "VBZ"), ("does", "VBZ"), ("says", "VBZ"), ("jumps", "VBZ"),
    ("runs", "VBZ"), ("barks", "VBZ"), ("sleeps", "VBZ"),
    ("was", "VBD"), ("were", "VBD"), ("had", "VBD"), ("did", "VBD"), ("said", "VBD"),
    ("signed", "VBD"), ("paid", "VBD"), ("left", "VBD"), ("arrived", "VBD"), ("barked", "VBD"),
    ("made", "VBD"), ("took", "VBD"), ("saw", "VBD"), ("ran", "VBD"),
    ("are", "VBP"), ("have", "VBP"), ("do", "VBP"),
    ("be", "VB"), ("provide", "VB"), ("join", "VB"), ("make", "VB"), ("take", "VB"),
    ("been", "VBN"), ("being", "VBG"), ("extending", "VBG"),
    // advérbios e partículas
    ("not", "RB"), ("n't", "RB"), ("very", "RB"), ("also", "RB"), ("too", "RB"),
    ("quickly", "RB"), ("never", "RB"), ("already", "RB"), ("up", "RP"), ("out", "RP"),
    // adjetivos
    ("quick", "JJ"), ("brown", "JJ"), ("lazy", "JJ"), ("large", "JJ"), ("new", "JJ"),
    ("old", "JJ"), ("tentative", "JJ"), ("structural", "JJ"), ("good", "JJ"), ("big", "JJ"),
    ("small", "JJ"), ("nonexecutive", "JJ"), ("first", "JJ"), ("last", "JJ"),
    ("most", "JJS"), ("best", "JJS"), ("largest", "JJS"), ("more", "JJR"), ("larger", "JJR"),
    // substantivos
    ("fox", "NN"), ("dog", "NN"), ("morning", "NN"), ("afternoon", "NN"), ("agreement", "NN"),
    ("contract", "NN"), ("unit", "NN"), ("year", "NN"), ("sentence", "NN"), ("time", "NN"),
    ("company", "NN"), ("run", "NN"), ("board", "NN"), ("director", "NN"), ("chairman", "NN"),
    ("cities", "NNS"), ("newspapers", "NNS"), ("years", "NNS"), ("parts", "NNS"),
    ("dollars", "NNS"), ("jetliners", "NNS"), ("people", "NNS"),
    ("US", "NNP"), ("'s", "POS"),
    // numerais por extenso
    ("one", "CD"), ("two", "CD"), ("three", "CD"), ("four", "CD"), ("five", "CD"),
    ("ten", "CD"), ("hundred", "CD"), ("thousand", "CD"), ("million", "CD"),
    // pontuação
    (".", "."), ("!", "."), ("?", "."), (",", ","), (";", ":"), (":", ":"), ("--", ":"),
    ("(", "-LRB-"), (")", "-RRB-"), ("``", "``"), ("''", "''"), ("\"", "''"), ("$", "$"),
    ("#", "#"),
];

/// Palavras de classe fechada: só aceitam as tags listadas.
const CLOSED_CLASS: &[(&str, &[&str])] = &[
    ("the", &["DT"]),
    ("a", &["DT"]),
    ("an", &["DT"]),
    ("of", &["IN"]),
    ("in", &["IN", "RP"]),
    ("and", &["CC"]),
    ("or", &["CC"]),
    ("to", &["TO"]),
    ("its", &["PRP$"]),
    ("'s", &["POS", "VBZ"]),
    (".", &["."]),
    (",", &[","]),
];

fn pos_maxent() -> MaxentModel {
    let mut m = MaxentModel::new(PENN_TAGS.iter().copied());

    // Sem outra evidência, substantivo comum.
    m.set_weight("def", "NN", 1.0);

    for (word, tag) in LEXICON {
        m.set_weight(&format!("w={word}"), tag, 6.0);
        let upper = capitalized(word);
        if upper != *word {
            m.set_weight(&format!("w={upper}"), tag, 6.0);
        }
    }

    // --- Palavras desconhecidas: afixos, caixa e dígitos ---
    m.set_weight("suf=s", "NNS", 2.0);
    m.set_weight("suf=ly", "RB", 3.0);
    m.set_weight("suf=ing", "VBG", 3.5);
    m.set_weight("suf=ed", "VBD", 3.0);
    for suffix in ["ous", "ful", "ive", "able", "ible", "al", "ic"] {
        m.set_weight(&format!("suf={suffix}"), "JJ", 2.5);
    }
    for suffix in ["tion", "ment", "ness", "ity"] {
        m.set_weight(&format!("suf={suffix}"), "NN", 2.5);
    }
    m.set_weight("c", "NNP", 2.5);
    m.set_weight("d", "CD", 4.0);
    m.set_weight("h", "JJ", 1.5);

    // Contexto: depois de MD/TO vem verbo na forma base.
    m.set_weight("t=MD", "VB", 2.0);
    m.set_weight("t=TO", "VB", 2.0);

    m
}

fn tag_dictionary() -> TagDictionary {
    let mut dict = TagDictionary::default();
    for (word, tags) in CLOSED_CLASS {
        dict.insert(word, tags.iter().copied());
    }
    dict
}

/// POS tagger com tagset do Penn Treebank e dicionário de classes fechadas.
pub fn pos_model() -> Model {
    Model::new(ModelKind::PosTagger, pos_maxent()).with_tag_dictionary(tag_dictionary())
}

// =====================================================================
// CHUNKER
// =====================================================================

const CHUNK_OUTCOMES: &[&str] = &[
    "B-NP", "I-NP", "B-VP", "I-VP", "B-PP", "I-PP", "B-ADVP", "I-ADVP", "B-ADJP", "I-ADJP",
    "B-PRT", "I-PRT", "B-SBAR", "I-SBAR", "O",
];

const NOMINAL: &[&str] = &["JJ", "JJR", "JJS", "NN", "NNS", "NNP", "NNPS", "CD"];
const VERBAL: &[&str] = &["VB", "VBD", "VBG", "VBN", "VBP", "VBZ", "MD"];

fn chunker_maxent() -> MaxentModel {
    let mut m = MaxentModel::new(CHUNK_OUTCOMES.iter().copied());

    m.set_weight("def", "O", 0.5);

    // --- NP ---
    for tag in ["DT", "PRP$", "PRP", "WP", "EX", "PDT"] {
        m.set_weight(&format!("t0={tag}"), "B-NP", 3.0);
    }
    // O possessivo abre um NP novo: [NP Boeing] [NP 's 747 jetliners]
    m.set_weight("t0=POS", "B-NP", 3.0);
    for tag in NOMINAL {
        m.set_weight(&format!("t0={tag}"), "B-NP", 2.0);
        m.set_weight(&format!("pk,t0=NP,{tag}"), "I-NP", 4.0);
    }

    // --- VP ---
    for tag in VERBAL {
        m.set_weight(&format!("t0={tag}"), "B-VP", 3.0);
        m.set_weight(&format!("pk,t0=VP,{tag}"), "I-VP", 4.0);
    }
    m.set_weight("t0=TO", "B-VP", 2.0);
    m.set_weight("pk,t0=VP,RB", "I-VP", 2.5);

    // --- demais ---
    m.set_weight("t0=IN", "B-PP", 3.0);
    m.set_weight("t0=RB", "B-ADVP", 2.0);
    m.set_weight("t0=RP", "B-PRT", 3.0);
    m.set_weight("t0=WDT", "B-NP", 3.0);
    m.set_weight("t0=CC", "O", 2.0);
    m.set_weight("t0=.", "O", 5.0);
    m.set_weight("t0=,", "O", 4.0);
    m.set_weight("t0=:", "O", 4.0);

    m
}

/// Chunker com a gramática de sintagmas do CoNLL-2000.
pub fn chunker_model() -> Model {
    Model::new(ModelKind::Chunker, chunker_maxent())
}

// =====================================================================
// LOCALIZADOR DE NOMES
// =====================================================================

const FIRST_NAMES: &[&str] = &[
    "pierre", "john", "mary", "james", "robert", "michael", "william", "david", "richard",
    "joseph", "thomas", "charles", "elizabeth", "susan", "sarah", "karen", "nancy", "linda",
    "barbara", "patricia", "jennifer", "maria",
];

/// Palavras frequentes que nunca são nomes, mesmo maiúsculas.
const NON_NAMES: &[&str] = &[
    "the", "a", "an", "this", "that", "in", "on", "of", "at", "and", "but", "or", "he", "she",
    "it", "they", "we", "i", "is", "was", "mr.", "mrs.", "ms.", "dr.", "prof.",
];

/// Localizador de pessoas: outcomes `B-person`, `I-person` e `O`.
pub fn name_finder_model() -> Model {
    let mut m = MaxentModel::new(["B-person", "I-person", "O"]);

    m.set_weight("bias", "O", 1.5);
    m.set_weight("bos", "O", 1.0);

    // --- caixa ---
    m.set_weight("wc=ic", "B-person", 2.0);
    m.set_weight("po,wc=B-person,ic", "I-person", 4.0);
    m.set_weight("po,wc=I-person,ic", "I-person", 3.0);
    m.set_weight("wc=lc", "O", 2.0);
    m.set_weight("wc=num", "O", 3.0);
    m.set_weight("wc=punct", "O", 3.0);
    m.set_weight("wc=ac", "O", 1.0);

    // --- dicionário e pronomes de tratamento ---
    m.set_weight("dict=person", "B-person", 3.0);
    for title in ["mr.", "mrs.", "ms.", "dr.", "prof."] {
        m.set_weight(&format!("w-1={title}"), "B-person", 2.0);
    }
    for word in NON_NAMES {
        m.set_weight(&format!("w={word}"), "O", 3.0);
    }

    // --- histórico do documento (modo adaptativo) ---
    m.set_weight("pd=B-person", "B-person", 2.0);
    m.set_weight("pd=I-person", "B-person", 2.0);

    let mut dictionary = EntityDictionary::default();
    for name in FIRST_NAMES {
        dictionary.insert("person", name);
    }

    Model::new(ModelKind::NameFinder, m).with_dictionary(dictionary)
}

// =====================================================================
// PARSER
// =====================================================================

const CONSTITUENTS: &[&str] = &["S", "NP", "VP", "PP", "SBAR", "ADJP", "ADVP"];

fn build_maxent() -> MaxentModel {
    let mut outcomes: Vec<String> = CONSTITUENTS.iter().map(|c| format!("S-{c}")).collect();
    outcomes.extend(CONSTITUENTS.iter().map(|c| format!("C-{c}")));
    let mut m = MaxentModel::new(outcomes);

    // A sentença começa pelo sujeito.
    m.set_weight("o,b0=*SB*,NP", "S-S", 3.0);
    m.set_weight("o,b0=*SB*,PP", "S-S", 2.0);

    // VP absorve complementos; PP absorve o NP seguinte.
    m.set_weight("b0,b1=VP,PP", "S-VP", 4.0);
    m.set_weight("b0,b1=VP,NP", "S-VP", 4.0);
    m.set_weight("b0,b1=PP,NP", "S-PP", 5.0);
    m.set_weight("o,b0=PP,NP", "C-PP", 4.0);
    m.set_weight("o,b0=VP,PP", "C-VP", 4.0);
    m.set_weight("o,b0=VP,NP", "C-VP", 4.0);
    m.set_weight("o,b0=VP,ADVP", "C-VP", 2.0);

    // A sentença recebe o VP e a pontuação final.
    m.set_weight("o,b0=S,VP", "C-S", 3.0);
    m.set_weight("o,b0=S,.", "C-S", 3.0);
    m.set_weight("o,b0=S,,", "C-S", 2.0);

    m
}

fn check_maxent() -> MaxentModel {
    let mut m = MaxentModel::new(["c", "i"]);

    m.set_weight("bias", "i", 1.0);
    m.set_weight("c,lst=PP,NP", "c", 3.0);
    m.set_weight("c,lst=VP,PP", "c", 3.0);
    m.set_weight("c,lst=VP,NP", "c", 3.0);
    m.set_weight("c,lst=S,.", "c", 3.0);
    // Sentença só fecha depois da pontuação final.
    m.set_weight("c,nxt=S,.", "i", 3.0);

    m
}

/// Parser por chunks: POS e chunker embutidos mais os modelos `build` e
/// `check` de construção da árvore.
pub fn parser_model() -> Model {
    Model::empty(ModelKind::Parser)
        .with_manifest_entry(PARSER_TYPE_KEY, PARSER_TYPE_CHUNKING)
        .with_section(POSTAG_SECTION, pos_maxent())
        .with_section(CHUNKER_SECTION, chunker_maxent())
        .with_section(BUILD_SECTION, build_maxent())
        .with_section(CHECK_SECTION, check_maxent())
        .with_tag_dictionary(tag_dictionary())
}
