//! Cenários ponta a ponta sobre os modelos embutidos, passando pelo formato
//! binário como um modelo externo passaria.

use std::sync::Arc;

use nlp_core::bio::is_valid_sequence;
use nlp_core::builtin;
use nlp_core::decoder::ContextGenerator;
use nlp_core::features::PosContext;
use nlp_core::trainer::{train, Event, TrainParams};
use nlp_core::{
    load_model, model_to_bytes, Chunker, DecoderConfig, Model, ModelKind, NameFinder, NameFinderConfig,
    NlpError, Parser, ParserConfig, PosTagger, SentenceConfig, SentenceDetector, Tokenizer, TokenizerConfig,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Serializa e recarrega, como se o modelo viesse de um arquivo.
fn reload(model: Model) -> Arc<Model> {
    let bytes = model_to_bytes(&model).unwrap();
    load_model(&bytes).unwrap()
}

const CHUNK_TOKENS: [&str; 28] = [
    "Rockwell", "International", "Corp.", "'s", "Tulsa", "unit", "said", "it", "signed", "a",
    "tentative", "agreement", "extending", "its", "contract", "with", "Boeing", "Co.", "to",
    "provide", "structural", "parts", "for", "Boeing", "'s", "747", "jetliners", ".",
];
const CHUNK_TAGS: [&str; 28] = [
    "NNP", "NNP", "NNP", "POS", "NNP", "NN", "VBD", "PRP", "VBD", "DT", "JJ", "NN", "VBG", "PRP$",
    "NN", "IN", "NNP", "NNP", "TO", "VB", "JJ", "NNS", "IN", "NNP", "POS", "CD", "NNS", ".",
];

#[test]
fn distributions_are_normalized_and_deterministic() {
    init_tracing();
    let models = [
        builtin::sentence_model(),
        builtin::tokenizer_model(),
        builtin::pos_model(),
        builtin::chunker_model(),
        builtin::name_finder_model(),
        builtin::parser_model(),
    ];
    for model in models {
        let model = reload(model);
        for (name, maxent) in model.sections() {
            let mut contexts: Vec<Vec<String>> = vec![Vec::new(), vec!["bias".into(), "unknown".into()]];
            contexts.extend(maxent.predicates().iter().take(50).map(|p| vec![p.clone()]));
            for ctx in &contexts {
                let first = maxent.eval(ctx);
                let total: f64 = first.iter().sum();
                assert!((total - 1.0).abs() < 1e-6, "seção {name}: soma {total}");
                let second = maxent.eval(ctx);
                let same = first.iter().zip(&second).all(|(a, b)| a.to_bits() == b.to_bits());
                assert!(same, "seção {name}: avaliação não determinística");
            }
        }
    }
}

#[test]
fn splits_two_sentences() {
    init_tracing();
    let mut detector = SentenceDetector::new(reload(builtin::sentence_model()), SentenceConfig::default()).unwrap();
    let sentences = detector.sent_detect("First sentence. Second sentence.").unwrap();
    assert_eq!(sentences.len(), 2);
    for s in &sentences {
        assert!(!s.is_empty());
        assert_eq!(s.trim(), s.as_str());
    }
    assert_eq!(detector.probs().len(), 2);

    let text = "  First sentence. Second sentence. ";
    let sentences = detector.sent_detect(text).unwrap();
    assert_eq!(sentences, vec!["First sentence.", "Second sentence."]);
    assert_eq!(detector.probs().len(), 2);
    let spans = detector.sent_pos_detect(text).unwrap();
    assert_eq!((spans[0].start, spans[1].end), (2, text.len() - 1));
}

#[test]
fn tokenizes_sample_sentence() {
    init_tracing();
    let tokenizer = Tokenizer::from_config(Some(reload(builtin::tokenizer_model())), TokenizerConfig::default()).unwrap();
    let tokens = tokenizer.tokenize("An input sample sentence.").unwrap();
    assert_eq!(tokens, vec!["An", "input", "sample", "sentence", "."]);
}

#[test]
fn tags_twelve_tokens() {
    init_tracing();
    let tokens = [
        "Most", "large", "cities", "in", "the", "US", "had", "morning", "and", "afternoon",
        "newspapers", ".",
    ];
    let mut tagger = PosTagger::new(reload(builtin::pos_model()), DecoderConfig::default()).unwrap();
    let tags = tagger.tag(&tokens).unwrap();
    assert_eq!(tags.len(), 12);
    assert_eq!(tagger.probs().len(), 12);
    assert!(tagger.probs().iter().all(|p| *p > 0.0 && *p <= 1.0));
}

#[test]
fn chunks_twenty_eight_tokens() {
    init_tracing();
    let mut chunker = Chunker::new(reload(builtin::chunker_model()), DecoderConfig::default()).unwrap();
    let labels = chunker.chunk(&CHUNK_TOKENS, &CHUNK_TAGS).unwrap();
    assert_eq!(labels.len(), 28);
    assert_eq!(chunker.probs().len(), 28);
    assert!(is_valid_sequence(&labels));

    for seq in chunker.top_k_sequences(&CHUNK_TOKENS, &CHUNK_TAGS, 10).unwrap() {
        assert!(is_valid_sequence(seq.outcomes()));
    }
}

#[test]
fn finds_pierre_vinken() {
    init_tracing();
    let tokens = ["Pierre", "Vinken", "is", "61", "years", "old", "."];
    let mut finder = NameFinder::new(reload(builtin::name_finder_model()), NameFinderConfig::default()).unwrap();
    let spans = finder.find(&tokens).unwrap();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].covered_tokens(&tokens).as_deref(), Some("Pierre Vinken"));
}

#[test]
fn parses_fox_sentence() {
    init_tracing();
    let parser = Parser::create(reload(builtin::parser_model()), ParserConfig::default()).unwrap();
    let trees = parser.parse_line("The quick brown fox jumps over the lazy dog .", 1).unwrap();
    assert_eq!(trees.len(), 1);
    assert_eq!(trees[0].label(), None);
    assert_eq!(trees[0].tokens().len(), 10);
}

#[test]
fn corrupt_model_is_rejected() {
    init_tracing();
    let mut bytes = model_to_bytes(&builtin::pos_model()).unwrap();
    bytes[0] = b'X';
    assert!(matches!(load_model(&bytes), Err(NlpError::CorruptModel(_))));

    let bytes = model_to_bytes(&builtin::pos_model()).unwrap();
    let truncated = &bytes[..bytes.len() / 2];
    assert!(matches!(load_model(truncated), Err(NlpError::CorruptModel(_))));
}

#[test]
fn wrong_model_kind_is_rejected() {
    init_tracing();
    let model = reload(builtin::chunker_model());
    assert_eq!(model.kind(), ModelKind::Chunker);
    let err = PosTagger::new(model, DecoderConfig::default()).unwrap_err();
    assert!(matches!(err, NlpError::UnsupportedModelType(_)));
}

#[test]
fn failed_call_leaves_stage_reusable() {
    init_tracing();
    let mut tagger = PosTagger::new(reload(builtin::pos_model()), DecoderConfig::default()).unwrap();
    let empty: [&str; 0] = [];
    assert!(matches!(tagger.tag(&empty), Err(NlpError::InvalidInput(_))));
    assert_eq!(tagger.tag(&["the", "dog"]).unwrap().len(), 2);
}

#[test]
fn reloaded_model_predicts_like_original() {
    init_tracing();
    let tokens = ["The", "quick", "brown", "fox", "jumps", "over", "the", "lazy", "dog", "."];
    let original = PosTagger::new(Arc::new(builtin::pos_model()), DecoderConfig::default()).unwrap();
    let reloaded = PosTagger::new(reload(builtin::pos_model()), DecoderConfig::default()).unwrap();
    let (tags_a, probs_a) = original.tag_with_probs(&tokens).unwrap();
    let (tags_b, probs_b) = reloaded.tag_with_probs(&tokens).unwrap();
    assert_eq!(tags_a, tags_b);
    for (a, b) in probs_a.iter().zip(&probs_b) {
        assert!((a - b).abs() < 1e-9);
    }
}

#[test]
fn trained_tagger_reproduces_training_tags() {
    init_tracing();
    let corpus: [(&[&str], &[&str]); 3] = [
        (&["The", "dog", "barks", "."], &["DT", "NN", "VBZ", "."]),
        (&["A", "cat", "sleeps", "."], &["DT", "NN", "VBZ", "."]),
        (&["Birds", "sing", "loudly", "."], &["NNS", "VBP", "RB", "."]),
    ];
    let mut events = Vec::new();
    for &(tokens, tags) in &corpus {
        let contexts = PosContext::new(tokens);
        let gold: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
        for (i, tag) in tags.iter().enumerate() {
            events.push(Event::new(*tag, contexts.context(i, &gold[..i])));
        }
    }
    let params = TrainParams {
        iterations: 60,
        ..TrainParams::default()
    };
    let maxent = train(&events, params).unwrap();
    let model = reload(Model::new(ModelKind::PosTagger, maxent));

    let mut tagger = PosTagger::new(model, DecoderConfig::default()).unwrap();
    for &(tokens, tags) in &corpus {
        assert_eq!(tagger.tag(tokens).unwrap(), tags.to_vec());
        assert!(tagger.probs().iter().all(|p| *p > 0.0 && *p <= 1.0));
    }
}
