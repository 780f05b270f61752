// tests/stopword_boundary.rs
// Removed stopwords and punctuation must split phrases: no "bridge grams" anywhere downstream.

use community_keywords::text::TextKind;
use community_keywords::{Community, KeywordEngine, KeywordsConfig};
use std::collections::BTreeMap;

fn community(id: &str, description: &str) -> Community {
    Community {
        id: id.into(),
        display_name: id.into(),
        name: id.into(),
        description: description.into(),
        subscribers: None,
    }
}

#[test]
fn no_gram_spans_a_removed_stopword() {
    let communities = vec![
        community("fruit", "Apples and Bananas. Cherries, plums; grapes!"),
        community("other", "Gardening tips"),
    ];
    let engine =
        KeywordEngine::prepare(KeywordsConfig::default(), &communities, &BTreeMap::new(), None)
            .unwrap();

    for bridge in ["apples bananas", "bananas cherries", "cherries plums", "plums grapes"] {
        assert_eq!(engine.descriptions().df(bridge), 0, "{bridge} counted");
    }
    assert_eq!(engine.descriptions().df("apples"), 1);

    let ex = engine.explain(&communities[0], None);
    let texts: Vec<&str> = ex.terms.description.iter().map(|t| t.text.as_str()).collect();
    assert!(texts.contains(&"apples"));
    assert!(texts.contains(&"bananas"));
    assert!(texts.iter().all(|t| !t.contains(' ')), "{texts:?}");
}

#[test]
fn tokenizer_marks_the_gap() {
    let engine = KeywordEngine::prepare(
        KeywordsConfig::default(),
        &[community("x", "placeholder")],
        &BTreeMap::new(),
        None,
    )
    .unwrap();
    let words = engine
        .tokenizer()
        .words("Cabin air filter: <$10 and 1 minute of your time", TextKind::PostTitle);
    assert_eq!(words, vec!["cabin", "air", "filter", "minute", "time"]);

    let pieces = engine
        .tokenizer()
        .tokenize("Cabin air filter: <$10 and 1 minute of your time", TextKind::PostTitle);
    let grams = community_keywords::text::extract_ngrams(&pieces, 3);
    assert!(grams.contains(&"cabin air filter".to_string()));
    assert!(!grams.iter().any(|g| g.contains("filter minute")));
    assert!(!grams.iter().any(|g| g.contains("minute time")));
}
