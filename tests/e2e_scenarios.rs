// tests/e2e_scenarios.rs
// End-to-end ranking scenarios on small in-memory corpora.

use community_keywords::model::Post;
use community_keywords::{Community, KeywordEngine, KeywordsConfig, PostBundle, Source};
use std::collections::BTreeMap;

fn community(id: &str, name: &str, description: &str) -> Community {
    Community {
        id: id.into(),
        display_name: name.into(),
        name: name.into(),
        description: description.into(),
        subscribers: None,
    }
}

fn post(title: &str, score: i64, comments: u64) -> Post {
    Post {
        title: title.into(),
        score,
        comment_count: comments,
        created_at: None,
    }
}

fn bundle(id: &str, anchor: Option<&str>, posts: Vec<Post>) -> PostBundle {
    PostBundle {
        community_id: id.into(),
        anchor_title: anchor.map(str::to_string),
        posts,
    }
}

fn corpus() -> (Vec<Community>, BTreeMap<String, PostBundle>) {
    let communities = vec![
        community(
            "alcoholliversupport",
            "AlcoholLiverSupport",
            "Support for people recovering their liver health after years of alcohol.",
        ),
        community("cx5", "CX5", "Owners of the Mazda CX-5 crossover."),
        community(
            "pastlives",
            "PastLives",
            "Stories about reincarnation and memories from before birth.",
        ),
    ];
    let mut bundles = BTreeMap::new();
    bundles.insert(
        "cx5".to_string(),
        bundle(
            "cx5",
            Some("Mazda CX-5"),
            vec![post("Cabin air filter: <$10 and 1 minute of your time", 795, 92)],
        ),
    );
    bundles.insert(
        "pastlives".to_string(),
        bundle(
            "pastlives",
            None,
            vec![
                post("Past life memories from early childhood", 40, 12),
                post("My past life regression session", 18, 3),
            ],
        ),
    );
    (communities, bundles)
}

fn engine() -> (KeywordEngine, Vec<Community>, BTreeMap<String, PostBundle>) {
    let (communities, bundles) = corpus();
    let engine = KeywordEngine::prepare(KeywordsConfig::default(), &communities, &bundles, None)
        .expect("engine");
    (engine, communities, bundles)
}

#[test]
fn whole_name_outranks_its_fragments() {
    let (engine, communities, bundles) = engine();
    let c = &communities[0];
    let rec = engine.score_community(c, bundles.get(&c.id));

    let top = &rec.keywords[0];
    assert_eq!(top.term, "alcohol liver support");
    assert_eq!(top.display.as_deref(), Some("Alcohol Liver Support"));
    assert!(top.source.contains(Source::Name));

    let weight_of = |t: &str| rec.keywords.iter().find(|k| k.term == t).map(|k| k.weight);
    for fragment in ["alcohol", "liver", "support"] {
        let w = weight_of(fragment).unwrap_or(0.0);
        assert!(w < top.weight, "{fragment} ({w}) should rank below the whole name");
    }
}

#[test]
fn anchored_composite_is_emitted_on_the_seed_scale() {
    let (engine, communities, bundles) = engine();
    let c = &communities[1];
    let ex = engine.explain(c, bundles.get(&c.id));

    let anchor = ex.anchor.as_ref().expect("anchor");
    assert_eq!(anchor.text, "mazda cx-5");
    assert_eq!(anchor.display, "Mazda CX-5");

    let seed = ex
        .terms
        .posts
        .iter()
        .find(|t| t.text == "cabin air filter")
        .expect("seed phrase");
    let composite = ex
        .terms
        .composed
        .iter()
        .find(|t| t.text == "mazda cx-5 cabin air filter")
        .expect("composite phrase");
    let ratio = composite.score / seed.score;
    assert!(ratio >= 1.0, "composite never falls below its seed");
    assert!(
        ratio <= engine.config().compose.max_ratio + 1e-9,
        "ratio {ratio} exceeds the configured cap"
    );

    let kw = ex
        .record
        .keywords
        .iter()
        .find(|k| k.term == "mazda cx-5 cabin air filter")
        .expect("composite in record");
    assert_eq!(kw.display.as_deref(), Some("Mazda CX-5 cabin air filter"));
    assert!(kw.source.contains(Source::PostsComposed));
}

#[test]
fn anchor_is_never_composed_with_itself() {
    let (engine, communities, bundles) = engine();
    let c = &communities[2];
    let ex = engine.explain(c, bundles.get(&c.id));

    assert!(ex.terms.posts.iter().any(|t| t.text == "past life"));
    assert!(ex.terms.composed.iter().all(|t| t.text != "past lives past life"));
    assert!(ex
        .terms
        .composed
        .iter()
        .all(|t| !t.text.starts_with("past lives past life")));
    assert!(ex
        .record
        .keywords
        .iter()
        .all(|k| k.term != "past lives past life"));
}

#[test]
fn tokenized_anchor_is_not_used_as_a_seed() {
    let communities = vec![
        community("cx5", "CX5", "Owners of the Mazda CX-5 crossover."),
        community("sourdough", "Sourdough", "Bread baking with wild yeast."),
    ];
    let mut bundles = BTreeMap::new();
    bundles.insert(
        "cx5".to_string(),
        bundle(
            "cx5",
            Some("Mazda CX-5"),
            vec![
                post("My Mazda CX-5 after detailing", 120, 14),
                post("Mazda CX-5 road trip", 60, 9),
                post("Mazda CX-5 winter tires", 45, 20),
                post("Cabin air filter swap", 30, 4),
            ],
        ),
    );
    let engine = KeywordEngine::prepare(KeywordsConfig::default(), &communities, &bundles, None)
        .expect("engine");
    let c = &communities[0];
    let ex = engine.explain(c, bundles.get(&c.id));

    for t in &ex.terms.composed {
        let seed = t.text.trim_start_matches("mazda cx-5 ");
        assert!(
            !seed.contains("mazda") && !seed.starts_with("cx"),
            "anchor composed with its own words: {}",
            t.text
        );
    }
    assert!(ex
        .record
        .keywords
        .iter()
        .all(|k| !k.term.starts_with("mazda cx-5 mazda")));
}

#[test]
fn every_record_is_normalised_and_sorted() {
    let (engine, communities, bundles) = engine();
    for c in &communities {
        let rec = engine.score_community(c, bundles.get(&c.id));
        assert!(!rec.is_empty(), "{} produced no keywords", c.id);
        assert!(
            (rec.weight_sum() - 1.0).abs() < 1e-6,
            "{}: weights sum to {}",
            c.id,
            rec.weight_sum()
        );
        assert!(rec.keywords.len() <= engine.config().merge.top_k);
        assert!(rec
            .keywords
            .windows(2)
            .all(|w| w[0].weight >= w[1].weight));
    }
}

#[test]
fn community_without_posts_still_scores() {
    let (engine, communities, _) = engine();
    let rec = engine.score_community(&communities[0], None);
    assert!(rec
        .keywords
        .iter()
        .all(|k| !k.source.contains(Source::Posts) && !k.source.contains(Source::PostsComposed)));
}
