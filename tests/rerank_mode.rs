// tests/rerank_mode.rs
// Rerank-only pass over existing record files.

use community_keywords::config::RerankPool;
use community_keywords::ingest::JsonBatchDir;
use community_keywords::output::{self, RECORDS_DIR};
use community_keywords::{run_rerank, run_score, KeywordsConfig, ScoredRecord};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

async fn scored_run(root: &Path) -> (KeywordsConfig, std::path::PathBuf) {
    let communities = root.join("communities");
    let posts = root.join("posts");
    fs::create_dir_all(&communities).unwrap();
    fs::create_dir_all(&posts).unwrap();
    fs::write(
        communities.join("page_001.json"),
        r#"[
            {"id":"cx5","name":"CX5","description":"Owners of the Mazda CX-5 crossover."},
            {"id":"sourdough","name":"Sourdough","description":"Bread baking with wild yeast."}
        ]"#,
    )
    .unwrap();
    fs::write(
        posts.join("cx5.json"),
        r#"{"anchor_title":"Mazda CX-5","posts":[
            {"title":"Cabin air filter: <$10 and 1 minute of your time","score":795,"num_comments":92},
            {"title":"Quarterly earnings call transcript","score":2}
        ]}"#,
    )
    .unwrap();
    fs::write(
        posts.join("sourdough.json"),
        r#"[{"title":"Starter feeding schedule"},{"title":"Open crumb loaf"}]"#,
    )
    .unwrap();

    let mut cfg = KeywordsConfig::default();
    cfg.run.output_dir = root.join("out");
    cfg.run.cache_dir = root.join("cache");
    cfg.run.workers = Some(2);
    let src = JsonBatchDir::new(&communities, &posts);
    run_score(cfg.clone(), &src, &src).await.unwrap();
    (cfg, root.join("out").join(RECORDS_DIR))
}

fn read_all(records_dir: &Path) -> Vec<(Vec<u8>, ScoredRecord)> {
    output::list_records(records_dir)
        .unwrap()
        .into_iter()
        .map(|p| (fs::read(&p).unwrap(), output::read_record(&p).unwrap()))
        .collect()
}

#[tokio::test]
async fn unavailable_model_leaves_records_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let (mut cfg, records_dir) = scored_run(dir.path()).await;
    let before = read_all(&records_dir);

    cfg.rerank.model = "no-such-model".into();
    let rewritten = run_rerank(&cfg, records_dir.clone()).await.unwrap();
    assert_eq!(rewritten, before.len());

    let after = read_all(&records_dir);
    let bytes = |v: &[(Vec<u8>, ScoredRecord)]| v.iter().map(|(b, _)| b.clone()).collect::<Vec<_>>();
    assert_eq!(bytes(&after), bytes(&before));
}

#[tokio::test]
async fn rerank_rescales_without_changing_the_term_set() {
    let dir = tempfile::tempdir().unwrap();
    let (mut cfg, records_dir) = scored_run(dir.path()).await;
    let before = read_all(&records_dir);

    // rerank.enabled stays false: the standalone pass runs regardless
    cfg.rerank.beta = 1.0;
    cfg.rerank.pool = RerankPool::All;
    cfg.rerank.batch_size = 3;
    let rewritten = run_rerank(&cfg, records_dir.clone()).await.unwrap();
    assert_eq!(rewritten, before.len());

    let after = read_all(&records_dir);
    assert_eq!(after.len(), before.len());
    let mut changed = false;
    for ((_, old), (_, new)) in before.iter().zip(&after) {
        assert_eq!(old.community_id, new.community_id);
        let terms = |r: &ScoredRecord| r.keywords.iter().map(|k| k.term.clone()).collect::<BTreeSet<_>>();
        assert_eq!(terms(old), terms(new));
        assert!((new.weight_sum() - 1.0).abs() < 1e-6);
        assert!(new.keywords.windows(2).all(|w| w[0].score >= w[1].score));
        changed |= old != new;
    }
    assert!(changed, "a full-strength rerank should move at least one score");
}

#[tokio::test]
async fn missing_records_dir_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = KeywordsConfig::default();
    assert!(run_rerank(&cfg, dir.path().join("nowhere")).await.is_err());
}
