// tests/resume.rs
// Batch runs over a directory of JSON input: resume skips finished communities, reruns are
// byte-identical, and empty or corrupt record files are recomputed.

use community_keywords::ingest::JsonBatchDir;
use community_keywords::output::{self, RECORDS_DIR, SKIPPED_FILE};
use community_keywords::{run_score, KeywordsConfig};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

fn write_input(root: &Path) -> (PathBuf, PathBuf) {
    let communities = root.join("communities");
    let posts = root.join("posts");
    fs::create_dir_all(&communities).unwrap();
    fs::create_dir_all(&posts).unwrap();

    fs::write(
        communities.join("page_001.json"),
        r#"[
            {"id":"r/CX5","name":"CX5","public_description":"Owners of the Mazda CX-5 crossover."},
            {"id":"r/AlcoholLiverSupport","name":"AlcoholLiverSupport","description":"Support for liver health after alcohol."}
        ]"#,
    )
    .unwrap();
    fs::write(
        communities.join("page_002.jsonl"),
        "{\"id\":\"PastLives\",\"name\":\"PastLives\",\"description\":\"Reincarnation stories.\"}\n{\"name\":\"\"}\n",
    )
    .unwrap();

    fs::write(
        posts.join("cx5.json"),
        r#"{"anchor_title":"Mazda CX-5","posts":[
            {"title":"Cabin air filter: <$10 and 1 minute of your time","score":795,"num_comments":92},
            {"title":"","score":3}
        ]}"#,
    )
    .unwrap();
    fs::write(
        posts.join("pastlives.json"),
        r#"[{"title":"Past life memories from early childhood","score":40,"num_comments":12}]"#,
    )
    .unwrap();
    (communities, posts)
}

fn config(root: &Path, resume: bool) -> KeywordsConfig {
    let mut cfg = KeywordsConfig::default();
    cfg.run.output_dir = root.join("out");
    cfg.run.cache_dir = root.join("cache");
    cfg.run.workers = Some(2);
    cfg.run.resume = resume;
    cfg
}

fn snapshot(records_dir: &Path) -> BTreeMap<String, Vec<u8>> {
    output::list_records(records_dir)
        .unwrap()
        .into_iter()
        .map(|p| {
            let name = p.file_name().unwrap().to_string_lossy().into_owned();
            (name, fs::read(&p).unwrap())
        })
        .collect()
}

#[tokio::test]
async fn resume_is_idempotent_and_recomputes_broken_records() {
    let dir = tempfile::tempdir().unwrap();
    let (communities, posts) = write_input(dir.path());
    let src = JsonBatchDir::new(&communities, &posts);
    let records_dir = dir.path().join("out").join(RECORDS_DIR);

    let first = run_score(config(dir.path(), true), &src, &src).await.unwrap();
    assert_eq!(first.communities, 3);
    assert_eq!(first.scored, 3);
    assert_eq!(first.resumed, 0);
    assert_eq!(first.skipped_records, 2, "nameless community and empty post title");
    let before = snapshot(&records_dir);
    assert_eq!(
        before.keys().cloned().collect::<Vec<_>>(),
        vec!["alcoholliversupport.jsonl", "cx5.jsonl", "pastlives.jsonl"]
    );
    assert!(dir.path().join("cache").join("df_posts.json").exists());

    let skipped = fs::read_to_string(dir.path().join("out").join(SKIPPED_FILE)).unwrap();
    assert_eq!(skipped.lines().count(), 2);

    let second = run_score(config(dir.path(), true), &src, &src).await.unwrap();
    assert_eq!(second.scored, 0);
    assert_eq!(second.resumed, 3);
    assert_eq!(snapshot(&records_dir), before);

    // empty and corrupt files do not count as done
    fs::write(output::record_path(&records_dir, "cx5"), b"").unwrap();
    fs::write(output::record_path(&records_dir, "pastlives"), b"{\"community_id\":").unwrap();
    let third = run_score(config(dir.path(), true), &src, &src).await.unwrap();
    assert_eq!(third.scored, 2);
    assert_eq!(third.resumed, 1);
    assert_eq!(snapshot(&records_dir), before);
}

#[tokio::test]
async fn full_rerun_reproduces_identical_records() {
    let dir = tempfile::tempdir().unwrap();
    let (communities, posts) = write_input(dir.path());
    let src = JsonBatchDir::new(&communities, &posts);
    let records_dir = dir.path().join("out").join(RECORDS_DIR);

    run_score(config(dir.path(), false), &src, &src).await.unwrap();
    let before = snapshot(&records_dir);

    // second run reuses the cached DF tables
    let again = run_score(config(dir.path(), false), &src, &src).await.unwrap();
    assert_eq!(again.scored, 3);
    assert_eq!(snapshot(&records_dir), before);

    let rec = output::read_record(&output::record_path(&records_dir, "cx5")).unwrap();
    assert!(rec
        .keywords
        .iter()
        .any(|k| k.term == "mazda cx-5 cabin air filter"));
}
