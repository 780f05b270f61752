// tests/config_env.rs
use community_keywords::config::{
    RerankPool, SeedSignal, DEFAULT_CONFIG_PATH, ENV_CONFIG_PATH, ENV_RESUME, ENV_WORKERS,
};
use community_keywords::KeywordsConfig;
use std::path::Path;
use std::{env, fs};

fn clear_env() {
    env::remove_var(ENV_CONFIG_PATH);
    env::remove_var(ENV_WORKERS);
    env::remove_var(ENV_RESUME);
}

#[test]
fn shipped_config_matches_defaults() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_CONFIG_PATH);
    let cfg = KeywordsConfig::from_path(&path).unwrap();
    assert_eq!(cfg, KeywordsConfig::default());
}

#[test]
fn partial_toml_keeps_defaults_and_clamps() {
    let cfg = KeywordsConfig::from_toml_str(
        r#"
[compose]
seed_signal = "theme_blend"
anchor_alpha = 3.5
max_ratio = 0.2

[rerank]
enabled = true
pool = "posts_only"
beta = -1.0

[tfidf.posts]
idf_power = 0.3
"#,
    )
    .unwrap();
    assert_eq!(cfg.compose.seed_signal, SeedSignal::ThemeBlend);
    assert_eq!(cfg.compose.anchor_alpha, 1.0);
    assert_eq!(cfg.compose.max_ratio, 1.0);
    assert_eq!(cfg.rerank.pool, RerankPool::PostsOnly);
    assert!(cfg.rerank.enabled);
    assert_eq!(cfg.rerank.beta, 0.0);
    assert_eq!(cfg.tfidf.posts.idf_power, 0.3);
    assert_eq!(cfg.tfidf.description.idf_power, 0.85);
    assert_eq!(cfg.merge, KeywordsConfig::default().merge);
}

#[test]
fn partial_tfidf_tables_keep_their_corpus_presets() {
    let cfg = KeywordsConfig::from_toml_str(
        "[tfidf.posts]\nensure_k = 5\n\n[tfidf.description]\nmax_terms = 30\n",
    )
    .unwrap();
    assert_eq!(cfg.tfidf.posts.ensure_k, 5);
    assert_eq!(cfg.tfidf.posts.idf_power, 0.5);
    assert_eq!(cfg.tfidf.description.max_terms, 30);
    assert_eq!(cfg.tfidf.description.idf_power, 0.85);
    assert_eq!(cfg.tfidf.description.ensure_k, 3);

    let cfg = KeywordsConfig::from_toml_str("[tfidf.posts]\nidf_power = inf\n").unwrap();
    assert_eq!(cfg.tfidf.posts.idf_power, 0.5);
}

#[test]
fn unknown_enum_values_are_rejected() {
    assert!(KeywordsConfig::from_toml_str("[rerank]\npool = \"everything\"\n").is_err());
}

#[serial_test::serial]
#[test]
fn load_prefers_env_path_then_applies_overrides() {
    clear_env();
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();

    // 1) nothing on disk -> defaults
    let cfg = KeywordsConfig::load().unwrap();
    assert_eq!(cfg, KeywordsConfig::default());

    // 2) fallback file under ./config/
    fs::create_dir_all(tmp.path().join("config")).unwrap();
    fs::write(
        tmp.path().join(DEFAULT_CONFIG_PATH),
        "[merge]\ntop_k = 10\n",
    )
    .unwrap();
    assert_eq!(KeywordsConfig::load().unwrap().merge.top_k, 10);

    // 3) env path wins
    let custom = tmp.path().join("custom.toml");
    fs::write(&custom, "[merge]\ntop_k = 7\n[run]\nresume = true\n").unwrap();
    env::set_var(ENV_CONFIG_PATH, custom.display().to_string());
    assert_eq!(KeywordsConfig::load().unwrap().merge.top_k, 7);

    // 4) env overrides on top of the file
    env::set_var(ENV_WORKERS, "3");
    env::set_var(ENV_RESUME, "0");
    let cfg = KeywordsConfig::load().unwrap();
    assert_eq!(cfg.run.workers, Some(3));
    assert!(!cfg.run.resume);

    // invalid values are ignored
    env::set_var(ENV_WORKERS, "zero");
    env::set_var(ENV_RESUME, "maybe");
    let cfg = KeywordsConfig::load().unwrap();
    assert_eq!(cfg.run.workers, None);
    assert!(cfg.run.resume);

    // 5) a dangling env path is an error
    env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml").display().to_string());
    assert!(KeywordsConfig::load().is_err());

    clear_env();
    env::set_current_dir(&old).unwrap();
}
