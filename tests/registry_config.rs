// tests/registry_config.rs
use learning_feeds::feeds::config::{
    load_registry_default, load_registry_from, FeedSettings, ENV_REFRESH_SECS, ENV_SOURCES_PATH,
    ENV_STRATEGY_TIMEOUT_MS,
};
use learning_feeds::{Category, SourceRegistry};
use std::time::Duration;
use std::{env, fs};

#[test]
fn parse_toml_and_json_paths() {
    let dir = tempfile::tempdir().unwrap();

    let p_toml = dir.path().join("feed_sources.toml");
    fs::write(
        &p_toml,
        r#"
[[sources]]
key = "HN"
url = "https://hnrss.org/newest"
category = "news"

[[sources]]
key = "Disabled"
url = "https://off.example/rss"
enabled = false
"#,
    )
    .unwrap();
    let reg = load_registry_from(&p_toml).unwrap();
    assert_eq!(reg.len(), 1);
    assert_eq!(reg.category_of("HN"), Category::News);
    assert!(reg.get("Disabled").is_none());

    let p_json = dir.path().join("feed_sources.json");
    fs::write(
        &p_json,
        r#"[{"key":"ArXiv","url":"http://export.arxiv.org/rss/cs.AI","category":"research"}]"#,
    )
    .unwrap();
    let reg = load_registry_from(&p_json).unwrap();
    assert_eq!(reg.category_of("ArXiv"), Category::Research);

    let p_bad = dir.path().join("broken.toml");
    fs::write(&p_bad, "[[sources]]\nkey = \"no url\"\n").unwrap();
    assert!(load_registry_from(&p_bad).is_err());
}

#[serial_test::serial]
#[test]
fn default_uses_env_then_fallbacks() {
    // isolate CWD so the repo's own config/ is not picked up
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();

    env::remove_var(ENV_SOURCES_PATH);

    // 1) nothing on disk: built-in list
    let reg = load_registry_default().unwrap();
    assert_eq!(reg, SourceRegistry::defaults());

    // 2) ./config/feed_sources.toml
    let cfg_dir = tmp.path().join("config");
    fs::create_dir_all(&cfg_dir).unwrap();
    fs::write(
        cfg_dir.join("feed_sources.toml"),
        "[[sources]]\nkey = \"Local\"\nurl = \"http://local/rss\"\n",
    )
    .unwrap();
    let reg = load_registry_default().unwrap();
    assert_eq!(reg.len(), 1);
    assert_eq!(reg.category_of("Local"), Category::General);

    // 3) env wins
    let p_env = tmp.path().join("env_sources.json");
    fs::write(&p_env, r#"[{"key":"X","url":"http://x","category":"community"}]"#).unwrap();
    env::set_var(ENV_SOURCES_PATH, p_env.display().to_string());
    let reg = load_registry_default().unwrap();
    assert_eq!(reg.category_of("X"), Category::Community);

    // 4) env pointing nowhere is an error, not a silent fallback
    env::set_var(ENV_SOURCES_PATH, tmp.path().join("missing.toml").display().to_string());
    assert!(load_registry_default().is_err());
    env::remove_var(ENV_SOURCES_PATH);

    env::set_current_dir(&old).unwrap();
}

#[serial_test::serial]
#[test]
fn settings_from_env() {
    env::set_var(ENV_STRATEGY_TIMEOUT_MS, "1500");
    env::set_var(ENV_REFRESH_SECS, "0");
    let s = FeedSettings::from_env();
    assert_eq!(s.strategy_timeout, Duration::from_millis(1500));
    assert_eq!(s.refresh_interval, None);

    env::remove_var(ENV_STRATEGY_TIMEOUT_MS);
    env::remove_var(ENV_REFRESH_SECS);
    let s = FeedSettings::from_env();
    assert_eq!(s.strategy_timeout, Duration::from_secs(8));
    assert_eq!(s.refresh_interval, Some(Duration::from_secs(900)));
}
