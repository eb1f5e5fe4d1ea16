//! Selector configuration loading and merge behavior.

use browser_tools::{GoogleSearchSelectors, HackerNewsSelectors, SelectorConfig};

#[test]
fn defaults_cover_every_field() {
    let config = SelectorConfig::defaults();
    assert!(!config.google_search.result_item.is_empty());
    assert!(!config.google_search.title.is_empty());
    assert!(!config.google_search.link.is_empty());
    assert!(!config.google_search.snippet.is_empty());
    assert!(!config.google_search.fallback_wait.is_empty());
    assert!(!config.hacker_news.main_table.is_empty());
    assert!(!config.hacker_news.title_link.is_empty());
    assert!(!config.hacker_news.score.is_empty());
    assert!(!config.hacker_news.author.is_empty());
    assert!(!config.hacker_news.time.is_empty());
    assert!(!config.hacker_news.comments.is_empty());
    assert!(!config.hacker_news.fallback_wait.is_empty());
}

#[test]
fn override_file_merges_per_field() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("selectors.json");
    std::fs::write(
        &path,
        r#"{
            "google_search": {
                "result_item": ["div.custom-result"],
                "snippet": []
            },
            "hacker_news": {
                "title_link": ["a.new-style"]
            }
        }"#,
    )
    .unwrap();

    let config = SelectorConfig::load(Some(&path)).unwrap();

    // Overridden fields take the file's values.
    assert_eq!(config.google_search.result_item, vec!["div.custom-result"]);
    assert_eq!(config.hacker_news.title_link, vec!["a.new-style"]);

    // Empty and absent fields both fall back to defaults.
    assert_eq!(
        config.google_search.snippet,
        GoogleSearchSelectors::defaults().snippet
    );
    assert_eq!(
        config.google_search.title,
        GoogleSearchSelectors::defaults().title
    );
    assert_eq!(
        config.hacker_news.score,
        HackerNewsSelectors::defaults().score
    );
}

#[test]
fn full_config_survives_a_write_read_cycle() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("selectors.json");

    let defaults = SelectorConfig::defaults();
    std::fs::write(&path, serde_json::to_string_pretty(&defaults).unwrap()).unwrap();

    let loaded = SelectorConfig::load(Some(&path)).unwrap();
    assert_eq!(loaded, defaults);
}

#[test]
fn garbage_file_does_not_silently_become_defaults() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("selectors.json");
    std::fs::write(&path, "not json at all").unwrap();

    assert!(SelectorConfig::load(Some(&path)).is_err());
}
