//! Tree Collector behavior on synthetic trees

use super::test_utils::{site, write_file};
use permadeploy::tree::{Collector, CollectorConfig};

fn paths(collector: &Collector, root: &std::path::Path) -> Vec<String> {
    collector
        .collect(root)
        .unwrap()
        .into_iter()
        .map(|e| e.logical_path)
        .collect()
}

#[test]
fn test_default_rules_on_typical_build_output() {
    let site = site(&[
        ("index.html", "home"),
        ("blog/post-1/index.html", "post"),
        ("assets/app.3f2a.js", "js"),
        ("assets/app.3f2a.js.map", "{}"),
        ("assets/fonts/inter.woff2", "font"),
        ("favicon.ico", "ico"),
        ("site.webmanifest", "{}"),
        ("CHANGELOG.md", "notes"),
        ("LICENSE", "mit"),
        ("debug.log", "log"),
        (".env.production", "KEY=1"),
        (".git/HEAD", "ref"),
        ("node_modules/lib/index.js", "lib"),
        ("templates/page.hbs", "{{x}}"),
        ("scripts/build.sh", "echo"),
        ("Makefile", "all:"),
    ]);

    let collector = Collector::new(CollectorConfig::default()).unwrap();
    assert_eq!(
        paths(&collector, site.path()),
        vec![
            "assets/app.3f2a.js",
            "assets/app.3f2a.js.map",
            "assets/fonts/inter.woff2",
            "blog/post-1/index.html",
            "favicon.ico",
            "index.html",
            "site.webmanifest",
        ]
    );
}

#[test]
fn test_collection_is_deterministic() {
    let site = site(&[("b.html", "b"), ("a/z.css", "z"), ("a/b.css", "b"), ("c.js", "c")]);
    let collector = Collector::new(CollectorConfig::default()).unwrap();

    let first = collector.collect(site.path()).unwrap();
    let second = collector.collect(site.path()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_exclusion_is_relative_to_root() {
    // The root itself lives under a directory named like an excluded rule.
    let outer = tempfile::TempDir::new().unwrap();
    let root = outer.path().join("src").join("dist");
    write_file(&root, "index.html", "home");

    let collector = Collector::new(CollectorConfig::default()).unwrap();
    assert_eq!(paths(&collector, &root), vec!["index.html"]);
}

#[test]
fn test_custom_rules_from_config() {
    let site = site(&[
        ("index.html", "home"),
        ("drafts/wip.html", "wip"),
        ("blog/drafts/idea.html", "idea"),
        ("data/feed.xml", "<rss/>"),
    ]);
    let config = CollectorConfig {
        exclude: vec!["blog/drafts".to_string()],
        allowed_extensions: vec!["html".to_string()],
        ..CollectorConfig::default()
    };
    let collector = Collector::new(config).unwrap();

    assert_eq!(
        paths(&collector, site.path()),
        vec!["drafts/wip.html", "index.html"]
    );
}

#[test]
fn test_decomposed_unicode_names_are_normalized() {
    // "café.html" with a combining acute accent
    let site = site(&[("cafe\u{301}.html", "menu"), ("index.html", "home")]);
    let collector = Collector::new(CollectorConfig::default()).unwrap();

    let collected = paths(&collector, site.path());
    assert!(collected.contains(&"caf\u{e9}.html".to_string()));
}
