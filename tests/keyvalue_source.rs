// Key/value source lookups against an in-memory ordered-set store.
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use cdx_source::api::{
    CdxQuery, DEFAULT_KEY_PREFIX, Error, ErrorKind, KeyValueCdxSource, MatchType,
    SortedSetStore, Source, SourceConfig,
};

#[derive(Default)]
struct MemoryStore {
    sets: BTreeMap<String, Vec<String>>,
    reads: Mutex<Vec<String>>,
    fail: bool,
}

impl MemoryStore {
    fn with_set(mut self, key: &str, members: &[&str]) -> Self {
        self.sets.insert(
            key.to_string(),
            members.iter().map(|member| member.to_string()).collect(),
        );
        self
    }

    fn reads(&self) -> Vec<String> {
        self.reads
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone()
    }
}

impl SortedSetStore for MemoryStore {
    fn range_all(&self, key: &str) -> Result<Vec<String>, Error> {
        self.reads
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .push(key.to_string());
        if self.fail {
            return Err(Error::new(ErrorKind::Io).with_message("store unavailable"));
        }
        Ok(self.sets.get(key).cloned().unwrap_or_default())
    }
}

fn example_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::default().with_set(
        "c:example.com/",
        &[
            "20240101000000 http://example.com/ text/html 200 AAA - - 100 0 a.warc.gz",
            "20240202000000 http://example.com/ text/html 200 BBB - - 100 100 a.warc.gz",
        ],
    ))
}

#[test]
fn exact_lookup_normalizes_key_and_reprefixes_fragments() {
    let store = example_store();
    let source = Source::key_value(store.clone(), &SourceConfig::default());

    let lines = source
        .load(&CdxQuery::new("example.com/ val1"))
        .expect("load")
        .collect::<Result<Vec<_>, _>>()
        .expect("lines");

    assert_eq!(store.reads(), vec!["c:example.com/".to_string()]);
    assert_eq!(
        lines,
        vec![
            "example.com/ 20240101000000 http://example.com/ text/html 200 AAA - - 100 0 a.warc.gz",
            "example.com/ 20240202000000 http://example.com/ text/html 200 BBB - - 100 100 a.warc.gz",
        ]
    );
}

#[test]
fn configured_prefix_replaces_default() {
    assert_eq!(DEFAULT_KEY_PREFIX, "c:");
    let store = Arc::new(MemoryStore::default().with_set("cdx:v2:example.com/", &["frag"]));
    let config = SourceConfig {
        redis_key_prefix: Some("cdx:v2:".to_string()),
        ..SourceConfig::default()
    };
    let source = Source::key_value(store.clone(), &config);

    let lines = source
        .load(&CdxQuery::new("example.com/"))
        .expect("load")
        .collect::<Result<Vec<_>, _>>()
        .expect("lines");
    assert_eq!(lines, vec!["example.com/ frag"]);
    assert_eq!(store.reads(), vec!["cdx:v2:example.com/".to_string()]);
    assert_eq!(source.to_string(), "Redis CDX Source: cdx:v2:");
}

#[test]
fn missing_key_is_empty_sequence() {
    let source = KeyValueCdxSource::new(example_store());
    let mut lines = source.load(&CdxQuery::new("nothing.example/")).expect("load");
    assert!(lines.next().is_none());
}

#[test]
fn explicit_exact_match_is_served() {
    let source = KeyValueCdxSource::new(example_store());
    let query = CdxQuery::new("example.com/").with_match_type(MatchType::Exact);
    assert_eq!(source.load(&query).expect("load").count(), 2);
}

#[test]
fn range_match_types_are_unsupported() {
    let store = example_store();
    let source = KeyValueCdxSource::new(store.clone());

    for match_type in [
        MatchType::Prefix,
        MatchType::Host,
        MatchType::Domain,
        MatchType::Range,
    ] {
        let query = CdxQuery::new("example.com/").with_match_type(match_type);
        let err = source.load(&query).expect_err("unsupported");
        assert_eq!(err.kind(), ErrorKind::Unsupported, "{match_type}");
    }
    assert!(store.reads().is_empty());
}

#[test]
fn empty_key_is_usage_error() {
    let source = KeyValueCdxSource::new(example_store());
    let err = source.load(&CdxQuery::new(" val1")).expect_err("empty");
    assert_eq!(err.kind(), ErrorKind::Usage);
}

#[test]
fn store_failures_propagate_unchanged() {
    let store = Arc::new(MemoryStore {
        fail: true,
        ..MemoryStore::default()
    });
    let source = KeyValueCdxSource::new(store);
    let err = source.load(&CdxQuery::new("example.com/")).expect_err("fail");
    assert_eq!(err.kind(), ErrorKind::Io);
    assert_eq!(err.message(), Some("store unavailable"));
}
