//! Purpose: Define the public CDX source API: one `load` contract over three backends.
//! Exports: `Source`, `CdxLines`, `SourceConfig`, the per-backend sources, and core types.
//! Role: Closed dispatch over file, remote, and key/value sources; callers see only `load`.
//! Invariants: The variant set is fixed; each variant documents its own failure modes.
//! Invariants: `load` either fails up front or returns a lazy, single-pass line sequence.
//! Invariants: Sources hold no per-query state and are safe to share across threads.
#![allow(clippy::result_large_err)]

mod config;
mod file;
mod keyvalue;
#[cfg(feature = "redis")]
mod redis_store;
mod remote;

use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;

use url::Url;

pub use crate::core::error::{AccessDenial, Error, ErrorKind, to_exit_code};
pub use crate::core::query::{CdxQuery, MatchType};
pub use config::SourceConfig;
pub use file::{CdxFile, FileLines};
pub use keyvalue::{DEFAULT_KEY_PREFIX, KeyValueCdxSource, KeyValueLines, SortedSetStore};
#[cfg(feature = "redis")]
pub use redis_store::RedisStore;
pub use remote::{RemoteCdxSource, RemoteLines};

/// The closed set of CDX backends: a sorted local file, a remote CDX server, or a key/value store.
#[derive(Clone, Debug)]
pub enum Source {
    File(CdxFile),
    Remote(RemoteCdxSource),
    KeyValue(KeyValueCdxSource),
}

/// Record lines produced by `Source::load`, one opaque CDX line per item.
#[derive(Debug)]
pub enum CdxLines {
    File(FileLines),
    Remote(RemoteLines),
    KeyValue(KeyValueLines),
}

impl Source {
    /// Picks the backend from `location`: `http(s)://` is a remote server,
    /// `redis(s)://` a key/value store, anything else a local file path.
    pub fn open(location: &str, config: &SourceConfig) -> Result<Self, Error> {
        if has_scheme(location, &["http", "https"]) {
            return Self::remote(location, config);
        }
        if has_scheme(location, &["redis", "rediss"]) {
            return open_redis(location, config);
        }
        if has_scheme(location, &["file"]) {
            let path = Url::parse(location)
                .ok()
                .and_then(|url| url.to_file_path().ok())
                .ok_or_else(|| {
                    Error::new(ErrorKind::Usage).with_message("invalid file url for cdx source")
                })?;
            return Ok(Source::File(CdxFile::new(path)));
        }
        Ok(Source::File(CdxFile::new(location)))
    }

    pub fn remote(endpoint: &str, config: &SourceConfig) -> Result<Self, Error> {
        let mut source =
            RemoteCdxSource::new(endpoint)?.with_proxy_all(config.proxy_all.unwrap_or(true));
        if let Some(cookie) = &config.cookie {
            source = source.with_cookie(cookie.clone());
        }
        if let Some(timeout) = config.timeout() {
            source = source.with_timeout(timeout);
        }
        Ok(Source::Remote(source))
    }

    /// Key/value source over an injected store, honoring `redis_key_prefix`.
    pub fn key_value(store: Arc<dyn SortedSetStore>, config: &SourceConfig) -> Self {
        let mut source = KeyValueCdxSource::new(store);
        if let Some(prefix) = &config.redis_key_prefix {
            source = source.with_key_prefix(prefix.clone());
        }
        Source::KeyValue(source)
    }

    pub fn load(&self, query: &CdxQuery) -> Result<CdxLines, Error> {
        match self {
            Source::File(source) => source.load(query).map(CdxLines::File),
            Source::Remote(source) => source.load(query).map(CdxLines::Remote),
            Source::KeyValue(source) => source.load(query).map(CdxLines::KeyValue),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::File(source) => fmt::Display::fmt(source, f),
            Source::Remote(source) => fmt::Display::fmt(source, f),
            Source::KeyValue(source) => fmt::Display::fmt(source, f),
        }
    }
}

impl From<CdxFile> for Source {
    fn from(source: CdxFile) -> Self {
        Source::File(source)
    }
}

impl From<RemoteCdxSource> for Source {
    fn from(source: RemoteCdxSource) -> Self {
        Source::Remote(source)
    }
}

impl From<KeyValueCdxSource> for Source {
    fn from(source: KeyValueCdxSource) -> Self {
        Source::KeyValue(source)
    }
}

impl Iterator for CdxLines {
    type Item = Result<String, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            CdxLines::File(lines) => lines.next(),
            CdxLines::Remote(lines) => lines.next(),
            CdxLines::KeyValue(lines) => lines.next(),
        }
    }
}

impl FusedIterator for CdxLines {}

fn has_scheme(location: &str, schemes: &[&str]) -> bool {
    let Some((scheme, _)) = location.split_once("://") else {
        return false;
    };
    schemes
        .iter()
        .any(|candidate| scheme.eq_ignore_ascii_case(candidate))
}

#[cfg(feature = "redis")]
fn open_redis(location: &str, config: &SourceConfig) -> Result<Source, Error> {
    let mut store = RedisStore::open(location)?;
    if let Some(timeout) = config.timeout() {
        store = store.with_connect_timeout(timeout);
    }
    Ok(Source::key_value(Arc::new(store), config))
}

#[cfg(not(feature = "redis"))]
fn open_redis(_location: &str, _config: &SourceConfig) -> Result<Source, Error> {
    Err(Error::new(ErrorKind::Unsupported)
        .with_message("redis cdx sources require the `redis` feature"))
}
