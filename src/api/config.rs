// Construction-time options shared by every source kind, loaded from JSON.
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::core::error::{Error, ErrorKind, io_error_kind};

/// Absent fields keep each source's default: `"c:"` key prefix, no cookie,
/// `proxy_all = true`, and the transport's own timeout.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    #[serde(default)]
    pub redis_key_prefix: Option<String>,
    #[serde(default)]
    pub cookie: Option<String>,
    #[serde(default)]
    pub proxy_all: Option<bool>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl SourceConfig {
    pub fn from_json_str(text: &str) -> Result<Self, Error> {
        serde_json::from_str(text).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message("invalid source config json")
                .with_source(err)
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            Error::new(io_error_kind(&err))
                .with_message("failed to read source config")
                .with_path(path)
                .with_source(err)
        })?;
        Self::from_json_str(&text).map_err(|err| err.with_path(path))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}
