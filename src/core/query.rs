// Structured CDX query: typed lookup fields plus verbatim passthrough parameters.
use std::fmt;
use std::str::FromStr;

use crate::core::error::{Error, ErrorKind};

pub const PARAM_KEY: &str = "key";
pub const PARAM_END_KEY: &str = "end_key";
pub const PARAM_URL: &str = "url";
pub const PARAM_MATCH_TYPE: &str = "matchType";
pub const PARAM_PROXY_ALL: &str = "proxyAll";

/// How `key` relates to the captures a query should return.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum MatchType {
    #[default]
    Exact,
    Prefix,
    Host,
    Domain,
    Range,
}

impl MatchType {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchType::Exact => "exact",
            MatchType::Prefix => "prefix",
            MatchType::Host => "host",
            MatchType::Domain => "domain",
            MatchType::Range => "range",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchType {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "exact" => Ok(MatchType::Exact),
            "prefix" => Ok(MatchType::Prefix),
            "host" => Ok(MatchType::Host),
            "domain" => Ok(MatchType::Domain),
            "range" => Ok(MatchType::Range),
            other => Err(Error::new(ErrorKind::Usage)
                .with_message(format!("unknown matchType '{other}'"))),
        }
    }
}

/// Read-only input to `Source::load`.
///
/// `params` holds every field without a typed slot, in caller order; names may
/// repeat (several `filter` entries, for example).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CdxQuery {
    pub key: String,
    pub end_key: Option<String>,
    pub url: Option<String>,
    pub match_type: Option<MatchType>,
    pub params: Vec<(String, String)>,
}

impl CdxQuery {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn with_end_key(mut self, end_key: impl Into<String>) -> Self {
        self.end_key = Some(end_key.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_match_type(mut self, match_type: MatchType) -> Self {
        self.match_type = Some(match_type);
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Absent means exact.
    pub fn effective_match_type(&self) -> MatchType {
        self.match_type.unwrap_or_default()
    }

    pub fn from_pairs<I, N, V>(pairs: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<String>,
    {
        let mut query = CdxQuery::default();
        for (name, value) in pairs {
            let name = name.into();
            let value = value.into();
            match name.as_str() {
                PARAM_KEY => query.key = value,
                PARAM_END_KEY => query.end_key = Some(value),
                PARAM_URL => query.url = Some(value),
                PARAM_MATCH_TYPE => query.match_type = Some(value.parse()?),
                _ => query.params.push((name, value)),
            }
        }
        Ok(query)
    }

    /// Every field of the query as name/value pairs, typed fields first.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.params.len() + 4);
        pairs.push((PARAM_KEY.to_string(), self.key.clone()));
        if let Some(end_key) = &self.end_key {
            pairs.push((PARAM_END_KEY.to_string(), end_key.clone()));
        }
        if let Some(url) = &self.url {
            pairs.push((PARAM_URL.to_string(), url.clone()));
        }
        if let Some(match_type) = self.match_type {
            pairs.push((PARAM_MATCH_TYPE.to_string(), match_type.to_string()));
        }
        pairs.extend(self.params.iter().cloned());
        pairs
    }
}
