//! Purpose: CDX source that proxies queries to a remote CDX index server.
//! Exports: `RemoteCdxSource`, `RemoteLines`.
//! Role: Builds the forwarded parameter set, POSTs it form-encoded, streams lines back.
//! Invariants: The caller's query is never mutated; `outbound_params` shows what is sent.
//! Invariants: HTTP 403 becomes an access denial; every other failure keeps its status/source.
//! Invariants: Response bodies are read line by line, never buffered whole.
#![allow(clippy::result_large_err)]

use std::fmt;
use std::io::{BufRead, BufReader, Read};
use std::iter::FusedIterator;
use std::time::Duration;

use url::Url;

use crate::core::error::{AccessDenial, Error, ErrorKind};
use crate::core::query::{CdxQuery, PARAM_MATCH_TYPE, PARAM_PROXY_ALL, PARAM_URL};

type ApiResult<T> = Result<T, Error>;

const DENIAL_STATUS: u16 = 403;

/// Each instance owns its own HTTP connection pool, and so does each clone,
/// unless the agent was injected with `with_agent`.
pub struct RemoteCdxSource {
    endpoint: Url,
    cookie: Option<String>,
    proxy_all: bool,
    timeout: Option<Duration>,
    agent: ureq::Agent,
    injected_agent: bool,
}

pub struct RemoteLines {
    reader: Option<BufReader<Box<dyn Read + Send + Sync>>>,
    line: String,
}

impl RemoteCdxSource {
    pub fn new(endpoint: impl Into<String>) -> ApiResult<Self> {
        let endpoint = parse_endpoint(endpoint.into())?;
        Ok(Self {
            endpoint,
            cookie: None,
            proxy_all: true,
            timeout: None,
            agent: build_agent(None),
            injected_agent: false,
        })
    }

    /// Raw `Cookie` header value sent with every request.
    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }

    pub fn with_proxy_all(mut self, proxy_all: bool) -> Self {
        self.proxy_all = proxy_all;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self.agent = build_agent(self.timeout);
        self.injected_agent = false;
        self
    }

    /// Uses a caller-built agent. Clones of this source share it.
    pub fn with_agent(mut self, agent: ureq::Agent) -> Self {
        self.agent = agent;
        self.injected_agent = true;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn proxy_all(&self) -> bool {
        self.proxy_all
    }

    /// The exact parameter set `load` would send for `query`.
    ///
    /// With `proxy_all`, every query field is forwarded and `proxyAll=true`
    /// replaces any caller-supplied marker. Without it, only `url` and
    /// `matchType` go out and the caller filters the returned lines itself.
    pub fn outbound_params(&self, query: &CdxQuery) -> ApiResult<Vec<(String, String)>> {
        if self.proxy_all {
            let mut params: Vec<(String, String)> = query
                .to_pairs()
                .into_iter()
                .filter(|(name, _)| name != PARAM_PROXY_ALL)
                .collect();
            params.push((PARAM_PROXY_ALL.to_string(), "true".to_string()));
            return Ok(params);
        }

        let url = query.url.as_ref().ok_or_else(|| {
            Error::new(ErrorKind::Usage).with_message("remote cdx query requires a url")
        })?;
        let mut params = vec![(PARAM_URL.to_string(), url.clone())];
        if let Some(match_type) = query.match_type {
            params.push((PARAM_MATCH_TYPE.to_string(), match_type.to_string()));
        }
        Ok(params)
    }

    pub fn load(&self, query: &CdxQuery) -> ApiResult<RemoteLines> {
        let params = self.outbound_params(query)?;
        tracing::debug!(
            endpoint = %self.endpoint,
            key = %query.key,
            proxy_all = self.proxy_all,
            params = params.len(),
            "proxying cdx query"
        );
        let form: Vec<(&str, &str)> = params
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect();

        let mut request = self.agent.post(self.endpoint.as_str());
        if let Some(cookie) = &self.cookie {
            request = request.set("Cookie", cookie);
        }

        match request.send_form(&form) {
            Ok(resp) => Ok(RemoteLines::new(resp.into_reader())),
            Err(ureq::Error::Status(DENIAL_STATUS, resp)) => {
                let body = resp.into_string().map_err(|err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to read denial response")
                        .with_status(DENIAL_STATUS)
                        .with_source(err)
                })?;
                let denial = AccessDenial::from_body(&body);
                tracing::warn!(endpoint = %self.endpoint, reason = denial.reason(), "cdx query denied");
                Err(Error::access(denial))
            }
            Err(ureq::Error::Status(code, _resp)) => Err(Error::new(error_kind_from_status(code))
                .with_message(format!("remote cdx server returned status {code}"))
                .with_status(code)),
            Err(ureq::Error::Transport(err)) => Err(Error::new(ErrorKind::Io)
                .with_message("request failed")
                .with_source(err)),
        }
    }
}

impl Clone for RemoteCdxSource {
    fn clone(&self) -> Self {
        let agent = if self.injected_agent {
            self.agent.clone()
        } else {
            build_agent(self.timeout)
        };
        Self {
            endpoint: self.endpoint.clone(),
            cookie: self.cookie.clone(),
            proxy_all: self.proxy_all,
            timeout: self.timeout,
            agent,
            injected_agent: self.injected_agent,
        }
    }
}

impl fmt::Debug for RemoteCdxSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteCdxSource")
            .field("endpoint", &self.endpoint.as_str())
            .field("cookie", &self.cookie.as_ref().map(|_| "<redacted>"))
            .field("proxy_all", &self.proxy_all)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for RemoteCdxSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Remote CDX Server: {}", self.endpoint)
    }
}

impl RemoteLines {
    fn new(reader: Box<dyn Read + Send + Sync>) -> Self {
        Self {
            reader: Some(BufReader::new(reader)),
            line: String::new(),
        }
    }

    /// Drops the response body, closing the connection.
    pub fn cancel(&mut self) {
        self.reader = None;
    }
}

impl Iterator for RemoteLines {
    type Item = ApiResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let reader = self.reader.as_mut()?;
        loop {
            self.line.clear();
            match reader.read_line(&mut self.line) {
                Ok(0) => {
                    self.reader = None;
                    return None;
                }
                Ok(_) => {}
                Err(err) => {
                    self.reader = None;
                    return Some(Err(Error::new(ErrorKind::Io)
                        .with_message("failed to read remote cdx stream")
                        .with_source(err)));
                }
            }
            let line = self.line.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                continue;
            }
            return Some(Ok(line.to_string()));
        }
    }
}

impl FusedIterator for RemoteLines {}

impl fmt::Debug for RemoteLines {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteLines")
            .field("open", &self.reader.is_some())
            .finish()
    }
}

fn build_agent(timeout: Option<Duration>) -> ureq::Agent {
    let builder = ureq::AgentBuilder::new();
    match timeout {
        Some(timeout) => builder.timeout(timeout).build(),
        None => builder.build(),
    }
}

fn parse_endpoint(raw: String) -> ApiResult<Url> {
    let url = Url::parse(&raw).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid remote cdx endpoint")
            .with_source(err)
    })?;
    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("remote cdx endpoint must use http or https scheme"));
    }
    Ok(url)
}

fn error_kind_from_status(status: u16) -> ErrorKind {
    match status {
        400 | 413 => ErrorKind::Usage,
        401 => ErrorKind::Permission,
        404 => ErrorKind::NotFound,
        500..=599 => ErrorKind::Internal,
        _ => ErrorKind::Io,
    }
}
