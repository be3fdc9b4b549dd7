//! Purpose: `cdx-source` CLI entry point: open one CDX source, run one query, print lines.
//! Role: Binary crate root; parses args, prints record lines on stdout.
//! Invariants: Errors are emitted as JSON on stderr; exit code comes from `api::to_exit_code`.
//! Invariants: Output is streamed line by line; a closed stdout ends the run quietly.
#![allow(clippy::result_large_err)]
use std::error::Error as StdError;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use clap::{Parser, ValueHint};
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

use cdx_source::api::{CdxQuery, Error, ErrorKind, MatchType, Source, SourceConfig, to_exit_code};

#[derive(Debug, Parser)]
#[command(
    name = "cdx-source",
    version,
    about = "Query a CDX index source and print matching capture lines",
    long_about = r#"Query a CDX index source and print matching capture lines.

SOURCE may be a sorted plain-text .cdx file, an http(s):// CDX server
endpoint, or a redis:// url (requires the `redis` build feature)."#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        help = "CDX file path, http(s):// endpoint, or redis:// url",
        value_hint = ValueHint::AnyPath
    )]
    source: String,
    #[arg(long, default_value = "", help = "Start key (inclusive), or exact lookup key")]
    key: String,
    #[arg(long, help = "End key (exclusive); omit to read to the end")]
    end_key: Option<String>,
    #[arg(long, help = "Original url, forwarded to remote servers")]
    url: Option<String>,
    #[arg(long, help = "exact|prefix|host|domain|range")]
    match_type: Option<MatchType>,
    #[arg(
        long = "param",
        value_name = "NAME=VALUE",
        value_parser = parse_param,
        help = "Extra query parameter (repeatable), forwarded verbatim"
    )]
    params: Vec<(String, String)>,
    #[arg(long, help = "Raw Cookie header for remote servers")]
    cookie: Option<String>,
    #[arg(long, help = "Forward only url/matchType to remote servers")]
    no_proxy_all: bool,
    #[arg(long, help = "Key namespace prefix for redis sources (default: c:)")]
    redis_key_prefix: Option<String>,
    #[arg(long, help = "Transport timeout in milliseconds")]
    timeout_ms: Option<u64>,
    #[arg(long, help = "JSON source config file", value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(()) => 0,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<(), Error> {
    let config = resolve_config(&cli)?;
    let source = Source::open(&cli.source, &config)?;
    let query = build_query(&cli)?;
    tracing::debug!(source = %source, "running cdx query");

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for line in source.load(&query)? {
        let line = line?;
        if let Err(err) = writeln!(out, "{line}") {
            return stdout_result(err);
        }
    }
    out.flush().or_else(stdout_result)
}

fn resolve_config(cli: &Cli) -> Result<SourceConfig, Error> {
    let mut config = match &cli.config {
        Some(path) => SourceConfig::from_path(path)?,
        None => SourceConfig::default(),
    };
    if let Some(prefix) = &cli.redis_key_prefix {
        config.redis_key_prefix = Some(prefix.clone());
    }
    if let Some(cookie) = &cli.cookie {
        config.cookie = Some(cookie.clone());
    }
    if cli.no_proxy_all {
        config.proxy_all = Some(false);
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.timeout_ms = Some(timeout_ms);
    }
    Ok(config)
}

fn build_query(cli: &Cli) -> Result<CdxQuery, Error> {
    let mut query = CdxQuery::from_pairs(cli.params.iter().cloned())?;
    if !cli.key.is_empty() || query.key.is_empty() {
        query.key = cli.key.clone();
    }
    if let Some(end_key) = &cli.end_key {
        query.end_key = Some(end_key.clone());
    }
    if let Some(url) = &cli.url {
        query.url = Some(url.clone());
    }
    if let Some(match_type) = cli.match_type {
        query.match_type = Some(match_type);
    }
    Ok(query)
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got '{raw}'")),
    }
}

fn stdout_result(err: io::Error) -> Result<(), Error> {
    if err.kind() == io::ErrorKind::BrokenPipe {
        return Ok(());
    }
    Err(Error::new(ErrorKind::Io)
        .with_message("failed to write output")
        .with_source(err))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn emit_error(err: &Error) {
    let json = serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::NotFound => "not found".to_string(),
        ErrorKind::Permission => "permission denied".to_string(),
        ErrorKind::Access => "access denied".to_string(),
        ErrorKind::Unsupported => "unsupported query".to_string(),
        ErrorKind::Corrupt => "corrupt data".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(reason) = err.reason() {
        inner.insert("reason".to_string(), json!(reason));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    if let Some(status) = err.status() {
        inner.insert("status".to_string(), json!(status));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

#[cfg(test)]
mod tests {
    use super::{Cli, build_query, parse_param};
    use cdx_source::api::MatchType;
    use clap::Parser;

    #[test]
    fn param_requires_name_and_equals() {
        assert_eq!(
            parse_param("filter=status:200").expect("param"),
            ("filter".to_string(), "status:200".to_string())
        );
        assert_eq!(
            parse_param("empty=").expect("param"),
            ("empty".to_string(), String::new())
        );
        assert!(parse_param("noequals").is_err());
        assert!(parse_param("=value").is_err());
    }

    #[test]
    fn flags_override_params() {
        let cli = Cli::try_parse_from([
            "cdx-source",
            "index.cdx",
            "--key",
            "com,example)/",
            "--match-type",
            "prefix",
            "--param",
            "key=ignored",
            "--param",
            "filter=status:200",
        ])
        .expect("cli");
        let query = build_query(&cli).expect("query");
        assert_eq!(query.key, "com,example)/");
        assert_eq!(query.match_type, Some(MatchType::Prefix));
        assert_eq!(
            query.params,
            vec![("filter".to_string(), "status:200".to_string())]
        );
    }
}
