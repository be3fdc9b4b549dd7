// Error taxonomy shared by every CDX source: denials, transport/IO failures, unsupported queries.
use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Internal,
    Usage,
    NotFound,
    Permission,
    Access,
    Unsupported,
    Corrupt,
    Io,
}

/// Reason a backend affirmatively refused to serve a query.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AccessDenial {
    BlockedByRobots,
    Excluded,
}

impl AccessDenial {
    pub const ROBOTS_MARKER: &'static str = "Blocked By Robots";

    pub fn reason(self) -> &'static str {
        match self {
            AccessDenial::BlockedByRobots => Self::ROBOTS_MARKER,
            AccessDenial::Excluded => "Excluded",
        }
    }

    /// Classifies a denial response body.
    pub fn from_body(body: &str) -> Self {
        if body.contains(Self::ROBOTS_MARKER) {
            AccessDenial::BlockedByRobots
        } else {
            AccessDenial::Excluded
        }
    }
}

impl fmt::Display for AccessDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    path: Option<PathBuf>,
    status: Option<u16>,
    denial: Option<AccessDenial>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            path: None,
            status: None,
            denial: None,
            source: None,
        }
    }

    pub fn access(denial: AccessDenial) -> Self {
        let mut err = Self::new(ErrorKind::Access).with_message(denial.reason());
        err.denial = Some(denial);
        err
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn denial(&self) -> Option<AccessDenial> {
        self.denial
    }

    /// Human-readable denial reason, set only for `ErrorKind::Access`.
    pub fn reason(&self) -> Option<&'static str> {
        self.denial.map(AccessDenial::reason)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path.display())?;
        }
        if let Some(status) = self.status {
            write!(f, " (status: {status})")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

pub fn io_error_kind(err: &io::Error) -> ErrorKind {
    match err.kind() {
        io::ErrorKind::NotFound => ErrorKind::NotFound,
        io::ErrorKind::PermissionDenied => ErrorKind::Permission,
        _ => ErrorKind::Io,
    }
}

pub fn to_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::Usage => 2,
        ErrorKind::NotFound => 3,
        ErrorKind::Permission => 4,
        ErrorKind::Access => 5,
        ErrorKind::Unsupported => 6,
        ErrorKind::Corrupt => 7,
        ErrorKind::Io => 8,
    }
}
