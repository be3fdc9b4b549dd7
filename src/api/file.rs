//! Purpose: CDX source over a local, lexicographically sorted plain-text file.
//! Exports: `CdxFile`, `FileLines`.
//! Role: Forwards `key`/`end_key` to the range search; owns no per-query state.
//! Invariants: The path is not touched until `load`; open failures propagate as-is.
//! Invariants: Each `load` opens its own handle, released when the lines are dropped.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::binsearch::{RangeIter, iter_range};
use crate::core::error::Error;
use crate::core::query::CdxQuery;
use crate::core::text_file::SeekableTextFile;

pub type FileLines = RangeIter<SeekableTextFile>;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CdxFile {
    path: PathBuf,
}

impl CdxFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self, query: &CdxQuery) -> Result<FileLines, Error> {
        tracing::debug!(
            path = %self.path.display(),
            key = %query.key,
            end_key = ?query.end_key,
            "loading cdx file range"
        );
        let source = SeekableTextFile::open(&self.path)?;
        iter_range(source, &query.key, query.end_key.as_deref())
            .map_err(|err| err.with_path(self.path.clone()))
    }
}

impl fmt::Display for CdxFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CDX File - {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::CdxFile;
    use crate::core::error::ErrorKind;
    use crate::core::query::CdxQuery;

    #[test]
    fn construction_does_not_touch_path() {
        let source = CdxFile::new("/nonexistent/dir/index.cdx");
        assert_eq!(source.to_string(), "CDX File - /nonexistent/dir/index.cdx");

        let err = source.load(&CdxQuery::new("a")).expect_err("err");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
