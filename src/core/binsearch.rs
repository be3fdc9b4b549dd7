// Block-level binary search over a sorted text source, then a lazy line scan bounded by [start, end).
use std::io;
use std::iter::FusedIterator;

use crate::core::error::{Error, ErrorKind};
use crate::core::text_file::TextSource;

pub const DEFAULT_BLOCK_SIZE: u64 = 8192;

/// Lines of a sorted source with `start <= line < end`, compared as bytes.
///
/// The reader is owned; dropping the iterator (or reaching the end, or an
/// error) releases it.
#[derive(Debug)]
pub struct RangeIter<R> {
    reader: Option<R>,
    start: Vec<u8>,
    end: Option<Vec<u8>>,
    started: bool,
    buf: Vec<u8>,
}

pub fn iter_range<R: TextSource>(
    reader: R,
    start: &str,
    end: Option<&str>,
) -> Result<RangeIter<R>, Error> {
    RangeIter::with_block_size(reader, start, end, DEFAULT_BLOCK_SIZE)
}

impl<R: TextSource> RangeIter<R> {
    pub fn with_block_size(
        mut reader: R,
        start: &str,
        end: Option<&str>,
        block_size: u64,
    ) -> Result<Self, Error> {
        if block_size == 0 {
            return Err(Error::new(ErrorKind::Usage).with_message("block size must be non-zero"));
        }
        position_at_block(&mut reader, start.as_bytes(), block_size).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to search cdx source")
                .with_source(err)
        })?;
        Ok(Self {
            reader: Some(reader),
            start: start.as_bytes().to_vec(),
            end: end.map(|end| end.as_bytes().to_vec()),
            started: false,
            buf: Vec::new(),
        })
    }
}

impl<R: TextSource> Iterator for RangeIter<R> {
    type Item = Result<String, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let reader = self.reader.as_mut()?;
        loop {
            self.buf.clear();
            match reader.read_line_bytes(&mut self.buf) {
                Ok(0) => {
                    self.reader = None;
                    return None;
                }
                Ok(_) => {}
                Err(err) => {
                    self.reader = None;
                    return Some(Err(Error::new(ErrorKind::Io)
                        .with_message("failed to read cdx line")
                        .with_source(err)));
                }
            }

            let line = trim_line_end(&self.buf);
            if line.is_empty() {
                continue;
            }
            if !self.started {
                if line < self.start.as_slice() {
                    continue;
                }
                self.started = true;
            }
            if let Some(end) = &self.end {
                if line >= end.as_slice() {
                    self.reader = None;
                    return None;
                }
            }

            return match std::str::from_utf8(line) {
                Ok(text) => Some(Ok(text.to_string())),
                Err(err) => {
                    self.reader = None;
                    Some(Err(Error::new(ErrorKind::Corrupt)
                        .with_message("cdx line is not valid utf-8")
                        .with_source(err)))
                }
            };
        }
    }
}

impl<R: TextSource> FusedIterator for RangeIter<R> {}

/// Seeks to the start of the block holding the first line `>= key`, past any
/// partial line at the block boundary.
fn position_at_block<R: TextSource>(reader: &mut R, key: &[u8], block_size: u64) -> io::Result<()> {
    let mut min = 0u64;
    let mut max = reader.len()? / block_size;
    let mut line = Vec::new();

    while max - min > 1 {
        let mid = min + (max - min) / 2;
        reader.seek_to(mid * block_size)?;
        line.clear();
        reader.read_line_bytes(&mut line)?;
        line.clear();
        let read = reader.read_line_bytes(&mut line)?;
        // EOF here means the block starts inside the last line.
        if read > 0 && key > trim_line_end(&line) {
            min = mid;
        } else {
            max = mid;
        }
    }

    reader.seek_to(min * block_size)?;
    if min > 0 {
        line.clear();
        reader.read_line_bytes(&mut line)?;
    }
    Ok(())
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
