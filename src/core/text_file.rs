// Read-only seekable text file with line reads, the input side of range search.
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::core::error::{Error, ErrorKind, io_error_kind};

#[derive(Debug)]
pub struct SeekableTextFile {
    path: PathBuf,
    len: u64,
    reader: BufReader<File>,
}

impl SeekableTextFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| {
            Error::new(io_error_kind(&err))
                .with_message("failed to open cdx file")
                .with_path(path)
                .with_source(err)
        })?;
        let len = file
            .metadata()
            .map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to stat cdx file")
                    .with_path(path)
                    .with_source(err)
            })?
            .len();
        Ok(Self {
            path: path.to_path_buf(),
            len,
            reader: BufReader::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Read for SeekableTextFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl BufRead for SeekableTextFile {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.reader.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.reader.consume(amt)
    }
}

impl Seek for SeekableTextFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.reader.seek(pos)
    }
}

/// Minimal surface the range search needs from a sorted text source.
pub trait TextSource: BufRead + Seek {
    fn len(&mut self) -> io::Result<u64>;

    fn is_empty(&mut self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }

    fn seek_to(&mut self, offset: u64) -> io::Result<()> {
        self.seek(SeekFrom::Start(offset)).map(|_| ())
    }

    /// Appends the next line (terminator included) to `buf`; 0 at EOF.
    fn read_line_bytes(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        self.read_until(b'\n', buf)
    }
}

impl TextSource for SeekableTextFile {
    fn len(&mut self) -> io::Result<u64> {
        Ok(self.len)
    }
}

impl<T: AsRef<[u8]>> TextSource for io::Cursor<T> {
    fn len(&mut self) -> io::Result<u64> {
        Ok(self.get_ref().as_ref().len() as u64)
    }
}
