//! Single-pass streams for listings and file reads.
//!
//! Every stream here is consumed once:
//! - The fallible `next_*` methods return `Ok(None)` exactly once at the
//!   end and [`FsError::StreamClosed`] on every call after that
//! - The `Iterator` impls are fused and just keep returning `None`
//! - Dropping a stream early releases whatever it owns

use std::fmt;
use std::io::{self, BufRead, BufReader, Cursor, Read};

use crate::error::{FsError, FsResult};
use crate::vfs::DirEntry;

/// Default chunk size for [`ByteStream`] (64KB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Lazily produced directory listing, in the order the backend emitted it.
pub struct Listing {
    entries: Box<dyn Iterator<Item = FsResult<DirEntry>> + Send>,
    finished: bool,
}

impl Listing {
    /// Wrap a lazy entry iterator.
    pub fn new(entries: impl Iterator<Item = FsResult<DirEntry>> + Send + 'static) -> Self {
        Self {
            entries: Box::new(entries),
            finished: false,
        }
    }

    /// A listing over entries that are already in hand.
    pub fn from_entries(entries: Vec<DirEntry>) -> Self {
        Self::new(entries.into_iter().map(Ok))
    }

    /// An empty listing.
    pub fn empty() -> Self {
        Self::from_entries(Vec::new())
    }

    /// Next entry; `Ok(None)` at the end, `StreamClosed` after that.
    pub fn next_entry(&mut self) -> FsResult<Option<DirEntry>> {
        if self.finished {
            return Err(FsError::StreamClosed);
        }
        match self.entries.next() {
            Some(entry) => entry.map(Some),
            None => {
                self.finished = true;
                Ok(None)
            }
        }
    }

    /// Drain the listing into URIs, stopping at the first error.
    pub fn uris(self) -> FsResult<Vec<String>> {
        self.map(|entry| entry.map(|e| e.uri)).collect()
    }
}

impl Iterator for Listing {
    type Item = FsResult<DirEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) | Err(FsError::StreamClosed) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

impl fmt::Debug for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listing")
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

/// Raw bytes of one object, handed out in chunks.
///
/// Also implements [`Read`], so decoders can sit directly on top of it.
pub struct ByteStream {
    reader: Box<dyn Read + Send>,
    chunk_size: usize,
    finished: bool,
}

impl ByteStream {
    /// Stream from any reader.
    pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
        Self {
            reader: Box::new(reader),
            chunk_size: DEFAULT_CHUNK_SIZE,
            finished: false,
        }
    }

    /// Stream over captured bytes.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self::from_reader(Cursor::new(data))
    }

    /// Change the size of the chunks returned by [`next_chunk`](Self::next_chunk).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Next chunk; `Ok(None)` at the end, `StreamClosed` after that.
    pub fn next_chunk(&mut self) -> FsResult<Option<Vec<u8>>> {
        if self.finished {
            return Err(FsError::StreamClosed);
        }
        let mut buf = vec![0u8; self.chunk_size];
        let n = loop {
            match self.reader.read(&mut buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };
        if n == 0 {
            self.finished = true;
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(buf))
    }

    /// Read everything that's left.
    pub fn read_to_vec(mut self) -> FsResult<Vec<u8>> {
        if self.finished {
            return Err(FsError::StreamClosed);
        }
        let mut out = Vec::new();
        self.reader.read_to_end(&mut out)?;
        self.finished = true;
        Ok(out)
    }
}

impl Read for ByteStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.finished {
            return Ok(0);
        }
        let n = self.reader.read(buf)?;
        if n == 0 && !buf.is_empty() {
            self.finished = true;
        }
        Ok(n)
    }
}

impl Iterator for ByteStream {
    type Item = FsResult<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_chunk() {
            Ok(Some(chunk)) => Some(Ok(chunk)),
            Ok(None) | Err(FsError::StreamClosed) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

impl fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteStream")
            .field("chunk_size", &self.chunk_size)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

/// Lines of a (possibly decoded) byte stream, terminators included.
pub struct LineStream {
    reader: BufReader<Box<dyn Read + Send>>,
    finished: bool,
}

impl LineStream {
    pub fn new(reader: impl Read + Send + 'static) -> Self {
        Self {
            reader: BufReader::new(Box::new(reader)),
            finished: false,
        }
    }

    /// Next line (with its `\n`, if it had one); `StreamClosed` after the end.
    pub fn next_line(&mut self) -> FsResult<Option<Vec<u8>>> {
        if self.finished {
            return Err(FsError::StreamClosed);
        }
        let mut line = Vec::new();
        if self.reader.read_until(b'\n', &mut line)? == 0 {
            self.finished = true;
            return Ok(None);
        }
        Ok(Some(line))
    }
}

impl Iterator for LineStream {
    type Item = FsResult<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_line() {
            Ok(Some(line)) => Some(Ok(line)),
            Ok(None) | Err(FsError::StreamClosed) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

impl fmt::Debug for LineStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineStream")
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}
