//! Decompression picked from the file name.

use std::io::Read;

use bzip2::read::MultiBzDecoder;
use flate2::read::MultiGzDecoder;

/// Compression inferred from a path's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
}

impl Compression {
    /// `.gz` → gzip, `.bz2` → bzip2, anything else → none.
    pub fn from_path(path: &str) -> Self {
        if path.ends_with(".gz") {
            Self::Gzip
        } else if path.ends_with(".bz2") {
            Self::Bzip2
        } else {
            Self::None
        }
    }

    /// Wrap `reader` in the matching decoder.
    ///
    /// Multi-member decoders are used since concatenated `.gz`/`.bz2`
    /// parts are common in job output.
    pub fn decoder<R>(self, reader: R) -> Box<dyn Read + Send>
    where
        R: Read + Send + 'static,
    {
        match self {
            Self::None => Box::new(reader),
            Self::Gzip => Box::new(MultiGzDecoder::new(reader)),
            Self::Bzip2 => Box::new(MultiBzDecoder::new(reader)),
        }
    }
}
