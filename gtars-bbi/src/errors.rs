use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BbiError {
    /// The file does not start with a bigWig or bigBed magic number in either byte order.
    #[error("Unrecognized file format: {0}")]
    Format(String),

    #[error("Unsupported BBI version: {0}")]
    UnsupportedVersion(u16),

    /// A B+ tree or R+ tree node could not be read.
    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    /// A data block did not parse cleanly to its end.
    #[error("Corrupt data block: {0}")]
    CorruptBlock(String),

    #[error("Decompression failed: {0}")]
    Decompression(String),

    #[error("Chromosome not found in file: {0}")]
    UnknownChromosome(String),

    #[error("Invalid region: start ({start}) is greater than end ({end})")]
    InvalidRegion { start: u32, end: u32 },

    #[error("Zoom level {requested} requested but file only has {available}")]
    NoSuchZoomLevel { requested: usize, available: usize },

    /// `next_record` was called on an iterator with nothing left to yield.
    #[error("No such element: query iterator is exhausted")]
    NoSuchElement,

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl BbiError {
    /// Map a premature end of stream onto `CorruptIndex`, leaving other I/O errors as they are.
    pub(crate) fn index_eof(err: io::Error, context: &str) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => {
                BbiError::CorruptIndex(format!("unexpected end of file while reading {context}"))
            }
            _ => BbiError::Io(err),
        }
    }

    /// Map a premature end of stream onto `CorruptBlock`, leaving other I/O errors as they are.
    pub(crate) fn block_eof(err: io::Error, context: &str) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => {
                BbiError::CorruptBlock(format!("unexpected end of file while reading {context}"))
            }
            _ => BbiError::Io(err),
        }
    }

    /// True for errors caused by damaged file contents rather than I/O or caller misuse.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            BbiError::Format(_)
                | BbiError::CorruptIndex(_)
                | BbiError::CorruptBlock(_)
                | BbiError::Decompression(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BbiError>;
