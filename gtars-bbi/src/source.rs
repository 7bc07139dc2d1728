//! The two collaborators the engine consumes: a seekable byte source and a decompressor.

use std::io::{self, Read, Seek, SeekFrom};

use flate2::read::ZlibDecoder;

use crate::errors::{BbiError, Result};

/// Anything the engine can seek in and read from.
///
/// Seek and read are stateful, so one source must not be shared by concurrently running queries.
/// Every `Read + Seek` type (files, buffered files, in-memory cursors) is a source already.
pub trait SeekableByteSource {
    fn seek_to(&mut self, offset: u64) -> io::Result<()>;

    fn read_fully(&mut self, buf: &mut [u8]) -> io::Result<()>;

    /// Read exactly `len` bytes starting at `offset`.
    fn read_at(&mut self, offset: u64, len: usize) -> io::Result<Vec<u8>> {
        self.seek_to(offset)?;
        let mut buf = vec![0u8; len];
        self.read_fully(&mut buf)?;
        Ok(buf)
    }
}

impl<T: Read + Seek> SeekableByteSource for T {
    fn seek_to(&mut self, offset: u64) -> io::Result<()> {
        self.seek(SeekFrom::Start(offset)).map(|_| ())
    }

    fn read_fully(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.read_exact(buf)
    }
}

/// Inflates one compressed data block.
pub trait Decompressor: Send + Sync {
    /// Inflate `bytes`, failing if the output would exceed `max_output` bytes.
    fn inflate(&self, bytes: &[u8], max_output: usize) -> Result<Vec<u8>>;
}

/// zlib-wrapped DEFLATE, which is what bigWig/bigBed writers emit.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZlibDecompressor;

impl Decompressor for ZlibDecompressor {
    fn inflate(&self, bytes: &[u8], max_output: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(max_output);
        // one byte of headroom so an oversized block is detected instead of silently truncated
        let mut decoder = ZlibDecoder::new(bytes).take(max_output as u64 + 1);
        decoder
            .read_to_end(&mut out)
            .map_err(|e| BbiError::Decompression(e.to_string()))?;

        if out.len() > max_output {
            return Err(BbiError::Decompression(format!(
                "block inflates past the declared maximum of {} bytes",
                max_output
            )));
        }
        Ok(out)
    }
}
