//! Reading, inflating and parsing data blocks.
//!
//! Base-resolution blocks carry no record count: records are parsed until the block is used up,
//! and running out of bytes anywhere except exactly at a record boundary is corruption.

use std::io;
use std::sync::Arc;

use crate::consts::{MAX_BLOCK_BYTES, WIG_SECTION_HEADER_SIZE, ZOOM_RECORD_SIZE};
use crate::errors::{BbiError, Result};
use crate::primitives::{Endianness, PrimitiveReader};
use crate::records::{BedRecord, Record, WigItem, WigItemType, ZoomRecord};
use crate::rtree::DataBlock;
use crate::source::{Decompressor, SeekableByteSource};

/// Which record layout a block holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockFormat {
    /// bigBed base data
    Feature,
    /// bigWig base data
    Signal,
    /// zoom level data, either file type
    Zoom,
}

fn corrupt(err: io::Error) -> BbiError {
    BbiError::CorruptBlock(err.to_string())
}

///
/// Turns block descriptors into records. Holds everything needed to decode a block but no
/// stream, so it can be cloned into every query.
///
#[derive(Clone)]
pub struct BlockDecoder {
    order: Endianness,
    uncompress_buf_size: u32,
    decompressor: Arc<dyn Decompressor>,
}

impl std::fmt::Debug for BlockDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockDecoder")
            .field("order", &self.order)
            .field("uncompress_buf_size", &self.uncompress_buf_size)
            .finish()
    }
}

impl BlockDecoder {
    pub fn new(
        order: Endianness,
        uncompress_buf_size: u32,
        decompressor: Arc<dyn Decompressor>,
    ) -> Self {
        BlockDecoder {
            order,
            uncompress_buf_size,
            decompressor,
        }
    }

    pub fn is_compressed(&self) -> bool {
        self.uncompress_buf_size > 0
    }

    /// Read exactly `block.size` bytes and inflate them if the file is compressed.
    pub fn read_raw<S: SeekableByteSource + ?Sized>(
        &self,
        source: &mut S,
        block: &DataBlock,
    ) -> Result<Vec<u8>> {
        if block.size > MAX_BLOCK_BYTES {
            return Err(BbiError::CorruptBlock(format!(
                "block at offset {} claims {} bytes",
                block.offset, block.size
            )));
        }
        let bytes = source
            .read_at(block.offset, block.size as usize)
            .map_err(|e| BbiError::block_eof(e, "data block"))?;

        if self.is_compressed() {
            self.decompressor
                .inflate(&bytes, self.uncompress_buf_size as usize)
        } else {
            Ok(bytes)
        }
    }

    pub fn decode<S: SeekableByteSource + ?Sized>(
        &self,
        source: &mut S,
        block: &DataBlock,
        format: BlockFormat,
    ) -> Result<Vec<Record>> {
        let bytes = self.read_raw(source, block)?;
        self.decode_bytes(&bytes, format)
    }

    pub fn decode_bytes(&self, bytes: &[u8], format: BlockFormat) -> Result<Vec<Record>> {
        Ok(match format {
            BlockFormat::Feature => decode_feature_block(bytes, self.order)?
                .into_iter()
                .map(Record::Bed)
                .collect(),
            BlockFormat::Signal => decode_signal_block(bytes, self.order)?
                .into_iter()
                .map(Record::Wig)
                .collect(),
            BlockFormat::Zoom => decode_zoom_block(bytes, self.order)?
                .into_iter()
                .map(Record::Zoom)
                .collect(),
        })
    }
}

/// Parse `(chrom, start, end, rest\0)` tuples until the block is exhausted.
///
/// The remaining-byte count shrinks by the encoded length of `rest` (bytes, not characters).
pub fn decode_feature_block(bytes: &[u8], order: Endianness) -> Result<Vec<BedRecord>> {
    let mut rdr = PrimitiveReader::new(bytes, order);
    let mut records = Vec::new();

    while !rdr.is_empty() {
        let chrom_id = rdr.read_u32().map_err(corrupt)?;
        let start = rdr.read_u32().map_err(corrupt)?;
        let end = rdr.read_u32().map_err(corrupt)?;
        let rest = rdr.read_cstring().map_err(corrupt)?;
        let rest = std::str::from_utf8(rest).map_err(|_| {
            BbiError::CorruptBlock(format!(
                "feature at {}:{}-{} has non UTF-8 fields",
                chrom_id, start, end
            ))
        })?;
        records.push(BedRecord {
            chrom_id,
            start,
            end,
            rest: rest.to_string(),
        });
    }
    Ok(records)
}

/// Parse consecutive wig sections until the block is exhausted.
pub fn decode_signal_block(bytes: &[u8], order: Endianness) -> Result<Vec<WigItem>> {
    let mut rdr = PrimitiveReader::new(bytes, order);
    let mut items = Vec::new();

    while !rdr.is_empty() {
        if rdr.remaining() < WIG_SECTION_HEADER_SIZE {
            return Err(BbiError::CorruptBlock(format!(
                "{} trailing bytes cannot hold a wig section header",
                rdr.remaining()
            )));
        }
        let chrom_id = rdr.read_u32().map_err(corrupt)?;
        let start = rdr.read_u32().map_err(corrupt)?;
        let _end = rdr.read_u32().map_err(corrupt)?;
        let step = rdr.read_u32().map_err(corrupt)?;
        let span = rdr.read_u32().map_err(corrupt)?;
        let code = rdr.read_u8().map_err(corrupt)?;
        let _reserved = rdr.read_u8().map_err(corrupt)?;
        let count = rdr.read_u16().map_err(corrupt)? as usize;

        let kind = WigItemType::from_code(code).ok_or_else(|| {
            BbiError::CorruptBlock(format!("unknown wig section type {}", code))
        })?;
        if rdr.remaining() < count * kind.item_size() {
            return Err(BbiError::CorruptBlock(format!(
                "wig section declares {} items but only {} bytes remain",
                count,
                rdr.remaining()
            )));
        }

        items.reserve(count);
        for i in 0..count {
            let (item_start, item_end) = match kind {
                WigItemType::BedGraph => {
                    let s = rdr.read_u32().map_err(corrupt)?;
                    let e = rdr.read_u32().map_err(corrupt)?;
                    (s, e)
                }
                WigItemType::VariableStep => {
                    let s = rdr.read_u32().map_err(corrupt)?;
                    (s, offset(s, span)?)
                }
                WigItemType::FixedStep => {
                    let s = (i as u32)
                        .checked_mul(step)
                        .and_then(|d| start.checked_add(d))
                        .ok_or_else(|| overflow(start))?;
                    (s, offset(s, span)?)
                }
            };
            let value = rdr.read_f32().map_err(corrupt)?;
            items.push(WigItem {
                chrom_id,
                start: item_start,
                end: item_end,
                value,
            });
        }
    }
    Ok(items)
}

fn offset(start: u32, span: u32) -> Result<u32> {
    start.checked_add(span).ok_or_else(|| overflow(start))
}

fn overflow(start: u32) -> BbiError {
    BbiError::CorruptBlock(format!("wig item position overflows from base {}", start))
}

/// Parse fixed 32 byte zoom records; the block must be an exact multiple of that size.
pub fn decode_zoom_block(bytes: &[u8], order: Endianness) -> Result<Vec<ZoomRecord>> {
    if bytes.len() % ZOOM_RECORD_SIZE != 0 {
        return Err(BbiError::CorruptBlock(format!(
            "zoom block of {} bytes is not a multiple of {}",
            bytes.len(),
            ZOOM_RECORD_SIZE
        )));
    }

    let mut rdr = PrimitiveReader::new(bytes, order);
    let count = bytes.len() / ZOOM_RECORD_SIZE;
    let mut records = Vec::with_capacity(count);
    for _ in 0..count {
        records.push(ZoomRecord {
            chrom_id: rdr.read_u32().map_err(corrupt)?,
            start: rdr.read_u32().map_err(corrupt)?,
            end: rdr.read_u32().map_err(corrupt)?,
            valid_count: rdr.read_u32().map_err(corrupt)?,
            min_val: rdr.read_f32().map_err(corrupt)?,
            max_val: rdr.read_f32().map_err(corrupt)?,
            sum: rdr.read_f32().map_err(corrupt)?,
            sum_squares: rdr.read_f32().map_err(corrupt)?,
        });
    }
    Ok(records)
}
