use log::debug;

use crate::consts::{
    BIGBED_MAGIC, BIGWIG_MAGIC, HEADER_SIZE, MAX_SUPPORTED_VERSION, MIN_SUPPORTED_VERSION,
};
use crate::errors::{BbiError, Result};
use crate::primitives::{Endianness, PrimitiveReader};
use crate::source::SeekableByteSource;

/// Upper bound on the auto-schema text we are willing to scan for a terminator.
const MAX_AUTOSQL_LEN: usize = 1 << 20;

/// The two members of the BBI family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BbiKind {
    /// Signal file: data blocks hold wig sections.
    BigWig,
    /// Feature file: data blocks hold bed-like records.
    BigBed,
}

impl BbiKind {
    pub fn magic(self) -> u32 {
        match self {
            BbiKind::BigWig => BIGWIG_MAGIC,
            BbiKind::BigBed => BIGBED_MAGIC,
        }
    }

    fn from_magic(magic: u32) -> Option<Self> {
        match magic {
            BIGWIG_MAGIC => Some(BbiKind::BigWig),
            BIGBED_MAGIC => Some(BbiKind::BigBed),
            _ => None,
        }
    }
}

impl std::fmt::Display for BbiKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BbiKind::BigWig => write!(f, "bigWig"),
            BbiKind::BigBed => write!(f, "bigBed"),
        }
    }
}

///
/// The fixed 64 byte header at the start of every bigWig/bigBed file.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub kind: BbiKind,
    pub endianness: Endianness,
    pub version: u16,
    pub zoom_levels: u16,
    pub chrom_tree_offset: u64,
    pub full_data_offset: u64,
    pub full_index_offset: u64,
    /// Number of columns in a bigBed record (0 for bigWig).
    pub field_count: u16,
    /// Number of those columns that are standard BED columns.
    pub defined_field_count: u16,
    pub auto_sql_offset: u64,
    pub total_summary_offset: u64,
    /// Maximum inflated size of a data block; 0 means blocks are stored uncompressed.
    pub uncompress_buf_size: u32,
    pub extension_offset: u64,
}

impl FileHeader {
    /// Read and validate the header at the start of `source`.
    pub fn read<S: SeekableByteSource + ?Sized>(source: &mut S) -> Result<Self> {
        let buf = source.read_at(0, HEADER_SIZE).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => BbiError::Format(format!(
                "file is shorter than the {} byte header",
                HEADER_SIZE
            )),
            _ => BbiError::Io(e),
        })?;
        Self::from_bytes(&buf)
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Err(BbiError::Format(format!(
                "header needs {} bytes, got {}",
                HEADER_SIZE,
                buf.len()
            )));
        }

        let (kind, endianness) = detect_magic(buf)?;
        let mut rdr = PrimitiveReader::new(&buf[4..HEADER_SIZE], endianness);
        let truncated = |_| BbiError::Format("truncated header".to_string());

        let version = rdr.read_u16().map_err(truncated)?;
        if !(MIN_SUPPORTED_VERSION..=MAX_SUPPORTED_VERSION).contains(&version) {
            return Err(BbiError::UnsupportedVersion(version));
        }

        let header = FileHeader {
            kind,
            endianness,
            version,
            zoom_levels: rdr.read_u16().map_err(truncated)?,
            chrom_tree_offset: rdr.read_u64().map_err(truncated)?,
            full_data_offset: rdr.read_u64().map_err(truncated)?,
            full_index_offset: rdr.read_u64().map_err(truncated)?,
            field_count: rdr.read_u16().map_err(truncated)?,
            defined_field_count: rdr.read_u16().map_err(truncated)?,
            auto_sql_offset: rdr.read_u64().map_err(truncated)?,
            total_summary_offset: rdr.read_u64().map_err(truncated)?,
            uncompress_buf_size: rdr.read_u32().map_err(truncated)?,
            extension_offset: rdr.read_u64().map_err(truncated)?,
        };

        debug!(
            "Parsed {} header: version {}, {} zoom levels, {:?} byte order",
            header.kind, header.version, header.zoom_levels, header.endianness
        );
        Ok(header)
    }

    pub fn is_bigwig(&self) -> bool {
        self.kind == BbiKind::BigWig
    }

    pub fn is_compressed(&self) -> bool {
        self.uncompress_buf_size > 0
    }

    /// Read the NUL-terminated autoSql schema, if the file declares one.
    pub fn read_autosql<S: SeekableByteSource + ?Sized>(
        &self,
        source: &mut S,
    ) -> Result<Option<String>> {
        if self.auto_sql_offset == 0 {
            return Ok(None);
        }

        source.seek_to(self.auto_sql_offset)?;
        let mut text = Vec::new();
        let mut chunk = [0u8; 1];
        loop {
            source
                .read_fully(&mut chunk)
                .map_err(|e| BbiError::index_eof(e, "autoSql text"))?;
            if chunk[0] == 0 {
                break;
            }
            text.push(chunk[0]);
            if text.len() > MAX_AUTOSQL_LEN {
                return Err(BbiError::Format(format!(
                    "autoSql text is not terminated within {} bytes",
                    MAX_AUTOSQL_LEN
                )));
            }
        }

        String::from_utf8(text)
            .map(Some)
            .map_err(|_| BbiError::Format("autoSql text is not valid UTF-8".to_string()))
    }
}

/// Try the magic as little-endian first, then big-endian.
fn detect_magic(buf: &[u8]) -> Result<(BbiKind, Endianness)> {
    for order in [Endianness::Little, Endianness::Big] {
        let magic = PrimitiveReader::new(&buf[..4], order)
            .read_u32()
            .map_err(|_| BbiError::Format("truncated magic".to_string()))?;
        if let Some(kind) = BbiKind::from_magic(magic) {
            return Ok((kind, order));
        }
    }

    let raw = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    Err(BbiError::Format(format!(
        "magic number {:#010x} is neither bigWig nor bigBed",
        raw
    )))
}
