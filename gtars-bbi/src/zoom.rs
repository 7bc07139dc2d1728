//! Zoom levels: pre-aggregated, lower resolution copies of the data, each with its own R+ tree.

use log::debug;

use crate::consts::{HEADER_SIZE, ZOOM_HEADER_SIZE};
use crate::errors::{BbiError, Result};
use crate::header::FileHeader;
use crate::primitives::PrimitiveReader;
use crate::rtree::SpatialIndex;
use crate::source::SeekableByteSource;

/// The 24 byte header describing one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomHeader {
    /// Bases summarised by each zoom record.
    pub reduction_factor: u32,
    pub data_offset: u64,
    pub index_offset: u64,
}

#[derive(Debug, Clone)]
pub struct ZoomLevel {
    pub header: ZoomHeader,
    /// Count prefix stored at the start of this level's data section.
    pub record_count: u32,
    pub index: SpatialIndex,
}

impl ZoomLevel {
    pub fn reduction_factor(&self) -> u32 {
        self.header.reduction_factor
    }
}

///
/// Every zoom level in the file, in the order they are declared (finest first for files
/// written by the UCSC tools).
///
/// Picking a level for a given display resolution is up to the caller.
///
#[derive(Debug, Clone, Default)]
pub struct ZoomCatalog {
    levels: Vec<ZoomLevel>,
}

impl ZoomCatalog {
    pub fn read<S: SeekableByteSource + ?Sized>(
        source: &mut S,
        header: &FileHeader,
    ) -> Result<Self> {
        let order = header.endianness;
        let count = header.zoom_levels as usize;
        let buf = source
            .read_at(HEADER_SIZE as u64, count * ZOOM_HEADER_SIZE)
            .map_err(|e| BbiError::index_eof(e, "zoom level headers"))?;
        let mut rdr = PrimitiveReader::new(&buf, order);
        let eof = |e| BbiError::index_eof(e, "zoom level headers");

        let mut headers = Vec::with_capacity(count);
        for _ in 0..count {
            let reduction_factor = rdr.read_u32().map_err(eof)?;
            let _reserved = rdr.read_u32().map_err(eof)?;
            headers.push(ZoomHeader {
                reduction_factor,
                data_offset: rdr.read_u64().map_err(eof)?,
                index_offset: rdr.read_u64().map_err(eof)?,
            });
        }

        let mut levels = Vec::with_capacity(count);
        for (i, zoom_header) in headers.into_iter().enumerate() {
            let prefix = source
                .read_at(zoom_header.data_offset, 4)
                .map_err(|e| BbiError::index_eof(e, "zoom data count"))?;
            let record_count = PrimitiveReader::new(&prefix, order)
                .read_u32()
                .map_err(|e| BbiError::index_eof(e, "zoom data count"))?;
            let index = SpatialIndex::read(source, zoom_header.index_offset, order)?;

            debug!(
                "Zoom level {}: reduction {}, {} records",
                i, zoom_header.reduction_factor, record_count
            );
            levels.push(ZoomLevel {
                header: zoom_header,
                record_count,
                index,
            });
        }

        Ok(ZoomCatalog { levels })
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn reduction_factor(&self, level: usize) -> Option<u32> {
        self.levels.get(level).map(|l| l.reduction_factor())
    }

    pub fn level(&self, level: usize) -> Option<&ZoomLevel> {
        self.levels.get(level)
    }

    /// Like [`ZoomCatalog::level`], but an out of range level is an error.
    pub fn require(&self, level: usize) -> Result<&ZoomLevel> {
        self.levels.get(level).ok_or(BbiError::NoSuchZoomLevel {
            requested: level,
            available: self.levels.len(),
        })
    }

    pub fn levels(&self) -> &[ZoomLevel] {
        &self.levels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use crate::primitives::Endianness;
    use crate::region::ChromosomeRegion;
    use crate::testing::{sample_bigbed, sample_bigwig};

    #[rstest]
    #[case(Endianness::Little)]
    #[case(Endianness::Big)]
    fn test_read_catalog(#[case] order: Endianness) {
        let mut cursor = Cursor::new(sample_bigwig(order, true).build());
        let header = FileHeader::read(&mut cursor).unwrap();
        let catalog = ZoomCatalog::read(&mut cursor, &header).unwrap();

        assert_eq!(catalog.level_count(), 2);
        assert_eq!(catalog.reduction_factor(0), Some(50));
        assert_eq!(catalog.reduction_factor(1), Some(200));
        assert_eq!(catalog.reduction_factor(2), None);
        assert_eq!(catalog.level(0).unwrap().record_count, 3);
        assert_eq!(catalog.level(1).unwrap().record_count, 2);
    }

    #[rstest]
    fn test_zoom_level_has_own_index() {
        let mut cursor = Cursor::new(sample_bigbed(Endianness::Little, false).build());
        let header = FileHeader::read(&mut cursor).unwrap();
        let catalog = ZoomCatalog::read(&mut cursor, &header).unwrap();
        let level = catalog.level(0).unwrap();

        let mut hits = Vec::new();
        level
            .index
            .query(&ChromosomeRegion::on_chrom(1, 0, 10), &mut hits);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].size, 32);
    }

    #[rstest]
    fn test_require_missing_level() {
        let catalog = ZoomCatalog::default();
        let err = catalog.require(3).unwrap_err();
        assert!(matches!(
            err,
            BbiError::NoSuchZoomLevel {
                requested: 3,
                available: 0
            }
        ));
    }

    #[rstest]
    fn test_truncated_zoom_headers() {
        let bytes = sample_bigwig(Endianness::Little, false).build();
        let mut cursor = Cursor::new(bytes.clone());
        let mut header = FileHeader::read(&mut cursor).unwrap();
        header.zoom_levels = u16::MAX;
        let mut cursor = Cursor::new(bytes[..200].to_vec());
        let err = ZoomCatalog::read(&mut cursor, &header).unwrap_err();
        assert!(matches!(err, BbiError::CorruptIndex(_)));
    }
}
