//! Opening a file and running queries against it.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use log::{info, warn};

use crate::block::{BlockDecoder, BlockFormat};
use crate::chrom_tree::{ChromInfo, ChromosomeIndex};
use crate::errors::{BbiError, Result};
use crate::header::{BbiKind, FileHeader};
use crate::primitives::PrimitiveReader;
use crate::query::RegionQueryIterator;
use crate::records::Record;
use crate::region::ChromosomeRegion;
use crate::rtree::SpatialIndex;
use crate::source::{Decompressor, SeekableByteSource, ZlibDecompressor};
use crate::summary::{RegionSummary, TotalSummary};
use crate::zoom::ZoomCatalog;

///
/// Everything read from a file at open time: header, chromosome tree, base index, zoom levels and
/// total summary.
///
/// A `BbiFile` never touches a stream on its own. Every operation that reads data takes the
/// source to read from, so one `BbiFile` can be shared (e.g. behind an `Arc`) by threads that
/// each own a stream over the same file.
///
#[derive(Debug)]
pub struct BbiFile {
    header: FileHeader,
    chroms: ChromosomeIndex,
    index: SpatialIndex,
    zooms: ZoomCatalog,
    total_summary: Option<TotalSummary>,
    data_count: u64,
    decoder: BlockDecoder,
}

impl BbiFile {
    pub fn open<S: SeekableByteSource + ?Sized>(source: &mut S) -> Result<Self> {
        Self::open_with(source, Arc::new(ZlibDecompressor))
    }

    /// Open with a custom decompressor for the data blocks.
    pub fn open_with<S: SeekableByteSource + ?Sized>(
        source: &mut S,
        decompressor: Arc<dyn Decompressor>,
    ) -> Result<Self> {
        let header = FileHeader::read(source)?;
        let order = header.endianness;

        let chroms = ChromosomeIndex::read(source, header.chrom_tree_offset, order)?;
        let zooms = ZoomCatalog::read(source, &header)?;
        let total_summary = TotalSummary::read(source, header.total_summary_offset, order)?;

        let prefix = source
            .read_at(header.full_data_offset, 8)
            .map_err(|e| BbiError::index_eof(e, "data count"))?;
        let data_count = PrimitiveReader::new(&prefix, order)
            .read_u64()
            .map_err(|e| BbiError::index_eof(e, "data count"))?;

        let index = SpatialIndex::read(source, header.full_index_offset, order)?;
        if data_count == 0 && index.item_count > 0 {
            warn!(
                "Data section declares no records but the index references {} blocks",
                index.item_count
            );
        }

        info!(
            "Opened {} v{}: {} chromosomes, {} zoom levels, {} records, {}",
            header.kind,
            header.version,
            chroms.len(),
            zooms.level_count(),
            data_count,
            if header.is_compressed() {
                "compressed"
            } else {
                "uncompressed"
            }
        );

        let decoder = BlockDecoder::new(order, header.uncompress_buf_size, decompressor);
        Ok(BbiFile {
            header,
            chroms,
            index,
            zooms,
            total_summary,
            data_count,
            decoder,
        })
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn kind(&self) -> BbiKind {
        self.header.kind
    }

    pub fn chrom_index(&self) -> &ChromosomeIndex {
        &self.chroms
    }

    /// Chromosome names in the order they are stored.
    pub fn chromosome_names(&self) -> Vec<String> {
        self.chroms.all_names()
    }

    pub fn chroms(&self) -> Vec<&ChromInfo> {
        self.chroms.chroms()
    }

    pub fn chrom_name(&self, id: u32) -> Option<&str> {
        self.chroms.name_for_id(id)
    }

    pub fn base_index(&self) -> &SpatialIndex {
        &self.index
    }

    pub fn zooms(&self) -> &ZoomCatalog {
        &self.zooms
    }

    pub fn total_summary(&self) -> Option<&TotalSummary> {
        self.total_summary.as_ref()
    }

    /// Count stored at the start of the base data section: features for bigBed, sections for
    /// bigWig.
    pub fn data_count(&self) -> u64 {
        self.data_count
    }

    pub fn autosql<S: SeekableByteSource + ?Sized>(&self, source: &mut S) -> Result<Option<String>> {
        self.header.read_autosql(source)
    }

    fn base_format(&self) -> BlockFormat {
        match self.header.kind {
            BbiKind::BigWig => BlockFormat::Signal,
            BbiKind::BigBed => BlockFormat::Feature,
        }
    }

    /// Resolve `chrom:start-end` to a selection, rejecting unknown names and inverted ranges.
    pub fn selection(&self, chrom: &str, start: u32, end: u32) -> Result<ChromosomeRegion> {
        if start > end {
            return Err(BbiError::InvalidRegion { start, end });
        }
        let id = self
            .chroms
            .id_for_name(chrom)
            .ok_or_else(|| BbiError::UnknownChromosome(chrom.to_string()))?;
        Ok(ChromosomeRegion::on_chrom(id, start, end))
    }

    ///
    /// Records in `chrom:start-end`, from the base data or from zoom level `zoom`.
    ///
    /// With `contained` only records lying entirely inside the range are returned, otherwise any
    /// record sharing at least one base with it.
    ///
    pub fn query<'s, S: SeekableByteSource + ?Sized>(
        &self,
        source: &'s mut S,
        chrom: &str,
        start: u32,
        end: u32,
        zoom: Option<u16>,
        contained: bool,
    ) -> Result<RegionQueryIterator<'s, S>> {
        let selection = self.selection(chrom, start, end)?;
        self.query_region(source, selection, zoom, contained)
    }

    /// Like [`BbiFile::query`], for a selection that may span several chromosomes.
    pub fn query_region<'s, S: SeekableByteSource + ?Sized>(
        &self,
        source: &'s mut S,
        selection: ChromosomeRegion,
        zoom: Option<u16>,
        contained: bool,
    ) -> Result<RegionQueryIterator<'s, S>> {
        let (index, format) = match zoom {
            None => (&self.index, self.base_format()),
            Some(level) => (
                &self.zooms.require(level as usize)?.index,
                BlockFormat::Zoom,
            ),
        };
        Ok(RegionQueryIterator::new(
            source,
            index,
            self.decoder.clone(),
            format,
            selection,
            contained,
        ))
    }

    ///
    /// Aggregate statistics over `chrom:start-end`.
    ///
    /// Zoom records count in proportion to how much of their span falls inside the range.
    /// bigWig items count once per covered base with their value; bigBed features count as
    /// depth 1 per covered base.
    ///
    pub fn summarize<S: SeekableByteSource + ?Sized>(
        &self,
        source: &mut S,
        chrom: &str,
        start: u32,
        end: u32,
        zoom: Option<u16>,
    ) -> Result<RegionSummary> {
        let selection = self.selection(chrom, start, end)?;
        let chrom_id = selection.start_chrom;
        let mut summary = RegionSummary::default();

        for record in self.query_region(source, selection, zoom, false)? {
            let record = record?;
            let covered = record.region().overlap_bases(chrom_id, start, end) as f64;
            match &record {
                Record::Zoom(z) => {
                    let span = z.end.saturating_sub(z.start);
                    if span == 0 {
                        continue;
                    }
                    summary.add_aggregate(
                        covered / span as f64,
                        z.valid_count,
                        z.min_val as f64,
                        z.max_val as f64,
                        z.sum as f64,
                        z.sum_squares as f64,
                    );
                }
                Record::Wig(w) => summary.add_value(covered, w.value as f64),
                Record::Bed(_) => summary.add_value(covered, 1.0),
            }
        }
        Ok(summary)
    }
}

///
/// A [`BbiFile`] paired with the stream it reads from.
///
/// Cloning the indices is not needed to read the same file concurrently: open one reader, then
/// hand each worker its own stream through [`BbiReader::with_source`].
///
pub struct BbiReader<S> {
    file: Arc<BbiFile>,
    source: S,
}

impl<S: SeekableByteSource> BbiReader<S> {
    pub fn open(source: S) -> Result<Self> {
        Self::open_with(source, Arc::new(ZlibDecompressor))
    }

    pub fn open_with(mut source: S, decompressor: Arc<dyn Decompressor>) -> Result<Self> {
        let file = BbiFile::open_with(&mut source, decompressor)?;
        Ok(BbiReader {
            file: Arc::new(file),
            source,
        })
    }

    /// A reader over another stream of the same file, sharing the already loaded indices.
    pub fn with_source<T: SeekableByteSource>(&self, source: T) -> BbiReader<T> {
        BbiReader {
            file: Arc::clone(&self.file),
            source,
        }
    }

    pub fn file(&self) -> &Arc<BbiFile> {
        &self.file
    }

    pub fn header(&self) -> &FileHeader {
        self.file.header()
    }

    pub fn chromosome_names(&self) -> Vec<String> {
        self.file.chromosome_names()
    }

    pub fn chrom_name(&self, id: u32) -> Option<&str> {
        self.file.chrom_name(id)
    }

    pub fn zooms(&self) -> &ZoomCatalog {
        self.file.zooms()
    }

    pub fn total_summary(&self) -> Option<&TotalSummary> {
        self.file.total_summary()
    }

    pub fn autosql(&mut self) -> Result<Option<String>> {
        self.file.autosql(&mut self.source)
    }

    pub fn query(
        &mut self,
        chrom: &str,
        start: u32,
        end: u32,
        zoom: Option<u16>,
        contained: bool,
    ) -> Result<RegionQueryIterator<'_, S>> {
        self.file
            .query(&mut self.source, chrom, start, end, zoom, contained)
    }

    pub fn query_region(
        &mut self,
        selection: ChromosomeRegion,
        zoom: Option<u16>,
        contained: bool,
    ) -> Result<RegionQueryIterator<'_, S>> {
        self.file
            .query_region(&mut self.source, selection, zoom, contained)
    }

    pub fn summarize(
        &mut self,
        chrom: &str,
        start: u32,
        end: u32,
        zoom: Option<u16>,
    ) -> Result<RegionSummary> {
        self.file
            .summarize(&mut self.source, chrom, start, end, zoom)
    }

    pub fn into_inner(self) -> S {
        self.source
    }
}

impl BbiReader<BufReader<File>> {
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::open(BufReader::new(file))
    }

    /// A sibling reader with its own handle on the same path.
    pub fn reopen<P: AsRef<Path>>(&self, path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Ok(self.with_source(BufReader::new(file)))
    }
}
