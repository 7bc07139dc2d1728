//! Lazy region queries over one spatial index.

use std::collections::VecDeque;

use log::debug;

use crate::block::{BlockDecoder, BlockFormat};
use crate::errors::{BbiError, Result};
use crate::records::Record;
use crate::region::{ChromosomeRegion, RegionOrder};
use crate::rtree::{DataBlock, SpatialIndex};
use crate::source::SeekableByteSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    /// The index had no leaf overlapping the selection.
    Empty,
    /// Leaf hits are queued and the next one has not been decoded yet.
    Fetching,
    /// A decoded block still has matching records buffered.
    HasRecords,
    Exhausted,
}

///
/// Pull-based iterator over the records of one index that match a selection.
///
/// Leaf hits are collected up front from the in-memory index; blocks are only read and
/// decoded as records are pulled. A block that fails to decode ends the query: the error is
/// returned once and the iterator is exhausted afterwards. The index itself is untouched, so
/// later queries against the same file are unaffected.
///
/// Calling [`RegionQueryIterator::next_record`] after [`RegionQueryIterator::has_next`] has
/// returned `false` yields [`BbiError::NoSuchElement`].
///
pub struct RegionQueryIterator<'a, S: SeekableByteSource + ?Sized> {
    source: &'a mut S,
    decoder: BlockDecoder,
    format: BlockFormat,
    selection: ChromosomeRegion,
    contained: bool,
    leaf_hits: VecDeque<DataBlock>,
    records: VecDeque<Record>,
    state: QueryState,
}

impl<'a, S: SeekableByteSource + ?Sized> RegionQueryIterator<'a, S> {
    pub fn new(
        source: &'a mut S,
        index: &SpatialIndex,
        decoder: BlockDecoder,
        format: BlockFormat,
        selection: ChromosomeRegion,
        contained: bool,
    ) -> Self {
        let mut hits = Vec::new();
        index.query(&selection, &mut hits);
        debug!(
            "Query {} ({}): {} leaf hits",
            selection,
            if contained { "contained" } else { "intersecting" },
            hits.len()
        );

        let state = if hits.is_empty() {
            QueryState::Empty
        } else {
            QueryState::Fetching
        };
        RegionQueryIterator {
            source,
            decoder,
            format,
            selection,
            contained,
            leaf_hits: hits.into(),
            records: VecDeque::new(),
            state,
        }
    }

    pub fn state(&self) -> QueryState {
        self.state
    }

    pub fn selection(&self) -> &ChromosomeRegion {
        &self.selection
    }

    /// Leaf blocks not yet read.
    pub fn pending_blocks(&self) -> usize {
        self.leaf_hits.len()
    }

    fn matches(&self, record: &Record) -> bool {
        let order = record.region().compare(&self.selection);
        if self.contained {
            order == RegionOrder::Contained
        } else {
            order.intersects()
        }
    }

    fn fetch(&mut self, block: DataBlock) -> Result<()> {
        let decoded = self.decoder.decode(&mut *self.source, &block, self.format)?;
        let before = self.records.len();
        for record in decoded {
            if self.matches(&record) {
                self.records.push_back(record);
            }
        }
        debug!(
            "Block at {} ({} bytes): {} matching records",
            block.offset,
            block.size,
            self.records.len() - before
        );
        Ok(())
    }

    /// Whether another record is available, decoding further blocks as needed.
    pub fn has_next(&mut self) -> Result<bool> {
        loop {
            match self.state {
                QueryState::Empty | QueryState::Exhausted => return Ok(false),
                QueryState::HasRecords => {
                    if !self.records.is_empty() {
                        return Ok(true);
                    }
                    self.state = if self.leaf_hits.is_empty() {
                        QueryState::Exhausted
                    } else {
                        QueryState::Fetching
                    };
                }
                QueryState::Fetching => {
                    let Some(block) = self.leaf_hits.pop_front() else {
                        self.state = QueryState::Exhausted;
                        continue;
                    };
                    if let Err(e) = self.fetch(block) {
                        self.leaf_hits.clear();
                        self.records.clear();
                        self.state = QueryState::Exhausted;
                        return Err(e);
                    }
                    if !self.records.is_empty() {
                        self.state = QueryState::HasRecords;
                    }
                }
            }
        }
    }

    pub fn next_record(&mut self) -> Result<Record> {
        if self.has_next()? {
            self.records.pop_front().ok_or(BbiError::NoSuchElement)
        } else {
            Err(BbiError::NoSuchElement)
        }
    }
}

impl<S: SeekableByteSource + ?Sized> Iterator for RegionQueryIterator<'_, S> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.has_next() {
            Ok(true) => self.records.pop_front().map(Ok),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
