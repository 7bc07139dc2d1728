//! Typed records decoded out of data blocks.

use std::fmt::{self, Display};

use crate::region::ChromosomeRegion;

///
/// One bigBed feature. `rest` holds the tab-separated columns after chrom/start/end.
///
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BedRecord {
    pub chrom_id: u32,
    pub start: u32,
    pub end: u32,
    pub rest: String,
}

impl BedRecord {
    pub fn width(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    ///
    /// Render as a BED line given the resolved chromosome name.
    ///
    pub fn to_bed_line(&self, chrom: &str) -> String {
        if self.rest.is_empty() {
            format!("{}\t{}\t{}", chrom, self.start, self.end)
        } else {
            format!("{}\t{}\t{}\t{}", chrom, self.start, self.end, self.rest)
        }
    }
}

/// Layout of the items in one wig section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WigItemType {
    /// start, end, value
    BedGraph,
    /// start, value; end is start + span
    VariableStep,
    /// value only; positions follow from the section start and step
    FixedStep,
}

impl WigItemType {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(WigItemType::BedGraph),
            2 => Some(WigItemType::VariableStep),
            3 => Some(WigItemType::FixedStep),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            WigItemType::BedGraph => 1,
            WigItemType::VariableStep => 2,
            WigItemType::FixedStep => 3,
        }
    }

    /// Encoded size of one item.
    pub fn item_size(self) -> usize {
        match self {
            WigItemType::BedGraph => 12,
            WigItemType::VariableStep => 8,
            WigItemType::FixedStep => 4,
        }
    }
}

/// One bigWig value over `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WigItem {
    pub chrom_id: u32,
    pub start: u32,
    pub end: u32,
    pub value: f32,
}

impl WigItem {
    pub fn to_bedgraph_line(&self, chrom: &str) -> String {
        format!("{}\t{}\t{}\t{}", chrom, self.start, self.end, self.value)
    }
}

///
/// One pre-aggregated zoom level data point.
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomRecord {
    pub chrom_id: u32,
    pub start: u32,
    pub end: u32,
    /// Number of bases with data in `[start, end)`.
    pub valid_count: u32,
    pub min_val: f32,
    pub max_val: f32,
    pub sum: f32,
    pub sum_squares: f32,
}

impl ZoomRecord {
    pub fn mean(&self) -> f64 {
        if self.valid_count == 0 {
            return 0.0;
        }
        self.sum as f64 / self.valid_count as f64
    }

    pub fn to_line(&self, chrom: &str) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            chrom,
            self.start,
            self.end,
            self.valid_count,
            self.min_val,
            self.max_val,
            self.sum,
            self.sum_squares
        )
    }
}

/// Any record a query can yield.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Bed(BedRecord),
    Wig(WigItem),
    Zoom(ZoomRecord),
}

impl Record {
    pub fn chrom_id(&self) -> u32 {
        match self {
            Record::Bed(r) => r.chrom_id,
            Record::Wig(r) => r.chrom_id,
            Record::Zoom(r) => r.chrom_id,
        }
    }

    pub fn start(&self) -> u32 {
        match self {
            Record::Bed(r) => r.start,
            Record::Wig(r) => r.start,
            Record::Zoom(r) => r.start,
        }
    }

    pub fn end(&self) -> u32 {
        match self {
            Record::Bed(r) => r.end,
            Record::Wig(r) => r.end,
            Record::Zoom(r) => r.end,
        }
    }

    pub fn region(&self) -> ChromosomeRegion {
        ChromosomeRegion::on_chrom(self.chrom_id(), self.start(), self.end())
    }

    /// Render as a tab-separated line given the resolved chromosome name.
    pub fn to_line(&self, chrom: &str) -> String {
        match self {
            Record::Bed(r) => r.to_bed_line(chrom),
            Record::Wig(r) => r.to_bedgraph_line(chrom),
            Record::Zoom(r) => r.to_line(chrom),
        }
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_line(&self.chrom_id().to_string()))
    }
}
