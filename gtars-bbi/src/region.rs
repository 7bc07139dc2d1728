//! Half-open intervals in (chromosome id, base) space and the five-way classifier used by the
//! spatial index for pruning and by queries for the final containment test.

use std::cmp::Ordering;
use std::fmt::{self, Display};

///
/// A half-open region that may span chromosomes: from `(start_chrom, start_base)` inclusive to
/// `(end_chrom, end_base)` exclusive, ordered lexicographically.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChromosomeRegion {
    pub start_chrom: u32,
    pub start_base: u32,
    pub end_chrom: u32,
    pub end_base: u32,
}

/// How region A relates to region B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionOrder {
    /// A ends at or before the start of B.
    Precedes,
    /// A overlaps B and starts before it.
    OverlapsBelow,
    /// A lies entirely within B.
    Contained,
    /// A overlaps B, starts inside it and extends past its end.
    OverlapsAbove,
    /// A starts at or after the end of B.
    Follows,
}

impl RegionOrder {
    /// Numeric form: -2, -1, 0, 1, 2 in declaration order.
    pub fn value(self) -> i8 {
        match self {
            RegionOrder::Precedes => -2,
            RegionOrder::OverlapsBelow => -1,
            RegionOrder::Contained => 0,
            RegionOrder::OverlapsAbove => 1,
            RegionOrder::Follows => 2,
        }
    }

    /// True for everything except the two disjoint cases.
    pub fn intersects(self) -> bool {
        self.value().abs() < 2
    }

    pub fn is_disjoint(self) -> bool {
        !self.intersects()
    }
}

impl ChromosomeRegion {
    pub fn new(start_chrom: u32, start_base: u32, end_chrom: u32, end_base: u32) -> Self {
        ChromosomeRegion {
            start_chrom,
            start_base,
            end_chrom,
            end_base,
        }
    }

    /// A region on a single chromosome.
    pub fn on_chrom(chrom: u32, start: u32, end: u32) -> Self {
        ChromosomeRegion::new(chrom, start, chrom, end)
    }

    #[inline]
    pub fn start(&self) -> (u32, u32) {
        (self.start_chrom, self.start_base)
    }

    #[inline]
    pub fn end(&self) -> (u32, u32) {
        (self.end_chrom, self.end_base)
    }

    pub fn is_empty(&self) -> bool {
        self.end() <= self.start()
    }

    /// Classify `self` against `other`.
    pub fn compare(&self, other: &ChromosomeRegion) -> RegionOrder {
        if self.end() <= other.start() {
            RegionOrder::Precedes
        } else if self.start() >= other.end() {
            RegionOrder::Follows
        } else if self.start() >= other.start() && self.end() <= other.end() {
            RegionOrder::Contained
        } else if self.start() < other.start() {
            RegionOrder::OverlapsBelow
        } else {
            RegionOrder::OverlapsAbove
        }
    }

    pub fn intersects(&self, other: &ChromosomeRegion) -> bool {
        self.compare(other).intersects()
    }

    /// The smallest region covering both.
    pub fn extremes(&self, other: &ChromosomeRegion) -> ChromosomeRegion {
        let (start_chrom, start_base) = self.start().min(other.start());
        let (end_chrom, end_base) = self.end().max(other.end());
        ChromosomeRegion::new(start_chrom, start_base, end_chrom, end_base)
    }

    /// Number of bases shared with `[start, end)` on `chrom`, for single-chromosome regions.
    pub fn overlap_bases(&self, chrom: u32, start: u32, end: u32) -> u32 {
        if self.start_chrom != chrom || self.end_chrom != chrom {
            return 0;
        }
        self.end_base
            .min(end)
            .saturating_sub(self.start_base.max(start))
    }
}

/// Numeric classifier: -2 precedes, -1 overlaps from below, 0 contained, 1 overlaps from
/// above, 2 follows.
pub fn compare_regions(a: &ChromosomeRegion, b: &ChromosomeRegion) -> i8 {
    a.compare(b).value()
}

/// Union of a non-empty run of regions.
pub fn bounding_region<'a, I>(regions: I) -> Option<ChromosomeRegion>
where
    I: IntoIterator<Item = &'a ChromosomeRegion>,
{
    regions.into_iter().fold(None, |acc, r| match acc {
        None => Some(*r),
        Some(bounds) => Some(bounds.extremes(r)),
    })
}

impl PartialOrd for ChromosomeRegion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ChromosomeRegion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.start()
            .cmp(&other.start())
            .then_with(|| self.end().cmp(&other.end()))
    }
}

impl Display for ChromosomeRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.start_chrom, self.start_base, self.end_chrom, self.end_base
        )
    }
}
