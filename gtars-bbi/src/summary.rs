use crate::consts::TOTAL_SUMMARY_SIZE;
use crate::errors::{BbiError, Result};
use crate::primitives::{Endianness, PrimitiveReader};
use crate::source::SeekableByteSource;

///
/// Whole-file statistics stored once in the file.
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TotalSummary {
    pub bases_covered: u64,
    pub min_val: f64,
    pub max_val: f64,
    pub sum: f64,
    pub sum_squares: f64,
}

impl TotalSummary {
    /// Read the 40 byte summary block; an offset of 0 means the file has none.
    pub fn read<S: SeekableByteSource + ?Sized>(
        source: &mut S,
        offset: u64,
        order: Endianness,
    ) -> Result<Option<Self>> {
        if offset == 0 {
            return Ok(None);
        }
        let buf = source
            .read_at(offset, TOTAL_SUMMARY_SIZE)
            .map_err(|e| BbiError::index_eof(e, "total summary"))?;
        Self::from_bytes(&buf, order).map(Some)
    }

    pub fn from_bytes(buf: &[u8], order: Endianness) -> Result<Self> {
        let mut rdr = PrimitiveReader::new(buf, order);
        let truncated = |e| BbiError::index_eof(e, "total summary");
        Ok(TotalSummary {
            bases_covered: rdr.read_u64().map_err(truncated)?,
            min_val: rdr.read_f64().map_err(truncated)?,
            max_val: rdr.read_f64().map_err(truncated)?,
            sum: rdr.read_f64().map_err(truncated)?,
            sum_squares: rdr.read_f64().map_err(truncated)?,
        })
    }

    pub fn mean(&self) -> f64 {
        if self.bases_covered == 0 {
            return 0.0;
        }
        self.sum / self.bases_covered as f64
    }

    pub fn std_dev(&self) -> f64 {
        std_dev(self.bases_covered as f64, self.sum, self.sum_squares)
    }
}

/// Sample standard deviation from running sums.
fn std_dev(n: f64, sum: f64, sum_squares: f64) -> f64 {
    if n <= 1.0 {
        return 0.0;
    }
    let var = (sum_squares - sum * sum / n) / (n - 1.0);
    if var > 0.0 { var.sqrt() } else { 0.0 }
}

///
/// Statistics accumulated over the records intersecting one query region.
///
/// `valid_bases` is fractional because zoom records that straddle the region
/// boundary are weighted by the share of their span that lies inside it.
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionSummary {
    pub valid_bases: f64,
    pub min_val: f64,
    pub max_val: f64,
    pub sum: f64,
    pub sum_squares: f64,
}

impl Default for RegionSummary {
    fn default() -> Self {
        RegionSummary {
            valid_bases: 0.0,
            min_val: f64::INFINITY,
            max_val: f64::NEG_INFINITY,
            sum: 0.0,
            sum_squares: 0.0,
        }
    }
}

impl RegionSummary {
    pub fn is_empty(&self) -> bool {
        self.valid_bases <= 0.0
    }

    /// Add `bases` bases that all carry `value`.
    pub fn add_value(&mut self, bases: f64, value: f64) {
        if bases <= 0.0 {
            return;
        }
        self.valid_bases += bases;
        self.min_val = self.min_val.min(value);
        self.max_val = self.max_val.max(value);
        self.sum += value * bases;
        self.sum_squares += value * value * bases;
    }

    /// Add a pre-aggregated record scaled by `fraction` of its span.
    pub fn add_aggregate(
        &mut self,
        fraction: f64,
        valid_count: u32,
        min_val: f64,
        max_val: f64,
        sum: f64,
        sum_squares: f64,
    ) {
        if fraction <= 0.0 || valid_count == 0 {
            return;
        }
        self.valid_bases += valid_count as f64 * fraction;
        self.min_val = self.min_val.min(min_val);
        self.max_val = self.max_val.max(max_val);
        self.sum += sum * fraction;
        self.sum_squares += sum_squares * fraction;
    }

    pub fn mean(&self) -> Option<f64> {
        if self.is_empty() {
            None
        } else {
            Some(self.sum / self.valid_bases)
        }
    }

    pub fn std_dev(&self) -> f64 {
        std_dev(self.valid_bases, self.sum, self.sum_squares)
    }
}
