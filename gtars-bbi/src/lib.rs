//! Random access reading of bigWig and bigBed (BBI) files.
//!
//! A BBI file carries its own indices: a B+ tree mapping chromosome names to ids, an R+ tree
//! mapping (chromosome, base) ranges to the data blocks that cover them, and optional zoom
//! levels holding pre-aggregated summaries, each with an R+ tree of its own. This crate reads
//! those indices once, then answers region queries by decoding only the blocks a query touches.
//!
//! Reading is synchronous and byte-order agnostic: files written on either little- or big-endian
//! machines are detected from their magic number.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gtars_bbi::BbiReader;
//!
//! let mut reader = BbiReader::open_path("signal.bw")?;
//! println!("{:?}", reader.chromosome_names());
//!
//! for record in reader.query("chr1", 10_000, 20_000, None, false)? {
//!     let record = record?;
//!     println!("{}\t{}\t{}", record.chrom_id(), record.start(), record.end());
//! }
//! # Ok::<(), gtars_bbi::BbiError>(())
//! ```
//!
//! ## Sharing a file between threads
//!
//! [`BbiFile`] holds the indices and is `Send + Sync`. Seeking and reading is stateful, so each
//! thread needs a stream of its own: see [`BbiReader::with_source`].

pub mod block;
pub mod chrom_tree;
pub mod consts;
pub mod errors;
pub mod header;
pub mod primitives;
pub mod query;
pub mod reader;
pub mod records;
pub mod region;
pub mod rtree;
pub mod source;
pub mod summary;
pub mod zoom;

#[cfg(test)]
mod testing;

pub use errors::{BbiError, Result};
pub use header::{BbiKind, FileHeader};
pub use query::RegionQueryIterator;
pub use reader::{BbiFile, BbiReader};
pub use records::{BedRecord, Record, WigItem, ZoomRecord};
pub use region::{ChromosomeRegion, RegionOrder, compare_regions};
pub use source::{Decompressor, SeekableByteSource, ZlibDecompressor};
pub use summary::{RegionSummary, TotalSummary};
