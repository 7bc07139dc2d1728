pub const BBI_CMD: &str = "bbi";
pub const BBI_INFO: &str = "info";
pub const BBI_CHROMS: &str = "chroms";
pub const BBI_ZOOMS: &str = "zooms";
pub const BBI_QUERY: &str = "query";
pub const BBI_SUMMARY: &str = "summary";

pub const BIGWIG_MAGIC: u32 = 0x888F_FC26;
pub const BIGBED_MAGIC: u32 = 0x8789_F2EB;
pub const CHROM_TREE_MAGIC: u32 = 0x78CA_8C91;
pub const CIR_TREE_MAGIC: u32 = 0x2468_ACE0;

pub const HEADER_SIZE: usize = 64;
pub const ZOOM_HEADER_SIZE: usize = 24;
pub const TOTAL_SUMMARY_SIZE: usize = 40;
pub const CHROM_TREE_HEADER_SIZE: usize = 32;
pub const CIR_TREE_HEADER_SIZE: usize = 48;
pub const NODE_HEADER_SIZE: usize = 4;

/// bounds + data offset + data size
pub const CIR_LEAF_ITEM_SIZE: usize = 32;
/// bounds + child offset
pub const CIR_CHILD_ITEM_SIZE: usize = 24;

pub const ZOOM_RECORD_SIZE: usize = 32;
pub const WIG_SECTION_HEADER_SIZE: usize = 24;

pub const MIN_SUPPORTED_VERSION: u16 = 1;
pub const MAX_SUPPORTED_VERSION: u16 = 4;

/// Deeper trees than this are treated as corrupt (or cyclic).
pub const MAX_TREE_DEPTH: usize = 32;

/// Blocks claiming to be larger than this are treated as corrupt rather than allocated.
pub const MAX_BLOCK_BYTES: u64 = 1 << 30;

/// Longest chromosome tree key accepted; UCSC writers size keys to the longest name.
pub const MAX_CHROM_KEY_SIZE: u32 = 255;
