//! The R+ tree ("cirTree") spatial index. One instance covers the base-resolution data and one
//! more covers each zoom level; leaves point at compressed data blocks.

use log::{debug, warn};

use crate::consts::{
    CIR_CHILD_ITEM_SIZE, CIR_LEAF_ITEM_SIZE, CIR_TREE_HEADER_SIZE, CIR_TREE_MAGIC, MAX_TREE_DEPTH,
    NODE_HEADER_SIZE,
};
use crate::errors::{BbiError, Result};
use crate::primitives::{Endianness, PrimitiveReader};
use crate::region::{ChromosomeRegion, RegionOrder, bounding_region};
use crate::source::SeekableByteSource;

/// Location of one data block in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataBlock {
    pub offset: u64,
    pub size: u64,
}

impl DataBlock {
    /// One past the last byte, or `None` if that is not representable.
    pub fn end(&self) -> Option<u64> {
        self.offset.checked_add(self.size)
    }
}

#[derive(Debug, Clone)]
pub struct RTreeLeafItem {
    pub region: ChromosomeRegion,
    pub block: DataBlock,
}

#[derive(Debug, Clone)]
pub struct RTreeChildItem {
    pub region: ChromosomeRegion,
    pub node: RTreeNode,
}

#[derive(Debug, Clone)]
pub enum RTreeNode {
    Leaf(Vec<RTreeLeafItem>),
    Child(Vec<RTreeChildItem>),
}

impl RTreeNode {
    /// Union of the item regions in this node.
    pub fn bounds(&self) -> Option<ChromosomeRegion> {
        match self {
            RTreeNode::Leaf(items) => bounding_region(items.iter().map(|i| &i.region)),
            RTreeNode::Child(children) => bounding_region(children.iter().map(|c| &c.region)),
        }
    }

    /// Append every leaf block that intersects `selection`, in ascending region order.
    pub fn query(&self, selection: &ChromosomeRegion, hits: &mut Vec<DataBlock>) {
        match self {
            RTreeNode::Leaf(items) => {
                for item in items {
                    match item.region.compare(selection) {
                        // items are sorted, nothing later can intersect
                        RegionOrder::Follows => break,
                        RegionOrder::Precedes => continue,
                        _ => hits.push(item.block),
                    }
                }
            }
            RTreeNode::Child(children) => {
                for child in children {
                    match child.region.compare(selection) {
                        RegionOrder::Follows => break,
                        RegionOrder::Precedes => continue,
                        _ => child.node.query(selection, hits),
                    }
                }
            }
        }
    }

    fn collect_blocks(&self, out: &mut Vec<DataBlock>) {
        match self {
            RTreeNode::Leaf(items) => out.extend(items.iter().map(|i| i.block)),
            RTreeNode::Child(children) => {
                for child in children {
                    child.node.collect_blocks(out);
                }
            }
        }
    }
}

///
/// An R+ tree read in full from the file.
///
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    pub block_size: u32,
    pub item_count: u64,
    /// Bounds recorded in the tree header.
    pub bounds: ChromosomeRegion,
    pub end_file_offset: u64,
    pub items_per_slot: u32,
    root: RTreeNode,
}

impl SpatialIndex {
    pub fn read<S: SeekableByteSource + ?Sized>(
        source: &mut S,
        offset: u64,
        order: Endianness,
    ) -> Result<Self> {
        let buf = source
            .read_at(offset, CIR_TREE_HEADER_SIZE)
            .map_err(|e| BbiError::index_eof(e, "R tree header"))?;
        let mut rdr = PrimitiveReader::new(&buf, order);
        let eof = |e| BbiError::index_eof(e, "R tree header");

        let magic = rdr.read_u32().map_err(eof)?;
        if magic != CIR_TREE_MAGIC {
            return Err(BbiError::CorruptIndex(format!(
                "bad R tree magic {:#010x} at offset {}",
                magic, offset
            )));
        }
        let block_size = rdr.read_u32().map_err(eof)?;
        let item_count = rdr.read_u64().map_err(eof)?;
        let bounds = ChromosomeRegion::new(
            rdr.read_u32().map_err(eof)?,
            rdr.read_u32().map_err(eof)?,
            rdr.read_u32().map_err(eof)?,
            rdr.read_u32().map_err(eof)?,
        );
        let end_file_offset = rdr.read_u64().map_err(eof)?;
        let items_per_slot = rdr.read_u32().map_err(eof)?;

        let root = read_node(source, offset + CIR_TREE_HEADER_SIZE as u64, order, 0)?;

        let index = SpatialIndex {
            block_size,
            item_count,
            bounds,
            end_file_offset,
            items_per_slot,
            root,
        };
        index.check_blocks_disjoint()?;

        debug!(
            "Loaded R tree at offset {}: {} blocks, bounds {}",
            offset,
            index.blocks().len(),
            index.bounds
        );
        Ok(index)
    }

    pub fn root(&self) -> &RTreeNode {
        &self.root
    }

    /// Append the blocks whose regions intersect `selection` to `hits`.
    ///
    /// This works at block granularity: records inside a hit block may still fall partly or
    /// wholly outside the selection.
    pub fn query(&self, selection: &ChromosomeRegion, hits: &mut Vec<DataBlock>) {
        match self.root.bounds() {
            Some(bounds) if bounds.intersects(selection) => self.root.query(selection, hits),
            _ => {}
        }
    }

    /// Every block, in leaf order.
    pub fn blocks(&self) -> Vec<DataBlock> {
        let mut out = Vec::new();
        self.root.collect_blocks(&mut out);
        out
    }

    fn check_blocks_disjoint(&self) -> Result<()> {
        let mut blocks = self.blocks();
        blocks.sort();
        for block in &blocks {
            if block.end().is_none() {
                return Err(BbiError::CorruptIndex(format!(
                    "data block at offset {} with size {} runs past the addressable range",
                    block.offset, block.size
                )));
            }
        }
        for pair in blocks.windows(2) {
            if pair[0].end().is_some_and(|end| end > pair[1].offset) {
                return Err(BbiError::CorruptIndex(format!(
                    "data blocks at offsets {} and {} overlap",
                    pair[0].offset, pair[1].offset
                )));
            }
        }
        Ok(())
    }
}

fn read_region(rdr: &mut PrimitiveReader<'_>) -> std::io::Result<ChromosomeRegion> {
    Ok(ChromosomeRegion::new(
        rdr.read_u32()?,
        rdr.read_u32()?,
        rdr.read_u32()?,
        rdr.read_u32()?,
    ))
}

fn read_node<S: SeekableByteSource + ?Sized>(
    source: &mut S,
    offset: u64,
    order: Endianness,
    depth: usize,
) -> Result<RTreeNode> {
    if depth > MAX_TREE_DEPTH {
        return Err(BbiError::CorruptIndex(format!(
            "R tree deeper than {} levels",
            MAX_TREE_DEPTH
        )));
    }

    let head = source
        .read_at(offset, NODE_HEADER_SIZE)
        .map_err(|e| BbiError::index_eof(e, "R tree node"))?;
    let mut rdr = PrimitiveReader::new(&head, order);
    let eof = |e| BbiError::index_eof(e, "R tree node");
    let is_leaf = rdr.read_u8().map_err(eof)?;
    let _reserved = rdr.read_u8().map_err(eof)?;
    let count = rdr.read_u16().map_err(eof)? as usize;

    let item_size = match is_leaf {
        1 => CIR_LEAF_ITEM_SIZE,
        0 => CIR_CHILD_ITEM_SIZE,
        other => {
            return Err(BbiError::CorruptIndex(format!(
                "R tree node at offset {} has type byte {}",
                offset, other
            )));
        }
    };
    let mut body = vec![0u8; item_size * count];
    source
        .read_fully(&mut body)
        .map_err(|e| BbiError::index_eof(e, "R tree items"))?;
    let mut rdr = PrimitiveReader::new(&body, order);

    if is_leaf == 1 {
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            let region = read_region(&mut rdr).map_err(eof)?;
            let block = DataBlock {
                offset: rdr.read_u64().map_err(eof)?,
                size: rdr.read_u64().map_err(eof)?,
            };
            items.push(RTreeLeafItem { region, block });
        }
        return Ok(RTreeNode::Leaf(items));
    }

    let mut pending = Vec::with_capacity(count);
    for _ in 0..count {
        let region = read_region(&mut rdr).map_err(eof)?;
        let child_offset = rdr.read_u64().map_err(eof)?;
        pending.push((region, child_offset));
    }

    let mut children = Vec::with_capacity(count);
    for (region, child_offset) in pending {
        let node = read_node(source, child_offset, order, depth + 1)?;
        if let Some(actual) = node.bounds() {
            if actual.extremes(&region) != region {
                warn!(
                    "R tree child at offset {} spans {} but its parent records {}",
                    child_offset, actual, region
                );
            }
        }
        children.push(RTreeChildItem { region, node });
    }
    Ok(RTreeNode::Child(children))
}
