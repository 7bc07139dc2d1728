//! The chromosome B+ tree: maps chromosome names to the compact integer ids used everywhere
//! else in the file, and back.

use std::collections::BTreeMap;

use log::{debug, warn};

use crate::consts::{
    CHROM_TREE_HEADER_SIZE, CHROM_TREE_MAGIC, MAX_CHROM_KEY_SIZE, MAX_TREE_DEPTH, NODE_HEADER_SIZE,
};
use crate::errors::{BbiError, Result};
use crate::primitives::{Endianness, PrimitiveReader};
use crate::source::SeekableByteSource;

/// Name, id and length of one chromosome.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChromInfo {
    pub name: String,
    pub id: u32,
    pub size: u32,
}

#[derive(Debug, Clone)]
pub struct ChromLeafItem {
    key: Vec<u8>,
    pub info: ChromInfo,
}

#[derive(Debug, Clone)]
pub struct ChromChildItem {
    /// Smallest key under this child (the key stored in the parent).
    lowest_key: Vec<u8>,
    /// Largest key found under this child.
    highest_key: Vec<u8>,
    min_id: u32,
    max_id: u32,
    pub node: ChromTreeNode,
}

#[derive(Debug, Clone)]
pub enum ChromTreeNode {
    Leaf(Vec<ChromLeafItem>),
    Child(Vec<ChromChildItem>),
}

impl ChromTreeNode {
    fn highest_key(&self) -> Option<&[u8]> {
        match self {
            ChromTreeNode::Leaf(items) => items.iter().map(|i| i.key.as_slice()).max(),
            ChromTreeNode::Child(children) => {
                children.iter().map(|c| c.highest_key.as_slice()).max()
            }
        }
    }

    fn id_range(&self) -> Option<(u32, u32)> {
        match self {
            ChromTreeNode::Leaf(items) => {
                let min = items.iter().map(|i| i.info.id).min()?;
                let max = items.iter().map(|i| i.info.id).max()?;
                Some((min, max))
            }
            ChromTreeNode::Child(children) => {
                let min = children.iter().map(|c| c.min_id).min()?;
                let max = children.iter().map(|c| c.max_id).max()?;
                Some((min, max))
            }
        }
    }

    fn find_by_key(&self, key: &[u8]) -> Option<&ChromInfo> {
        match self {
            ChromTreeNode::Leaf(items) => items.iter().find(|i| i.key == key).map(|i| &i.info),
            // prefixes are not guaranteed to partition cleanly, so every candidate child is tried
            ChromTreeNode::Child(children) => children
                .iter()
                .filter(|c| c.lowest_key.as_slice() <= key && key <= c.highest_key.as_slice())
                .find_map(|c| c.node.find_by_key(key)),
        }
    }

    fn find_by_id(&self, id: u32) -> Option<&ChromInfo> {
        match self {
            ChromTreeNode::Leaf(items) => items.iter().find(|i| i.info.id == id).map(|i| &i.info),
            ChromTreeNode::Child(children) => children
                .iter()
                .filter(|c| c.min_id <= id && id <= c.max_id)
                .find_map(|c| c.node.find_by_id(id)),
        }
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a ChromInfo>) {
        match self {
            ChromTreeNode::Leaf(items) => out.extend(items.iter().map(|i| &i.info)),
            ChromTreeNode::Child(children) => {
                for child in children {
                    child.node.collect(out);
                }
            }
        }
    }

    /// Returns false once ids past `end` have been seen, so callers can stop early.
    fn collect_ids(&self, start: u32, end: u32, out: &mut BTreeMap<u32, String>) -> bool {
        match self {
            ChromTreeNode::Leaf(items) => {
                for item in items {
                    if item.info.id > end {
                        return false;
                    }
                    if item.info.id >= start {
                        out.insert(item.info.id, item.info.name.clone());
                    }
                }
                true
            }
            ChromTreeNode::Child(children) => {
                for child in children {
                    if child.min_id > end {
                        return false;
                    }
                    if child.max_id < start {
                        continue;
                    }
                    if !child.node.collect_ids(start, end, out) {
                        return false;
                    }
                }
                true
            }
        }
    }
}

///
/// The chromosome B+ tree, read in full when the file is opened.
///
#[derive(Debug, Clone)]
pub struct ChromosomeIndex {
    pub block_size: u32,
    pub key_size: u32,
    pub item_count: u64,
    root: ChromTreeNode,
    /// Leaves actually read, which may differ from `item_count` in a damaged file.
    chrom_count: usize,
}

impl ChromosomeIndex {
    pub fn read<S: SeekableByteSource + ?Sized>(
        source: &mut S,
        offset: u64,
        order: Endianness,
    ) -> Result<Self> {
        let buf = source
            .read_at(offset, CHROM_TREE_HEADER_SIZE)
            .map_err(|e| BbiError::index_eof(e, "chromosome tree header"))?;
        let mut rdr = PrimitiveReader::new(&buf, order);
        let eof = |e| BbiError::index_eof(e, "chromosome tree header");

        let magic = rdr.read_u32().map_err(eof)?;
        if magic != CHROM_TREE_MAGIC {
            return Err(BbiError::CorruptIndex(format!(
                "bad chromosome tree magic {:#010x} at offset {}",
                magic, offset
            )));
        }
        let block_size = rdr.read_u32().map_err(eof)?;
        let key_size = rdr.read_u32().map_err(eof)?;
        let val_size = rdr.read_u32().map_err(eof)?;
        let item_count = rdr.read_u64().map_err(eof)?;

        if key_size == 0 || key_size > MAX_CHROM_KEY_SIZE {
            return Err(BbiError::CorruptIndex(format!(
                "chromosome tree key size {} is outside 1..={}",
                key_size, MAX_CHROM_KEY_SIZE
            )));
        }
        if val_size != 8 {
            return Err(BbiError::CorruptIndex(format!(
                "chromosome tree value size is {}, expected 8",
                val_size
            )));
        }

        let root = read_node(
            source,
            offset + CHROM_TREE_HEADER_SIZE as u64,
            order,
            key_size as usize,
            0,
        )?;

        let mut found = Vec::new();
        root.collect(&mut found);
        let chrom_count = found.len();
        if chrom_count as u64 != item_count {
            warn!(
                "Chromosome tree declares {} items but {} were read",
                item_count, chrom_count
            );
        }
        debug!(
            "Loaded chromosome tree: {} chromosomes, key size {}",
            chrom_count, key_size
        );

        Ok(ChromosomeIndex {
            block_size,
            key_size,
            item_count,
            root,
            chrom_count,
        })
    }

    pub fn root(&self) -> &ChromTreeNode {
        &self.root
    }

    /// Names are matched on their first `key_size` bytes, as stored.
    fn search_key(&self, name: &str) -> Vec<u8> {
        let truncated: Vec<u8> = name.bytes().take(self.key_size as usize).collect();
        normalize_key(&truncated).to_vec()
    }

    pub fn id_for_name(&self, name: &str) -> Option<u32> {
        self.root
            .find_by_key(&self.search_key(name))
            .map(|info| info.id)
    }

    pub fn name_for_id(&self, id: u32) -> Option<&str> {
        self.root.find_by_id(id).map(|info| info.name.as_str())
    }

    pub fn chrom_size(&self, id: u32) -> Option<u32> {
        self.root.find_by_id(id).map(|info| info.size)
    }

    pub fn info_for_name(&self, name: &str) -> Option<&ChromInfo> {
        self.root.find_by_key(&self.search_key(name))
    }

    /// Every chromosome, in leaf order.
    pub fn chroms(&self) -> Vec<&ChromInfo> {
        let mut out = Vec::new();
        self.root.collect(&mut out);
        out
    }

    pub fn all_names(&self) -> Vec<String> {
        self.chroms().into_iter().map(|c| c.name.clone()).collect()
    }

    /// Ids in `[start_id, end_id]` mapped to their names.
    pub fn id_map(&self, start_id: u32, end_id: u32) -> BTreeMap<u32, String> {
        let mut out = BTreeMap::new();
        if start_id <= end_id {
            self.root.collect_ids(start_id, end_id, &mut out);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.chrom_count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Strip the NUL or space padding from a stored key.
fn normalize_key(key: &[u8]) -> &[u8] {
    let end = key
        .iter()
        .rposition(|&b| b != 0 && b != b' ')
        .map_or(0, |p| p + 1);
    &key[..end]
}

fn read_node<S: SeekableByteSource + ?Sized>(
    source: &mut S,
    offset: u64,
    order: Endianness,
    key_size: usize,
    depth: usize,
) -> Result<ChromTreeNode> {
    if depth > MAX_TREE_DEPTH {
        return Err(BbiError::CorruptIndex(format!(
            "chromosome tree deeper than {} levels",
            MAX_TREE_DEPTH
        )));
    }

    let head = source
        .read_at(offset, NODE_HEADER_SIZE)
        .map_err(|e| BbiError::index_eof(e, "chromosome tree node"))?;
    let mut rdr = PrimitiveReader::new(&head, order);
    let eof = |e| BbiError::index_eof(e, "chromosome tree node");
    let is_leaf = rdr.read_u8().map_err(eof)?;
    let _reserved = rdr.read_u8().map_err(eof)?;
    let count = rdr.read_u16().map_err(eof)? as usize;

    let body_size = (key_size + 8).checked_mul(count).ok_or_else(|| {
        BbiError::CorruptIndex(format!(
            "chromosome tree node at offset {} is too large",
            offset
        ))
    })?;
    let mut body = vec![0u8; body_size];
    source
        .read_fully(&mut body)
        .map_err(|e| BbiError::index_eof(e, "chromosome tree items"))?;
    let mut rdr = PrimitiveReader::new(&body, order);

    match is_leaf {
        1 => {
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                let raw_key = rdr.read_bytes(key_size).map_err(eof)?;
                let key = normalize_key(raw_key).to_vec();
                let name = String::from_utf8(key.clone()).map_err(|_| {
                    BbiError::CorruptIndex(format!(
                        "chromosome name at offset {} is not valid UTF-8",
                        offset
                    ))
                })?;
                let id = rdr.read_u32().map_err(eof)?;
                let size = rdr.read_u32().map_err(eof)?;
                items.push(ChromLeafItem {
                    key,
                    info: ChromInfo { name, id, size },
                });
            }
            Ok(ChromTreeNode::Leaf(items))
        }
        0 => {
            let mut pending = Vec::with_capacity(count);
            for _ in 0..count {
                let key = normalize_key(rdr.read_bytes(key_size).map_err(eof)?).to_vec();
                let child_offset = rdr.read_u64().map_err(eof)?;
                pending.push((key, child_offset));
            }

            let mut children = Vec::with_capacity(count);
            for (lowest_key, child_offset) in pending {
                let node = read_node(source, child_offset, order, key_size, depth + 1)?;
                let highest_key = node
                    .highest_key()
                    .map(|k| k.to_vec())
                    .unwrap_or_else(|| lowest_key.clone());
                let (min_id, max_id) = node.id_range().unwrap_or((u32::MAX, 0));
                children.push(ChromChildItem {
                    lowest_key,
                    highest_key,
                    min_id,
                    max_id,
                    node,
                });
            }
            Ok(ChromTreeNode::Child(children))
        }
        other => Err(BbiError::CorruptIndex(format!(
            "chromosome tree node at offset {} has type byte {}",
            offset, other
        ))),
    }
}
