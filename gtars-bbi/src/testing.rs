//! Synthetic bigWig/bigBed images for tests.

use std::io::Write;

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use flate2::Compression;
use flate2::write::ZlibEncoder;

use crate::consts::{CHROM_TREE_MAGIC, CIR_TREE_MAGIC, HEADER_SIZE, ZOOM_HEADER_SIZE};
use crate::header::BbiKind;
use crate::primitives::Endianness;
use crate::records::{BedRecord, WigItemType, ZoomRecord};
use crate::region::{ChromosomeRegion, bounding_region};
use crate::summary::TotalSummary;

macro_rules! write_fixed {
    ($name:ident, $method:ident, $ty:ty) => {
        pub fn $name(&mut self, v: $ty) {
            match self.order {
                Endianness::Little => self.buf.$method::<LittleEndian>(v).unwrap(),
                Endianness::Big => self.buf.$method::<BigEndian>(v).unwrap(),
            }
        }
    };
}

pub(crate) struct ByteWriter {
    buf: Vec<u8>,
    order: Endianness,
}

impl ByteWriter {
    pub fn new(order: Endianness) -> Self {
        ByteWriter {
            buf: Vec::new(),
            order,
        }
    }

    pub fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    write_fixed!(u16, write_u16, u16);
    write_fixed!(u32, write_u32, u32);
    write_fixed!(i32, write_i32, i32);
    write_fixed!(u64, write_u64, u64);
    write_fixed!(f32, write_f32, f32);
    write_fixed!(f64, write_f64, f64);

    pub fn bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn len(&self) -> u64 {
        self.buf.len() as u64
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

pub(crate) fn bed_block(order: Endianness, records: &[BedRecord]) -> Vec<u8> {
    let mut w = ByteWriter::new(order);
    for r in records {
        w.u32(r.chrom_id);
        w.u32(r.start);
        w.u32(r.end);
        w.bytes(r.rest.as_bytes());
        w.u8(0);
    }
    w.into_inner()
}

/// One wig section; `items` are (start, end, value) and are encoded per `kind`.
#[derive(Debug, Clone)]
pub(crate) struct WigSection {
    pub chrom_id: u32,
    pub start: u32,
    pub end: u32,
    pub step: u32,
    pub span: u32,
    pub kind: WigItemType,
    pub items: Vec<(u32, u32, f32)>,
}

pub(crate) fn wig_block(order: Endianness, sections: &[WigSection]) -> Vec<u8> {
    let mut w = ByteWriter::new(order);
    for s in sections {
        w.u32(s.chrom_id);
        w.u32(s.start);
        w.u32(s.end);
        w.u32(s.step);
        w.u32(s.span);
        w.u8(s.kind.code());
        w.u8(0);
        w.u16(s.items.len() as u16);
        for &(start, end, value) in &s.items {
            match s.kind {
                WigItemType::BedGraph => {
                    w.u32(start);
                    w.u32(end);
                }
                WigItemType::VariableStep => w.u32(start),
                WigItemType::FixedStep => {}
            }
            w.f32(value);
        }
    }
    w.into_inner()
}

pub(crate) fn zoom_block(order: Endianness, records: &[ZoomRecord]) -> Vec<u8> {
    let mut w = ByteWriter::new(order);
    for r in records {
        w.u32(r.chrom_id);
        w.u32(r.start);
        w.u32(r.end);
        w.u32(r.valid_count);
        w.f32(r.min_val);
        w.f32(r.max_val);
        w.f32(r.sum);
        w.f32(r.sum_squares);
    }
    w.into_inner()
}

pub(crate) fn zlib(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).unwrap();
    encoder.finish().unwrap()
}

/// An uncompressed data block and the region it covers.
#[derive(Debug, Clone)]
pub(crate) struct FixtureBlock {
    pub region: ChromosomeRegion,
    pub raw: Vec<u8>,
}

#[derive(Debug, Clone)]
pub(crate) struct FixtureZoom {
    pub reduction: u32,
    pub blocks: Vec<FixtureBlock>,
}

///
/// Builder for a complete BBI image. Chromosome ids are assigned in `chroms` order.
///
#[derive(Debug, Clone)]
pub(crate) struct Fixture {
    pub order: Endianness,
    pub kind: BbiKind,
    pub version: u16,
    pub chroms: Vec<(String, u32)>,
    pub key_size: Option<usize>,
    pub chrom_block_size: usize,
    pub rtree_block_size: usize,
    pub compress: bool,
    pub blocks: Vec<FixtureBlock>,
    pub data_count: u64,
    pub zooms: Vec<FixtureZoom>,
    pub autosql: Option<String>,
    pub field_count: u16,
    pub summary: Option<TotalSummary>,
}

impl Fixture {
    pub fn new(kind: BbiKind, order: Endianness) -> Self {
        Fixture {
            order,
            kind,
            version: 4,
            chroms: Vec::new(),
            key_size: None,
            chrom_block_size: 256,
            rtree_block_size: 256,
            compress: false,
            blocks: Vec::new(),
            data_count: 0,
            zooms: Vec::new(),
            autosql: None,
            field_count: if kind == BbiKind::BigBed { 3 } else { 0 },
            summary: None,
        }
    }

    pub fn build(&self) -> Vec<u8> {
        let mut w = ByteWriter::new(self.order);
        w.bytes(&[0u8; HEADER_SIZE]);
        w.bytes(&vec![0u8; ZOOM_HEADER_SIZE * self.zooms.len()]);

        let auto_sql_offset = match &self.autosql {
            Some(text) => {
                let offset = w.len();
                w.bytes(text.as_bytes());
                w.u8(0);
                offset
            }
            None => 0,
        };

        let total_summary_offset = match &self.summary {
            Some(s) => {
                let offset = w.len();
                w.u64(s.bases_covered);
                w.f64(s.min_val);
                w.f64(s.max_val);
                w.f64(s.sum);
                w.f64(s.sum_squares);
                offset
            }
            None => 0,
        };

        let chrom_tree_offset = w.len();
        self.write_chrom_tree(&mut w);

        let full_data_offset = w.len();
        w.u64(self.data_count);
        let base_entries = self.write_blocks(&mut w, &self.blocks);
        let full_index_offset = w.len();
        write_rtree(&mut w, &base_entries, self.rtree_block_size, full_index_offset);

        let mut zoom_headers = Vec::new();
        for zoom in &self.zooms {
            let data_offset = w.len();
            w.u32(zoom.blocks.iter().map(|b| b.raw.len() as u32 / 32).sum());
            let entries = self.write_blocks(&mut w, &zoom.blocks);
            let index_offset = w.len();
            write_rtree(&mut w, &entries, self.rtree_block_size, index_offset);
            zoom_headers.push((zoom.reduction, data_offset, index_offset));
        }

        let uncompress_buf_size = if self.compress {
            self.blocks
                .iter()
                .chain(self.zooms.iter().flat_map(|z| z.blocks.iter()))
                .map(|b| b.raw.len())
                .max()
                .unwrap_or(1)
                .max(1) as u32
        } else {
            0
        };

        let mut head = ByteWriter::new(self.order);
        head.u32(self.kind.magic());
        head.u16(self.version);
        head.u16(self.zooms.len() as u16);
        head.u64(chrom_tree_offset);
        head.u64(full_data_offset);
        head.u64(full_index_offset);
        head.u16(self.field_count);
        head.u16(self.field_count.min(3));
        head.u64(auto_sql_offset);
        head.u64(total_summary_offset);
        head.u32(uncompress_buf_size);
        head.u64(0);
        for (reduction, data_offset, index_offset) in zoom_headers {
            head.u32(reduction);
            head.u32(0);
            head.u64(data_offset);
            head.u64(index_offset);
        }

        let head = head.into_inner();
        let mut file = w.into_inner();
        file[..head.len()].copy_from_slice(&head);
        file
    }

    fn key_size(&self) -> usize {
        self.key_size.unwrap_or_else(|| {
            self.chroms
                .iter()
                .map(|(name, _)| name.len())
                .max()
                .unwrap_or(1)
        })
    }

    fn key(&self, name: &str) -> Vec<u8> {
        let key_size = self.key_size();
        let mut key: Vec<u8> = name.bytes().take(key_size).collect();
        key.resize(key_size, 0);
        key
    }

    fn write_chrom_tree(&self, w: &mut ByteWriter) {
        let key_size = self.key_size();
        w.u32(CHROM_TREE_MAGIC);
        w.u32(self.chrom_block_size as u32);
        w.u32(key_size as u32);
        w.u32(8);
        w.u64(self.chroms.len() as u64);
        w.u64(0);

        let ids: Vec<(usize, &(String, u32))> = self.chroms.iter().enumerate().collect();
        let leaves: Vec<&[(usize, &(String, u32))]> =
            ids.chunks(self.chrom_block_size.max(1)).collect();
        let item_size = key_size as u64 + 8;

        if leaves.len() > 1 {
            let root_size = 4 + leaves.len() as u64 * item_size;
            let mut offset = w.len() + root_size;
            w.u8(0);
            w.u8(0);
            w.u16(leaves.len() as u16);
            for leaf in &leaves {
                w.bytes(&self.key(&leaf[0].1.0));
                w.u64(offset);
                offset += 4 + leaf.len() as u64 * item_size;
            }
        }

        for leaf in leaves {
            w.u8(1);
            w.u8(0);
            w.u16(leaf.len() as u16);
            for (id, (name, size)) in leaf {
                w.bytes(&self.key(name));
                w.u32(*id as u32);
                w.u32(*size);
            }
        }
    }

    fn write_blocks(
        &self,
        w: &mut ByteWriter,
        blocks: &[FixtureBlock],
    ) -> Vec<(ChromosomeRegion, u64, u64)> {
        blocks
            .iter()
            .map(|block| {
                let bytes = if self.compress {
                    zlib(&block.raw)
                } else {
                    block.raw.clone()
                };
                let offset = w.len();
                w.bytes(&bytes);
                (block.region, offset, bytes.len() as u64)
            })
            .collect()
    }
}

/// Write an R+ tree: one level of leaves, plus a root when there is more than one leaf.
fn write_rtree(
    w: &mut ByteWriter,
    entries: &[(ChromosomeRegion, u64, u64)],
    block_size: usize,
    tree_offset: u64,
) {
    let bounds = bounding_region(entries.iter().map(|(r, _, _)| r))
        .unwrap_or(ChromosomeRegion::new(0, 0, 0, 0));

    w.u32(CIR_TREE_MAGIC);
    w.u32(block_size as u32);
    w.u64(entries.len() as u64);
    w.u32(bounds.start_chrom);
    w.u32(bounds.start_base);
    w.u32(bounds.end_chrom);
    w.u32(bounds.end_base);
    w.u64(tree_offset);
    w.u32(1);
    w.u32(0);

    let leaves: Vec<&[(ChromosomeRegion, u64, u64)]> = if entries.is_empty() {
        vec![&entries[..]]
    } else {
        entries.chunks(block_size.max(1)).collect()
    };

    if leaves.len() > 1 {
        let root_size = 4 + leaves.len() as u64 * 24;
        let mut offset = w.len() + root_size;
        w.u8(0);
        w.u8(0);
        w.u16(leaves.len() as u16);
        for leaf in &leaves {
            let b = bounding_region(leaf.iter().map(|(r, _, _)| r)).unwrap();
            w.u32(b.start_chrom);
            w.u32(b.start_base);
            w.u32(b.end_chrom);
            w.u32(b.end_base);
            w.u64(offset);
            offset += 4 + leaf.len() as u64 * 32;
        }
    }

    for leaf in leaves {
        w.u8(1);
        w.u8(0);
        w.u16(leaf.len() as u16);
        for (region, offset, size) in leaf {
            w.u32(region.start_chrom);
            w.u32(region.start_base);
            w.u32(region.end_chrom);
            w.u32(region.end_base);
            w.u64(*offset);
            w.u64(*size);
        }
    }
}

fn bed(chrom_id: u32, start: u32, end: u32, rest: &str) -> BedRecord {
    BedRecord {
        chrom_id,
        start,
        end,
        rest: rest.to_string(),
    }
}

pub(crate) fn block_of_beds(order: Endianness, records: &[BedRecord]) -> FixtureBlock {
    let region = bounding_region(
        records
            .iter()
            .map(|r| ChromosomeRegion::on_chrom(r.chrom_id, r.start, r.end))
            .collect::<Vec<_>>()
            .iter(),
    )
    .unwrap();
    FixtureBlock {
        region,
        raw: bed_block(order, records),
    }
}

/// Records of the sample bigBed, in file order.
pub(crate) fn sample_beds() -> Vec<Vec<BedRecord>> {
    vec![
        vec![
            bed(0, 0, 20, "a\t100\t+"),
            bed(0, 30, 60, "b\t200\t-"),
            bed(0, 70, 99, "c\t300\t+"),
        ],
        vec![
            bed(0, 100, 140, "d\t400\t+"),
            bed(0, 120, 160, "e\t500\t-"),
            bed(0, 150, 199, "f\t600\t+"),
        ],
        vec![bed(1, 0, 25, "g\t700\t+"), bed(1, 20, 50, "h\t800\t-")],
    ]
}

pub(crate) fn sample_zoom_records() -> Vec<Vec<ZoomRecord>> {
    let z = |chrom_id, start, end, valid_count, max_val: f32, sum: f32| ZoomRecord {
        chrom_id,
        start,
        end,
        valid_count,
        min_val: 1.0,
        max_val,
        sum,
        sum_squares: sum * max_val,
    };
    vec![
        vec![z(0, 0, 100, 80, 3.0, 160.0), z(0, 100, 200, 100, 2.0, 150.0)],
        vec![z(1, 0, 100, 50, 1.0, 50.0)],
    ]
}

fn zoom_blocks(order: Endianness, groups: &[Vec<ZoomRecord>]) -> Vec<FixtureBlock> {
    groups
        .iter()
        .map(|records| FixtureBlock {
            region: bounding_region(
                records
                    .iter()
                    .map(|r| ChromosomeRegion::on_chrom(r.chrom_id, r.start, r.end))
                    .collect::<Vec<_>>()
                    .iter(),
            )
            .unwrap(),
            raw: zoom_block(order, records),
        })
        .collect()
}

///
/// chr1 (id 0, 1000bp) and chr2 (id 1, 500bp) with three base blocks:
/// (chr1 0-99), (chr1 100-199), (chr2 0-50), and one zoom level.
///
pub(crate) fn sample_bigbed(order: Endianness, compress: bool) -> Fixture {
    let mut fixture = Fixture::new(BbiKind::BigBed, order);
    fixture.chroms = vec![("chr1".to_string(), 1000), ("chr2".to_string(), 500)];
    fixture.compress = compress;
    fixture.rtree_block_size = 2;
    fixture.field_count = 6;
    fixture.blocks = sample_beds()
        .iter()
        .map(|records| block_of_beds(order, records))
        .collect();
    fixture.data_count = 8;
    fixture.zooms = vec![FixtureZoom {
        reduction: 100,
        blocks: zoom_blocks(order, &sample_zoom_records()),
    }];
    fixture.autosql = Some("table bed6\n\"sample\"\n(\nstring chrom;\n)\n".to_string());
    fixture.summary = Some(TotalSummary {
        bases_covered: 250,
        min_val: 1.0,
        max_val: 2.0,
        sum: 300.0,
        sum_squares: 400.0,
    });
    fixture
}

pub(crate) fn sample_wig_sections() -> Vec<Vec<WigSection>> {
    vec![
        vec![
            WigSection {
                chrom_id: 0,
                start: 0,
                end: 50,
                step: 10,
                span: 10,
                kind: WigItemType::FixedStep,
                items: vec![(0, 0, 1.0), (0, 0, 2.0), (0, 0, 3.0), (0, 0, 4.0), (0, 0, 5.0)],
            },
            WigSection {
                chrom_id: 0,
                start: 100,
                end: 180,
                step: 0,
                span: 5,
                kind: WigItemType::VariableStep,
                items: vec![(100, 0, 0.5), (150, 0, 1.5), (175, 0, 2.5)],
            },
        ],
        vec![WigSection {
            chrom_id: 1,
            start: 10,
            end: 60,
            step: 0,
            span: 0,
            kind: WigItemType::BedGraph,
            items: vec![(10, 30, -1.0), (30, 60, 8.0)],
        }],
    ]
}

/// chr1 (id 0) and chr2 (id 1) with fixedStep, variableStep and bedGraph sections.
pub(crate) fn sample_bigwig(order: Endianness, compress: bool) -> Fixture {
    let mut fixture = Fixture::new(BbiKind::BigWig, order);
    fixture.chroms = vec![("chr1".to_string(), 1000), ("chr2".to_string(), 500)];
    fixture.compress = compress;
    fixture.blocks = sample_wig_sections()
        .iter()
        .map(|sections| FixtureBlock {
            region: bounding_region(
                sections
                    .iter()
                    .map(|s| ChromosomeRegion::on_chrom(s.chrom_id, s.start, s.end))
                    .collect::<Vec<_>>()
                    .iter(),
            )
            .unwrap(),
            raw: wig_block(order, sections),
        })
        .collect();
    fixture.data_count = 3;
    fixture.zooms = vec![
        FixtureZoom {
            reduction: 50,
            blocks: zoom_blocks(order, &sample_zoom_records()),
        },
        FixtureZoom {
            reduction: 200,
            blocks: zoom_blocks(order, &sample_zoom_records()[..1]),
        },
    ];
    fixture.summary = Some(TotalSummary {
        bases_covered: 115,
        min_val: -1.0,
        max_val: 8.0,
        sum: 300.0,
        sum_squares: 2000.0,
    });
    fixture
}
