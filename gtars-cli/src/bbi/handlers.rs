use std::io::{BufWriter, Write};

use anyhow::{Context, Result};
use clap::ArgMatches;
use log::info;

use gtars_bbi::{BbiReader, Record};

fn open(matches: &ArgMatches) -> Result<BbiReader<std::io::BufReader<std::fs::File>>> {
    let path = matches
        .get_one::<String>("file")
        .expect("A path to a bigWig/bigBed file is required.");
    BbiReader::open_path(path).with_context(|| format!("Failed to open {}", path))
}

struct Region<'a> {
    chrom: &'a str,
    start: u32,
    end: u32,
    zoom: Option<u16>,
}

fn region(matches: &ArgMatches) -> Region<'_> {
    Region {
        chrom: matches
            .get_one::<String>("chrom")
            .expect("A chromosome is required."),
        start: *matches.get_one::<u32>("start").expect("A start is required."),
        end: *matches.get_one::<u32>("end").expect("An end is required."),
        zoom: matches.get_one::<u16>("zoom").copied(),
    }
}

pub fn run_info(matches: &ArgMatches) -> Result<()> {
    let mut reader = open(matches)?;
    let header = reader.header().clone();
    let mut out = BufWriter::new(std::io::stdout().lock());

    writeln!(out, "type\t{}", header.kind)?;
    writeln!(out, "version\t{}", header.version)?;
    writeln!(out, "byteOrder\t{:?}", header.endianness)?;
    writeln!(out, "compressed\t{}", header.is_compressed())?;
    writeln!(out, "chromCount\t{}", reader.chromosome_names().len())?;
    writeln!(out, "dataCount\t{}", reader.file().data_count())?;
    if !header.is_bigwig() {
        writeln!(out, "fieldCount\t{}", header.field_count)?;
        writeln!(out, "definedFieldCount\t{}", header.defined_field_count)?;
    }
    writeln!(out, "zoomLevels\t{}", reader.zooms().level_count())?;
    for level in reader.zooms().levels() {
        writeln!(out, "\t{}\t{}", level.reduction_factor(), level.record_count)?;
    }

    if let Some(summary) = reader.total_summary() {
        writeln!(out, "basesCovered\t{}", summary.bases_covered)?;
        writeln!(out, "mean\t{}", summary.mean())?;
        writeln!(out, "min\t{}", summary.min_val)?;
        writeln!(out, "max\t{}", summary.max_val)?;
        writeln!(out, "std\t{}", summary.std_dev())?;
    }

    if matches.get_flag("autosql") {
        match reader.autosql()? {
            Some(text) => writeln!(out, "{}", text.trim_end())?,
            None => writeln!(out, "autoSql\tnone")?,
        }
    }

    out.flush()?;
    Ok(())
}

pub fn run_chroms(matches: &ArgMatches) -> Result<()> {
    let reader = open(matches)?;
    let mut out = BufWriter::new(std::io::stdout().lock());
    for chrom in reader.file().chroms() {
        writeln!(out, "{}\t{}", chrom.name, chrom.size)?;
    }
    out.flush()?;
    Ok(())
}

pub fn run_zooms(matches: &ArgMatches) -> Result<()> {
    let reader = open(matches)?;
    let mut out = BufWriter::new(std::io::stdout().lock());
    for (i, level) in reader.zooms().levels().iter().enumerate() {
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}",
            i,
            level.reduction_factor(),
            level.record_count,
            level.header.data_offset,
            level.header.index_offset
        )?;
    }
    out.flush()?;
    Ok(())
}

pub fn run_query(matches: &ArgMatches) -> Result<()> {
    let mut reader = open(matches)?;
    let region = region(matches);
    let contained = matches.get_flag("contained");

    let file = reader.file().clone();
    let mut out = BufWriter::new(std::io::stdout().lock());
    let mut count = 0usize;
    for record in reader.query(region.chrom, region.start, region.end, region.zoom, contained)? {
        let record: Record = record?;
        let chrom = file.chrom_name(record.chrom_id()).unwrap_or(region.chrom);
        writeln!(out, "{}", record.to_line(chrom))?;
        count += 1;
    }
    out.flush()?;

    info!(
        "{} records in {}:{}-{}",
        count, region.chrom, region.start, region.end
    );
    Ok(())
}

pub fn run_summary(matches: &ArgMatches) -> Result<()> {
    let mut reader = open(matches)?;
    let region = region(matches);
    let summary = reader.summarize(region.chrom, region.start, region.end, region.zoom)?;

    let mut out = BufWriter::new(std::io::stdout().lock());
    match summary.mean() {
        Some(mean) => writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            region.chrom,
            region.start,
            region.end,
            summary.valid_bases,
            summary.min_val,
            summary.max_val,
            mean
        )?,
        None => writeln!(
            out,
            "{}\t{}\t{}\t0\tNA\tNA\tNA",
            region.chrom, region.start, region.end
        )?,
    }
    out.flush()?;
    Ok(())
}
