use clap::{Arg, ArgAction, Command, arg, value_parser};

pub use gtars_bbi::consts::{BBI_CHROMS, BBI_CMD, BBI_INFO, BBI_QUERY, BBI_SUMMARY, BBI_ZOOMS};

fn file_arg() -> Arg {
    Arg::new("file")
        .required(true)
        .help("Path to a bigWig or bigBed file")
}

fn region_args(cmd: Command) -> Command {
    cmd.arg(Arg::new("chrom").required(true).help("Chromosome name"))
        .arg(
            Arg::new("start")
                .required(true)
                .value_parser(value_parser!(u32))
                .help("0-based start of the region"),
        )
        .arg(
            Arg::new("end")
                .required(true)
                .value_parser(value_parser!(u32))
                .help("Exclusive end of the region"),
        )
        .arg(
            arg!(-z --zoom <level> "Read from this zoom level instead of the base data")
                .value_parser(value_parser!(u16)),
        )
}

pub fn create_bbi_cli() -> Command {
    Command::new(BBI_CMD)
        .author("Databio")
        .about("Inspect and query bigWig/bigBed files.")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .global(true)
                .help("Increase logging verbosity (-v info, -vv debug)"),
        )
        .subcommand(
            Command::new(BBI_INFO)
                .about("Print the header, total summary and zoom levels")
                .arg(file_arg())
                .arg(arg!(--autosql "Also print the autoSql schema, if any")),
        )
        .subcommand(
            Command::new(BBI_CHROMS)
                .about("Print chromosome names and sizes")
                .arg(file_arg()),
        )
        .subcommand(
            Command::new(BBI_ZOOMS)
                .about("Print the zoom levels")
                .arg(file_arg()),
        )
        .subcommand(region_args(
            Command::new(BBI_QUERY)
                .about("Print the records in a region")
                .arg(file_arg())
                .arg(arg!(--contained "Only records lying entirely inside the region")),
        ))
        .subcommand(region_args(
            Command::new(BBI_SUMMARY)
                .about("Print summary statistics for a region")
                .arg(file_arg()),
        ))
}
