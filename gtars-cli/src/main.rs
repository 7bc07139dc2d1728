mod bbi;

use anyhow::Result;
use clap::Command;

pub mod consts {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const PKG_NAME: &str = "gtars";
    pub const BIN_NAME: &str = "gtars";
}

fn build_parser() -> Command {
    Command::new(consts::BIN_NAME)
        .bin_name(consts::BIN_NAME)
        .version(consts::VERSION)
        .author("Databio")
        .about("Performance critical tools for working with genomic interval data.")
        .subcommand_required(true)
        .subcommand(bbi::cli::create_bbi_cli())
}

fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

fn main() -> Result<()> {
    let app = build_parser();
    let matches = app.get_matches();

    match matches.subcommand() {
        //
        // BBI
        //
        Some((bbi::cli::BBI_CMD, matches)) => {
            init_logging(matches.get_count("verbose"));
            match matches.subcommand() {
                Some((bbi::cli::BBI_INFO, matches)) => bbi::handlers::run_info(matches)?,
                Some((bbi::cli::BBI_CHROMS, matches)) => bbi::handlers::run_chroms(matches)?,
                Some((bbi::cli::BBI_ZOOMS, matches)) => bbi::handlers::run_zooms(matches)?,
                Some((bbi::cli::BBI_QUERY, matches)) => bbi::handlers::run_query(matches)?,
                Some((bbi::cli::BBI_SUMMARY, matches)) => bbi::handlers::run_summary(matches)?,
                _ => unreachable!("BBI Subcommand not found"),
            }
        }

        _ => unreachable!("Subcommand not found"),
    };

    Ok(())
}
