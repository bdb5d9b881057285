//! `floxer`: exact long-read DNA aligner. Parses arguments, resolves
//! configuration (CLI flags over an optional TOML file), sets up
//! logging, reads the reference and queries, loads or builds the
//! FM-index, runs the `rayon`-backed worker pool, and writes SAM.

mod config;
mod driver;
mod error;
mod io;

use std::io::BufWriter;
use std::path::PathBuf;

use clap::Parser;

use config::{BuildStrategyArg, FileConfig, RunConfig};
use error::{CliError, CliResult};

#[derive(Parser, Debug, Clone)]
#[command(name = "floxer")]
#[command(about = "Exact long-read DNA aligner based on PEX seeding and FM-index search")]
#[command(version)]
pub struct Cli {
    /// Reference FASTA file (plain or gzip)
    #[arg(long)]
    pub reference: PathBuf,

    /// Query FASTQ file (plain or gzip)
    #[arg(long)]
    pub queries: PathBuf,

    /// SAM output path; defaults to stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// On-disk FM-index path: loaded if it exists, else built and
    /// (best-effort) written there
    #[arg(long)]
    pub index: Option<PathBuf>,

    /// Optional TOML configuration file; CLI flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Absolute per-query error budget `e` (mutually exclusive with
    /// --query-error-probability)
    #[arg(short = 'e', long)]
    pub query_num_errors: Option<usize>,

    /// Per-base error rate `p`; `e := ceil(|q|*p)` per query
    #[arg(short = 'p', long)]
    pub query_error_probability: Option<f64>,

    /// PEX leaf error cap `s`
    #[arg(short = 's', long)]
    pub seed_max_errors: Option<usize>,

    /// Per-seed raw-anchor cap that triggers seed exclusion
    #[arg(long)]
    pub max_raw_anchors: Option<usize>,

    /// Fraction added to each side of a verification window
    #[arg(long)]
    pub extra_verification_ratio: Option<f64>,

    /// PEX tree construction strategy
    #[arg(long, value_enum)]
    pub build_strategy: Option<BuildStrategyArg>,

    /// Skip re-verifying already-covered reference intervals
    #[arg(long)]
    pub use_interval_optimization: Option<bool>,

    /// Worker thread count; defaults to the number of logical cores
    #[arg(short = 'j', long)]
    pub num_threads: Option<usize>,

    /// Wall-clock deadline for the alignment phase, in seconds
    #[arg(long)]
    pub timeout_seconds: Option<u64>,

    /// Increase log verbosity (info -> debug)
    #[arg(short, long)]
    pub verbose: bool,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn run(cli: Cli) -> CliResult<()> {
    let file_config = match &cli.config {
        Some(path) => FileConfig::load_from_file(path)?,
        None => FileConfig::default(),
    };
    let run_config = RunConfig::resolve(&cli, file_config)?;

    log::info!(
        "build strategy: {}, seed_max_errors: {}, num_threads: {}",
        driver::build_strategy_label(run_config.build_strategy),
        run_config.seed_max_errors,
        run_config.num_threads,
    );

    log::info!("reading reference from {}", run_config.reference_path.display());
    let reference = io::reference::read_reference(&run_config.reference_path)?;
    log::info!("loaded {} reference record(s)", reference.len());

    log::info!("reading queries from {}", run_config.queries_path.display());
    let query_reader = io::queries::QueryReader::open(&run_config.queries_path)?;
    let mut queries = Vec::new();
    for query in query_reader {
        queries.push(query?);
    }
    log::info!("loaded {} quer{}", queries.len(), if queries.len() == 1 { "y" } else { "ies" });

    let header = io::sam::build_header(&reference);
    let is_bam = run_config
        .output_path
        .as_ref()
        .and_then(|path| path.extension())
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("bam"));

    let stats = match &run_config.output_path {
        Some(path) => {
            let file = std::fs::File::create(path).map_err(|source| CliError::Io {
                source,
                path: Some(path.clone()),
            })?;
            let mut sink = if is_bam {
                io::sam::SamSink::bam(BufWriter::new(file))
            } else {
                io::sam::SamSink::sam(BufWriter::new(file))
            };
            sink.write_header(&header)?;
            driver::run(&reference, queries, &run_config, &header, sink)?
        }
        None => {
            let mut sink = io::sam::SamSink::sam(BufWriter::new(std::io::stdout()));
            sink.write_header(&header)?;
            driver::run(&reference, queries, &run_config, &header, sink)?
        }
    };

    for line in stats.format_statistics() {
        log::info!("{line}");
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    if let Err(e) = run(cli) {
        log::error!("{e}");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
