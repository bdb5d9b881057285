//! The outer thread-pool driver: one rayon task per query, a shared
//! output sink behind a mutex, per-worker caches via `thread_local!`,
//! a stop flag for early termination, and per-worker stats merged by
//! `rayon`'s associative reduce. Mirrors the teacher's own
//! `rayon::ThreadPoolBuilder`-based worker pool.

use std::cell::RefCell;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use noodles::sam::header::Header;
use rayon::prelude::*;

use floxer_core::fmindex::scheme::SearchSchemeCache;
use floxer_core::fmindex::BidirectionalFmIndex;
use floxer_core::pex::{PexTreeBuildStrategy, PexTreeCache};
use floxer_core::pipeline::{self, PipelineConfig};
use floxer_core::stats::Stats;
use floxer_core::{Query, Reference};

use crate::config::RunConfig;
use crate::error::{CliError, CliResult};
use crate::io::sam::{self, SamSink};

thread_local! {
    static PEX_CACHE: RefCell<Option<PexTreeCache>> = const { RefCell::new(None) };
    static SCHEME_CACHE: RefCell<Option<SearchSchemeCache>> = const { RefCell::new(None) };
}

/// Runs the alignment pipeline for every query in `queries` against
/// `reference`, writing SAM records to `sink` as each query completes.
/// Returns the combined run statistics.
///
/// `queries` is consumed eagerly into memory first: rayon's
/// `par_iter` needs an indexable collection, and per §5 the driver's
/// shared state (index, reference, caches) is already sized for the
/// whole run regardless.
pub fn run<W: Write + Send>(
    reference: &Reference,
    queries: Vec<Query>,
    config: &RunConfig,
    header: &Header,
    sink: SamSink<W>,
) -> CliResult<Stats> {
    let pipeline_config = config.to_pipeline_config();
    // Built once and shared read-only across workers, per §5's shared
    // immutable state; each query's own alignment work is the only
    // thing that runs per-thread.
    let index = BidirectionalFmIndex::build(
        &reference.records.iter().map(|r| r.rank_sequence.clone()).collect::<Vec<_>>(),
    );
    let sink = Arc::new(Mutex::new(sink));
    // `stop_flag` halts remaining queries for either reason below;
    // `hard_error_flag` distinguishes the two for the exit code: a
    // timeout is a successful run with partial output, a worker error
    // is not.
    let stop_flag = Arc::new(AtomicBool::new(false));
    let hard_error_flag = Arc::new(AtomicBool::new(false));
    let deadline = config.timeout_seconds.map(|s| (Instant::now(), s));

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.num_threads)
        .build()
        .map_err(|e| CliError::Config(format!("failed to build thread pool: {e}")))?;

    log::info!(
        "aligning {} queries against {} reference record(s) with {} worker thread(s)",
        queries.len(),
        reference.len(),
        config.num_threads
    );

    let stats = pool.install(|| {
        queries
            .into_par_iter()
            .map(|query| {
                if stop_flag.load(Ordering::Relaxed) {
                    return Stats::new();
                }
                if let Some((start, timeout_seconds)) = deadline {
                    if start.elapsed().as_secs() >= timeout_seconds {
                        log::warn!("timeout reached, skipping remaining queries");
                        stop_flag.store(true, Ordering::Relaxed);
                        return Stats::new();
                    }
                }

                match align_one_query(&query, reference, &index, &pipeline_config, header, &sink) {
                    Ok(stats) => stats,
                    Err(e) => {
                        log::error!("query {} failed: {e}", query.id);
                        stop_flag.store(true, Ordering::Relaxed);
                        hard_error_flag.store(true, Ordering::Relaxed);
                        Stats::new()
                    }
                }
            })
            .reduce(Stats::new, |mut a, b| {
                a.combine_with(&b);
                a
            })
    });

    if hard_error_flag.load(Ordering::Relaxed) {
        return Err(CliError::Config("a worker reported a hard error during alignment; output is incomplete".into()));
    }

    Ok(stats)
}

fn align_one_query<W: Write + Send>(
    query: &Query,
    reference: &Reference,
    index: &BidirectionalFmIndex,
    pipeline_config: &PipelineConfig,
    header: &Header,
    sink: &Arc<Mutex<SamSink<W>>>,
) -> CliResult<Stats> {
    let mut stats = Stats::new();

    let alignments = PEX_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();
        let cache = cache.get_or_insert_with(|| {
            PexTreeCache::new(pipeline_config.pex_leaf_max_num_errors, pipeline_config.pex_build_strategy)
        });

        SCHEME_CACHE.with(|scheme_cache| {
            let mut scheme_cache = scheme_cache.borrow_mut();
            let scheme_cache = scheme_cache.get_or_insert_with(SearchSchemeCache::new);

            pipeline::align_query(query, reference, index, cache, scheme_cache, pipeline_config, &mut stats)
        })
    })?;

    let mut sink = sink.lock().expect("output sink mutex poisoned by a panicked worker");
    match alignments {
        Some(alignments) => sam::write_query_alignments(&mut *sink, header, query, &alignments, reference)?,
        None => {
            let empty = floxer_core::collector::QueryAlignments::new(reference.len());
            sam::write_query_alignments(&mut *sink, header, query, &empty, reference)?;
        }
    }

    Ok(stats)
}

/// Builds a fresh `PexTreeCache`/`SearchSchemeCache` pair suitable for
/// sequential (non-rayon) use, e.g. single-threaded runs invoked
/// directly by tests.
pub fn build_strategy_label(strategy: PexTreeBuildStrategy) -> &'static str {
    match strategy {
        PexTreeBuildStrategy::Recursive => "recursive",
        PexTreeBuildStrategy::BottomUp => "bottom-up",
    }
}
