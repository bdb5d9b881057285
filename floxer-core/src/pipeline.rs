//! Ties the whole core together for one query: generate PEX seeds,
//! search them against the FM-index, deduplicate the resulting
//! anchors, hierarchically verify each one, and collect the
//! alignments — once for the forward orientation and once for the
//! reverse complement.

use crate::alignment::AlignmentError;
use crate::anchor::{erase_useless_anchors, Anchor};
use crate::collector::QueryAlignments;
use crate::fmindex::{scheme::SearchSchemeCache, search::SearchConfig, BidirectionalFmIndex};
use crate::intervals::{IntervalOptimization, VerifiedIntervals};
use crate::math::epsilon_aware_ceil;
use crate::pex::{PexTree, PexTreeBuildStrategy, PexTreeCache};
use crate::seeding;
use crate::stats::Stats;
use crate::types::{Orientation, Query, Reference};
use crate::verify::{self, VerificationConfig};

/// A query's error budget, either an absolute count or a per-base
/// rate — mutually exclusive at the configuration boundary (see
/// `floxer-cli::config`), carried here as a resolved enum so the core
/// never has to know which one the user picked.
#[derive(Debug, Clone, Copy)]
pub enum QueryErrorBudget {
    Absolute(usize),
    Rate(f64),
}

impl QueryErrorBudget {
    /// `e := ceil(|q|*p)` for a rate budget, per spec; an absolute
    /// budget is the same for every query regardless of length. Uses
    /// [`epsilon_aware_ceil`] so that e.g. a 500bp query at a 1% error
    /// rate yields `e = 5`, not 6 from `500.0 * 0.01`'s floating-point
    /// representation error.
    pub fn num_errors(&self, query_len: usize) -> usize {
        match *self {
            QueryErrorBudget::Absolute(e) => e,
            QueryErrorBudget::Rate(p) => epsilon_aware_ceil(query_len as f64 * p),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub query_error_budget: QueryErrorBudget,
    pub pex_leaf_max_num_errors: usize,
    pub pex_build_strategy: PexTreeBuildStrategy,
    pub search: SearchConfig,
    pub verification: VerificationConfig,
    pub use_interval_optimization: bool,
    pub interval_overlap_rate_that_counts_as_contained: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            query_error_budget: QueryErrorBudget::Rate(0.1),
            pex_leaf_max_num_errors: 0,
            pex_build_strategy: PexTreeBuildStrategy::BottomUp,
            search: SearchConfig::default(),
            verification: VerificationConfig::default(),
            use_interval_optimization: true,
            interval_overlap_rate_that_counts_as_contained: 1.0,
        }
    }
}

/// Aligns one query against every reference record, in both
/// orientations, accumulating run statistics along the way.
///
/// Returns `None` (and bumps the excluded-query counter) if the query
/// is inadmissible: too short for its own error budget, or with an
/// error budget below the configured seed error cap.
pub fn align_query(
    query: &Query,
    references: &Reference,
    index: &BidirectionalFmIndex,
    pex_tree_cache: &mut PexTreeCache,
    search_scheme_cache: &mut SearchSchemeCache,
    config: &PipelineConfig,
    stats: &mut Stats,
) -> Result<Option<QueryAlignments>, AlignmentError> {
    let num_errors = config.query_error_budget.num_errors(query.len());
    stats.query_lengths.add_value(query.len());

    if !query.is_admissible(num_errors, config.pex_leaf_max_num_errors) {
        stats.increment_num_completely_excluded_queries();
        return Ok(None);
    }

    let tree = pex_tree_cache.get(query.len(), num_errors);

    let mut alignments = QueryAlignments::new(references.len());
    let mut total_anchors = 0usize;
    let mut total_excluded_raw_anchors = 0usize;

    align_query_in_given_orientation(
        tree,
        index,
        query.sequence_for(Orientation::Forward),
        references,
        Orientation::Forward,
        search_scheme_cache,
        config,
        &mut alignments,
        stats,
        &mut total_anchors,
        &mut total_excluded_raw_anchors,
    )?;

    align_query_in_given_orientation(
        tree,
        index,
        query.sequence_for(Orientation::ReverseComplement),
        references,
        Orientation::ReverseComplement,
        search_scheme_cache,
        config,
        &mut alignments,
        stats,
        &mut total_anchors,
        &mut total_excluded_raw_anchors,
    )?;

    stats.anchors_per_query.add_value(total_anchors);
    stats.excluded_raw_anchors_per_query.add_value(total_excluded_raw_anchors);

    stats.alignments_per_query.add_value(alignments.size());
    for reference in &references.records {
        for alignment in alignments.to_reference(reference.internal_id) {
            stats.alignments_edit_distance.add_value(alignment.num_errors);
        }
    }

    Ok(Some(alignments))
}

/// The smallest error count `t` such that the cumulative raw-anchor
/// count over errors `<= t` meets or exceeds `max_raw_anchors`, or
/// `max_num_errors + 1` (keep everything) if the cap is never reached.
/// `t = 0` means the seed is fully excluded.
fn anchor_capping_cutoff(
    buckets: &std::collections::HashMap<usize, Vec<crate::fmindex::FmCursor>>,
    index: &BidirectionalFmIndex,
    max_num_errors: usize,
    max_raw_anchors: usize,
) -> (usize, usize) {
    let mut cumulative = 0usize;
    let mut cutoff = max_num_errors + 1;
    for t in 0..=max_num_errors {
        let raw_count_t: usize = buckets
            .get(&t)
            .map(|cursors| cursors.iter().map(|c| index.count(c)).sum())
            .unwrap_or(0);
        cumulative += raw_count_t;
        if cumulative >= max_raw_anchors {
            cutoff = t;
            break;
        }
    }
    // `cumulative` only covers errors <= cutoff at this point; the full
    // raw total (needed to report what got excluded) keeps summing the
    // remaining buckets.
    let mut full_total = cumulative;
    for t in (cutoff + 1)..=max_num_errors {
        full_total += buckets
            .get(&t)
            .map(|cursors| cursors.iter().map(|c| index.count(c)).sum::<usize>())
            .unwrap_or(0);
    }
    (cutoff, full_total)
}

#[allow(clippy::too_many_arguments)]
fn align_query_in_given_orientation(
    tree: &PexTree,
    index: &BidirectionalFmIndex,
    query_rank_sequence: &[u8],
    references: &Reference,
    orientation: Orientation,
    search_scheme_cache: &mut SearchSchemeCache,
    config: &PipelineConfig,
    alignments: &mut QueryAlignments,
    stats: &mut Stats,
    total_anchors: &mut usize,
    total_excluded_raw_anchors: &mut usize,
) -> Result<(), AlignmentError> {
    let seeds = seeding::generate_seeds(tree, query_rank_sequence);
    for seed in &seeds {
        stats.seed_lengths.add_value(seed.sequence.len());
    }

    let mut already_verified_per_reference: Vec<VerifiedIntervals> = (0..references.len())
        .map(|_| {
            VerifiedIntervals::new(
                if config.use_interval_optimization {
                    IntervalOptimization::On
                } else {
                    IntervalOptimization::Off
                },
                config.interval_overlap_rate_that_counts_as_contained,
            )
        })
        .collect();

    for (seed_id, seed) in seeds.iter().enumerate() {
        let scheme = search_scheme_cache.get(seed.sequence.len(), seed.num_errors);
        let search_config = SearchConfig {
            max_num_errors: seed.num_errors,
            ..config.search
        };
        let buckets = crate::fmindex::search::search_seed(index, seed.sequence, scheme, &search_config);

        let (cutoff, full_raw_total) =
            anchor_capping_cutoff(&buckets, index, search_config.max_num_errors, config.search.max_num_raw_anchors);

        if full_raw_total == 0 {
            continue;
        }

        if cutoff == 0 {
            // fully excluded: no cursor survives the cap.
            stats.raw_anchors_per_excluded_seed.add_value(full_raw_total);
            *total_excluded_raw_anchors += full_raw_total;
            continue;
        }

        let kept_raw_total: usize = (0..cutoff)
            .map(|t| {
                buckets
                    .get(&t)
                    .map(|cursors| cursors.iter().map(|c| index.count(c)).sum::<usize>())
                    .unwrap_or(0)
            })
            .sum();
        let excluded_raw_total = full_raw_total - kept_raw_total;
        if excluded_raw_total > 0 {
            *total_excluded_raw_anchors += excluded_raw_total;
        }

        let mut anchors_by_reference: Vec<Vec<Anchor>> = vec![Vec::new(); references.len()];
        for (&num_errors, cursors) in &buckets {
            if num_errors >= cutoff {
                continue;
            }
            for cursor in cursors {
                for (reference_id, position) in index.locate(cursor) {
                    anchors_by_reference[reference_id].push(Anchor {
                        reference_position: position,
                        num_errors,
                    });
                }
            }
        }

        let mut num_useful_anchors = 0;
        for reference_anchors in anchors_by_reference.iter_mut() {
            erase_useless_anchors(reference_anchors);
            num_useful_anchors += reference_anchors.len();
        }
        stats.anchors_per_seed.add_value(num_useful_anchors);
        *total_anchors += num_useful_anchors;

        let leaf = tree.leaves()[seed_id];

        for (reference_id, reference_anchors) in anchors_by_reference.iter().enumerate() {
            let reference_record = &references.records[reference_id];
            for anchor in reference_anchors {
                verify::verify_anchor(
                    tree,
                    anchor,
                    &leaf,
                    query_rank_sequence,
                    orientation,
                    &reference_record.rank_sequence,
                    reference_id,
                    &mut already_verified_per_reference[reference_id],
                    alignments,
                    &config.verification,
                    stats,
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Query;

    #[test]
    fn exact_short_read_aligns_to_its_source_position() {
        let reference_seq = b"ACGTACGTAAAACCCCGGGGTTTTACGTACGTAAAACCCCGGGGTTTT".to_vec();
        let references = Reference::from_raw_records(vec![("chr1", reference_seq.clone())]).unwrap();

        let query_seq = &reference_seq[10..30];
        let query = Query::new("read1".into(), 0, query_seq, None);

        let index = BidirectionalFmIndex::build(
            &references.records.iter().map(|r| r.rank_sequence.clone()).collect::<Vec<_>>(),
        );
        let mut pex_cache = PexTreeCache::new(0, PexTreeBuildStrategy::BottomUp);
        let mut scheme_cache = SearchSchemeCache::new();
        let config = PipelineConfig {
            query_error_budget: QueryErrorBudget::Absolute(0),
            ..PipelineConfig::default()
        };
        let mut stats = Stats::new();

        let alignments =
            align_query(&query, &references, &index, &mut pex_cache, &mut scheme_cache, &config, &mut stats)
                .unwrap()
                .expect("admissible query should produce an alignment container");

        let hits: Vec<_> = alignments.to_reference(0).collect();
        assert!(!hits.is_empty());
        assert!(hits.iter().any(|a| a.start_in_reference == 10));
    }

    #[test]
    fn inadmissible_query_is_reported_as_excluded() {
        let references = Reference::from_raw_records(vec![("chr1", b"ACGTACGTACGT".to_vec())]).unwrap();
        let query = Query::new("tiny".into(), 0, b"AC", None);

        let index = BidirectionalFmIndex::build(
            &references.records.iter().map(|r| r.rank_sequence.clone()).collect::<Vec<_>>(),
        );
        let mut pex_cache = PexTreeCache::new(5, PexTreeBuildStrategy::BottomUp);
        let mut scheme_cache = SearchSchemeCache::new();
        let config = PipelineConfig {
            query_error_budget: QueryErrorBudget::Absolute(10),
            pex_leaf_max_num_errors: 5,
            ..PipelineConfig::default()
        };
        let mut stats = Stats::new();

        let result =
            align_query(&query, &references, &index, &mut pex_cache, &mut scheme_cache, &config, &mut stats).unwrap();
        assert!(result.is_none());
        assert_eq!(stats.num_completely_excluded_queries, 1);
    }

    #[test]
    fn zero_max_raw_anchors_fully_excludes_every_seed() {
        let reference_seq = b"ACGTACGTAAAACCCCGGGGTTTTACGTACGTAAAACCCCGGGGTTTT".to_vec();
        let references = Reference::from_raw_records(vec![("chr1", reference_seq.clone())]).unwrap();
        let query = Query::new("read1".into(), 0, &reference_seq[10..30], None);

        let index = BidirectionalFmIndex::build(
            &references.records.iter().map(|r| r.rank_sequence.clone()).collect::<Vec<_>>(),
        );
        let mut pex_cache = PexTreeCache::new(0, PexTreeBuildStrategy::BottomUp);
        let mut scheme_cache = SearchSchemeCache::new();
        let config = PipelineConfig {
            query_error_budget: QueryErrorBudget::Absolute(0),
            search: SearchConfig { max_num_raw_anchors: 0, ..SearchConfig::default() },
            ..PipelineConfig::default()
        };
        let mut stats = Stats::new();

        let alignments =
            align_query(&query, &references, &index, &mut pex_cache, &mut scheme_cache, &config, &mut stats)
                .unwrap()
                .expect("admissible query still produces a (empty) alignment container");

        assert_eq!(alignments.size(), 0, "every seed was fully excluded, so nothing could be verified");
        assert!(stats.raw_anchors_per_excluded_seed.num_values() > 0);
    }

    #[test]
    fn anchor_capping_cutoff_excludes_buckets_beyond_the_cap() {
        let reference_seq = b"ACGTACGTACGT".to_vec();
        let references = Reference::from_raw_records(vec![("r", reference_seq.clone())]).unwrap();
        let index = BidirectionalFmIndex::build(
            &references.records.iter().map(|r| r.rank_sequence.clone()).collect::<Vec<_>>(),
        );
        let seed = &references.records[0].rank_sequence[0..4];
        let scheme = crate::fmindex::SearchScheme::generate(seed.len(), 1);
        let search_config = SearchConfig { max_num_errors: 1, max_num_raw_anchors: 2 };
        let buckets = crate::fmindex::search::search_seed(&index, seed, &scheme, &search_config);

        let (cutoff, full_total) = anchor_capping_cutoff(&buckets, &index, 1, 2);
        assert!(full_total >= 2, "this seed has at least its own 0-error occurrences");
        assert!(cutoff <= 1, "the cap of 2 should be reached at or before 1 error");
    }
}
