//! Hierarchical verification: climbs a PEX tree from the leaf a seed
//! anchored at, through each ancestor, up to the root, aligning a
//! growing reference span at each step and stopping early the moment
//! a node's span has no adequate alignment — since if an inner node
//! already fails, no ancestor of it can succeed either.

use crate::alignment::{self, AlignmentMode, AlignmentOutcome};
use crate::anchor::Anchor;
use crate::collector::QueryAlignments;
use crate::intervals::{HalfOpenInterval, VerifiedIntervals};
use crate::math::epsilon_aware_ceil;
use crate::pex::{PexNode, PexTree};
use crate::stats::Stats;
use crate::types::Orientation;

/// How thoroughly verification re-checks overlapping regions:
/// `Hierarchical` climbs node by node and stops as soon as a node
/// fails; `DirectFull` always aligns the root span directly,
/// skipping the climb (useful as a baseline / fallback).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationKind {
    Hierarchical,
    DirectFull,
}

#[derive(Debug, Clone, Copy)]
pub struct VerificationConfig {
    pub kind: VerificationKind,
    pub extra_verification_ratio: f64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            kind: VerificationKind::Hierarchical,
            extra_verification_ratio: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SpanConfig {
    offset: usize,
    length: usize,
    applied_extra_verification_length_per_side: usize,
}

impl SpanConfig {
    fn as_half_open_interval(&self) -> HalfOpenInterval {
        HalfOpenInterval::new(self.offset, self.offset + self.length)
    }
}

/// Computes the reference span a PEX node should be aligned against,
/// given the anchor position of one of the node's descendant leaves.
/// The base span covers the node's query length plus its error budget
/// on both sides (so an alignment using the full error budget still
/// fits); `extra_verification_ratio` optionally widens it further to
/// guard against alignment-boundary edge effects.
fn compute_reference_span(
    anchor: &Anchor,
    pex_node: &PexNode,
    leaf_query_index_from: usize,
    full_reference_length: usize,
    extra_verification_ratio: f64,
) -> SpanConfig {
    let verification_interval_base_length =
        pex_node.length_of_query_span() + 2 * pex_node.num_errors + 1;
    let extra_verification_length =
        epsilon_aware_ceil(verification_interval_base_length as f64 * extra_verification_ratio);

    let leaf_offset_from_node = leaf_query_index_from as i64 - pex_node.query_index_from as i64;
    let start_signed = anchor.reference_position as i64
        - leaf_offset_from_node
        - pex_node.num_errors as i64
        - extra_verification_length as i64;

    let reference_span_start = start_signed.max(0) as usize;
    let reference_span_length = (verification_interval_base_length + 2 * extra_verification_length)
        .min(full_reference_length.saturating_sub(reference_span_start));

    SpanConfig {
        offset: reference_span_start,
        length: reference_span_length.max(1),
        applied_extra_verification_length_per_side: extra_verification_length,
    }
}

fn try_align_node(
    pex_node: &PexNode,
    reference_rank_sequence: &[u8],
    span_config: SpanConfig,
    query_rank_sequence: &[u8],
    reference_id: usize,
    orientation: Orientation,
    alignments: &mut QueryAlignments,
) -> AlignmentOutcome {
    let query_span = &query_rank_sequence
        [pex_node.query_index_from..=pex_node.query_index_to];
    let reference_span =
        &reference_rank_sequence[span_config.offset..span_config.offset + span_config.length];

    let mode = if pex_node.is_root() {
        AlignmentMode::VerifyAndReturnAlignment
    } else {
        AlignmentMode::OnlyVerifyExistence
    };

    let result = alignment::align(reference_span, query_span, pex_node.num_errors, mode)
        .expect("reference and query spans are always non-empty in hierarchical verification");

    for span_alignment in result.alignments {
        alignments.offer(
            reference_id,
            span_config.offset,
            span_config.length,
            orientation,
            span_alignment,
        );
    }

    result.outcome
}

/// Verifies one anchor (a seed match at some reference position),
/// climbing its PEX leaf's ancestor chain and recording any
/// adequate root-level alignment it finds into `alignments`.
#[allow(clippy::too_many_arguments)]
pub fn verify_anchor(
    pex_tree: &PexTree,
    anchor: &Anchor,
    leaf: &PexNode,
    query_rank_sequence: &[u8],
    orientation: Orientation,
    reference_rank_sequence: &[u8],
    reference_id: usize,
    already_verified: &mut VerifiedIntervals,
    alignments: &mut QueryAlignments,
    config: &VerificationConfig,
    stats: &mut Stats,
) {
    match config.kind {
        VerificationKind::DirectFull => {
            direct_full_verification(
                pex_tree,
                anchor,
                leaf,
                query_rank_sequence,
                orientation,
                reference_rank_sequence,
                reference_id,
                already_verified,
                alignments,
                config.extra_verification_ratio,
                stats,
            );
        }
        VerificationKind::Hierarchical => {
            hierarchical_verification(
                pex_tree,
                anchor,
                leaf,
                query_rank_sequence,
                orientation,
                reference_rank_sequence,
                reference_id,
                already_verified,
                alignments,
                config.extra_verification_ratio,
                stats,
            );
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn root_span_config(
    pex_tree: &PexTree,
    anchor: &Anchor,
    leaf_query_index_from: usize,
    reference_len: usize,
    extra_verification_ratio: f64,
) -> SpanConfig {
    compute_reference_span(
        anchor,
        pex_tree.root(),
        leaf_query_index_from,
        reference_len,
        extra_verification_ratio,
    )
}

#[allow(clippy::too_many_arguments)]
fn root_was_already_verified(
    pex_tree: &PexTree,
    anchor: &Anchor,
    leaf_query_index_from: usize,
    reference_len: usize,
    extra_verification_ratio: f64,
    already_verified: &VerifiedIntervals,
    stats: &mut Stats,
) -> bool {
    let root_config = root_span_config(pex_tree, anchor, leaf_query_index_from, reference_len, extra_verification_ratio);
    let trimmed = root_config
        .as_half_open_interval()
        .trim_from_both_sides(root_config.applied_extra_verification_length_per_side);
    let avoided = already_verified.contains(&trimmed);
    if avoided {
        stats.verified_span_sizes_root_avoided.add_value(root_config.length);
    }
    avoided
}

#[allow(clippy::too_many_arguments)]
fn direct_full_verification(
    pex_tree: &PexTree,
    anchor: &Anchor,
    leaf: &PexNode,
    query_rank_sequence: &[u8],
    orientation: Orientation,
    reference_rank_sequence: &[u8],
    reference_id: usize,
    already_verified: &mut VerifiedIntervals,
    alignments: &mut QueryAlignments,
    extra_verification_ratio: f64,
    stats: &mut Stats,
) {
    if root_was_already_verified(
        pex_tree,
        anchor,
        leaf.query_index_from,
        reference_rank_sequence.len(),
        extra_verification_ratio,
        already_verified,
        stats,
    ) {
        return;
    }

    let root_config = root_span_config(
        pex_tree,
        anchor,
        leaf.query_index_from,
        reference_rank_sequence.len(),
        extra_verification_ratio,
    );

    try_align_node(
        pex_tree.root(),
        reference_rank_sequence,
        root_config,
        query_rank_sequence,
        reference_id,
        orientation,
        alignments,
    );
    stats.verified_span_sizes_root_aligned.add_value(root_config.length);

    already_verified.insert(root_config.as_half_open_interval());
}

#[allow(clippy::too_many_arguments)]
fn hierarchical_verification(
    pex_tree: &PexTree,
    anchor: &Anchor,
    leaf: &PexNode,
    query_rank_sequence: &[u8],
    orientation: Orientation,
    reference_rank_sequence: &[u8],
    reference_id: usize,
    already_verified: &mut VerifiedIntervals,
    alignments: &mut QueryAlignments,
    extra_verification_ratio: f64,
    stats: &mut Stats,
) {
    if root_was_already_verified(
        pex_tree,
        anchor,
        leaf.query_index_from,
        reference_rank_sequence.len(),
        extra_verification_ratio,
        already_verified,
        stats,
    ) {
        return;
    }

    if leaf.is_root() {
        let root_config = root_span_config(
            pex_tree,
            anchor,
            leaf.query_index_from,
            reference_rank_sequence.len(),
            extra_verification_ratio,
        );
        try_align_node(
            leaf,
            reference_rank_sequence,
            root_config,
            query_rank_sequence,
            reference_id,
            orientation,
            alignments,
        );
        stats.verified_span_sizes_root_aligned.add_value(root_config.length);
        already_verified.insert(root_config.as_half_open_interval());
        return;
    }

    let seed_query_index_from = leaf.query_index_from;
    let mut current_node = pex_tree
        .parent_of(leaf)
        .expect("a non-root leaf always has a parent");

    loop {
        let span_config = compute_reference_span(
            anchor,
            current_node,
            seed_query_index_from,
            reference_rank_sequence.len(),
            extra_verification_ratio,
        );

        let outcome = try_align_node(
            current_node,
            reference_rank_sequence,
            span_config,
            query_rank_sequence,
            reference_id,
            orientation,
            alignments,
        );

        if current_node.is_root() {
            stats.verified_span_sizes_root_aligned.add_value(span_config.length);
            already_verified.insert(span_config.as_half_open_interval());
        } else {
            stats.verified_span_sizes_inner_node.add_value(span_config.length);
        }

        if outcome == AlignmentOutcome::NoAdequateAlignmentExists || current_node.is_root() {
            break;
        }

        current_node = pex_tree
            .parent_of(current_node)
            .expect("non-root node always has a parent");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intervals::IntervalOptimization;
    use crate::pex::{PexTreeBuildStrategy, PexTreeConfig};

    fn ranks(s: &str) -> Vec<u8> {
        crate::alphabet::sanitize_to_ranks(s.as_bytes()).0
    }

    #[test]
    fn hierarchical_climb_reaches_root_for_exact_match() {
        let reference = ranks(&"ACGTACGTAAAACCCCGGGGTTTT".repeat(4));
        let query = ranks("AAAACCCCGGGGTTTT");

        let tree = PexTree::new(PexTreeConfig {
            total_query_length: query.len(),
            query_num_errors: 1,
            leaf_max_num_errors: 0,
            build_strategy: PexTreeBuildStrategy::BottomUp,
        });

        let leaf = tree.leaves()[0];
        let position = reference
            .windows(leaf.length_of_query_span())
            .position(|w| w == &query[leaf.query_index_from..=leaf.query_index_to])
            .expect("leaf seed should be findable in this constructed reference");

        let anchor = Anchor { reference_position: position, num_errors: 0 };
        let mut already_verified = VerifiedIntervals::new(IntervalOptimization::On, 0.5);
        let mut alignments = QueryAlignments::new(1);

        verify_anchor(
            &tree,
            &anchor,
            &leaf,
            &query,
            Orientation::Forward,
            &reference,
            0,
            &mut already_verified,
            &mut alignments,
            &VerificationConfig::default(),
            &mut Stats::new(),
        );

        assert!(alignments.size() >= 1);
    }

    #[test]
    fn already_verified_root_interval_is_skipped() {
        let reference = ranks(&"A".repeat(200));
        let query = ranks(&"A".repeat(20));

        let tree = PexTree::new(PexTreeConfig {
            total_query_length: query.len(),
            query_num_errors: 0,
            leaf_max_num_errors: 0,
            build_strategy: PexTreeBuildStrategy::BottomUp,
        });
        let leaf = tree.leaves()[0];
        let anchor = Anchor { reference_position: 50, num_errors: 0 };

        let mut already_verified = VerifiedIntervals::new(IntervalOptimization::On, 0.0);
        let root_config = root_span_config(&tree, &anchor, leaf.query_index_from, reference.len(), 0.0);
        already_verified.insert(root_config.as_half_open_interval());

        let mut alignments = QueryAlignments::new(1);
        verify_anchor(
            &tree,
            &anchor,
            &leaf,
            &query,
            Orientation::Forward,
            &reference,
            0,
            &mut already_verified,
            &mut alignments,
            &VerificationConfig::default(),
            &mut Stats::new(),
        );

        assert_eq!(alignments.size(), 0);
    }
}
