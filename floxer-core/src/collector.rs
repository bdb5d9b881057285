//! Collects the alignments found for one query across all references
//! and orientations, keeping only "useful" ones: no two alignments
//! closer together than their error-count difference survive (the
//! worse one is evicted), and a single best alignment is tracked as
//! primary.

use std::collections::BTreeMap;

use crate::alignment::{Cigar, SpanAlignment};
use crate::types::Orientation;

/// One retained alignment, in full-reference (not reference-span)
/// coordinates.
#[derive(Debug, Clone)]
pub struct QueryAlignment {
    pub start_in_reference: usize,
    pub end_in_reference: usize,
    pub reference_id: usize,
    pub num_errors: usize,
    pub score: i64,
    pub orientation: Orientation,
    pub cigar: Cigar,
}

impl QueryAlignment {
    pub fn length_in_reference(&self) -> usize {
        self.end_in_reference - self.start_in_reference
    }

    /// How this alignment compares to a candidate at
    /// `(other_start, other_num_errors)`, restricted to cases where
    /// the two are close enough in reference position that only one
    /// of them can be the "true" alignment of this query region:
    /// within `|num_errors difference|` positions of each other.
    fn local_quality_comparison(&self, other_start: usize, other_num_errors: usize) -> LocalQuality {
        let distance = self.start_in_reference.abs_diff(other_start);

        let (num_errors_difference, potential) = match self.num_errors.cmp(&other_num_errors) {
            std::cmp::Ordering::Greater => (self.num_errors - other_num_errors, LocalQuality::Worse),
            std::cmp::Ordering::Equal => (0, LocalQuality::Equal),
            std::cmp::Ordering::Less => (other_num_errors - self.num_errors, LocalQuality::Better),
        };

        if distance > num_errors_difference {
            LocalQuality::Unrelated
        } else {
            potential
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LocalQuality {
    Unrelated,
    Equal,
    Better,
    Worse,
}

/// All of one query's alignments, one ordered map per reference
/// (keyed by reference start position), plus the current primary
/// alignment pointer.
#[derive(Debug, Clone)]
pub struct QueryAlignments {
    alignments_per_reference: Vec<BTreeMap<usize, QueryAlignment>>,
    // (score, end_in_reference, start_in_reference, reference_id). Both
    // endpoints are needed: two locally-unrelated alignments (distinct
    // `start_in_reference`) can share an `end_in_reference` on the same
    // reference, and without `start_in_reference` in the key they'd be
    // indistinguishable to `is_primary`, so a non-primary alignment
    // with a matching end could be misreported as primary too.
    primary: Option<(i64, usize, usize, usize)>,
}

impl QueryAlignments {
    pub fn new(num_references: usize) -> Self {
        Self {
            alignments_per_reference: (0..num_references).map(|_| BTreeMap::new()).collect(),
            primary: None,
        }
    }

    pub fn to_reference(&self, reference_id: usize) -> impl Iterator<Item = &QueryAlignment> {
        self.alignments_per_reference[reference_id].values()
    }

    pub fn size(&self) -> usize {
        self.alignments_per_reference.iter().map(|m| m.len()).sum()
    }

    pub fn is_primary(&self, alignment: &QueryAlignment) -> bool {
        match self.primary {
            Some((_, end, start, reference_id)) => {
                alignment.end_in_reference == end
                    && alignment.start_in_reference == start
                    && alignment.reference_id == reference_id
            }
            None => false,
        }
    }

    fn update_primary(&mut self, candidate: &QueryAlignment) {
        let candidate_key = (
            candidate.score,
            candidate.end_in_reference,
            candidate.start_in_reference,
            candidate.reference_id,
        );
        let should_replace = match self.primary {
            None => true,
            Some((score, end, start, reference_id)) => {
                score < candidate.score
                    || (score == candidate.score && end > candidate.end_in_reference)
                    || (score == candidate.score
                        && end == candidate.end_in_reference
                        && start > candidate.start_in_reference)
                    || (score == candidate.score
                        && end == candidate.end_in_reference
                        && start == candidate.start_in_reference
                        && reference_id > candidate.reference_id)
            }
        };
        if should_replace {
            self.primary = Some(candidate_key);
        }
    }

    /// Offers an alignment found against a reference span, described
    /// relative to that span (`span_alignment`, and the span's
    /// `[span_offset, span_offset + span_length)` bounds in full
    /// reference coordinates). Evicts any existing alignment the new
    /// one locally dominates, and rejects the new one if an existing
    /// alignment locally dominates it instead.
    ///
    /// Returns whether the alignment was inserted.
    pub fn offer(
        &mut self,
        reference_id: usize,
        span_offset: usize,
        span_length: usize,
        orientation: Orientation,
        span_alignment: SpanAlignment,
    ) -> bool {
        let candidate_start = span_offset + span_alignment.start_in_span;
        let candidate_num_errors = span_alignment.num_errors;

        let existing = &self.alignments_per_reference[reference_id];

        let mut worse_to_the_right: Option<usize> = None;
        let mut worse_to_the_left: Option<usize> = None;

        if let Some((&right_key, right_alignment)) = existing.range(candidate_start..).next() {
            match right_alignment.local_quality_comparison(candidate_start, candidate_num_errors) {
                LocalQuality::Unrelated => {}
                LocalQuality::Equal | LocalQuality::Better => return false,
                LocalQuality::Worse => worse_to_the_right = Some(right_key),
            }
        }

        if let Some((&left_key, left_alignment)) = existing.range(..candidate_start).next_back() {
            match left_alignment.local_quality_comparison(candidate_start, candidate_num_errors) {
                LocalQuality::Unrelated => {}
                LocalQuality::Equal | LocalQuality::Better => {
                    // the store is locally dominant, so nothing to its
                    // right could have queued a removal either.
                    debug_assert!(worse_to_the_right.is_none());
                    return false;
                }
                LocalQuality::Worse => worse_to_the_left = Some(left_key),
            }
        }

        let existing_mut = &mut self.alignments_per_reference[reference_id];
        if let Some(key) = worse_to_the_left {
            existing_mut.remove(&key);
        }
        if let Some(key) = worse_to_the_right {
            existing_mut.remove(&key);
        }

        let _ = span_length;
        let inserted = QueryAlignment {
            start_in_reference: candidate_start,
            end_in_reference: candidate_start + span_alignment.length_in_reference(),
            reference_id,
            num_errors: candidate_num_errors,
            score: -(candidate_num_errors as i64),
            orientation,
            cigar: span_alignment.cigar,
        };

        self.update_primary(&inserted);
        self.alignments_per_reference[reference_id].insert(candidate_start, inserted);

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::AlignmentOperation;

    fn span(start: usize, end: usize, num_errors: usize) -> SpanAlignment {
        let mut cigar = Cigar::default();
        cigar.add_operation(AlignmentOperation::Match);
        SpanAlignment { start_in_span: start, end_in_span: end, num_errors, cigar }
    }

    #[test]
    fn distinct_far_apart_alignments_both_survive() {
        let mut collector = QueryAlignments::new(1);
        assert!(collector.offer(0, 0, 1000, Orientation::Forward, span(0, 20, 0)));
        assert!(collector.offer(0, 0, 1000, Orientation::Forward, span(500, 520, 0)));
        assert_eq!(collector.size(), 2);
    }

    #[test]
    fn better_nearby_alignment_evicts_worse_one() {
        let mut collector = QueryAlignments::new(1);
        collector.offer(0, 0, 1000, Orientation::Forward, span(10, 30, 2));
        collector.offer(0, 0, 1000, Orientation::Forward, span(11, 30, 0));
        assert_eq!(collector.size(), 1);
        let remaining: Vec<_> = collector.to_reference(0).collect();
        assert_eq!(remaining[0].num_errors, 0);
    }

    #[test]
    fn worse_nearby_alignment_is_rejected() {
        let mut collector = QueryAlignments::new(1);
        collector.offer(0, 0, 1000, Orientation::Forward, span(10, 30, 0));
        let inserted = collector.offer(0, 0, 1000, Orientation::Forward, span(11, 30, 2));
        assert!(!inserted);
        assert_eq!(collector.size(), 1);
    }

    #[test]
    fn repeated_offer_at_the_same_position_is_rejected() {
        // identical start and error count: the two are locally equal,
        // caught by the right-neighbor lookup since the candidate's own
        // position is included in its range.
        let mut collector = QueryAlignments::new(1);
        assert!(collector.offer(0, 0, 1000, Orientation::Forward, span(10, 30, 1)));
        let inserted = collector.offer(0, 0, 1000, Orientation::Forward, span(10, 30, 1));
        assert!(!inserted);
        assert_eq!(collector.size(), 1);
    }

    #[test]
    fn primary_prefers_better_score() {
        let mut collector = QueryAlignments::new(1);
        collector.offer(0, 0, 1000, Orientation::Forward, span(10, 30, 2));
        collector.offer(0, 0, 1000, Orientation::Forward, span(500, 520, 0));
        let best = collector.to_reference(0).find(|a| collector.is_primary(a)).unwrap();
        assert_eq!(best.num_errors, 0);
    }

    #[test]
    fn alignments_sharing_an_end_position_are_not_both_primary() {
        // both alignments end at reference position 30, with distinct
        // starts (10 and 5) far enough apart relative to their (equal,
        // zero) error counts to count as locally unrelated, so both
        // survive; with equal score and the same `end_in_reference`,
        // only `start_in_reference` tells them apart.
        let mut collector = QueryAlignments::new(1);
        assert!(collector.offer(0, 0, 1000, Orientation::Forward, span(10, 30, 0)));
        assert!(collector.offer(0, 0, 1000, Orientation::Forward, span(5, 30, 0)));
        assert_eq!(collector.size(), 2);

        let primaries: Vec<_> = collector.to_reference(0).filter(|a| collector.is_primary(a)).collect();
        assert_eq!(primaries.len(), 1);
    }
}
