//! Banded semi-global edit-distance alignment between a PEX node's
//! query span and a candidate reference span.
//!
//! The DP is semi-global: free gaps before the query starts and after
//! it ends against the reference, charged gaps within. Tie-break
//! order when multiple DP transitions tie for the best score at a
//! cell: match/mismatch, then insertion to the reference (reference
//! consumed, query not), then deletion from the reference (query
//! consumed, reference not). This favors alignments short in their
//! reference span, matching hierarchical verification's expectation
//! that climbing a node barely widens the aligned span.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AlignmentError {
    #[error("cannot align an empty sequence")]
    EmptySequence,
}

/// Whether the aligner only needs to know an adequate alignment
/// exists (inner PEX nodes, where the climb only cares about
/// survival) or must also produce every locally optimal alignment's
/// CIGAR (the root, where each is reported to the collector).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentMode {
    OnlyVerifyExistence,
    VerifyAndReturnAlignment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentOutcome {
    AlignmentExists,
    NoAdequateAlignmentExists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentOperation {
    Match,
    Mismatch,
    DeletionFromReference,
    InsertionToReference,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cigar {
    blocks: Vec<(AlignmentOperation, usize)>,
}

impl Cigar {
    pub fn add_operation(&mut self, operation: AlignmentOperation) {
        match self.blocks.last_mut() {
            Some((last_op, count)) if *last_op == operation => *count += 1,
            _ => self.blocks.push((operation, 1)),
        }
    }

    pub fn reverse(&mut self) {
        self.blocks.reverse();
    }

    pub fn blocks(&self) -> &[(AlignmentOperation, usize)] {
        &self.blocks
    }

    /// Extended-CIGAR string: `=` for a match, `X` for a mismatch, `I`
    /// for a query-only step (reference missing a base the query has),
    /// `D` for a reference-only step (reference has a base the query
    /// doesn't).
    pub fn to_sam_string(&self) -> String {
        let mut out = String::new();
        for &(op, count) in &self.blocks {
            let sam_op = match op {
                AlignmentOperation::Match => '=',
                AlignmentOperation::Mismatch => 'X',
                AlignmentOperation::InsertionToReference => 'D',
                AlignmentOperation::DeletionFromReference => 'I',
            };
            out.push_str(&count.to_string());
            out.push(sam_op);
        }
        out
    }
}

/// A found alignment, coordinates relative to the reference span
/// passed to [`align`].
#[derive(Debug, Clone)]
pub struct SpanAlignment {
    pub start_in_span: usize,
    pub end_in_span: usize,
    pub num_errors: usize,
    pub cigar: Cigar,
}

impl SpanAlignment {
    pub fn length_in_reference(&self) -> usize {
        self.end_in_span - self.start_in_span
    }
}

#[derive(Debug, Clone)]
pub struct AlignmentResult {
    pub outcome: AlignmentOutcome,
    /// Every locally optimal endpoint within the error budget, in
    /// `VerifyAndReturnAlignment` mode; always empty in
    /// `OnlyVerifyExistence` mode. A "locally optimal endpoint" is one
    /// whose score is within budget and at least as good as both
    /// immediate neighbors in the last DP row — a full-query
    /// verification must offer every one of these to the collector,
    /// not just the single best, since two of them can be locally
    /// unrelated and both worth keeping (see the collector's local
    /// quality relation).
    pub alignments: Vec<SpanAlignment>,
}

#[derive(Debug, Clone, Copy)]
enum Trace {
    None,
    TakeBothMatch,
    TakeBothMismatch,
    OnlyQuery,
    OnlyReference,
}

/// Aligns `query` against `reference` with semi-global edit distance,
/// returning whether an alignment within `num_allowed_errors` exists
/// and (in [`AlignmentMode::VerifyAndReturnAlignment`] mode) every
/// locally optimal endpoint within budget, each traced back to its own
/// alignment — the caller (hierarchical verification) offers each one
/// to the collector, which resolves overlapping/duplicate endpoints.
pub fn align(
    reference: &[u8],
    query: &[u8],
    num_allowed_errors: usize,
    mode: AlignmentMode,
) -> Result<AlignmentResult, AlignmentError> {
    if reference.is_empty() || query.is_empty() {
        return Err(AlignmentError::EmptySequence);
    }

    let gap_score = -1i32;
    let mismatch_score = -1i32;
    let match_score = 0i32;

    let num_rows = query.len() + 1;
    let num_cols = reference.len() + 1;

    let mut score_matrix = vec![vec![0i32; num_cols]; num_rows];
    let mut traceback_matrix = vec![vec![Trace::None; num_cols]; num_rows];

    for (i, row) in score_matrix.iter_mut().enumerate() {
        row[0] = i as i32 * gap_score;
        traceback_matrix[i][0] = Trace::OnlyQuery;
    }
    // first row stays zero: semi-global alignment allows a free start
    // anywhere in the reference.
    traceback_matrix[0][0] = Trace::None;

    for i in 0..query.len() {
        for j in 0..reference.len() {
            let take_only_reference_score = score_matrix[i + 1][j] + gap_score;
            let take_only_query_score = score_matrix[i][j + 1] + gap_score;

            let (mut score, mut trace) = if query[i] == reference[j] {
                (score_matrix[i][j] + match_score, Trace::TakeBothMatch)
            } else {
                (score_matrix[i][j] + mismatch_score, Trace::TakeBothMismatch)
            };

            // tie-break order: match/mismatch, then insertion to the
            // reference, then deletion from the reference
            if take_only_reference_score > score {
                score = take_only_reference_score;
                trace = Trace::OnlyReference;
            }
            if take_only_query_score > score {
                score = take_only_query_score;
                trace = Trace::OnlyQuery;
            }

            score_matrix[i + 1][j + 1] = score;
            traceback_matrix[i + 1][j + 1] = trace;
        }
    }

    let last_row = &score_matrix[query.len()];
    let best_score = *last_row.iter().max().unwrap();
    let best_num_errors = best_score.unsigned_abs() as usize;

    if best_num_errors > num_allowed_errors {
        return Ok(AlignmentResult {
            outcome: AlignmentOutcome::NoAdequateAlignmentExists,
            alignments: Vec::new(),
        });
    }

    let alignments = if mode == AlignmentMode::VerifyAndReturnAlignment {
        all_local_optimum_alignments(&score_matrix, &traceback_matrix, num_allowed_errors)
    } else {
        Vec::new()
    };

    Ok(AlignmentResult {
        outcome: AlignmentOutcome::AlignmentExists,
        alignments,
    })
}

/// Scans the last DP row for every local-maximum endpoint within the
/// error budget and tracebacks each one into its own alignment.
fn all_local_optimum_alignments(
    score_matrix: &[Vec<i32>],
    traceback_matrix: &[Vec<Trace>],
    num_allowed_errors: usize,
) -> Vec<SpanAlignment> {
    let last_row = &score_matrix[score_matrix.len() - 1];

    let mut endpoints = Vec::new();
    for i in 0..last_row.len() {
        let num_errors = last_row[i].unsigned_abs() as usize;
        if num_errors > num_allowed_errors {
            continue;
        }

        let left = if i == 0 { i } else { i - 1 };
        let right = if i == last_row.len() - 1 { i } else { i + 1 };
        if last_row[i] < last_row[left] || last_row[i] < last_row[right] {
            continue;
        }

        endpoints.push((i, num_errors));
    }

    endpoints
        .into_iter()
        .map(|(end_index, num_errors)| traceback(traceback_matrix, end_index, num_errors))
        .collect()
}

fn traceback(traceback_matrix: &[Vec<Trace>], traceback_start_index: usize, num_errors: usize) -> SpanAlignment {
    let mut i = traceback_matrix.len() - 1;
    let mut j = traceback_start_index;
    let mut cigar = Cigar::default();

    loop {
        match traceback_matrix[i][j] {
            Trace::None => break,
            Trace::TakeBothMatch => {
                cigar.add_operation(AlignmentOperation::Match);
                i -= 1;
                j -= 1;
            }
            Trace::TakeBothMismatch => {
                cigar.add_operation(AlignmentOperation::Mismatch);
                i -= 1;
                j -= 1;
            }
            Trace::OnlyQuery => {
                cigar.add_operation(AlignmentOperation::DeletionFromReference);
                i -= 1;
            }
            Trace::OnlyReference => {
                cigar.add_operation(AlignmentOperation::InsertionToReference);
                j -= 1;
            }
        }
    }

    cigar.reverse();

    SpanAlignment {
        start_in_span: j,
        end_in_span: traceback_start_index,
        num_errors,
        cigar,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_has_zero_errors() {
        let result = align(b"ACGTACGT", b"ACGT", 0, AlignmentMode::VerifyAndReturnAlignment).unwrap();
        assert_eq!(result.outcome, AlignmentOutcome::AlignmentExists);
        let alignment = result.alignments.first().unwrap();
        assert_eq!(alignment.num_errors, 0);
        assert_eq!(alignment.length_in_reference(), 4);
    }

    #[test]
    fn single_mismatch_counted_correctly() {
        let result = align(b"AAGTAAAA", b"ACGT", 1, AlignmentMode::VerifyAndReturnAlignment).unwrap();
        let alignment = result.alignments.first().unwrap();
        assert_eq!(alignment.num_errors, 1);
    }

    #[test]
    fn too_many_errors_reports_no_adequate_alignment() {
        let result = align(b"TTTTTTTT", b"ACGT", 1, AlignmentMode::OnlyVerifyExistence).unwrap();
        assert_eq!(result.outcome, AlignmentOutcome::NoAdequateAlignmentExists);
        assert!(result.alignments.is_empty());
    }

    #[test]
    fn existence_only_mode_does_not_compute_cigar() {
        let result = align(b"ACGTACGT", b"ACGT", 0, AlignmentMode::OnlyVerifyExistence).unwrap();
        assert!(result.alignments.is_empty());
        assert_eq!(result.outcome, AlignmentOutcome::AlignmentExists);
    }

    #[test]
    fn empty_sequences_are_rejected() {
        assert!(align(b"", b"ACGT", 0, AlignmentMode::OnlyVerifyExistence).is_err());
        assert!(align(b"ACGT", b"", 0, AlignmentMode::OnlyVerifyExistence).is_err());
    }

    #[test]
    fn deletion_and_insertion_produce_sensible_cigar() {
        // reference has one extra base relative to query -> one deletion-from-reference
        let result = align(b"ACGTT", b"ACGT", 1, AlignmentMode::VerifyAndReturnAlignment).unwrap();
        let alignment = result.alignments.first().unwrap();
        assert!(alignment.num_errors <= 1);
        assert!(!alignment.cigar.blocks().is_empty());
    }

    #[test]
    fn two_separated_exact_occurrences_both_reported() {
        // "ACGT" occurs exactly at the start and the end, separated by
        // a run of mismatches that scores well below the 0-error
        // budget in between: two distinct local optima.
        let result = align(b"ACGTTTTTACGT", b"ACGT", 0, AlignmentMode::VerifyAndReturnAlignment).unwrap();
        assert_eq!(result.alignments.len(), 2);
        let ends: Vec<_> = result.alignments.iter().map(|a| a.end_in_span).collect();
        assert_eq!(ends, vec![4, 12]);
        assert!(result.alignments.iter().all(|a| a.num_errors == 0));
    }

    #[test]
    fn cigar_to_sam_string_uses_extended_operations() {
        let mut cigar = Cigar::default();
        cigar.add_operation(AlignmentOperation::Match);
        cigar.add_operation(AlignmentOperation::Match);
        cigar.add_operation(AlignmentOperation::Mismatch);
        cigar.add_operation(AlignmentOperation::DeletionFromReference);
        assert_eq!(cigar.to_sam_string(), "2=1X1I");
    }
}
