//! Seed anchors: candidate positions where a PEX leaf seed matches a
//! reference with some number of errors, deduplicated by a dominance
//! relation so that near-identical anchors collapse to the single
//! best one before verification.

/// A seed match at a reference position, carrying the error count the
/// FM-index search accepted it at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub reference_position: usize,
    pub num_errors: usize,
}

impl Anchor {
    /// `self` dominates `other` when it is at least as accurate and
    /// close enough in position that `other` could not possibly yield
    /// a distinct, better verification outcome: any edit sequence
    /// explaining `other`'s position could instead explain `self`'s
    /// position, using no more errors than `other` already spent
    /// getting there.
    pub fn is_better_than(&self, other: &Anchor) -> bool {
        let position_difference = self.reference_position.abs_diff(other.reference_position);
        self.num_errors <= other.num_errors
            && position_difference <= other.num_errors - self.num_errors
    }
}

/// Removes anchors dominated by a neighbor, in place. Anchors must
/// already be grouped by (seed, reference); this only sorts within
/// that group by position and sweeps left to right.
///
/// The sweep marks a run of anchors dominated by the current one, and
/// additionally checks whether the anchor immediately following that
/// run dominates the current one in the other direction, since
/// `is_better_than` is not symmetric and a single back-check at the
/// boundary is enough: domination requires closeness in position, so
/// domination chains can't skip over an anchor two positions away.
pub fn erase_useless_anchors(anchors: &mut Vec<Anchor>) {
    if anchors.is_empty() {
        return;
    }

    anchors.sort_by_key(|a| a.reference_position);

    let mut erase_marks = vec![false; anchors.len()];
    let mut current_anchor_index = 0usize;

    while current_anchor_index < anchors.len() - 1 {
        let current = anchors[current_anchor_index];
        let mut other_anchor_index = current_anchor_index + 1;

        while other_anchor_index < anchors.len()
            && current.is_better_than(&anchors[other_anchor_index])
        {
            erase_marks[other_anchor_index] = true;
            other_anchor_index += 1;
        }

        if other_anchor_index < anchors.len()
            && anchors[other_anchor_index].is_better_than(&current)
        {
            erase_marks[current_anchor_index] = true;
        }

        current_anchor_index = other_anchor_index;
    }

    let mut iter = erase_marks.into_iter();
    anchors.retain(|_| !iter.next().unwrap());
}
