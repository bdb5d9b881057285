//! A from-scratch FM-index over the DNA+N rank alphabet, sized for
//! the moderate reference lengths this aligner targets rather than
//! for whole-genome scale. It is built over the *reversed* reference
//! text, so extending a cursor always appends to the left end of the
//! currently matched pattern — the single primitive the
//! right-to-left backtracking walk in [`search`] needs for every
//! block of a search scheme.

mod index_io;
pub mod scheme;
pub mod search;
mod suffix_array;

use crate::alphabet::{self, Rank, ALPHABET_SIZE, SENTINEL};

pub use index_io::{load, save, IndexError};
pub use scheme::{SearchScheme, SearchSchemeCache};
pub use search::{search_seed, SearchConfig};

const SIGMA: usize = ALPHABET_SIZE + 1; // ranks 0..=5: sentinel + A C G T N

/// One half of a [`BidirectionalFmIndex`]: the BWT of some text plus
/// its rank-select support structures.
#[derive(Debug, Clone)]
pub(crate) struct FmIndexHalf {
    bwt: Vec<Rank>,
    /// `c_array[r]` = number of symbols in the text strictly less
    /// than rank `r`.
    c_array: [usize; SIGMA],
    /// `occ[r][i]` = number of occurrences of rank `r` in `bwt[..i]`.
    /// Dense (not blocked/sampled) since reference sizes here are
    /// modest; this is the direct tradeoff called out in the
    /// project's scaled-down FM-index design.
    occ: Vec<[usize; SIGMA]>,
    suffix_array: Vec<usize>,
}

impl FmIndexHalf {
    fn build(text_with_sentinel: &[Rank], suffix_array: Vec<usize>) -> Self {
        let n = text_with_sentinel.len();
        let bwt: Vec<Rank> = suffix_array
            .iter()
            .map(|&sa_pos| {
                if sa_pos == 0 {
                    text_with_sentinel[n - 1]
                } else {
                    text_with_sentinel[sa_pos - 1]
                }
            })
            .collect();

        let mut counts = [0usize; SIGMA];
        for &r in text_with_sentinel {
            counts[r as usize] += 1;
        }
        let mut c_array = [0usize; SIGMA];
        let mut running = 0usize;
        for r in 0..SIGMA {
            c_array[r] = running;
            running += counts[r];
        }

        let mut occ = Vec::with_capacity(n + 1);
        let mut row = [0usize; SIGMA];
        occ.push(row);
        for &r in &bwt {
            row[r as usize] += 1;
            occ.push(row);
        }

        Self { bwt, c_array, occ, suffix_array }
    }

    fn occ(&self, rank: Rank, i: usize) -> usize {
        self.occ[i][rank as usize]
    }

    fn lf_range(&self, rank: Rank, range: (usize, usize)) -> (usize, usize) {
        let (lo, hi) = range;
        let base = self.c_array[rank as usize];
        (base + self.occ(rank, lo), base + self.occ(rank, hi))
    }

    fn full_range(&self) -> (usize, usize) {
        (0, self.bwt.len())
    }
}

/// An FM-index over the reversed concatenation of all reference
/// sequences, extended one rank at a time from the right so that
/// following ranks prepend to the left of the currently matched
/// pattern. The name and the `backward_range` field below predate a
/// true bidirectional (two-index) design; only the single reversed
/// index is built and searched now, per [`scheme::Block`]'s doc
/// comment.
#[derive(Debug, Clone)]
pub struct BidirectionalFmIndex {
    backward: FmIndexHalf,
    reference_boundaries: Vec<(usize, usize)>,
    concatenated_length: usize,
}

/// A half-open `[lo, hi)` suffix-array range plus the text-offset
/// cursor position a search step has reached; the fundamental unit
/// the backtracking search in [`search`] carries forward.
#[derive(Debug, Clone, Copy)]
pub struct FmCursor {
    pub backward_range: (usize, usize),
    pub match_length: usize,
}

impl BidirectionalFmIndex {
    /// Builds the index over the concatenation of `references`,
    /// separated (and terminated) by the sentinel rank. Reference
    /// boundaries are `[start, end)` offsets into the concatenated
    /// text, in input order, used by [`Self::locate`] to recover
    /// `(reference_id, local_position)`.
    pub fn build(references: &[Vec<Rank>]) -> Self {
        let mut concatenated = Vec::new();
        let mut reference_boundaries = Vec::with_capacity(references.len());

        for reference in references {
            let start = concatenated.len();
            concatenated.extend_from_slice(reference);
            concatenated.push(SENTINEL);
            reference_boundaries.push((start, start + reference.len()));
        }

        let reversed: Vec<Rank> = concatenated.iter().rev().copied().collect();
        let backward_sa = suffix_array::build_suffix_array(&reversed);
        let backward = FmIndexHalf::build(&reversed, backward_sa);

        Self {
            backward,
            reference_boundaries,
            concatenated_length: concatenated.len(),
        }
    }

    pub fn num_references(&self) -> usize {
        self.reference_boundaries.len()
    }

    pub fn concatenated_length(&self) -> usize {
        self.concatenated_length
    }

    fn initial_cursor(&self) -> FmCursor {
        FmCursor {
            backward_range: self.backward.full_range(),
            match_length: 0,
        }
    }

    /// Extends a cursor by one rank at the left end of the currently
    /// matched pattern (walking a scheme block right to left over the
    /// reversed/backward index).
    fn extend_backward(&self, cursor: &FmCursor, rank: Rank) -> Option<FmCursor> {
        let new_range = self.backward.lf_range(rank, cursor.backward_range);
        if new_range.0 >= new_range.1 {
            return None;
        }
        Some(FmCursor {
            backward_range: new_range,
            match_length: cursor.match_length + 1,
        })
    }

    pub fn count(&self, cursor: &FmCursor) -> usize {
        cursor.backward_range.1 - cursor.backward_range.0
    }

    /// Resolves every suffix-array position in a cursor's backward
    /// range to a `(reference_id, local_position)` pair. The backward
    /// range is used because it is the one anchored on where the
    /// fully-extended match *starts* in the original (non-reversed)
    /// text once its positions are mirrored back.
    pub fn locate(&self, cursor: &FmCursor) -> Vec<(usize, usize)> {
        let (lo, hi) = cursor.backward_range;
        let mut out = Vec::with_capacity(hi - lo);

        for sa_pos in &self.backward.suffix_array[lo..hi] {
            // position in the reversed text of the start of the match
            // in reversed coordinates -> convert back to forward coordinates
            let reversed_start = *sa_pos;
            let forward_end = self.concatenated_length - reversed_start;
            let forward_start = forward_end.saturating_sub(cursor.match_length);

            if let Some((reference_id, local_start)) = self.resolve_position(forward_start) {
                out.push((reference_id, local_start));
            }
        }

        out
    }

    fn resolve_position(&self, global_position: usize) -> Option<(usize, usize)> {
        for (reference_id, &(start, end)) in self.reference_boundaries.iter().enumerate() {
            if global_position >= start && global_position < end {
                return Some((reference_id, global_position - start));
            }
        }
        None
    }

    pub fn save<W: std::io::Write>(&self, writer: W) -> Result<(), IndexError> {
        index_io::save(self, writer)
    }

    pub fn load<R: std::io::Read>(reader: R) -> Result<Self, IndexError> {
        index_io::load(reader)
    }
}

pub(crate) fn encode_sequence_for_locate(rank_sequence: &[Rank]) -> Vec<Rank> {
    let mut ranks = rank_sequence.to_vec();
    ranks.push(alphabet::SENTINEL);
    ranks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::sanitize_to_ranks;

    fn ranks(s: &str) -> Vec<Rank> {
        sanitize_to_ranks(s.as_bytes()).0
    }

    #[test]
    fn exact_match_is_found() {
        let reference = ranks("ACGTACGTAAAC");
        let index = BidirectionalFmIndex::build(&[reference]);

        let mut cursor = index.initial_cursor();
        for &rank in ranks("ACGT").iter().rev() {
            cursor = index.extend_backward(&cursor, rank).expect("pattern should extend");
        }

        let hits = index.locate(&cursor);
        assert!(hits.contains(&(0, 0)));
        assert!(hits.contains(&(0, 4)));
    }

    #[test]
    fn nonexistent_pattern_yields_empty_range() {
        let reference = ranks("AAAAAAAA");
        let index = BidirectionalFmIndex::build(&[reference]);

        let mut cursor = Some(index.initial_cursor());
        for &rank in ranks("TTTT").iter().rev() {
            cursor = cursor.and_then(|c| index.extend_backward(&c, rank));
        }
        assert!(cursor.is_none());
    }

    #[test]
    fn multiple_references_resolve_to_correct_ids() {
        let ref_a = ranks("AAAACCCC");
        let ref_b = ranks("GGGGTTTT");
        let index = BidirectionalFmIndex::build(&[ref_a, ref_b]);
        assert_eq!(index.num_references(), 2);

        let mut cursor = index.initial_cursor();
        for &rank in ranks("TTTT").iter().rev() {
            cursor = index.extend_backward(&cursor, rank).unwrap();
        }
        let hits = index.locate(&cursor);
        assert_eq!(hits, vec![(1, 4)]);
    }
}
