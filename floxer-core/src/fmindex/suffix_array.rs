//! Suffix array construction.
//!
//! A plain comparison sort over suffix slices, O(n log n) comparisons
//! each up to O(n) long in the worst case. This is the straightforward
//! textbook construction, adequate at the reference sizes this
//! aligner targets; it is not a linear-time (SA-IS, DC3) construction.

use crate::alphabet::Rank;

pub fn build_suffix_array(text_with_sentinel: &[Rank]) -> Vec<usize> {
    let n = text_with_sentinel.len();
    let mut suffixes: Vec<usize> = (0..n).collect();
    suffixes.sort_by(|&a, &b| text_with_sentinel[a..].cmp(&text_with_sentinel[b..]));
    suffixes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::sanitize_to_ranks;

    #[test]
    fn suffix_array_of_banana_like_text_is_sorted() {
        let (ranks, _) = sanitize_to_ranks(b"ACGTACGT");
        let mut text = ranks;
        text.push(0);
        let sa = build_suffix_array(&text);

        assert_eq!(sa.len(), text.len());
        for window in sa.windows(2) {
            assert!(text[window[0]..] <= text[window[1]..]);
        }
    }

    #[test]
    fn every_start_position_appears_exactly_once() {
        let (ranks, _) = sanitize_to_ranks(b"GATTACA");
        let mut text = ranks;
        text.push(0);
        let sa = build_suffix_array(&text);

        let mut seen = vec![false; text.len()];
        for &pos in &sa {
            assert!(!seen[pos]);
            seen[pos] = true;
        }
    }
}
