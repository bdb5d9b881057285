//! Backtracking search: walks a [`SearchScheme`]'s blocks right to
//! left over a [`BidirectionalFmIndex`], branching on match,
//! substitution, insertion (query has a base the reference doesn't),
//! and deletion (reference has a base the query doesn't), bounded by
//! each block's admissible error range.

use std::collections::HashMap;

use super::scheme::{Block, SearchScheme};
use super::{BidirectionalFmIndex, FmCursor};
use crate::alphabet::{Rank, ALPHABET_SIZE};

#[derive(Debug, Clone, Copy)]
pub struct SearchConfig {
    pub max_num_errors: usize,
    pub max_num_raw_anchors: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_num_errors: 3,
            max_num_raw_anchors: 500,
        }
    }
}

struct Frontier {
    cursor: FmCursor,
    errors: usize,
}

/// Searches one seed's rank sequence against the index according to
/// `scheme`, returning all resulting cursors grouped by the total
/// number of errors used, for every error count up to
/// `config.max_num_errors`.
pub fn search_seed(
    index: &BidirectionalFmIndex,
    seed: &[Rank],
    scheme: &SearchScheme,
    config: &SearchConfig,
) -> HashMap<usize, Vec<FmCursor>> {
    let mut frontiers = vec![Frontier {
        cursor: initial_cursor(index, &scheme.blocks),
        errors: 0,
    }];

    for block in &scheme.blocks {
        let mut next_frontiers = Vec::new();
        for frontier in &frontiers {
            walk_block(index, seed, block, frontier.cursor, frontier.errors, config, &mut next_frontiers);
        }
        frontiers = next_frontiers;
        if frontiers.is_empty() {
            break;
        }
    }

    let mut buckets: HashMap<usize, Vec<FmCursor>> = HashMap::new();
    for frontier in frontiers {
        if frontier.errors <= config.max_num_errors {
            buckets.entry(frontier.errors).or_default().push(frontier.cursor);
        }
    }
    buckets
}

fn initial_cursor(index: &BidirectionalFmIndex, blocks: &[Block]) -> FmCursor {
    let _ = blocks;
    FmCursor {
        backward_range: (0, index.concatenated_length()),
        match_length: 0,
    }
}

/// Recursively consumes one block of the pattern, branching at every
/// position into a match/substitution step, a deletion step
/// (reference base absent from the query), and an insertion step
/// (query base absent from the reference), bounded by
/// `block.error_upper` total errors accrued since the scheme started
/// and `config.max_num_errors` overall.
#[allow(clippy::too_many_arguments)]
fn walk_block(
    index: &BidirectionalFmIndex,
    seed: &[Rank],
    block: &Block,
    cursor: FmCursor,
    errors_so_far: usize,
    config: &SearchConfig,
    out: &mut Vec<Frontier>,
) {
    walk_block_inner(
        index,
        seed,
        block,
        cursor,
        block.pattern_start,
        errors_so_far,
        config,
        out,
    );
}

#[allow(clippy::too_many_arguments)]
fn walk_block_inner(
    index: &BidirectionalFmIndex,
    seed: &[Rank],
    block: &Block,
    cursor: FmCursor,
    query_pos: usize,
    errors_so_far: usize,
    config: &SearchConfig,
    out: &mut Vec<Frontier>,
) {
    if query_pos == block.pattern_end {
        if errors_so_far <= block.error_upper {
            out.push(Frontier { cursor, errors: errors_so_far });
        }
        return;
    }

    if errors_so_far > config.max_num_errors {
        return;
    }

    let text_index = block.pattern_end - 1 - (query_pos - block.pattern_start);
    let correct_rank = seed[text_index];

    for candidate_rank in 1..=(ALPHABET_SIZE as Rank) {
        if let Some(extended) = index.extend_backward(&cursor, candidate_rank) {
            let step_errors = if candidate_rank == correct_rank { 0 } else { 1 };
            let next_errors = errors_so_far + step_errors;
            if next_errors <= config.max_num_errors {
                walk_block_inner(
                    index,
                    seed,
                    block,
                    extended,
                    query_pos + 1,
                    next_errors,
                    config,
                    out,
                );
            }
        }
    }

    // deletion: reference contains a base the query doesn't; extend
    // the cursor without consuming a query position
    if errors_so_far + 1 <= config.max_num_errors {
        for candidate_rank in 1..=(ALPHABET_SIZE as Rank) {
            if let Some(extended) = index.extend_backward(&cursor, candidate_rank) {
                walk_block_inner(
                    index,
                    seed,
                    block,
                    extended,
                    query_pos,
                    errors_so_far + 1,
                    config,
                    out,
                );
            }
        }
    }

    // insertion: query contains a base the reference doesn't; consume
    // a query position without extending the cursor
    if errors_so_far + 1 <= config.max_num_errors && query_pos + 1 <= block.pattern_end {
        walk_block_inner(
            index,
            seed,
            block,
            cursor,
            query_pos + 1,
            errors_so_far + 1,
            config,
            out,
        );
    }
}
