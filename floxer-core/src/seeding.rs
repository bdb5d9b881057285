//! Turns a PEX tree's leaves into the seeds handed to the FM-index
//! searcher: one seed per leaf, carrying the leaf's query slice, its
//! allowed error count, and its offset into the full query.

use crate::alphabet::Rank;
use crate::pex::PexTree;

#[derive(Debug, Clone)]
pub struct Seed<'q> {
    pub sequence: &'q [Rank],
    pub num_errors: usize,
    pub query_position: usize,
}

pub fn generate_seeds<'q>(tree: &PexTree, query_rank_sequence: &'q [Rank]) -> Vec<Seed<'q>> {
    tree.leaves()
        .iter()
        .map(|leaf| Seed {
            sequence: &query_rank_sequence[leaf.query_index_from..=leaf.query_index_to],
            num_errors: leaf.num_errors,
            query_position: leaf.query_index_from,
        })
        .collect()
}
