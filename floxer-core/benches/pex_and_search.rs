use criterion::{black_box, criterion_group, criterion_main, Criterion};

use floxer_core::alphabet::sanitize_to_ranks;
use floxer_core::fmindex::scheme::SearchScheme;
use floxer_core::fmindex::search::{search_seed, SearchConfig};
use floxer_core::fmindex::BidirectionalFmIndex;
use floxer_core::{PexTree, PexTreeBuildStrategy, PexTreeConfig};

fn repeated_sequence(length: usize) -> Vec<u8> {
    let pattern = b"ACGTACGTAAAACCCCGGGGTTTT";
    pattern.iter().cycle().take(length).copied().collect()
}

fn bench_pex_tree_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("pex_tree_construction");
    for query_num_errors in [1, 3, 7, 15] {
        group.bench_with_input(
            format!("errors_{query_num_errors}"),
            &query_num_errors,
            |b, &query_num_errors| {
                b.iter(|| {
                    let tree = PexTree::new(PexTreeConfig {
                        total_query_length: black_box(10_000),
                        query_num_errors,
                        leaf_max_num_errors: 1,
                        build_strategy: PexTreeBuildStrategy::BottomUp,
                    });
                    black_box(tree.num_leaves())
                })
            },
        );
    }
    group.finish();
}

fn bench_seed_search(c: &mut Criterion) {
    let reference = sanitize_to_ranks(&repeated_sequence(50_000)).0;
    let index = BidirectionalFmIndex::build(&[reference]);
    let seed = sanitize_to_ranks(b"ACGTACGTAAAACCCCGGGGTTTT").0;

    let mut group = c.benchmark_group("seed_search");
    for seed_errors in [0, 1, 2, 3] {
        let scheme = SearchScheme::generate(seed.len(), seed_errors);
        let config = SearchConfig { max_num_errors: seed_errors, max_num_raw_anchors: 500 };

        group.bench_with_input(
            format!("errors_{seed_errors}"),
            &seed_errors,
            |b, _| {
                b.iter(|| black_box(search_seed(&index, &seed, &scheme, &config)))
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_pex_tree_construction, bench_seed_search);
criterion_main!(benches);
