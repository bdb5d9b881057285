//! Per-run counters and histograms. A [`Stats`] instance is built up
//! per worker thread during the run and combined at the end, so every
//! field is an associative accumulator (counts add, histograms merge
//! bucket-wise).

const LARGE_VALUES_LOG_SCALE: &[usize] = &[0, 1, 5, 10, 20, 100, 1_000, 10_000, 100_000];
const SMALL_VALUES_LINEAR_SCALE: &[usize] =
    &[0, 5, 10, 15, 20, 25, 30, 35, 40, 45, 50, 55, 60, 65, 70];
const SMALL_VALUES_LOG_SCALE: &[usize] = &[0, 1, 2, 5, 10, 20, 50, 100, 200, 500, 1000];

/// A threshold-bucketed histogram: `data[i]` counts values `v` with
/// `thresholds[i] <= v < thresholds[i + 1]` (the last bucket catches
/// everything at or above the final threshold).
#[derive(Debug, Clone)]
pub struct Histogram {
    thresholds: &'static [usize],
    data: Vec<usize>,
    num_values: usize,
}

impl Histogram {
    fn new(thresholds: &'static [usize]) -> Self {
        Self {
            thresholds,
            data: vec![0; thresholds.len()],
            num_values: 0,
        }
    }

    pub fn add_value(&mut self, value: usize) {
        let bucket = self
            .thresholds
            .iter()
            .rposition(|&threshold| value >= threshold)
            .unwrap_or(0);
        self.data[bucket] += 1;
        self.num_values += 1;
    }

    pub fn merge_with(&mut self, other: &Histogram) {
        for (a, b) in self.data.iter_mut().zip(other.data.iter()) {
            *a += b;
        }
        self.num_values += other.num_values;
    }

    pub fn num_values(&self) -> usize {
        self.num_values
    }

    pub fn format_to_string(&self, name: &str) -> String {
        let mut out = format!("{name}:");
        for (threshold, count) in self.thresholds.iter().zip(self.data.iter()) {
            out.push_str(&format!(" [>={threshold}]={count}"));
        }
        out
    }
}

/// Search-and-alignment statistics accumulated over a run, combined
/// associatively across worker threads.
#[derive(Debug, Clone)]
pub struct Stats {
    pub num_completely_excluded_queries: usize,

    pub query_lengths: Histogram,
    pub seed_lengths: Histogram,
    pub anchors_per_seed: Histogram,
    pub raw_anchors_per_excluded_seed: Histogram,
    pub anchors_per_query: Histogram,
    pub excluded_raw_anchors_per_query: Histogram,
    pub verified_span_sizes_inner_node: Histogram,
    pub verified_span_sizes_root_aligned: Histogram,
    pub verified_span_sizes_root_avoided: Histogram,
    pub alignments_per_query: Histogram,
    pub alignments_edit_distance: Histogram,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            num_completely_excluded_queries: 0,
            query_lengths: Histogram::new(LARGE_VALUES_LOG_SCALE),
            seed_lengths: Histogram::new(SMALL_VALUES_LINEAR_SCALE),
            anchors_per_seed: Histogram::new(LARGE_VALUES_LOG_SCALE),
            raw_anchors_per_excluded_seed: Histogram::new(LARGE_VALUES_LOG_SCALE),
            anchors_per_query: Histogram::new(LARGE_VALUES_LOG_SCALE),
            excluded_raw_anchors_per_query: Histogram::new(LARGE_VALUES_LOG_SCALE),
            verified_span_sizes_inner_node: Histogram::new(LARGE_VALUES_LOG_SCALE),
            verified_span_sizes_root_aligned: Histogram::new(LARGE_VALUES_LOG_SCALE),
            verified_span_sizes_root_avoided: Histogram::new(LARGE_VALUES_LOG_SCALE),
            alignments_per_query: Histogram::new(LARGE_VALUES_LOG_SCALE),
            alignments_edit_distance: Histogram::new(SMALL_VALUES_LOG_SCALE),
        }
    }
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_num_completely_excluded_queries(&mut self) {
        self.num_completely_excluded_queries += 1;
    }

    pub fn num_queries(&self) -> usize {
        self.query_lengths.num_values()
    }

    /// Folds `other` into `self`, mutating `self` in place. Intended
    /// for use as the reduction step in a parallel fold over
    /// per-worker stats.
    pub fn combine_with(&mut self, other: &Stats) {
        self.num_completely_excluded_queries += other.num_completely_excluded_queries;
        self.query_lengths.merge_with(&other.query_lengths);
        self.seed_lengths.merge_with(&other.seed_lengths);
        self.anchors_per_seed.merge_with(&other.anchors_per_seed);
        self.raw_anchors_per_excluded_seed
            .merge_with(&other.raw_anchors_per_excluded_seed);
        self.anchors_per_query.merge_with(&other.anchors_per_query);
        self.excluded_raw_anchors_per_query
            .merge_with(&other.excluded_raw_anchors_per_query);
        self.verified_span_sizes_inner_node
            .merge_with(&other.verified_span_sizes_inner_node);
        self.verified_span_sizes_root_aligned
            .merge_with(&other.verified_span_sizes_root_aligned);
        self.verified_span_sizes_root_avoided
            .merge_with(&other.verified_span_sizes_root_avoided);
        self.alignments_per_query.merge_with(&other.alignments_per_query);
        self.alignments_edit_distance
            .merge_with(&other.alignments_edit_distance);
    }

    pub fn format_statistics(&self) -> Vec<String> {
        vec![
            format!("completely excluded queries: {}", self.num_completely_excluded_queries),
            self.query_lengths.format_to_string("query lengths"),
            self.seed_lengths.format_to_string("seed lengths"),
            self.anchors_per_seed.format_to_string("anchors per (non-excluded) seed"),
            self.raw_anchors_per_excluded_seed
                .format_to_string("(raw) anchors per excluded seed"),
            self.anchors_per_query
                .format_to_string("anchors per query (from non-excluded seeds)"),
            self.excluded_raw_anchors_per_query
                .format_to_string("excluded (raw) anchors per query"),
            self.verified_span_sizes_inner_node
                .format_to_string("verified reference-span sizes (inner node)"),
            self.verified_span_sizes_root_aligned
                .format_to_string("verified reference-span sizes (root, aligned)"),
            self.verified_span_sizes_root_avoided
                .format_to_string("verified reference-span sizes (root, avoided)"),
            self.alignments_per_query.format_to_string("alignments per query"),
            self.alignments_edit_distance.format_to_string("alignment edit distance"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram_buckets_by_threshold() {
        let mut h = Histogram::new(&[0, 10, 100]);
        h.add_value(5);
        h.add_value(50);
        h.add_value(500);
        assert_eq!(h.data, vec![1, 1, 1]);
    }

    #[test]
    fn combine_is_associative_over_counts() {
        let mut a = Stats::new();
        a.increment_num_completely_excluded_queries();
        let mut b = Stats::new();
        b.increment_num_completely_excluded_queries();
        b.increment_num_completely_excluded_queries();

        a.combine_with(&b);
        assert_eq!(a.num_completely_excluded_queries, 3);
    }

    #[test]
    fn merged_histograms_preserve_total_count() {
        let mut a = Stats::new();
        a.query_lengths.add_value(100);
        let mut b = Stats::new();
        b.query_lengths.add_value(200);
        b.query_lengths.add_value(300);

        a.combine_with(&b);
        assert_eq!(a.query_lengths.num_values(), 3);
    }
}
