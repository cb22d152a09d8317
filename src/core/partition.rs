/// Splits `runs` simulation runs across `workers` chunks.
///
/// Every chunk gets `runs / workers`; the remainder goes entirely to the
/// last chunk. When `runs < workers` the leading chunks are zero-sized,
/// which downstream execution treats as valid no-ops.
pub fn chunk_sizes(runs: usize, workers: usize) -> Vec<usize> {
    debug_assert!(workers >= 1);
    let base = runs / workers;
    let mut sizes = vec![base; workers];
    if let Some(last) = sizes.last_mut() {
        *last += runs % workers;
    }
    sizes
}

/// Starting global run index of each chunk, from cumulative sizes.
pub fn chunk_offsets(sizes: &[usize]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(sizes.len());
    let mut acc = 0;
    for &size in sizes {
        offsets.push(acc);
        acc += size;
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert_eq, proptest};

    #[test]
    fn remainder_goes_to_last_chunk() {
        assert_eq!(chunk_sizes(7, 3), vec![2, 2, 3]);
    }

    #[test]
    fn fewer_runs_than_workers_pads_with_zero_chunks() {
        assert_eq!(chunk_sizes(2, 5), vec![0, 0, 0, 0, 2]);
    }

    #[test]
    fn exact_division_has_no_remainder() {
        assert_eq!(chunk_sizes(12, 4), vec![3, 3, 3, 3]);
    }

    #[test]
    fn single_worker_takes_everything() {
        assert_eq!(chunk_sizes(9, 1), vec![9]);
    }

    #[test]
    fn offsets_are_cumulative() {
        assert_eq!(chunk_offsets(&[2, 2, 3]), vec![0, 2, 4]);
        assert_eq!(chunk_offsets(&[0, 0, 2]), vec![0, 0, 0]);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn sizes_sum_to_run_count(runs in 0usize..10_000, workers in 1usize..64) {
            let sizes = chunk_sizes(runs, workers);
            prop_assert_eq!(sizes.len(), workers);
            prop_assert_eq!(sizes.iter().sum::<usize>(), runs);
        }

        #[test]
        fn all_but_last_equal_floor(runs in 0usize..10_000, workers in 1usize..64) {
            let sizes = chunk_sizes(runs, workers);
            let base = runs / workers;
            for &size in &sizes[..workers - 1] {
                prop_assert_eq!(size, base);
            }
            prop_assert_eq!(sizes[workers - 1], base + runs % workers);
        }
    }
}
