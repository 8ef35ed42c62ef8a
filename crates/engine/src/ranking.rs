//! Cross-sectional percentile ranking.
//!
//! Recomputed from scratch at every rebalance over the in-memory
//! universe; no persistent rank state.

use ordered_float::OrderedFloat;

/// Average-rank percentile ranks.
///
/// For each value, the fraction of values less than or equal to it,
/// with ties resolved by averaging their ordinal ranks. Output aligns
/// with the input; values in (0, 1], higher value = higher percentile.
pub fn percentile_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by_key(|&i| OrderedFloat(values[i]));

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        // Extend over the tie run starting at i.
        let mut j = i;
        while j + 1 < n && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        // Ordinal ranks are 1-based: positions i..=j average to (i+j)/2 + 1.
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for k in i..=j {
            ranks[order[k]] = avg_rank / n as f64;
        }
        i = j + 1;
    }
    ranks
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_distinct_values() {
        let ranks = percentile_ranks(&[30.0, 10.0, 20.0]);
        assert_relative_eq!(ranks[0], 3.0 / 3.0);
        assert_relative_eq!(ranks[1], 1.0 / 3.0);
        assert_relative_eq!(ranks[2], 2.0 / 3.0);
    }

    #[test]
    fn test_ties_take_average_rank() {
        // Ordinal ranks: 10 -> 1, the two 20s -> (2+3)/2 = 2.5, 30 -> 4.
        let ranks = percentile_ranks(&[20.0, 10.0, 20.0, 30.0]);
        assert_relative_eq!(ranks[0], 2.5 / 4.0);
        assert_relative_eq!(ranks[1], 1.0 / 4.0);
        assert_relative_eq!(ranks[2], 2.5 / 4.0);
        assert_relative_eq!(ranks[3], 4.0 / 4.0);
    }

    #[test]
    fn test_single_and_empty() {
        assert!(percentile_ranks(&[]).is_empty());
        let ranks = percentile_ranks(&[42.0]);
        assert_relative_eq!(ranks[0], 1.0);
    }

    #[test]
    fn test_all_equal() {
        let ranks = percentile_ranks(&[5.0, 5.0, 5.0, 5.0]);
        for r in ranks {
            assert_relative_eq!(r, 2.5 / 4.0);
        }
    }
}
