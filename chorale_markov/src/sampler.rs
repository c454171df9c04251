// Weighted draw from a successor count distribution.

use chorale_prng::ChoraleRng;
use std::collections::BTreeMap;

/// Pick one key with probability `count / total`.
///
/// Draws an integer in `[0, total)` and walks the cumulative counts, so
/// there is no floating-point rounding bias and every key with a positive
/// count is reachable. Returns `None` for an empty or all-zero map.
pub fn sample_weighted<'a, K: Ord>(
    counts: &'a BTreeMap<K, u32>,
    rng: &mut ChoraleRng,
) -> Option<&'a K> {
    let total: u64 = counts.values().map(|&c| u64::from(c)).sum();
    if total == 0 {
        return None;
    }

    let mut target = rng.range_u64(0, total);
    for (key, &count) in counts {
        let count = u64::from(count);
        if target < count {
            return Some(key);
        }
        target -= count;
    }
    None
}
