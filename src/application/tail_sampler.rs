// Tail sampler - Fixed-size picks for sparkline tiles
use crate::domain::series::Sample;

/// At most `n` items by even positional stride: index `floor(i * len / n)`
/// for `i` in `0..n`. Short inputs come back whole.
///
/// Skips rather than averages; cheap and deterministic, good enough for a
/// sparkline.
pub fn tail<T: Clone>(items: &[T], n: usize) -> Vec<T> {
    let len = items.len();
    if len <= n {
        return items.to_vec();
    }
    (0..n)
        .map(|i| (i as u128 * len as u128 / n as u128) as usize)
        .map(|idx| items[idx].clone())
        .collect()
}

pub fn tail_samples(points: &[Sample], n: usize) -> Vec<f64> {
    let values: Vec<f64> = points.iter().map(|p| p.value).collect();
    tail(&values, n)
}
