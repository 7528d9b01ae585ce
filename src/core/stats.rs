pub(crate) fn rank_index(len: usize, fraction: f64) -> usize {
    debug_assert!(len > 0);
    let idx = (len as f64 * fraction).floor() as usize;
    idx.min(len - 1)
}

pub(crate) fn nearest_rank<T: Copy>(sorted: &[T], fraction: f64) -> T {
    sorted[rank_index(sorted.len(), fraction)]
}

/// 95% normal-approximation half-width for a binomial proportion.
pub(crate) fn binomial_ci_half_width(p: f64, n: u32) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let p = p.clamp(0.0, 1.0);
    1.96 * (p * (1.0 - p) / n as f64).sqrt()
}
