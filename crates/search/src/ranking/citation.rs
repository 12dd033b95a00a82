//! Batch-relative citation normalization

/// Normalize citation counts against the largest count in the batch.
///
/// The most-cited paper scores exactly 1.0. A batch with no citations at all
/// (or no papers) scores all zeros. Scores depend on the batch: the same
/// paper normalizes differently next to different neighbours.
pub fn normalize_citations(counts: &[u64]) -> Vec<f64> {
    let max = counts.iter().copied().max().unwrap_or(0);
    if max == 0 {
        return vec![0.0; counts.len()];
    }

    let max = max as f64;
    counts.iter().map(|&count| count as f64 / max).collect()
}
