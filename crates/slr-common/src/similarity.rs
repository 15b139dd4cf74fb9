/// Vector similarity helpers shared by deduplication and the semantic layer.

/// Cosine similarity of two vectors.
/// Returns `None` for mismatched lengths, empty vectors, or zero-norm input.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    Some(dot / (norm_a * norm_b))
}

/// Highest similarity of `query` against `candidates`, with the index of the
/// first candidate reaching it. Earlier candidates win ties.
pub fn best_match(query: &[f32], candidates: &[Vec<f32>]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (i, c) in candidates.iter().enumerate() {
        if let Some(sim) = cosine_similarity(query, c) {
            match best {
                Some((_, b)) if sim <= b => {}
                _ => best = Some((i, sim)),
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_vectors_are_one() {
        let v = [0.3, 0.4, 0.5];
        assert!((cosine_similarity(&v, &v).unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_orthogonal_vectors_are_zero() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap().abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(cosine_similarity(&[1.0], &[1.0, 2.0]).is_none());
        assert!(cosine_similarity(&[], &[]).is_none());
        assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).is_none());
    }

    #[test]
    fn test_best_match_prefers_earlier_on_tie() {
        let candidates = vec![vec![1.0, 0.0], vec![2.0, 0.0], vec![0.0, 1.0]];
        let (idx, sim) = best_match(&[1.0, 0.0], &candidates).unwrap();
        assert_eq!(idx, 0);
        assert!((sim - 1.0).abs() < 1e-9);
    }
}
