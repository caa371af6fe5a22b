use ndarray::ArrayView1;

/// Index of the largest score; the first one wins on ties.
///
/// NaN scores never win. Returns `None` for an empty or all-NaN view.
pub(crate) fn argmax(scores: ArrayView1<'_, f64>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((i, score)),
        }
    }
    best.map(|(i, _)| i)
}

/// Scales a non-negative row so it sums to one; all-zero rows stay zero.
pub(crate) fn normalize_row(row: &[f64]) -> Vec<f64> {
    let total: f64 = row.iter().sum();
    if total > 0.0 {
        row.iter().map(|v| v / total).collect()
    } else {
        vec![0.0; row.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_argmax_first_on_ties() {
        assert_eq!(argmax(array![1.0, 3.0, 3.0].view()), Some(1));
        assert_eq!(argmax(array![f64::NAN, -1.0].view()), Some(1));
        assert_eq!(argmax(ndarray::Array1::<f64>::zeros(0).view()), None);
    }

    #[test]
    fn test_normalize_row() {
        assert_eq!(normalize_row(&[1.0, 3.0]), vec![0.25, 0.75]);
        assert_eq!(normalize_row(&[0.0, 0.0]), vec![0.0, 0.0]);
    }
}
