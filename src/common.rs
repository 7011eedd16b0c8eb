//! Common numeric helpers shared across the analytics modules

/// Calculate the mean of a slice
#[inline]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator). Zero for fewer than 2 values.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}

/// Sample covariance between two equally long series
pub fn sample_covariance(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }
    let ma = mean(&a[..n]);
    let mb = mean(&b[..n]);
    let cross: f64 = a.iter().zip(b).map(|(x, y)| (x - ma) * (y - mb)).sum();
    cross / (n - 1) as f64
}

/// Pairwise percentage change (like pandas `pct_change().dropna()`)
pub fn pct_change(values: &[f64]) -> Vec<f64> {
    if values.len() < 2 {
        return vec![];
    }
    values.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
}

/// Find the maximum value in a slice
#[inline]
pub fn max(values: &[f64]) -> f64 {
    values.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
}

/// Find the minimum value in a slice
#[inline]
pub fn min(values: &[f64]) -> f64 {
    values.iter().cloned().fold(f64::INFINITY, f64::min)
}

/// Dot product of two equally long slices
#[inline]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Equal weights summing to 1
pub fn equal_weights(n: usize) -> Vec<f64> {
    if n == 0 {
        return vec![];
    }
    vec![1.0 / n as f64; n]
}

/// Scale weights to sum to 1. Falls back to equal weights when the total is not
/// positive or not finite.
pub fn normalize_weights(weights: &[f64]) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return equal_weights(weights.len());
    }
    weights.iter().map(|w| w / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[2.0, 4.0, 6.0]), 4.0);
        assert!(mean(&[]).is_nan());
    }

    #[test]
    fn test_sample_std() {
        // pandas: pd.Series([1, 2, 3, 4]).std() == 1.2909944487358056
        let s = sample_std(&[1.0, 2.0, 3.0, 4.0]);
        assert!((s - 1.2909944487358056).abs() < 1e-12);
        assert_eq!(sample_std(&[5.0]), 0.0);
    }

    #[test]
    fn test_sample_covariance_matches_variance() {
        let v = vec![1.0, 3.0, 2.0, 5.0];
        let var = sample_std(&v).powi(2);
        assert!((sample_covariance(&v, &v) - var).abs() < 1e-12);
    }

    #[test]
    fn test_pct_change() {
        let r = pct_change(&[100.0, 110.0, 99.0]);
        assert_eq!(r.len(), 2);
        assert!((r[0] - 0.1).abs() < 1e-12);
        assert!((r[1] + 0.1).abs() < 1e-12);
        assert!(pct_change(&[1.0]).is_empty());
    }

    #[test]
    fn test_max_min() {
        let v = vec![3.0, 1.0, 4.0, 1.0, 5.0];
        assert_eq!(max(&v), 5.0);
        assert_eq!(min(&v), 1.0);
    }

    #[test]
    fn test_normalize_weights() {
        let w = normalize_weights(&[2.0, 1.0, 1.0]);
        assert_eq!(w, vec![0.5, 0.25, 0.25]);
        let w = normalize_weights(&[1.0, -1.0]);
        assert_eq!(w, vec![0.5, 0.5]);
        let w = normalize_weights(&[-3.0, 1.0]);
        assert_eq!(w, vec![0.5, 0.5]);
        let w = normalize_weights(&[f64::INFINITY, 1.0]);
        assert_eq!(w, vec![0.5, 0.5]);
    }
}
