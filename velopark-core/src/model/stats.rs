//! population statistics over f64 samples. every function returns None
//! instead of NaN for degenerate inputs so that undefined values can be
//! turned into pair exclusions rather than leaking into artifacts.

/// arithmetic mean. None for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// population variance, (1/n) * sum((x - mean)^2)
pub fn variance(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    Some(values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / values.len() as f64)
}

pub fn std_dev(values: &[f64]) -> Option<f64> {
    variance(values).map(f64::sqrt)
}

/// population covariance of two equal-length series
pub fn covariance(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() {
        return None;
    }
    let mx = mean(x)?;
    let my = mean(y)?;
    let sum: f64 = x.iter().zip(y.iter()).map(|(a, b)| (a - mx) * (b - my)).sum();
    Some(sum / x.len() as f64)
}

/// Pearson correlation coefficient, covariance / (sigma_x * sigma_y).
/// None when the lengths differ, a series is empty, or either standard
/// deviation is zero: the coefficient is undefined for constant series.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() {
        return None;
    }
    let sx = std_dev(x)?;
    let sy = std_dev(y)?;
    if sx == 0.0 || sy == 0.0 {
        return None;
    }
    covariance(x, y).map(|cov| cov / (sx * sy))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_variance() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&values), Some(5.0));
        assert_eq!(variance(&values), Some(4.0));
        assert_eq!(std_dev(&values), Some(2.0));
    }

    #[test]
    fn test_empty_series_undefined() {
        assert_eq!(mean(&[]), None);
        assert_eq!(variance(&[]), None);
        assert_eq!(pearson(&[], &[]), None);
    }

    #[test]
    fn test_pearson_perfect_inverse() {
        // worked example: perfectly inverse delta series
        let x = [1.0, -1.0, 2.0, -2.0, 1.0];
        let y = [-1.0, 1.0, -2.0, 2.0, -1.0];
        let r = pearson(&x, &y).unwrap();
        assert!((r + 1.0).abs() < 1e-12, "expected r = -1.0, got {r}");
    }

    #[test]
    fn test_pearson_symmetric() {
        let x = [0.3, -1.2, 4.0, 2.5, -0.7, 1.1];
        let y = [1.0, 0.2, -3.3, 0.9, 2.4, -1.5];
        assert_eq!(pearson(&x, &y), pearson(&y, &x));
    }

    #[test]
    fn test_pearson_bounded() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.1, 3.9, 6.2, 7.8, 10.1];
        let r = pearson(&x, &y).unwrap();
        assert!(r.abs() <= 1.0 + 1e-9);
        assert!(r > 0.99);
    }

    #[test]
    fn test_pearson_zero_variance_undefined() {
        let constant = [3.0, 3.0, 3.0, 3.0];
        let varying = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(pearson(&constant, &varying), None);
        assert_eq!(pearson(&varying, &constant), None);
    }

    #[test]
    fn test_pearson_length_mismatch_undefined() {
        assert_eq!(pearson(&[1.0, 2.0], &[1.0, 2.0, 3.0]), None);
    }
}
