//! Small numeric helpers for the query engine
//!
//! Statistics that need more points than they get return `None` (or
//! `f64::INFINITY` for variance) instead of panicking or producing NaN.

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample variance (n - 1). `None` with fewer than two values.
pub fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some(ss / (values.len() - 1) as f64)
}

pub fn sample_std(values: &[f64]) -> Option<f64> {
    sample_variance(values).map(f64::sqrt)
}

/// Variance where "not enough data" is infinitely variable.
pub fn variance_or_infinite(values: &[f64]) -> f64 {
    sample_variance(values).unwrap_or(f64::INFINITY)
}

/// Pearson correlation. `None` with fewer than two points or when either
/// series is constant. Symmetric in its arguments bit for bit.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mx = mean(xs)?;
    let my = mean(ys)?;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mx;
        let dy = y - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    let denom = (sxx * syy).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    Some((sxy / denom).clamp(-1.0, 1.0))
}

/// Ordinary least squares slope of `ys` on `xs`. `None` with fewer than two
/// points or when every x is the same.
pub fn ols_slope(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mx = mean(xs)?;
    let my = mean(ys)?;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        sxy += (x - mx) * (y - my);
        sxx += (x - mx) * (x - mx);
    }
    if sxx == 0.0 {
        return None;
    }
    Some(sxy / sxx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_variance() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, 3.0]), Some(2.0));
        assert_eq!(sample_variance(&[5.0]), None);
        assert_eq!(sample_variance(&[1.0, 3.0]), Some(2.0));
        assert_eq!(variance_or_infinite(&[]), f64::INFINITY);
        let std = sample_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(std.map(|s| (s * 1e6).round()), Some(2138090.0));
    }

    #[test]
    fn test_pearson_perfect_inverse() {
        let production = [100.0, 150.0];
        let rain = [800.0, 600.0];
        assert_eq!(pearson(&production, &rain), Some(-1.0));
    }

    #[test]
    fn test_pearson_is_symmetric() {
        let xs = [3.1, 4.7, 1.2, 9.9, 5.5];
        let ys = [10.0, 7.3, 2.2, 8.8, 6.1];
        let a = pearson(&xs, &ys).unwrap();
        let b = pearson(&ys, &xs).unwrap();
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn test_undefined_statistics() {
        assert_eq!(pearson(&[1.0], &[2.0]), None);
        assert_eq!(pearson(&[1.0, 1.0], &[2.0, 3.0]), None);
        assert_eq!(ols_slope(&[2020.0], &[1.0]), None);
        assert_eq!(ols_slope(&[2020.0, 2020.0], &[1.0, 2.0]), None);
    }

    #[test]
    fn test_ols_slope() {
        assert_eq!(ols_slope(&[2019.0, 2020.0], &[100.0, 150.0]), Some(50.0));
        assert_eq!(ols_slope(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]), Some(2.0));
    }
}
