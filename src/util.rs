/// `num / den`, or 0 when there is nothing to divide by
pub fn ratio(num: u64, den: u64) -> f64 {
    match den {
        0 => 0.0,
        den => num as f64 / den as f64,
    }
}

/// One-sample proportion z-test against a known null proportion `p0`.
///
/// `se = sqrt(p0 * (1 - p0) / n)`, `z = (p_hat - p0) / se`. Returns `None`
/// for `n == 0` or a degenerate `p0`.
pub fn proportion_z_score(p_hat: f64, p0: f64, n: u64) -> Option<f64> {
    if n == 0 || p0 <= 0.0 || p0 >= 1.0 {
        return None;
    }
    let standard_error = (p0 * (1.0 - p0) / n as f64).sqrt();
    Some((p_hat - p0) / standard_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio() {
        assert_eq!(ratio(1, 4), 0.25);
        assert_eq!(ratio(3, 3), 1.0);
    }

    #[test]
    fn test_ratio_empty_denominator() {
        assert_eq!(ratio(0, 0), 0.0);
        assert_eq!(ratio(5, 0), 0.0);
    }

    #[test]
    fn test_z_score_at_null() {
        assert_eq!(proportion_z_score(0.2, 0.2, 10), Some(0.0));
    }

    #[test]
    fn test_z_score_above_chance() {
        let z = proportion_z_score(0.4, 0.2, 50).unwrap();
        assert!((z - 3.5355339059327378).abs() < 1e-12);
    }

    #[test]
    fn test_z_score_below_chance() {
        let z = proportion_z_score(0.0, 0.25, 12).unwrap();
        assert!((z - -2.0).abs() < 1e-12);
    }

    #[test]
    fn test_z_score_degenerate_inputs() {
        assert_eq!(proportion_z_score(0.5, 0.2, 0), None);
        assert_eq!(proportion_z_score(0.5, 0.0, 10), None);
        assert_eq!(proportion_z_score(0.5, 1.0, 10), None);
    }
}
