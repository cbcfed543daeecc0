//! Linear correlation diagnostic

/// Pearson correlation coefficient of two equally long series.
///
/// `None` for fewer than 2 points, mismatched lengths, or a series with zero
/// variance.
pub fn correlation(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let n = x.len() as f64;

    let (mut sx, mut sy, mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for (&a, &b) in x.iter().zip(y) {
        sx += a;
        sy += b;
        sxy += a * b;
        sxx += a * a;
        syy += b * b;
    }

    let var_x = n * sxx - sx * sx;
    let var_y = n * syy - sy * sy;
    if var_x <= 0.0 || var_y <= 0.0 {
        return None;
    }
    Some((n * sxy - sx * sy) / (var_x * var_y).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_perfect_linear() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [3.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(correlation(&x, &y).unwrap(), 1.0, epsilon = 1e-12);

        let y_neg = [9.0, 7.0, 5.0, 3.0];
        assert_relative_eq!(correlation(&x, &y_neg).unwrap(), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(correlation(&[1.0], &[2.0]).is_none());
        assert!(correlation(&[1.0, 2.0], &[5.0, 5.0]).is_none());
        assert!(correlation(&[1.0, 2.0, 3.0], &[1.0, 2.0]).is_none());
    }
}
