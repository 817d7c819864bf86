/// Pearson correlation coefficient between two equal-length series.
///
/// Returns `0.0` for mismatched or empty input, and when either series has
/// zero variance.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.is_empty() {
        return 0.0;
    }

    let len = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / len;
    let mean_y = y.iter().sum::<f64>() / len;

    let mut numer = 0.0;
    let mut denom_x = 0.0;
    let mut denom_y = 0.0;

    for (xi, yi) in x.iter().zip(y) {
        let diff_x = xi - mean_x;
        let diff_y = yi - mean_y;
        numer += diff_x * diff_y;
        denom_x += diff_x * diff_x;
        denom_y += diff_y * diff_y;
    }

    if denom_x == 0.0 || denom_y == 0.0 {
        return 0.0;
    }

    numer / (denom_x * denom_y).sqrt()
}
