// Descriptive statistics over record samples.
//
// Uses trueno::Vector for SIMD-optimized mean and standard deviation.
// Note: trueno computes population statistics (divide by n). The
// least-squares slope is computed directly since trueno has no
// regression primitive.

use trueno::Vector;

/// Arithmetic mean; 0 for an empty sample.
pub fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    Vector::from_slice(values).mean().unwrap_or(0.0)
}

/// Population standard deviation; 0 for an empty sample.
pub fn stddev(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    Vector::from_slice(values).stddev().unwrap_or(0.0)
}

/// Stability of a sample: `1 - stddev/mean`, 0 when the mean is 0.
pub fn consistency(values: &[f32]) -> f32 {
    let m = mean(values);
    if m > 0.0 {
        1.0 - stddev(values) / m
    } else {
        0.0
    }
}

/// Least-squares slope of values over their 0..n index.
pub fn slope(values: &[f32]) -> f32 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }

    // Closed forms for sum(x) and sum(x^2) over x = 0..n
    let n_f = n as f64;
    let sum_x = (n * (n - 1)) as f64 / 2.0;
    let sum_x2 = ((n - 1) * n * (2 * n - 1)) as f64 / 6.0;

    let mut sum_y = 0.0f64;
    let mut sum_xy = 0.0f64;
    for (i, &y) in values.iter().enumerate() {
        sum_y += y as f64;
        sum_xy += i as f64 * y as f64;
    }

    let denom = n_f * sum_x2 - sum_x * sum_x;
    if denom == 0.0 {
        return 0.0;
    }
    ((n_f * sum_xy - sum_x * sum_y) / denom) as f32
}

/// Round to 2 decimal places at reporting boundaries.
pub fn round2(x: f32) -> f32 {
    (x * 100.0).round() / 100.0
}
