//! Correlation and significance helpers on top of `statrs`.

use statrs::distribution::{ContinuousCDF, StudentsT};
use statrs::statistics::Statistics;

const MIN_SPREAD: f64 = 1e-9;

/// Pearson correlation. With a 0/1 series this is the point-biserial
/// coefficient. `None` when either series is constant or lengths differ.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let sx = xs.iter().population_std_dev();
    let sy = ys.iter().population_std_dev();
    if sx < MIN_SPREAD || sy < MIN_SPREAD {
        return None;
    }
    let cov = xs.iter().population_covariance(ys.iter());
    Some((cov / (sx * sy)).clamp(-1.0, 1.0))
}

/// Two-sided p-value of `r` under H0: ρ = 0, via Student's t with n - 2
/// degrees of freedom.
pub fn p_value(r: f64, n: usize) -> f64 {
    if n < 3 {
        return 1.0;
    }
    let r2 = r * r;
    if r2 >= 1.0 {
        return 0.0;
    }
    let df = (n - 2) as f64;
    let t = r.abs() * (df / (1.0 - r2)).sqrt();
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => (2.0 * (1.0 - dist.cdf(t))).clamp(0.0, 1.0),
        Err(_) => 1.0,
    }
}

/// Standard scores using the population standard deviation.
pub fn z_scores(values: &[f64]) -> Vec<f64> {
    let mean = values.iter().mean();
    let sd = values.iter().population_std_dev();
    if !(sd > MIN_SPREAD) {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - mean) / sd).collect()
}

/// Difference of the outcome mean between condition days and the rest,
/// in outcome standard deviations.
pub fn effect_size(outcomes: &[f64], on_condition: &[bool]) -> f64 {
    let sd = outcomes.iter().population_std_dev();
    if !(sd > MIN_SPREAD) {
        return 0.0;
    }
    let mut on = Vec::new();
    let mut off = Vec::new();
    for (v, flag) in outcomes.iter().zip(on_condition) {
        if *flag {
            on.push(*v);
        } else {
            off.push(*v);
        }
    }
    if on.is_empty() || off.is_empty() {
        return 0.0;
    }
    (on.iter().mean() - off.iter().mean()) / sd
}
