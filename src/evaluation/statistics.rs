//! Descriptive statistics, the Mann-Whitney U test and a log-linear trend fit.

use serde::{Deserialize, Serialize};
use std::f64::consts::SQRT_2;

/// Tie-free samples get an exact p-value when the smaller one has at most
/// this many observations
const EXACT_MAX_SIZE: usize = 8;

/// Count, moments and quartiles of one sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1); NaN for a single observation
    pub std: f64,
    pub min: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub max: f64,
}

/// Two-sided Mann-Whitney U test outcome
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MannWhitney {
    /// U statistic of the first sample
    pub u: f64,
    pub p: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub stars: f64,
    pub value: f64,
}

/// Least-squares fit of `value = slope * log10(stars) + intercept`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogTrend {
    pub slope: f64,
    pub intercept: f64,
    /// Pearson correlation between log10(stars) and value
    pub r: f64,
    pub points: Vec<TrendPoint>,
}

/// Summarize a sample; `None` when it is empty
pub fn describe(values: &[f64]) -> Option<Summary> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let std = if n > 1 {
        let ss: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (n - 1) as f64).sqrt()
    } else {
        f64::NAN
    };

    Some(Summary {
        count: n,
        mean,
        std,
        min: sorted[0],
        p25: percentile(&sorted, 0.25),
        p50: percentile(&sorted, 0.50),
        p75: percentile(&sorted, 0.75),
        max: sorted[n - 1],
    })
}

/// Linear-interpolated quantile of an already sorted, non-empty sample
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (position - lower as f64)
}

/// Two-sided Mann-Whitney U test. `None` if either sample is empty.
///
/// Without ties and with the smaller sample at or below [`EXACT_MAX_SIZE`],
/// the p-value comes from the exact null distribution of U. Otherwise it uses
/// the normal approximation with tie and continuity correction.
pub fn mann_whitney_u(x: &[f64], y: &[f64]) -> Option<MannWhitney> {
    if x.is_empty() || y.is_empty() {
        return None;
    }

    let n1 = x.len() as f64;
    let n2 = y.len() as f64;
    let mut combined: Vec<(f64, bool)> = x
        .iter()
        .map(|v| (*v, true))
        .chain(y.iter().map(|v| (*v, false)))
        .collect();
    combined.sort_by(|a, b| a.0.total_cmp(&b.0));

    let n = combined.len();
    let mut rank_sum_x = 0.0;
    let mut tie_term = 0.0;
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && combined[j + 1].0 == combined[i].0 {
            j += 1;
        }
        // Midrank of positions i..=j (1-based)
        let rank = (i + j) as f64 / 2.0 + 1.0;
        let from_x = combined[i..=j].iter().filter(|(_, is_x)| *is_x).count();
        rank_sum_x += rank * from_x as f64;

        let ties = (j - i + 1) as f64;
        tie_term += ties.powi(3) - ties;
        i = j + 1;
    }

    let u1 = rank_sum_x - n1 * (n1 + 1.0) / 2.0;
    let u2 = n1 * n2 - u1;
    let big_u = u1.max(u2);

    let total = n as f64;
    let mean = n1 * n2 / 2.0;
    let variance = n1 * n2 / 12.0 * ((total + 1.0) - tie_term / (total * (total - 1.0)));

    let p = if tie_term == 0.0 && x.len().min(y.len()) <= EXACT_MAX_SIZE {
        exact_p_value(big_u, x.len(), y.len())
    } else if variance > 0.0 {
        let z = (big_u - mean - 0.5) / variance.sqrt();
        erfc(z / SQRT_2).min(1.0)
    } else {
        1.0
    };

    Some(MannWhitney { u: u1, p })
}

/// Two-sided p-value of a tie-free U statistic: twice P(U >= `big_u`)
fn exact_p_value(big_u: f64, n1: usize, n2: usize) -> f64 {
    let counts = u_distribution(n1.min(n2), n1.max(n2));
    let total: f64 = counts.iter().sum();
    let upper: f64 = counts.iter().skip(big_u.round() as usize).sum();
    (2.0 * upper / total).min(1.0)
}

/// Number of orderings producing each U value for sample sizes `m` and `n`.
///
/// Builds the counts one element of the second sample at a time; only
/// additions are involved, so large counts lose no precision to cancellation.
fn u_distribution(m: usize, n: usize) -> Vec<f64> {
    // rows[i]: counts for sizes (i, j) at the current j
    let mut rows: Vec<Vec<f64>> = vec![vec![1.0]; m + 1];
    for j in 1..=n {
        let mut next: Vec<Vec<f64>> = Vec::with_capacity(m + 1);
        next.push(vec![1.0]);
        for i in 1..=m {
            let mut counts = vec![0.0; i * j + 1];
            // Largest value from the second sample: U unchanged
            for (k, c) in rows[i].iter().enumerate() {
                counts[k] += c;
            }
            // Largest value from the first sample: it exceeds all j others
            for (k, c) in next[i - 1].iter().enumerate() {
                counts[k + j] += c;
            }
            next.push(counts);
        }
        rows = next;
    }
    rows.swap_remove(m)
}

/// Fit `value` against log10(`stars`) and sample `points` positions along the
/// fitted line. Pairs with non-positive stars are excluded. `None` when fewer
/// than two usable pairs remain or all usable stars are equal.
pub fn log_trend(stars: &[f64], values: &[f64], points: usize) -> Option<LogTrend> {
    let pairs: Vec<(f64, f64)> = stars
        .iter()
        .zip(values)
        .filter(|(s, v)| **s > 0.0 && s.is_finite() && v.is_finite())
        .map(|(s, v)| (s.log10(), *v))
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;
    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        sxx += (x - mean_x).powi(2);
        sxy += (x - mean_x) * (y - mean_y);
        syy += (y - mean_y).powi(2);
    }
    if sxx == 0.0 {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    let r = if syy > 0.0 { sxy / (sxx * syy).sqrt() } else { 0.0 };

    let min_x = pairs.iter().map(|(x, _)| *x).fold(f64::INFINITY, f64::min);
    let max_x = pairs.iter().map(|(x, _)| *x).fold(f64::NEG_INFINITY, f64::max);
    let points = (0..points)
        .map(|k| {
            let x = if points > 1 {
                min_x + (max_x - min_x) * k as f64 / (points - 1) as f64
            } else {
                min_x
            };
            TrendPoint {
                stars: 10f64.powf(x),
                value: slope * x + intercept,
            }
        })
        .collect();

    Some(LogTrend {
        slope,
        intercept,
        r,
        points,
    })
}

/// Complementary error function (Chebyshev fit, fractional error below 1.2e-7)
fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let ans = t * (-z * z - 1.265_512_23
        + t * (1.000_023_68
            + t * (0.374_091_96
                + t * (0.096_784_18
                    + t * (-0.186_288_06
                        + t * (0.278_868_07
                            + t * (-1.135_203_98
                                + t * (1.488_515_87
                                    + t * (-0.822_152_23 + t * 0.170_872_77)))))))))
        .exp();
    if x >= 0.0 {
        ans
    } else {
        2.0 - ans
    }
}
