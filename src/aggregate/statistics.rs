// Descriptive statistics for breakdown columns
//
// Mean and variance are accumulated around an f64 pilot mean: trueno's
// compensated f32 sums only see the small deviations, so long columns and
// tightly clustered latencies keep their spread. Percentiles use linear
// interpolation between order statistics (R-7).

use serde::Serialize;
use trueno::Vector;

/// Mean and sample standard deviation of a column
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Moments {
    pub mean: f64,
    /// Sample standard deviation (n - 1); undefined below two samples
    pub std: Option<f64>,
    pub count: usize,
}

fn kahan_sum(values: impl Iterator<Item = f32>) -> Option<f64> {
    let data: Vec<f32> = values.collect();
    Vector::from_slice(&data).sum_kahan().ok().map(f64::from)
}

/// Mean and sample standard deviation, `None` for an empty column
pub fn moments(values: &[f64]) -> Option<Moments> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let pilot = values.iter().sum::<f64>() / n;

    let shift = kahan_sum(values.iter().map(|&v| (v - pilot) as f32))? / n;
    let mean = pilot + shift;

    let std = if values.len() < 2 {
        None
    } else {
        let squares = kahan_sum(values.iter().map(|&v| {
            let d = v - pilot;
            (d * d) as f32
        }))?;
        let population = (squares / n - shift * shift).max(0.0);
        Some((population * n / (n - 1.0)).sqrt())
    };

    Some(Moments {
        mean,
        std,
        count: values.len(),
    })
}

/// Percentile `p` in [0, 100], `None` for an empty column
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    if sorted.len() == 1 {
        return Some(sorted[0]);
    }

    let index = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;
    if lower == upper {
        Some(sorted[lower])
    } else {
        let weight = index - lower as f64;
        Some(sorted[lower] * (1.0 - weight) + sorted[upper] * weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moments_two_samples() {
        let m = moments(&[10.0, 20.0]).unwrap();
        assert!((m.mean - 15.0).abs() < 1e-4);
        assert!((m.std.unwrap() - 50f64.sqrt()).abs() < 1e-3);
        assert_eq!(m.count, 2);
    }

    #[test]
    fn test_moments_single_sample_has_no_std() {
        let m = moments(&[42.0]).unwrap();
        assert!((m.mean - 42.0).abs() < 1e-4);
        assert_eq!(m.std, None);
    }

    #[test]
    fn test_moments_empty() {
        assert!(moments(&[]).is_none());
    }

    #[test]
    fn test_constant_column_has_zero_std() {
        let m = moments(&[5.0, 5.0, 5.0, 5.0]).unwrap();
        assert!(m.std.unwrap().abs() < 1e-6);
    }

    #[test]
    fn test_long_column_matches_f64_reference() {
        let values: Vec<f64> = (0..200_000)
            .map(|i| 100.0 + (i % 1000) as f64 * 0.001234)
            .collect();
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (n - 1.0);

        let m = moments(&values).unwrap();
        assert!((m.mean - mean).abs() < 1e-7, "mean {} vs {}", m.mean, mean);
        let std = m.std.unwrap();
        assert!((std - var.sqrt()).abs() < 1e-5, "std {} vs {}", std, var.sqrt());
    }

    #[test]
    fn test_tight_cluster_keeps_its_spread() {
        let m = moments(&[1000.00001, 1000.00003, 1000.00002, 1000.00004]).unwrap();
        assert!((m.mean - 1000.000025).abs() < 1e-9);
        // deviations of +-0.5e-5 and +-1.5e-5: sample variance 5e-10 / 3
        let expected = (5e-10f64 / 3.0).sqrt();
        assert!((m.std.unwrap() - expected).abs() < 1e-8);
    }

    #[test]
    fn test_percentile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert!((percentile(&values, 50.0).unwrap() - 2.5).abs() < 1e-4);
        assert!((percentile(&values, 0.0).unwrap() - 1.0).abs() < 1e-4);
        assert!((percentile(&values, 100.0).unwrap() - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_percentile_unsorted_input() {
        let values = [9.0, 1.0, 5.0, 7.0, 3.0];
        assert!((percentile(&values, 50.0).unwrap() - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_percentile_empty() {
        assert_eq!(percentile(&[], 99.0), None);
    }
}
