use rayon::prelude::*;

use crate::model::delta::DeltaSeries;
use crate::model::stats;

/// why a pair was left out of a window's output. exclusions are not
/// errors: each one shrinks the output set and is tallied into
/// [`ExclusionCounts`] for observability. absence of evidence is distinct
/// from evidence of no correlation, so an excluded pair is never scored
/// as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairExclusion {
    /// fewer aligned samples than min_common_points
    InsufficientSamples,
    /// zero variance on at least one side, Pearson r undefined
    UndefinedCorrelation,
}

/// per-window exclusion tallies, rolled up into the artifact counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExclusionCounts {
    pub insufficient_samples: usize,
    pub undefined_correlation: usize,
}

impl ExclusionCounts {
    pub fn total(&self) -> usize {
        self.insufficient_samples + self.undefined_correlation
    }

    fn add(&mut self, exclusion: PairExclusion) {
        match exclusion {
            PairExclusion::InsufficientSamples => self.insufficient_samples += 1,
            PairExclusion::UndefinedCorrelation => self.undefined_correlation += 1,
        }
    }
}

/// a pair that survived alignment and correlation, before distance
/// weighting and scoring
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelatedPair {
    pub car: String,
    pub bike: String,
    pub r: f64,
    pub n: usize,
}

/// inner join of two delta series on exact timestamps. both inputs are
/// ordered, so a two-pointer merge materializes the aligned values in one
/// pass. mismatched sampling grids simply shrink the result; there is no
/// resampling or interpolation.
pub fn align(x: &DeltaSeries, y: &DeltaSeries) -> (Vec<f64>, Vec<f64>) {
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < x.points.len() && j < y.points.len() {
        let (tx, vx) = x.points[i];
        let (ty, vy) = y.points[j];
        match tx.cmp(&ty) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                xs.push(vx);
                ys.push(vy);
                i += 1;
                j += 1;
            }
        }
    }
    (xs, ys)
}

/// correlates one (car, bike) delta-series pair for the current window
pub fn correlate_pair(
    car: &DeltaSeries,
    bike: &DeltaSeries,
    min_common_points: usize,
) -> Result<(f64, usize), PairExclusion> {
    let (xs, ys) = align(car, bike);
    if xs.len() < min_common_points {
        return Err(PairExclusion::InsufficientSamples);
    }
    match stats::pearson(&xs, &ys) {
        Some(r) if r.is_finite() => Ok((r, xs.len())),
        _ => Err(PairExclusion::UndefinedCorrelation),
    }
}

/// computes Pearson r for every (car, bike) combination. pair
/// computations are independent, so the outer product is parallelized
/// across cars; each task only appends to its own result vector.
pub fn correlate_all(
    cars: &[(String, DeltaSeries)],
    bikes: &[(String, DeltaSeries)],
    min_common_points: usize,
) -> (Vec<CorrelatedPair>, ExclusionCounts) {
    let outcomes: Vec<Result<CorrelatedPair, PairExclusion>> = cars
        .par_iter()
        .flat_map(|(car_id, car_series)| {
            bikes
                .iter()
                .map(|(bike_id, bike_series)| {
                    correlate_pair(car_series, bike_series, min_common_points).map(|(r, n)| {
                        CorrelatedPair {
                            car: car_id.clone(),
                            bike: bike_id.clone(),
                            r,
                            n,
                        }
                    })
                })
                .collect::<Vec<_>>()
        })
        .collect();

    let mut counts = ExclusionCounts::default();
    let mut pairs = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(pair) => pairs.push(pair),
            Err(exclusion) => counts.add(exclusion),
        }
    }
    (pairs, counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn series(points: &[(u32, f64)]) -> DeltaSeries {
        DeltaSeries {
            points: points.iter().map(|(h, v)| (ts(*h), *v)).collect(),
            gaps_dropped: 0,
        }
    }

    #[test]
    fn test_align_inner_join() {
        let x = series(&[(1, 1.0), (2, 2.0), (4, 4.0)]);
        let y = series(&[(2, -2.0), (3, -3.0), (4, -4.0)]);
        let (xs, ys) = align(&x, &y);
        assert_eq!(xs, vec![2.0, 4.0]);
        assert_eq!(ys, vec![-2.0, -4.0]);
    }

    #[test]
    fn test_align_disjoint_grids() {
        let x = series(&[(1, 1.0), (3, 3.0)]);
        let y = series(&[(2, 2.0), (4, 4.0)]);
        let (xs, ys) = align(&x, &y);
        assert!(xs.is_empty() && ys.is_empty());
    }

    #[test]
    fn test_perfect_inverse_pair() {
        let x = series(&[(1, 1.0), (2, -1.0), (3, 2.0), (4, -2.0), (5, 1.0)]);
        let y = series(&[(1, -1.0), (2, 1.0), (3, -2.0), (4, 2.0), (5, -1.0)]);
        let (r, n) = correlate_pair(&x, &y, 5).unwrap();
        assert_eq!(n, 5);
        assert!((r + 1.0).abs() < 1e-12, "expected r = -1.0, got {r}");
    }

    #[test]
    fn test_insufficient_samples_excluded() {
        let x = series(&[(1, 1.0), (2, -1.0), (3, 2.0)]);
        let y = series(&[(1, -1.0), (2, 1.0), (3, -2.0)]);
        assert_eq!(
            correlate_pair(&x, &y, 4),
            Err(PairExclusion::InsufficientSamples)
        );
    }

    #[test]
    fn test_zero_variance_excluded() {
        let x = series(&[(1, 3.0), (2, 3.0), (3, 3.0)]);
        let y = series(&[(1, -1.0), (2, 1.0), (3, -2.0)]);
        assert_eq!(
            correlate_pair(&x, &y, 2),
            Err(PairExclusion::UndefinedCorrelation)
        );
    }

    #[test]
    fn test_correlate_all_tallies_exclusions() {
        let cars = vec![
            (
                String::from("c1"),
                series(&[(1, 1.0), (2, -1.0), (3, 2.0), (4, -2.0)]),
            ),
            (String::from("c2"), series(&[(1, 5.0), (2, 5.0)])),
        ];
        let bikes = vec![
            (
                String::from("b1"),
                series(&[(1, -1.0), (2, 1.0), (3, -2.0), (4, 2.0)]),
            ),
            // constant within the aligned range against c1
            (
                String::from("b2"),
                series(&[(1, 7.0), (2, 7.0), (3, 7.0), (4, 7.0)]),
            ),
        ];
        let (pairs, counts) = correlate_all(&cars, &bikes, 3);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].car, "c1");
        assert_eq!(pairs[0].bike, "b1");
        assert_eq!(pairs[0].n, 4);
        // c1/b2 has zero variance on the bike side; c2 aligns on too few
        // samples against both bikes
        assert_eq!(counts.undefined_correlation, 1);
        assert_eq!(counts.insufficient_samples, 2);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_widening_window_never_shrinks_n() {
        // the same series truncated to a narrow window aligns on fewer
        // samples than the full series
        let full_x = series(&[(1, 1.0), (2, -1.0), (3, 2.0), (4, -2.0), (5, 1.0)]);
        let full_y = series(&[(1, -2.0), (2, 1.0), (3, -1.0), (4, 2.0), (5, -1.0)]);
        let narrow_x = series(&[(3, 2.0), (4, -2.0), (5, 1.0)]);
        let narrow_y = series(&[(3, -1.0), (4, 2.0), (5, -1.0)]);
        let (_, n_full) = correlate_pair(&full_x, &full_y, 2).unwrap();
        let (_, n_narrow) = correlate_pair(&narrow_x, &narrow_y, 2).unwrap();
        assert!(n_full >= n_narrow);
    }
}
