use chrono::{NaiveDateTime, TimeDelta};
use itertools::Itertools;

use crate::model::Observation;

/// the first-difference series of an entity's free-slot counts within one
/// lookback window. deltas exist only between consecutive observations of
/// the same entity; there is no interpolation across gaps, so one missing
/// value breaks exactly one delta.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeltaSeries {
    /// (timestamp of the later observation, change in free slots), ordered
    pub points: Vec<(NaiveDateTime, f64)>,
    /// consecutive pairs dropped by the stale-data guard
    pub gaps_dropped: usize,
}

impl DeltaSeries {
    /// builds the delta series over observations at or after
    /// `window_start`. consecutive observations separated by more than
    /// `max_stale_gap` produce no delta: a provider outage must not
    /// manufacture one spurious spike spanning the gap.
    pub fn from_observations(
        observations: &[Observation],
        window_start: NaiveDateTime,
        max_stale_gap: TimeDelta,
    ) -> DeltaSeries {
        let mut points = Vec::new();
        let mut gaps_dropped = 0;
        let in_window = observations.iter().filter(|o| o.timestamp >= window_start);
        for (prev, next) in in_window.tuple_windows() {
            if next.timestamp - prev.timestamp > max_stale_gap {
                gaps_dropped += 1;
            } else {
                points.push((next.timestamp, next.free - prev.free));
            }
        }
        DeltaSeries {
            points,
            gaps_dropped,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(hour: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(hour, min, 0)
            .unwrap()
    }

    fn obs(hour: u32, min: u32, free: f64) -> Observation {
        Observation {
            timestamp: ts(hour, min),
            free,
            total: Some(100.0),
        }
    }

    fn gap() -> TimeDelta {
        TimeDelta::hours(2)
    }

    #[test]
    fn test_consecutive_differences() {
        let observations = [obs(8, 0, 10.0), obs(9, 0, 7.0), obs(10, 0, 12.0)];
        let series = DeltaSeries::from_observations(&observations, ts(0, 0), gap());
        assert_eq!(
            series.points,
            vec![(ts(9, 0), -3.0), (ts(10, 0), 5.0)]
        );
        assert_eq!(series.gaps_dropped, 0);
    }

    #[test]
    fn test_stale_gap_drops_one_delta_only() {
        // outage between 9:00 and 14:00; the remaining deltas survive
        let observations = [
            obs(8, 0, 10.0),
            obs(9, 0, 8.0),
            obs(14, 0, 50.0),
            obs(15, 0, 48.0),
        ];
        let series = DeltaSeries::from_observations(&observations, ts(0, 0), gap());
        assert_eq!(
            series.points,
            vec![(ts(9, 0), -2.0), (ts(15, 0), -2.0)]
        );
        assert_eq!(series.gaps_dropped, 1);
    }

    #[test]
    fn test_length_identity() {
        // len(deltas) == len(observations in window) - 1 - gaps_dropped
        let observations = [
            obs(8, 0, 1.0),
            obs(9, 0, 2.0),
            obs(13, 0, 3.0),
            obs(13, 30, 4.0),
            obs(18, 0, 5.0),
        ];
        let series = DeltaSeries::from_observations(&observations, ts(0, 0), gap());
        assert_eq!(
            series.len(),
            observations.len() - 1 - series.gaps_dropped
        );
        assert_eq!(series.gaps_dropped, 2);
    }

    #[test]
    fn test_window_start_restricts_observations() {
        let observations = [obs(8, 0, 10.0), obs(9, 0, 7.0), obs(10, 0, 12.0)];
        let series = DeltaSeries::from_observations(&observations, ts(9, 0), gap());
        // the 8:00 observation is outside the window, so only one delta
        assert_eq!(series.points, vec![(ts(10, 0), 5.0)]);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(DeltaSeries::from_observations(&[], ts(0, 0), gap()).is_empty());
        let single = [obs(8, 0, 10.0)];
        let series = DeltaSeries::from_observations(&single, ts(0, 0), gap());
        assert!(series.is_empty());
        assert_eq!(series.gaps_dropped, 0);
    }
}
