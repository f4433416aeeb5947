use chrono::{NaiveDateTime, TimeDelta};
use itertools::Itertools;

use crate::model::artifact::{
    CorrelationArtifact, CorrelationCounts, ARTIFACT_TIME_FORMAT,
};
use crate::model::correlation;
use crate::model::delta::DeltaSeries;
use crate::model::distance::GeoDistanceIndex;
use crate::model::history::HistoryStore;
use crate::model::ranking;
use crate::model::{AnalysisConfig, EngineError, EntityClass};

/// the correlation method tag embedded in every artifact
pub const METHOD: &str = "pearson_on_free_slot_deltas";

/// runs delta transformation, correlation, scoring and ranking for one
/// lookback window and materializes its self-contained artifact. windows
/// share nothing: a pair excluded here may well appear in a wider window.
pub fn run_window(
    store: &HistoryStore,
    distances: &GeoDistanceIndex,
    config: &AnalysisConfig,
    lookback_days: u32,
) -> Result<CorrelationArtifact, EngineError> {
    let stale_gap = config.stale_gap()?;
    let latest = store.latest_timestamp();
    let window_start = latest - TimeDelta::days(i64::from(lookback_days));

    let car_series = delta_series_for_class(store, EntityClass::Car, window_start, stale_gap);
    let bike_series = delta_series_for_class(store, EntityClass::Bike, window_start, stale_gap);

    let (correlated, exclusions) =
        correlation::correlate_all(&car_series, &bike_series, config.min_common_points);
    let mut pairs = ranking::build_pairs(
        correlated,
        distances,
        config.distance_weight_km,
        config.null_distance_policy,
    );
    ranking::sort_ranking(&mut pairs);

    let counts = CorrelationCounts::new(
        car_series.len(),
        bike_series.len(),
        pairs.len(),
        exclusions,
    );
    log::info!(
        "window {lookback_days}d: {} pairs kept, {} excluded",
        counts.pairs_computed,
        counts.pairs_excluded
    );

    Ok(CorrelationArtifact {
        generated_at: latest.format(ARTIFACT_TIME_FORMAT).to_string(),
        lookback_days,
        min_common_points: config.min_common_points,
        distance_weight_km: config.distance_weight_km,
        method: String::from(METHOD),
        default_filters: config.default_filters,
        cars: car_series.iter().map(|(id, _)| id.clone()).collect(),
        bikes: bike_series.iter().map(|(id, _)| id.clone()).collect(),
        top_global: pairs.iter().take(config.top_n_pairs).cloned().collect(),
        by_car: ranking::group_by_car(&pairs),
        by_bike: ranking::group_by_bike(&pairs),
        pairs,
        counts,
    })
}

/// delta series per entity of one class, in id order, dropping entities
/// with no delta inside the window
fn delta_series_for_class(
    store: &HistoryStore,
    class: EntityClass,
    window_start: NaiveDateTime,
    stale_gap: TimeDelta,
) -> Vec<(String, DeltaSeries)> {
    store
        .entities(class)
        .iter()
        .filter_map(|entity| {
            let observations = store.observations_for(class, &entity.id, window_start);
            let series = DeltaSeries::from_observations(&observations, window_start, stale_gap);
            if series.is_empty() {
                None
            } else {
                Some((entity.id.clone(), series))
            }
        })
        .collect_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::history::HistoryStore;
    use std::fmt::Write as _;

    /// builds a small but realistic two-car/two-bike history: hourly
    /// samples over several days, with comedie and station-1 moving in
    /// opposition and station-2 flat (zero variance).
    fn fixture(name: &str) -> HistoryStore {
        let dir = std::env::temp_dir().join(format!("velopark-window-{}-{name}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let mut history = String::from("date;time;class;id;free;total\n");
        for day in 1..=6u32 {
            for hour in 6..=20u32 {
                let swing = i64::from((day + hour) % 5) - 2;
                let car_free = 300 + swing * 40;
                let bike_free = 10 - swing * 3;
                writeln!(
                    history,
                    "2026-03-{day:02};{hour:02}:00;car;comedie;{car_free};600"
                )
                .unwrap();
                writeln!(
                    history,
                    "2026-03-{day:02};{hour:02}:00;car;gare;{};450",
                    200 + i64::from(hour % 3) * 25
                )
                .unwrap();
                writeln!(
                    history,
                    "2026-03-{day:02};{hour:02}:00;bike;station-1;{bike_free};20"
                )
                .unwrap();
                writeln!(
                    history,
                    "2026-03-{day:02};{hour:02}:00;bike;station-2;5;10"
                )
                .unwrap();
            }
        }
        let metadata = r#"{
            "comedie": {"class": "car", "name": "Comedie", "lat": 43.6085, "lon": 3.8794},
            "gare": {"class": "car", "name": "Gare", "lat": 43.6045, "lon": 3.8802},
            "station-1": {"class": "bike", "lat": 43.6089, "lon": 3.8810},
            "station-2": {"class": "bike", "lat": 43.6100, "lon": 3.8700}
        }"#;
        let history_file = dir.join("history.csv");
        let metadata_file = dir.join("metadata.json");
        std::fs::write(&history_file, history).unwrap();
        std::fs::write(&metadata_file, metadata).unwrap();
        HistoryStore::load(&history_file, &metadata_file).unwrap()
    }

    fn test_config() -> AnalysisConfig {
        AnalysisConfig {
            min_common_points: 8,
            ..Default::default()
        }
    }

    #[test]
    fn test_window_artifact_contents() {
        let store = fixture("contents");
        let config = test_config();
        let distances = GeoDistanceIndex::build(
            store.entities(EntityClass::Car),
            store.entities(EntityClass::Bike),
        );
        let artifact = run_window(&store, &distances, &config, 7).unwrap();

        assert_eq!(artifact.lookback_days, 7);
        assert_eq!(artifact.method, METHOD);
        assert_eq!(artifact.cars, vec!["comedie", "gare"]);
        assert_eq!(artifact.bikes, vec!["station-1", "station-2"]);
        // station-2 never moves: both its pairs are excluded as undefined
        assert_eq!(artifact.counts.undefined_correlation, 2);
        assert_eq!(artifact.counts.pairs_computed, 2);
        assert_eq!(artifact.pairs.len(), 2);

        // comedie moves exactly opposite station-1
        let inverse = artifact
            .pairs
            .iter()
            .find(|p| p.car == "comedie" && p.bike == "station-1")
            .unwrap();
        assert!((inverse.r + 1.0).abs() < 1e-6, "expected r near -1.0, got {}", inverse.r);
        assert!(inverse.distance_km.unwrap() < 1.0);

        // every pair respects the sample threshold and the r bound
        for pair in &artifact.pairs {
            assert!(pair.n >= config.min_common_points);
            assert!(pair.abs_r <= 1.0 + 1e-9);
        }

        // rankings are ordered by score
        for window in artifact.pairs.windows(2) {
            assert!(window[0].score >= window[1].score);
        }
    }

    #[test]
    fn test_windows_are_independent() {
        let store = fixture("independent");
        let config = AnalysisConfig {
            // the 2-day window holds ~28 aligned deltas, the 6-day one ~84
            min_common_points: 40,
            ..Default::default()
        };
        let distances = GeoDistanceIndex::build(
            store.entities(EntityClass::Car),
            store.entities(EntityClass::Bike),
        );
        let narrow = run_window(&store, &distances, &config, 2).unwrap();
        let wide = run_window(&store, &distances, &config, 6).unwrap();
        // insufficient samples in the narrow window, present in the wide
        assert!(narrow.pairs.is_empty());
        assert!(!wide.pairs.is_empty());
        assert!(narrow.counts.insufficient_samples > 0);
    }

    #[test]
    fn test_widening_window_grows_n() {
        let store = fixture("widening");
        let config = test_config();
        let distances = GeoDistanceIndex::build(
            store.entities(EntityClass::Car),
            store.entities(EntityClass::Bike),
        );
        let narrow = run_window(&store, &distances, &config, 3).unwrap();
        let wide = run_window(&store, &distances, &config, 6).unwrap();
        for narrow_pair in &narrow.pairs {
            let wide_pair = wide
                .pairs
                .iter()
                .find(|p| p.car == narrow_pair.car && p.bike == narrow_pair.bike)
                .unwrap();
            assert!(wide_pair.n >= narrow_pair.n);
        }
    }

    #[test]
    fn test_run_reproducible() {
        let store = fixture("reproducible");
        let config = test_config();
        let distances = GeoDistanceIndex::build(
            store.entities(EntityClass::Car),
            store.entities(EntityClass::Bike),
        );
        let first = run_window(&store, &distances, &config, 7).unwrap();
        let second = run_window(&store, &distances, &config, 7).unwrap();
        assert_eq!(first.pairs, second.pairs);
        assert_eq!(first.generated_at, second.generated_at);
    }
}
