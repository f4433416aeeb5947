use std::cmp::Reverse;
use std::collections::BTreeMap;

use chrono::{NaiveDateTime, TimeDelta, Timelike};
use itertools::Itertools;
use ordered_float::OrderedFloat;

use crate::model::artifact::{
    round4, CityCurve, ClassCurves, ClassRankings, SaturationArtifact, SaturationRecord,
    ARTIFACT_TIME_FORMAT,
};
use crate::model::history::HistoryStore;
use crate::model::{AnalysisConfig, EngineError, EntityClass};

/// computes the saturation artifact over the fixed recent period. fully
/// independent of the correlation pipeline: it reads the store directly
/// and aggregates occupancy ratios, not deltas. samples without a usable
/// total are excluded from aggregation, never treated as zero occupancy.
pub fn run_saturation(
    store: &HistoryStore,
    config: &AnalysisConfig,
) -> Result<SaturationArtifact, EngineError> {
    let latest = store.latest_timestamp();
    let window_start = latest - TimeDelta::days(i64::from(config.saturation_lookback_days));

    Ok(SaturationArtifact {
        generated_at: latest.format(ARTIFACT_TIME_FORMAT).to_string(),
        lookback_days: config.saturation_lookback_days,
        saturation_threshold: config.saturation_threshold,
        rankings: ClassRankings {
            cars: class_ranking(store, EntityClass::Car, window_start, config.saturation_threshold),
            bikes: class_ranking(
                store,
                EntityClass::Bike,
                window_start,
                config.saturation_threshold,
            ),
        },
        city_curves: ClassCurves {
            cars: city_curve(store, EntityClass::Car, window_start),
            bikes: city_curve(store, EntityClass::Bike, window_start),
        },
    })
}

/// per-entity occupancy summaries of one class, most saturated first:
/// mean occupancy descending, then saturated share, then peak, then name
fn class_ranking(
    store: &HistoryStore,
    class: EntityClass,
    window_start: NaiveDateTime,
    threshold: f64,
) -> Vec<SaturationRecord> {
    let mut records = store
        .entities(class)
        .iter()
        .filter_map(|entity| {
            let ratios: Vec<f64> = store
                .observations_for(class, &entity.id, window_start)
                .iter()
                .filter_map(|o| o.occupancy())
                .collect();
            let mean_occ = crate::model::stats::mean(&ratios)?;
            let max_occ = ratios.iter().copied().fold(f64::MIN, f64::max);
            let saturated = ratios.iter().filter(|&&occ| occ >= threshold).count();
            Some(SaturationRecord {
                name: entity.name.clone(),
                mean_occ: round4(mean_occ),
                max_occ: round4(max_occ),
                sat_pct: round4(saturated as f64 / ratios.len() as f64),
                n_points: ratios.len(),
            })
        })
        .collect_vec();
    records.sort_by_cached_key(|record| {
        (
            Reverse(OrderedFloat(record.mean_occ)),
            Reverse(OrderedFloat(record.sat_pct)),
            Reverse(OrderedFloat(record.max_occ)),
            record.name.clone(),
        )
    });
    records
}

/// city-wide mean occupancy of one class, resampled onto an hourly grid.
/// each sample lands in the bucket of its truncated hour; the bucket
/// value is the mean over every entity sample inside it.
fn city_curve(store: &HistoryStore, class: EntityClass, window_start: NaiveDateTime) -> CityCurve {
    let mut buckets: BTreeMap<NaiveDateTime, (f64, usize)> = BTreeMap::new();
    for entity in store.entities(class) {
        for observation in store.observations_for(class, &entity.id, window_start) {
            let Some(occ) = observation.occupancy() else {
                continue;
            };
            let bucket = truncate_to_hour(observation.timestamp);
            let slot = buckets.entry(bucket).or_insert((0.0, 0));
            slot.0 += occ;
            slot.1 += 1;
        }
    }
    let mut curve = CityCurve::default();
    for (bucket, (sum, count)) in buckets {
        curve
            .timestamps
            .push(bucket.format(ARTIFACT_TIME_FORMAT).to_string());
        curve.avg_occ.push(round4(sum / count as f64));
    }
    curve
}

fn truncate_to_hour(timestamp: NaiveDateTime) -> NaiveDateTime {
    timestamp
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(timestamp)
}
