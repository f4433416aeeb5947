use std::cmp::Reverse;

use indexmap::IndexMap;
use ordered_float::OrderedFloat;

use crate::model::artifact::{round3, round4};
use crate::model::correlation::CorrelatedPair;
use crate::model::distance::GeoDistanceIndex;
use crate::model::{DefaultFilters, NullDistancePolicy, PairAssociation};

/// distance-decayed correlation magnitude. monotonically non-decreasing
/// in |r| for a fixed distance and non-increasing in distance for a fixed
/// |r|. a missing distance falls back to a neutral weight of 1.0; pairs
/// under the `exclude` policy never reach this function.
pub fn score(abs_r: f64, distance_km: Option<f64>, distance_weight_km: f64) -> f64 {
    match distance_km {
        Some(d) => abs_r * (-d / distance_weight_km).exp(),
        None => abs_r,
    }
}

/// attaches distance and score to correlated pairs, applying the
/// configured policy for pairs with unknown distance and rounding every
/// value to the artifact precision.
pub fn build_pairs(
    correlated: Vec<CorrelatedPair>,
    distances: &GeoDistanceIndex,
    distance_weight_km: f64,
    policy: NullDistancePolicy,
) -> Vec<PairAssociation> {
    correlated
        .into_iter()
        .filter_map(|pair| {
            let distance_km = distances.distance_km(&pair.car, &pair.bike);
            if distance_km.is_none() && policy == NullDistancePolicy::Exclude {
                return None;
            }
            let abs_r = pair.r.abs();
            Some(PairAssociation {
                car: pair.car,
                bike: pair.bike,
                r: round4(pair.r),
                abs_r: round4(abs_r),
                n: pair.n,
                distance_km: distance_km.map(round3),
                score: round4(score(abs_r, distance_km, distance_weight_km)),
            })
        })
        .collect()
}

/// the ranking order: score descending, then |r| descending, then
/// distance ascending with missing distances last, then car id, then
/// bike id. total, so identical inputs always rank identically.
fn rank_key(
    pair: &PairAssociation,
) -> (
    Reverse<OrderedFloat<f64>>,
    Reverse<OrderedFloat<f64>>,
    OrderedFloat<f64>,
    String,
    String,
) {
    (
        Reverse(OrderedFloat(pair.score)),
        Reverse(OrderedFloat(pair.abs_r)),
        OrderedFloat(pair.distance_km.unwrap_or(f64::INFINITY)),
        pair.car.clone(),
        pair.bike.clone(),
    )
}

pub fn sort_ranking(pairs: &mut [PairAssociation]) {
    pairs.sort_by_cached_key(rank_key);
}

/// groups an already-ranked pair list by car id. group keys are sorted by
/// id; within a group the ranking order is preserved.
pub fn group_by_car(pairs: &[PairAssociation]) -> IndexMap<String, Vec<PairAssociation>> {
    group_by(pairs, |pair| &pair.car)
}

/// symmetric to [`group_by_car`]
pub fn group_by_bike(pairs: &[PairAssociation]) -> IndexMap<String, Vec<PairAssociation>> {
    group_by(pairs, |pair| &pair.bike)
}

fn group_by<F>(pairs: &[PairAssociation], key: F) -> IndexMap<String, Vec<PairAssociation>>
where
    F: Fn(&PairAssociation) -> &String,
{
    let mut groups: IndexMap<String, Vec<PairAssociation>> = IndexMap::new();
    for pair in pairs {
        groups
            .entry(key(pair).clone())
            .or_default()
            .push(pair.clone());
    }
    groups.sort_keys();
    groups
}

/// the rendering boundary's filter: a pure function over an
/// already-materialized pair list. kept next to the engine so the
/// "engine computes everything, display filters" split stays testable,
/// and so changing thresholds never requires recomputation.
pub fn apply_display_filters(
    pairs: &[PairAssociation],
    filters: &DefaultFilters,
) -> Vec<PairAssociation> {
    pairs
        .iter()
        .filter(|pair| pair.abs_r >= filters.min_abs_correlation)
        .filter(|pair| match pair.distance_km {
            Some(d) => d <= filters.max_distance_km,
            None => true,
        })
        .filter(|pair| !filters.only_negative || pair.r < 0.0)
        .cloned()
        .collect()
}
