use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::correlation::ExclusionCounts;
use crate::model::{DefaultFilters, PairAssociation};

/// timestamp format used for `generated_at` and city-curve grids
pub const ARTIFACT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// rounds to the declared artifact precision for correlations and scores
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// rounds to the declared artifact precision for distances
pub fn round3(value: f64) -> f64 {
    (value * 1_000.0).round() / 1_000.0
}

/// summary counters embedded in a correlation artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationCounts {
    /// car entities with at least one delta in the window
    pub cars: usize,
    /// bike entities with at least one delta in the window
    pub bikes: usize,
    pub pairs_computed: usize,
    pub pairs_excluded: usize,
    pub insufficient_samples: usize,
    pub undefined_correlation: usize,
}

impl CorrelationCounts {
    pub fn new(cars: usize, bikes: usize, computed: usize, exclusions: ExclusionCounts) -> Self {
        CorrelationCounts {
            cars,
            bikes,
            pairs_computed: computed,
            pairs_excluded: exclusions.total(),
            insufficient_samples: exclusions.insufficient_samples,
            undefined_correlation: exclusions.undefined_correlation,
        }
    }
}

/// one self-contained correlation output for a single lookback window: a
/// point-in-time snapshot, never mutated in place, only replaced
/// wholesale by the next run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationArtifact {
    /// newest observation timestamp in the log at generation time
    pub generated_at: String,
    pub lookback_days: u32,
    pub min_common_points: usize,
    pub distance_weight_km: f64,
    pub method: String,
    /// display-layer defaults; the pair set below is unfiltered
    pub default_filters: DefaultFilters,
    pub cars: Vec<String>,
    pub bikes: Vec<String>,
    /// the full pair set, ranked
    pub pairs: Vec<PairAssociation>,
    /// leading slice of `pairs`, a convenience for compact views
    pub top_global: Vec<PairAssociation>,
    pub by_car: IndexMap<String, Vec<PairAssociation>>,
    pub by_bike: IndexMap<String, Vec<PairAssociation>>,
    pub counts: CorrelationCounts,
}

/// per-entity occupancy summary over the saturation period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaturationRecord {
    pub name: String,
    /// mean occupancy ratio over the period
    pub mean_occ: f64,
    /// highest occupancy ratio observed
    pub max_occ: f64,
    /// fraction of samples at or above the saturation threshold
    pub sat_pct: f64,
    pub n_points: usize,
}

/// city-wide mean occupancy for one entity class on an hourly grid.
/// `timestamps` and `avg_occ` are parallel vectors, ascending in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CityCurve {
    pub timestamps: Vec<String>,
    pub avg_occ: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassRankings {
    pub cars: Vec<SaturationRecord>,
    pub bikes: Vec<SaturationRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassCurves {
    pub cars: CityCurve,
    pub bikes: CityCurve,
}

/// saturation rankings and city curves over the fixed recent period,
/// independent of the correlation pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaturationArtifact {
    pub generated_at: String,
    pub lookback_days: u32,
    pub saturation_threshold: f64,
    pub rankings: ClassRankings,
    pub city_curves: ClassCurves,
}
