use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::EngineError;

/// how pairs with an unknown geographic distance are scored. the two
/// choices produce materially different rankings, so this is an explicit
/// configuration flag rather than an implicit default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullDistancePolicy {
    /// keep the pair with a neutral distance weight of 1.0
    #[default]
    Neutral,
    /// drop the pair from every ranking view
    Exclude,
}

/// display-layer filter defaults. embedded verbatim in each correlation
/// artifact and never applied during artifact generation: the engine
/// always emits the full pair set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultFilters {
    pub max_distance_km: f64,
    pub min_abs_correlation: f64,
    pub only_negative: bool,
}

impl Default for DefaultFilters {
    fn default() -> Self {
        DefaultFilters {
            max_distance_km: 2.0,
            min_abs_correlation: 0.25,
            only_negative: false,
        }
    }
}

/// serializable engine parameters. the app layer builds this from a TOML
/// file; [`AnalysisConfig::validate`] must pass before any computation
/// starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// lookback windows in days, one correlation artifact per entry
    pub lookback_windows: Vec<u32>,
    /// minimum aligned delta samples required to keep a pair
    pub min_common_points: usize,
    /// maximum gap between consecutive observations before the delta
    /// across them is dropped as stale, humantime format (e.g. "2h")
    pub max_stale_gap: String,
    /// decay constant in kilometers: score = |r| * exp(-d / weight)
    pub distance_weight_km: f64,
    pub null_distance_policy: NullDistancePolicy,
    /// fixed recent period of the saturation aggregation, in days
    pub saturation_lookback_days: u32,
    /// occupancy ratio at or above which a sample counts as saturated
    pub saturation_threshold: f64,
    /// number of entries kept in the top_global ranking view
    pub top_n_pairs: usize,
    /// optional wall-clock budget for a whole run, humantime format
    pub max_runtime: Option<String>,
    pub default_filters: DefaultFilters,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            lookback_windows: vec![7, 14, 21, 30],
            min_common_points: 40,
            max_stale_gap: String::from("2h"),
            distance_weight_km: 1.0,
            null_distance_policy: NullDistancePolicy::default(),
            saturation_lookback_days: 7,
            saturation_threshold: 0.9,
            top_n_pairs: 50,
            max_runtime: None,
            default_filters: DefaultFilters::default(),
        }
    }
}

impl AnalysisConfig {
    /// the parsed stale-data guard
    pub fn stale_gap(&self) -> Result<chrono::TimeDelta, EngineError> {
        let gap = humantime::parse_duration(&self.max_stale_gap).map_err(|e| {
            EngineError::ConfigInvalid(format!(
                "cannot parse max_stale_gap '{}': {e}",
                self.max_stale_gap
            ))
        })?;
        chrono::TimeDelta::from_std(gap).map_err(|e| {
            EngineError::ConfigInvalid(format!(
                "max_stale_gap '{}' out of range: {e}",
                self.max_stale_gap
            ))
        })
    }

    /// the parsed wall-clock budget, None when the run is unbounded
    pub fn runtime_budget(&self) -> Result<Option<Duration>, EngineError> {
        match &self.max_runtime {
            None => Ok(None),
            Some(raw) => humantime::parse_duration(raw).map(Some).map_err(|e| {
                EngineError::ConfigInvalid(format!("cannot parse max_runtime '{raw}': {e}"))
            }),
        }
    }

    /// fails fast on parameters that would silently corrupt a run. called
    /// at startup, before any data is read.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.lookback_windows.is_empty() {
            return Err(EngineError::ConfigInvalid(String::from(
                "lookback_windows must not be empty",
            )));
        }
        if self.lookback_windows.iter().any(|days| *days == 0) {
            return Err(EngineError::ConfigInvalid(String::from(
                "lookback_windows entries must be at least 1 day",
            )));
        }
        if self.min_common_points < 2 {
            return Err(EngineError::ConfigInvalid(format!(
                "min_common_points must be at least 2, got {}",
                self.min_common_points
            )));
        }
        if !self.distance_weight_km.is_finite() || self.distance_weight_km <= 0.0 {
            return Err(EngineError::ConfigInvalid(format!(
                "distance_weight_km must be a positive number, got {}",
                self.distance_weight_km
            )));
        }
        if self.saturation_lookback_days == 0 {
            return Err(EngineError::ConfigInvalid(String::from(
                "saturation_lookback_days must be at least 1",
            )));
        }
        if !(0.0..=1.0).contains(&self.saturation_threshold) {
            return Err(EngineError::ConfigInvalid(format!(
                "saturation_threshold must be within [0, 1], got {}",
                self.saturation_threshold
            )));
        }
        if self.top_n_pairs == 0 {
            return Err(EngineError::ConfigInvalid(String::from(
                "top_n_pairs must be at least 1",
            )));
        }
        let gap = self.stale_gap()?;
        if gap <= chrono::TimeDelta::zero() {
            return Err(EngineError::ConfigInvalid(format!(
                "max_stale_gap must be a positive duration, got '{}'",
                self.max_stale_gap
            )));
        }
        self.runtime_budget()?;
        Ok(())
    }
}
