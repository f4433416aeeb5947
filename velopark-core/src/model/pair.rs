use serde::{Deserialize, Serialize};

/// one (car parking, bike station) association over a single lookback
/// window: Pearson correlation over the aligned delta samples, the sample
/// count, the geographic distance when both coordinates are known, and
/// the distance-decayed ranking score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairAssociation {
    pub car: String,
    pub bike: String,
    pub r: f64,
    pub abs_r: f64,
    /// number of timestamp-aligned delta samples behind `r`
    pub n: usize,
    pub distance_km: Option<f64>,
    pub score: f64,
}
