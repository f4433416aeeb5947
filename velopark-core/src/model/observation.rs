use chrono::NaiveDateTime;

/// one parsed row of the historical occupancy log: the free-slot count of
/// an entity at a point in time. `total` is None whenever the provider
/// reported nothing usable for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub timestamp: NaiveDateTime,
    pub free: f64,
    pub total: Option<f64>,
}

impl Observation {
    /// occupancy ratio in [0, 1]. None when the total is missing or zero,
    /// which excludes the sample from occupancy aggregation rather than
    /// counting it as empty.
    pub fn occupancy(&self) -> Option<f64> {
        match self.total {
            Some(total) if total > 0.0 => Some((1.0 - self.free / total).clamp(0.0, 1.0)),
            _ => None,
        }
    }
}
