use serde::{Deserialize, Serialize};

/// the two entity classes tracked by the engine. the association model is
/// fixed: every pair is one car parking against one bike docking station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityClass {
    Car,
    Bike,
}

impl std::fmt::Display for EntityClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityClass::Car => write!(f, "car"),
            EntityClass::Bike => write!(f, "bike"),
        }
    }
}

impl std::str::FromStr for EntityClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "car" => Ok(EntityClass::Car),
            "bike" => Ok(EntityClass::Bike),
            _ => Err(format!("unknown entity class '{s}'")),
        }
    }
}

/// a car parking or bike docking station as described by the metadata
/// collaborator. coordinates are optional; an entity without them still
/// correlates but carries no distance in any of its pairs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// stable identifier, the key used in the historical log
    pub id: String,
    /// display name for rendered outputs
    pub name: String,
    pub class: EntityClass,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// total slot count, informational only
    pub capacity: Option<u32>,
}

impl Entity {
    pub fn coordinate(&self) -> Option<geo::Point<f64>> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(geo::Point::new(lon, lat)),
            _ => None,
        }
    }

    /// fallback for ids observed in the log but absent from metadata
    pub fn unknown(id: &str, class: EntityClass) -> Entity {
        Entity {
            id: id.to_string(),
            name: id.to_string(),
            class,
            lat: None,
            lon: None,
            capacity: None,
        }
    }
}
