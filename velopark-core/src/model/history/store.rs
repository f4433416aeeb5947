use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::model::history::load_metadata;
use crate::model::{EngineError, Entity, EntityClass, Observation};

/// timestamp format of the historical log, split across two columns
const LOG_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// one raw row of the semicolon-delimited historical log. numeric fields
/// stay as strings at this stage: a malformed count from a provider must
/// skip the row, never fail the whole file.
#[derive(Debug, Deserialize)]
struct RawRow {
    date: String,
    time: String,
    class: String,
    id: String,
    free: String,
    total: String,
}

impl RawRow {
    fn parse(&self) -> Option<(EntityClass, String, Observation)> {
        let class: EntityClass = self.class.trim().parse().ok()?;
        let id = self.id.trim();
        if id.is_empty() {
            return None;
        }
        let timestamp = NaiveDateTime::parse_from_str(
            &format!("{} {}", self.date.trim(), self.time.trim()),
            LOG_TIME_FORMAT,
        )
        .ok()?;
        let free = self.free.trim().parse::<f64>().ok()?;
        if !free.is_finite() || free < 0.0 {
            return None;
        }
        // a missing or zero total degrades the observation, not the row
        let total = self
            .total
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|t| t.is_finite() && *t > 0.0);
        Some((
            class,
            id.to_string(),
            Observation {
                timestamp,
                free,
                total,
            },
        ))
    }
}

/// the loaded, indexed historical occupancy log plus entity metadata.
/// read-only for the duration of a run; every derived structure is
/// recomputed from it on each invocation.
pub struct HistoryStore {
    cars: Vec<Entity>,
    bikes: Vec<Entity>,
    observations: HashMap<EntityClass, HashMap<String, Vec<Observation>>>,
    latest: NaiveDateTime,
}

impl HistoryStore {
    /// loads the historical log and the entity metadata. fatal when
    /// either file cannot be read or the log holds no usable observation:
    /// correlating over a partial history would silently mislead, so no
    /// artifact may be produced from one.
    pub fn load(history_file: &Path, metadata_file: &Path) -> Result<HistoryStore, EngineError> {
        let entities = load_metadata(metadata_file)?;

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .from_path(history_file)
            .map_err(|e| {
                EngineError::DataUnavailable(format!(
                    "failure reading historical log '{}': {e}",
                    history_file.display()
                ))
            })?;

        // BTreeMap keyed by timestamp: ordered iteration for free, and
        // duplicate timestamps resolve last-write-wins by file order
        let mut series: HashMap<EntityClass, HashMap<String, BTreeMap<NaiveDateTime, Observation>>> =
            HashMap::new();
        let mut skipped = 0usize;
        for row in reader.deserialize::<RawRow>() {
            let parsed = match row {
                Ok(raw) => raw.parse(),
                Err(_) => None,
            };
            match parsed {
                Some((class, id, observation)) => {
                    series
                        .entry(class)
                        .or_default()
                        .entry(id)
                        .or_default()
                        .insert(observation.timestamp, observation);
                }
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            log::warn!(
                "skipped {skipped} malformed rows in '{}'",
                history_file.display()
            );
        }

        let latest = series
            .values()
            .flat_map(|by_id| by_id.values())
            .filter_map(|points| points.keys().next_back())
            .max()
            .copied()
            .ok_or_else(|| {
                EngineError::DataUnavailable(format!(
                    "historical log '{}' contains no usable observations",
                    history_file.display()
                ))
            })?;

        let observations: HashMap<EntityClass, HashMap<String, Vec<Observation>>> = series
            .into_iter()
            .map(|(class, by_id)| {
                let flattened = by_id
                    .into_iter()
                    .map(|(id, points)| (id, points.into_values().collect()))
                    .collect();
                (class, flattened)
            })
            .collect();

        let (cars, bikes) = assemble_entities(entities, &observations);
        Ok(HistoryStore {
            cars,
            bikes,
            observations,
            latest,
        })
    }

    /// newest observation timestamp in the log; every lookback window is
    /// anchored here so that a run is reproducible from a log snapshot
    pub fn latest_timestamp(&self) -> NaiveDateTime {
        self.latest
    }

    /// known entities of a class, sorted by id
    pub fn entities(&self, class: EntityClass) -> &[Entity] {
        match class {
            EntityClass::Car => &self.cars,
            EntityClass::Bike => &self.bikes,
        }
    }

    /// ordered observations of one entity at or after `since`, strictly
    /// increasing timestamps, duplicates already resolved
    pub fn observations_for(
        &self,
        class: EntityClass,
        id: &str,
        since: NaiveDateTime,
    ) -> Vec<Observation> {
        self.observations
            .get(&class)
            .and_then(|by_id| by_id.get(id))
            .map(|points| {
                points
                    .iter()
                    .filter(|o| o.timestamp >= since)
                    .copied()
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// merges metadata entities with ids observed only in the log, which get
/// synthesized placeholder entities (display name = id, no coordinates)
fn assemble_entities(
    entities: Vec<Entity>,
    observations: &HashMap<EntityClass, HashMap<String, Vec<Observation>>>,
) -> (Vec<Entity>, Vec<Entity>) {
    let mut cars = Vec::new();
    let mut bikes = Vec::new();
    let mut known: HashSet<(EntityClass, String)> = HashSet::new();
    for entity in entities {
        known.insert((entity.class, entity.id.clone()));
        match entity.class {
            EntityClass::Car => cars.push(entity),
            EntityClass::Bike => bikes.push(entity),
        }
    }
    for (class, by_id) in observations {
        for id in by_id.keys() {
            if !known.contains(&(*class, id.clone())) {
                let placeholder = Entity::unknown(id, *class);
                match class {
                    EntityClass::Car => cars.push(placeholder),
                    EntityClass::Bike => bikes.push(placeholder),
                }
            }
        }
    }
    cars.sort_by(|a, b| a.id.cmp(&b.id));
    bikes.sort_by(|a, b| a.id.cmp(&b.id));
    (cars, bikes)
}
