use std::collections::HashMap;
use std::io::BufReader;
use std::path::Path;

use itertools::Itertools;
use serde::Deserialize;

use crate::model::{EngineError, Entity, EntityClass};

/// one value of the metadata JSON map; the surrounding key is the entity
/// id. written by the acquisition collaborator.
#[derive(Debug, Deserialize)]
struct MetadataEntry {
    class: EntityClass,
    name: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    capacity: Option<u32>,
}

/// loads entity metadata (id -> class, display name, coordinates,
/// capacity). unreadable metadata is fatal for the run.
pub fn load_metadata(path: &Path) -> Result<Vec<Entity>, EngineError> {
    let file = std::fs::File::open(path).map_err(|e| {
        EngineError::DataUnavailable(format!(
            "failure opening metadata file '{}': {e}",
            path.display()
        ))
    })?;
    let entries: HashMap<String, MetadataEntry> = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| {
            EngineError::DataUnavailable(format!(
                "failure parsing metadata file '{}': {e}",
                path.display()
            ))
        })?;

    let entities = entries
        .into_iter()
        .map(|(id, entry)| Entity {
            name: entry.name.unwrap_or_else(|| id.clone()),
            id,
            class: entry.class,
            lat: entry.lat,
            lon: entry.lon,
            capacity: entry.capacity,
        })
        .sorted_by(|a, b| a.id.cmp(&b.id))
        .collect();
    Ok(entities)
}
