use std::collections::HashMap;

use geo::{Distance, HaversineMeasure, Point};
use rayon::prelude::*;

use crate::model::Entity;

/// Earth radius in meters shared by every distance in the project
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// great-circle distance between two lon/lat points, in kilometers
pub fn haversine_km(a: Point<f64>, b: Point<f64>) -> f64 {
    HaversineMeasure::new(EARTH_RADIUS_M).distance(a, b) / 1000.0
}

/// pairwise car/bike distances, computed once per run and memoized by id
/// pair. a distance is None when either entity lacks a coordinate, which
/// disables distance weighting for its pairs downstream.
#[derive(Debug, Default)]
pub struct GeoDistanceIndex {
    distances: HashMap<String, HashMap<String, Option<f64>>>,
}

impl GeoDistanceIndex {
    /// precomputes every car/bike distance. pure per pair, parallelized
    /// across cars.
    pub fn build(cars: &[Entity], bikes: &[Entity]) -> GeoDistanceIndex {
        let distances = cars
            .par_iter()
            .map(|car| {
                let row = bikes
                    .iter()
                    .map(|bike| {
                        let km = match (car.coordinate(), bike.coordinate()) {
                            (Some(a), Some(b)) => Some(haversine_km(a, b)),
                            _ => None,
                        };
                        (bike.id.clone(), km)
                    })
                    .collect::<HashMap<_, _>>();
                (car.id.clone(), row)
            })
            .collect::<HashMap<_, _>>();
        GeoDistanceIndex { distances }
    }

    pub fn distance_km(&self, car_id: &str, bike_id: &str) -> Option<f64> {
        self.distances
            .get(car_id)
            .and_then(|row| row.get(bike_id))
            .copied()
            .flatten()
    }
}
