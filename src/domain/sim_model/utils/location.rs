use serde::Deserialize;

/// Mean earth radius in metres.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Position of a node on a 2-D plane, or latitude (`x`) / longitude (`y`) in degrees for haversine distances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub x: f64,
    pub y: f64,
}

impl Location {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Location, metric: DistanceMetric) -> f64 {
        match metric {
            DistanceMetric::Euclidean => self.euclidean(other),
            DistanceMetric::Haversine => self.haversine(other),
        }
    }

    pub fn euclidean(&self, other: &Location) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Great-circle distance in metres.
    pub fn haversine(&self, other: &Location) -> f64 {
        let (lat1, lon1) = (self.x.to_radians(), self.y.to_radians());
        let (lat2, lon2) = (other.x.to_radians(), other.y.to_radians());

        let d_lat = lat2 - lat1;
        let d_lon = lon2 - lon1;

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_M * c
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DistanceMetric {
    #[default]
    Euclidean,
    Haversine,
}
