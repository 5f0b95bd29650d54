use crate::model::{BoundingBox, Coordinate, Location};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Rough length of one degree, used for box expansion only.
const KM_PER_DEGREE: f64 = 111.0;

impl Coordinate {
    /// Box around this point, `margin_km` away on each side.
    ///
    /// Degrees are treated as a flat grid, so the box gets narrower in real
    /// distance as latitude grows. Good enough for a search area.
    pub fn expand(&self, margin_km: f64) -> BoundingBox {
        let offset = margin_km / KM_PER_DEGREE;

        BoundingBox {
            min: Coordinate::new(self.latitude - offset, self.longitude - offset),
            max: Coordinate::new(self.latitude + offset, self.longitude + offset),
        }
    }
}

/// Great-circle distance in kilometers.
pub fn haversine_distance_km(a: Location, b: Location) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lon = (b.longitude - a.longitude).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}
