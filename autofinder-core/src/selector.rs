use crate::{geo::haversine_distance_km, model::{Location, Vehicle}};

/// Vehicle closest to `target`. Ties go to the earliest entry.
pub fn closest_vehicle(vehicles: &[Vehicle], target: Location) -> Option<&Vehicle> {
    match vehicles {
        [] => None,
        [only] => Some(only),
        [first, rest @ ..] => {
            let mut best = first;
            let mut best_distance = haversine_distance_km(first.vehicle_location, target);

            for vehicle in rest {
                let distance = haversine_distance_km(vehicle.vehicle_location, target);
                if distance < best_distance {
                    best = vehicle;
                    best_distance = distance;
                }
            }

            Some(best)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vehicle(id: i64, latitude: f64, longitude: f64) -> Vehicle {
        Vehicle {
            vehicle_id: id,
            vehicle_nb: None,
            vehicle_location: Location { latitude, longitude },
        }
    }

    const TARGET: Location = Location { latitude: 45.50, longitude: -73.57 };

    #[test]
    fn empty_list_has_no_closest() {
        assert!(closest_vehicle(&[], TARGET).is_none());
    }

    #[test]
    fn single_vehicle_is_returned_regardless_of_distance() {
        let far = [vehicle(1, -45.0, 100.0)];
        assert_eq!(closest_vehicle(&far, TARGET).map(|v| v.vehicle_id), Some(1));
    }

    #[test]
    fn picks_nearest_vehicle() {
        let vehicles = [
            vehicle(9, 45.600, -73.700),
            vehicle(7, 45.501, -73.571),
            vehicle(3, 46.000, -73.000),
        ];

        assert_eq!(closest_vehicle(&vehicles, TARGET).map(|v| v.vehicle_id), Some(7));
    }

    #[test]
    fn exact_tie_keeps_first_seen() {
        let vehicles = [
            vehicle(9, 45.600, -73.700),
            vehicle(4, 45.51, -73.57),
            vehicle(5, 45.51, -73.57),
        ];

        assert_eq!(closest_vehicle(&vehicles, TARGET).map(|v| v.vehicle_id), Some(4));
    }

    #[test]
    fn default_location_is_a_normal_point() {
        let vehicles = [vehicle(1, 45.6, -73.6), vehicle(2, 0.0, 0.0)];
        assert_eq!(closest_vehicle(&vehicles, TARGET).map(|v| v.vehicle_id), Some(1));

        let at_origin = Location::default();
        assert_eq!(closest_vehicle(&vehicles, at_origin).map(|v| v.vehicle_id), Some(2));
    }

    #[test]
    fn input_is_left_untouched() {
        let vehicles = vec![vehicle(9, 45.6, -73.7), vehicle(7, 45.501, -73.571)];
        let before = vehicles.clone();

        let _ = closest_vehicle(&vehicles, TARGET);
        assert_eq!(vehicles, before);
    }
}
