use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// A point on the map, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Coordinate,
    pub max: Coordinate,
}

/// Position of a vehicle as reported by the availability API.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<Coordinate> for Location {
    fn from(c: Coordinate) -> Self {
        Self { latitude: c.latitude, longitude: c.longitude }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub vehicle_id: i64,
    #[serde(default)]
    pub vehicle_nb: Option<i64>,
    #[serde(default)]
    pub vehicle_location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    #[serde(default)]
    pub station_id: Option<i64>,
    #[serde(default)]
    pub station_name: Option<String>,
    pub satisfies_filters: bool,
    #[serde(default)]
    pub recommended_vehicle_id: Option<i64>,
}

impl Station {
    /// A slot counts only when it matches the filters and the API picked a car for it.
    pub fn is_bookable(&self) -> bool {
        self.satisfies_filters && self.recommended_vehicle_id.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlexAvailability {
    #[serde(default)]
    pub total_nb_vehicles: i64,
    #[serde(default)]
    pub vehicles: Vec<Vehicle>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationAvailability {
    #[serde(default)]
    pub stations: Vec<Station>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchMode {
    Station,
    Flex,
}

impl SearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::Station => "station",
            SearchMode::Flex => "flex",
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VehicleTypeFilter {
    #[default]
    AllTypes,
    FamilyCar,
    UtilityVehicle,
    MiniVan,
}

impl VehicleTypeFilter {
    /// Value of the `VehicleTypes` query parameter; `None` means no filter is sent.
    pub fn api_code(&self) -> Option<u32> {
        match self {
            VehicleTypeFilter::AllTypes => None,
            VehicleTypeFilter::FamilyCar => Some(1),
            VehicleTypeFilter::UtilityVehicle => Some(2),
            VehicleTypeFilter::MiniVan => Some(3),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleTypeFilter::AllTypes => "all",
            VehicleTypeFilter::FamilyCar => "family",
            VehicleTypeFilter::UtilityVehicle => "utility",
            VehicleTypeFilter::MiniVan => "minivan",
        }
    }

    pub const fn all() -> &'static [VehicleTypeFilter] {
        &[
            VehicleTypeFilter::AllTypes,
            VehicleTypeFilter::FamilyCar,
            VehicleTypeFilter::UtilityVehicle,
            VehicleTypeFilter::MiniVan,
        ]
    }
}

impl fmt::Display for VehicleTypeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleTypeFilter {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "all" => Ok(VehicleTypeFilter::AllTypes),
            "family" => Ok(VehicleTypeFilter::FamilyCar),
            "utility" => Ok(VehicleTypeFilter::UtilityVehicle),
            "minivan" => Ok(VehicleTypeFilter::MiniVan),
            _ => Err(anyhow::anyhow!(
                "Unknown vehicle type '{value}'. Supported types: all, family, utility, minivan."
            )),
        }
    }
}

/// Opaque region identifier, forwarded to the API as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CityId(pub u32);

impl fmt::Display for CityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CityId {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value
            .trim()
            .parse::<u32>()
            .map(CityId)
            .map_err(|_| anyhow::anyhow!("Invalid city id '{value}': expected a positive integer"))
    }
}

/// Mode-specific part of a search. Dates only exist for station searches.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchKind {
    Flex,
    Station {
        start: NaiveDateTime,
        end: NaiveDateTime,
        vehicle_type: VehicleTypeFilter,
    },
}

/// Everything needed to build the request URL. Fixed for the lifetime of one search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub city_id: CityId,
    pub coordinate: Coordinate,
    pub margin_km: f64,
    pub kind: SearchKind,
}

impl SearchRequest {
    pub fn flex(city_id: CityId, coordinate: Coordinate, margin_km: f64) -> Self {
        Self { city_id, coordinate, margin_km, kind: SearchKind::Flex }
    }

    pub fn station(
        city_id: CityId,
        coordinate: Coordinate,
        margin_km: f64,
        start: NaiveDateTime,
        end: NaiveDateTime,
        vehicle_type: VehicleTypeFilter,
    ) -> Self {
        Self {
            city_id,
            coordinate,
            margin_km,
            kind: SearchKind::Station { start, end, vehicle_type },
        }
    }

    pub fn mode(&self) -> SearchMode {
        match self.kind {
            SearchKind::Flex => SearchMode::Flex,
            SearchKind::Station { .. } => SearchMode::Station,
        }
    }
}

/// What a successful search found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Found {
    /// Flex search: the closest free-floating car.
    Vehicle { vehicle_id: i64 },
    /// Station search: number of bookable station slots.
    Stations { count: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchOutcome {
    Found(Found),
    Cancelled,
    Failed { reason: String },
}

impl SearchOutcome {
    /// Sentinel for "search ended without a result".
    pub const NO_RESULT: i64 = -1;

    /// Integer form used by older callers: vehicle id in flex mode, slot count in
    /// station mode, `-1` for both cancellation and failure. Flex hits always
    /// carry a positive id, so a found search never maps to the sentinel.
    pub fn code(&self) -> i64 {
        match self {
            SearchOutcome::Found(Found::Vehicle { vehicle_id }) => *vehicle_id,
            SearchOutcome::Found(Found::Stations { count }) => *count,
            SearchOutcome::Cancelled | SearchOutcome::Failed { .. } => Self::NO_RESULT,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, SearchOutcome::Found(_))
    }
}

impl fmt::Display for SearchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchOutcome::Found(Found::Vehicle { vehicle_id }) => {
                write!(f, "found vehicle {vehicle_id}")
            }
            SearchOutcome::Found(Found::Stations { count }) => {
                write!(f, "found {count} available station slot(s)")
            }
            SearchOutcome::Cancelled => f.write_str("search cancelled"),
            SearchOutcome::Failed { reason } => write!(f, "search failed: {reason}"),
        }
    }
}
