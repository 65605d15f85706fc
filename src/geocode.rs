use std::fmt;

use thiserror::Error;
use tracing::warn;

use crate::target::Coords;

/// A resolved place for a coordinate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Place {
    pub name: String,
    pub country: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeocodeError {
    #[error("no place found for coordinate")]
    NotFound,
    #[error("reverse geocoding unavailable: {0}")]
    Unavailable(String),
}

/// Looks up a human readable place for a coordinate
pub trait ReverseGeocoder {
    fn reverse_geocode(&mut self, coords: Coords) -> Result<Place, GeocodeError>;
}

/// Geocoder for runs without network access; every lookup is unavailable
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineGeocoder;

impl ReverseGeocoder for OfflineGeocoder {
    fn reverse_geocode(&mut self, _coords: Coords) -> Result<Place, GeocodeError> {
        Err(GeocodeError::Unavailable("offline".into()))
    }
}

/// What the reveal shows for the target's place. Lookup failures degrade to
/// a placeholder and never block the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceLabel {
    Found(Place),
    Placeholder(&'static str),
}

impl PlaceLabel {
    pub const UNKNOWN: &'static str = "Unknown location";
    pub const FAILED: &'static str = "Could not fetch location";

    pub fn from_lookup(lookup: Result<Place, GeocodeError>) -> Self {
        match lookup {
            Ok(place) => PlaceLabel::Found(place),
            Err(GeocodeError::NotFound) => PlaceLabel::Placeholder(Self::UNKNOWN),
            Err(err @ GeocodeError::Unavailable(_)) => {
                warn!(error = %err, "reverse geocoding failed");
                PlaceLabel::Placeholder(Self::FAILED)
            }
        }
    }

    pub fn resolve<G: ReverseGeocoder + ?Sized>(geocoder: &mut G, coords: Coords) -> Self {
        Self::from_lookup(geocoder.reverse_geocode(coords))
    }
}

impl fmt::Display for PlaceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaceLabel::Found(place) => match (place.name.is_empty(), place.country.is_empty()) {
                (false, false) => write!(f, "{}, {}", place.name, place.country),
                (false, true) => f.write_str(&place.name),
                (true, _) => f.write_str("Unknown Location"),
            },
            PlaceLabel::Placeholder(text) => f.write_str(text),
        }
    }
}
