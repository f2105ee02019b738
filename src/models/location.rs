//! Location models: query coordinates, detected user location and the
//! normalized point of interest every provider returns

use serde::{Deserialize, Serialize};

/// Geographic coordinates in decimal degrees
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Both components are finite and within the WGS84 range
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Format location as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }

    /// Round coordinates for cache key generation
    #[must_use]
    pub fn rounded_coordinates(&self, precision: u32) -> (f64, f64) {
        let multiplier = 10_f64.powi(i32::try_from(precision).unwrap_or(4));
        let lat = (self.latitude * multiplier).round() / multiplier;
        let lon = (self.longitude * multiplier).round() / multiplier;
        (lat, lon)
    }
}

/// Location supplied by the detection collaborator (GPS, IP lookup or manual entry)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DetectedLocation {
    pub latitude: f64,
    pub longitude: f64,
    /// State or region code used by provider geographic gates
    pub region: Option<String>,
}

impl DetectedLocation {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            region: None,
        }
    }

    #[must_use]
    pub fn with_region(latitude: f64, longitude: f64, region: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            region: Some(region.into()),
        }
    }

    #[must_use]
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// A normalized point of interest returned by any provider
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LocationCandidate {
    /// Stable identifier, unique among candidates of one registry call
    pub id: String,
    pub title: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Human readable place (vicinity, city, state)
    pub place: String,
    /// Type tag of the provider that produced this candidate
    pub provider_type: String,
    pub url: Option<String>,
    pub phone: Option<String>,
    pub hours: Option<String>,
    /// Rating on a 0-5 scale
    pub rating: Option<f64>,
    /// Distance from the query point in miles
    pub distance_miles: Option<f64>,
    pub tags: Vec<String>,
}

impl LocationCandidate {
    /// Create a candidate with the required attributes; optional ones start empty
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        coordinates: Coordinates,
        place: impl Into<String>,
        provider_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            latitude: coordinates.latitude,
            longitude: coordinates.longitude,
            place: place.into(),
            provider_type: provider_type.into(),
            url: None,
            phone: None,
            hours: None,
            rating: None,
            distance_miles: None,
            tags: Vec::new(),
        }
    }

    #[must_use]
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    #[must_use]
    pub fn has_valid_coordinates(&self) -> bool {
        self.coordinates().is_valid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounded_coordinates() {
        let coords = Coordinates::new(46.818_234, 8.227_456);
        let (lat, lon) = coords.rounded_coordinates(2);
        assert_eq!(lat, 46.82);
        assert_eq!(lon, 8.23);
    }

    #[test]
    fn test_coordinates_validity() {
        assert!(Coordinates::new(27.95, -82.46).is_valid());
        assert!(!Coordinates::new(f64::NAN, -82.46).is_valid());
        assert!(!Coordinates::new(27.95, f64::INFINITY).is_valid());
        assert!(!Coordinates::new(91.0, 0.0).is_valid());
    }

    #[test]
    fn test_candidate_defaults() {
        let candidate = LocationCandidate::new(
            "test-1",
            "Test Place",
            "A place",
            Coordinates::new(27.95, -82.46),
            "Tampa, FL",
            "hiking",
        );
        assert!(candidate.url.is_none());
        assert!(candidate.tags.is_empty());
        assert!(candidate.has_valid_coordinates());
        assert_eq!(candidate.coordinates().format_coordinates(), "27.9500, -82.4600");
    }
}
