//! Certified dark-sky places for stargazing, served from an embedded dataset

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{LocationProvider, ProviderError, ProviderRegistration, SearchOutcome, SearchParams};
use crate::geo;
use crate::models::{ConditionsGate, Coordinates, LocationCandidate, QuestMode, TimeOfDay, WeatherKind};

pub const TYPE_TAG: &str = "stargazing";

/// Certified places are worth a longer drive than ordinary results
const MIN_RADIUS_MILES: f64 = 100.0;

const DATASET: &str = include_str!("dark_sky_places.json");

#[derive(Debug, Clone, Deserialize)]
pub struct DarkSkyPlace {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub designation: String,
    pub state: String,
    pub lat: f64,
    pub lng: f64,
    pub certification_year: u16,
    pub description: String,
    pub website_url: Option<String>,
}

impl DarkSkyPlace {
    fn rating(&self) -> f64 {
        match self.designation.as_str() {
            "Gold" => 5.0,
            "Silver" => 4.5,
            _ => 4.0,
        }
    }

    fn full_description(&self) -> String {
        let tier = match self.designation.as_str() {
            "Gold" => "Gold Tier ",
            "Silver" => "Silver Tier ",
            "Bronze" => "Bronze Tier ",
            _ => "",
        };
        let kind = match self.kind.as_str() {
            "park" => "Dark Sky Park",
            "reserve" => "Dark Sky Reserve",
            "sanctuary" => "Dark Sky Sanctuary",
            _ => "Dark Sky Location",
        };
        format!(
            "{}International {} certified by DarkSky International in {}. {}",
            tier, kind, self.certification_year, self.description
        )
    }

    fn to_candidate(&self, distance_miles: f64) -> LocationCandidate {
        let mut candidate = LocationCandidate::new(
            format!("darksky-{}", self.id),
            self.name.clone(),
            self.full_description(),
            Coordinates::new(self.lat, self.lng),
            format!("{}, {}", self.name, self.state),
            TYPE_TAG,
        );
        candidate.rating = Some(self.rating());
        candidate.url = Some(
            self.website_url
                .clone()
                .unwrap_or_else(|| format!("https://darksky.org/places/{}", self.id)),
        );
        candidate.distance_miles = Some(distance_miles);
        candidate.tags = vec!["DarkSky Certified".to_string()];
        candidate
    }
}

/// Stargazing provider; needs no credentials, only clear night skies
pub struct DarkSkyProvider {
    registration: ProviderRegistration,
    places: Vec<DarkSkyPlace>,
}

impl DarkSkyProvider {
    pub fn new() -> Result<Self, serde_json::Error> {
        let places: Vec<DarkSkyPlace> = serde_json::from_str(DATASET)?;
        Ok(Self::with_places(places))
    }

    pub fn with_places(places: Vec<DarkSkyPlace>) -> Self {
        let gate = ConditionsGate {
            weather: Some(WeatherKind::Clear),
            time_of_day: Some(TimeOfDay::Night),
            ..ConditionsGate::modes(&[QuestMode::PureLocation])
        };
        Self {
            registration: ProviderRegistration::new("Stargazing Explorer", TYPE_TAG, 4.0)
                .with_gate(gate),
            places,
        }
    }

    #[must_use]
    pub fn place_count(&self) -> usize {
        self.places.len()
    }

    /// Places within `max(radius, 100)` miles, nearest first
    fn nearby(&self, params: &SearchParams) -> Vec<LocationCandidate> {
        let origin = params.coordinates();
        let radius = params.radius_miles.max(MIN_RADIUS_MILES);

        let mut nearby: Vec<(f64, &DarkSkyPlace)> = self
            .places
            .iter()
            .map(|place| {
                let distance = geo::rounded_distance_miles(
                    origin,
                    Coordinates::new(place.lat, place.lng),
                );
                (distance, place)
            })
            .filter(|(distance, _)| *distance <= radius)
            .collect();

        nearby.sort_by(|a, b| a.0.total_cmp(&b.0));

        nearby
            .into_iter()
            .take(params.limit)
            .map(|(distance, place)| place.to_candidate(distance))
            .collect()
    }
}

#[async_trait]
impl LocationProvider for DarkSkyProvider {
    fn registration(&self) -> &ProviderRegistration {
        &self.registration
    }

    fn is_configured(&self) -> bool {
        !self.places.is_empty()
    }

    async fn search(&self, params: &SearchParams) -> Result<SearchOutcome, ProviderError> {
        let candidates = self.nearby(params);
        debug!("Found {} dark sky places nearby", candidates.len());
        Ok(SearchOutcome::new(candidates, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProviderConditions;

    #[test]
    fn test_embedded_dataset_loads() {
        let provider = DarkSkyProvider::new().unwrap();
        assert!(provider.place_count() > 40);
        assert!(provider.is_available());
    }

    #[tokio::test]
    async fn test_search_nearest_first_with_minimum_radius() {
        let provider = DarkSkyProvider::new().unwrap();
        // Tampa: Kissimmee Prairie and Groveland are within 100 miles
        let params = SearchParams::new(27.95, -82.46, 10.0, 5);
        let outcome = provider.search(&params).await.unwrap();

        assert!(!outcome.candidates.is_empty());
        assert_eq!(outcome.api_calls, 0);
        let distances: Vec<f64> = outcome
            .candidates
            .iter()
            .map(|c| c.distance_miles.unwrap())
            .collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
        assert!(distances.iter().all(|d| *d <= 100.0));
        assert!(outcome.candidates.iter().all(|c| c.tags == vec!["DarkSky Certified"]));
    }

    #[tokio::test]
    async fn test_search_respects_limit_and_ratings() {
        let provider = DarkSkyProvider::new().unwrap();
        // Moab area has several Gold tier parks
        let params = SearchParams::new(38.57, -109.55, 150.0, 3);
        let outcome = provider.search(&params).await.unwrap();

        assert_eq!(outcome.candidates.len(), 3);
        for candidate in &outcome.candidates {
            let rating = candidate.rating.unwrap();
            assert!([4.0, 4.5, 5.0].contains(&rating));
            assert!(candidate.id.starts_with("darksky-"));
        }
    }

    #[test]
    fn test_gate_requires_clear_night() {
        let provider = DarkSkyProvider::new().unwrap();
        let params = SearchParams::new(38.57, -109.55, 25.0, 5);
        let clear_night = ProviderConditions::for_mode(QuestMode::PureLocation)
            .with_weather(WeatherKind::Clear)
            .with_time_of_day(TimeOfDay::Night);

        assert!(provider.can_activate(&params, &clear_night));
        assert!(!provider.can_activate(
            &params,
            &clear_night.clone().with_time_of_day(TimeOfDay::Afternoon)
        ));
        assert!(!provider.can_activate(
            &params,
            &clear_night.with_weather(WeatherKind::Rain)
        ));
    }

    #[test]
    fn test_rating_by_designation() {
        let mut place = DarkSkyPlace {
            id: "test".to_string(),
            name: "Test Park".to_string(),
            kind: "park".to_string(),
            designation: "Gold".to_string(),
            state: "UT".to_string(),
            lat: 38.0,
            lng: -110.0,
            certification_year: 2020,
            description: "Very dark.".to_string(),
            website_url: None,
        };
        assert_eq!(place.rating(), 5.0);
        place.designation = "Bronze".to_string();
        assert_eq!(place.rating(), 4.0);

        let candidate = place.to_candidate(12.3);
        assert_eq!(candidate.url.as_deref(), Some("https://darksky.org/places/test"));
        assert!(candidate.description.starts_with("Bronze Tier International Dark Sky Park"));
    }
}
