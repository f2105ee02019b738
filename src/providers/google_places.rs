//! Google Places nearby-search adapter, one instance per keyword category

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::catalog::PlaceCategory;
use super::http::HttpContext;
use super::{LocationProvider, ProviderError, ProviderRegistration, SearchOutcome, SearchParams};
use crate::geo;
use crate::models::{ConditionsGate, Coordinates, LocationCandidate};

const BASE_URL: &str = "https://maps.googleapis.com/maps/api/place/nearbysearch/json";

/// Google rejects larger nearby-search radii
const MAX_RADIUS_METERS: f64 = 50_000.0;

#[derive(Debug, Deserialize)]
pub struct NearbySearchResponse {
    #[serde(default)]
    pub results: Vec<PlaceResult>,
    pub status: String,
    pub error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlaceResult {
    pub place_id: String,
    pub name: Option<String>,
    pub vicinity: Option<String>,
    pub geometry: Geometry,
    pub rating: Option<f64>,
    pub user_ratings_total: Option<u32>,
    pub business_status: Option<String>,
    #[serde(default)]
    pub types: Vec<String>,
    pub opening_hours: Option<OpeningHours>,
}

#[derive(Debug, Deserialize)]
pub struct Geometry {
    pub location: LatLng,
}

#[derive(Debug, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Deserialize)]
pub struct OpeningHours {
    pub open_now: Option<bool>,
}

impl PlaceResult {
    fn is_closed(&self) -> bool {
        matches!(
            self.business_status.as_deref(),
            Some("CLOSED_PERMANENTLY" | "CLOSED_TEMPORARILY")
        )
    }

    fn to_candidate(&self, category: &PlaceCategory, origin: Coordinates) -> LocationCandidate {
        let coordinates = Coordinates::new(self.geometry.location.lat, self.geometry.location.lng);
        let title = self.name.clone().unwrap_or_else(|| category.name.to_string());
        let place = self
            .vicinity
            .clone()
            .unwrap_or_else(|| format!("{} ({})", title, coordinates.format_coordinates()));

        let mut description = category.description.to_string();
        if let (Some(rating), Some(total)) = (self.rating, self.user_ratings_total) {
            description.push_str(&format!(" Rated {}/5 by {} visitors.", rating, total));
        }

        let mut candidate = LocationCandidate::new(
            format!("{}-{}", category.type_tag.replace('_', "-"), self.place_id),
            title,
            description,
            coordinates,
            place,
            category.type_tag,
        );
        candidate.rating = self.rating;
        candidate.url = Some(format!(
            "https://www.google.com/maps/place/?q=place_id:{}",
            self.place_id
        ));
        candidate.hours = self
            .opening_hours
            .as_ref()
            .and_then(|hours| hours.open_now)
            .map(|open| (if open { "Open now" } else { "Closed now" }).to_string());
        candidate.distance_miles = Some(geo::rounded_distance_miles(origin, coordinates));
        candidate.tags = self
            .types
            .iter()
            .filter(|t| !matches!(t.as_str(), "point_of_interest" | "establishment"))
            .take(3)
            .cloned()
            .collect();
        candidate
    }
}

pub struct GooglePlacesProvider {
    registration: ProviderRegistration,
    category: PlaceCategory,
    api_key: Option<String>,
    http: Arc<HttpContext>,
}

impl GooglePlacesProvider {
    pub fn new(category: PlaceCategory, api_key: Option<String>, http: Arc<HttpContext>) -> Self {
        let registration =
            ProviderRegistration::new(category.name, category.type_tag, category.weight)
                .with_gate(ConditionsGate::modes(&[category.mode]));
        Self {
            registration,
            category,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            http,
        }
    }

    fn build_url(&self, api_key: &str, params: &SearchParams) -> String {
        let radius = params.radius_meters().min(MAX_RADIUS_METERS);
        format!(
            "{}?location={},{}&radius={:.0}&keyword={}&key={}",
            BASE_URL,
            params.latitude,
            params.longitude,
            radius,
            urlencoding::encode(self.category.query),
            urlencoding::encode(api_key)
        )
    }
}

/// Convert a nearby-search response into candidates, skipping closed places
pub fn parse_response(
    response: NearbySearchResponse,
    category: &PlaceCategory,
    params: &SearchParams,
) -> Result<Vec<LocationCandidate>, ProviderError> {
    match response.status.as_str() {
        "OK" | "ZERO_RESULTS" => {}
        "OVER_QUERY_LIMIT" => {
            return Err(ProviderError::RateLimited(
                "Google Places quota exceeded".to_string(),
            ));
        }
        status => {
            return Err(ProviderError::api(
                200,
                format!(
                    "Google Places {}: {}",
                    status,
                    response.error_message.unwrap_or_default()
                ),
            ));
        }
    }

    let origin = params.coordinates();
    let candidates = response
        .results
        .iter()
        .filter(|result| {
            if result.is_closed() {
                debug!("Skipping closed place {}", result.place_id);
            }
            !result.is_closed()
        })
        .take(params.limit)
        .map(|result| result.to_candidate(category, origin))
        .collect();

    Ok(candidates)
}

#[async_trait]
impl LocationProvider for GooglePlacesProvider {
    fn registration(&self) -> &ProviderRegistration {
        &self.registration
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    #[instrument(skip(self, params), fields(provider = self.category.type_tag))]
    async fn search(&self, params: &SearchParams) -> Result<SearchOutcome, ProviderError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(ProviderError::not_configured(
                "Google Places API key not configured",
            ));
        };

        if let Some(candidates) = self.http.cached(self.category.type_tag, params).await {
            debug!("Using {} cached candidates", candidates.len());
            return Ok(SearchOutcome::cached(candidates));
        }

        let url = self.build_url(api_key, params);
        let response: NearbySearchResponse = self.http.get_json("Google Places", &url).await?;
        let candidates = parse_response(response, &self.category, params)?;

        info!(
            "Google Places returned {} {} locations",
            candidates.len(),
            self.category.query
        );
        self.http
            .store(self.category.type_tag, params, &candidates)
            .await;
        Ok(SearchOutcome::new(candidates, 1))
    }
}
