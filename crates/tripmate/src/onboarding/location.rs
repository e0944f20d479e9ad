//! City suggestions for the location step.
//!
//! [`Geocoder`] is the outbound seam; [`LocationSearch`] wraps one with keystroke debouncing
//! and a generation counter so only the newest query can publish results.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use super::domain::{Coordinates, Location};
use crate::config::GeocoderConfig;

/// Queries shorter than this never reach the geocoder.
pub const MIN_QUERY_CHARS: usize = 2;

const USER_AGENT: &str = concat!("tripmate/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("geocoder client could not be built: {0}")]
    Client(String),
    #[error("geocoder request failed: {0}")]
    Transport(String),
    #[error("geocoder answered with status {0}")]
    Status(u16),
    #[error("geocoder response could not be decoded: {0}")]
    Decode(String),
}

pub trait Geocoder: Send + Sync {
    fn search(&self, query: &str)
        -> impl Future<Output = Result<Vec<Location>, GeocodeError>> + Send;
}

/// Nominatim-style search endpoint restricted to city-like results.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
    limit: u32,
}

#[derive(Debug, Deserialize)]
struct Place {
    display_name: String,
    lat: String,
    lon: String,
    #[serde(default)]
    address: PlaceAddress,
}

#[derive(Debug, Default, Deserialize)]
struct PlaceAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    country: Option<String>,
}

impl Place {
    fn into_location(self) -> Location {
        let Place {
            display_name,
            lat,
            lon,
            address,
        } = self;
        let city = address
            .city
            .or(address.town)
            .or(address.village)
            .unwrap_or_default();
        let country = address.country.unwrap_or_default();
        let coordinates = match (lat.parse::<f64>(), lon.parse::<f64>()) {
            (Ok(lat), Ok(lon)) => Some(Coordinates { lat, lon }),
            _ => None,
        };
        Location {
            city,
            country,
            display_name,
            coordinates,
        }
    }
}

impl NominatimGeocoder {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, limit: u32) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            limit,
        }
    }

    pub fn from_config(config: &GeocoderConfig) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|err| GeocodeError::Client(err.to_string()))?;
        Ok(Self::new(client, config.base_url.clone(), config.result_limit))
    }
}

impl Geocoder for NominatimGeocoder {
    async fn search(&self, query: &str) -> Result<Vec<Location>, GeocodeError> {
        let url = format!("{}/search", self.base_url);
        let limit = self.limit.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("addressdetails", "1"),
                ("featuretype", "city"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|err| GeocodeError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }

        let places: Vec<Place> = response
            .json()
            .await
            .map_err(|err| GeocodeError::Decode(err.to_string()))?;
        debug!(query, results = places.len(), "geocoder answered");
        Ok(places.into_iter().map(Place::into_location).collect())
    }
}

/// Fixed list of places; used offline and by the demo command.
#[derive(Debug, Clone, Default)]
pub struct StaticGeocoder {
    places: Vec<Location>,
}

impl StaticGeocoder {
    pub fn new(places: Vec<Location>) -> Self {
        Self { places }
    }

    pub fn demo() -> Self {
        let place = |city: &str, country: &str, lat: f64, lon: f64| Location {
            city: city.to_string(),
            country: country.to_string(),
            display_name: format!("{city}, {country}"),
            coordinates: Some(Coordinates { lat, lon }),
        };
        Self::new(vec![
            place("Vienna", "Austria", 48.2082, 16.3738),
            place("Graz", "Austria", 47.0707, 15.4395),
            place("Salzburg", "Austria", 47.8095, 13.055),
            place("Berlin", "Germany", 52.52, 13.405),
            place("Munich", "Germany", 48.1351, 11.582),
            place("Zurich", "Switzerland", 47.3769, 8.5417),
        ])
    }
}

impl Geocoder for StaticGeocoder {
    async fn search(&self, query: &str) -> Result<Vec<Location>, GeocodeError> {
        let needle = query.trim().to_lowercase();
        Ok(self
            .places
            .iter()
            .filter(|place| place.display_name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Suggestions(Vec<Location>),
    /// A newer query started before this one finished; its results were discarded.
    Superseded,
}

impl SearchOutcome {
    pub fn suggestions(&self) -> &[Location] {
        match self {
            SearchOutcome::Suggestions(places) => places,
            SearchOutcome::Superseded => &[],
        }
    }
}

/// Debounced, last-writer-wins search. Failures degrade to an empty list.
pub struct LocationSearch<G> {
    geocoder: Arc<G>,
    debounce: Duration,
    generation: AtomicU64,
}

impl<G: Geocoder> LocationSearch<G> {
    pub fn new(geocoder: Arc<G>, debounce: Duration) -> Self {
        Self {
            geocoder,
            debounce,
            generation: AtomicU64::new(0),
        }
    }

    pub fn from_config(geocoder: Arc<G>, config: &GeocoderConfig) -> Self {
        Self::new(geocoder, config.debounce)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Call once per keystroke. Earlier calls still in flight resolve to `Superseded`.
    pub async fn search(&self, query: &str) -> SearchOutcome {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_CHARS {
            return SearchOutcome::Suggestions(Vec::new());
        }

        tokio::time::sleep(self.debounce).await;
        if !self.is_current(generation) {
            return SearchOutcome::Superseded;
        }

        let result = self.geocoder.search(query).await;
        if !self.is_current(generation) {
            debug!(query, "dropping stale location results");
            return SearchOutcome::Superseded;
        }

        match result {
            Ok(places) => SearchOutcome::Suggestions(places),
            Err(err) => {
                warn!(query, %err, "location search failed");
                SearchOutcome::Suggestions(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn places_fall_back_from_city_to_town_to_village() {
        let place: Place = serde_json::from_value(serde_json::json!({
            "display_name": "Hallstatt, Gmunden, Upper Austria, Austria",
            "lat": "47.56",
            "lon": "13.64",
            "address": { "village": "Hallstatt", "country": "Austria" }
        }))
        .expect("place decodes");

        let location = place.into_location();
        assert_eq!(location.city, "Hallstatt");
        assert_eq!(location.country, "Austria");
        assert_eq!(
            location.display_name,
            "Hallstatt, Gmunden, Upper Austria, Austria"
        );
        assert_eq!(
            location.coordinates,
            Some(Coordinates {
                lat: 47.56,
                lon: 13.64
            })
        );
    }

    #[test]
    fn missing_address_leaves_city_empty() {
        let place: Place = serde_json::from_value(serde_json::json!({
            "display_name": "Graz, Styria, Austria",
            "lat": "n/a",
            "lon": "15.43"
        }))
        .expect("place decodes");

        let location = place.into_location();
        assert_eq!(location.city, "");
        assert_eq!(location.display_name, "Graz, Styria, Austria");
        assert!(location.coordinates.is_none());
    }

    #[tokio::test]
    async fn static_geocoder_matches_case_insensitively() {
        let geocoder = StaticGeocoder::demo();
        let places = geocoder.search("  austria ").await.expect("search");
        assert_eq!(places.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn short_queries_skip_the_geocoder() {
        let search = LocationSearch::new(
            Arc::new(StaticGeocoder::demo()),
            Duration::from_millis(300),
        );
        assert_eq!(
            search.search("V").await,
            SearchOutcome::Suggestions(Vec::new())
        );
    }
}
