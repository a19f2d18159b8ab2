//! Location classification and resolution.
//!
//! Tool arguments arrive as free-form strings. [`classify`] decides by shape
//! whether a string is a LocationID, a `lon,lat` pair or a place name, and
//! [`LocationResolver`] turns it into the form an endpoint expects, calling
//! the city lookup only when the shape alone is not enough.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::models::GeoLocation;

/// A longitude/latitude pair, longitude first as the provider expects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub longitude: f64,
    pub latitude: f64,
}

impl Coordinates {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Reject values outside [-180, 180] / [-90, 90].
    pub fn validate(self) -> Result<Self> {
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(Error::invalid_argument(format!(
                "longitude {} is outside [-180, 180]",
                self.longitude
            )));
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(Error::invalid_argument(format!(
                "latitude {} is outside [-90, 90]",
                self.latitude
            )));
        }
        Ok(self)
    }

    /// Latitude and longitude as path segments, two decimals each.
    pub fn path_segments(&self) -> (String, String) {
        (
            format!("{:.2}", self.latitude),
            format!("{:.2}", self.longitude),
        )
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2},{:.2}", self.longitude, self.latitude)
    }
}

impl FromStr for Coordinates {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_pair(s).ok_or_else(|| {
            Error::invalid_argument(format!(
                "'{}' is not a coordinate pair, expected longitude,latitude (e.g. 116.41,39.92)",
                s.trim()
            ))
        })
    }
}

fn parse_pair(s: &str) -> Option<Coordinates> {
    let (lon, lat) = s.trim().split_once(',')?;
    let lon: f64 = lon.trim().parse().ok()?;
    let lat: f64 = lat.trim().parse().ok()?;
    (lon.is_finite() && lat.is_finite()).then(|| Coordinates::new(lon, lat))
}

/// Shape of a location argument.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationRef {
    Identifier(String),
    Coordinates(Coordinates),
    Name(String),
}

/// Classify a location string by its shape alone.
pub fn classify(input: &str) -> LocationRef {
    let input = input.trim();
    if !input.is_empty() && input.bytes().all(|b| b.is_ascii_digit()) {
        return LocationRef::Identifier(input.to_string());
    }
    match parse_pair(input) {
        Some(coords) => LocationRef::Coordinates(coords),
        None => LocationRef::Name(input.to_string()),
    }
}

/// A location in a form the provider accepts as a query parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationParam {
    Identifier(String),
    Coordinates(Coordinates),
}

impl LocationParam {
    pub fn coordinates(&self) -> Option<Coordinates> {
        match self {
            Self::Coordinates(c) => Some(*c),
            Self::Identifier(_) => None,
        }
    }
}

impl fmt::Display for LocationParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier(id) => f.write_str(id),
            Self::Coordinates(c) => c.fmt(f),
        }
    }
}

/// What an endpoint accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// LocationID or coordinates; only names are looked up.
    Any,
    /// LocationID only; coordinates are looked up too.
    Identifier,
    /// Coordinates only; identifiers and names are looked up.
    Coordinates,
}

/// Name-to-location search against the provider.
#[async_trait]
pub trait CityLookup: Send + Sync {
    /// Matches for `query`, best first. An empty list means no match.
    async fn lookup(&self, query: &str, lang: Option<&str>) -> Result<Vec<GeoLocation>>;
}

#[derive(Clone)]
pub struct LocationResolver {
    lookup: Arc<dyn CityLookup>,
}

impl LocationResolver {
    pub fn new(lookup: Arc<dyn CityLookup>) -> Self {
        Self { lookup }
    }

    /// Pass identifiers and coordinates through; look names up.
    pub async fn resolve(&self, location: &str) -> Result<LocationParam> {
        self.resolve_as(location, Target::Any, None).await
    }

    pub async fn resolve_as(
        &self,
        location: &str,
        target: Target,
        lang: Option<&str>,
    ) -> Result<LocationParam> {
        let location = location.trim();
        if location.is_empty() {
            return Err(Error::invalid_argument("location must not be empty"));
        }

        let query = match (classify(location), target) {
            (LocationRef::Identifier(id), Target::Any | Target::Identifier) => {
                return Ok(LocationParam::Identifier(id))
            }
            (LocationRef::Coordinates(c), Target::Any | Target::Coordinates) => {
                return Ok(LocationParam::Coordinates(c))
            }
            (LocationRef::Coordinates(c), Target::Identifier) => c.to_string(),
            (LocationRef::Identifier(s) | LocationRef::Name(s), _) => s,
        };

        let first = self
            .lookup
            .lookup(&query, lang)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                warn!("No location found for '{}'", query);
                Error::Resolution(query.clone())
            })?;

        let resolved = match target {
            Target::Coordinates => {
                LocationParam::Coordinates(Coordinates::new(first.lon, first.lat))
            }
            Target::Any | Target::Identifier => LocationParam::Identifier(first.id),
        };
        info!("Resolved '{}' ({}) to {}", query, first.name, resolved);
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeLookup {
        results: Vec<GeoLocation>,
        calls: AtomicUsize,
        queries: Mutex<Vec<String>>,
    }

    impl FakeLookup {
        fn with(results: Vec<GeoLocation>) -> Arc<Self> {
            Arc::new(Self {
                results,
                ..Default::default()
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CityLookup for FakeLookup {
        async fn lookup(&self, query: &str, _lang: Option<&str>) -> Result<Vec<GeoLocation>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.queries.lock().unwrap().push(query.to_string());
            Ok(self.results.clone())
        }
    }

    struct FailingLookup;

    #[async_trait]
    impl CityLookup for FailingLookup {
        async fn lookup(&self, _query: &str, _lang: Option<&str>) -> Result<Vec<GeoLocation>> {
            Err(Error::UpstreamStatus {
                status: 401,
                body: "unauthorized".to_string(),
            })
        }
    }

    fn beijing() -> GeoLocation {
        GeoLocation {
            name: "北京".to_string(),
            id: "101010100".to_string(),
            lat: 39.90499,
            lon: 116.40529,
            adm1: Some("北京市".to_string()),
            adm2: Some("北京".to_string()),
            country: Some("中国".to_string()),
        }
    }

    fn chaoyang() -> GeoLocation {
        GeoLocation {
            name: "朝阳".to_string(),
            id: "101010300".to_string(),
            lat: 39.92149,
            lon: 116.48641,
            adm1: None,
            adm2: None,
            country: None,
        }
    }

    #[test]
    fn classify_by_shape() {
        assert_eq!(
            classify("101010100"),
            LocationRef::Identifier("101010100".to_string())
        );
        assert_eq!(
            classify(" 116.41, 39.92 "),
            LocationRef::Coordinates(Coordinates::new(116.41, 39.92))
        );
        assert_eq!(classify("北京"), LocationRef::Name("北京".to_string()));
        assert_eq!(classify("Beijing"), LocationRef::Name("Beijing".to_string()));
        assert_eq!(classify("116.41,"), LocationRef::Name("116.41,".to_string()));
        assert_eq!(classify("1,2,3"), LocationRef::Name("1,2,3".to_string()));
        assert_eq!(classify("inf,1"), LocationRef::Name("inf,1".to_string()));
    }

    #[test]
    fn coordinates_render_with_two_decimals() {
        let c = Coordinates::new(116.405285, 39.904989);
        assert_eq!(c.to_string(), "116.41,39.90");
        assert_eq!(c.path_segments(), ("39.90".to_string(), "116.41".to_string()));
    }

    #[test]
    fn coordinates_range_check() {
        assert!(Coordinates::new(116.41, 39.92).validate().is_ok());
        assert!(Coordinates::new(181.0, 0.0).validate().is_err());
        assert!(Coordinates::new(0.0, -90.5).validate().is_err());
        assert!("北京".parse::<Coordinates>().is_err());
    }

    #[tokio::test]
    async fn identifier_passes_through_without_lookup() {
        let lookup = FakeLookup::with(vec![beijing()]);
        let resolver = LocationResolver::new(lookup.clone());

        let param = resolver.resolve("101010100").await.unwrap();

        assert_eq!(param, LocationParam::Identifier("101010100".to_string()));
        assert_eq!(lookup.calls(), 0);
    }

    #[tokio::test]
    async fn coordinates_pass_through_without_lookup() {
        let lookup = FakeLookup::with(vec![beijing()]);
        let resolver = LocationResolver::new(lookup.clone());

        let param = resolver.resolve("116.41,39.92").await.unwrap();

        assert_eq!(
            param,
            LocationParam::Coordinates(Coordinates::new(116.41, 39.92))
        );
        assert_eq!(param.to_string(), "116.41,39.92");
        assert_eq!(lookup.calls(), 0);
    }

    #[tokio::test]
    async fn name_uses_first_match() {
        let lookup = FakeLookup::with(vec![beijing(), chaoyang()]);
        let resolver = LocationResolver::new(lookup.clone());

        let param = resolver.resolve("北京").await.unwrap();

        assert_eq!(param, LocationParam::Identifier("101010100".to_string()));
        assert_eq!(lookup.calls(), 1);
        assert_eq!(lookup.queries.lock().unwrap().as_slice(), ["北京"]);
    }

    #[tokio::test]
    async fn empty_result_is_a_resolution_error() {
        let lookup = FakeLookup::with(vec![]);
        let resolver = LocationResolver::new(lookup.clone());

        let err = resolver.resolve("Atlantis").await.unwrap_err();

        assert!(matches!(err, Error::Resolution(ref q) if q == "Atlantis"));
        assert_eq!(lookup.calls(), 1);
    }

    #[tokio::test]
    async fn lookup_failure_is_an_upstream_error() {
        let resolver = LocationResolver::new(Arc::new(FailingLookup));

        let err = resolver.resolve("北京").await.unwrap_err();

        assert!(err.is_upstream());
    }

    #[tokio::test]
    async fn blank_location_is_rejected() {
        let lookup = FakeLookup::with(vec![beijing()]);
        let resolver = LocationResolver::new(lookup.clone());

        let err = resolver.resolve("   ").await.unwrap_err();

        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(lookup.calls(), 0);
    }

    #[tokio::test]
    async fn coordinates_target_looks_up_names_and_ids() {
        let lookup = FakeLookup::with(vec![beijing()]);
        let resolver = LocationResolver::new(lookup.clone());

        let from_name = resolver
            .resolve_as("北京", Target::Coordinates, Some("zh"))
            .await
            .unwrap();
        let from_id = resolver
            .resolve_as("101010100", Target::Coordinates, None)
            .await
            .unwrap();
        let passthrough = resolver
            .resolve_as("116.41,39.92", Target::Coordinates, None)
            .await
            .unwrap();

        assert_eq!(from_name.to_string(), "116.41,39.90");
        assert_eq!(from_id, from_name);
        assert_eq!(passthrough.to_string(), "116.41,39.92");
        assert_eq!(lookup.calls(), 2);
    }

    #[tokio::test]
    async fn identifier_target_looks_up_coordinates() {
        let lookup = FakeLookup::with(vec![beijing()]);
        let resolver = LocationResolver::new(lookup.clone());

        let param = resolver
            .resolve_as("116.4053,39.9061", Target::Identifier, None)
            .await
            .unwrap();

        assert_eq!(param, LocationParam::Identifier("101010100".to_string()));
        assert_eq!(lookup.queries.lock().unwrap().as_slice(), ["116.41,39.91"]);
    }
}
