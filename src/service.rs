use std::sync::Arc;
use std::time::Duration;

use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters, ServerHandler},
    model::{CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError,
};
use serde_json::{json, Map, Value};

use crate::auth::CredentialManager;
use crate::client::QWeatherClient;
use crate::config::Config;
use crate::constants::{HISTORY_MAX_DAYS, HISTORY_REQUEST_PAUSE_MS};
use crate::error::Error;
use crate::location::{Coordinates, LocationParam, LocationResolver, Target};
use crate::models::{
    CityRequest, GetAirQualityDailyRequest, GetAirQualityHistoryRequest,
    GetAirQualityHourlyRequest, GetAirQualityStationRequest, GetAstronomyRequest,
    GetGridWeatherDailyRequest, GetGridWeatherHourlyRequest, GetGridWeatherNowRequest,
    GetHourlyWeatherRequest, GetIndicesRequest, GetMinutelyRequest, GetTopCitiesRequest,
    GetWeatherHistoryRequest, GetWeatherNowRequest, GetWeatherRequest, SearchPoiRangeRequest,
    SearchPoiRequest,
};
use crate::params::{self, CITY_TYPES, POI_TYPES, UNITS};

const WEATHER_DAYS: &[&str] = &["3d", "7d", "10d", "15d", "30d"];
const WEATHER_HOURS: &[&str] = &["24h", "72h", "168h"];
const INDICES_DAYS: &[&str] = &["1d", "3d"];
const GRID_DAYS: &[&str] = &["3d", "7d"];
const GRID_HOURS: &[&str] = &["24h", "72h"];
const AIR_DAYS: &[&str] = &["3d", "7d", "15d"];

/// MCP service exposing the QWeather API as tools
#[derive(Clone)]
pub struct Weather {
    client: Arc<QWeatherClient>,
    resolver: LocationResolver,
    tool_router: ToolRouter<Self>,
}

impl Weather {
    /// Creates the service, failing fast on unusable credentials
    pub fn new(config: &Config) -> Result<Self, Error> {
        let credentials = Arc::new(CredentialManager::new(&config.auth)?);
        let client = Arc::new(QWeatherClient::new(config.base_url.clone(), credentials)?);
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Arc<QWeatherClient>) -> Self {
        Self {
            resolver: LocationResolver::new(client.clone()),
            client,
            tool_router: Self::tool_router(),
        }
    }

    /// Fetches `path` and returns the JSON body as text content
    async fn fetch(&self, path: &str, query: &[(&str, String)]) -> Result<CallToolResult, McpError> {
        let body: Value = self.client.get(path, query).await?;
        json_result(&body)
    }

    /// Fetches one day at a time, keeping per-day failures in the result map
    async fn fetch_history(
        &self,
        path: &str,
        location: &LocationParam,
        days: u32,
        extra: &[(&str, String)],
    ) -> Result<CallToolResult, McpError> {
        let today = params::beijing_today(chrono::Utc::now());
        let mut results = Map::new();

        for date in params::history_dates(today, days) {
            let mut query = vec![("location", location.to_string()), ("date", date.clone())];
            query.extend(extra.iter().cloned());

            let entry = match self.client.get::<Value>(path, &query).await {
                Ok(body) => body,
                Err(Error::UpstreamStatus { status, body }) => {
                    json!({ "error": body, "status_code": status })
                }
                Err(e) => {
                    tracing::error!("History request for {} failed: {}", date, e);
                    json!({ "error": e.to_string() })
                }
            };
            results.insert(date, entry);

            tokio::time::sleep(Duration::from_millis(HISTORY_REQUEST_PAUSE_MS)).await;
        }

        json_result(&Value::Object(results))
    }

    async fn resolve(
        &self,
        location: &str,
        target: Target,
        lang: &str,
    ) -> Result<LocationParam, McpError> {
        Ok(self.resolver.resolve_as(location, target, Some(lang)).await?)
    }

    /// Resolves to coordinates and returns them as `{lat}`/`{lon}` path segments
    async fn resolve_path_coordinates(
        &self,
        location: &str,
        lang: &str,
    ) -> Result<(String, String), McpError> {
        let param = self.resolve(location, Target::Coordinates, lang).await?;
        let coords = param
            .coordinates()
            .ok_or_else(|| McpError::internal_error("location did not resolve to coordinates", None))?;
        Ok(coords.validate()?.path_segments())
    }

    /// Optional `city` filter for POI searches, always sent as a LocationID
    async fn poi_city(
        &self,
        city: Option<&str>,
        lang: &str,
    ) -> Result<Option<(&'static str, String)>, McpError> {
        match city.map(str::trim).filter(|c| !c.is_empty()) {
            Some(city) => {
                let id = self.resolve(city, Target::Identifier, lang).await?;
                Ok(Some(("city", id.to_string())))
            }
            None => Ok(None),
        }
    }
}

fn json_result(body: &Value) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string_pretty(body).map_err(Error::from)?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

/// Coordinates given explicitly by the caller, range-checked
fn strict_coordinates(location: &str) -> Result<Coordinates, McpError> {
    let coords: Coordinates = params::required("location", location)?.parse()?;
    Ok(coords.validate()?)
}

#[tool_handler]
impl ServerHandler for Weather {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "qweather-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                title: Some("QWeather".to_string()),
                website_url: None,
            },
            instructions: Some(
                "Weather, air quality, astronomy, warning and geo data powered by the QWeather API. \
                Locations may be given as a city name, a LocationID such as 101010100, or \
                'longitude,latitude' such as 116.41,39.92."
                    .to_string(),
            ),
        }
    }
}

#[tool_router]
impl Weather {
    /// Gets the daily forecast for a city
    #[tool(description = "Get the daily weather forecast for a city: temperature, humidity, wind, precipitation. days: 3d (default), 7d, 10d, 15d or 30d.")]
    pub async fn get_weather(
        &self,
        Parameters(request): Parameters<GetWeatherRequest>,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!("Getting {} forecast for city: {}", request.days, request.city);

        let city = params::required("city", &request.city)?;
        params::one_of("days", &request.days, WEATHER_DAYS)?;
        let location = self.resolve(city, Target::Any, &request.lang).await?;

        self.fetch(
            &format!("/v7/weather/{}", request.days),
            &[("location", location.to_string()), ("lang", request.lang)],
        )
        .await
    }

    /// Gets current conditions for a location or city
    #[tool(description = "Get current (near real-time) weather: temperature, feels-like, wind, humidity, pressure, precipitation, visibility, cloud cover. Provide location (LocationID or 'longitude,latitude') or city.")]
    pub async fn get_weather_now(
        &self,
        Parameters(request): Parameters<GetWeatherNowRequest>,
    ) -> Result<CallToolResult, McpError> {
        params::one_of("unit", &request.unit, UNITS)?;
        let input = params::location_or_city(request.location.as_deref(), request.city.as_deref())?;
        tracing::info!("Getting current weather for: {}", input);

        let location = self.resolve(input, Target::Any, &request.lang).await?;

        self.fetch(
            "/v7/weather/now",
            &[
                ("location", location.to_string()),
                ("lang", request.lang),
                ("unit", request.unit),
            ],
        )
        .await
    }

    /// Gets the hourly forecast for a location or city
    #[tool(description = "Get the hourly weather forecast for the next 24h (default), 72h or 168h. Provide location (LocationID or 'longitude,latitude') or city.")]
    pub async fn get_hourly_weather(
        &self,
        Parameters(request): Parameters<GetHourlyWeatherRequest>,
    ) -> Result<CallToolResult, McpError> {
        params::one_of("hours", &request.hours, WEATHER_HOURS)?;
        params::one_of("unit", &request.unit, UNITS)?;
        let input = params::location_or_city(request.location.as_deref(), request.city.as_deref())?;
        tracing::info!("Getting {} hourly forecast for: {}", request.hours, input);

        let location = self.resolve(input, Target::Any, &request.lang).await?;

        self.fetch(
            &format!("/v7/weather/{}", request.hours),
            &[
                ("location", location.to_string()),
                ("lang", request.lang),
                ("unit", request.unit),
            ],
        )
        .await
    }

    /// Gets past daily weather, one request per day
    #[tool(description = "Get historical weather for the last 1-10 days (default 10, today excluded), keyed by yyyyMMdd date. Provide location (LocationID or 'longitude,latitude') or city.")]
    pub async fn get_weather_history(
        &self,
        Parameters(request): Parameters<GetWeatherHistoryRequest>,
    ) -> Result<CallToolResult, McpError> {
        params::in_range("days", request.days, 1..=HISTORY_MAX_DAYS)?;
        params::one_of("unit", &request.unit, UNITS)?;
        let input = params::location_or_city(request.location.as_deref(), request.city.as_deref())?;
        tracing::info!("Getting {} days of weather history for: {}", request.days, input);

        let location = self.resolve(input, Target::Identifier, &request.lang).await?;

        self.fetch_history(
            "/v7/historical/weather",
            &location,
            request.days,
            &[("lang", request.lang), ("unit", request.unit)],
        )
        .await
    }

    /// Gets two-hour precipitation in 5-minute steps
    #[tool(description = "Get minute-level precipitation for the next two hours in 5-minute steps. location: 'longitude,latitude' (e.g. '116.38,39.91') or a city name.")]
    pub async fn get_minutely_5m(
        &self,
        Parameters(request): Parameters<GetMinutelyRequest>,
    ) -> Result<CallToolResult, McpError> {
        let input = params::required("location", &request.location)?;
        tracing::info!("Getting minutely precipitation for: {}", input);

        let location = match self.resolve(input, Target::Coordinates, &request.lang).await? {
            LocationParam::Coordinates(c) => LocationParam::Coordinates(c.validate()?),
            other => other,
        };

        self.fetch(
            "/v7/minutely/5m",
            &[("location", location.to_string()), ("lang", request.lang)],
        )
        .await
    }

    /// Gets active weather warnings for a city
    #[tool(description = "Get active official weather warnings (typhoon, rainstorm, heat, cold wave, ...) for a city.")]
    pub async fn get_warning(
        &self,
        Parameters(request): Parameters<CityRequest>,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!("Getting warnings for city: {}", request.city);

        let city = params::required("city", &request.city)?;
        let location = self.resolve(city, Target::Any, &request.lang).await?;

        self.fetch(
            "/v7/warning/now",
            &[("location", location.to_string()), ("lang", request.lang)],
        )
        .await
    }

    /// Gets life indices for a city
    #[tool(description = "Get weather life indices (sport, car wash, dressing, cold risk, UV, travel, allergy, comfort, ...) for a city. days: 1d (default) or 3d; index_types: comma-separated ids 1-16.")]
    pub async fn get_indices(
        &self,
        Parameters(request): Parameters<GetIndicesRequest>,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!("Getting {} indices for city: {}", request.days, request.city);

        let city = params::required("city", &request.city)?;
        params::one_of("days", &request.days, INDICES_DAYS)?;
        let types = params::required("index_types", &request.index_types)?.to_string();
        let location = self.resolve(city, Target::Any, &request.lang).await?;

        self.fetch(
            &format!("/v7/indices/{}", request.days),
            &[
                ("location", location.to_string()),
                ("type", types),
                ("lang", request.lang),
            ],
        )
        .await
    }

    /// Gets current air quality for a city
    #[tool(description = "Get real-time air quality (AQI, pollutant concentrations, health advice) at 1x1 km resolution for a city.")]
    pub async fn get_air_quality(
        &self,
        Parameters(request): Parameters<CityRequest>,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!("Getting air quality for city: {}", request.city);

        let city = params::required("city", &request.city)?;
        let (lat, lon) = self.resolve_path_coordinates(city, &request.lang).await?;

        self.fetch(
            &format!("/airquality/v1/current/{}/{}", lat, lon),
            &[("lang", request.lang)],
        )
        .await
    }

    /// Gets the hourly air quality forecast
    #[tool(description = "Get the hourly air quality forecast for the next 24h (default), 72h or 168h. location: 'longitude,latitude', LocationID or city name.")]
    pub async fn get_air_quality_hourly(
        &self,
        Parameters(request): Parameters<GetAirQualityHourlyRequest>,
    ) -> Result<CallToolResult, McpError> {
        params::one_of("hours", &request.hours, WEATHER_HOURS)?;
        let input = params::required("location", &request.location)?;
        tracing::info!("Getting {} air quality forecast for: {}", request.hours, input);

        let (lat, lon) = self.resolve_path_coordinates(input, &request.lang).await?;

        self.fetch(
            &format!("/airquality/v1/hourly/{}/{}", lat, lon),
            &[("hours", request.hours), ("lang", request.lang)],
        )
        .await
    }

    /// Gets the daily air quality forecast
    #[tool(description = "Get the daily air quality forecast for 3d (default), 7d or 15d. location: 'longitude,latitude', LocationID or city name.")]
    pub async fn get_air_quality_daily(
        &self,
        Parameters(request): Parameters<GetAirQualityDailyRequest>,
    ) -> Result<CallToolResult, McpError> {
        params::one_of("days", &request.days, AIR_DAYS)?;
        let input = params::required("location", &request.location)?;
        tracing::info!("Getting {} air quality forecast for: {}", request.days, input);

        let (lat, lon) = self.resolve_path_coordinates(input, &request.lang).await?;

        self.fetch(
            &format!("/airquality/v1/daily/{}/{}", lat, lon),
            &[("days", request.days), ("lang", request.lang)],
        )
        .await
    }

    /// Gets past daily air quality, one request per day
    #[tool(description = "Get historical air quality for the last 1-10 days (default 10, today excluded) for a city, keyed by yyyyMMdd date.")]
    pub async fn get_air_quality_history(
        &self,
        Parameters(request): Parameters<GetAirQualityHistoryRequest>,
    ) -> Result<CallToolResult, McpError> {
        params::in_range("days", request.days, 1..=HISTORY_MAX_DAYS)?;
        let city = params::required("city", &request.city)?;
        tracing::info!("Getting {} days of air quality history for: {}", request.days, city);

        let location = self.resolve(city, Target::Identifier, &request.lang).await?;

        self.fetch_history(
            "/v7/historical/air",
            &location,
            request.days,
            &[("lang", request.lang)],
        )
        .await
    }

    /// Gets readings from a single monitoring station
    #[tool(description = "Get pollutant concentrations reported by an air quality monitoring station, e.g. station_id 'P58911'.")]
    pub async fn get_air_quality_stations(
        &self,
        Parameters(request): Parameters<GetAirQualityStationRequest>,
    ) -> Result<CallToolResult, McpError> {
        let station = params::required("station_id", &request.station_id)?;
        if !params::looks_like_station_id(station) {
            tracing::warn!("Station id '{}' does not look like P<digits>", station);
        }
        tracing::info!("Getting air quality station data for: {}", station);

        self.fetch(
            &format!("/airquality/v1/station/{}", station),
            &[("lang", request.lang)],
        )
        .await
    }

    /// Gets sunrise and sunset for a date
    #[tool(description = "Get sunrise and sunset times for a date (yyyyMMdd, today up to 60 days ahead). location: LocationID, 'longitude,latitude' or city name.")]
    pub async fn get_astronomy_sun(
        &self,
        Parameters(request): Parameters<GetAstronomyRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.astronomy("/v7/astronomy/sun", request).await
    }

    /// Gets moonrise, moonset and moon phase for a date
    #[tool(description = "Get moonrise, moonset and hourly moon phase for a date (yyyyMMdd, today up to 60 days ahead). location: LocationID, 'longitude,latitude' or city name.")]
    pub async fn get_astronomy_moon(
        &self,
        Parameters(request): Parameters<GetAstronomyRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.astronomy("/v7/astronomy/moon", request).await
    }

    /// Gets current gridded weather for coordinates
    #[tool(description = "Get real-time gridded weather (3-5 km numerical model, UTC times) for coordinates 'longitude,latitude', e.g. '116.41,39.92'.")]
    pub async fn get_grid_weather_now(
        &self,
        Parameters(request): Parameters<GetGridWeatherNowRequest>,
    ) -> Result<CallToolResult, McpError> {
        let coords = strict_coordinates(&request.location)?;
        params::one_of("unit", &request.unit, UNITS)?;
        tracing::info!("Getting grid weather for: {}", coords);

        self.fetch(
            "/v7/grid-weather/now",
            &[
                ("location", coords.to_string()),
                ("lang", request.lang),
                ("unit", request.unit),
            ],
        )
        .await
    }

    /// Gets the daily gridded forecast for coordinates
    #[tool(description = "Get the daily gridded weather forecast, 3d (default) or 7d, for coordinates 'longitude,latitude'.")]
    pub async fn get_grid_weather_daily(
        &self,
        Parameters(request): Parameters<GetGridWeatherDailyRequest>,
    ) -> Result<CallToolResult, McpError> {
        let coords = strict_coordinates(&request.location)?;
        params::one_of("days", &request.days, GRID_DAYS)?;
        params::one_of("unit", &request.unit, UNITS)?;
        tracing::info!("Getting {} grid forecast for: {}", request.days, coords);

        self.fetch(
            &format!("/v7/grid-weather/{}", request.days),
            &[
                ("location", coords.to_string()),
                ("lang", request.lang),
                ("unit", request.unit),
            ],
        )
        .await
    }

    /// Gets the hourly gridded forecast for coordinates
    #[tool(description = "Get the hourly gridded weather forecast, 24h (default) or 72h, for coordinates 'longitude,latitude'.")]
    pub async fn get_grid_weather_hourly(
        &self,
        Parameters(request): Parameters<GetGridWeatherHourlyRequest>,
    ) -> Result<CallToolResult, McpError> {
        let coords = strict_coordinates(&request.location)?;
        params::one_of("hours", &request.hours, GRID_HOURS)?;
        params::one_of("unit", &request.unit, UNITS)?;
        tracing::info!("Getting {} grid forecast for: {}", request.hours, coords);

        self.fetch(
            &format!("/v7/grid-weather/{}", request.hours),
            &[
                ("location", coords.to_string()),
                ("lang", request.lang),
                ("unit", request.unit),
            ],
        )
        .await
    }

    /// Lists popular cities
    #[tool(description = "List popular cities. number: 1-100 (default 10); city_type: 'cn' (default), 'world' or 'overseas'.")]
    pub async fn get_top_cities(
        &self,
        Parameters(request): Parameters<GetTopCitiesRequest>,
    ) -> Result<CallToolResult, McpError> {
        params::in_range("number", request.number, 1..=100)?;
        params::one_of("city_type", &request.city_type, CITY_TYPES)?;
        tracing::info!("Getting {} top cities of type {}", request.number, request.city_type);

        self.fetch(
            "/geo/v2/city/top",
            &[
                ("number", request.number.to_string()),
                ("type", request.city_type),
                ("lang", request.lang),
            ],
        )
        .await
    }

    /// Searches points of interest by keyword
    #[tool(description = "Search points of interest by keyword around a location ('longitude,latitude', LocationID or city name). poi_type: 'scenic' or 'TSTA' (tide station); radius in metres 100-50000.")]
    pub async fn search_poi(
        &self,
        Parameters(request): Parameters<SearchPoiRequest>,
    ) -> Result<CallToolResult, McpError> {
        let input = params::required("location", &request.location)?;
        let keyword = params::required("keyword", &request.keyword)?.to_string();
        params::one_of("poi_type", &request.poi_type, POI_TYPES)?;
        params::in_range("radius", request.radius, 100..=50_000)?;
        params::in_range("page", request.page, 1..=u32::MAX)?;
        tracing::info!("Searching POI '{}' ({}) near: {}", keyword, request.poi_type, input);

        let location = match self.resolve(input, Target::Any, &request.lang).await? {
            LocationParam::Coordinates(c) => LocationParam::Coordinates(c.validate()?),
            other => other,
        };

        let mut query = vec![
            ("location", location.to_string()),
            ("keyword", keyword),
            ("type", request.poi_type.clone()),
            ("radius", request.radius.to_string()),
            ("page", request.page.to_string()),
            ("lang", request.lang.clone()),
        ];
        query.extend(self.poi_city(request.city.as_deref(), &request.lang).await?);

        self.fetch("/geo/v2/poi/lookup", &query).await
    }

    /// Searches points of interest around coordinates
    #[tool(description = "Search points of interest within a radius (1-50 km, default 5) of coordinates 'longitude,latitude', sorted by distance. poi_type: 'scenic' or 'TSTA'.")]
    pub async fn search_poi_range(
        &self,
        Parameters(request): Parameters<SearchPoiRangeRequest>,
    ) -> Result<CallToolResult, McpError> {
        let coords = strict_coordinates(&request.location)?;
        params::one_of("poi_type", &request.poi_type, POI_TYPES)?;
        params::in_range("radius", request.radius, 1..=50)?;
        params::in_range("page", request.page, 1..=u32::MAX)?;
        tracing::info!("Searching {} POIs within {} km of {}", request.poi_type, request.radius, coords);

        let mut query = vec![
            ("location", coords.to_string()),
            ("type", request.poi_type.clone()),
            ("radius", request.radius.to_string()),
            ("page", request.page.to_string()),
            ("lang", request.lang.clone()),
        ];
        query.extend(self.poi_city(request.city.as_deref(), &request.lang).await?);

        self.fetch("/geo/v2/poi/range", &query).await
    }
}

impl Weather {
    async fn astronomy(
        &self,
        path: &str,
        request: GetAstronomyRequest,
    ) -> Result<CallToolResult, McpError> {
        let input = params::required("location", &request.location)?;
        let today = params::beijing_today(chrono::Utc::now());
        let date = params::astronomy_date(&request.date, today)?;
        tracing::info!("Getting {} for {} on {}", path, input, date);

        let location = self.resolve(input, Target::Any, &request.lang).await?;

        self.fetch(
            path,
            &[
                ("location", location.to_string()),
                ("date", date),
                ("lang", request.lang),
            ],
        )
        .await
    }
}
