use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::DEFAULT_LANG;

// ============================================================================
// QWeather GeoAPI Models
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CityLookupResponse {
    pub code: String,
    #[serde(default)]
    pub location: Vec<GeoLocation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeoLocation {
    pub name: String,
    pub id: String,
    #[serde(deserialize_with = "number_or_string")]
    pub lat: f64,
    #[serde(deserialize_with = "number_or_string")]
    pub lon: f64,
    pub adm1: Option<String>,
    pub adm2: Option<String>,
    pub country: Option<String>,
}

/// The provider encodes most numbers as JSON strings.
fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

// ============================================================================
// MCP Tool Request Models
// ============================================================================

fn default_lang() -> String {
    DEFAULT_LANG.to_string()
}

fn default_unit() -> String {
    "m".to_string()
}

fn default_3d() -> String {
    "3d".to_string()
}

fn default_24h() -> String {
    "24h".to_string()
}

fn default_history_days() -> u32 {
    10
}

fn default_page() -> u32 {
    1
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct CityRequest {
    /// City name in Chinese or English, e.g. '北京', 'Shanghai'
    pub city: String,
    /// Response language, default 'zh'
    #[serde(default = "default_lang")]
    pub lang: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct GetWeatherRequest {
    /// City name in Chinese or English, e.g. '北京', 'Beijing'
    pub city: String,
    /// Forecast length: 3d (default), 7d, 10d, 15d or 30d
    #[serde(default = "default_3d")]
    pub days: String,
    /// Response language, default 'zh'
    #[serde(default = "default_lang")]
    pub lang: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct GetIndicesRequest {
    /// City name in Chinese or English
    pub city: String,
    /// Forecast length: 1d (default) or 3d
    #[serde(default = "default_indices_days")]
    pub days: String,
    /// Comma-separated index type ids, e.g. '1,3,5'. 1 sport, 2 car wash,
    /// 3 dressing, 4 cold risk, 5 UV, 6 travel, 7 pollen allergy, 8 comfort,
    /// 9 traffic, 10 sun protection, 11 makeup, 12 air conditioning,
    /// 13 drying, 14 fishing, 15 sunglasses, 16 air pollution dispersion
    #[serde(default = "default_index_types")]
    pub index_types: String,
    /// Response language, default 'zh'
    #[serde(default = "default_lang")]
    pub lang: String,
}

fn default_indices_days() -> String {
    "1d".to_string()
}

fn default_index_types() -> String {
    "1,2,3,4,5,6,7,8,9,10,11,12,13,14,15,16".to_string()
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct GetWeatherNowRequest {
    /// LocationID (e.g. '101010100') or 'longitude,latitude' (e.g. '116.41,39.92')
    pub location: Option<String>,
    /// City name, used when `location` is absent
    pub city: Option<String>,
    /// Response language, default 'zh'
    #[serde(default = "default_lang")]
    pub lang: String,
    /// Units: 'm' metric (default) or 'i' imperial
    #[serde(default = "default_unit")]
    pub unit: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct GetHourlyWeatherRequest {
    /// Forecast length: 24h (default), 72h or 168h
    #[serde(default = "default_24h")]
    pub hours: String,
    /// LocationID or 'longitude,latitude'
    pub location: Option<String>,
    /// City name, used when `location` is absent
    pub city: Option<String>,
    /// Response language, default 'zh'
    #[serde(default = "default_lang")]
    pub lang: String,
    /// Units: 'm' metric (default) or 'i' imperial
    #[serde(default = "default_unit")]
    pub unit: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct GetWeatherHistoryRequest {
    /// LocationID or 'longitude,latitude'
    pub location: Option<String>,
    /// City name, used when `location` is absent
    pub city: Option<String>,
    /// Number of past days (1-10, today excluded), default 10
    #[serde(default = "default_history_days")]
    pub days: u32,
    /// Response language, default 'zh'
    #[serde(default = "default_lang")]
    pub lang: String,
    /// Units: 'm' metric (default) or 'i' imperial
    #[serde(default = "default_unit")]
    pub unit: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct GetAirQualityHistoryRequest {
    /// City name in Chinese or English
    pub city: String,
    /// Number of past days (1-10, today excluded), default 10
    #[serde(default = "default_history_days")]
    pub days: u32,
    /// Response language, default 'zh'
    #[serde(default = "default_lang")]
    pub lang: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct GetMinutelyRequest {
    /// 'longitude,latitude' (e.g. '116.38,39.91'); a city name is resolved to coordinates
    pub location: String,
    /// Response language, default 'zh'
    #[serde(default = "default_lang")]
    pub lang: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct GetAstronomyRequest {
    /// LocationID, 'longitude,latitude' or a city name
    pub location: String,
    /// Date as yyyyMMdd, from today up to 60 days ahead
    pub date: String,
    /// Response language, default 'zh'
    #[serde(default = "default_lang")]
    pub lang: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct GetGridWeatherNowRequest {
    /// 'longitude,latitude', e.g. '116.41,39.92'
    pub location: String,
    /// Response language, default 'zh'
    #[serde(default = "default_lang")]
    pub lang: String,
    /// Units: 'm' metric (default) or 'i' imperial
    #[serde(default = "default_unit")]
    pub unit: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct GetGridWeatherDailyRequest {
    /// 'longitude,latitude', e.g. '116.41,39.92'
    pub location: String,
    /// Forecast length: 3d (default) or 7d
    #[serde(default = "default_3d")]
    pub days: String,
    /// Response language, default 'zh'
    #[serde(default = "default_lang")]
    pub lang: String,
    /// Units: 'm' metric (default) or 'i' imperial
    #[serde(default = "default_unit")]
    pub unit: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct GetGridWeatherHourlyRequest {
    /// 'longitude,latitude', e.g. '116.41,39.92'
    pub location: String,
    /// Forecast length: 24h (default) or 72h
    #[serde(default = "default_24h")]
    pub hours: String,
    /// Response language, default 'zh'
    #[serde(default = "default_lang")]
    pub lang: String,
    /// Units: 'm' metric (default) or 'i' imperial
    #[serde(default = "default_unit")]
    pub unit: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct GetAirQualityHourlyRequest {
    /// 'longitude,latitude', LocationID or city name
    pub location: String,
    /// Forecast length: 24h (default), 72h or 168h
    #[serde(default = "default_24h")]
    pub hours: String,
    /// Response language, default 'zh'
    #[serde(default = "default_lang")]
    pub lang: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct GetAirQualityDailyRequest {
    /// 'longitude,latitude', LocationID or city name
    pub location: String,
    /// Forecast length: 3d (default), 7d or 15d
    #[serde(default = "default_3d")]
    pub days: String,
    /// Response language, default 'zh'
    #[serde(default = "default_lang")]
    pub lang: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct GetAirQualityStationRequest {
    /// Monitoring station id, e.g. 'P58911' (not a city LocationID)
    pub station_id: String,
    /// Response language, default 'zh'
    #[serde(default = "default_lang")]
    pub lang: String,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct GetTopCitiesRequest {
    /// Number of cities (1-100), default 10
    #[serde(default = "default_top_number")]
    pub number: u32,
    /// 'cn' (default), 'world' or 'overseas'
    #[serde(default = "default_city_type")]
    pub city_type: String,
    /// Response language, default 'zh'
    #[serde(default = "default_lang")]
    pub lang: String,
}

fn default_top_number() -> u32 {
    10
}

fn default_city_type() -> String {
    "cn".to_string()
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct SearchPoiRequest {
    /// 'longitude,latitude', LocationID or city name to search around
    pub location: String,
    /// Search keyword, e.g. '故宫'
    pub keyword: String,
    /// POI type: 'scenic' (scenic spot) or 'TSTA' (tide station)
    pub poi_type: String,
    /// Restrict to a city, by LocationID or name
    pub city: Option<String>,
    /// Search radius in metres (100-50000), default 5000
    #[serde(default = "default_poi_radius_m")]
    pub radius: u32,
    /// Result page, default 1
    #[serde(default = "default_page")]
    pub page: u32,
    /// Response language, default 'zh'
    #[serde(default = "default_lang")]
    pub lang: String,
}

fn default_poi_radius_m() -> u32 {
    5000
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct SearchPoiRangeRequest {
    /// Centre point as 'longitude,latitude'
    pub location: String,
    /// POI type: 'scenic' (scenic spot) or 'TSTA' (tide station)
    pub poi_type: String,
    /// Search radius in kilometres (1-50), default 5
    #[serde(default = "default_poi_radius_km")]
    pub radius: u32,
    /// Restrict to a city, by LocationID or name
    pub city: Option<String>,
    /// Result page, default 1
    #[serde(default = "default_page")]
    pub page: u32,
    /// Response language, default 'zh'
    #[serde(default = "default_lang")]
    pub lang: String,
}

fn default_poi_radius_km() -> u32 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geo_location_accepts_string_coordinates() {
        let body = r#"{
            "code": "200",
            "location": [
                {"name": "北京", "id": "101010100", "lat": "39.90499", "lon": "116.40529",
                 "adm2": "北京", "adm1": "北京市", "country": "中国", "tz": "Asia/Shanghai"}
            ]
        }"#;

        let response: CityLookupResponse = serde_json::from_str(body).unwrap();

        assert_eq!(response.location.len(), 1);
        assert_eq!(response.location[0].id, "101010100");
        assert!((response.location[0].lat - 39.90499).abs() < 1e-9);
        assert!((response.location[0].lon - 116.40529).abs() < 1e-9);
    }

    #[test]
    fn missing_location_list_is_empty() {
        let response: CityLookupResponse = serde_json::from_str(r#"{"code": "404"}"#).unwrap();
        assert!(response.location.is_empty());
    }

    #[test]
    fn request_defaults() {
        let request: GetHourlyWeatherRequest =
            serde_json::from_str(r#"{"city": "北京"}"#).unwrap();
        assert_eq!(request.hours, "24h");
        assert_eq!(request.lang, "zh");
        assert_eq!(request.unit, "m");
        assert!(request.location.is_none());

        let request: SearchPoiRequest = serde_json::from_str(
            r#"{"location": "北京", "keyword": "博物馆", "poi_type": "scenic"}"#,
        )
        .unwrap();
        assert_eq!(request.radius, 5000);
        assert_eq!(request.page, 1);
    }
}
