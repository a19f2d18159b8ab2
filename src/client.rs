//! Authenticated HTTP access to the QWeather API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::auth::CredentialManager;
use crate::constants::{REQUEST_TIMEOUT_SECS, USER_AGENT};
use crate::error::{Error, Result};
use crate::location::CityLookup;
use crate::models::{CityLookupResponse, GeoLocation};

pub struct QWeatherClient {
    http: Client,
    base_url: String,
    credentials: Arc<CredentialManager>,
}

impl QWeatherClient {
    pub fn new(base_url: impl Into<String>, credentials: Arc<CredentialManager>) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            credentials,
        })
    }

    /// GET `path` with `query` and deserialize the JSON body.
    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, ?query, "GET");

        let request = self.http.get(&url).query(query);
        let response = self.credentials.get_auth_header()?.apply(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Request to {} failed - status: {}, body: {}", path, status, body);
            return Err(Error::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl CityLookup for QWeatherClient {
    async fn lookup(&self, query: &str, lang: Option<&str>) -> Result<Vec<GeoLocation>> {
        let mut params = vec![("location", query.to_string())];
        if let Some(lang) = lang {
            params.push(("lang", lang.to_string()));
        }

        let response = match self.get::<CityLookupResponse>("/geo/v2/city/lookup", &params).await {
            Ok(response) => response,
            Err(Error::UpstreamStatus { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                return Ok(Vec::new())
            }
            Err(e) => return Err(e),
        };

        // The body carries its own status code, even on HTTP 200.
        match response.code.as_str() {
            "200" => Ok(response.location),
            "404" => Ok(Vec::new()),
            code => {
                error!("City lookup for '{}' returned code {}", query, code);
                Err(Error::UpstreamStatus {
                    status: code.parse().unwrap_or(StatusCode::BAD_GATEWAY.as_u16()),
                    body: format!("city lookup returned code {}", code),
                })
            }
        }
    }
}
