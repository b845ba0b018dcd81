use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;

use crate::domain::{Package, PackageQuery, Resource};
use crate::error::CkanError;

pub trait CatalogClient {
    /// Returns every package matching `query`. Transport failures are lookup errors.
    fn search(&self, query: &PackageQuery) -> Result<Vec<Package>, CkanError>;
}

/// Client for the CKAN action API (`<catalog_url>action/package_search`).
///
/// Usable on its own without a [`DownloadConfig`](crate::config::DownloadConfig), so `new`
/// applies the same trailing-slash normalization to `base_url`.
#[derive(Clone)]
pub struct CkanHttpClient {
    client: Client,
    base_url: String,
}

impl CkanHttpClient {
    pub fn new(base_url: &str, api_key: Option<&str>) -> Result<Self, CkanError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("ckan-dl/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| CkanError::Configuration(err.to_string()))?,
        );
        if let Some(api_key) = api_key {
            let mut value = HeaderValue::from_str(api_key)
                .map_err(|err| CkanError::Configuration(format!("invalid API key: {err}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(None::<Duration>)
            .build()
            .map_err(|err| CkanError::CatalogHttp(err.to_string()))?;

        let base_url = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        Ok(Self { client, base_url })
    }

    pub fn search_url(&self) -> String {
        format!("{}action/package_search", self.base_url)
    }
}

impl CatalogClient for CkanHttpClient {
    fn search(&self, query: &PackageQuery) -> Result<Vec<Package>, CkanError> {
        let response = self
            .client
            .get(self.search_url())
            .query(&[("q", ""), ("fq", query.name_pattern.as_str())])
            .send()
            .map_err(|err| CkanError::CatalogHttp(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "catalog request failed".to_string());
            return Err(CkanError::CatalogStatus { status, message });
        }

        let body = response
            .text()
            .map_err(|err| CkanError::CatalogHttp(err.to_string()))?;
        parse_search_response(&body)
    }
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<serde_json::Value>,
    #[serde(default)]
    result: Option<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    results: Vec<PackageRecord>,
}

#[derive(Debug, Deserialize)]
struct PackageRecord {
    name: String,
    #[serde(default)]
    resources: Vec<ResourceRecord>,
}

#[derive(Debug, Deserialize)]
struct ResourceRecord {
    url: String,
    #[serde(default)]
    size: Option<serde_json::Value>,
}

impl ResourceRecord {
    /// CKAN portals report `size` as an integer, a float, a numeric string or null.
    fn size_bytes(&self) -> u64 {
        match &self.size {
            Some(serde_json::Value::Number(number)) => number
                .as_u64()
                .or_else(|| number.as_f64().map(|value| value.max(0.0) as u64))
                .unwrap_or(0),
            Some(serde_json::Value::String(text)) => text.trim().parse().unwrap_or(0),
            _ => 0,
        }
    }
}

/// Decodes a `package_search` response body into packages, keeping resource order.
pub fn parse_search_response(body: &str) -> Result<Vec<Package>, CkanError> {
    let envelope: SearchEnvelope =
        serde_json::from_str(body).map_err(|err| CkanError::CatalogResponse(err.to_string()))?;

    if !envelope.success {
        let detail = envelope
            .error
            .map(|value| value.to_string())
            .unwrap_or_else(|| "success flag not set".to_string());
        return Err(CkanError::CatalogResponse(detail));
    }

    let result = envelope
        .result
        .ok_or_else(|| CkanError::CatalogResponse("missing result".to_string()))?;

    Ok(result
        .results
        .into_iter()
        .map(|record| Package {
            name: record.name,
            resources: record
                .resources
                .into_iter()
                .map(|resource| {
                    let size = resource.size_bytes();
                    Resource::new(resource.url, size)
                })
                .collect(),
        })
        .collect())
}
