//! Mapbox Directions API provider
//!
//! Requests the `driving` profile with full GeoJSON geometry and converts the
//! first returned route into a polyline plus advisory distance/duration.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use fp_core::{
    adapter::DirectionsProvider,
    model::{DirectionsRequest, DirectionsRoute, Polyline, RouteSummary},
};
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.mapbox.com/directions/v5/mapbox/driving";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct MapboxDirections {
    base_url: String,
    access_token: String,
    client: reqwest::Client,
}

impl MapboxDirections {
    pub fn new(access_token: impl Into<String>) -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, access_token)
    }

    pub fn with_base_url(base_url: impl Into<String>, access_token: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            base_url: base_url.into(),
            access_token: access_token.into(),
            client,
        })
    }

    /// Full request URL, without the token so it can be logged
    pub fn request_url(&self, request: &DirectionsRequest) -> String {
        let coordinates = request
            .waypoints
            .iter()
            .map(|p| format!("{},{}", p.lon, p.lat))
            .collect::<Vec<_>>()
            .join(";");
        format!(
            "{}/{}?geometries=geojson&overview=full",
            self.base_url.trim_end_matches('/'),
            coordinates
        )
    }
}

#[derive(Deserialize)]
struct MapboxResponse {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<MapboxRoute>,
}

#[derive(Deserialize)]
struct MapboxRoute {
    geometry: MapboxGeometry,
    distance: f64,
    duration: f64,
}

#[derive(Deserialize)]
struct MapboxGeometry {
    coordinates: Vec<[f64; 2]>,
}

/// Convert a Directions API JSON body into a route
pub fn parse_directions_response(body: &str) -> Result<DirectionsRoute> {
    let response: MapboxResponse =
        serde_json::from_str(body).context("malformed directions response")?;

    let route = match response.routes.into_iter().next() {
        Some(route) => route,
        None => bail!(
            "no route found ({}{})",
            response.code.as_deref().unwrap_or("NoRoute"),
            response
                .message
                .map(|m| format!(": {}", m))
                .unwrap_or_default()
        ),
    };

    let polyline = Polyline::from_coordinates(&route.geometry.coordinates)
        .map_err(|e| anyhow!("unusable route geometry: {}", e))?;

    Ok(DirectionsRoute {
        polyline,
        summary: RouteSummary {
            distance_m: route.distance,
            duration_s: route.duration,
        },
    })
}

#[async_trait]
impl DirectionsProvider for MapboxDirections {
    fn name(&self) -> &str {
        "Mapbox"
    }

    async fn route(&self, request: &DirectionsRequest) -> Result<DirectionsRoute> {
        request.validate()?;

        let url = self.request_url(request);
        tracing::debug!("Requesting directions: {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[("access_token", self.access_token.as_str())])
            .send()
            .await
            .context("directions request failed")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("failed to read directions response")?;

        if !status.is_success() {
            bail!("directions API returned {}: {}", status, body);
        }

        parse_directions_response(&body)
    }
}
