//! transport.rest HTTP client implementing the routing collaborator.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use toasttalk_traits::{
    CollaboratorError, Coordinate, Journey, RouteSearch, TransitRouteResolver, TransitStop,
};

use crate::error::Result;
use crate::http_client::build_http_client;

pub const DEFAULT_TRANSPORT_REST_URL: &str = "https://v6.db.transport.rest";

const NEARBY_RADIUS_M: u32 = 1000;
const NEARBY_RESULTS: usize = 5;

#[derive(Debug, Deserialize)]
struct JourneysResponse {
    #[serde(default)]
    journeys: Vec<Journey>,
}

/// Looks up the stop nearest to each end, then asks for journeys between
/// them.
pub struct TransportRestClient {
    client: Client,
    base_url: String,
}

impl TransportRestClient {
    pub fn new() -> Result<Self> {
        Ok(Self::with_http_client(build_http_client()?))
    }

    pub fn with_http_client(client: Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_TRANSPORT_REST_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub async fn nearby_stops(
        &self,
        point: Coordinate,
        results: usize,
    ) -> std::result::Result<Vec<TransitStop>, CollaboratorError> {
        let query = [
            ("latitude", point.latitude.to_string()),
            ("longitude", point.longitude.to_string()),
            ("results", results.to_string()),
            ("distance", NEARBY_RADIUS_M.to_string()),
            ("stops", "true".to_string()),
            ("poi", "false".to_string()),
        ];
        self.get_json("/locations/nearby", &query).await
    }

    pub async fn journeys(
        &self,
        from_stop_id: &str,
        to_stop_id: &str,
        results: usize,
    ) -> std::result::Result<Vec<Journey>, CollaboratorError> {
        let query = [
            ("from", from_stop_id.to_string()),
            ("to", to_stop_id.to_string()),
            ("results", results.to_string()),
            ("stopovers", "true".to_string()),
        ];
        let response: JourneysResponse = self.get_json("/journeys", &query).await?;
        Ok(response.journeys)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> std::result::Result<T, CollaboratorError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(category = "tool", %url, "transport.rest request");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| CollaboratorError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::Request(format!(
                "{path} returned {status}: {body}"
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| CollaboratorError::Decode(format!("{path}: {e}")))
    }

    async fn nearest_stop(
        &self,
        point: Coordinate,
    ) -> std::result::Result<TransitStop, CollaboratorError> {
        self.nearby_stops(point, NEARBY_RESULTS)
            .await?
            .into_iter()
            .next()
            .ok_or(CollaboratorError::NoNearbyStop {
                latitude: point.latitude,
                longitude: point.longitude,
            })
    }
}

#[async_trait]
impl TransitRouteResolver for TransportRestClient {
    async fn search(
        &self,
        from: Coordinate,
        to: Coordinate,
        results: usize,
    ) -> std::result::Result<RouteSearch, CollaboratorError> {
        let from_stop = self.nearest_stop(from).await?;
        let to_stop = self.nearest_stop(to).await?;
        let journeys = self.journeys(&from_stop.id, &to_stop.id, results).await?;

        tracing::info!(
            category = "tool",
            from_stop = %from_stop.name,
            to_stop = %to_stop.name,
            journeys = journeys.len(),
            "transport.rest journeys fetched"
        );

        Ok(RouteSearch {
            from_stop,
            to_stop,
            journeys,
        })
    }
}
