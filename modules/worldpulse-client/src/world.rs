// World geometry loading. Sources are tried in order; the first GeoJSON that
// loads wins. Losing every source is fatal for the session.

use tracing::{info, warn};
use worldpulse_common::{WorldAtlas, WorldPulseError};

use crate::error::{FetchError, Result};
use crate::retry::{fetch_with_retries, RetryPolicy};

pub struct WorldLoader {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl WorldLoader {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            client: reqwest::Client::new(),
            policy,
        }
    }

    pub async fn load(&self, sources: &[String]) -> std::result::Result<WorldAtlas, WorldPulseError> {
        let mut last_err = String::from("no geometry sources configured");

        for url in sources {
            let fetched = fetch_with_retries("world_geometry", self.policy, move || self.fetch_geojson(url)).await;
            let collection = match fetched {
                Ok(collection) => collection,
                Err(e) => {
                    warn!(url = %url, error = %e, "Failed to load world geometry source");
                    last_err = e.to_string();
                    continue;
                }
            };

            match WorldAtlas::from_geojson(&collection) {
                Ok(atlas) => {
                    info!(url = %url, features = atlas.len(), "Loaded world geometry");
                    return Ok(atlas);
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "World geometry source is not a FeatureCollection");
                    last_err = e.to_string();
                }
            }
        }

        Err(WorldPulseError::WorldUnavailable(format!(
            "couldn't fetch any world GeoJSON. Last error: {last_err}"
        )))
    }

    async fn fetch_geojson(&self, url: &str) -> Result<serde_json::Value> {
        let resp = self.client.get(url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(FetchError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}
