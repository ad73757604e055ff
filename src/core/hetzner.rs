use std::time::Duration;

use anyhow::{anyhow, Context};
use serde::Deserialize;

use crate::core::error::SyncError;
use crate::core::models::catalog::{PriceCatalog, PriceEntry};
use crate::core::models::server::ServerRecord;

const API_BASE: &str = "https://api.hetzner.cloud";
const PRICING_ENDPOINT: &str = "/v1/pricing";
const SERVERS_ENDPOINT: &str = "/v1/servers";

// A hung endpoint must not hang the run; the scheduler retries next tick.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

// --- /v1/pricing ---

#[derive(Deserialize)]
struct PricingResponse {
    pricing: Pricing,
}

#[derive(Deserialize)]
struct Pricing {
    server_types: Vec<ServerTypePricing>,
}

#[derive(Deserialize)]
struct ServerTypePricing {
    name: String,
    prices: Vec<LocationPrice>,
}

#[derive(Deserialize)]
struct LocationPrice {
    location: String,
    price_hourly: NetAmount,
    price_monthly: NetAmount,
}

// Hetzner reports prices as decimal strings.
#[derive(Deserialize)]
struct NetAmount {
    net: String,
}

// --- /v1/servers ---

#[derive(Deserialize)]
struct ServersResponse {
    servers: Vec<ApiServer>,
}

#[derive(Deserialize)]
struct ApiServer {
    id: u64,
    name: String,
    server_type: ApiServerType,
    datacenter: ApiDatacenter,
}

#[derive(Deserialize)]
struct ApiServerType {
    name: String,
    cores: u32,
    memory: f64,
}

#[derive(Deserialize)]
struct ApiDatacenter {
    location: ApiLocation,
}

#[derive(Deserialize)]
struct ApiLocation {
    name: String,
}

fn parse_net_price(raw: &str, server_type: &str, location: &str) -> Result<f64, SyncError> {
    raw.parse().map_err(|_| SyncError::UpstreamUnavailable {
        endpoint: PRICING_ENDPOINT,
        cause: anyhow!(
            "unparsable net price {:?} for {}@{}",
            raw,
            server_type,
            location
        ),
    })
}

/// Read-only client for the Hetzner Cloud pricing and inventory APIs.
pub struct HetznerClient {
    http: reqwest::Client,
    token: String,
    base_url: String,
}

impl HetznerClient {
    pub fn new(token: &str) -> Self {
        Self::with_base_url(token, API_BASE)
    }

    fn with_base_url(token: &str, base_url: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");
        Self {
            http,
            token: token.to_string(),
            base_url: base_url.to_string(),
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &'static str,
    ) -> Result<T, SyncError> {
        let result: anyhow::Result<T> = async {
            let response = self
                .http
                .get(format!("{}{}", self.base_url, endpoint))
                .header("Authorization", format!("Bearer {}", self.token))
                .send()
                .await
                .context("request failed")?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                anyhow::bail!("HTTP {}: {}", status.as_u16(), body);
            }

            response.json::<T>().await.context("failed to parse response")
        }
        .await;

        result.map_err(|cause| SyncError::UpstreamUnavailable { endpoint, cause })
    }

    /// Fetch the full price list across all server types and locations.
    pub async fn fetch_catalog(&self) -> Result<PriceCatalog, SyncError> {
        let response: PricingResponse = self.get(PRICING_ENDPOINT).await?;

        let mut catalog = PriceCatalog::new();
        for server_type in response.pricing.server_types {
            for price in server_type.prices {
                let hourly =
                    parse_net_price(&price.price_hourly.net, &server_type.name, &price.location)?;
                let monthly =
                    parse_net_price(&price.price_monthly.net, &server_type.name, &price.location)?;
                catalog.insert(PriceEntry {
                    server_type: server_type.name.clone(),
                    location: price.location,
                    hourly,
                    monthly,
                });
            }
        }
        Ok(catalog)
    }

    /// Fetch currently active billable server instances.
    ///
    /// An empty inventory fails the run: with nothing to bill, rate
    /// derivation is meaningless.
    pub async fn fetch_active_servers(&self) -> Result<Vec<ServerRecord>, SyncError> {
        let response: ServersResponse = self.get(SERVERS_ENDPOINT).await?;

        if response.servers.is_empty() {
            return Err(SyncError::EmptyInventory);
        }

        Ok(response
            .servers
            .into_iter()
            .map(|server| ServerRecord {
                id: server.id,
                name: server.name,
                server_type: server.server_type.name,
                location: server.datacenter.location.name,
                vcpus: server.server_type.cores,
                ram_gb: server.server_type.memory,
            })
            .collect())
    }
}
