use crate::models::{Filter, Property};
use crate::service::traits::ListingService;
use crate::service::types::ServiceConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;

const LISTINGS_PATH: &str = "realestate";

/// Listing service backed by the remote JSON endpoint
#[derive(Debug, Clone)]
pub struct HttpListingService {
    client: Client,
    endpoint: Url,
}

impl HttpListingService {
    /// Create a service with its own client built from `config`
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        Self::with_client(config.build_client()?, config)
    }

    /// Create a service reusing an already built client
    pub fn with_client(client: Client, config: &ServiceConfig) -> Result<Self> {
        let endpoint = config
            .base_url
            .join(LISTINGS_PATH)
            .context("Failed to build listings endpoint")?;

        Ok(Self { client, endpoint })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Full request address for `filter`
    pub fn request_url(&self, filter: Filter) -> Url {
        let mut url = self.endpoint.clone();
        if let Some(value) = filter.query_value() {
            url.query_pairs_mut().append_pair("filter", value);
        }
        url
    }
}

#[async_trait]
impl ListingService for HttpListingService {
    async fn get_properties(&self, filter: Filter) -> Result<Vec<Property>> {
        let url = self.request_url(filter);

        debug!("Fetching URL: {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Failed to fetch listings from {}", url))?;

        if !response.status().is_success() {
            warn!("Listings service returned status: {}", response.status());
            anyhow::bail!("Failed to fetch listings: {}", response.status());
        }

        let properties = response
            .json::<Vec<Property>>()
            .await
            .context("Failed to decode listings response")?;

        info!("Fetched {} properties (filter: {})", properties.len(), filter);

        Ok(properties)
    }
}
