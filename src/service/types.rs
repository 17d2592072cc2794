use anyhow::{Context, Result};
use reqwest::Client;
use std::env;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://android-kotlin-fun-mars-server.appspot.com/";
pub const DEFAULT_USER_AGENT: &str = concat!("realestate-overview/", env!("CARGO_PKG_VERSION"));

/// Connection settings for the listings service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Base address; `realestate` is resolved relative to it
    pub base_url: Url,
    /// Request timeout, transport defaults apply when unset
    pub timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url is valid"),
            timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ServiceConfig {
    /// Default settings pointed at another base address
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            ..Self::default()
        })
    }

    /// Load settings from the environment, reading `.env` first if present
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup("LISTINGS_BASE_URL") {
            Some(base_url) => Self::with_base_url(&base_url)?,
            None => Self::default(),
        };

        if let Some(raw) = lookup("LISTINGS_TIMEOUT_SECS") {
            let secs = raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("Invalid LISTINGS_TIMEOUT_SECS '{}'", raw))?;
            config.timeout = Some(Duration::from_secs(secs));
        }

        if let Some(user_agent) = lookup("LISTINGS_USER_AGENT") {
            config.user_agent = user_agent;
        }

        Ok(config)
    }

    /// Build the HTTP client shared by the listing service and the image loader
    pub fn build_client(&self) -> Result<Client> {
        let mut builder = Client::builder().user_agent(self.user_agent.clone());
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        builder.build().context("Failed to create HTTP client")
    }
}

/// Parse a base address, making sure relative joins keep its last path segment
fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url =
        Url::parse(raw.trim()).with_context(|| format!("Invalid listings base url '{}'", raw))?;

    if url.cannot_be_a_base() {
        anyhow::bail!("Listings base url '{}' cannot be used as a base", raw);
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}
