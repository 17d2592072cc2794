use crate::models::{Filter, Property};
use anyhow::Result;
use async_trait::async_trait;

/// Remote source of real-estate listings
/// The view-model only talks to this trait, so tests can swap in a scripted responder
#[async_trait]
pub trait ListingService: Send + Sync {
    /// Fetch the listings matching `filter`, in the order the service returns them
    async fn get_properties(&self, filter: Filter) -> Result<Vec<Property>>;
}
