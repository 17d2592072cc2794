//! Observable state behind the listings overview.
//!
//! [`OverviewState`] runs one fetch per filter request on the tokio runtime it was
//! created on and publishes the outcome through three `watch` channels: fetch
//! status, the current listings, and a one-shot navigation target. A newer request
//! supersedes any fetch still in flight; the superseded fetch is cancelled and its
//! result is never published.

use crate::models::{FetchStatus, Filter, Property};
use crate::service::ListingService;
use anyhow::{Context, Result};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[cfg(test)]
mod tests;

/// Bookkeeping for the fetch allowed to publish
#[derive(Debug)]
struct CurrentFetch {
    generation: u64,
    filter: Filter,
    token: Option<CancellationToken>,
}

/// Publishing side shared with the spawned fetch tasks
#[derive(Debug)]
struct Listings {
    current: Mutex<CurrentFetch>,
    status: watch::Sender<FetchStatus>,
    properties: watch::Sender<Vec<Property>>,
}

impl Listings {
    fn lock(&self) -> MutexGuard<'_, CurrentFetch> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Publish a fetch outcome if `generation` is still the latest request.
    /// List and status are written under the same guard that a new request takes.
    fn publish(&self, generation: u64, result: Result<Vec<Property>>) {
        let mut current = self.lock();
        if current.generation != generation {
            debug!("Discarding result of superseded fetch #{}", generation);
            return;
        }
        current.token = None;

        match result {
            Ok(properties) => {
                info!(
                    "Fetch #{} done: {} properties (filter: {})",
                    generation,
                    properties.len(),
                    current.filter
                );
                self.properties.send_replace(properties);
                self.status.send_replace(FetchStatus::Done);
            }
            Err(err) => {
                warn!("Fetch #{} failed: {:#}", generation, err);
                self.properties.send_replace(Vec::new());
                self.status.send_replace(FetchStatus::Error);
            }
        }
    }
}

/// View-model for the listings overview
///
/// Creating it starts a fetch of every listing. Subscribers read state through
/// [`status`](Self::status), [`properties`](Self::properties) and
/// [`navigate_to_selected_property`](Self::navigate_to_selected_property).
/// Dropping it, or calling [`dispose`](Self::dispose), cancels any outstanding fetch.
pub struct OverviewState {
    service: Arc<dyn ListingService>,
    listings: Arc<Listings>,
    selected: watch::Sender<Option<Property>>,
    runtime: Handle,
    scope: CancellationToken,
}

impl OverviewState {
    /// Create the state and start fetching all listings. Must be called from within a tokio runtime.
    pub fn new(service: Arc<dyn ListingService>) -> Result<Self> {
        let runtime = Handle::try_current().context("Overview state requires a tokio runtime")?;

        let (status, _) = watch::channel(FetchStatus::Loading);
        let (properties, _) = watch::channel(Vec::new());
        let (selected, _) = watch::channel(None);

        let state = Self {
            service,
            listings: Arc::new(Listings {
                current: Mutex::new(CurrentFetch {
                    generation: 0,
                    filter: Filter::ShowAll,
                    token: None,
                }),
                status,
                properties,
            }),
            selected,
            runtime,
            scope: CancellationToken::new(),
        };

        state.fetch_properties(Filter::ShowAll);
        Ok(state)
    }

    pub fn status(&self) -> watch::Receiver<FetchStatus> {
        self.listings.status.subscribe()
    }

    pub fn properties(&self) -> watch::Receiver<Vec<Property>> {
        self.listings.properties.subscribe()
    }

    /// Pending navigation to a detail view, `None` once handled
    pub fn navigate_to_selected_property(&self) -> watch::Receiver<Option<Property>> {
        self.selected.subscribe()
    }

    /// Filter of the most recently requested fetch
    pub fn filter(&self) -> Filter {
        self.listings.lock().filter
    }

    /// Refetch with `filter`, superseding any fetch still in flight
    pub fn update_filter(&self, filter: Filter) {
        self.fetch_properties(filter);
    }

    pub fn display_property_details(&self, property: Property) {
        debug!("Navigating to property {}", property.id);
        self.selected.send_replace(Some(property));
    }

    /// Mark the pending navigation as handled so it does not fire again on re-subscription
    pub fn display_property_details_complete(&self) {
        self.selected.send_if_modified(|selected| selected.take().is_some());
    }

    /// Cancel any outstanding fetch and release the state
    pub fn dispose(self) {
        debug!("Disposing overview state");
        drop(self);
    }

    fn fetch_properties(&self, filter: Filter) {
        let token = self.scope.child_token();

        let generation = {
            let mut current = self.listings.lock();
            if let Some(previous) = current.token.replace(token.clone()) {
                previous.cancel();
            }
            current.generation += 1;
            current.filter = filter;
            self.listings.status.send_replace(FetchStatus::Loading);
            current.generation
        };

        info!("Fetch #{} started (filter: {})", generation, filter);

        let service = Arc::clone(&self.service);
        let listings = Arc::clone(&self.listings);
        self.runtime.spawn(async move {
            let result = tokio::select! {
                _ = token.cancelled() => {
                    debug!("Fetch #{} cancelled", generation);
                    return;
                }
                result = service.get_properties(filter) => result,
            };
            listings.publish(generation, result);
        });
    }
}

impl Drop for OverviewState {
    fn drop(&mut self) {
        self.scope.cancel();
        // retire the generation so a fetch racing past cancellation cannot publish
        let mut current = self.listings.lock();
        current.generation += 1;
        current.token = None;
    }
}
