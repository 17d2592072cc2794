use super::*;
use crate::models::PropertyType;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Clone)]
enum Reply {
    Properties(Vec<Property>),
    Failure(&'static str),
}

/// Listing service answering from a per-filter script, optionally held back by a gate
#[derive(Default)]
struct ScriptedService {
    replies: Mutex<HashMap<Filter, Reply>>,
    gates: Mutex<HashMap<Filter, Arc<Notify>>>,
    calls: Mutex<Vec<Filter>>,
}

impl ScriptedService {
    fn reply(self, filter: Filter, reply: Reply) -> Self {
        self.replies.lock().unwrap().insert(filter, reply);
        self
    }

    /// Hold responses for `filter` until the returned gate is opened
    fn gate(&self, filter: Filter) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().unwrap().insert(filter, Arc::clone(&gate));
        gate
    }

    fn calls(&self) -> Vec<Filter> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ListingService for ScriptedService {
    async fn get_properties(&self, filter: Filter) -> Result<Vec<Property>> {
        self.calls.lock().unwrap().push(filter);

        let gate = self.gates.lock().unwrap().get(&filter).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let reply = self.replies.lock().unwrap().get(&filter).cloned();
        match reply {
            Some(Reply::Properties(properties)) => Ok(properties),
            Some(Reply::Failure(message)) => Err(anyhow::anyhow!(message)),
            None => Ok(Vec::new()),
        }
    }
}

fn property(id: &str, property_type: PropertyType, price: f64) -> Property {
    Property {
        id: id.to_string(),
        img_src_url: format!("http://mars.jpl.nasa.gov/{}.jpg", id),
        price,
        property_type,
        lat: None,
        lng: None,
    }
}

async fn settled(status: &mut watch::Receiver<FetchStatus>) -> FetchStatus {
    let status = tokio::time::timeout(
        Duration::from_secs(1),
        status.wait_for(|status| *status != FetchStatus::Loading),
    )
    .await
    .expect("fetch never settled")
    .expect("status channel closed");
    *status
}

#[tokio::test]
async fn initial_fetch_requests_all_listings() {
    let listings = vec![
        property("424905", PropertyType::Buy, 450000.0),
        property("424906", PropertyType::Rent, 8000.0),
        property("424907", PropertyType::Buy, 11000000.0),
    ];
    let service = Arc::new(
        ScriptedService::default().reply(Filter::ShowAll, Reply::Properties(listings.clone())),
    );

    let state = OverviewState::new(service.clone()).unwrap();
    let mut status = state.status();
    assert_eq!(*status.borrow(), FetchStatus::Loading);

    assert_eq!(settled(&mut status).await, FetchStatus::Done);
    assert_eq!(*state.properties().borrow(), listings);
    assert_eq!(service.calls(), vec![Filter::ShowAll]);
    assert_eq!(state.filter(), Filter::ShowAll);
}

#[tokio::test]
async fn update_filter_resets_to_loading_and_publishes_new_list() {
    let rentals = vec![property("1", PropertyType::Rent, 100.0)];
    let service = Arc::new(
        ScriptedService::default()
            .reply(Filter::ShowAll, Reply::Properties(vec![property("2", PropertyType::Buy, 5.0)]))
            .reply(Filter::ShowRent, Reply::Properties(rentals.clone())),
    );

    let state = OverviewState::new(service.clone()).unwrap();
    let mut status = state.status();
    settled(&mut status).await;

    state.update_filter(Filter::ShowRent);
    assert_eq!(*status.borrow(), FetchStatus::Loading);
    assert_eq!(state.filter(), Filter::ShowRent);

    assert_eq!(settled(&mut status).await, FetchStatus::Done);
    assert_eq!(*state.properties().borrow(), rentals);
    assert_eq!(service.calls(), vec![Filter::ShowAll, Filter::ShowRent]);
}

#[tokio::test]
async fn every_filter_settles() {
    let service = Arc::new(
        ScriptedService::default()
            .reply(Filter::ShowRent, Reply::Failure("connection reset"))
            .reply(Filter::ShowBuy, Reply::Properties(vec![property("3", PropertyType::Buy, 9.0)])),
    );
    let state = OverviewState::new(service).unwrap();
    let mut status = state.status();

    for filter in [Filter::ShowAll, Filter::ShowRent, Filter::ShowBuy] {
        state.update_filter(filter);
        let outcome = settled(&mut status).await;
        assert!(matches!(outcome, FetchStatus::Done | FetchStatus::Error));
    }
}

#[tokio::test]
async fn failure_clears_previous_listings() {
    let service = Arc::new(
        ScriptedService::default()
            .reply(
                Filter::ShowAll,
                Reply::Properties(vec![
                    property("1", PropertyType::Rent, 100.0),
                    property("2", PropertyType::Buy, 200.0),
                ]),
            )
            .reply(Filter::ShowBuy, Reply::Failure("dns lookup failed")),
    );

    let state = OverviewState::new(service).unwrap();
    let mut status = state.status();
    settled(&mut status).await;
    assert_eq!(state.properties().borrow().len(), 2);

    state.update_filter(Filter::ShowBuy);

    assert_eq!(settled(&mut status).await, FetchStatus::Error);
    assert!(state.properties().borrow().is_empty());
}

#[tokio::test]
async fn list_is_published_before_status_settles() {
    let listings = vec![property("1", PropertyType::Rent, 100.0)];
    let service = Arc::new(
        ScriptedService::default().reply(Filter::ShowAll, Reply::Properties(listings.clone())),
    );

    let state = OverviewState::new(service).unwrap();
    let properties = state.properties();
    let mut status = state.status();

    status.changed().await.unwrap();
    assert_eq!(*status.borrow(), FetchStatus::Done);
    assert_eq!(*properties.borrow(), listings);
}

#[tokio::test]
async fn navigation_is_one_shot() {
    let service = Arc::new(ScriptedService::default());
    let state = OverviewState::new(service).unwrap();
    let mut navigate = state.navigate_to_selected_property();
    let selected = property("7", PropertyType::Buy, 1.0);

    state.display_property_details(selected.clone());
    navigate.changed().await.unwrap();
    assert_eq!(*navigate.borrow_and_update(), Some(selected));

    state.display_property_details_complete();
    navigate.changed().await.unwrap();
    assert!(navigate.borrow_and_update().is_none());

    // clearing an empty slot is not a change
    state.display_property_details_complete();
    assert!(!navigate.has_changed().unwrap());

    // a fresh subscriber sees no pending navigation
    assert!(state.navigate_to_selected_property().borrow().is_none());
}

#[tokio::test]
async fn dispose_discards_outstanding_fetch() {
    let service = Arc::new(
        ScriptedService::default()
            .reply(Filter::ShowAll, Reply::Properties(vec![property("1", PropertyType::Rent, 1.0)])),
    );
    let gate = service.gate(Filter::ShowAll);

    let state = OverviewState::new(service.clone()).unwrap();
    let status = state.status();
    let properties = state.properties();
    tokio::task::yield_now().await;
    assert_eq!(service.calls(), vec![Filter::ShowAll]);

    state.dispose();
    gate.notify_one();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(*status.borrow(), FetchStatus::Loading);
    assert!(properties.borrow().is_empty());
}

#[tokio::test]
async fn superseded_fetch_never_overwrites_newer_result() {
    let rentals = vec![property("1", PropertyType::Rent, 100.0)];
    let service = Arc::new(
        ScriptedService::default()
            .reply(Filter::ShowAll, Reply::Properties(vec![property("9", PropertyType::Buy, 9.0)]))
            .reply(Filter::ShowRent, Reply::Properties(rentals.clone())),
    );
    let slow_all = service.gate(Filter::ShowAll);

    let state = OverviewState::new(service.clone()).unwrap();
    let mut status = state.status();
    tokio::task::yield_now().await;

    state.update_filter(Filter::ShowRent);
    assert_eq!(settled(&mut status).await, FetchStatus::Done);

    slow_all.notify_one();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(*state.properties().borrow(), rentals);
    assert_eq!(*status.borrow(), FetchStatus::Done);
    assert_eq!(state.filter(), Filter::ShowRent);
}

#[tokio::test]
async fn stale_generation_is_not_published() {
    let service = Arc::new(ScriptedService::default());
    let state = OverviewState::new(service).unwrap();
    let mut status = state.status();
    settled(&mut status).await;

    state
        .listings
        .publish(0, Ok(vec![property("old", PropertyType::Buy, 1.0)]));

    assert!(state.properties().borrow().is_empty());
}

#[test]
fn requires_runtime() {
    let service = Arc::new(ScriptedService::default());
    assert!(OverviewState::new(service).is_err());
}
