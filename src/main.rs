use anyhow::{Context, Result};
use realestate_overview::{
    bind_image, telemetry, FetchStatus, Filter, HttpImageLoader, HttpListingService, ImageTarget,
    OverviewState, Property, ServiceConfig,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const IMAGE_WAIT: Duration = Duration::from_secs(10);

/// Command line: `realestate-overview [all|rent|buy] [--details <id>]`
#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    filter: Filter,
    details: Option<String>,
}

impl CliArgs {
    fn parse<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut parsed = Self::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--details" => {
                    let id = args.next().context("--details needs a property id")?;
                    parsed.details = Some(id);
                }
                other => parsed.filter = other.parse()?,
            }
        }

        Ok(parsed)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init()?;

    let args = CliArgs::parse(std::env::args().skip(1))?;
    let config = ServiceConfig::from_env()?;

    info!("🏠 Real estate overview");
    info!("Listings service: {}", config.base_url);

    // one client for listings and images
    let client = config.build_client()?;
    let service = Arc::new(HttpListingService::with_client(client.clone(), &config)?);
    let images = HttpImageLoader::new(client)?;

    let state = OverviewState::new(service)?;
    if args.filter != Filter::ShowAll {
        state.update_filter(args.filter);
    }

    let mut status = state.status();
    let outcome = *status
        .wait_for(|status| *status != FetchStatus::Loading)
        .await
        .context("Overview state closed before the fetch finished")?;

    let properties = state.properties().borrow().clone();
    if outcome == FetchStatus::Error {
        warn!("Could not load listings");
    } else {
        info!("✅ Loaded {} properties (filter: {})", properties.len(), args.filter);
    }

    for (i, property) in properties.iter().enumerate() {
        println!("{}. {} ({})", i + 1, property.id, property.display_price());
    }

    if let Some(id) = &args.details {
        match properties.iter().find(|property| &property.id == id) {
            Some(property) => {
                state.display_property_details(property.clone());
                show_details(&state, &images).await;
            }
            None => warn!("No listed property with id {}", id),
        }
    }

    state.dispose();
    Ok(())
}

/// Render the detail view for the pending navigation target, then mark it handled
async fn show_details(state: &OverviewState, images: &HttpImageLoader) {
    let selected: Option<Property> = state.navigate_to_selected_property().borrow().clone();
    let Some(property) = selected else {
        return;
    };

    println!();
    println!("Property {}", property.id);
    println!("   Price: {}", property.display_price());
    println!("   {}", if property.is_rental() { "For rent" } else { "For sale" });
    if let (Some(lat), Some(lng)) = (property.lat, property.lng) {
        println!("   Location: {}, {}", lat, lng);
    }

    let target = ImageTarget::new();
    bind_image(images, &target, Some(&property.img_src_url));
    if let Some(url) = target.requested_url() {
        println!("   Image: {}", url);
    }

    let waited = tokio::time::timeout(IMAGE_WAIT, async {
        while target.image().is_none() {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    })
    .await;

    match (waited, target.image()) {
        (Ok(()), Some(image)) => println!("   Image loaded: {} bytes", image.bytes.len()),
        _ => println!("   Image unavailable"),
    }

    state.display_property_details_complete();
}
