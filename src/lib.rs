pub mod binding;
pub mod models;
pub mod overview;
pub mod service;
pub mod telemetry;

pub use binding::{bind_image, normalize_image_url, HttpImageLoader, ImageLoader, ImageTarget};
pub use models::{FetchStatus, Filter, Property, PropertyType};
pub use overview::OverviewState;
pub use service::{HttpListingService, ListingService, ServiceConfig};
