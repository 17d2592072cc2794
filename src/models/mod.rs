use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether a listing is offered for rent or for sale
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Rent,
    #[serde(alias = "sale")]
    Buy,
}

/// Core property data model, decoded from the listings endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Property {
    pub id: String,
    #[serde(rename = "img_src", alias = "imgSrcUrl")]
    pub img_src_url: String,
    pub price: f64,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
}

impl Property {
    pub fn is_rental(&self) -> bool {
        self.property_type == PropertyType::Rent
    }

    /// Price as shown on the detail view; rentals are quoted per month
    pub fn display_price(&self) -> String {
        let amount = if self.price.fract() == 0.0 {
            format!("{:.0}", self.price)
        } else {
            format!("{:.2}", self.price)
        };

        if self.is_rental() {
            format!("${}/month", amount)
        } else {
            format!("${}", amount)
        }
    }
}

/// Subset of listings requested from the service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Filter {
    #[default]
    ShowAll,
    ShowRent,
    ShowBuy,
}

impl Filter {
    /// Value of the `filter` query parameter, `None` when every listing is wanted
    pub fn query_value(&self) -> Option<&'static str> {
        match self {
            Filter::ShowAll => None,
            Filter::ShowRent => Some("rent"),
            Filter::ShowBuy => Some("buy"),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.query_value().unwrap_or("all"))
    }
}

impl FromStr for Filter {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" | "show_all" => Ok(Filter::ShowAll),
            "rent" => Ok(Filter::ShowRent),
            "buy" | "sale" => Ok(Filter::ShowBuy),
            other => anyhow::bail!("unknown filter '{}' (expected all, rent or buy)", other),
        }
    }
}

/// Lifecycle of the most recently initiated fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Loading,
    Error,
    Done,
}
