//! Service and package catalog models.

use serde::{Deserialize, Serialize};

use super::patient::RecordStatus;

/// A billable individual service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    #[serde(skip)]
    pub id: String,
    /// Short catalog code
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Unit price
    pub price: f64,
    pub category: String,
    #[serde(default)]
    pub status: RecordStatus,
}

/// A service included in a package.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PackageItem {
    pub service_id: String,
    pub name: String,
    /// Catalog price at the time the package was built
    pub original_price: f64,
    pub quantity: u32,
}

/// A bundle of services sold at a fixed price within a date window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    #[serde(skip)]
    pub id: String,
    pub name: String,
    pub total_price: f64,
    /// First valid day (YYYY-MM-DD)
    pub starts_on: String,
    /// Last valid day (YYYY-MM-DD)
    pub ends_on: String,
    pub items: Vec<PackageItem>,
    #[serde(default)]
    pub status: RecordStatus,
}

impl Package {
    /// Sum of the included services at catalog price.
    pub fn original_total(&self) -> f64 {
        self.items
            .iter()
            .map(|item| item.original_price * f64::from(item.quantity))
            .sum()
    }

    /// Amount saved versus buying the services individually.
    pub fn savings(&self) -> f64 {
        (self.original_total() - self.total_price).max(0.0)
    }

    /// Whether `day` (YYYY-MM-DD) falls inside the validity window.
    pub fn is_valid_on(&self, day: &str) -> bool {
        self.status == RecordStatus::Active
            && self.starts_on.as_str() <= day
            && day <= self.ends_on.as_str()
    }
}
