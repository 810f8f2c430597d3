//! Merchant model. Read-only to the core.

use serde::{Deserialize, Serialize};

use crate::MerchantId;

/// Geographic point for a merchant location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// A merchant as the core sees it: enough to display on the terminal and
/// attribute redemptions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Merchant {
    pub id: MerchantId,
    pub name: String,
    pub is_active: bool,
    pub geo: Option<GeoPoint>,
}

#[cfg(any(test, feature = "test-helpers"))]
impl Merchant {
    pub fn dummy(name: &str) -> Self {
        Self {
            id: MerchantId::new(),
            name: name.to_string(),
            is_active: true,
            geo: None,
        }
    }
}
