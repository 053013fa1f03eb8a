use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The page's current price-presentation setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceDisplayMode {
    #[default]
    Unknown,
    /// Prices shown include shipping; confirmed on the page.
    ShippingInclusive,
    /// Confirmation never arrived. Accepted, but postage is re-checked per item.
    Other,
}

impl PriceDisplayMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceDisplayMode::Unknown => "unknown",
            PriceDisplayMode::ShippingInclusive => "shipping_inclusive",
            PriceDisplayMode::Other => "other",
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, PriceDisplayMode::ShippingInclusive)
    }
}

impl fmt::Display for PriceDisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriceDisplayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(PriceDisplayMode::Unknown),
            "shipping_inclusive" => Ok(PriceDisplayMode::ShippingInclusive),
            "other" => Ok(PriceDisplayMode::Other),
            other => Err(format!("unknown display mode: {}", other)),
        }
    }
}
