//! Platform definitions for prediction markets

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported prediction market platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Kalshi - US regulated prediction market
    Kalshi,
    /// Polymarket - Crypto-based prediction market
    Polymarket,
    /// Metaculus - Forecasting community
    Metaculus,
    /// Manifold - Play-money prediction market
    Manifold,
}

impl Platform {
    /// Get a short identifier for the platform (for display)
    pub fn short_name(&self) -> &'static str {
        match self {
            Platform::Kalshi => "K",
            Platform::Polymarket => "P",
            Platform::Metaculus => "MC",
            Platform::Manifold => "MF",
        }
    }

    /// Get the full display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Kalshi => "Kalshi",
            Platform::Polymarket => "Polymarket",
            Platform::Metaculus => "Metaculus",
            Platform::Manifold => "Manifold",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "kalshi" | "k" => Ok(Platform::Kalshi),
            "polymarket" | "poly" | "p" => Ok(Platform::Polymarket),
            "metaculus" | "mc" => Ok(Platform::Metaculus),
            "manifold" | "mf" => Ok(Platform::Manifold),
            _ => Err(format!("Unknown platform: {}", s)),
        }
    }
}
