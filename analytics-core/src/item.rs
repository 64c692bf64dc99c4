//! Market item records consumed by the analytics pipeline

use crate::platform::Platform;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A prediction-market item with its semantic embedding
///
/// Delivered by the corpus loader; the analytics engine only reads these.
/// The optional metadata fields come from the platform connectors and may
/// be absent for older or unresolved markets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketItem {
    /// Unique identifier on the platform
    pub id: String,

    /// Which platform this item is from
    pub platform: Platform,

    /// Human-readable title/question
    pub title: String,

    /// The embedding vector (normalized on corpus load)
    pub embedding: Vec<f32>,

    /// When the market was created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    /// Trading volume (in platform's native unit)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<Decimal>,

    /// Number of distinct traders, where the platform reports it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trader_count: Option<u32>,

    /// Whether the market has resolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved: Option<bool>,
}

impl MarketItem {
    /// Create an item with just the fields every record has
    pub fn new(
        id: impl Into<String>,
        platform: Platform,
        title: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: id.into(),
            platform,
            title: title.into(),
            embedding,
            created_at: None,
            volume: None,
            trader_count: None,
            resolved: None,
        }
    }

    /// Attach a creation timestamp
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}
