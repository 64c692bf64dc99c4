//! Core types for the Prediction Market Analytics toolkit
//!
//! Shared data model for the batch analytics pipeline: market items with
//! their semantic embeddings, the platforms they come from, and the
//! validated corpus snapshot every downstream stage reads from.

pub mod corpus;
pub mod error;
pub mod item;
pub mod platform;

pub use corpus::CorpusSnapshot;
pub use error::{AnalyticsError, Result};
pub use item::MarketItem;
pub use platform::Platform;
