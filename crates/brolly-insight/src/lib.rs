//! Brolly Insight crate - policy recommendations.
//!
//! Scores the product catalog against retrieved chunks and the query's
//! detected insurance lines, producing ranked suggestions with reasons.

pub mod suggest;

pub use suggest::{suggest, PolicyListing, PolicySuggestion, CATALOG};
