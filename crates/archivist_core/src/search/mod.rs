//! Relevance matching entry points.
//!
//! # Responsibility
//! - Expose the pure token-matching predicate used by archive search.
//! - Keep scoring policy (thresholds, tokenization) inside core.

pub mod relevance;
