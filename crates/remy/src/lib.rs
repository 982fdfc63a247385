//! Remy - Restaurant Recommendations
//!
//! Geocodes an address, keeps the restaurants within walking-ish distance,
//! narrows them down by cuisine, budget and occasion, and ranks what is left
//! by a blend of profile similarity to a place you already like and rating.

pub mod catalog;
pub mod commands;
pub mod config;
pub mod display;
pub mod fuzzy;
pub mod geo;
pub mod geocode;
pub mod index;
pub mod prompt;
pub mod ranker;
pub mod text;
pub mod tfidf;
