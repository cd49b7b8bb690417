//! Local caching module.
//!
//! This module provides the `CacheManager` for storing JSON snapshots
//! locally. Snapshots are considered stale after 60 minutes.
//!
//! Cached data types include:
//! - The last loaded list of trips, packing items, expenses and memories
//! - The pending trip reminder queue

pub mod manager;

pub use manager::{CacheManager, CachedData};
