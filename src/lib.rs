//! Waymark: follow a route of geographic waypoints with live position fixes.
//!
//! The [`tracker::Tracker`] is the entry point. It owns the route, walks it
//! as fixes arrive, and returns [`model::TrackerEvent`]s for a presentation
//! layer to render.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod feed;
pub mod geo;
pub mod model;
pub mod prompt;
pub mod proximity;
pub mod storage;
pub mod store;
pub mod tracker;
