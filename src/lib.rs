//! Delivery-project tracker kept as one JSON document in a versioned store.
//!
//! [`services::sync::SyncCoordinator`] moves a [`models::repository::ProjectRepository`]
//! to and from any [`storage::DocumentStore`] with compare-and-swap writes;
//! [`services::timeline`] and [`services::calendar`] derive the views.

pub mod config;
pub mod models;
pub mod services;
pub mod storage;
pub mod ui;
