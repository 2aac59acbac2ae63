//! Route to route connectivity for a multi-modal journey planner.
//!
//! Precomputes how many changes separate every pair of routes in a
//! transport network, and answers "minimum changes between these places on
//! this date" queries against live station availability.

pub mod cache;
pub mod collections;
pub mod domain;
pub mod repository;
pub mod routes;
