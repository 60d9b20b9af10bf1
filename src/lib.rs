//! Price Estimator library crate.
//!
//! This crate exposes the client-side booking price estimator and its
//! supporting pieces as reusable modules.  External applications may
//! depend on the `price_estimator` crate and call into
//! `engine::estimate` directly, track estimate/authority hand-over
//! with `quote::QuoteTracker`, or embed the API via `api::build_router`.

pub mod adapter;
pub mod api;
pub mod catalog;
pub mod coerce;
pub mod config;
pub mod engine;
pub mod models;
pub mod quote;
