//! Folio - A personal portfolio site with an admin API
//!
//! This library provides the storage, services, rendering and HTTP layers
//! behind the `folio` server binary.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod render;
pub mod services;
