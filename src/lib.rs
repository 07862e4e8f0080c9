//! Newsroom - article storage and publishing service
//!
//! Articles live in a key-value backend (hosted KV REST API, Redis or
//! in-process) or in SQLite, and are served over a small JSON API.

pub mod api;
pub mod config;
pub mod db;
pub mod kv;
pub mod models;
pub mod services;
pub mod store;
