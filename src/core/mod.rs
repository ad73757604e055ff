pub mod aggregate;
pub mod config;
pub mod coroot;
pub mod error;
pub mod hetzner;
pub mod models;
