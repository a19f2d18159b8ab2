//! MCP server exposing the QWeather (HeFeng weather) API as tools.
//!
//! Requests authenticate through [`auth::CredentialManager`], which holds
//! either a static API key or an EdDSA-signed token that it re-mints before
//! expiry. Location arguments go through [`location::LocationResolver`],
//! which only calls the city lookup for place names.

pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod location;
pub mod models;
pub mod params;
pub mod service;

pub use error::{Error, Result};
pub use service::Weather;
