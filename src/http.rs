//! `reqwest` implementation of the [crate::http_client::HttpClient] seam and its settings.

pub mod client;
pub mod config;
