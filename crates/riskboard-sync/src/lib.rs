//! Sync layer: HTTP transport for the dashboard-data and export contracts.

mod error;
pub use error::FetchError;

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::{ClientConfig, DashboardClient};
