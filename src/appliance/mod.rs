//! Appliance web API access: transport client and session lifecycle

pub mod client;
pub mod session;

pub use client::{ApiClient, ApiErrorBody, ApiRequest, ApiResponse};
pub use session::{Session, SessionManager};
