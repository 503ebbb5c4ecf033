//! Plumbing shared by every call to the communications platform:
//! connection strings, HMAC request signing, deadlines and error mapping.

mod client;
mod connection;
mod error;
mod signing;

pub use client::AcsHttp;
pub use connection::{ConnectionString, ConnectionStringError};
pub use error::PlatformError;

pub const IDENTITY_API_VERSION: &str = "2023-10-01";
pub const ROOMS_API_VERSION: &str = "2023-06-14";
