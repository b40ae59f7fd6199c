//! HTTP boundary for heatlens: upload pairs, poll the latest report and
//! fetch stored outputs.

pub mod error;
pub mod outputs;
pub mod pages;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use server::{build_router, serve, start_server, GatewayState};
