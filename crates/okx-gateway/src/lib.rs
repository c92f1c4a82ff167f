//! OKX exchange gateway.
//!
//! Signed REST client, public/private streaming sessions with reconnect,
//! the wire codec, and the adapter that translates between the venue's
//! protocol and the engine's event model.

pub mod auth;
pub mod backoff;
pub mod codec;
pub mod config;
pub mod error;
pub mod gateway;
pub mod rest;
pub mod types;
pub mod ws;

pub use config::OkxConfig;
pub use error::GatewayError;
pub use gateway::{OkxGateway, SingleMarket};
pub use rest::OkxRest;
pub use ws::OkxWs;
