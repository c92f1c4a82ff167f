//! # okx-trader: event-driven trading runtime for OKX
//!
//! An engine dispatches typed events between pluggable components: the
//! OKX gateway (signed REST + public/private streams), strategies, and a
//! webhook notifier. One cooperative executor drives everything.

pub mod config;
pub mod notifier;

pub use engine;
pub use market_cache;
pub use okx_gateway;
pub use strategy;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.trim().is_empty());
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "okx-trader");
    }
}
