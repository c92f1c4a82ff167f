//! Strategy base trait and the bundled demo strategy.

pub mod base;
pub mod demo;

pub use base::{register_strategy_callbacks, Strategy};
pub use demo::DemoStrategy;
